use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use log::{error, info};
use wasm_bindgen::prelude::*;
use web_sys::{
	CanvasRenderingContext2d, Event, HtmlCanvasElement, KeyboardEvent, MouseEvent, WheelEvent,
	Window,
};

use super::controller::CanvasController;
use super::events::{CanvasEvent, Subscription};
use super::export::{ExportArtifact, ExportFormat, ExportRequest};
use super::interaction::{Dimension, Key, ResizeDrag, ResizeHandle};
use super::render;
use super::state::{CanvasConfig, ForceGraphState};
use super::types::{Element, ElementRef, GraphPayload, Point, Size};
use super::viewport::ZoomDirection;

const FRAME_DT: f64 = 0.016;
const RESIZE_DEBOUNCE_MS: i32 = 150;

type SharedState = Rc<RefCell<Option<ForceGraphState>>>;
type WindowListener = Closure<dyn FnMut(Event)>;

#[derive(Clone, Debug, PartialEq)]
struct EditorView {
	element: ElementRef,
	x: f64,
	y: f64,
}

/// Everything that must be released when the canvas unmounts.
struct CanvasHandle {
	window: Window,
	animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>>,
	frame: Rc<Cell<Option<i32>>>,
	resize_timer: Rc<Cell<Option<i32>>>,
	listeners: Vec<(&'static str, WindowListener)>,
	_events: Subscription,
}

impl Drop for CanvasHandle {
	fn drop(&mut self) {
		if let Some(id) = self.frame.take() {
			let _ = self.window.cancel_animation_frame(id);
		}
		// The loop closure holds a reference to itself
		self.animate.borrow_mut().take();
		if let Some(id) = self.resize_timer.take() {
			self.window.clear_timeout_with_handle(id);
		}
		for (kind, listener) in &self.listeners {
			let _ = self
				.window
				.remove_event_listener_with_callback(kind, listener.as_ref().unchecked_ref());
		}
		info!("force graph canvas released");
	}
}

fn canvas_size(canvas: &HtmlCanvasElement, window: &Window, fullscreen: bool) -> (f64, f64) {
	if fullscreen {
		let measure = |v: Result<JsValue, JsValue>, fallback| {
			v.ok().and_then(|v| v.as_f64()).unwrap_or(fallback)
		};
		(
			measure(window.inner_width(), 800.0),
			measure(window.inner_height(), 600.0),
		)
	} else {
		canvas
			.parent_element()
			.map(|p| (p.client_width() as f64, p.client_height() as f64))
			.unwrap_or((800.0, 600.0))
	}
}

fn local_point(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<Point> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?;
	let rect = canvas.get_bounding_client_rect();
	Some(Point::new(
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

/// Mirrors the state's label edit into the inline editor signals.
fn sync_editor(
	s: &ForceGraphState,
	editor: RwSignal<Option<EditorView>>,
	draft: RwSignal<String>,
) {
	let next = s.editing_anchor().map(|(edit, at)| EditorView {
		element: edit.element.clone(),
		x: at.x,
		y: at.y,
	});
	let previous = editor.with_untracked(|cur| cur.as_ref().map(|c| c.element.clone()));
	let started = match (&next, previous) {
		(Some(n), Some(prev)) => n.element != prev,
		(Some(_), None) => true,
		_ => false,
	};
	if started {
		if let Some((edit, _)) = s.editing_anchor() {
			draft.set(edit.draft.clone());
		}
	}
	if editor.with_untracked(|cur| cur != &next) {
		editor.set(next);
	}
}

/// Data URL for an image export; `None` for formats handed to external converters.
fn export_data_url(s: &ForceGraphState, request: ExportRequest) -> Result<Option<String>, JsValue> {
	match s.export(request) {
		ExportArtifact::Svg(svg) => Ok(Some(format!(
			"data:image/svg+xml;charset=utf-8,{}",
			js_sys::encode_uri_component(&svg)
		))),
		ExportArtifact::Raster(plan) => render::rasterize(s, &plan).map(Some),
		ExportArtifact::Delegated(_) => Ok(None),
	}
}

#[component]
pub fn ForceGraphCanvas(
	#[prop(into)] data: Signal<GraphPayload>,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
	#[prop(optional)] config: CanvasConfig,
	/// Queues host-side changes (merges, highlights, styles, collaboration) onto the live canvas.
	#[prop(optional)]
	controller: Option<CanvasController>,
	#[prop(default = true)] include_properties: bool,
	#[prop(default = true)] include_styles: bool,
	#[prop(optional, into)] on_select: Option<Callback<Option<Element>>>,
	#[prop(optional, into)] on_search: Option<Callback<(String, String)>>,
	#[prop(optional, into)] on_export: Option<Callback<(ExportFormat, String)>>,
	/// Non-image exports, to be converted by the host.
	#[prop(optional, into)]
	on_export_delegated: Option<Callback<(ExportRequest, GraphPayload)>>,
	#[prop(optional, into)] on_notice: Option<Callback<String>>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let input_ref = NodeRef::<leptos::html::Input>::new();
	let state: SharedState = Rc::new(RefCell::new(None));
	let handle = StoredValue::new_local(None::<CanvasHandle>);
	let editor = RwSignal::new(None::<EditorView>);
	let draft = RwSignal::new(String::new());
	let box_size = RwSignal::new((
		width.map_or(Dimension::Percent(100.0), Dimension::Px),
		height.map_or(Dimension::Percent(100.0), Dimension::Px),
	));
	let resize_drag: Rc<Cell<Option<ResizeDrag>>> = Rc::new(Cell::new(None));
	let controller = controller.unwrap_or_default();
	let (state_init, resize_drag_init) = (state.clone(), resize_drag.clone());

	Effect::new(move |_| {
		let payload = data.get();
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		if let Some(s) = state_init.borrow_mut().as_mut() {
			if let Err(err) = s.replace_graph(payload) {
				error!("rejected graph update: {err}");
				if let Some(cb) = on_notice {
					cb.run(err.to_string());
				}
			}
			return;
		}
		match mount_canvas(
			canvas,
			payload,
			config,
			fullscreen,
			state_init.clone(),
			controller.clone(),
			resize_drag_init.clone(),
			(editor, draft, box_size),
			(on_select, on_search, on_export_delegated, on_notice),
		) {
			Ok(h) => handle.set_value(Some(h)),
			Err(err) => error!("failed to start force graph canvas: {err:?}"),
		}
	});

	Effect::new(move |_| {
		if editor.with(Option::is_some) {
			if let Some(input) = input_ref.get() {
				let _ = input.focus();
			}
		}
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some(p) = local_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(canvas) = canvas_ref.get() {
			let _ = canvas.focus();
		}
		if let Some(s) = state_md.borrow_mut().as_mut() {
			s.pointer_down(p);
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some(p) = local_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(s) = state_mm.borrow_mut().as_mut() {
			s.pointer_move(p);
		}
	};

	let state_mu = state.clone();
	let on_mouseup = move |_: MouseEvent| {
		if let Some(s) = state_mu.borrow_mut().as_mut() {
			s.pointer_up();
		}
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(s) = state_ml.borrow_mut().as_mut() {
			s.pointer_leave();
		}
	};

	let state_dc = state.clone();
	let on_dblclick = move |ev: MouseEvent| {
		let Some(p) = local_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(s) = state_dc.borrow_mut().as_mut() {
			s.double_click(p);
			sync_editor(s, editor, draft);
		}
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some(p) = local_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(s) = state_wh.borrow_mut().as_mut() {
			s.wheel(p, ev.delta_y());
		}
	};

	let state_kd = state.clone();
	let on_keydown = move |ev: KeyboardEvent| {
		let Some(key) = Key::from_dom(&ev.key()) else {
			return;
		};
		ev.prevent_default();
		if let Some(s) = state_kd.borrow_mut().as_mut() {
			s.key(key);
			sync_editor(s, editor, draft);
		}
	};

	let state_in = state.clone();
	let on_input = move |ev: Event| {
		if let Some(s) = state_in.borrow_mut().as_mut() {
			s.update_draft(&event_target_value(&ev));
		}
	};

	let state_ik = state.clone();
	let on_input_keydown = move |ev: KeyboardEvent| {
		ev.stop_propagation();
		let key = match Key::from_dom(&ev.key()) {
			Some(key @ (Key::Enter | Key::Escape)) => key,
			_ => return,
		};
		ev.prevent_default();
		if let Some(s) = state_ik.borrow_mut().as_mut() {
			s.key(key);
			sync_editor(s, editor, draft);
		}
	};

	let state_bl = state.clone();
	let on_blur = move |_: web_sys::FocusEvent| {
		if let Some(s) = state_bl.borrow_mut().as_mut() {
			s.blur();
			sync_editor(s, editor, draft);
		}
	};

	let toolbar_action = {
		let state = state.clone();
		move |action: ToolbarAction| {
			let mut guard = state.borrow_mut();
			let Some(s) = guard.as_mut() else {
				return;
			};
			match action {
				ToolbarAction::Zoom(direction) => {
					s.zoom(direction);
				}
				ToolbarAction::Fit => {
					s.fit_to_view();
				}
				ToolbarAction::Search => {
					let Some(ElementRef::Node(id)) = s.interaction().selection().cloned() else {
						return;
					};
					let query = s.graph().node(&id).map(|n| n.label.clone()).unwrap_or_default();
					s.request_search(&id, &query);
				}
				ToolbarAction::Export(format) => {
					let request = ExportRequest {
						format,
						include_properties,
						include_styles,
					};
					match export_data_url(s, request) {
						Ok(Some(url)) => {
							if let Some(cb) = on_export {
								cb.run((format, url));
							}
						}
						// Delegated formats reach the host through `on_export_delegated`
						Ok(None) => {}
						Err(err) => error!("export failed: {err:?}"),
					}
				}
			}
		}
	};
	let act = Rc::new(toolbar_action);
	let button = move |label: &'static str, action: ToolbarAction| {
		let act = act.clone();
		view! { <button on:click=move |_| (*act)(action)>{label}</button> }
	};

	let resize_start = {
		let resize_drag = resize_drag.clone();
		move |ev: MouseEvent| {
			ev.prevent_default();
			ev.stop_propagation();
			let Some(canvas) = canvas_ref.get() else {
				return;
			};
			let container = canvas
				.parent_element()
				.and_then(|wrapper| wrapper.parent_element())
				.map(|outer| Size::new(outer.client_width() as f64, outer.client_height() as f64))
				.unwrap_or_default();
			let (w, h) = box_size.get_untracked();
			resize_drag.set(Some(ResizeDrag::begin(
				ResizeHandle::SE,
				Point::new(ev.client_x() as f64, ev.client_y() as f64),
				w,
				h,
				container,
			)));
		}
	};

	let wrapper_style = move || {
		if fullscreen {
			"position: relative; width: 100vw; height: 100vh;".to_string()
		} else {
			let (w, h) = box_size.get();
			format!("position: relative; width: {}; height: {};", w.css(), h.css())
		}
	};
	let editor_style = move || match editor.get() {
		Some(e) => format!(
			"position: absolute; left: {}px; top: {}px; transform: translate(-50%, -50%); z-index: 2;",
			e.x, e.y
		),
		None => "display: none;".to_string(),
	};

	view! {
		<div class="force-graph-wrapper" style=wrapper_style>
			<canvas
				node_ref=canvas_ref
				class="force-graph-canvas"
				tabindex="0"
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:mouseleave=on_mouseleave
				on:dblclick=on_dblclick
				on:wheel=on_wheel
				on:keydown=on_keydown
				style="display: block; cursor: grab; outline: none;"
			/>
			<input
				node_ref=input_ref
				class="force-graph-label-editor"
				type="text"
				prop:value=move || draft.get()
				on:input=on_input
				on:keydown=on_input_keydown
				on:blur=on_blur
				style=editor_style
			/>
			<div class="force-graph-toolbar">
				{button("+", ToolbarAction::Zoom(ZoomDirection::In))}
				{button("-", ToolbarAction::Zoom(ZoomDirection::Out))}
				{button("Fit", ToolbarAction::Fit)}
				{button("Expand", ToolbarAction::Search)}
				{button("PNG", ToolbarAction::Export(ExportFormat::Png))}
				{button("SVG", ToolbarAction::Export(ExportFormat::Svg))}
				{button("JSON", ToolbarAction::Export(ExportFormat::Json))}
			</div>
			{(!fullscreen)
				.then(|| {
					view! {
						<div
							class="force-graph-resize-handle"
							on:mousedown=resize_start
							style="position: absolute; right: 0; bottom: 0; width: 12px; height: 12px; cursor: nwse-resize;"
						/>
					}
				})}
		</div>
	}
}

#[derive(Clone, Copy)]
enum ToolbarAction {
	Zoom(ZoomDirection),
	Fit,
	Search,
	Export(ExportFormat),
}

/// Creates the state, the animation loop and the window listeners.
#[allow(clippy::too_many_arguments)]
fn mount_canvas(
	canvas: HtmlCanvasElement,
	payload: GraphPayload,
	config: CanvasConfig,
	fullscreen: bool,
	state: SharedState,
	controller: CanvasController,
	resize_drag: Rc<Cell<Option<ResizeDrag>>>,
	(editor, draft, box_size): (
		RwSignal<Option<EditorView>>,
		RwSignal<String>,
		RwSignal<(Dimension, Dimension)>,
	),
	(on_select, on_search, on_export_delegated, on_notice): (
		Option<Callback<Option<Element>>>,
		Option<Callback<(String, String)>>,
		Option<Callback<(ExportRequest, GraphPayload)>>,
		Option<Callback<String>>,
	),
) -> Result<CanvasHandle, JsValue> {
	let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
	let (w, h) = canvas_size(&canvas, &window, fullscreen);
	canvas.set_width(w as u32);
	canvas.set_height(h as u32);

	let ctx: CanvasRenderingContext2d = canvas
		.get_context("2d")?
		.ok_or_else(|| JsValue::from_str("2d context unavailable"))?
		.dyn_into()?;

	let mut graph_state = ForceGraphState::new(payload, Size::new(w, h), config)
		.map_err(|err| JsValue::from_str(&err.to_string()))?;
	graph_state.fit_to_view();
	let events = graph_state.subscribe(move |event| match event {
		CanvasEvent::Selected { element, .. } => {
			if let Some(cb) = on_select {
				cb.run(Some(element.clone()));
			}
		}
		CanvasEvent::Deselected => {
			if let Some(cb) = on_select {
				cb.run(None);
			}
		}
		CanvasEvent::SearchRequested { node_id, query } => {
			if let Some(cb) = on_search {
				cb.run((node_id.clone(), query.clone()));
			}
		}
		CanvasEvent::ExportDelegated { request, payload } => {
			if let Some(cb) = on_export_delegated {
				cb.run((*request, payload.clone()));
			}
		}
		CanvasEvent::Notice(message) => {
			if let Some(cb) = on_notice {
				cb.run(message.clone());
			}
		}
		_ => {}
	});
	*state.borrow_mut() = Some(graph_state);

	let resize_timer: Rc<Cell<Option<i32>>> = Rc::new(Cell::new(None));
	let apply_resize: Rc<Closure<dyn FnMut()>> = {
		let (state, canvas, window, timer) =
			(state.clone(), canvas.clone(), window.clone(), resize_timer.clone());
		Rc::new(Closure::new(move || {
			timer.set(None);
			let (nw, nh) = canvas_size(&canvas, &window, fullscreen);
			canvas.set_width(nw as u32);
			canvas.set_height(nh as u32);
			if let Some(s) = state.borrow_mut().as_mut() {
				s.resize(nw, nh);
			}
		}))
	};
	let schedule_resize = {
		let (window, timer) = (window.clone(), resize_timer.clone());
		move || {
			if let Some(id) = timer.take() {
				window.clear_timeout_with_handle(id);
			}
			let id = window.set_timeout_with_callback_and_timeout_and_arguments_0(
				(*apply_resize).as_ref().unchecked_ref(),
				RESIZE_DEBOUNCE_MS,
			);
			timer.set(id.ok());
		}
	};

	let mut listeners: Vec<(&'static str, WindowListener)> = Vec::new();
	let on_resize = schedule_resize.clone();
	listeners.push(("resize", Closure::new(move |_: Event| on_resize())));

	let (drag_move, on_box_resize) = (resize_drag.clone(), schedule_resize);
	listeners.push((
		"mousemove",
		Closure::new(move |ev: Event| {
			let (Some(drag), Some(ev)) = (drag_move.get(), ev.dyn_ref::<MouseEvent>()) else {
				return;
			};
			box_size.set(drag.update(Point::new(ev.client_x() as f64, ev.client_y() as f64)));
			on_box_resize();
		}),
	));
	listeners.push(("mouseup", Closure::new(move |_: Event| resize_drag.set(None))));

	for (kind, listener) in &listeners {
		window.add_event_listener_with_callback(kind, listener.as_ref().unchecked_ref())?;
	}

	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let frame: Rc<Cell<Option<i32>>> = Rc::new(Cell::new(None));
	let (state_anim, animate_inner, frame_inner, window_anim) =
		(state.clone(), animate.clone(), frame.clone(), window.clone());
	*animate.borrow_mut() = Some(Closure::new(move || {
		if let Some(s) = state_anim.borrow_mut().as_mut() {
			controller.drain(s);
			s.tick(FRAME_DT);
			render::render(s, &ctx);
			sync_editor(s, editor, draft);
		}
		if let Some(cb) = animate_inner.borrow().as_ref() {
			frame_inner.set(
				window_anim
					.request_animation_frame(cb.as_ref().unchecked_ref())
					.ok(),
			);
		}
	}));
	if let Some(cb) = animate.borrow().as_ref() {
		frame.set(Some(window.request_animation_frame(cb.as_ref().unchecked_ref())?));
	}

	info!("force graph canvas mounted at {w}x{h}");
	Ok(CanvasHandle {
		window,
		animate,
		frame,
		resize_timer,
		listeners,
		_events: events,
	})
}
