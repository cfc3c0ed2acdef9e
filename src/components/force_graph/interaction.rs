//! Pointer and keyboard handling.
//!
//! [`Interaction`] turns raw input into layout perturbations (pinning during a
//! drag), viewport changes (pan, zoom) and [`InteractionEvent`]s that the canvas
//! state applies to the graph and republishes.

use log::debug;
use serde::{Deserialize, Serialize};

use super::layout::{DRAG_ALPHA_TARGET, ForceLayout};
use super::model::Graph;
use super::types::{ElementRef, Point, Size};
use super::viewport::{ViewTransform, Viewport, ZoomDirection};

/// Smallest width/height a resize handle can produce, in pixels.
pub const MIN_RESIZE_EXTENT: f64 = 20.0;

/// What happens to a node when the user lets go of it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DragRelease {
	/// The node stays where it was dropped.
	#[default]
	KeepPinned,
	/// The simulation reclaims the node.
	Release,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InteractionConfig {
	pub drag_release: DragRelease,
	/// Pointer travel (screen px) before a press becomes a drag or pan.
	pub drag_threshold: f64,
	/// Node hit radius in graph space.
	pub hit_radius: f64,
	/// Edge hit tolerance in screen px.
	pub edge_tolerance: f64,
}

impl Default for InteractionConfig {
	fn default() -> Self {
		Self {
			drag_release: DragRelease::KeepPinned,
			drag_threshold: 3.0,
			hit_radius: 12.0,
			edge_tolerance: 5.0,
		}
	}
}

/// Per-element interaction state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementState {
	Idle,
	HoveredOrFocused,
	Selected,
	EditingLabel,
	Dragging,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
	Enter,
	Escape,
	Delete,
	ZoomIn,
	ZoomOut,
	Fit,
}

impl Key {
	/// Maps a DOM `KeyboardEvent.key` value.
	pub fn from_dom(key: &str) -> Option<Self> {
		match key {
			"Enter" => Some(Key::Enter),
			"Escape" | "Esc" => Some(Key::Escape),
			"Delete" | "Backspace" => Some(Key::Delete),
			"+" | "=" => Some(Key::ZoomIn),
			"-" | "_" => Some(Key::ZoomOut),
			"0" => Some(Key::Fit),
			_ => None,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub enum InteractionEvent {
	HoverChanged(Option<ElementRef>),
	Selected(ElementRef),
	Deselected,
	DragStarted {
		node: String,
	},
	NodeMoved {
		node: String,
		position: Point,
	},
	DragEnded {
		node: String,
		position: Point,
		keep_pinned: bool,
	},
	ViewChanged(ViewTransform),
	FitRequested,
	DeleteRequested(ElementRef),
	EditingStarted(ElementRef),
	/// `label` is `Some` when the edit was committed.
	EditingEnded {
		element: ElementRef,
		label: Option<String>,
	},
}

#[derive(Clone, Debug, PartialEq)]
pub struct LabelEdit {
	pub element: ElementRef,
	pub draft: String,
}

#[derive(Clone, Debug, Default)]
enum Gesture {
	#[default]
	None,
	Pressed {
		element: Option<ElementRef>,
		origin: Point,
		grab_offset: Point,
		transform_start: ViewTransform,
	},
	Dragging {
		node: String,
		grab_offset: Point,
	},
	Panning {
		origin: Point,
		transform_start: ViewTransform,
	},
}

#[derive(Clone, Debug, Default)]
pub struct Interaction {
	config: InteractionConfig,
	gesture: Gesture,
	hover: Option<ElementRef>,
	selection: Option<ElementRef>,
	editing: Option<LabelEdit>,
}

impl Interaction {
	pub fn new(config: InteractionConfig) -> Self {
		Self {
			config,
			..Default::default()
		}
	}

	pub fn config(&self) -> &InteractionConfig {
		&self.config
	}

	pub fn selection(&self) -> Option<&ElementRef> {
		self.selection.as_ref()
	}

	pub fn hover(&self) -> Option<&ElementRef> {
		self.hover.as_ref()
	}

	pub fn editing(&self) -> Option<&LabelEdit> {
		self.editing.as_ref()
	}

	pub fn dragged_node(&self) -> Option<&str> {
		match &self.gesture {
			Gesture::Dragging { node, .. } => Some(node),
			_ => None,
		}
	}

	pub fn is_dragging(&self) -> bool {
		self.dragged_node().is_some()
	}

	pub fn element_state(&self, element: &ElementRef) -> ElementState {
		if self.editing.as_ref().is_some_and(|e| &e.element == element) {
			ElementState::EditingLabel
		} else if matches!(element, ElementRef::Node(id) if self.dragged_node() == Some(id.as_str())) {
			ElementState::Dragging
		} else if self.selection.as_ref() == Some(element) {
			ElementState::Selected
		} else if self.hover.as_ref() == Some(element) {
			ElementState::HoveredOrFocused
		} else {
			ElementState::Idle
		}
	}

	pub fn pointer_down(
		&mut self,
		screen: Point,
		hit: Option<ElementRef>,
		viewport: &Viewport,
		layout: &ForceLayout,
	) -> Vec<InteractionEvent> {
		let mut events = self.commit_edit();
		let grab_offset = match &hit {
			Some(ElementRef::Node(id)) => layout
				.position(id)
				.map(|p| {
					let g = viewport.screen_to_graph(screen);
					Point::new(p.x - g.x, p.y - g.y)
				})
				.unwrap_or_default(),
			_ => Point::default(),
		};
		if let Some(element) = &hit {
			if self.hover.as_ref() != Some(element) {
				self.hover = Some(element.clone());
				events.push(InteractionEvent::HoverChanged(self.hover.clone()));
			}
		}
		self.gesture = Gesture::Pressed {
			element: hit,
			origin: screen,
			grab_offset,
			transform_start: viewport.transform(),
		};
		events
	}

	pub fn pointer_move(
		&mut self,
		screen: Point,
		hit: Option<ElementRef>,
		viewport: &mut Viewport,
		layout: &mut ForceLayout,
	) -> Vec<InteractionEvent> {
		let mut events = Vec::new();
		match std::mem::take(&mut self.gesture) {
			Gesture::None => {
				if self.hover != hit {
					self.hover = hit;
					events.push(InteractionEvent::HoverChanged(self.hover.clone()));
				}
			}
			Gesture::Pressed {
				element,
				origin,
				grab_offset,
				transform_start,
			} => {
				if screen.distance(origin) <= self.config.drag_threshold {
					self.gesture = Gesture::Pressed {
						element,
						origin,
						grab_offset,
						transform_start,
					};
					return events;
				}
				match element {
					Some(ElementRef::Node(node)) => {
						debug!("drag started on {node}");
						layout.set_alpha_target(DRAG_ALPHA_TARGET);
						events.push(InteractionEvent::DragStarted { node: node.clone() });
						events.extend(self.drag_to(node, grab_offset, screen, viewport, layout));
					}
					_ => {
						self.gesture = Gesture::Panning {
							origin,
							transform_start,
						};
						events.extend(self.pan_to(origin, transform_start, screen, viewport));
					}
				}
			}
			Gesture::Dragging { node, grab_offset } => {
				events.extend(self.drag_to(node, grab_offset, screen, viewport, layout));
			}
			Gesture::Panning {
				origin,
				transform_start,
			} => {
				self.gesture = Gesture::Panning {
					origin,
					transform_start,
				};
				events.extend(self.pan_to(origin, transform_start, screen, viewport));
			}
		}
		events
	}

	fn drag_to(
		&mut self,
		node: String,
		grab_offset: Point,
		screen: Point,
		viewport: &Viewport,
		layout: &mut ForceLayout,
	) -> Option<InteractionEvent> {
		let g = viewport.screen_to_graph(screen);
		let position = Point::new(g.x + grab_offset.x, g.y + grab_offset.y);
		let moved = layout.pin(&node, position.x, position.y);
		self.gesture = Gesture::Dragging {
			node: node.clone(),
			grab_offset,
		};
		moved.then_some(InteractionEvent::NodeMoved { node, position })
	}

	fn pan_to(
		&self,
		origin: Point,
		start: ViewTransform,
		screen: Point,
		viewport: &mut Viewport,
	) -> Option<InteractionEvent> {
		let t = viewport.set_transform(ViewTransform {
			x: start.x + (screen.x - origin.x),
			y: start.y + (screen.y - origin.y),
			k: start.k,
		});
		Some(InteractionEvent::ViewChanged(t))
	}

	pub fn pointer_up(&mut self, layout: &mut ForceLayout) -> Vec<InteractionEvent> {
		match std::mem::take(&mut self.gesture) {
			Gesture::Pressed { element, .. } => match element {
				Some(element) => {
					self.selection = Some(element.clone());
					vec![InteractionEvent::Selected(element)]
				}
				None => {
					self.selection = None;
					vec![InteractionEvent::Deselected]
				}
			},
			Gesture::Dragging { node, .. } => self.end_drag(node, layout),
			Gesture::Panning { .. } | Gesture::None => Vec::new(),
		}
	}

	/// Pointer left the canvas: finish any drag, drop pan/press, clear hover.
	pub fn pointer_leave(&mut self, layout: &mut ForceLayout) -> Vec<InteractionEvent> {
		let mut events = match std::mem::take(&mut self.gesture) {
			Gesture::Dragging { node, .. } => self.end_drag(node, layout),
			_ => Vec::new(),
		};
		if self.hover.take().is_some() {
			events.push(InteractionEvent::HoverChanged(None));
		}
		events
	}

	fn end_drag(&mut self, node: String, layout: &mut ForceLayout) -> Vec<InteractionEvent> {
		layout.set_alpha_target(0.0);
		let position = layout.position(&node).unwrap_or_default();
		let keep_pinned = self.config.drag_release == DragRelease::KeepPinned;
		if !keep_pinned {
			layout.unpin(&node);
		}
		debug!("drag ended on {node} (pinned: {keep_pinned})");
		vec![InteractionEvent::DragEnded {
			node,
			position,
			keep_pinned,
		}]
	}

	/// Opens the inline label editor for `element`.
	pub fn begin_label_edit(&mut self, element: ElementRef, current: &str) -> Vec<InteractionEvent> {
		let mut events = self.commit_edit();
		self.selection = Some(element.clone());
		self.editing = Some(LabelEdit {
			element: element.clone(),
			draft: current.to_string(),
		});
		events.push(InteractionEvent::EditingStarted(element));
		events
	}

	pub fn update_draft(&mut self, text: &str) {
		if let Some(edit) = &mut self.editing {
			edit.draft = text.to_string();
		}
	}

	/// Blur commits, like Enter.
	pub fn blur(&mut self) -> Vec<InteractionEvent> {
		self.commit_edit()
	}

	pub fn key(&mut self, key: Key, viewport: &mut Viewport) -> Vec<InteractionEvent> {
		if self.editing.is_some() {
			return match key {
				Key::Enter => self.commit_edit(),
				Key::Escape => self.cancel_edit(),
				_ => Vec::new(),
			};
		}
		match key {
			Key::Delete => match self.selection.take() {
				Some(element) => vec![InteractionEvent::DeleteRequested(element)],
				None => Vec::new(),
			},
			Key::Escape => match self.selection.take() {
				Some(_) => vec![InteractionEvent::Deselected],
				None => Vec::new(),
			},
			Key::ZoomIn => vec![InteractionEvent::ViewChanged(viewport.zoom(ZoomDirection::In))],
			Key::ZoomOut => vec![InteractionEvent::ViewChanged(viewport.zoom(ZoomDirection::Out))],
			Key::Fit => vec![InteractionEvent::FitRequested],
			Key::Enter => Vec::new(),
		}
	}

	fn commit_edit(&mut self) -> Vec<InteractionEvent> {
		match self.editing.take() {
			Some(LabelEdit { element, draft }) => vec![InteractionEvent::EditingEnded {
				element,
				label: Some(draft),
			}],
			None => Vec::new(),
		}
	}

	fn cancel_edit(&mut self) -> Vec<InteractionEvent> {
		match self.editing.take() {
			Some(LabelEdit { element, .. }) => vec![InteractionEvent::EditingEnded {
				element,
				label: None,
			}],
			None => Vec::new(),
		}
	}

	/// Forgets references to elements that no longer exist after a graph change.
	/// Drops references to elements no longer in `graph`. Returns the node of a
	/// drag that had to be abandoned because its node is gone.
	pub fn retain_existing(&mut self, graph: &Graph) -> Option<String> {
		if self.hover.as_ref().is_some_and(|e| !graph.contains(e)) {
			self.hover = None;
		}
		if self.selection.as_ref().is_some_and(|e| !graph.contains(e)) {
			self.selection = None;
		}
		if self.editing.as_ref().is_some_and(|e| !graph.contains(&e.element)) {
			self.editing = None;
		}
		let stale = match &self.gesture {
			Gesture::Dragging { node, .. } => graph.node(node).is_none(),
			Gesture::Pressed {
				element: Some(e), ..
			} => !graph.contains(e),
			_ => false,
		};
		if !stale {
			return None;
		}
		match std::mem::take(&mut self.gesture) {
			Gesture::Dragging { node, .. } => Some(node),
			_ => None,
		}
	}

	/// Abandons a drag without a drop. The simulation is allowed to cool again.
	pub fn cancel_drag(&mut self, layout: &mut ForceLayout) -> Option<String> {
		let Gesture::Dragging { .. } = &self.gesture else {
			return None;
		};
		layout.set_alpha_target(0.0);
		match std::mem::take(&mut self.gesture) {
			Gesture::Dragging { node, .. } => Some(node),
			_ => None,
		}
	}
}

/// Topmost node within the hit radius, else the nearest edge within tolerance.
pub fn hit_test(
	graph: &Graph,
	layout: &ForceLayout,
	viewport: &Viewport,
	config: &InteractionConfig,
	screen: Point,
) -> Option<ElementRef> {
	let g = viewport.screen_to_graph(screen);
	let node = graph
		.nodes()
		.iter()
		.rev()
		.filter_map(|n| Some((n, layout.position(&n.id)?)))
		.find(|(_, p)| p.distance(g) < config.hit_radius)
		.map(|(n, _)| ElementRef::Node(n.id.clone()));
	if node.is_some() {
		return node;
	}

	let tolerance = config.edge_tolerance / viewport.transform().k;
	graph
		.edges()
		.iter()
		.filter_map(|e| {
			let d = segment_distance(g, layout.position(&e.source)?, layout.position(&e.target)?);
			(d <= tolerance).then_some((e, d))
		})
		.min_by(|a, b| a.1.total_cmp(&b.1))
		.map(|(e, _)| ElementRef::Edge(e.id.clone()))
}

fn segment_distance(p: Point, a: Point, b: Point) -> f64 {
	let (dx, dy) = (b.x - a.x, b.y - a.y);
	let len_sq = dx * dx + dy * dy;
	if len_sq == 0.0 {
		return p.distance(a);
	}
	let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
	p.distance(Point::new(a.x + t * dx, a.y + t * dy))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeHandle {
	N,
	S,
	E,
	W,
	NE,
	NW,
	SE,
	SW,
}

impl ResizeHandle {
	/// Sign applied to the pointer delta on each axis.
	fn axes(self) -> (f64, f64) {
		match self {
			ResizeHandle::N => (0.0, -1.0),
			ResizeHandle::S => (0.0, 1.0),
			ResizeHandle::E => (1.0, 0.0),
			ResizeHandle::W => (-1.0, 0.0),
			ResizeHandle::NE => (1.0, -1.0),
			ResizeHandle::NW => (-1.0, -1.0),
			ResizeHandle::SE => (1.0, 1.0),
			ResizeHandle::SW => (-1.0, 1.0),
		}
	}
}

/// A width or height in the unit it was authored in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Dimension {
	Px(f64),
	Percent(f64),
}

impl Dimension {
	/// CSS length, e.g. `320px` or `50%`.
	pub fn css(self) -> String {
		match self {
			Dimension::Px(v) => format!("{v}px"),
			Dimension::Percent(p) => format!("{p}%"),
		}
	}

	fn to_px(self, container: f64) -> f64 {
		match self {
			Dimension::Px(v) => v,
			Dimension::Percent(p) => p / 100.0 * container,
		}
	}

	fn like(self, px: f64, container: f64) -> Self {
		match self {
			Dimension::Percent(_) if container > 0.0 => Dimension::Percent(px / container * 100.0),
			_ => Dimension::Px(px),
		}
	}
}

/// Resize of a styled (non-graph) element via one of its eight handles.
#[derive(Clone, Copy, Debug)]
pub struct ResizeDrag {
	handle: ResizeHandle,
	origin: Point,
	width: Dimension,
	height: Dimension,
	container: Size,
}

impl ResizeDrag {
	pub fn begin(
		handle: ResizeHandle,
		origin: Point,
		width: Dimension,
		height: Dimension,
		container: Size,
	) -> Self {
		Self {
			handle,
			origin,
			width,
			height,
			container,
		}
	}

	/// New (width, height) for the pointer at `pointer`, in the original units.
	pub fn update(&self, pointer: Point) -> (Dimension, Dimension) {
		let (sx, sy) = self.handle.axes();
		let w = self.width.to_px(self.container.width) + sx * (pointer.x - self.origin.x);
		let h = self.height.to_px(self.container.height) + sy * (pointer.y - self.origin.y);
		(
			self.width
				.like(w.max(MIN_RESIZE_EXTENT), self.container.width),
			self.height
				.like(h.max(MIN_RESIZE_EXTENT), self.container.height),
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::layout::LayoutSettings;
	use crate::components::force_graph::model::ingest;
	use crate::components::force_graph::types::{Edge, GraphPayload, Node};
	use crate::components::force_graph::viewport::ViewportConfig;

	struct Fixture {
		graph: Graph,
		layout: ForceLayout,
		viewport: Viewport,
		interaction: Interaction,
	}

	fn fixture(config: InteractionConfig) -> Fixture {
		let mut a = Node::new("a", "A", "");
		a.x = Some(0.0);
		a.y = Some(0.0);
		let mut b = Node::new("b", "B", "");
		b.x = Some(100.0);
		b.y = Some(0.0);
		let graph = ingest(GraphPayload {
			nodes: vec![a, b],
			edges: vec![Edge::new("ab", "a", "b", "")],
			..Default::default()
		})
		.unwrap();
		let mut layout = ForceLayout::new(LayoutSettings::default(), Point::default());
		layout.start(&graph, LayoutSettings::default()).unwrap();
		Fixture {
			graph,
			layout,
			viewport: Viewport::new(Size::new(800.0, 600.0), ViewportConfig::default()),
			interaction: Interaction::new(config),
		}
	}

	fn screen_of(f: &Fixture, id: &str) -> Point {
		f.viewport.graph_to_screen(f.layout.position(id).unwrap())
	}

	#[test]
	fn click_selects_and_empty_click_deselects() {
		let mut f = fixture(InteractionConfig::default());
		let at = screen_of(&f, "a");
		let hit = hit_test(&f.graph, &f.layout, &f.viewport, &f.interaction.config, at);
		assert_eq!(hit, Some(ElementRef::Node("a".into())));

		f.interaction.pointer_down(at, hit, &f.viewport, &f.layout);
		let events = f.interaction.pointer_up(&mut f.layout);
		assert_eq!(events, vec![InteractionEvent::Selected(ElementRef::Node("a".into()))]);
		assert_eq!(
			f.interaction.element_state(&ElementRef::Node("a".into())),
			ElementState::Selected
		);

		f.interaction
			.pointer_down(Point::new(5.0, 5.0), None, &f.viewport, &f.layout);
		assert_eq!(f.interaction.pointer_up(&mut f.layout), vec![InteractionEvent::Deselected]);
		assert!(f.interaction.selection().is_none());
	}

	#[test]
	fn edge_is_hit_between_its_endpoints() {
		let f = fixture(InteractionConfig::default());
		let mid = f.viewport.graph_to_screen(Point::new(50.0, 2.0));
		let hit = hit_test(&f.graph, &f.layout, &f.viewport, &f.interaction.config, mid);
		assert_eq!(hit, Some(ElementRef::Edge("ab".into())));
	}

	#[test]
	fn drag_pins_node_under_pointer_and_keeps_it_pinned() {
		let mut f = fixture(InteractionConfig::default());
		let start = screen_of(&f, "a");
		let hit = Some(ElementRef::Node("a".into()));
		f.interaction.pointer_down(start, hit.clone(), &f.viewport, &f.layout);

		let target = Point::new(start.x + 40.0, start.y + 30.0);
		let events = f
			.interaction
			.pointer_move(target, hit, &mut f.viewport, &mut f.layout);
		assert!(matches!(events[0], InteractionEvent::DragStarted { .. }));
		assert!(f.interaction.is_dragging());
		assert!(f.layout.is_pinned("a"));

		let expected = f.viewport.screen_to_graph(target);
		f.layout.tick();
		assert_eq!(f.layout.position("a"), Some(expected));

		let events = f.interaction.pointer_up(&mut f.layout);
		assert!(matches!(
			&events[0],
			InteractionEvent::DragEnded { keep_pinned: true, .. }
		));
		assert!(f.layout.is_pinned("a"));
	}

	#[test]
	fn release_mode_unpins_after_drag() {
		let mut f = fixture(InteractionConfig {
			drag_release: DragRelease::Release,
			..Default::default()
		});
		let start = screen_of(&f, "b");
		let hit = Some(ElementRef::Node("b".into()));
		f.interaction.pointer_down(start, hit.clone(), &f.viewport, &f.layout);
		f.interaction.pointer_move(
			Point::new(start.x + 50.0, start.y),
			hit,
			&mut f.viewport,
			&mut f.layout,
		);
		f.interaction.pointer_up(&mut f.layout);
		assert!(!f.layout.is_pinned("b"));
	}

	#[test]
	fn small_jitter_is_still_a_click() {
		let mut f = fixture(InteractionConfig::default());
		let start = screen_of(&f, "a");
		let hit = Some(ElementRef::Node("a".into()));
		f.interaction.pointer_down(start, hit.clone(), &f.viewport, &f.layout);
		f.interaction.pointer_move(
			Point::new(start.x + 1.0, start.y + 1.0),
			hit,
			&mut f.viewport,
			&mut f.layout,
		);
		assert!(!f.layout.is_pinned("a"));
		assert!(matches!(
			f.interaction.pointer_up(&mut f.layout)[0],
			InteractionEvent::Selected(_)
		));
	}

	#[test]
	fn background_drag_pans() {
		let mut f = fixture(InteractionConfig::default());
		let before = f.viewport.transform();
		f.interaction
			.pointer_down(Point::new(10.0, 10.0), None, &f.viewport, &f.layout);
		f.interaction
			.pointer_move(Point::new(60.0, 30.0), None, &mut f.viewport, &mut f.layout);
		let after = f.viewport.transform();
		assert_eq!((after.x - before.x, after.y - before.y), (50.0, 20.0));
		assert!(f.interaction.pointer_up(&mut f.layout).is_empty());
	}

	#[test]
	fn label_edit_commits_on_enter_and_cancels_on_escape() {
		let mut f = fixture(InteractionConfig::default());
		let node = ElementRef::Node("a".into());
		let events = f.interaction.begin_label_edit(node.clone(), "A");
		assert_eq!(events, vec![InteractionEvent::EditingStarted(node.clone())]);
		assert_eq!(f.interaction.element_state(&node), ElementState::EditingLabel);

		f.interaction.update_draft("Ada");
		assert_eq!(
			f.interaction.key(Key::Enter, &mut f.viewport),
			vec![InteractionEvent::EditingEnded {
				element: node.clone(),
				label: Some("Ada".into())
			}]
		);

		f.interaction.begin_label_edit(node.clone(), "Ada");
		f.interaction.update_draft("discard me");
		assert_eq!(
			f.interaction.key(Key::Escape, &mut f.viewport),
			vec![InteractionEvent::EditingEnded {
				element: node.clone(),
				label: None
			}]
		);
		assert!(f.interaction.editing().is_none());

		f.interaction.begin_label_edit(node.clone(), "Ada");
		assert!(matches!(
			&f.interaction.blur()[0],
			InteractionEvent::EditingEnded { label: Some(_), .. }
		));
	}

	#[test]
	fn resize_handles_respect_units_and_minimum() {
		let container = Size::new(400.0, 200.0);
		let drag = ResizeDrag::begin(
			ResizeHandle::SE,
			Point::new(0.0, 0.0),
			Dimension::Px(100.0),
			Dimension::Percent(50.0),
			container,
		);
		let (w, h) = drag.update(Point::new(30.0, 20.0));
		assert_eq!(w, Dimension::Px(130.0));
		assert_eq!(h, Dimension::Percent(60.0));

		let west = ResizeDrag::begin(
			ResizeHandle::W,
			Point::new(0.0, 0.0),
			Dimension::Px(50.0),
			Dimension::Px(50.0),
			container,
		);
		let (w, h) = west.update(Point::new(500.0, 80.0));
		assert_eq!(w, Dimension::Px(MIN_RESIZE_EXTENT));
		assert_eq!(h, Dimension::Px(50.0));

		let north = ResizeDrag::begin(
			ResizeHandle::N,
			Point::new(0.0, 0.0),
			Dimension::Px(50.0),
			Dimension::Px(50.0),
			container,
		);
		assert_eq!(north.update(Point::new(0.0, -10.0)).1, Dimension::Px(60.0));
		assert_eq!(Dimension::Px(60.0).css(), "60px");
		assert_eq!(Dimension::Percent(50.0).css(), "50%");
	}

	#[test]
	fn keys_map_from_dom_values() {
		assert_eq!(Key::from_dom("Enter"), Some(Key::Enter));
		assert_eq!(Key::from_dom("+"), Some(Key::ZoomIn));
		assert_eq!(Key::from_dom("q"), None);
	}
}
