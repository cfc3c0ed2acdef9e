use std::f64::consts::PI;

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use super::export::RasterPlan;
use super::interaction::ElementState;
use super::state::ForceGraphState;
use super::style::{Emphasis, ResolvedNodeStyle};
use super::types::{ElementRef, Node, Point};
use super::viewport::ViewTransform;

const BACKGROUND: &str = "#1a1a2e";
const SELECTION_COLOR: &str = "#ffd166";

fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

fn emphasis_alpha(emphasis: Emphasis) -> f64 {
	match emphasis {
		Emphasis::Normal | Emphasis::Emphasized => 1.0,
		Emphasis::Dimmed => 0.15,
	}
}

pub fn render(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	let size = state.viewport().size();
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, size.width, size.height);
	draw_scene(state, ctx, state.transform(), true);
}

/// Draws the whole graph onto an off-screen canvas sized by `plan`.
pub fn render_detached(state: &ForceGraphState, ctx: &CanvasRenderingContext2d, plan: &RasterPlan) {
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, plan.size.width, plan.size.height);
	draw_scene(state, ctx, plan.transform, false);
}

/// PNG data URL of the graph drawn on a detached canvas.
pub fn rasterize(state: &ForceGraphState, plan: &RasterPlan) -> Result<String, JsValue> {
	let document = web_sys::window()
		.and_then(|w| w.document())
		.ok_or_else(|| JsValue::from_str("no document"))?;
	let canvas: HtmlCanvasElement = document.create_element("canvas")?.dyn_into()?;
	canvas.set_width(plan.size.width.ceil() as u32);
	canvas.set_height(plan.size.height.ceil() as u32);
	let ctx: CanvasRenderingContext2d = canvas
		.get_context("2d")?
		.ok_or_else(|| JsValue::from_str("2d context unavailable"))?
		.dyn_into()?;
	render_detached(state, &ctx, plan);
	canvas.to_data_url_with_type("image/png")
}

fn draw_scene(
	state: &ForceGraphState,
	ctx: &CanvasRenderingContext2d,
	transform: ViewTransform,
	live: bool,
) {
	ctx.save();
	let _ = ctx.translate(transform.x, transform.y);
	let _ = ctx.scale(transform.k, transform.k);
	draw_edges(state, ctx, transform.k, live);
	draw_nodes(state, ctx, transform.k, live);
	if live {
		draw_remote_editors(state, ctx, transform.k);
	}
	ctx.restore();
}

fn draw_edges(state: &ForceGraphState, ctx: &CanvasRenderingContext2d, k: f64, live: bool) {
	let (graph, layout, overlay) = (state.graph(), state.layout(), state.overlay());
	let (dash, gap) = (8.0 / k, 4.0 / k);
	let dash_offset = if live {
		-(state.flow_time * 30.0) % (dash + gap)
	} else {
		0.0
	};
	let t = if live {
		ease_out_cubic(state.hover.highlight_t)
	} else {
		0.0
	};
	let interaction = state.interaction();

	for edge in graph.edges() {
		let (Some(a), Some(b), Some(style)) = (
			layout.position(&edge.source),
			layout.position(&edge.target),
			overlay.edge_style(graph, &edge.id),
		) else {
			continue;
		};
		let (dx, dy) = (b.x - a.x, b.y - a.y);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist < 0.001 {
			continue;
		}
		let element = ElementRef::Edge(edge.id.clone());
		let emphasis = overlay.emphasis(&element);
		let source_radius = node_radius(state, &edge.source);
		let target_radius = node_radius(state, &edge.target);

		let is_highlighted =
			state.is_highlighted(&edge.source) && state.is_highlighted(&edge.target);

		// t=0: every edge at base alpha, t=1: highlighted edges brighten, others dim
		let (hover_alpha, hover_width) = if is_highlighted {
			(1.0 + 0.3 * t, 1.0 + 0.3 * t)
		} else {
			(1.0 - 0.75 * t, 1.0 - 0.3 * t)
		};
		let mut width = style.width / k * hover_width;
		if emphasis == Emphasis::Emphasized {
			width *= 1.5;
		}
		let element_state = interaction.element_state(&element);
		let is_selected = matches!(element_state, ElementState::Selected | ElementState::EditingLabel);
		let arrow_size = style.arrow_size / k;

		ctx.set_global_alpha((emphasis_alpha(emphasis) * hover_alpha).min(1.0));
		ctx.set_stroke_style_str(if is_selected { SELECTION_COLOR } else { style.color.as_str() });
		ctx.set_line_width(if is_selected { width * 2.0 } else { width });
		if style.dashed {
			let _ = ctx.set_line_dash(&js_sys::Array::of2(
				&JsValue::from_f64(dash),
				&JsValue::from_f64(gap),
			));
			ctx.set_line_dash_offset(dash_offset);
		}

		let (ux, uy) = (dx / dist, dy / dist);
		ctx.begin_path();
		ctx.move_to(a.x + ux * source_radius, a.y + uy * source_radius);
		ctx.line_to(
			b.x - ux * (target_radius + arrow_size),
			b.y - uy * (target_radius + arrow_size),
		);
		ctx.stroke();
		let _ = ctx.set_line_dash(&js_sys::Array::new());

		ctx.set_fill_style_str(if is_selected { SELECTION_COLOR } else { style.color.as_str() });
		let (tip_x, tip_y) = (b.x - ux * target_radius, b.y - uy * target_radius);
		let (back_x, back_y) = (tip_x - ux * arrow_size, tip_y - uy * arrow_size);
		let (px, py) = (-uy * arrow_size * 0.5, ux * arrow_size * 0.5);
		ctx.begin_path();
		ctx.move_to(tip_x, tip_y);
		ctx.line_to(back_x + px, back_y + py);
		ctx.line_to(back_x - px, back_y - py);
		ctx.close_path();
		ctx.fill();

		if !edge.label.is_empty() && element_state != ElementState::EditingLabel {
			ctx.set_fill_style_str("rgba(200, 210, 230, 0.8)");
			ctx.set_font(&format!("{}px sans-serif", 9.0 / k.max(0.5)));
			ctx.set_text_align("center");
			let _ = ctx.fill_text(&edge.label, (a.x + b.x) / 2.0, (a.y + b.y) / 2.0 - 3.0 / k);
			ctx.set_text_align("start");
		}
		ctx.set_global_alpha(1.0);
	}
	let _ = ctx.set_line_dash(&js_sys::Array::new());
}

fn node_radius(state: &ForceGraphState, id: &str) -> f64 {
	state
		.overlay()
		.node_style(state.graph(), id)
		.map_or(0.0, |s| s.size)
}

fn fill_node(
	ctx: &CanvasRenderingContext2d,
	at: Point,
	radius: f64,
	style: &ResolvedNodeStyle,
	k: f64,
) {
	ctx.begin_path();
	let _ = ctx.arc(at.x, at.y, radius, 0.0, 2.0 * PI);
	ctx.set_fill_style_str(&style.color);
	ctx.fill();
	if let Some(border) = &style.border_color {
		if style.border_width > 0.0 {
			ctx.set_stroke_style_str(border);
			ctx.set_line_width(style.border_width / k);
			ctx.stroke();
		}
	}
}

fn draw_label(
	ctx: &CanvasRenderingContext2d,
	node: &Node,
	at: Point,
	radius: f64,
	color: &str,
	k: f64,
) {
	if node.label.is_empty() {
		return;
	}
	ctx.set_fill_style_str(color);
	ctx.set_font(&format!("{}px sans-serif", 10.0 / k.max(0.5)));
	let _ = ctx.fill_text(&node.label, at.x + radius + 3.0, at.y + 3.0);
}

fn draw_nodes(state: &ForceGraphState, ctx: &CanvasRenderingContext2d, k: f64, live: bool) {
	let (graph, layout, overlay) = (state.graph(), state.layout(), state.overlay());
	let (has_highlight, t) = if live {
		(
			state.has_active_highlight(),
			ease_out_cubic(state.hover.highlight_t),
		)
	} else {
		(false, 0.0)
	};
	let interaction = state.interaction();

	for node in graph.nodes() {
		if has_highlight && state.is_highlighted(&node.id) {
			continue;
		}
		let (Some(at), Some(style)) = (layout.position(&node.id), overlay.node_style(graph, &node.id))
		else {
			continue;
		};
		let element = ElementRef::Node(node.id.clone());
		let emphasis = overlay.emphasis(&element);
		let alpha = emphasis_alpha(emphasis) * (1.0 - 0.7 * t);
		let mut radius = style.size * (1.0 - 0.15 * t);
		if emphasis == Emphasis::Emphasized {
			radius *= 1.2;
		}

		ctx.set_global_alpha(alpha);
		fill_node(ctx, at, radius, &style, k);
		ctx.set_global_alpha(1.0);

		let element_state = interaction.element_state(&element);
		if element_state != ElementState::Idle && element_state != ElementState::HoveredOrFocused {
			ctx.begin_path();
			let _ = ctx.arc(at.x, at.y, radius + 3.0 / k, 0.0, 2.0 * PI);
			ctx.set_stroke_style_str(SELECTION_COLOR);
			ctx.set_line_width(2.0 / k);
			ctx.stroke();
		}

		if element_state != ElementState::EditingLabel {
			let color = format!("rgba(255, 255, 255, {})", alpha * 0.8);
			draw_label(ctx, node, at, radius, &color, k);
		}
	}

	if !has_highlight {
		return;
	}

	for node in graph.nodes() {
		if !state.is_highlighted(&node.id) {
			continue;
		}
		let (Some(at), Some(style)) = (layout.position(&node.id), overlay.node_style(graph, &node.id))
		else {
			continue;
		};
		let is_hovered = state.is_hovered(&node.id);
		let is_neighbor = state.hover.neighbors.contains(&node.id)
			|| state.hover.prev_neighbors.contains(&node.id);

		let (radius, glow_radius) = if is_hovered {
			(style.size * (1.0 + 0.35 * t), style.size * (1.8 + 1.2 * t))
		} else if is_neighbor {
			(style.size * (1.0 + 0.2 * t), style.size * (1.4 + 0.6 * t))
		} else {
			(style.size, 0.0)
		};

		if glow_radius > 0.0 && t > 0.01 {
			if let Ok(gradient) =
				ctx.create_radial_gradient(at.x, at.y, radius * 0.3, at.x, at.y, glow_radius)
			{
				let alpha = if is_hovered { 0.35 * t } else { 0.2 * t };
				let _ = gradient.add_color_stop(0.0, &format!("rgba(255, 255, 255, {})", alpha));
				let _ = gradient
					.add_color_stop(0.6, &format!("rgba(200, 220, 255, {})", alpha * 0.3));
				let _ = gradient.add_color_stop(1.0, "rgba(255, 255, 255, 0)");
				ctx.begin_path();
				let _ = ctx.arc(at.x, at.y, glow_radius, 0.0, 2.0 * PI);
				#[allow(deprecated)]
				ctx.set_fill_style(&gradient);
				ctx.fill();
			}
		}

		fill_node(ctx, at, radius, &style, k);

		if is_hovered && t > 0.01 {
			ctx.begin_path();
			let _ = ctx.arc(at.x, at.y, radius + 2.0 / k, 0.0, 2.0 * PI);
			ctx.set_stroke_style_str(&format!("rgba(255, 255, 255, {})", 0.7 * t));
			ctx.set_line_width(1.5 / k);
			ctx.stroke();
		}

		let element = ElementRef::Node(node.id.clone());
		if interaction.element_state(&element) != ElementState::EditingLabel {
			draw_label(ctx, node, at, radius, "white", k);
		}
	}
}

/// Pulsing ring and name tag on elements other participants are editing.
fn draw_remote_editors(state: &ForceGraphState, ctx: &CanvasRenderingContext2d, k: f64) {
	let Some(sync) = state.sync() else {
		return;
	};
	let pulse = 0.5 + 0.5 * (state.flow_time * 4.0).sin();
	let local = &sync.local_user().id;

	for info in sync.active_editors() {
		if &info.user_id == local {
			continue;
		}
		let anchor = match state.graph().edge(&info.element_id) {
			Some(edge) => state
				.layout()
				.position(&edge.source)
				.zip(state.layout().position(&edge.target))
				.map(|(a, b)| (Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0), 6.0)),
			None => state
				.layout()
				.position(&info.element_id)
				.map(|p| (p, node_radius(state, &info.element_id))),
		};
		let Some((at, radius)) = anchor else {
			continue;
		};
		let color = sync
			.participants()
			.find(|p| p.id == info.user_id)
			.and_then(|p| p.color.as_deref())
			.unwrap_or("#ff6b6b");

		ctx.set_global_alpha(0.4 + 0.6 * pulse);
		ctx.begin_path();
		let _ = ctx.arc(at.x, at.y, radius + (4.0 + 3.0 * pulse) / k, 0.0, 2.0 * PI);
		ctx.set_stroke_style_str(color);
		ctx.set_line_width(2.0 / k);
		ctx.stroke();
		ctx.set_global_alpha(1.0);

		ctx.set_fill_style_str(color);
		ctx.set_font(&format!("bold {}px sans-serif", 9.0 / k.max(0.5)));
		let _ = ctx.fill_text(&info.user_name, at.x + radius + 3.0, at.y - radius - 4.0 / k);
	}
}
