//! Export of the current graph.
//!
//! Image formats are produced client-side from the laid-out graph; every other
//! format is handed to an external converter as a JSON payload.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use super::layout::ForceLayout;
use super::model::Graph;
use super::style::{DEFAULT_NODE_SIZE, StyleOverlay, type_color};
use super::types::{Bounds, GraphPayload, Point, Size};
use super::viewport::ViewTransform;

/// Margin around the graph in exported images.
pub const EXPORT_PADDING: f64 = 40.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
	Png,
	Svg,
	Json,
	Csv,
	Graphml,
	Gexf,
}

impl ExportFormat {
	pub fn is_image(self) -> bool {
		matches!(self, ExportFormat::Png | ExportFormat::Svg)
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
	pub format: ExportFormat,
	pub include_properties: bool,
	pub include_styles: bool,
}

/// Canvas size and transform for drawing a detached raster copy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RasterPlan {
	pub size: Size,
	pub transform: ViewTransform,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExportArtifact {
	Svg(String),
	/// Drawn by the browser onto a hidden canvas.
	Raster(RasterPlan),
	Delegated(GraphPayload),
}

/// Snapshot for external converters, stripped according to the request flags.
pub fn export_payload(graph: &Graph, request: &ExportRequest) -> GraphPayload {
	let mut payload = graph.to_payload();
	for node in &mut payload.nodes {
		if !request.include_properties {
			node.properties.clear();
		}
		if !request.include_styles {
			node.style = None;
		}
	}
	for edge in &mut payload.edges {
		if !request.include_properties {
			edge.properties.clear();
		}
		if !request.include_styles {
			edge.style = None;
		}
	}
	payload
}

/// Image frame covering every node plus padding, at scale 1.
pub fn raster_plan(layout: &ForceLayout) -> RasterPlan {
	let bounds = layout.bounds().unwrap_or(Bounds {
		min_x: 0.0,
		min_y: 0.0,
		max_x: 0.0,
		max_y: 0.0,
	});
	RasterPlan {
		size: Size::new(
			bounds.width() + 2.0 * EXPORT_PADDING,
			bounds.height() + 2.0 * EXPORT_PADDING,
		),
		transform: ViewTransform {
			x: EXPORT_PADDING - bounds.min_x,
			y: EXPORT_PADDING - bounds.min_y,
			k: 1.0,
		},
	}
}

fn escape(text: &str) -> String {
	let mut out = String::with_capacity(text.len());
	for c in text.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' => out.push_str("&quot;"),
			'\'' => out.push_str("&#39;"),
			_ => out.push(c),
		}
	}
	out
}

/// Standalone SVG document of the current layout.
pub fn render_svg(
	graph: &Graph,
	layout: &ForceLayout,
	overlay: &StyleOverlay,
	include_styles: bool,
) -> String {
	let plan = raster_plan(layout);
	let t = plan.transform;
	let at = |id: &str| {
		layout
			.position(id)
			.map(|p| Point::new(p.x + t.x, p.y + t.y))
	};
	let mut svg = String::new();
	let _ = writeln!(
		svg,
		r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.2} {h:.2}">"#,
		w = plan.size.width,
		h = plan.size.height,
	);
	svg.push_str(
		"<defs><marker id=\"arrow\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"6\" markerHeight=\"6\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"context-stroke\"/></marker></defs>\n",
	);

	for edge in graph.edges() {
		let (Some(a), Some(b)) = (at(&edge.source), at(&edge.target)) else {
			continue;
		};
		let (color, width, dash) = match (include_styles, overlay.edge_style(graph, &edge.id)) {
			(true, Some(s)) => (s.color, s.width, s.dashed),
			_ => ("#64b4ff".to_string(), 1.5, false),
		};
		let _ = writeln!(
			svg,
			r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}" stroke-width="{:.2}"{} marker-end="url(#arrow)"/>"#,
			a.x,
			a.y,
			b.x,
			b.y,
			escape(&color),
			width,
			if dash { r#" stroke-dasharray="8 4""# } else { "" },
		);
		if !edge.label.is_empty() {
			let _ = writeln!(
				svg,
				r##"<text x="{:.2}" y="{:.2}" font-size="9" text-anchor="middle" fill="#555">{}</text>"##,
				(a.x + b.x) / 2.0,
				(a.y + b.y) / 2.0,
				escape(&edge.label),
			);
		}
	}

	for node in graph.nodes() {
		let (Some(p), Some(style)) = (at(&node.id), overlay.node_style(graph, &node.id)) else {
			continue;
		};
		let border = match (&style.border_color, include_styles) {
			(Some(c), true) if style.border_width > 0.0 => format!(
				r#" stroke="{}" stroke-width="{:.2}""#,
				escape(c),
				style.border_width
			),
			_ => String::new(),
		};
		let (radius, color) = if include_styles {
			(style.size, style.color)
		} else {
			(DEFAULT_NODE_SIZE, type_color(&node.node_type).to_string())
		};
		let _ = writeln!(
			svg,
			r#"<circle cx="{:.2}" cy="{:.2}" r="{:.2}" fill="{}"{}/>"#,
			p.x,
			p.y,
			radius,
			escape(&color),
			border,
		);
		let _ = writeln!(
			svg,
			r##"<text x="{:.2}" y="{:.2}" font-size="10" fill="#222">{}</text>"##,
			p.x + radius + 3.0,
			p.y + 3.0,
			escape(&node.label),
		);
	}
	svg.push_str("</svg>\n");
	svg
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::layout::LayoutSettings;
	use crate::components::force_graph::model::ingest;
	use crate::components::force_graph::types::{Edge, EdgeStyle, Node, NodeStyle};

	fn graph() -> Graph {
		let mut a = Node::new("a", "Tom & Jerry", "Person");
		a.properties.insert("age".into(), 3.into());
		a.style = Some(NodeStyle {
			color: Some("#123456".into()),
			..Default::default()
		});
		let mut e = Edge::new("ab", "a", "b", "chases");
		e.style = Some(EdgeStyle {
			dashed: Some(true),
			..Default::default()
		});
		ingest(GraphPayload {
			nodes: vec![a, Node::new("b", "<b>", "Person")],
			edges: vec![e],
			..Default::default()
		})
		.unwrap()
	}

	fn layout(graph: &Graph) -> ForceLayout {
		let mut layout = ForceLayout::new(LayoutSettings::default(), Point::default());
		layout.start(graph, LayoutSettings::default()).unwrap();
		layout
	}

	#[test]
	fn payload_respects_include_flags() {
		let g = graph();
		let bare = export_payload(&g, &ExportRequest {
			format: ExportFormat::Json,
			include_properties: false,
			include_styles: false,
		});
		assert!(bare.nodes[0].properties.is_empty());
		assert!(bare.nodes[0].style.is_none());
		assert!(bare.edges[0].style.is_none());

		let full = export_payload(&g, &ExportRequest {
			format: ExportFormat::Csv,
			include_properties: true,
			include_styles: true,
		});
		assert_eq!(full.nodes[0].properties["age"], 3);
		assert!(full.edges[0].style.is_some());
	}

	#[test]
	fn svg_contains_escaped_labels_and_styles() {
		let g = graph();
		let svg = render_svg(&g, &layout(&g), &StyleOverlay::new(), true);
		assert!(svg.starts_with("<svg"));
		assert!(svg.contains("Tom &amp; Jerry"));
		assert!(svg.contains("&lt;b&gt;"));
		assert!(svg.contains("#123456"));
		assert!(svg.contains("stroke-dasharray"));
		assert_eq!(svg.matches("<circle").count(), 2);

		let plain = render_svg(&g, &layout(&g), &StyleOverlay::new(), false);
		assert!(!plain.contains("#123456"));
		assert!(!plain.contains("stroke-dasharray"));
	}

	#[test]
	fn raster_plan_frames_every_node() {
		let g = graph();
		let l = layout(&g);
		let plan = raster_plan(&l);
		for (_, p) in l.positions() {
			let x = p.x * plan.transform.k + plan.transform.x;
			let y = p.y * plan.transform.k + plan.transform.y;
			assert!(x >= 0.0 && x <= plan.size.width);
			assert!(y >= 0.0 && y <= plan.size.height);
		}
		assert!(ExportFormat::Png.is_image());
		assert!(!ExportFormat::Graphml.is_image());
	}
}
