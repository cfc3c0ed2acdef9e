//! Visual overrides and subgraph emphasis layered over the graph.
//!
//! Overrides live in the optional `style` field of each element; the semantic
//! `properties` bag is never touched. Emphasis is render-only state.

use std::collections::HashMap;

use super::error::GraphValidationError;
use super::model::Graph;
use super::types::{EdgeStyle, ElementRef, NodeStyle};

const TYPE_COLORS: &[(&str, &str)] = &[
	("person", "#1f77b4"),
	("organization", "#ff7f0e"),
	("location", "#2ca02c"),
	("event", "#d62728"),
	("concept", "#9467bd"),
	("document", "#8c564b"),
	("technology", "#e377c2"),
	("date", "#bcbd22"),
	("product", "#17becf"),
];

pub const DEFAULT_NODE_COLOR: &str = "#7f7f7f";
pub const DEFAULT_EDGE_COLOR: &str = "rgba(100, 180, 255, 0.6)";
pub const DEFAULT_NODE_SIZE: f64 = 8.0;
pub const DEFAULT_EDGE_WIDTH: f64 = 1.5;
pub const DEFAULT_ARROW_SIZE: f64 = 8.0;

/// Fully resolved node style, ready for drawing.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedNodeStyle {
	pub color: String,
	pub size: f64,
	pub border_color: Option<String>,
	pub border_width: f64,
	pub pinned: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedEdgeStyle {
	pub color: String,
	pub width: f64,
	pub dashed: bool,
	pub arrow_size: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Emphasis {
	#[default]
	Normal,
	Emphasized,
	Dimmed,
}

/// Color for a node type; case-insensitive, unknown types get the fallback.
pub fn type_color(node_type: &str) -> &'static str {
	let key = node_type.to_ascii_lowercase();
	TYPE_COLORS
		.iter()
		.find(|(t, _)| *t == key)
		.map(|(_, c)| *c)
		.unwrap_or(DEFAULT_NODE_COLOR)
}

#[derive(Clone, Debug, Default)]
pub struct StyleOverlay {
	highlighted: Option<String>,
	emphasis: HashMap<ElementRef, Emphasis>,
}

impl StyleOverlay {
	pub fn new() -> Self {
		Self::default()
	}

	/// Merges a partial override into the node's style.
	pub fn set_node_style(
		&self,
		graph: &mut Graph,
		id: &str,
		patch: &NodeStyle,
	) -> Result<(), GraphValidationError> {
		graph.node_style_mut(id)?.merge(patch);
		Ok(())
	}

	pub fn set_edge_style(
		&self,
		graph: &mut Graph,
		id: &str,
		patch: &EdgeStyle,
	) -> Result<(), GraphValidationError> {
		graph.edge_style_mut(id)?.merge(patch);
		Ok(())
	}

	pub fn node_style(&self, graph: &Graph, id: &str) -> Option<ResolvedNodeStyle> {
		let node = graph.node(id)?;
		let style = node.style.clone().unwrap_or_default();
		Some(ResolvedNodeStyle {
			color: style
				.color
				.unwrap_or_else(|| type_color(&node.node_type).to_string()),
			size: style.size.unwrap_or(DEFAULT_NODE_SIZE),
			border_color: style.border_color,
			border_width: style.border_width.unwrap_or(0.0),
			pinned: style.pinned.unwrap_or(false),
		})
	}

	pub fn edge_style(&self, graph: &Graph, id: &str) -> Option<ResolvedEdgeStyle> {
		let edge = graph.edge(id)?;
		let style = edge.style.clone().unwrap_or_default();
		Some(ResolvedEdgeStyle {
			color: style.color.unwrap_or_else(|| DEFAULT_EDGE_COLOR.to_string()),
			width: style.width.unwrap_or(DEFAULT_EDGE_WIDTH),
			dashed: style.dashed.unwrap_or(false),
			arrow_size: style.arrow_size.unwrap_or(DEFAULT_ARROW_SIZE),
		})
	}

	/// Emphasizes every element tagged with `subgraph`, dims the rest.
	/// `None` clears all emphasis.
	pub fn highlight_subgraph(&mut self, graph: &Graph, subgraph: Option<&str>) {
		self.emphasis.clear();
		self.highlighted = subgraph.map(str::to_string);
		let Some(tag) = subgraph else {
			return;
		};
		let mark = |tags: &[String]| {
			if tags.iter().any(|t| t == tag) {
				Emphasis::Emphasized
			} else {
				Emphasis::Dimmed
			}
		};
		for node in graph.nodes() {
			self.emphasis
				.insert(ElementRef::Node(node.id.clone()), mark(node.subgraph_ids.as_slice()));
		}
		for edge in graph.edges() {
			self.emphasis
				.insert(ElementRef::Edge(edge.id.clone()), mark(edge.subgraph_ids.as_slice()));
		}
	}

	/// Recomputes emphasis after the graph changed underneath the overlay.
	pub fn refresh(&mut self, graph: &Graph) {
		let current = self.highlighted.take();
		self.highlight_subgraph(graph, current.as_deref());
	}

	pub fn highlighted_subgraph(&self) -> Option<&str> {
		self.highlighted.as_deref()
	}

	pub fn emphasis(&self, element: &ElementRef) -> Emphasis {
		self.emphasis.get(element).copied().unwrap_or_default()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::model::ingest;
	use crate::components::force_graph::types::{Edge, GraphPayload, Node};

	fn graph() -> Graph {
		let mut a = Node::new("a", "Ada", "Person");
		a.properties.insert("born".into(), 1815.into());
		let mut b = Node::new("b", "Engine", "Technology");
		b.subgraph_ids = vec!["sg2".into()];
		let c = Node::new("c", "Thing", "Gizmo");
		ingest(GraphPayload {
			nodes: vec![a, b, c],
			edges: vec![Edge::new("ab", "a", "b", "designed")],
			..Default::default()
		})
		.unwrap()
	}

	#[test]
	fn defaults_come_from_node_type() {
		let g = graph();
		let overlay = StyleOverlay::new();
		assert_eq!(overlay.node_style(&g, "a").unwrap().color, "#1f77b4");
		assert_eq!(overlay.node_style(&g, "c").unwrap().color, DEFAULT_NODE_COLOR);
		let edge = overlay.edge_style(&g, "ab").unwrap();
		assert!(!edge.dashed);
		assert_eq!(edge.arrow_size, DEFAULT_ARROW_SIZE);
	}

	#[test]
	fn partial_overrides_merge_and_leave_properties_alone() {
		let mut g = graph();
		let overlay = StyleOverlay::new();
		let props_before = g.node("a").unwrap().properties.clone();
		overlay
			.set_node_style(&mut g, "a", &NodeStyle {
				color: Some("#000000".into()),
				..Default::default()
			})
			.unwrap();
		overlay
			.set_node_style(&mut g, "a", &NodeStyle {
				size: Some(20.0),
				..Default::default()
			})
			.unwrap();
		let resolved = overlay.node_style(&g, "a").unwrap();
		assert_eq!(resolved.color, "#000000");
		assert_eq!(resolved.size, 20.0);
		assert_eq!(g.node("a").unwrap().properties, props_before);

		overlay
			.set_edge_style(&mut g, "ab", &EdgeStyle {
				dashed: Some(true),
				..Default::default()
			})
			.unwrap();
		assert!(overlay.edge_style(&g, "ab").unwrap().dashed);
		assert!(overlay.set_edge_style(&mut g, "nope", &EdgeStyle::default()).is_err());
	}

	#[test]
	fn highlight_then_clear_restores_normal_emphasis() {
		let g = graph();
		let mut overlay = StyleOverlay::new();
		let all: Vec<ElementRef> = ["a", "b", "c"]
			.iter()
			.map(|id| ElementRef::Node(id.to_string()))
			.chain([ElementRef::Edge("ab".into())])
			.collect();
		let before: Vec<Emphasis> = all.iter().map(|e| overlay.emphasis(e)).collect();

		overlay.highlight_subgraph(&g, Some("sg2"));
		assert_eq!(overlay.emphasis(&all[1]), Emphasis::Emphasized);
		assert_eq!(overlay.emphasis(&all[0]), Emphasis::Dimmed);
		assert_eq!(overlay.emphasis(&all[3]), Emphasis::Dimmed);

		overlay.highlight_subgraph(&g, None);
		let after: Vec<Emphasis> = all.iter().map(|e| overlay.emphasis(e)).collect();
		assert_eq!(before, after);
		assert!(overlay.highlighted_subgraph().is_none());
	}
}
