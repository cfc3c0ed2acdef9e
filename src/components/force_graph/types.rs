use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form key/value bag attached to nodes and edges.
pub type Properties = BTreeMap<String, Value>;

/// Subgraph tag given to elements that arrive without one.
pub const DEFAULT_SUBGRAPH: &str = "sg1";

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
	pub x: f64,
	pub y: f64,
}

impl Point {
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	pub fn distance(&self, other: Point) -> f64 {
		((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
	pub width: f64,
	pub height: f64,
}

impl Size {
	pub const fn new(width: f64, height: f64) -> Self {
		Self { width, height }
	}

	pub fn center(&self) -> Point {
		Point::new(self.width / 2.0, self.height / 2.0)
	}
}

/// Axis-aligned box in graph coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
	pub min_x: f64,
	pub min_y: f64,
	pub max_x: f64,
	pub max_y: f64,
}

impl Bounds {
	pub fn from_points(points: impl IntoIterator<Item = Point>) -> Option<Self> {
		points.into_iter().fold(None, |acc, p| {
			Some(match acc {
				None => Bounds {
					min_x: p.x,
					min_y: p.y,
					max_x: p.x,
					max_y: p.y,
				},
				Some(b) => Bounds {
					min_x: b.min_x.min(p.x),
					min_y: b.min_y.min(p.y),
					max_x: b.max_x.max(p.x),
					max_y: b.max_y.max(p.y),
				},
			})
		})
	}

	pub fn width(&self) -> f64 {
		self.max_x - self.min_x
	}

	pub fn height(&self) -> f64 {
		self.max_y - self.min_y
	}

	pub fn center(&self) -> Point {
		Point::new(
			(self.min_x + self.max_x) / 2.0,
			(self.min_y + self.max_y) / 2.0,
		)
	}
}

/// Partial visual override for a node. `None` fields fall back to the type default.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStyle {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub color: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub size: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub border_color: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub border_width: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub pinned: Option<bool>,
}

impl NodeStyle {
	/// Overlay every field set in `patch` onto `self`.
	pub fn merge(&mut self, patch: &NodeStyle) {
		if patch.color.is_some() {
			self.color.clone_from(&patch.color);
		}
		if patch.size.is_some() {
			self.size = patch.size;
		}
		if patch.border_color.is_some() {
			self.border_color.clone_from(&patch.border_color);
		}
		if patch.border_width.is_some() {
			self.border_width = patch.border_width;
		}
		if patch.pinned.is_some() {
			self.pinned = patch.pinned;
		}
	}
}

/// Partial visual override for an edge.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeStyle {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub color: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub width: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub dashed: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub arrow_size: Option<f64>,
}

impl EdgeStyle {
	pub fn merge(&mut self, patch: &EdgeStyle) {
		if patch.color.is_some() {
			self.color.clone_from(&patch.color);
		}
		if patch.width.is_some() {
			self.width = patch.width;
		}
		if patch.dashed.is_some() {
			self.dashed = patch.dashed;
		}
		if patch.arrow_size.is_some() {
			self.arrow_size = patch.arrow_size;
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
	pub id: String,
	#[serde(default)]
	pub label: String,
	#[serde(default, rename = "type")]
	pub node_type: String,
	#[serde(default)]
	pub properties: Properties,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub x: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub y: Option<f64>,
	#[serde(default)]
	pub subgraph_ids: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub style: Option<NodeStyle>,
}

impl Node {
	pub fn new(id: impl Into<String>, label: impl Into<String>, node_type: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			label: label.into(),
			node_type: node_type.into(),
			..Default::default()
		}
	}

	pub fn position(&self) -> Option<Point> {
		match (self.x, self.y) {
			(Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some(Point::new(x, y)),
			_ => None,
		}
	}

	pub fn is_pinned(&self) -> bool {
		self.style.as_ref().and_then(|s| s.pinned).unwrap_or(false)
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
	pub id: String,
	pub source: String,
	pub target: String,
	#[serde(default)]
	pub label: String,
	#[serde(default)]
	pub properties: Properties,
	#[serde(default)]
	pub subgraph_ids: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub style: Option<EdgeStyle>,
}

impl Edge {
	pub fn new(
		id: impl Into<String>,
		source: impl Into<String>,
		target: impl Into<String>,
		label: impl Into<String>,
	) -> Self {
		Self {
			id: id.into(),
			source: source.into(),
			target: target.into(),
			label: label.into(),
			..Default::default()
		}
	}

	pub fn touches(&self, node_id: &str) -> bool {
		self.source == node_id || self.target == node_id
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphMetadata {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub source_text: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub generated_at: Option<String>,
	#[serde(flatten)]
	pub extra: BTreeMap<String, Value>,
}

/// Graph as supplied by (and handed back to) external collaborators.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphPayload {
	#[serde(default)]
	pub nodes: Vec<Node>,
	#[serde(default)]
	pub edges: Vec<Edge>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub subgraph_counter: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub metadata: Option<GraphMetadata>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
	Node,
	Edge,
}

/// Id-only reference to a graph element.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ElementRef {
	Node(String),
	Edge(String),
}

impl ElementRef {
	pub fn id(&self) -> &str {
		match self {
			ElementRef::Node(id) | ElementRef::Edge(id) => id,
		}
	}

	pub fn kind(&self) -> ElementKind {
		match self {
			ElementRef::Node(_) => ElementKind::Node,
			ElementRef::Edge(_) => ElementKind::Edge,
		}
	}
}

/// Snapshot of a graph element handed to selection listeners.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Element {
	Node(Node),
	Edge(Edge),
}

impl Element {
	pub fn element_ref(&self) -> ElementRef {
		match self {
			Element::Node(n) => ElementRef::Node(n.id.clone()),
			Element::Edge(e) => ElementRef::Edge(e.id.clone()),
		}
	}

	pub fn label(&self) -> &str {
		match self {
			Element::Node(n) => &n.label,
			Element::Edge(e) => &e.label,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn payload_uses_camel_case_and_type_key() {
		let json = r#"{
			"nodes": [{"id": "n1", "label": "Ada", "type": "Person", "subgraphIds": ["sg2"]}],
			"edges": [],
			"subgraphCounter": 2
		}"#;
		let payload: GraphPayload = serde_json::from_str(json).unwrap();
		assert_eq!(payload.nodes[0].node_type, "Person");
		assert_eq!(payload.nodes[0].subgraph_ids, vec!["sg2".to_string()]);
		assert_eq!(payload.subgraph_counter, Some(2));
		assert!(payload.nodes[0].position().is_none());
	}

	#[test]
	fn element_is_tagged_by_kind() {
		let el = Element::Edge(Edge::new("e1", "a", "b", "knows"));
		let json = serde_json::to_value(&el).unwrap();
		assert_eq!(json["kind"], "edge");
		assert_eq!(json["source"], "a");

		let r: ElementRef = serde_json::from_str(r#"{"kind":"node","id":"n1"}"#).unwrap();
		assert_eq!(r, ElementRef::Node("n1".into()));
	}

	#[test]
	fn style_merge_only_overwrites_set_fields() {
		let mut style = NodeStyle {
			color: Some("#fff".into()),
			size: Some(8.0),
			..Default::default()
		};
		style.merge(&NodeStyle {
			size: Some(12.0),
			pinned: Some(true),
			..Default::default()
		});
		assert_eq!(style.color.as_deref(), Some("#fff"));
		assert_eq!(style.size, Some(12.0));
		assert_eq!(style.pinned, Some(true));
	}

	#[test]
	fn bounds_cover_all_points() {
		let b = Bounds::from_points([Point::new(1.0, 5.0), Point::new(-3.0, 2.0)]).unwrap();
		assert_eq!((b.min_x, b.max_x, b.min_y, b.max_y), (-3.0, 1.0, 2.0, 5.0));
		assert_eq!(b.center(), Point::new(-1.0, 3.5));
		assert!(Bounds::from_points(Vec::new()).is_none());
	}
}
