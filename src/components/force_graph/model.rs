//! Validated in-memory graph and the adapter that builds it from external payloads.
//!
//! Every mutation on [`Graph`] keeps the invariant that edge endpoints exist and
//! ids are unique within nodes and within edges. Mutations that would break it
//! are rejected with a [`GraphValidationError`] and leave the graph untouched.

use std::collections::{HashMap, HashSet};

use log::{debug, warn};

use super::error::GraphValidationError;
use super::types::{
	DEFAULT_SUBGRAPH, Edge, EdgeStyle, ElementKind, ElementRef, GraphMetadata, GraphPayload, Node,
	NodeStyle, Point,
};

type Result<T> = std::result::Result<T, GraphValidationError>;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Graph {
	nodes: Vec<Node>,
	edges: Vec<Edge>,
	subgraph_counter: u32,
	metadata: Option<GraphMetadata>,
	node_index: HashMap<String, usize>,
}

/// Strict ingestion: the first problem found rejects the whole payload.
pub fn ingest(payload: GraphPayload) -> Result<Graph> {
	let (graph, mut problems) = sanitize(payload);
	if problems.is_empty() {
		Ok(graph)
	} else {
		Err(problems.swap_remove(0))
	}
}

/// Lenient ingestion: offending elements are dropped and reported.
///
/// Duplicate ids keep the first occurrence. Edges with a missing endpoint are
/// dropped so they can never be rendered pointing nowhere.
pub fn sanitize(payload: GraphPayload) -> (Graph, Vec<GraphValidationError>) {
	let mut problems = Vec::new();
	let mut graph = Graph {
		subgraph_counter: 1,
		metadata: payload.metadata,
		..Default::default()
	};

	for mut node in payload.nodes {
		if node.id.is_empty() {
			problems.push(GraphValidationError::EmptyId {
				kind: ElementKind::Node,
			});
			continue;
		}
		if graph.node_index.contains_key(&node.id) {
			problems.push(GraphValidationError::DuplicateNode(node.id));
			continue;
		}
		if node.subgraph_ids.is_empty() {
			node.subgraph_ids.push(DEFAULT_SUBGRAPH.to_string());
		}
		graph.node_index.insert(node.id.clone(), graph.nodes.len());
		graph.nodes.push(node);
	}

	let mut edge_ids = HashSet::new();
	for mut edge in payload.edges {
		if edge.id.is_empty() {
			problems.push(GraphValidationError::EmptyId {
				kind: ElementKind::Edge,
			});
			continue;
		}
		if !edge_ids.insert(edge.id.clone()) {
			problems.push(GraphValidationError::DuplicateEdge(edge.id));
			continue;
		}
		if let Some(missing) = [&edge.source, &edge.target]
			.into_iter()
			.find(|id| !graph.node_index.contains_key(id.as_str()))
		{
			problems.push(GraphValidationError::MissingEndpoint {
				edge_id: edge.id.clone(),
				node_id: missing.clone(),
			});
			continue;
		}
		if edge.subgraph_ids.is_empty() {
			edge.subgraph_ids.push(DEFAULT_SUBGRAPH.to_string());
		}
		graph.edges.push(edge);
	}

	let highest_tag = graph
		.nodes
		.iter()
		.flat_map(|n| n.subgraph_ids.iter())
		.chain(graph.edges.iter().flat_map(|e| e.subgraph_ids.iter()))
		.filter_map(|tag| subgraph_number(tag))
		.max()
		.unwrap_or(1);
	graph.subgraph_counter = payload.subgraph_counter.unwrap_or(1).max(highest_tag);

	for problem in &problems {
		warn!("dropping graph element: {problem}");
	}
	(graph, problems)
}

fn subgraph_number(tag: &str) -> Option<u32> {
	tag.strip_prefix("sg")?.parse().ok()
}

impl Graph {
	pub fn new() -> Self {
		Self {
			subgraph_counter: 1,
			..Default::default()
		}
	}

	pub fn nodes(&self) -> &[Node] {
		&self.nodes
	}

	pub fn edges(&self) -> &[Edge] {
		&self.edges
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	pub fn subgraph_counter(&self) -> u32 {
		self.subgraph_counter
	}

	/// Tag of the most recent generation pass.
	pub fn current_subgraph(&self) -> String {
		format!("sg{}", self.subgraph_counter)
	}

	pub fn metadata(&self) -> Option<&GraphMetadata> {
		self.metadata.as_ref()
	}

	pub fn node(&self, id: &str) -> Option<&Node> {
		self.node_index.get(id).map(|&i| &self.nodes[i])
	}

	pub fn edge(&self, id: &str) -> Option<&Edge> {
		self.edges.iter().find(|e| e.id == id)
	}

	pub fn contains(&self, element: &ElementRef) -> bool {
		match element {
			ElementRef::Node(id) => self.node(id).is_some(),
			ElementRef::Edge(id) => self.edge(id).is_some(),
		}
	}

	/// Ids of nodes sharing an edge with `id`.
	pub fn neighbors<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a str> + 'a {
		self.edges.iter().filter_map(move |e| {
			if e.source == id {
				Some(e.target.as_str())
			} else if e.target == id {
				Some(e.source.as_str())
			} else {
				None
			}
		})
	}

	/// Sorted list of every subgraph tag in use.
	pub fn subgraph_ids(&self) -> Vec<String> {
		let mut tags: Vec<String> = self
			.nodes
			.iter()
			.flat_map(|n| n.subgraph_ids.iter())
			.chain(self.edges.iter().flat_map(|e| e.subgraph_ids.iter()))
			.cloned()
			.collect::<HashSet<_>>()
			.into_iter()
			.collect();
		tags.sort_by_key(|t| (subgraph_number(t).unwrap_or(u32::MAX), t.clone()));
		tags
	}

	pub fn add_node(&mut self, mut node: Node) -> Result<()> {
		if node.id.is_empty() {
			return Err(GraphValidationError::EmptyId {
				kind: ElementKind::Node,
			});
		}
		if self.node_index.contains_key(&node.id) {
			return Err(GraphValidationError::DuplicateNode(node.id));
		}
		if node.subgraph_ids.is_empty() {
			node.subgraph_ids.push(self.current_subgraph());
		}
		debug!("adding node {}", node.id);
		self.node_index.insert(node.id.clone(), self.nodes.len());
		self.nodes.push(node);
		Ok(())
	}

	pub fn add_edge(&mut self, mut edge: Edge) -> Result<()> {
		if edge.id.is_empty() {
			return Err(GraphValidationError::EmptyId {
				kind: ElementKind::Edge,
			});
		}
		if self.edge(&edge.id).is_some() {
			return Err(GraphValidationError::DuplicateEdge(edge.id));
		}
		for endpoint in [&edge.source, &edge.target] {
			if self.node(endpoint).is_none() {
				return Err(GraphValidationError::MissingEndpoint {
					edge_id: edge.id.clone(),
					node_id: endpoint.clone(),
				});
			}
		}
		if edge.subgraph_ids.is_empty() {
			edge.subgraph_ids.push(self.current_subgraph());
		}
		debug!("adding edge {} ({} -> {})", edge.id, edge.source, edge.target);
		self.edges.push(edge);
		Ok(())
	}

	/// Removes a node together with every edge that references it.
	pub fn remove_node(&mut self, id: &str) -> Result<(Node, Vec<Edge>)> {
		let idx = *self
			.node_index
			.get(id)
			.ok_or_else(|| GraphValidationError::UnknownNode(id.to_string()))?;
		let node = self.nodes.remove(idx);
		let (dropped, kept): (Vec<Edge>, Vec<Edge>) =
			std::mem::take(&mut self.edges).into_iter().partition(|e| e.touches(id));
		self.edges = kept;
		self.reindex();
		debug!("removed node {id} and {} incident edges", dropped.len());
		Ok((node, dropped))
	}

	pub fn remove_edge(&mut self, id: &str) -> Result<Edge> {
		let idx = self
			.edges
			.iter()
			.position(|e| e.id == id)
			.ok_or_else(|| GraphValidationError::UnknownEdge(id.to_string()))?;
		Ok(self.edges.remove(idx))
	}

	pub fn remove(&mut self, element: &ElementRef) -> Result<()> {
		match element {
			ElementRef::Node(id) => self.remove_node(id).map(|_| ()),
			ElementRef::Edge(id) => self.remove_edge(id).map(|_| ()),
		}
	}

	/// Folds node `from` into node `into`.
	///
	/// Edges are remapped onto `into`; edges that become self loops are dropped.
	/// Subgraph tags are unioned and properties of `into` win on key conflicts.
	pub fn merge_nodes(&mut self, from: &str, into: &str) -> Result<()> {
		if from == into {
			return Ok(());
		}
		if self.node(into).is_none() {
			return Err(GraphValidationError::UnknownNode(into.to_string()));
		}
		let idx = *self
			.node_index
			.get(from)
			.ok_or_else(|| GraphValidationError::UnknownNode(from.to_string()))?;
		let absorbed = self.nodes.remove(idx);
		self.reindex();

		for edge in &mut self.edges {
			if edge.source == from {
				edge.source = into.to_string();
			}
			if edge.target == from {
				edge.target = into.to_string();
			}
		}
		self.edges.retain(|e| e.source != e.target);

		if let Some(&idx) = self.node_index.get(into) {
			let target = &mut self.nodes[idx];
			for tag in absorbed.subgraph_ids {
				if !target.subgraph_ids.contains(&tag) {
					target.subgraph_ids.push(tag);
				}
			}
			for (key, value) in absorbed.properties {
				target.properties.entry(key).or_insert(value);
			}
		}
		debug!("merged node {from} into {into}");
		Ok(())
	}

	pub fn set_label(&mut self, element: &ElementRef, label: &str) -> Result<()> {
		match element {
			ElementRef::Node(id) => {
				let idx = *self
					.node_index
					.get(id)
					.ok_or_else(|| GraphValidationError::UnknownNode(id.clone()))?;
				self.nodes[idx].label = label.to_string();
			}
			ElementRef::Edge(id) => {
				let edge = self
					.edges
					.iter_mut()
					.find(|e| &e.id == id)
					.ok_or_else(|| GraphValidationError::UnknownEdge(id.clone()))?;
				edge.label = label.to_string();
			}
		}
		Ok(())
	}

	pub fn set_position(&mut self, id: &str, position: Point) -> Result<()> {
		let idx = *self
			.node_index
			.get(id)
			.ok_or_else(|| GraphValidationError::UnknownNode(id.to_string()))?;
		let node = &mut self.nodes[idx];
		node.x = Some(position.x);
		node.y = Some(position.y);
		Ok(())
	}

	/// Mutable access to a node's style override, created empty when absent.
	pub fn node_style_mut(&mut self, id: &str) -> Result<&mut NodeStyle> {
		let idx = *self
			.node_index
			.get(id)
			.ok_or_else(|| GraphValidationError::UnknownNode(id.to_string()))?;
		Ok(self.nodes[idx].style.get_or_insert_with(NodeStyle::default))
	}

	pub fn edge_style_mut(&mut self, id: &str) -> Result<&mut EdgeStyle> {
		let edge = self
			.edges
			.iter_mut()
			.find(|e| e.id == id)
			.ok_or_else(|| GraphValidationError::UnknownEdge(id.to_string()))?;
		Ok(edge.style.get_or_insert_with(EdgeStyle::default))
	}

	/// Merges a freshly generated payload into this graph as a new subgraph.
	///
	/// Known node ids are re-tagged rather than duplicated. The merge is atomic:
	/// on error the graph is unchanged. Returns the new subgraph tag.
	pub fn merge_payload(&mut self, payload: GraphPayload) -> Result<String> {
		let mut next = self.clone();
		next.subgraph_counter += 1;
		let tag = next.current_subgraph();

		for mut node in payload.nodes {
			match next.node_index.get(&node.id) {
				Some(&idx) => {
					let existing = &mut next.nodes[idx];
					if !existing.subgraph_ids.contains(&tag) {
						existing.subgraph_ids.push(tag.clone());
					}
					if existing.label.is_empty() {
						existing.label = node.label;
					}
					for (key, value) in node.properties {
						existing.properties.insert(key, value);
					}
				}
				None => {
					node.subgraph_ids = vec![tag.clone()];
					next.add_node(node)?;
				}
			}
		}

		for mut edge in payload.edges {
			if let Some(existing) = next.edges.iter_mut().find(|e| e.id == edge.id) {
				if !existing.subgraph_ids.contains(&tag) {
					existing.subgraph_ids.push(tag.clone());
				}
				continue;
			}
			edge.subgraph_ids = vec![tag.clone()];
			next.add_edge(edge)?;
		}

		if payload.metadata.is_some() {
			next.metadata = payload.metadata;
		}
		*self = next;
		Ok(tag)
	}

	/// Checks the full invariant. Mutations maintain it; this exists for
	/// debug assertions and tests.
	pub fn validate(&self) -> Result<()> {
		let mut seen = HashSet::new();
		for node in &self.nodes {
			if !seen.insert(node.id.as_str()) {
				return Err(GraphValidationError::DuplicateNode(node.id.clone()));
			}
		}
		let mut edge_ids = HashSet::new();
		for edge in &self.edges {
			if !edge_ids.insert(edge.id.as_str()) {
				return Err(GraphValidationError::DuplicateEdge(edge.id.clone()));
			}
			for endpoint in [&edge.source, &edge.target] {
				if !seen.contains(endpoint.as_str()) {
					return Err(GraphValidationError::MissingEndpoint {
						edge_id: edge.id.clone(),
						node_id: endpoint.clone(),
					});
				}
			}
		}
		Ok(())
	}

	pub fn to_payload(&self) -> GraphPayload {
		GraphPayload {
			nodes: self.nodes.clone(),
			edges: self.edges.clone(),
			subgraph_counter: Some(self.subgraph_counter),
			metadata: self.metadata.clone(),
		}
	}

	fn reindex(&mut self) {
		self.node_index = self
			.nodes
			.iter()
			.enumerate()
			.map(|(i, n)| (n.id.clone(), i))
			.collect();
	}
}
