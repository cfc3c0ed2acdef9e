use std::collections::HashSet;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::error::{CanvasError, SyncError};
use super::events::{CanvasEvent, ElementStyle, EventBus, Subscription};
use super::export::{ExportArtifact, ExportFormat, ExportRequest, export_payload, raster_plan, render_svg};
use super::interaction::{self, Interaction, InteractionConfig, InteractionEvent, Key, LabelEdit};
use super::layout::{ForceLayout, LayoutSettings, TickStatus};
use super::model::{Graph, ingest};
use super::style::StyleOverlay;
use super::sync::{Inbound, SyncBridge, SyncMessage};
use super::types::{Edge, EdgeStyle, Element, ElementRef, GraphPayload, Node, NodeStyle, Point, Size};
use super::viewport::{ViewTransform, Viewport, ViewportConfig, ZoomDirection};

/// Host-supplied configuration, deserializable from camelCase JSON.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CanvasConfig {
	pub layout: LayoutSettings,
	pub viewport: ViewportConfig,
	pub interaction: InteractionConfig,
}

#[derive(Clone, Debug, Default)]
pub struct HoverState {
	pub node: Option<String>,
	pub neighbors: HashSet<String>,
	pub highlight_t: f64,
	pub prev_node: Option<String>,
	pub prev_neighbors: HashSet<String>,
	delay_t: f64,
}

/// The live canvas: graph, simulation, view and interaction in one owned value.
///
/// Every mutation goes through `&mut self`, so user input, simulation steps and
/// remote updates are applied one after another, never interleaved within a tick.
pub struct ForceGraphState {
	graph: Graph,
	layout: ForceLayout,
	viewport: Viewport,
	interaction: Interaction,
	overlay: StyleOverlay,
	sync: Option<SyncBridge>,
	events: EventBus<CanvasEvent>,
	pub hover: HoverState,
	pub flow_time: f64,
}

impl ForceGraphState {
	pub fn new(payload: GraphPayload, size: Size, config: CanvasConfig) -> Result<Self, CanvasError> {
		let graph = ingest(payload)?;
		let viewport = Viewport::new(size, config.viewport.validated()?);
		let mut layout = ForceLayout::new(config.layout, viewport.layout_center());
		layout.start(&graph, config.layout)?;
		info!(
			"canvas created with {} nodes and {} edges",
			graph.nodes().len(),
			graph.edges().len()
		);
		Ok(Self {
			graph,
			layout,
			viewport,
			interaction: Interaction::new(config.interaction),
			overlay: StyleOverlay::new(),
			sync: None,
			events: EventBus::new(),
			hover: HoverState::default(),
			flow_time: 0.0,
		})
	}

	pub fn graph(&self) -> &Graph {
		&self.graph
	}

	pub fn layout(&self) -> &ForceLayout {
		&self.layout
	}

	pub fn viewport(&self) -> &Viewport {
		&self.viewport
	}

	pub fn transform(&self) -> ViewTransform {
		self.viewport.transform()
	}

	pub fn interaction(&self) -> &Interaction {
		&self.interaction
	}

	pub fn overlay(&self) -> &StyleOverlay {
		&self.overlay
	}

	pub fn sync(&self) -> Option<&SyncBridge> {
		self.sync.as_ref()
	}

	pub fn subscribe(&self, listener: impl Fn(&CanvasEvent) + 'static) -> Subscription {
		self.events.subscribe(listener)
	}

	pub fn tick(&mut self, dt: f64) -> TickStatus {
		let status = self.layout.tick();
		if status != TickStatus::Idle {
			for (id, p) in self.layout.positions() {
				self.graph.set_position(id, p).ok();
			}
			self.events.emit(&CanvasEvent::LayoutUpdated(status));
		}
		self.flow_time += dt;

		let (target, delay, speed) = if self.hover.node.is_some() {
			(1.0, 0.08, 1.8)
		} else {
			(0.0, 0.0, 1.26)
		};

		if self.hover.node.is_some() {
			self.hover.delay_t = (self.hover.delay_t + dt).min(delay);
			if self.hover.delay_t >= delay {
				self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt;
			}
		} else {
			self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt;
			if self.hover.highlight_t < 0.01 {
				self.hover.highlight_t = 0.0;
				self.hover.prev_node = None;
				self.hover.prev_neighbors.clear();
			}
		}
		status
	}

	pub fn update_settings(&mut self, settings: LayoutSettings) -> Result<(), CanvasError> {
		self.layout.update_settings(settings)?;
		self.layout.restart();
		Ok(())
	}

	pub fn restart(&mut self) {
		self.layout.restart();
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.viewport.resize(Size::new(width, height));
		if self.viewport.config().auto_fit {
			self.fit_to_view();
		}
	}

	pub fn fit_to_view(&mut self) -> Option<ViewTransform> {
		let bounds = self.layout.bounds()?;
		let size = self.viewport.size();
		self.viewport.fit_to_view(bounds, size)
	}

	pub fn zoom(&mut self, direction: ZoomDirection) -> ViewTransform {
		self.viewport.zoom(direction)
	}

	/// Wheel zoom about the cursor.
	pub fn wheel(&mut self, screen: Point, delta_y: f64) -> ViewTransform {
		let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
		self.viewport.zoom_at(screen, factor)
	}

	pub fn set_custom_center(&mut self, center: Option<Point>) {
		self.viewport.set_custom_center(center);
		self.layout.set_center(self.viewport.layout_center());
		self.layout.restart();
	}

	pub fn element_at(&self, screen: Point) -> Option<ElementRef> {
		interaction::hit_test(
			&self.graph,
			&self.layout,
			&self.viewport,
			self.interaction.config(),
			screen,
		)
	}

	pub fn pointer_down(&mut self, screen: Point) {
		let hit = self.element_at(screen);
		let events = self
			.interaction
			.pointer_down(screen, hit, &self.viewport, &self.layout);
		self.apply(events);
	}

	pub fn pointer_move(&mut self, screen: Point) {
		let hit = if self.interaction.is_dragging() {
			None
		} else {
			self.element_at(screen)
		};
		let events =
			self.interaction
				.pointer_move(screen, hit, &mut self.viewport, &mut self.layout);
		self.apply(events);
	}

	pub fn pointer_up(&mut self) {
		let events = self.interaction.pointer_up(&mut self.layout);
		self.apply(events);
	}

	pub fn pointer_leave(&mut self) {
		let events = self.interaction.pointer_leave(&mut self.layout);
		self.apply(events);
	}

	pub fn key(&mut self, key: Key) {
		let events = self.interaction.key(key, &mut self.viewport);
		self.apply(events);
	}

	/// Opens the inline label editor on the element under `screen`, if any.
	pub fn double_click(&mut self, screen: Point) {
		if let Some(element) = self.element_at(screen) {
			self.label_click(element);
		}
	}

	pub fn label_click(&mut self, element: ElementRef) {
		let current = match &element {
			ElementRef::Node(id) => self.graph.node(id).map(|n| n.label.clone()),
			ElementRef::Edge(id) => self.graph.edge(id).map(|e| e.label.clone()),
		};
		if let Some(current) = current {
			let events = self.interaction.begin_label_edit(element, &current);
			self.apply(events);
		}
	}

	pub fn update_draft(&mut self, text: &str) {
		self.interaction.update_draft(text);
	}

	pub fn blur(&mut self) {
		let events = self.interaction.blur();
		self.apply(events);
	}

	/// Active label edit and the screen point to anchor the editor at.
	pub fn editing_anchor(&self) -> Option<(&LabelEdit, Point)> {
		let edit = self.interaction.editing()?;
		let at = match &edit.element {
			ElementRef::Node(id) => self.layout.position(id)?,
			ElementRef::Edge(id) => {
				let edge = self.graph.edge(id)?;
				let (a, b) = (
					self.layout.position(&edge.source)?,
					self.layout.position(&edge.target)?,
				);
				Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
			}
		};
		Some((edit, self.viewport.graph_to_screen(at)))
	}

	fn apply(&mut self, events: Vec<InteractionEvent>) {
		for event in events {
			match event {
				InteractionEvent::HoverChanged(hover) => {
					let node = match hover {
						Some(ElementRef::Node(id)) => Some(id),
						_ => None,
					};
					self.set_hover(node);
				}
				InteractionEvent::Selected(element) => self.notify_selected(&element),
				InteractionEvent::Deselected => self.events.emit(&CanvasEvent::Deselected),
				InteractionEvent::DragStarted { .. } | InteractionEvent::ViewChanged(_) => {}
				InteractionEvent::NodeMoved { node, position } => {
					self.graph.set_position(&node, position).ok();
					self.commit_local(false);
				}
				InteractionEvent::DragEnded {
					node,
					position,
					keep_pinned,
				} => {
					// A remote graph held back during the drag lands first, the drop on top of it
					if let Some(graph) = self.sync.as_mut().and_then(SyncBridge::take_pending_graph) {
						self.apply_remote_graph(graph);
					}
					if self.graph.set_position(&node, position).is_ok() {
						self.layout.pin(&node, position.x, position.y);
						if !keep_pinned {
							self.layout.unpin(&node);
						}
					}
					if let Ok(style) = self.graph.node_style_mut(&node) {
						style.pinned = Some(keep_pinned);
					}
					self.commit_local(false);
				}
				InteractionEvent::FitRequested => {
					self.fit_to_view();
				}
				InteractionEvent::DeleteRequested(element) => {
					if let Some(node) = self.interaction.cancel_drag(&mut self.layout) {
						debug!("drag on {node} cancelled by delete");
						if let Some(graph) = self.sync.as_mut().and_then(SyncBridge::take_pending_graph) {
							self.apply_remote_graph(graph);
						}
					}
					if !self.graph.contains(&element) {
						continue;
					}
					if let Err(err) = self.remove_element(&element) {
						self.notice(format!("could not delete: {err}"));
					}
				}
				InteractionEvent::EditingStarted(element) => {
					self.with_sync(|sync| sync.start_editing(&element));
					self.events.emit(&CanvasEvent::EditingStarted(element));
				}
				InteractionEvent::EditingEnded { element, label } => {
					let committed = label.is_some();
					if let Some(label) = label {
						match self.graph.set_label(&element, &label) {
							Ok(()) => self.commit_local(false),
							Err(err) => self.notice(format!("could not rename: {err}")),
						}
					}
					self.with_sync(|sync| sync.stop_editing(&element));
					self.events
						.emit(&CanvasEvent::EditingEnded { element, committed });
				}
			}
		}
	}

	fn notify_selected(&self, element: &ElementRef) {
		let selected = match element {
			ElementRef::Node(id) => self.graph.node(id).cloned().map(Element::Node).zip(
				self.overlay
					.node_style(&self.graph, id)
					.map(ElementStyle::Node),
			),
			ElementRef::Edge(id) => self.graph.edge(id).cloned().map(Element::Edge).zip(
				self.overlay
					.edge_style(&self.graph, id)
					.map(ElementStyle::Edge),
			),
		};
		match selected {
			Some((element, style)) => self
				.events
				.emit(&CanvasEvent::Selected { element, style }),
			None => self.events.emit(&CanvasEvent::Deselected),
		}
	}

	pub fn set_hover(&mut self, node: Option<String>) {
		if self.hover.node == node {
			return;
		}
		let was_hovering = self.hover.node.is_some();

		// Keep the previous highlight around so it can fade out
		if was_hovering && node.is_none() {
			self.hover.prev_node = self.hover.node.take();
			self.hover.prev_neighbors = std::mem::take(&mut self.hover.neighbors);
		} else {
			self.hover.prev_node = None;
			self.hover.prev_neighbors.clear();
		}

		self.hover.neighbors.clear();
		if let Some(id) = &node {
			if !was_hovering {
				self.hover.delay_t = 0.0;
			}
			self.hover.neighbors = self.graph.neighbors(id).map(str::to_string).collect();
		}
		self.hover.node = node;
	}

	pub fn is_highlighted(&self, id: &str) -> bool {
		self.hover.node.as_deref() == Some(id)
			|| self.hover.neighbors.contains(id)
			|| self.hover.prev_node.as_deref() == Some(id)
			|| self.hover.prev_neighbors.contains(id)
	}

	pub fn is_hovered(&self, id: &str) -> bool {
		self.hover.node.as_deref() == Some(id) || self.hover.prev_node.as_deref() == Some(id)
	}

	pub fn has_active_highlight(&self) -> bool {
		self.hover.node.is_some() || self.hover.prev_node.is_some()
	}

	/// Replaces the graph with a freshly supplied payload.
	pub fn replace_graph(&mut self, payload: GraphPayload) -> Result<(), CanvasError> {
		self.graph = ingest(payload)?;
		self.layout.sync_graph(&self.graph);
		self.layout.adopt_positions(&self.graph);
		self.commit_local(true);
		Ok(())
	}

	/// Folds a generation result into the graph; returns its subgraph tag.
	pub fn merge_payload(&mut self, payload: GraphPayload) -> Result<String, CanvasError> {
		let tag = self.graph.merge_payload(payload)?;
		self.commit_local(true);
		Ok(tag)
	}

	pub fn add_node(&mut self, node: Node) -> Result<(), CanvasError> {
		self.graph.add_node(node)?;
		self.commit_local(true);
		Ok(())
	}

	pub fn add_edge(&mut self, edge: Edge) -> Result<(), CanvasError> {
		self.graph.add_edge(edge)?;
		self.commit_local(true);
		Ok(())
	}

	pub fn remove_element(&mut self, element: &ElementRef) -> Result<(), CanvasError> {
		self.graph.remove(element)?;
		self.commit_local(true);
		Ok(())
	}

	pub fn merge_nodes(&mut self, from: &str, into: &str) -> Result<(), CanvasError> {
		self.graph.merge_nodes(from, into)?;
		self.commit_local(true);
		Ok(())
	}

	pub fn set_label(&mut self, element: &ElementRef, label: &str) -> Result<(), CanvasError> {
		self.graph.set_label(element, label)?;
		self.commit_local(false);
		Ok(())
	}

	pub fn set_node_style(&mut self, id: &str, patch: &NodeStyle) -> Result<(), CanvasError> {
		self.overlay.set_node_style(&mut self.graph, id, patch)?;
		match (patch.pinned, self.layout.position(id)) {
			(Some(true), Some(p)) => {
				self.layout.pin(id, p.x, p.y);
			}
			(Some(false), _) => {
				self.layout.unpin(id);
				self.layout.restart();
			}
			_ => {}
		}
		self.commit_local(false);
		Ok(())
	}

	pub fn set_edge_style(&mut self, id: &str, patch: &EdgeStyle) -> Result<(), CanvasError> {
		self.overlay.set_edge_style(&mut self.graph, id, patch)?;
		self.commit_local(false);
		Ok(())
	}

	pub fn highlight_subgraph(&mut self, subgraph: Option<&str>) {
		self.overlay.highlight_subgraph(&self.graph, subgraph);
	}

	/// Bookkeeping after a local change, then a full-graph broadcast.
	fn commit_local(&mut self, structural: bool) {
		if structural {
			self.layout.sync_graph(&self.graph);
			self.layout.restart();
		}
		self.after_graph_change();
		debug_assert!(self.graph.validate().is_ok());
		self.events.emit(&CanvasEvent::GraphChanged);
		if let Some(sync) = self.sync.as_mut() {
			if let Err(err) = sync.broadcast_graph(&self.graph) {
				warn!("broadcast failed: {err}");
				self.events
					.emit(&CanvasEvent::Notice(format!("could not share changes: {err}")));
			}
		}
	}

	fn after_graph_change(&mut self) {
		self.overlay.refresh(&self.graph);
		if let Some(node) = self.interaction.retain_existing(&self.graph) {
			debug!("drag on {node} abandoned, node removed");
			self.layout.set_alpha_target(0.0);
			// Superseded by the local change being committed
			if let Some(sync) = self.sync.as_mut() {
				sync.take_pending_graph();
			}
		}
		let hovered_gone = self
			.hover
			.node
			.as_deref()
			.is_some_and(|id| self.graph.node(id).is_none());
		if hovered_gone {
			self.hover = HoverState::default();
		}
	}

	pub fn attach_sync(&mut self, bridge: SyncBridge) {
		info!("collaboration attached for {}", bridge.local_user().name);
		self.sync = Some(bridge);
	}

	pub fn detach_sync(&mut self) -> Option<SyncBridge> {
		self.sync.take()
	}

	pub fn send_chat(&mut self, text: &str) {
		self.with_sync(|sync| sync.send_chat(text));
	}

	/// Applies one inbound wire frame between ticks.
	pub fn receive_remote(&mut self, frame: &str) -> Result<Inbound, CanvasError> {
		let message = SyncMessage::decode(frame)?;
		Ok(self.handle_remote(message))
	}

	pub fn handle_remote(&mut self, message: SyncMessage) -> Inbound {
		let drag_active = self.interaction.is_dragging();
		let Some(sync) = self.sync.as_mut() else {
			return Inbound::Ignored;
		};
		let inbound = sync.handle(message, drag_active);
		if let Inbound::ReplaceGraph(graph) = &inbound {
			self.apply_remote_graph(graph.clone());
		}
		inbound
	}

	fn apply_remote_graph(&mut self, graph: Graph) {
		debug!("applying remote graph with {} nodes", graph.nodes().len());
		self.graph = graph;
		self.layout.sync_graph(&self.graph);
		self.layout.adopt_positions(&self.graph);
		self.layout.restart();
		self.after_graph_change();
		self.events.emit(&CanvasEvent::GraphReplaced);
	}

	fn with_sync(&mut self, f: impl FnOnce(&mut SyncBridge) -> Result<(), SyncError>) {
		if let Some(sync) = self.sync.as_mut() {
			if let Err(err) = f(sync) {
				warn!("collaboration message failed: {err}");
				self.events
					.emit(&CanvasEvent::Notice(format!("collaboration error: {err}")));
			}
		}
	}

	/// Fire-and-forget request for more knowledge around `node_id`.
	pub fn request_search(&mut self, node_id: &str, query: &str) {
		if self.graph.node(node_id).is_none() {
			self.notice(format!("cannot search from unknown node {node_id}"));
			return;
		}
		self.events.emit(&CanvasEvent::SearchRequested {
			node_id: node_id.to_string(),
			query: query.to_string(),
		});
	}

	pub fn export(&self, request: ExportRequest) -> ExportArtifact {
		if !request.format.is_image() {
			let payload = export_payload(&self.graph, &request);
			self.events.emit(&CanvasEvent::ExportDelegated {
				request,
				payload: payload.clone(),
			});
			return ExportArtifact::Delegated(payload);
		}
		match request.format {
			ExportFormat::Svg => ExportArtifact::Svg(render_svg(
				&self.graph,
				&self.layout,
				&self.overlay,
				request.include_styles,
			)),
			_ => ExportArtifact::Raster(raster_plan(&self.layout)),
		}
	}

	pub(crate) fn notice(&self, message: String) {
		warn!("{message}");
		self.events.emit(&CanvasEvent::Notice(message));
	}
}
