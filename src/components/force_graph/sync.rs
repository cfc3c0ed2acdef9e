//! Multi-user session bridge.
//!
//! Every local mutation re-broadcasts the whole graph as one `graphUpdated`
//! message; there is no diffing. Inbound graphs replace the local one wholesale
//! after sanitization. Editing locks are advisory: they drive highlighting only
//! and never block a local edit, so the last committed label wins.

use std::collections::BTreeMap;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::error::SyncError;
use super::model::{Graph, sanitize};
use super::types::{ElementKind, ElementRef, GraphPayload};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
	pub id: String,
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub color: Option<String>,
}

impl Participant {
	pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			name: name.into(),
			color: None,
		}
	}
}

/// Who is editing which element's label.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditInfo {
	pub element_id: String,
	pub user_id: String,
	pub user_name: String,
	pub element_kind: ElementKind,
	pub is_editing: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
	pub user_id: String,
	pub user_name: String,
	pub text: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub timestamp: Option<String>,
}

/// Wire messages. JSON only: `{"event": "...", "data": {...}}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum SyncMessage {
	#[serde(rename_all = "camelCase")]
	RoomJoined {
		room_id: String,
		user: Participant,
		#[serde(default)]
		users: Vec<Participant>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		graph: Option<GraphPayload>,
	},
	UserJoined(Participant),
	#[serde(rename_all = "camelCase")]
	UserLeft { user_id: String },
	#[serde(rename_all = "camelCase")]
	GraphUpdated { user_id: String, graph: GraphPayload },
	EditingElement(EditInfo),
	ChatMessage(ChatMessage),
}

impl SyncMessage {
	pub fn encode(&self) -> Result<String, SyncError> {
		Ok(serde_json::to_string(self)?)
	}

	pub fn decode(frame: &str) -> Result<Self, SyncError> {
		Ok(serde_json::from_str(frame)?)
	}
}

/// Outbound half of the session transport (a WebSocket in the browser).
pub trait Transport {
	fn send(&mut self, frame: String) -> Result<(), SyncError>;
}

impl<F> Transport for F
where
	F: FnMut(String) -> Result<(), SyncError>,
{
	fn send(&mut self, frame: String) -> Result<(), SyncError> {
		self(frame)
	}
}

/// What the canvas must do after an inbound message.
#[derive(Clone, Debug, PartialEq)]
pub enum Inbound {
	Ignored,
	/// Swap in this graph between ticks.
	ReplaceGraph(Graph),
	/// A graph arrived during a local drag; it is held until the drag ends.
	Deferred,
	RosterChanged,
	EditorsChanged,
	Chat(ChatMessage),
}

pub struct SyncBridge {
	transport: Box<dyn Transport>,
	local: Participant,
	room: Option<String>,
	participants: BTreeMap<String, Participant>,
	editors: BTreeMap<(String, String), EditInfo>,
	chat: Vec<ChatMessage>,
	pending_graph: Option<Graph>,
}

impl SyncBridge {
	pub fn new(local: Participant, transport: impl Transport + 'static) -> Self {
		Self {
			transport: Box::new(transport),
			local,
			room: None,
			participants: BTreeMap::new(),
			editors: BTreeMap::new(),
			chat: Vec::new(),
			pending_graph: None,
		}
	}

	pub fn local_user(&self) -> &Participant {
		&self.local
	}

	pub fn room(&self) -> Option<&str> {
		self.room.as_deref()
	}

	pub fn participants(&self) -> impl Iterator<Item = &Participant> {
		self.participants.values()
	}

	pub fn chat_log(&self) -> &[ChatMessage] {
		&self.chat
	}

	fn send(&mut self, message: &SyncMessage) -> Result<(), SyncError> {
		let frame = message.encode()?;
		self.transport.send(frame)
	}

	/// Sends the full snapshot of `graph`.
	pub fn broadcast_graph(&mut self, graph: &Graph) -> Result<(), SyncError> {
		debug!(
			"broadcasting graph ({} nodes, {} edges)",
			graph.nodes().len(),
			graph.edges().len()
		);
		let message = SyncMessage::GraphUpdated {
			user_id: self.local.id.clone(),
			graph: graph.to_payload(),
		};
		self.send(&message)
	}

	pub fn start_editing(&mut self, element: &ElementRef) -> Result<(), SyncError> {
		self.send_edit_state(element, true)
	}

	pub fn stop_editing(&mut self, element: &ElementRef) -> Result<(), SyncError> {
		self.send_edit_state(element, false)
	}

	fn send_edit_state(&mut self, element: &ElementRef, is_editing: bool) -> Result<(), SyncError> {
		let message = SyncMessage::EditingElement(EditInfo {
			element_id: element.id().to_string(),
			user_id: self.local.id.clone(),
			user_name: self.local.name.clone(),
			element_kind: element.kind(),
			is_editing,
		});
		self.send(&message)
	}

	pub fn send_chat(&mut self, text: &str) -> Result<(), SyncError> {
		let message = ChatMessage {
			user_id: self.local.id.clone(),
			user_name: self.local.name.clone(),
			text: text.to_string(),
			timestamp: None,
		};
		self.chat.push(message.clone());
		self.send(&SyncMessage::ChatMessage(message))
	}

	/// Decodes and applies one inbound frame.
	pub fn receive(&mut self, frame: &str, drag_active: bool) -> Result<Inbound, SyncError> {
		let message = SyncMessage::decode(frame)?;
		Ok(self.handle(message, drag_active))
	}

	pub fn handle(&mut self, message: SyncMessage, drag_active: bool) -> Inbound {
		match message {
			SyncMessage::RoomJoined {
				room_id,
				user,
				users,
				graph,
			} => {
				info!("joined room {room_id} as {}", user.name);
				self.room = Some(room_id);
				self.participants = users.into_iter().map(|u| (u.id.clone(), u)).collect();
				self.participants.insert(user.id.clone(), user);
				match graph {
					Some(payload) => self.accept_graph(payload, drag_active),
					None => Inbound::RosterChanged,
				}
			}
			SyncMessage::UserJoined(user) => {
				debug!("user joined: {}", user.name);
				self.participants.insert(user.id.clone(), user);
				Inbound::RosterChanged
			}
			SyncMessage::UserLeft { user_id } => {
				self.participants.remove(&user_id);
				self.editors.retain(|(_, uid), _| *uid != user_id);
				Inbound::RosterChanged
			}
			SyncMessage::GraphUpdated { user_id, graph } => {
				if user_id == self.local.id {
					return Inbound::Ignored;
				}
				self.accept_graph(graph, drag_active)
			}
			SyncMessage::EditingElement(info) => {
				if info.user_id == self.local.id {
					return Inbound::Ignored;
				}
				let key = (info.element_id.clone(), info.user_id.clone());
				if info.is_editing {
					self.editors.insert(key, info);
				} else {
					self.editors.remove(&key);
				}
				Inbound::EditorsChanged
			}
			SyncMessage::ChatMessage(message) => {
				self.chat.push(message.clone());
				Inbound::Chat(message)
			}
		}
	}

	fn accept_graph(&mut self, payload: GraphPayload, drag_active: bool) -> Inbound {
		let (graph, dropped) = sanitize(payload);
		if !dropped.is_empty() {
			warn!("remote graph sanitized, {} element(s) dropped", dropped.len());
		}
		self.editors
			.retain(|(element_id, _), info| match info.element_kind {
				ElementKind::Node => graph.node(element_id).is_some(),
				ElementKind::Edge => graph.edge(element_id).is_some(),
			});
		if drag_active {
			debug!("deferring remote graph until the local drag ends");
			self.pending_graph = Some(graph);
			Inbound::Deferred
		} else {
			self.pending_graph = None;
			Inbound::ReplaceGraph(graph)
		}
	}

	/// Latest remote graph held back during a drag, if any.
	pub fn take_pending_graph(&mut self) -> Option<Graph> {
		self.pending_graph.take()
	}

	/// Remote users currently editing `element_id`.
	pub fn editors_of(&self, element_id: &str) -> Vec<&EditInfo> {
		self.editors
			.values()
			.filter(|info| info.element_id == element_id)
			.collect()
	}

	pub fn active_editors(&self) -> impl Iterator<Item = &EditInfo> {
		self.editors.values()
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;
	use std::rc::Rc;

	use super::*;
	use crate::components::force_graph::model::ingest;
	use crate::components::force_graph::types::{Edge, Node};

	fn bridge(id: &str) -> (SyncBridge, Rc<RefCell<Vec<String>>>) {
		let outbox = Rc::new(RefCell::new(Vec::new()));
		let sink = outbox.clone();
		let bridge = SyncBridge::new(Participant::new(id, id.to_uppercase()), move |frame: String| -> Result<(), SyncError> {
			sink.borrow_mut().push(frame);
			Ok(())
		});
		(bridge, outbox)
	}

	fn payload() -> GraphPayload {
		GraphPayload {
			nodes: vec![Node::new("a", "A", ""), Node::new("b", "B", "")],
			edges: vec![Edge::new("ab", "a", "b", "")],
			..Default::default()
		}
	}

	#[test]
	fn broadcast_sends_full_snapshot() {
		let (mut bridge, outbox) = bridge("u1");
		let graph = ingest(payload()).unwrap();
		bridge.broadcast_graph(&graph).unwrap();
		let sent = SyncMessage::decode(&outbox.borrow()[0]).unwrap();
		match sent {
			SyncMessage::GraphUpdated { user_id, graph } => {
				assert_eq!(user_id, "u1");
				assert_eq!(graph.nodes.len(), 2);
				assert_eq!(graph.edges.len(), 1);
			}
			other => panic!("unexpected message {other:?}"),
		}
	}

	#[test]
	fn wire_format_is_tagged_camel_case() {
		let frame = SyncMessage::UserLeft {
			user_id: "u9".into(),
		}
		.encode()
		.unwrap();
		assert_eq!(frame, r#"{"event":"userLeft","data":{"userId":"u9"}}"#);
	}

	#[test]
	fn dangling_remote_edges_are_dropped() {
		let (mut bridge, _) = bridge("u1");
		let mut remote = payload();
		remote.nodes.pop();
		let inbound = bridge.handle(
			SyncMessage::GraphUpdated {
				user_id: "u2".into(),
				graph: remote,
			},
			false,
		);
		let Inbound::ReplaceGraph(graph) = inbound else {
			panic!("expected a replacement");
		};
		assert!(graph.edges().is_empty());
		graph.validate().unwrap();
	}

	#[test]
	fn own_echo_is_ignored_and_drag_defers() {
		let (mut bridge, _) = bridge("u1");
		let echo = SyncMessage::GraphUpdated {
			user_id: "u1".into(),
			graph: payload(),
		};
		assert_eq!(bridge.handle(echo, false), Inbound::Ignored);

		let remote = SyncMessage::GraphUpdated {
			user_id: "u2".into(),
			graph: payload(),
		};
		assert_eq!(bridge.handle(remote, true), Inbound::Deferred);
		assert!(bridge.take_pending_graph().is_some());
		assert!(bridge.take_pending_graph().is_none());
	}

	#[test]
	fn editing_locks_are_tracked_per_user() {
		let (mut bridge, _) = bridge("u1");
		for user in ["u2", "u3"] {
			bridge.handle(
				SyncMessage::EditingElement(EditInfo {
					element_id: "a".into(),
					user_id: user.into(),
					user_name: user.into(),
					element_kind: ElementKind::Node,
					is_editing: true,
				}),
				false,
			);
		}
		assert_eq!(bridge.editors_of("a").len(), 2);
		bridge.handle(
			SyncMessage::UserLeft {
				user_id: "u2".into(),
			},
			false,
		);
		assert_eq!(bridge.editors_of("a").len(), 1);
		assert_eq!(bridge.editors_of("a")[0].user_id, "u3");
	}

	#[test]
	fn transport_failure_surfaces_as_error() {
		let mut bridge = SyncBridge::new(Participant::new("u1", "U1"), |_: String| -> Result<(), SyncError> {
			Err(SyncError::Transport("socket closed".into()))
		});
		let graph = ingest(payload()).unwrap();
		assert!(matches!(
			bridge.broadcast_graph(&graph),
			Err(SyncError::Transport(_))
		));
	}

	#[test]
	fn room_join_populates_roster() {
		let (mut bridge, _) = bridge("u1");
		let inbound = bridge
			.receive(
				r#"{"event":"roomJoined","data":{"roomId":"r1","user":{"id":"u1","name":"Me"},"users":[{"id":"u2","name":"Them"}]}}"#,
				false,
			)
			.unwrap();
		assert_eq!(inbound, Inbound::RosterChanged);
		assert_eq!(bridge.room(), Some("r1"));
		assert_eq!(bridge.participants().count(), 2);
		assert!(bridge.receive("not json", false).is_err());
	}
}
