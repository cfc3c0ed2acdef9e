//! Several canvases sharing one in-memory relay, the way browsers share a room.

use std::cell::RefCell;
use std::rc::Rc;

use knowledge_graph_canvas::components::force_graph::interaction::Key;
use knowledge_graph_canvas::components::force_graph::layout::TickStatus;
use knowledge_graph_canvas::components::force_graph::sync::{Inbound, Participant, SyncBridge, SyncMessage};
use knowledge_graph_canvas::components::force_graph::{
	CanvasConfig, Edge, ElementRef, ForceGraphState, GraphPayload, Node, Point, Size, SyncError,
};

type Relay = Rc<RefCell<Vec<String>>>;

fn seed() -> GraphPayload {
	GraphPayload {
		nodes: vec![
			Node::new("ada", "Ada Lovelace", "Person"),
			Node::new("engine", "Analytical Engine", "Technology"),
			Node::new("london", "London", "Location"),
		],
		edges: vec![
			Edge::new("e1", "ada", "engine", "described"),
			Edge::new("e2", "ada", "london", "lived in"),
		],
		..Default::default()
	}
}

fn client(relay: &Relay, id: &str) -> ForceGraphState {
	let mut state =
		ForceGraphState::new(seed(), Size::new(800.0, 600.0), CanvasConfig::default()).unwrap();
	let outbox = relay.clone();
	state.attach_sync(SyncBridge::new(
		Participant::new(id, id.to_uppercase()),
		move |frame: String| -> Result<(), SyncError> {
			outbox.borrow_mut().push(frame);
			Ok(())
		},
	));
	state
}

/// Delivers every queued frame to every client, senders included.
fn flush(relay: &Relay, clients: &mut [&mut ForceGraphState]) -> Vec<Inbound> {
	let frames: Vec<String> = relay.borrow_mut().drain(..).collect();
	let mut results = Vec::new();
	for frame in &frames {
		for client in clients.iter_mut() {
			results.push(client.receive_remote(frame).unwrap());
		}
	}
	results
}

fn settle(state: &mut ForceGraphState) {
	for _ in 0..600 {
		if state.tick(0.016) != TickStatus::Running {
			break;
		}
	}
}

#[test]
fn concurrent_label_edits_show_both_locks() {
	let relay = Relay::default();
	let (mut a, mut b, mut c) = (client(&relay, "a"), client(&relay, "b"), client(&relay, "c"));
	let ada = ElementRef::Node("ada".into());

	a.label_click(ada.clone());
	b.label_click(ada.clone());
	flush(&relay, &mut [&mut a, &mut b, &mut c]);

	let observer = c.sync().unwrap();
	let mut editors: Vec<&str> = observer
		.editors_of("ada")
		.iter()
		.map(|info| info.user_id.as_str())
		.collect();
	editors.sort_unstable();
	assert_eq!(editors, ["a", "b"]);

	let remote_for_a: Vec<&str> = a
		.sync()
		.unwrap()
		.editors_of("ada")
		.iter()
		.map(|info| info.user_id.as_str())
		.collect();
	assert_eq!(remote_for_a, ["b"]);

	a.key(Key::Escape);
	flush(&relay, &mut [&mut a, &mut b, &mut c]);
	let left: Vec<&str> = c
		.sync()
		.unwrap()
		.editors_of("ada")
		.iter()
		.map(|info| info.user_id.as_str())
		.collect();
	assert_eq!(left, ["b"]);
}

#[test]
fn last_committed_label_wins_everywhere() {
	let relay = Relay::default();
	let (mut a, mut b) = (client(&relay, "a"), client(&relay, "b"));
	let ada = ElementRef::Node("ada".into());

	a.set_label(&ada, "Countess of Lovelace").unwrap();
	flush(&relay, &mut [&mut a, &mut b]);
	assert_eq!(b.graph().node("ada").unwrap().label, "Countess of Lovelace");

	b.set_label(&ada, "Augusta Ada King").unwrap();
	flush(&relay, &mut [&mut a, &mut b]);
	for state in [&a, &b] {
		assert_eq!(state.graph().node("ada").unwrap().label, "Augusta Ada King");
	}
}

#[test]
fn remote_graph_with_dangling_edge_is_sanitized() {
	let relay = Relay::default();
	let mut a = client(&relay, "a");
	let mut broken = seed();
	broken.edges.push(Edge::new("ghost-edge", "ada", "nobody", "knows"));
	let frame = SyncMessage::GraphUpdated {
		user_id: "mallory".into(),
		graph: broken,
	}
	.encode()
	.unwrap();

	let inbound = a.receive_remote(&frame).unwrap();
	assert!(matches!(inbound, Inbound::ReplaceGraph(_)));
	assert!(a.graph().edge("ghost-edge").is_none());
	assert_eq!(a.graph().edges().len(), 2);
	assert!(a.graph().validate().is_ok());
}

#[test]
fn node_deletion_cascades_on_every_client() {
	let relay = Relay::default();
	let (mut a, mut b) = (client(&relay, "a"), client(&relay, "b"));

	a.remove_element(&ElementRef::Node("ada".into())).unwrap();
	flush(&relay, &mut [&mut a, &mut b]);

	for state in [&a, &b] {
		assert!(state.graph().node("ada").is_none());
		assert!(state.graph().edges().is_empty());
		assert!(state.layout().position("ada").is_none());
		assert_eq!(state.graph().nodes().len(), 2);
	}
}

#[test]
fn remote_update_waits_for_the_local_drag_to_end() {
	let relay = Relay::default();
	let (mut a, mut b) = (client(&relay, "a"), client(&relay, "b"));
	settle(&mut b);

	let at = b
		.viewport()
		.graph_to_screen(b.layout().position("london").unwrap());
	b.pointer_down(at);
	b.pointer_move(Point::new(at.x + 60.0, at.y));
	assert!(b.interaction().is_dragging());
	flush(&relay, &mut [&mut a, &mut b]);

	a.set_label(&ElementRef::Node("ada".into()), "Countess of Lovelace")
		.unwrap();
	let inbound = flush(&relay, &mut [&mut a, &mut b]);
	assert!(inbound.contains(&Inbound::Deferred));
	assert_eq!(b.graph().node("ada").unwrap().label, "Ada Lovelace");

	let dropped = b.layout().position("london").unwrap();
	b.pointer_up();
	assert_eq!(b.graph().node("ada").unwrap().label, "Countess of Lovelace");
	assert_eq!(b.layout().position("london"), Some(dropped));

	flush(&relay, &mut [&mut a, &mut b]);
	let london = a.graph().node("london").unwrap();
	assert_eq!(london.position(), Some(dropped));
	assert!(london.is_pinned());
	assert_eq!(a.graph().node("ada").unwrap().label, "Countess of Lovelace");
}

#[test]
fn deleting_the_dragged_node_releases_deferred_updates() {
	let relay = Relay::default();
	let (mut a, mut b) = (client(&relay, "a"), client(&relay, "b"));
	settle(&mut b);

	let at = b
		.viewport()
		.graph_to_screen(b.layout().position("london").unwrap());
	b.pointer_down(at);
	b.pointer_up();
	b.pointer_down(at);
	b.pointer_move(Point::new(at.x + 60.0, at.y));
	assert!(b.interaction().is_dragging());
	flush(&relay, &mut [&mut a, &mut b]);

	a.set_label(&ElementRef::Node("ada".into()), "Countess of Lovelace")
		.unwrap();
	let inbound = flush(&relay, &mut [&mut a, &mut b]);
	assert!(inbound.contains(&Inbound::Deferred));

	b.key(Key::Delete);
	b.pointer_up();
	assert!(b.graph().node("london").is_none());
	assert_eq!(b.graph().node("ada").unwrap().label, "Countess of Lovelace");

	flush(&relay, &mut [&mut a, &mut b]);
	assert!(a.graph().node("london").is_none());
	assert_eq!(a.graph().edges().len(), 1);
	settle(&mut b);
	assert!(!b.layout().is_running());
}

#[test]
fn chat_reaches_other_participants() {
	let relay = Relay::default();
	let (mut a, mut b) = (client(&relay, "a"), client(&relay, "b"));
	a.send_chat("look at the engine node");
	flush(&relay, &mut [&mut a, &mut b]);
	let log = b.sync().unwrap().chat_log();
	assert_eq!(log.len(), 1);
	assert_eq!(log[0].user_name, "A");
}
