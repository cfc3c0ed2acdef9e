//! Host-side handle for changing a mounted canvas.

use std::cell::RefCell;
use std::rc::Rc;

use log::debug;

use super::state::ForceGraphState;
use super::sync::SyncBridge;
use super::types::{EdgeStyle, GraphPayload, NodeStyle};

type Job = Box<dyn FnOnce(&mut ForceGraphState)>;

/// Queues changes for the live [`ForceGraphState`].
///
/// Jobs run at the start of the next animation frame, so a controller may be
/// used from inside canvas callbacks without re-entering the state.
#[derive(Clone, Default)]
pub struct CanvasController {
	jobs: Rc<RefCell<Vec<Job>>>,
}

impl CanvasController {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn update(&self, job: impl FnOnce(&mut ForceGraphState) + 'static) {
		self.jobs.borrow_mut().push(Box::new(job));
	}

	/// Folds generated knowledge into the graph, optionally emphasizing it.
	pub fn merge_payload(&self, payload: GraphPayload, highlight: bool) {
		self.update(move |s| match s.merge_payload(payload) {
			Ok(tag) => {
				debug!("merged search results as {tag}");
				if highlight {
					s.highlight_subgraph(Some(&tag));
				}
			}
			Err(err) => s.notice(format!("could not merge results: {err}")),
		});
	}

	pub fn highlight_subgraph(&self, subgraph: Option<String>) {
		self.update(move |s| {
			if s.overlay().highlighted_subgraph() != subgraph.as_deref() {
				s.highlight_subgraph(subgraph.as_deref());
			}
		});
	}

	pub fn set_node_style(&self, id: impl Into<String>, patch: NodeStyle) {
		let id = id.into();
		self.update(move |s| {
			if let Err(err) = s.set_node_style(&id, &patch) {
				s.notice(format!("could not style {id}: {err}"));
			}
		});
	}

	pub fn set_edge_style(&self, id: impl Into<String>, patch: EdgeStyle) {
		let id = id.into();
		self.update(move |s| {
			if let Err(err) = s.set_edge_style(&id, &patch) {
				s.notice(format!("could not style {id}: {err}"));
			}
		});
	}

	pub fn attach_sync(&self, bridge: SyncBridge) {
		self.update(move |s| s.attach_sync(bridge));
	}

	/// Hands one inbound wire frame to the collaboration bridge.
	pub fn receive_frame(&self, frame: String) {
		self.update(move |s| {
			if let Err(err) = s.receive_remote(&frame) {
				s.notice(format!("dropped collaboration message: {err}"));
			}
		});
	}

	pub fn send_chat(&self, text: impl Into<String>) {
		let text = text.into();
		self.update(move |s| s.send_chat(&text));
	}

	/// Runs every queued job against `state`, oldest first.
	pub fn drain(&self, state: &mut ForceGraphState) {
		let jobs = std::mem::take(&mut *self.jobs.borrow_mut());
		for job in jobs {
			job(state);
		}
	}
}
