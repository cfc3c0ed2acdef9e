//! Listener registry with drop-to-unsubscribe handles.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::export::ExportRequest;
use super::layout::TickStatus;
use super::style::{ResolvedEdgeStyle, ResolvedNodeStyle};
use super::types::{Element, ElementRef, GraphPayload};

/// Resolved style handed out with a selection so a style editor can pre-populate.
#[derive(Clone, Debug, PartialEq)]
pub enum ElementStyle {
	Node(ResolvedNodeStyle),
	Edge(ResolvedEdgeStyle),
}

/// Notifications published by the canvas state.
#[derive(Clone, Debug, PartialEq)]
pub enum CanvasEvent {
	Selected {
		element: Element,
		style: ElementStyle,
	},
	Deselected,
	/// The local user changed the graph (structure, label, style or position).
	GraphChanged,
	/// A remote graph replaced the local one.
	GraphReplaced,
	LayoutUpdated(TickStatus),
	EditingStarted(ElementRef),
	EditingEnded {
		element: ElementRef,
		committed: bool,
	},
	SearchRequested {
		node_id: String,
		query: String,
	},
	/// Non-image export handed to an external converter.
	ExportDelegated {
		request: ExportRequest,
		payload: GraphPayload,
	},
	/// Non-fatal, user-facing message.
	Notice(String),
}

type Listener<E> = Rc<dyn Fn(&E)>;

struct Registry<E> {
	next_id: u64,
	listeners: Vec<(u64, Listener<E>)>,
}

pub struct EventBus<E> {
	registry: Rc<RefCell<Registry<E>>>,
}

impl<E> Default for EventBus<E> {
	fn default() -> Self {
		Self {
			registry: Rc::new(RefCell::new(Registry {
				next_id: 0,
				listeners: Vec::new(),
			})),
		}
	}
}

impl<E: 'static> EventBus<E> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `listener` until the returned handle is dropped.
	#[must_use = "dropping the subscription unsubscribes immediately"]
	pub fn subscribe(&self, listener: impl Fn(&E) + 'static) -> Subscription {
		let id = {
			let mut registry = self.registry.borrow_mut();
			let id = registry.next_id;
			registry.next_id += 1;
			registry.listeners.push((id, Rc::new(listener)));
			id
		};
		let weak: Weak<RefCell<Registry<E>>> = Rc::downgrade(&self.registry);
		Subscription {
			release: Some(Box::new(move || {
				if let Some(registry) = weak.upgrade() {
					registry.borrow_mut().listeners.retain(|(lid, _)| *lid != id);
				}
			})),
		}
	}

	/// Calls every listener. Listeners may subscribe or unsubscribe while running;
	/// such changes apply from the next emit.
	pub fn emit(&self, event: &E) {
		let listeners: Vec<Listener<E>> = self
			.registry
			.borrow()
			.listeners
			.iter()
			.map(|(_, l)| l.clone())
			.collect();
		for listener in listeners {
			listener(event);
		}
	}
}

/// Unsubscribes on drop.
pub struct Subscription {
	release: Option<Box<dyn FnOnce()>>,
}

impl Drop for Subscription {
	fn drop(&mut self) {
		if let Some(release) = self.release.take() {
			release();
		}
	}
}
