use leptos::prelude::*;
use log::info;

use crate::components::force_graph::export::{ExportFormat, ExportRequest};
use crate::components::force_graph::{
	CanvasController, Edge, Element, ForceGraphCanvas, GraphPayload, Node,
};

/// Small hand-written knowledge graph to explore the canvas with.
fn sample_graph() -> GraphPayload {
	let nodes = [
		("ada", "Ada Lovelace", "Person"),
		("babbage", "Charles Babbage", "Person"),
		("engine", "Analytical Engine", "Technology"),
		("notes", "Notes on the Engine", "Document"),
		("london", "London", "Location"),
		("society", "Royal Society", "Organization"),
		("computing", "Computing", "Concept"),
		("1843", "1843", "Date"),
	]
	.into_iter()
	.map(|(id, label, kind)| Node::new(id, label, kind))
	.collect();

	let edges = [
		("e1", "ada", "notes", "wrote"),
		("e2", "notes", "engine", "describes"),
		("e3", "babbage", "engine", "designed"),
		("e4", "ada", "babbage", "corresponded with"),
		("e5", "babbage", "society", "member of"),
		("e6", "ada", "london", "lived in"),
		("e7", "engine", "computing", "pioneered"),
		("e8", "notes", "1843", "published"),
	]
	.into_iter()
	.map(|(id, s, t, label)| Edge::new(id, s, t, label))
	.collect();

	GraphPayload {
		nodes,
		edges,
		..Default::default()
	}
}

/// Stand-in for a knowledge generation service: a few concepts around `node_id`.
fn related_topics(node_id: &str, query: &str, round: usize) -> GraphPayload {
	let nodes: Vec<Node> = ["history", "influence", "legacy"]
		.into_iter()
		.map(|aspect| {
			Node::new(
				format!("{node_id}-{aspect}-{round}"),
				format!("{query}: {aspect}"),
				"Concept",
			)
		})
		.collect();
	let edges = nodes
		.iter()
		.map(|n| Edge::new(format!("{}-rel", n.id), node_id, n.id.clone(), "related to"))
		.collect();
	GraphPayload {
		nodes,
		edges,
		..Default::default()
	}
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let graph_data = Signal::derive(sample_graph);
	let selected = RwSignal::new(None::<Element>);
	let notice = RwSignal::new(None::<String>);

	let on_select = Callback::new(move |element: Option<Element>| selected.set(element));
	let controller = CanvasController::new();
	let merge_into = StoredValue::new_local(controller.clone());
	let expansions = RwSignal::new(0usize);

	let on_search = Callback::new(move |(node_id, query): (String, String)| {
		info!("search requested from {node_id}: {query}");
		let round = expansions.get_untracked() + 1;
		expansions.set(round);
		merge_into.with_value(|c| c.merge_payload(related_topics(&node_id, &query, round), true));
	});
	let on_export = Callback::new(move |(format, url): (ExportFormat, String)| {
		info!("exported {format:?} ({} bytes)", url.len());
		if let Some(window) = web_sys::window() {
			let _ = window.open_with_url(&url);
		}
	});
	let on_export_delegated = Callback::new(move |(request, payload): (ExportRequest, GraphPayload)| {
		// Only JSON is converted here; other formats need a converter service
		if request.format != ExportFormat::Json {
			notice.set(Some(format!("{:?} export needs a converter", request.format)));
			return;
		}
		match serde_json::to_string_pretty(&payload) {
			Ok(json) => {
				let url = format!(
					"data:application/json;charset=utf-8,{}",
					js_sys::encode_uri_component(&json)
				);
				if let Some(window) = web_sys::window() {
					let _ = window.open_with_url(&url);
				}
			}
			Err(err) => notice.set(Some(format!("export failed: {err}"))),
		}
	});
	let on_notice = Callback::new(move |message: String| notice.set(Some(message)));
	let show_all =
		move |_: web_sys::MouseEvent| merge_into.with_value(|c| c.highlight_subgraph(None));

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<div class="fullscreen-graph">
				<ForceGraphCanvas
					data=graph_data
					fullscreen=true
					controller=merge_into.get_value()
					on_select=on_select
					on_search=on_search
					on_export=on_export
					on_export_delegated=on_export_delegated
					on_notice=on_notice
				/>
				<div class="graph-overlay">
					<h1>"Knowledge Graph"</h1>
					<p class="subtitle">
						"Drag nodes to pin them. Double-click to rename. Delete removes the selection. Scroll or +/- to zoom, 0 to fit. Expand grows the selected node."
					</p>
					<button
						class="show-all"
						on:click=show_all
						style=move || { if expansions.get() > 0 { "" } else { "display: none;" } }
					>
						"Show all"
					</button>
					{move || {
						selected
							.get()
							.map(|element| {
								let kind = match &element {
									Element::Node(node) => node.node_type.clone(),
									Element::Edge(_) => "relation".to_string(),
								};
								view! {
									<p class="selection">
										<strong>{element.label().to_string()}</strong>
										" (" {kind} ")"
									</p>
								}
							})
					}}
					{move || notice.get().map(|message| view! { <p class="notice">{message}</p> })}
				</div>
			</div>
		</ErrorBoundary>
	}
}
