use leptos::prelude::*;

use crate::components::topology::{Node, NodeKind, TopologyCanvas, TopologyView};

fn count(view: &TopologyView, kind: NodeKind) -> usize {
	view.nodes.iter().filter(|n| n.kind == kind).count()
}

/// Details for the node under the pointer, or a hint when nothing is focused.
#[component]
fn Inspector(topology: RwSignal<TopologyView>, focus: RwSignal<Option<String>>) -> impl IntoView {
	let focused = move || {
		let id = focus.get()?;
		topology.with(|view| view.nodes.iter().find(|n| n.id == id).cloned())
	};
	let degree = move |node: &Node| {
		topology.with(|view| view.links.iter().filter(|l| l.touches(&node.id)).count())
	};

	view! {
		<aside class="topology-inspector">
			<h2>"Topology"</h2>
			<dl class="topology-counts">
				<dt>"Switches"</dt>
				<dd>{move || topology.with(|v| count(v, NodeKind::Device))}</dd>
				<dt>"Hosts"</dt>
				<dd>{move || topology.with(|v| count(v, NodeKind::Host))}</dd>
				<dt>"Links"</dt>
				<dd>{move || topology.with(|v| v.links.len())}</dd>
			</dl>
			{move || match focused() {
				Some(node) => {
					let links = degree(&node);
					view! {
						<section class="topology-selection">
							<h3>{node.label.clone()}</h3>
							<p class="kind">{node.kind.name()}</p>
							<p class="id">{node.id.clone()}</p>
							<p>{format!("{links} link(s)")}</p>
						</section>
					}
					.into_any()
				}
				None => view! { <p class="hint">"Hover a node to inspect it. Drag to rearrange."</p> }.into_any(),
			}}
		</aside>
	}
}

/// Network dashboard: the live topology canvas with a small inspector.
#[component]
pub fn Home() -> impl IntoView {
	let topology = RwSignal::new(TopologyView::default());
	let focus = RwSignal::new(None::<String>);

	view! {
		<main class="dashboard">
			<header class="dashboard-header">
				<h1>"Network Topology"</h1>
				<p class="subtitle">"Refreshed from the controller every few seconds."</p>
			</header>
			<div class="dashboard-body">
				<div class="topology-frame">
					<TopologyCanvas topology=topology focus=focus height=Some(480.0) />
				</div>
				<Inspector topology=topology focus=focus />
			</div>
		</main>
	}
}
