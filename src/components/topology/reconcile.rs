use std::collections::{HashMap, HashSet};

use super::types::{Link, Node};

/// Carry layout state from the live node set onto a freshly normalized one.
///
/// Only `position`, `velocity` and `pin` survive; label and kind come from
/// `next`. Order and membership of the result are exactly those of `next`.
pub fn reconcile(previous: &[Node], next: Vec<Node>) -> Vec<Node> {
	let previous: HashMap<&str, &Node> = previous.iter().map(|n| (n.id.as_str(), n)).collect();
	next.into_iter()
		.map(|mut node| {
			if let Some(prev) = previous.get(node.id.as_str()) {
				node.position = prev.position;
				node.velocity = prev.velocity;
				node.pin = prev.pin;
			}
			node
		})
		.collect()
}

/// Drop links whose endpoints are not both present in `nodes`.
pub fn retain_resolvable(nodes: &[Node], links: Vec<Link>) -> Vec<Link> {
	let ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
	links
		.into_iter()
		.filter(|l| ids.contains(l.source.as_str()) && ids.contains(l.target.as_str()))
		.collect()
}
