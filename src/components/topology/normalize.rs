use std::collections::HashSet;

use log::{debug, warn};

use super::types::{
	ConnectPoint, DeviceRecord, HostRecord, Link, LinkRecord, Node, NodeKind, Snapshot,
};

/// Map one raw snapshot onto canonical nodes and links.
///
/// Devices come first, then hosts, so hosts are drawn on top. Records without
/// an id are skipped. A host whose id is already taken by a device is dropped
/// rather than merged. Links are not checked against the node set here; see
/// [`super::reconcile::retain_resolvable`].
pub fn normalize(snapshot: &Snapshot) -> (Vec<Node>, Vec<Link>) {
	let mut seen = HashSet::new();
	let mut nodes = Vec::with_capacity(snapshot.devices.len() + snapshot.hosts.len());

	for record in &snapshot.devices {
		let Some(id) = non_blank(record.id.as_deref()) else {
			debug!("skipping device record without id");
			continue;
		};
		if !seen.insert(id.to_owned()) {
			warn!("duplicate device id {id}, keeping first");
			continue;
		}
		nodes.push(Node::new(id, device_label(id, record), NodeKind::Device));
	}

	let mut host_links = Vec::new();
	for record in &snapshot.hosts {
		let Some(id) = non_blank(record.id.as_deref()) else {
			debug!("skipping host record without id");
			continue;
		};
		if !seen.insert(id.to_owned()) {
			warn!("host id {id} collides with an existing node, skipping");
			continue;
		}
		nodes.push(Node::new(id, host_label(id, record), NodeKind::Host));
		host_links.extend(host_link(id, record));
	}

	let mut link_ids = HashSet::new();
	let mut links = Vec::with_capacity(snapshot.links.len() + host_links.len());
	let device_links = snapshot.links.iter().filter_map(device_link);
	for link in device_links.chain(host_links) {
		if link_ids.insert(link.id.clone()) {
			links.push(link);
		}
	}

	(nodes, links)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
	value.map(str::trim).filter(|v| !v.is_empty())
}

fn device_label(id: &str, record: &DeviceRecord) -> String {
	non_blank(record.friendly_name.as_deref())
		.unwrap_or_else(|| id.strip_prefix("of:").unwrap_or(id))
		.to_owned()
}

fn host_label(id: &str, record: &HostRecord) -> String {
	non_blank(record.friendly_name.as_deref())
		.or_else(|| {
			record
				.ip_addresses
				.as_deref()
				.and_then(|ips| ips.first())
				.and_then(|ip| non_blank(Some(ip.as_str())))
		})
		.or_else(|| non_blank(record.mac.as_deref()))
		.unwrap_or(id)
		.to_owned()
}

fn endpoint(point: Option<&ConnectPoint>) -> Option<(&str, String)> {
	let point = point?;
	let device = non_blank(point.device.as_deref())?;
	let port = point
		.port
		.as_ref()
		.map(ToString::to_string)
		.unwrap_or_default();
	Some((device, port))
}

fn device_link(record: &LinkRecord) -> Option<Link> {
	let src = endpoint(record.src.as_ref())?;
	let dst = endpoint(record.dst.as_ref())?;
	// The controller reports each cable once per direction.
	let (a, b) = if src <= dst { (src, dst) } else { (dst, src) };
	Some(Link {
		id: format!("dev:{}/{}-{}/{}", a.0, a.1, b.0, b.1),
		source: a.0.to_owned(),
		target: b.0.to_owned(),
	})
}

fn host_link(id: &str, record: &HostRecord) -> Option<Link> {
	let location = record.locations.as_deref()?.first()?;
	let element = non_blank(location.element_id.as_deref())?;
	Some(Link {
		id: format!("host:{id}>{element}"),
		source: id.to_owned(),
		target: element.to_owned(),
	})
}
