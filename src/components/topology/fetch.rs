use futures::future::try_join3;
use gloo::net::http::Request;
use log::debug;
use serde::de::DeserializeOwned;

use super::config::TopologyConfig;
use super::error::{Result, TopologyError};
use super::types::{DevicesPayload, HostsPayload, LinksPayload, Snapshot};

/// Reads one topology snapshot from the dashboard backend and the controller.
#[derive(Clone, Debug)]
pub struct SnapshotClient {
	devices_url: String,
	hosts_url: String,
	links_url: String,
	controller_auth: Option<String>,
}

impl SnapshotClient {
	pub fn new(config: &TopologyConfig) -> Self {
		let controller_auth = match (&config.onos_username, &config.onos_password) {
			(Some(user), Some(pass)) => basic_auth(user, pass),
			_ => None,
		};
		Self {
			devices_url: config.devices_url(),
			hosts_url: config.hosts_url(),
			links_url: config.links_url(),
			controller_auth,
		}
	}

	/// Fetch devices, hosts and links concurrently. Any failure fails the
	/// whole snapshot so that a partial read never clears part of the graph.
	pub async fn fetch(&self) -> Result<Snapshot> {
		let (devices, hosts, links) = try_join3(
			get_json::<DevicesPayload>(&self.devices_url, None),
			get_json::<HostsPayload>(&self.hosts_url, None),
			get_json::<LinksPayload>(&self.links_url, self.controller_auth.as_deref()),
		)
		.await?;
		debug!(
			"snapshot: {} devices, {} hosts, {} links",
			devices.devices.len(),
			hosts.hosts.len(),
			links.links.len()
		);
		Ok(Snapshot {
			devices: devices.devices,
			hosts: hosts.hosts,
			links: links.links,
		})
	}
}

async fn get_json<T: DeserializeOwned>(url: &str, auth: Option<&str>) -> Result<T> {
	let mut request = Request::get(url);
	if let Some(auth) = auth {
		request = request.header("Authorization", auth);
	}
	let response = request.send().await.map_err(|source| TopologyError::Request {
		url: url.to_owned(),
		source,
	})?;
	if !response.ok() {
		return Err(TopologyError::Status {
			url: url.to_owned(),
			status: response.status(),
		});
	}
	response.json::<T>().await.map_err(|source| TopologyError::Decode {
		url: url.to_owned(),
		source,
	})
}

fn basic_auth(user: &str, pass: &str) -> Option<String> {
	let encoded = web_sys::window()?.btoa(&format!("{user}:{pass}")).ok()?;
	Some(format!("Basic {encoded}"))
}
