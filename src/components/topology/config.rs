use super::layout::LayoutParams;

/// Runtime settings for the topology canvas.
///
/// Endpoints and credentials are baked in at build time from the
/// environment, falling back to a local controller.
#[derive(Clone, Debug, PartialEq)]
pub struct TopologyConfig {
	/// Dashboard backend serving `/devices` and `/hosts`.
	pub api_base: String,
	/// Controller REST root serving `/links`.
	pub onos_api: String,
	pub onos_username: Option<String>,
	pub onos_password: Option<String>,
	pub poll_interval_ms: u32,
	pub device_icon: String,
	pub host_icon: String,
	pub layout: LayoutParams,
}

pub const DEFAULT_POLL_INTERVAL_MS: u32 = 8_000;

impl Default for TopologyConfig {
	fn default() -> Self {
		Self {
			api_base: setting(option_env!("TOPOLOGY_API_BASE"), "http://localhost:8000"),
			onos_api: setting(option_env!("ONOS_API"), "http://localhost:8181/onos/v1"),
			onos_username: Some(setting(option_env!("ONOS_USERNAME"), "onos")),
			onos_password: Some(setting(option_env!("ONOS_PASSWORD"), "rocks")),
			poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
			device_icon: "/icons/switch.svg".into(),
			host_icon: "/icons/pc.svg".into(),
			layout: LayoutParams::default(),
		}
	}
}

impl TopologyConfig {
	pub fn devices_url(&self) -> String {
		join(&self.api_base, "devices")
	}

	pub fn hosts_url(&self) -> String {
		join(&self.api_base, "hosts")
	}

	pub fn links_url(&self) -> String {
		join(&self.onos_api, "links")
	}
}

fn setting(value: Option<&'static str>, fallback: &str) -> String {
	value
		.map(str::trim)
		.filter(|v| !v.is_empty())
		.unwrap_or(fallback)
		.to_owned()
}

fn join(base: &str, path: &str) -> String {
	format!("{}/{path}", base.trim_end_matches('/'))
}
