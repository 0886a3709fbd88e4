use std::fmt;

use serde::Deserialize;

/// A point in canvas space, measured in CSS pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
	pub x: f64,
	pub y: f64,
}

impl Point {
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	pub fn distance(self, other: Point) -> f64 {
		(self.x - other.x).hypot(self.y - other.y)
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Velocity {
	pub vx: f64,
	pub vy: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
	Device,
	Host,
}

impl NodeKind {
	/// Edge length of the square icon, also the diameter of the fallback circle.
	pub fn icon_size(self) -> f64 {
		match self {
			NodeKind::Device => 28.0,
			NodeKind::Host => 22.0,
		}
	}

	pub fn color(self) -> &'static str {
		match self {
			NodeKind::Device => "#2563eb",
			NodeKind::Host => "#22c55e",
		}
	}

	pub fn name(self) -> &'static str {
		match self {
			NodeKind::Device => "Device",
			NodeKind::Host => "Host",
		}
	}
}

/// A device or host in the live topology.
///
/// `position`, `velocity` and `pin` belong to the layout engine; everything
/// else is rebuilt from each snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
	pub id: String,
	pub label: String,
	pub kind: NodeKind,
	pub position: Option<Point>,
	pub velocity: Option<Velocity>,
	pub pin: Option<Point>,
}

impl Node {
	pub fn new(id: impl Into<String>, label: impl Into<String>, kind: NodeKind) -> Self {
		Self {
			id: id.into(),
			label: label.into(),
			kind,
			position: None,
			velocity: None,
			pin: None,
		}
	}
}

/// An undirected relation between two node ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
	pub id: String,
	pub source: String,
	pub target: String,
}

impl Link {
	pub fn touches(&self, id: &str) -> bool {
		self.source == id || self.target == id
	}
}

/// The reconciled node and link set handed to the surrounding UI.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TopologyView {
	pub nodes: Vec<Node>,
	pub links: Vec<Link>,
}

// Raw records as served by the dashboard backend and the controller.
// Every field is optional so that one malformed entry never fails the payload.

#[derive(Clone, Debug, Default, Deserialize)]
pub struct DeviceRecord {
	#[serde(default)]
	pub id: Option<String>,
	#[serde(default)]
	pub friendly_name: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct HostRecord {
	#[serde(default)]
	pub id: Option<String>,
	#[serde(default, rename = "ipAddresses")]
	pub ip_addresses: Option<Vec<String>>,
	#[serde(default)]
	pub mac: Option<String>,
	#[serde(default)]
	pub friendly_name: Option<String>,
	#[serde(default)]
	pub locations: Option<Vec<HostLocation>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct HostLocation {
	#[serde(default, rename = "elementId")]
	pub element_id: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct LinkRecord {
	#[serde(default)]
	pub src: Option<ConnectPoint>,
	#[serde(default)]
	pub dst: Option<ConnectPoint>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ConnectPoint {
	#[serde(default)]
	pub device: Option<String>,
	#[serde(default)]
	pub port: Option<PortNumber>,
}

/// Controllers report ports either as strings (`"1"`, `"LOCAL"`) or bare numbers.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PortNumber {
	Name(String),
	Number(u64),
}

impl fmt::Display for PortNumber {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PortNumber::Name(name) => f.write_str(name),
			PortNumber::Number(n) => write!(f, "{n}"),
		}
	}
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct DevicesPayload {
	#[serde(default)]
	pub devices: Vec<DeviceRecord>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct HostsPayload {
	#[serde(default)]
	pub hosts: Vec<HostRecord>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct LinksPayload {
	#[serde(default)]
	pub links: Vec<LinkRecord>,
}

/// One poll cycle's full topology read.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
	pub devices: Vec<DeviceRecord>,
	pub hosts: Vec<HostRecord>,
	pub links: Vec<LinkRecord>,
}
