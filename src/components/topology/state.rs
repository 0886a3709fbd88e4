use log::{debug, warn};

use super::config::TopologyConfig;
use super::error::TopologyError;
use super::input::Interaction;
use super::layout::{NUDGE_ALPHA, Simulation};
use super::normalize::normalize;
use super::reconcile::{reconcile, retain_resolvable};
use super::types::{Point, Snapshot, TopologyView};

/// Everything the canvas needs between frames: the live layout, the pointer
/// state and the viewport it is drawn into.
pub struct TopologyState {
	pub simulation: Simulation,
	pub interaction: Interaction,
	pub width: f64,
	pub height: f64,
	pub pixel_ratio: f64,
	dirty: bool,
}

impl TopologyState {
	pub fn new(config: &TopologyConfig, width: f64, height: f64, pixel_ratio: f64) -> Self {
		Self {
			simulation: Simulation::new(
				config.layout.clone(),
				Point::new(width / 2.0, height / 2.0),
			),
			interaction: Interaction::default(),
			width,
			height,
			pixel_ratio,
			dirty: true,
		}
	}

	/// Normalize, reconcile and install a freshly fetched snapshot. Returns
	/// whether node or link membership changed.
	pub fn apply_snapshot(&mut self, snapshot: &Snapshot) -> bool {
		let (nodes, links) = normalize(snapshot);
		let nodes = reconcile(self.simulation.nodes(), nodes);
		let links = retain_resolvable(&nodes, links);
		let changed = self.simulation.replace(nodes, links);
		self.interaction.forget_missing(&mut self.simulation);
		self.dirty = true;
		debug!(
			"applied snapshot: {} nodes, {} links, changed: {changed}, alpha {:.3}",
			self.simulation.nodes().len(),
			self.simulation.links().len(),
			self.simulation.alpha()
		);
		changed
	}

	/// A failed poll leaves the graph as it was.
	pub fn snapshot_failed(&self, err: &TopologyError) {
		warn!("topology refresh failed, keeping previous graph: {err}");
	}

	pub fn resize(&mut self, width: f64, height: f64, pixel_ratio: f64) {
		self.width = width;
		self.height = height;
		self.pixel_ratio = pixel_ratio;
		self.simulation.set_center(Point::new(width / 2.0, height / 2.0));
		self.simulation.reheat(NUDGE_ALPHA);
		self.dirty = true;
		debug!(
			"viewport {width}x{height} at {pixel_ratio}x, center {:?}",
			self.simulation.center()
		);
	}

	/// Canvas backing-store size in device pixels.
	pub fn backing_size(&self) -> (u32, u32) {
		(
			(self.width * self.pixel_ratio).floor() as u32,
			(self.height * self.pixel_ratio).floor() as u32,
		)
	}

	/// Advance the layout one step. Returns whether a redraw is due.
	pub fn tick(&mut self) -> bool {
		let stepped = self.simulation.tick();
		let redraw = stepped || self.dirty;
		self.dirty = false;
		redraw
	}

	pub fn request_redraw(&mut self) {
		self.dirty = true;
	}

	/// Returns true when the focused node changed.
	pub fn pointer_move(&mut self, at: Point) -> bool {
		let changed = self.interaction.pointer_move(&mut self.simulation, at);
		if changed || self.interaction.is_dragging() {
			self.dirty = true;
		}
		changed
	}

	pub fn pointer_down(&mut self, at: Point) -> bool {
		let hit = self.interaction.pointer_down(&mut self.simulation, at);
		self.dirty |= hit;
		hit
	}

	pub fn pointer_up(&mut self, at: Point) {
		self.interaction.pointer_up(&mut self.simulation, at);
		self.dirty = true;
	}

	pub fn pointer_leave(&mut self) {
		self.interaction.pointer_leave();
		self.dirty = true;
	}

	pub fn focus(&self) -> Option<&str> {
		self.interaction.focus()
	}

	pub fn view(&self) -> TopologyView {
		TopologyView {
			nodes: self.simulation.nodes().to_vec(),
			links: self.simulation.links().to_vec(),
		}
	}
}
