use super::layout::{DRAG_ALPHA_TARGET, NUDGE_ALPHA, Simulation};
use super::types::Point;

/// Extra slack around a node's icon when hit-testing the pointer.
pub const HIT_PADDING: f64 = 4.0;

/// Pointer interaction state.
///
/// A dragged node always carries a pin in the simulation; the pin is set on
/// entry to `Dragging` and cleared on exit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Interaction {
	#[default]
	Idle,
	Hovering(String),
	Dragging(String),
}

impl Interaction {
	/// The node that should be highlighted, if any.
	pub fn focus(&self) -> Option<&str> {
		match self {
			Interaction::Idle => None,
			Interaction::Hovering(id) | Interaction::Dragging(id) => Some(id),
		}
	}

	pub fn is_dragging(&self) -> bool {
		matches!(self, Interaction::Dragging(_))
	}

	fn hover_at(sim: &Simulation, at: Point) -> Self {
		match sim.hit_test(at, HIT_PADDING) {
			Some(node) => Interaction::Hovering(node.id.clone()),
			None => Interaction::Idle,
		}
	}

	/// Returns true when the focused node changed.
	pub fn pointer_move(&mut self, sim: &mut Simulation, at: Point) -> bool {
		if let Interaction::Dragging(id) = &*self {
			sim.set_pin(id, Some(at));
			sim.reheat(NUDGE_ALPHA);
			return false;
		}
		let next = Self::hover_at(sim, at);
		let changed = next != *self;
		*self = next;
		changed
	}

	/// Start dragging the node under the pointer. Returns true if one was hit.
	pub fn pointer_down(&mut self, sim: &mut Simulation, at: Point) -> bool {
		if self.is_dragging() {
			return false;
		}
		let Some(id) = sim.hit_test(at, HIT_PADDING).map(|n| n.id.clone()) else {
			return false;
		};
		sim.set_pin(&id, Some(at));
		sim.set_alpha_target(DRAG_ALPHA_TARGET);
		sim.reheat(DRAG_ALPHA_TARGET);
		*self = Interaction::Dragging(id);
		true
	}

	/// Release a drag and re-evaluate hover at the release point.
	pub fn pointer_up(&mut self, sim: &mut Simulation, at: Point) {
		self.release(sim);
		*self = Self::hover_at(sim, at);
	}

	/// The pointer left the surface.
	pub fn pointer_leave(&mut self) {
		if !self.is_dragging() {
			*self = Interaction::Idle;
		}
	}

	/// Return to `Idle` if the focused node is no longer in the live set.
	pub fn forget_missing(&mut self, sim: &mut Simulation) {
		let gone = self.focus().is_some_and(|id| !sim.contains(id));
		if gone {
			if self.is_dragging() {
				sim.set_alpha_target(0.0);
			}
			*self = Interaction::Idle;
		}
	}

	fn release(&mut self, sim: &mut Simulation) {
		if let Interaction::Dragging(id) = &*self {
			sim.set_pin(id, None);
			sim.set_alpha_target(0.0);
			sim.reheat(NUDGE_ALPHA);
		}
	}
}
