use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;

use super::types::{Link, Node, NodeKind, Point, Velocity};

/// Alpha floor after the reconciled data set changes.
pub const DATA_ALPHA: f64 = 0.6;
/// Alpha floor after a resize, a drag move or a drag release.
pub const NUDGE_ALPHA: f64 = 0.2;
/// Alpha target held while a node is dragged.
pub const DRAG_ALPHA_TARGET: f64 = 0.3;

const DISTANCE_MIN2: f64 = 1.0;
const SPIRAL_RADIUS: f64 = 10.0;

#[derive(Clone, Debug, PartialEq)]
pub struct LayoutParams {
	/// Many-body strength; negative values repel.
	pub charge_strength: f64,
	pub link_strength: f64,
	pub device_link_distance: f64,
	pub host_link_distance: f64,
	pub device_radius: f64,
	pub host_radius: f64,
	pub collision_passes: usize,
	pub collision_strength: f64,
	pub alpha_decay: f64,
	pub alpha_min: f64,
	pub velocity_decay: f64,
	pub center_strength: f64,
}

impl Default for LayoutParams {
	fn default() -> Self {
		Self {
			charge_strength: -80.0,
			link_strength: 0.2,
			device_link_distance: 90.0,
			host_link_distance: 50.0,
			device_radius: 18.0,
			host_radius: 12.0,
			collision_passes: 2,
			collision_strength: 1.0,
			alpha_decay: 0.02,
			alpha_min: 0.001,
			velocity_decay: 0.4,
			center_strength: 0.1,
		}
	}
}

impl LayoutParams {
	pub fn radius(&self, kind: NodeKind) -> f64 {
		match kind {
			NodeKind::Device => self.device_radius,
			NodeKind::Host => self.host_radius,
		}
	}

	/// Hosts sit closer to their attachment device than devices to each other.
	pub fn rest_length(&self, a: NodeKind, b: NodeKind) -> f64 {
		if a == NodeKind::Host || b == NodeKind::Host {
			self.host_link_distance
		} else {
			self.device_link_distance
		}
	}
}

/// A link resolved to node indices for the current data set.
#[derive(Clone, Debug)]
struct Spring {
	source: usize,
	target: usize,
	rest_length: f64,
	bias: f64,
}

/// Working copy of a node for one simulation step.
#[derive(Clone, Copy, Debug)]
struct Body {
	x: f64,
	y: f64,
	vx: f64,
	vy: f64,
	radius: f64,
	pin: Option<Point>,
}

/// Deterministic source of tiny offsets for coincident bodies.
#[derive(Clone, Debug)]
struct Jiggle(u32);

impl Jiggle {
	fn next(&mut self) -> f64 {
		self.0 = self.0.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
		let offset = (f64::from(self.0) / 4_294_967_296.0 - 0.5) * 1e-6;
		if offset == 0.0 { 1e-6 } else { offset }
	}
}

/// The live node/link table and the force simulation that moves it.
///
/// This is the only owner of layout state: the reconciler reads [`nodes`],
/// the input controller writes pins through [`set_pin`], and the renderer
/// only ever sees a shared borrow between steps.
///
/// [`nodes`]: Simulation::nodes
/// [`set_pin`]: Simulation::set_pin
pub struct Simulation {
	params: LayoutParams,
	nodes: Vec<Node>,
	links: Vec<Link>,
	index: HashMap<String, usize>,
	springs: Vec<Spring>,
	center: Point,
	alpha: f64,
	alpha_target: f64,
	jiggle: Jiggle,
}

impl Simulation {
	pub fn new(params: LayoutParams, center: Point) -> Self {
		Self {
			params,
			nodes: Vec::new(),
			links: Vec::new(),
			index: HashMap::new(),
			springs: Vec::new(),
			center,
			alpha: 1.0,
			alpha_target: 0.0,
			jiggle: Jiggle(1),
		}
	}

	pub fn nodes(&self) -> &[Node] {
		&self.nodes
	}

	pub fn links(&self) -> &[Link] {
		&self.links
	}

	pub fn node(&self, id: &str) -> Option<&Node> {
		self.index.get(id).map(|&i| &self.nodes[i])
	}

	pub fn contains(&self, id: &str) -> bool {
		self.index.contains_key(id)
	}

	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	pub fn center(&self) -> Point {
		self.center
	}

	/// Whether the simulation still has energy to spend.
	pub fn is_active(&self) -> bool {
		self.alpha >= self.params.alpha_min
	}

	/// Swap in a reconciled data set.
	///
	/// Unplaced nodes get a position on a spiral around the center. Links with
	/// an unknown endpoint are dropped. Energy is reinjected only when node or
	/// link membership changed; returns whether it did.
	pub fn replace(&mut self, mut nodes: Vec<Node>, links: Vec<Link>) -> bool {
		let nodes_changed = !same_ids(
			self.nodes.iter().map(|n| n.id.as_str()),
			nodes.iter().map(|n| n.id.as_str()),
		);

		for (i, node) in nodes.iter_mut().enumerate() {
			if node.position.is_none() {
				node.position = Some(node.pin.unwrap_or_else(|| spiral(self.center, i)));
			}
			if node.velocity.is_none() {
				node.velocity = Some(Velocity::default());
			}
		}

		let index: HashMap<String, usize> = nodes
			.iter()
			.enumerate()
			.map(|(i, n)| (n.id.clone(), i))
			.collect();
		let links: Vec<Link> = links
			.into_iter()
			.filter(|l| index.contains_key(&l.source) && index.contains_key(&l.target))
			.collect();
		// Compared after filtering, since the live set never holds dangling links.
		let links_changed = !same_ids(
			self.links.iter().map(|l| l.id.as_str()),
			links.iter().map(|l| l.id.as_str()),
		);

		self.index = index;
		self.links = links;
		self.nodes = nodes;
		self.springs = self.resolve_springs();

		let changed = nodes_changed || links_changed;
		if changed {
			self.reheat(DATA_ALPHA);
		}
		changed
	}

	fn resolve_springs(&self) -> Vec<Spring> {
		let mut degree = vec![0usize; self.nodes.len()];
		let pairs: Vec<(usize, usize)> = self
			.links
			.iter()
			.map(|l| (self.index[&l.source], self.index[&l.target]))
			.filter(|(s, t)| s != t)
			.collect();
		for &(s, t) in &pairs {
			degree[s] += 1;
			degree[t] += 1;
		}
		pairs
			.into_iter()
			.map(|(source, target)| Spring {
				source,
				target,
				rest_length: self
					.params
					.rest_length(self.nodes[source].kind, self.nodes[target].kind),
				bias: degree[source] as f64 / (degree[source] + degree[target]) as f64,
			})
			.collect()
	}

	pub fn set_center(&mut self, center: Point) {
		self.center = center;
	}

	/// Pin a node to `pin`, or release it with `None`. Returns false for
	/// unknown ids.
	pub fn set_pin(&mut self, id: &str, pin: Option<Point>) -> bool {
		let Some(&i) = self.index.get(id) else {
			return false;
		};
		let node = &mut self.nodes[i];
		node.pin = pin;
		if let Some(pin) = pin {
			node.position = Some(pin);
			node.velocity = Some(Velocity::default());
		}
		true
	}

	/// Raise alpha to at least `alpha`, restarting the decay.
	pub fn reheat(&mut self, alpha: f64) {
		self.alpha = self.alpha.max(alpha);
	}

	pub fn set_alpha_target(&mut self, target: f64) {
		self.alpha_target = target;
	}

	/// Advance one step if there is energy left. Returns whether it stepped.
	pub fn tick(&mut self) -> bool {
		if !self.is_active() {
			return false;
		}
		self.step();
		true
	}

	/// Advance exactly one step regardless of remaining energy.
	pub fn step(&mut self) {
		self.alpha += (self.alpha_target - self.alpha) * self.params.alpha_decay;

		let mut bodies: Vec<Body> = self
			.nodes
			.iter()
			.map(|n| {
				let p = n.position.unwrap_or(self.center);
				let v = n.velocity.unwrap_or_default();
				Body {
					x: p.x,
					y: p.y,
					vx: v.vx,
					vy: v.vy,
					radius: self.params.radius(n.kind),
					pin: n.pin,
				}
			})
			.collect();

		self.apply_charge(&mut bodies);
		self.apply_springs(&mut bodies);
		for _ in 0..self.params.collision_passes {
			self.apply_collision(&mut bodies);
		}
		self.apply_centering(&mut bodies);

		let friction = 1.0 - self.params.velocity_decay;
		for (node, body) in self.nodes.iter_mut().zip(&mut bodies) {
			if let Some(pin) = body.pin {
				body.x = pin.x;
				body.y = pin.y;
				body.vx = 0.0;
				body.vy = 0.0;
			} else {
				body.vx *= friction;
				body.vy *= friction;
				body.x += body.vx;
				body.y += body.vy;
			}
			node.position = Some(Point::new(body.x, body.y));
			node.velocity = Some(Velocity {
				vx: body.vx,
				vy: body.vy,
			});
		}
	}

	fn apply_charge(&mut self, bodies: &mut [Body]) {
		let strength = self.params.charge_strength * self.alpha;
		for i in 0..bodies.len() {
			for j in (i + 1)..bodies.len() {
				let mut dx = bodies[j].x - bodies[i].x;
				let mut dy = bodies[j].y - bodies[i].y;
				let mut l2 = dx * dx + dy * dy;
				if l2 == 0.0 {
					dx = self.jiggle.next();
					dy = self.jiggle.next();
					l2 = dx * dx + dy * dy;
				}
				if l2 < DISTANCE_MIN2 {
					l2 = (DISTANCE_MIN2 * l2).sqrt();
				}
				let w = strength / l2;
				bodies[i].vx += dx * w;
				bodies[i].vy += dy * w;
				bodies[j].vx -= dx * w;
				bodies[j].vy -= dy * w;
			}
		}
	}

	fn apply_springs(&mut self, bodies: &mut [Body]) {
		let strength = self.params.link_strength * self.alpha;
		for spring in &self.springs {
			let (s, t) = (bodies[spring.source], bodies[spring.target]);
			let mut x = t.x + t.vx - s.x - s.vx;
			let mut y = t.y + t.vy - s.y - s.vy;
			if x == 0.0 {
				x = self.jiggle.next();
			}
			if y == 0.0 {
				y = self.jiggle.next();
			}
			let l = (x * x + y * y).sqrt();
			let k = (l - spring.rest_length) / l * strength;
			x *= k;
			y *= k;
			bodies[spring.target].vx -= x * spring.bias;
			bodies[spring.target].vy -= y * spring.bias;
			bodies[spring.source].vx += x * (1.0 - spring.bias);
			bodies[spring.source].vy += y * (1.0 - spring.bias);
		}
	}

	fn apply_collision(&mut self, bodies: &mut [Body]) {
		let strength = self.params.collision_strength;
		for i in 0..bodies.len() {
			let ri = bodies[i].radius;
			let ri2 = ri * ri;
			let xi = bodies[i].x + bodies[i].vx;
			let yi = bodies[i].y + bodies[i].vy;
			for j in (i + 1)..bodies.len() {
				let rj = bodies[j].radius;
				let r = ri + rj;
				let mut x = xi - bodies[j].x - bodies[j].vx;
				let mut y = yi - bodies[j].y - bodies[j].vy;
				let mut l = x * x + y * y;
				if l >= r * r {
					continue;
				}
				if x == 0.0 {
					x = self.jiggle.next();
					l += x * x;
				}
				if y == 0.0 {
					y = self.jiggle.next();
					l += y * y;
				}
				let d = l.sqrt();
				let k = (r - d) / d * strength;
				x *= k;
				y *= k;
				let share = rj * rj / (ri2 + rj * rj);
				bodies[i].vx += x * share;
				bodies[i].vy += y * share;
				bodies[j].vx -= x * (1.0 - share);
				bodies[j].vy -= y * (1.0 - share);
			}
		}
	}

	fn apply_centering(&self, bodies: &mut [Body]) {
		if bodies.is_empty() {
			return;
		}
		let n = bodies.len() as f64;
		let (sx, sy) = bodies.iter().fold((0.0, 0.0), |(sx, sy), b| (sx + b.x, sy + b.y));
		let shift_x = (sx / n - self.center.x) * self.params.center_strength;
		let shift_y = (sy / n - self.center.y) * self.params.center_strength;
		for body in bodies {
			body.x -= shift_x;
			body.y -= shift_y;
		}
	}

	/// Topmost node whose icon circle, grown by `padding`, contains `at`.
	///
	/// Later nodes are drawn over earlier ones, so the search runs backwards.
	pub fn hit_test(&self, at: Point, padding: f64) -> Option<&Node> {
		self.nodes.iter().rev().find(|node| {
			node.position.is_some_and(|p| {
				let r = node.kind.icon_size() / 2.0 + padding;
				p.distance(at) <= r
			})
		})
	}
}

fn same_ids<'a>(
	current: impl ExactSizeIterator<Item = &'a str>,
	next: impl ExactSizeIterator<Item = &'a str>,
) -> bool {
	if current.len() != next.len() {
		return false;
	}
	let current: HashSet<&str> = current.collect();
	next.into_iter().all(|id| current.contains(id))
}

/// Phyllotaxis placement, so that unplaced nodes never start coincident.
fn spiral(center: Point, i: usize) -> Point {
	let radius = SPIRAL_RADIUS * (0.5 + i as f64).sqrt();
	let angle = i as f64 * PI * (3.0 - 5f64.sqrt());
	Point::new(center.x + radius * angle.cos(), center.y + radius * angle.sin())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn device(id: &str) -> Node {
		Node::new(id, id, NodeKind::Device)
	}

	fn host(id: &str) -> Node {
		Node::new(id, id, NodeKind::Host)
	}

	fn link(source: &str, target: &str) -> Link {
		Link {
			id: format!("{source}-{target}"),
			source: source.into(),
			target: target.into(),
		}
	}

	fn scenario_a() -> Simulation {
		let mut sim = Simulation::new(LayoutParams::default(), Point::new(200.0, 150.0));
		sim.replace(
			vec![device("d1"), device("d2"), host("h1")],
			vec![link("d1", "d2"), link("h1", "d1")],
		);
		sim
	}

	fn position(sim: &Simulation, id: &str) -> Point {
		sim.node(id).and_then(|n| n.position).unwrap()
	}

	#[test]
	fn host_links_rest_shorter_than_device_links() {
		let params = LayoutParams::default();
		assert!(params.host_link_distance < params.device_link_distance);
		assert_eq!(params.rest_length(NodeKind::Host, NodeKind::Device), 50.0);
		assert_eq!(params.rest_length(NodeKind::Device, NodeKind::Device), 90.0);
		assert!(params.radius(NodeKind::Device) > params.radius(NodeKind::Host));
	}

	#[test]
	fn replace_places_every_node() {
		let sim = scenario_a();
		assert!(sim.nodes().iter().all(|n| n.position.is_some() && n.velocity.is_some()));
		let a = position(&sim, "d1");
		let b = position(&sim, "d2");
		assert!(a.distance(b) > 0.0);
	}

	#[test]
	fn dragged_node_follows_pointer_every_step() {
		let mut sim = scenario_a();
		for _ in 0..20 {
			sim.step();
		}
		assert!(sim.set_pin("d1", Some(Point::new(120.0, 80.0))));
		sim.set_alpha_target(DRAG_ALPHA_TARGET);
		for _ in 0..5 {
			sim.step();
			assert_eq!(position(&sim, "d1"), Point::new(120.0, 80.0));
		}
	}

	#[test]
	fn coincident_nodes_separate_without_blowing_up() {
		let mut sim = Simulation::new(LayoutParams::default(), Point::new(0.0, 0.0));
		let mut a = device("a");
		let mut b = device("b");
		a.position = Some(Point::new(50.0, 50.0));
		b.position = Some(Point::new(50.0, 50.0));
		sim.replace(vec![a, b], Vec::new());

		for _ in 0..300 {
			sim.step();
			for node in sim.nodes() {
				let p = node.position.unwrap();
				assert!(p.x.is_finite() && p.y.is_finite());
			}
		}
		let min = LayoutParams::default().device_radius * 2.0;
		assert!(position(&sim, "a").distance(position(&sim, "b")) >= min);
	}

	#[test]
	fn new_node_does_not_move_existing_ones_on_entry() {
		let mut sim = scenario_a();
		for _ in 0..50 {
			sim.step();
		}
		sim.set_pin("d2", Some(Point::new(10.0, 10.0)));
		let before: Vec<Node> = sim.nodes().to_vec();

		let mut next = before.clone();
		next.push(host("h2"));
		sim.replace(next, vec![link("d1", "d2"), link("h2", "d2")]);

		for old in &before {
			let now = sim.node(&old.id).unwrap();
			assert_eq!(now.position, old.position);
			assert_eq!(now.pin, old.pin);
		}
		assert!(sim.node("h2").unwrap().position.is_some());
	}

	#[test]
	fn energy_only_returns_when_membership_changes() {
		let mut sim = scenario_a();
		while sim.tick() {}
		assert!(!sim.is_active());

		let same = sim.nodes().to_vec();
		let links = sim.links().to_vec();
		assert!(!sim.replace(same.clone(), links.clone()));
		assert!(!sim.is_active());

		let mut grown = same;
		grown.push(host("h9"));
		assert!(sim.replace(grown, links));
		assert!(sim.alpha() >= DATA_ALPHA);
		assert!(sim.is_active());
	}

	#[test]
	fn links_with_unknown_endpoints_are_dropped() {
		let mut sim = Simulation::new(LayoutParams::default(), Point::default());
		sim.replace(vec![device("d1")], vec![link("d1", "ghost")]);
		assert!(sim.links().is_empty());
	}

	#[test]
	fn settles_with_linked_pair_near_rest_length() {
		let mut sim = Simulation::new(LayoutParams::default(), Point::new(300.0, 200.0));
		sim.replace(vec![device("d1"), host("h1")], vec![link("h1", "d1")]);
		let mut steps = 0;
		while sim.tick() {
			steps += 1;
		}
		assert!(steps < 1000);
		let d = position(&sim, "d1").distance(position(&sim, "h1"));
		assert!(d > LayoutParams::default().host_radius + LayoutParams::default().device_radius);
		assert!(d.is_finite());
	}

	#[test]
	fn hit_test_prefers_topmost_node() {
		let mut sim = Simulation::new(LayoutParams::default(), Point::default());
		let mut under = device("under");
		let mut over = host("over");
		under.position = Some(Point::new(0.0, 0.0));
		over.position = Some(Point::new(4.0, 0.0));
		sim.replace(vec![under, over], Vec::new());

		assert_eq!(sim.hit_test(Point::new(2.0, 0.0), 4.0).unwrap().id, "over");
		assert_eq!(sim.hit_test(Point::new(-16.0, 0.0), 4.0).unwrap().id, "under");
		assert!(sim.hit_test(Point::new(100.0, 100.0), 4.0).is_none());
	}

	#[test]
	fn dangling_link_does_not_reheat_a_settled_graph() {
		let mut sim = Simulation::new(LayoutParams::default(), Point::new(100.0, 100.0));
		let links = vec![link("d1", "d2"), link("d1", "ghost")];
		assert!(sim.replace(vec![device("d1"), device("d2")], links.clone()));
		while sim.tick() {}

		let nodes = sim.nodes().to_vec();
		assert!(!sim.replace(nodes, links));
		assert!(!sim.is_active());
		assert_eq!(sim.links().len(), 1);
	}

	#[test]
	fn centroid_settles_on_the_center() {
		let mut sim = Simulation::new(LayoutParams::default(), Point::new(0.0, 0.0));
		let mut nodes = vec![device("d1"), device("d2"), host("h1")];
		for (node, at) in nodes.iter_mut().zip([(20.0, 0.0), (60.0, 10.0), (30.0, 40.0)]) {
			node.position = Some(Point::new(at.0, at.1));
		}
		sim.replace(nodes, vec![link("d1", "d2"), link("h1", "d1")]);
		sim.set_center(Point::new(500.0, 300.0));
		while sim.tick() {}

		let n = sim.nodes().len() as f64;
		let (sx, sy) = sim
			.nodes()
			.iter()
			.filter_map(|node| node.position)
			.fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
		let centroid = Point::new(sx / n, sy / n);
		assert!(
			centroid.distance(Point::new(500.0, 300.0)) < 1.0,
			"centroid at {centroid:?}"
		);
	}

	#[test]
	fn coincident_device_and_host_separate_by_both_radii() {
		let mut sim = Simulation::new(LayoutParams::default(), Point::new(0.0, 0.0));
		let mut d = device("d");
		let mut h = host("h");
		d.position = Some(Point::new(-40.0, 25.0));
		h.position = Some(Point::new(-40.0, 25.0));
		sim.replace(vec![d, h], Vec::new());

		for _ in 0..300 {
			sim.step();
			assert!(sim.nodes().iter().all(|n| {
				let p = n.position.unwrap();
				p.x.is_finite() && p.y.is_finite()
			}));
		}
		let params = LayoutParams::default();
		let min = params.device_radius + params.host_radius;
		assert!(position(&sim, "d").distance(position(&sim, "h")) >= min);
	}

	#[test]
	fn unknown_pin_is_rejected() {
		let mut sim = scenario_a();
		assert!(!sim.set_pin("nope", Some(Point::default())));
	}
}
