use std::f64::consts::PI;

use web_sys::{CanvasRenderingContext2d, HtmlImageElement};

use super::error::{Result, TopologyError};
use super::state::TopologyState;
use super::types::{NodeKind, Point};

/// Labels longer than this many characters are elided.
pub const LABEL_BUDGET: usize = 14;

const LINK_COLOR: &str = "#94a3b8";
const LINK_WIDTH: f64 = 1.2;
const RING_COLOR: &str = "#0ea5e9";
const RING_GAP: f64 = 3.0;
const RING_WIDTH: f64 = 2.0;
const LABEL_COLOR: &str = "#111827";
const LABEL_FONT: &str = "13px system-ui, sans-serif";
const LABEL_GAP: f64 = 4.0;
const LEGEND_FONT: &str = "14px system-ui, sans-serif";
const LEGEND_BACKGROUND: &str = "rgba(255, 255, 255, 0.8)";

/// The drawing operations the renderer needs from a 2D target.
pub trait Surface {
	fn clear(&mut self, width: f64, height: f64) -> Result<()>;
	fn line(&mut self, from: Point, to: Point, color: &str, width: f64) -> Result<()>;
	fn fill_circle(&mut self, center: Point, radius: f64, color: &str) -> Result<()>;
	fn stroke_circle(&mut self, center: Point, radius: f64, color: &str, width: f64)
	-> Result<()>;
	fn fill_rect(&mut self, origin: Point, width: f64, height: f64, color: &str) -> Result<()>;
	/// Draw the icon for `kind` centered on `center`. Returns false when the
	/// icon is not loaded yet and nothing was drawn.
	fn icon(&mut self, kind: NodeKind, center: Point, size: f64) -> Result<bool>;
	/// Draw `text` horizontally centered on `at.x` with its top at `at.y`,
	/// or left-aligned at `at` when `centered` is false.
	fn text(&mut self, text: &str, at: Point, font: &str, color: &str, centered: bool)
	-> Result<()>;
}

pub fn truncate_label(label: &str, max: usize) -> String {
	if label.chars().count() <= max {
		return label.to_owned();
	}
	let mut out: String = label.chars().take(max.saturating_sub(1)).collect();
	out.push('…');
	out
}

/// Paint one frame of the current layout.
pub fn render(state: &TopologyState, surface: &mut impl Surface) -> Result<()> {
	surface.clear(state.width, state.height)?;
	draw_links(state, surface)?;
	draw_nodes(state, surface)?;
	draw_legend(surface)
}

fn draw_links(state: &TopologyState, surface: &mut impl Surface) -> Result<()> {
	let sim = &state.simulation;
	for link in sim.links() {
		let from = sim.node(&link.source).and_then(|n| n.position);
		let to = sim.node(&link.target).and_then(|n| n.position);
		let (Some(from), Some(to)) = (from, to) else {
			continue;
		};
		surface.line(from, to, LINK_COLOR, LINK_WIDTH)?;
	}
	Ok(())
}

fn draw_nodes(state: &TopologyState, surface: &mut impl Surface) -> Result<()> {
	let focus = state.interaction.focus();
	for node in state.simulation.nodes() {
		let Some(at) = node.position else {
			continue;
		};
		let size = node.kind.icon_size();
		let r = size / 2.0;

		if focus == Some(node.id.as_str()) {
			surface.stroke_circle(at, r + RING_GAP, RING_COLOR, RING_WIDTH)?;
		}
		if !surface.icon(node.kind, at, size)? {
			surface.fill_circle(at, r, node.kind.color())?;
		}
		let label = truncate_label(&node.label, LABEL_BUDGET);
		surface.text(
			&label,
			Point::new(at.x, at.y + r + LABEL_GAP),
			LABEL_FONT,
			LABEL_COLOR,
			true,
		)?;
	}
	Ok(())
}

fn draw_legend(surface: &mut impl Surface) -> Result<()> {
	surface.fill_rect(Point::new(8.0, 8.0), 170.0, 32.0, LEGEND_BACKGROUND)?;
	let mut x = 24.0;
	for kind in [NodeKind::Device, NodeKind::Host] {
		surface.fill_circle(Point::new(x, 24.0), 7.0, kind.color())?;
		let at = Point::new(x + 12.0, 16.0);
		surface.text(kind.name(), at, LEGEND_FONT, LABEL_COLOR, false)?;
		x += 80.0;
	}
	Ok(())
}

/// Node icons, loaded asynchronously by the browser.
pub struct IconSet {
	device: HtmlImageElement,
	host: HtmlImageElement,
}

impl IconSet {
	pub fn load(device_src: &str, host_src: &str) -> Result<Self> {
		let device = HtmlImageElement::new().map_err(TopologyError::canvas)?;
		let host = HtmlImageElement::new().map_err(TopologyError::canvas)?;
		device.set_src(device_src);
		host.set_src(host_src);
		Ok(Self { device, host })
	}

	pub fn images(&self) -> [&HtmlImageElement; 2] {
		[&self.device, &self.host]
	}

	fn ready(&self, kind: NodeKind) -> Option<&HtmlImageElement> {
		let image = match kind {
			NodeKind::Device => &self.device,
			NodeKind::Host => &self.host,
		};
		(image.complete() && image.natural_width() > 0).then_some(image)
	}
}

/// A [`Surface`] backed by a browser canvas context.
pub struct CanvasSurface<'a> {
	pub ctx: &'a CanvasRenderingContext2d,
	pub icons: Option<&'a IconSet>,
}

impl Surface for CanvasSurface<'_> {
	fn clear(&mut self, width: f64, height: f64) -> Result<()> {
		self.ctx.clear_rect(0.0, 0.0, width, height);
		Ok(())
	}

	fn line(&mut self, from: Point, to: Point, color: &str, width: f64) -> Result<()> {
		self.ctx.set_stroke_style_str(color);
		self.ctx.set_line_width(width);
		self.ctx.begin_path();
		self.ctx.move_to(from.x, from.y);
		self.ctx.line_to(to.x, to.y);
		self.ctx.stroke();
		Ok(())
	}

	fn fill_circle(&mut self, center: Point, radius: f64, color: &str) -> Result<()> {
		self.ctx.begin_path();
		self.ctx
			.arc(center.x, center.y, radius, 0.0, 2.0 * PI)
			.map_err(TopologyError::canvas)?;
		self.ctx.set_fill_style_str(color);
		self.ctx.fill();
		Ok(())
	}

	fn stroke_circle(
		&mut self,
		center: Point,
		radius: f64,
		color: &str,
		width: f64,
	) -> Result<()> {
		self.ctx.begin_path();
		self.ctx
			.arc(center.x, center.y, radius, 0.0, 2.0 * PI)
			.map_err(TopologyError::canvas)?;
		self.ctx.set_stroke_style_str(color);
		self.ctx.set_line_width(width);
		self.ctx.stroke();
		Ok(())
	}

	fn fill_rect(&mut self, origin: Point, width: f64, height: f64, color: &str) -> Result<()> {
		self.ctx.set_fill_style_str(color);
		self.ctx.fill_rect(origin.x, origin.y, width, height);
		Ok(())
	}

	fn icon(&mut self, kind: NodeKind, center: Point, size: f64) -> Result<bool> {
		let Some(image) = self.icons.and_then(|icons| icons.ready(kind)) else {
			return Ok(false);
		};
		let r = size / 2.0;
		self.ctx
			.draw_image_with_html_image_element_and_dw_and_dh(
				image,
				center.x - r,
				center.y - r,
				size,
				size,
			)
			.map_err(TopologyError::canvas)?;
		Ok(true)
	}

	fn text(
		&mut self,
		text: &str,
		at: Point,
		font: &str,
		color: &str,
		centered: bool,
	) -> Result<()> {
		self.ctx.set_fill_style_str(color);
		self.ctx.set_font(font);
		self.ctx.set_text_align(if centered { "center" } else { "left" });
		self.ctx.set_text_baseline("top");
		self.ctx
			.fill_text(text, at.x, at.y)
			.map_err(TopologyError::canvas)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::topology::config::TopologyConfig;
	use crate::components::topology::types::{Link, Node};

	#[derive(Debug, PartialEq)]
	enum Op {
		Clear,
		Line(Point, Point),
		Circle(Point, f64, String),
		Ring(Point, f64),
		Rect,
		Icon(NodeKind, Point),
		Text(String),
	}

	#[derive(Default)]
	struct Recorder {
		ops: Vec<Op>,
		icons_loaded: bool,
		fail_text: bool,
	}

	impl Surface for Recorder {
		fn clear(&mut self, _: f64, _: f64) -> Result<()> {
			self.ops.push(Op::Clear);
			Ok(())
		}
		fn line(&mut self, from: Point, to: Point, _: &str, _: f64) -> Result<()> {
			self.ops.push(Op::Line(from, to));
			Ok(())
		}
		fn fill_circle(&mut self, center: Point, radius: f64, color: &str) -> Result<()> {
			self.ops.push(Op::Circle(center, radius, color.into()));
			Ok(())
		}
		fn stroke_circle(&mut self, center: Point, radius: f64, _: &str, _: f64) -> Result<()> {
			self.ops.push(Op::Ring(center, radius));
			Ok(())
		}
		fn fill_rect(&mut self, _: Point, _: f64, _: f64, _: &str) -> Result<()> {
			self.ops.push(Op::Rect);
			Ok(())
		}
		fn icon(&mut self, kind: NodeKind, center: Point, _: f64) -> Result<bool> {
			if self.icons_loaded {
				self.ops.push(Op::Icon(kind, center));
			}
			Ok(self.icons_loaded)
		}
		fn text(&mut self, text: &str, _: Point, _: &str, _: &str, _: bool) -> Result<()> {
			if self.fail_text {
				return Err(TopologyError::Canvas("gone".into()));
			}
			self.ops.push(Op::Text(text.into()));
			Ok(())
		}
	}

	fn state() -> TopologyState {
		let mut state = TopologyState::new(&TopologyConfig::default(), 400.0, 300.0, 1.0);
		let mut d1 = Node::new("d1", "core-switch-number-one", NodeKind::Device);
		let mut h1 = Node::new("h1", "10.0.0.1", NodeKind::Host);
		d1.position = Some(Point::new(100.0, 100.0));
		h1.position = Some(Point::new(150.0, 100.0));
		state.simulation.replace(
			vec![d1, h1],
			vec![Link {
				id: "host:h1>d1".into(),
				source: "h1".into(),
				target: "d1".into(),
			}],
		);
		state
	}

	#[test]
	fn truncates_with_ellipsis() {
		assert_eq!(truncate_label("short", 14), "short");
		assert_eq!(truncate_label("exactly-14-chr", 14), "exactly-14-chr");
		assert_eq!(truncate_label("0000000000000001", 14), "0000000000000…");
		assert_eq!(truncate_label("ab", 0), "…");
	}

	#[test]
	fn draws_links_before_nodes_with_fallback_circles() {
		let state = state();
		let mut surface = Recorder::default();
		render(&state, &mut surface).unwrap();

		assert_eq!(surface.ops[0], Op::Clear);
		assert_eq!(
			surface.ops[1],
			Op::Line(Point::new(150.0, 100.0), Point::new(100.0, 100.0))
		);
		assert_eq!(
			surface.ops[2],
			Op::Circle(Point::new(100.0, 100.0), 14.0, "#2563eb".into())
		);
		assert_eq!(surface.ops[3], Op::Text("core-switch-n…".into()));
		assert_eq!(
			surface.ops[4],
			Op::Circle(Point::new(150.0, 100.0), 11.0, "#22c55e".into())
		);
		assert_eq!(surface.ops[5], Op::Text("10.0.0.1".into()));
		assert!(!surface.ops.iter().any(|op| matches!(op, Op::Ring(..))));
	}

	#[test]
	fn loaded_icons_replace_circles() {
		let state = state();
		let mut surface = Recorder {
			icons_loaded: true,
			..Recorder::default()
		};
		render(&state, &mut surface).unwrap();
		assert!(surface.ops.contains(&Op::Icon(NodeKind::Device, Point::new(100.0, 100.0))));
		assert!(surface.ops.contains(&Op::Icon(NodeKind::Host, Point::new(150.0, 100.0))));
		// only the legend swatches remain as circles
		let circles = surface.ops.iter().filter(|op| matches!(op, Op::Circle(..))).count();
		assert_eq!(circles, 2);
	}

	#[test]
	fn focused_node_gets_a_ring() {
		let mut state = state();
		state.pointer_move(Point::new(150.0, 100.0));
		let mut surface = Recorder::default();
		render(&state, &mut surface).unwrap();
		assert!(surface.ops.contains(&Op::Ring(Point::new(150.0, 100.0), 14.0)));
	}

	#[test]
	fn links_to_removed_nodes_are_not_drawn() {
		let mut state = state();
		let d1 = state.simulation.node("d1").cloned().unwrap();
		let links = state.simulation.links().to_vec();
		state.simulation.replace(vec![d1], links);
		let mut surface = Recorder::default();
		render(&state, &mut surface).unwrap();
		assert!(!surface.ops.iter().any(|op| matches!(op, Op::Line(..))));
	}

	#[test]
	fn surface_failure_aborts_the_frame() {
		let state = state();
		let mut surface = Recorder {
			fail_text: true,
			..Recorder::default()
		};
		assert!(render(&state, &mut surface).is_err());
		assert_eq!(surface.ops.len(), 3);
	}
}
