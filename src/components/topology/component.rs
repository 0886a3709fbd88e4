use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use gloo::timers::callback::Interval;
use leptos::prelude::*;
use leptos::task::spawn_local;
use log::{error, info, warn};
use send_wrapper::SendWrapper;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, PointerEvent, Window};

use super::config::TopologyConfig;
use super::error::{Result, TopologyError};
use super::fetch::SnapshotClient;
use super::render::{self, CanvasSurface, IconSet};
use super::state::TopologyState;
use super::types::{Point, TopologyView};

const FALLBACK_WIDTH: f64 = 800.0;
const FALLBACK_HEIGHT: f64 = 384.0;

/// Browser resources held for the lifetime of one mounted canvas.
#[derive(Default)]
struct Runtime {
	poll: Option<Interval>,
	animate: Option<Closure<dyn FnMut()>>,
	frame_request: Option<i32>,
	resize: Option<Closure<dyn FnMut()>>,
	icon_loaded: Option<Closure<dyn FnMut()>>,
	icons: Option<Rc<IconSet>>,
}

/// Cheap handle shared by the timer, the frame loop and the event handlers.
#[derive(Clone)]
struct Handles {
	state: Rc<RefCell<Option<TopologyState>>>,
	runtime: Rc<RefCell<Runtime>>,
	alive: Arc<AtomicBool>,
	topology: Option<RwSignal<TopologyView>>,
	focus: Option<RwSignal<Option<String>>>,
}

impl Handles {
	fn is_alive(&self) -> bool {
		self.alive.load(Ordering::Acquire)
	}

	fn with_state<R>(&self, f: impl FnOnce(&mut TopologyState) -> R) -> Option<R> {
		self.state.borrow_mut().as_mut().map(f)
	}

	fn start(
		&self,
		canvas: HtmlCanvasElement,
		config: &TopologyConfig,
		size: (Option<f64>, Option<f64>),
		fullscreen: bool,
	) -> Result<()> {
		let window = web_sys::window().ok_or_else(|| TopologyError::Canvas("no window".into()))?;
		let ctx: CanvasRenderingContext2d = canvas
			.get_context("2d")
			.map_err(TopologyError::canvas)?
			.ok_or_else(|| TopologyError::Canvas("2d context unavailable".into()))?
			.dyn_into()
			.map_err(|_| TopologyError::Canvas("unexpected context type".into()))?;

		let (w, h) = viewport(&window, &canvas, size, fullscreen);
		let state = TopologyState::new(config, w, h, pixel_ratio(&window));
		fit_canvas(&canvas, &ctx, &state)?;
		*self.state.borrow_mut() = Some(state);
		info!("topology canvas mounted at {w}x{h}");

		let icons = Rc::new(IconSet::load(&config.device_icon, &config.host_icon)?);
		let redraw = self.clone();
		let icon_loaded = Closure::<dyn FnMut()>::new(move || {
			redraw.with_state(TopologyState::request_redraw);
		});
		for image in icons.images() {
			image.set_onload(Some(icon_loaded.as_ref().unchecked_ref()));
		}

		let (resize_handles, resize_canvas, resize_ctx) = (self.clone(), canvas.clone(), ctx.clone());
		let resize = Closure::<dyn FnMut()>::new(move || {
			let Some(window) = web_sys::window() else {
				return;
			};
			let (w, h) = viewport(&window, &resize_canvas, size, fullscreen);
			let dpr = pixel_ratio(&window);
			let fitted = resize_handles.with_state(|s| {
				s.resize(w, h, dpr);
				fit_canvas(&resize_canvas, &resize_ctx, s)
			});
			if let Some(Err(err)) = fitted {
				warn!("could not resize topology canvas: {err}");
			}
		});
		window
			.add_event_listener_with_callback("resize", resize.as_ref().unchecked_ref())
			.map_err(TopologyError::canvas)?;

		let client = Rc::new(SnapshotClient::new(config));
		let poller = self.clone();
		let poll = move || poller.poll(client.clone());
		poll();
		let interval = Interval::new(config.poll_interval_ms, poll);

		let (frame, frame_icons) = (self.clone(), icons.clone());
		let animate = Closure::<dyn FnMut()>::new(move || {
			if !frame.is_alive() || !canvas.is_connected() {
				frame.shutdown();
				return;
			}
			let drawn = frame.with_state(|s| {
				if !s.tick() {
					return Ok(());
				}
				let mut surface = CanvasSurface {
					ctx: &ctx,
					icons: Some(&frame_icons),
				};
				render::render(s, &mut surface)
			});
			if let Some(Err(err)) = drawn {
				error!("stopping topology canvas: {err}");
				frame.shutdown();
				return;
			}
			frame.schedule_frame();
		});

		{
			let mut runtime = self.runtime.borrow_mut();
			runtime.poll = Some(interval);
			runtime.animate = Some(animate);
			runtime.resize = Some(resize);
			runtime.icon_loaded = Some(icon_loaded);
			runtime.icons = Some(icons);
		}
		self.schedule_frame();
		Ok(())
	}

	fn schedule_frame(&self) {
		let mut runtime = self.runtime.borrow_mut();
		let Some(window) = web_sys::window() else {
			return;
		};
		let request = runtime
			.animate
			.as_ref()
			.and_then(|cb| window.request_animation_frame(cb.as_ref().unchecked_ref()).ok());
		runtime.frame_request = request;
	}

	/// Fetch one snapshot in the background and install it on completion.
	fn poll(&self, client: Rc<SnapshotClient>) {
		if !self.is_alive() {
			return;
		}
		let handles = self.clone();
		spawn_local(async move {
			let result = client.fetch().await;
			if !handles.is_alive() {
				warn!("discarding topology snapshot that resolved after teardown");
				return;
			}
			let view = handles
				.with_state(|s| match result {
					Ok(snapshot) => {
						s.apply_snapshot(&snapshot);
						Some(s.view())
					}
					Err(err) => {
						s.snapshot_failed(&err);
						None
					}
				})
				.flatten();
			if let (Some(view), Some(signal)) = (view, handles.topology) {
				signal.set(view);
			}
			handles.publish_focus();
		});
	}

	fn publish_focus(&self) {
		let Some(signal) = self.focus else {
			return;
		};
		let focus = self
			.state
			.borrow()
			.as_ref()
			.and_then(|s| s.focus().map(str::to_owned));
		if signal.get_untracked() != focus {
			signal.set(focus);
		}
	}

	/// Stop the timer and the frame loop and release every browser callback.
	fn shutdown(&self) {
		self.alive.store(false, Ordering::Release);
		let animate = {
			let mut runtime = self.runtime.borrow_mut();
			runtime.poll = None;
			if let Some(window) = web_sys::window() {
				if let Some(request) = runtime.frame_request.take() {
					let _ = window.cancel_animation_frame(request);
				}
				if let Some(cb) = runtime.resize.take() {
					let _ = window
						.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
				}
			}
			if let Some(icons) = runtime.icons.take() {
				for image in icons.images() {
					image.set_onload(None);
				}
			}
			runtime.icon_loaded = None;
			runtime.animate.take()
		};
		if self.state.borrow_mut().take().is_some() {
			info!("topology canvas stopped");
		}
		drop(animate);
	}
}

fn pixel_ratio(window: &Window) -> f64 {
	let dpr = window.device_pixel_ratio();
	if dpr > 0.0 { dpr } else { 1.0 }
}

fn viewport(
	window: &Window,
	canvas: &HtmlCanvasElement,
	(width, height): (Option<f64>, Option<f64>),
	fullscreen: bool,
) -> (f64, f64) {
	let inner = |v: std::result::Result<JsValue, JsValue>, fallback| {
		v.ok().and_then(|v| v.as_f64()).unwrap_or(fallback)
	};
	if fullscreen {
		return (
			inner(window.inner_width(), FALLBACK_WIDTH),
			inner(window.inner_height(), FALLBACK_HEIGHT),
		);
	}
	let parent = canvas.parent_element();
	let from_parent = |measure: fn(&web_sys::Element) -> i32, fallback: f64| {
		parent
			.as_ref()
			.map(|p| f64::from(measure(p)))
			.filter(|v| *v > 0.0)
			.unwrap_or(fallback)
	};
	(
		width.unwrap_or_else(|| from_parent(web_sys::Element::client_width, FALLBACK_WIDTH)),
		height.unwrap_or_else(|| from_parent(web_sys::Element::client_height, FALLBACK_HEIGHT)),
	)
}

/// Size the backing store for the pixel ratio and draw in CSS pixels.
fn fit_canvas(
	canvas: &HtmlCanvasElement,
	ctx: &CanvasRenderingContext2d,
	state: &TopologyState,
) -> Result<()> {
	let (w, h) = state.backing_size();
	canvas.set_width(w);
	canvas.set_height(h);
	let style = web_sys::HtmlElement::style(canvas);
	style
		.set_property("width", &format!("{}px", state.width))
		.map_err(TopologyError::canvas)?;
	style
		.set_property("height", &format!("{}px", state.height))
		.map_err(TopologyError::canvas)?;
	let dpr = state.pixel_ratio;
	ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0)
		.map_err(TopologyError::canvas)
}

/// Tear everything down when the owning reactive scope is disposed. The frame
/// loop also stops on its own once the canvas leaves the document.
fn release_on_cleanup(handles: &Handles) {
	let handles = SendWrapper::new(handles.clone());
	on_cleanup(move || handles.shutdown());
}

fn local_point(canvas: &HtmlCanvasElement, ev: &PointerEvent) -> Point {
	let rect = canvas.get_bounding_client_rect();
	Point::new(
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	)
}

/// Live, force-directed view of the controller topology.
///
/// Polls the backend on a fixed interval, keeps node positions stable across
/// refreshes and lets the user drag nodes around. The reconciled graph and
/// the hovered or dragged node id are published through the optional
/// signals.
#[component]
pub fn TopologyCanvas(
	#[prop(optional)] config: Option<TopologyConfig>,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
	#[prop(optional)] topology: Option<RwSignal<TopologyView>>,
	#[prop(optional)] focus: Option<RwSignal<Option<String>>>,
) -> impl IntoView {
	let config = config.unwrap_or_default();
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let handles = Handles {
		state: Rc::new(RefCell::new(None)),
		runtime: Rc::default(),
		alive: Arc::new(AtomicBool::new(true)),
		topology,
		focus,
	};

	release_on_cleanup(&handles);

	let handles_init = handles.clone();
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		if handles_init.state.borrow().is_some() {
			return;
		}
		if let Err(err) = handles_init.start(canvas.into(), &config, (width, height), fullscreen) {
			error!("topology canvas failed to start: {err}");
		}
	});

	let handles_down = handles.clone();
	let on_pointerdown = move |ev: PointerEvent| {
		if ev.button() != 0 {
			return;
		}
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let at = local_point(&canvas, &ev);
		if handles_down.with_state(|s| s.pointer_down(at)) == Some(true) {
			let _ = canvas.set_pointer_capture(ev.pointer_id());
		}
		handles_down.publish_focus();
	};

	let handles_move = handles.clone();
	let on_pointermove = move |ev: PointerEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let at = local_point(&canvas, &ev);
		if handles_move.with_state(|s| s.pointer_move(at)) == Some(true) {
			handles_move.publish_focus();
		}
	};

	let handles_up = handles.clone();
	let on_release = move |ev: PointerEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let at = local_point(&canvas, &ev);
		handles_up.with_state(|s| s.pointer_up(at));
		handles_up.publish_focus();
	};

	let handles_leave = handles.clone();
	let on_pointerleave = move |_: PointerEvent| {
		handles_leave.with_state(TopologyState::pointer_leave);
		handles_leave.publish_focus();
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="topology-canvas"
			on:pointerdown=on_pointerdown
			on:pointermove=on_pointermove
			on:pointerup=on_release.clone()
			on:pointercancel=on_release
			on:pointerleave=on_pointerleave
			style="display: block; touch-action: none;"
		/>
	}
}
