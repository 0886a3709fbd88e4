use thiserror::Error;
use wasm_bindgen::JsValue;

#[derive(Debug, Error)]
pub enum TopologyError {
	#[error("request to {url} failed: {source}")]
	Request {
		url: String,
		source: gloo::net::Error,
	},

	#[error("{url} answered with HTTP {status}")]
	Status { url: String, status: u16 },

	#[error("could not decode payload from {url}: {source}")]
	Decode {
		url: String,
		source: gloo::net::Error,
	},

	#[error("render target unavailable: {0}")]
	Canvas(String),
}

impl TopologyError {
	pub fn canvas(err: JsValue) -> Self {
		TopologyError::Canvas(err.as_string().unwrap_or_else(|| format!("{err:?}")))
	}
}

pub type Result<T, E = TopologyError> = std::result::Result<T, E>;
