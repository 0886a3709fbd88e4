mod component;
mod config;
mod error;
mod fetch;
mod input;
mod layout;
mod normalize;
mod reconcile;
mod render;
mod state;
mod types;

pub use component::TopologyCanvas;
pub use types::{Node, NodeKind, TopologyView};
