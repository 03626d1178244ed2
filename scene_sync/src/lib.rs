//! Renderer-agnostic scene synchronization for the hydrofoil visualizer.
//!
//! Build messages shape a [`tree::SceneTree`] of vehicle components and
//! telemetry frames move it. A renderer mirrors the tree; nothing in here
//! knows about windows, GPUs or sockets.

pub mod camera;
pub mod components;
pub mod config;
pub mod control_panel;
pub mod director;
pub mod frames;
pub mod grid;
pub mod intent;
pub mod primitives;
pub mod registry;
pub mod session;
pub mod tree;
pub mod vehicle;

pub use config::VisualConfig;
pub use director::{DirectorSettings, PumpReport, SceneDirector};
pub use grid::GridConfig;
pub use intent::{Intent, MeshToggle, Route};
pub use registry::Layer;
pub use session::{SessionState, Transport, TransportError, TransportEvent, TransportSession};
pub use tree::{NodeId, SceneTree};
