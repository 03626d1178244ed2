//! Vehicle entities drawn from build and telemetry messages.

use crate::config::VisualConfig;
use crate::tree::{NodeId, SceneTree};

mod hull;
mod panel;
mod propulsor;
mod wing_root;

pub use hull::Hull;
pub use panel::{quad_triangles, triangles_area, Panel, PanelCorners, PanelSplit, PanelState, Side};
pub use propulsor::Propulsor;
pub use wing_root::WingRoot;

/// The top-level nodes a component attached to the scene, recorded as they
/// are spawned so teardown cannot miss one.
#[derive(Debug, Clone, Default)]
pub struct Disposables(Vec<NodeId>);

impl Disposables {
    pub fn track(&mut self, id: NodeId) -> NodeId {
        self.0.push(id);
        id
    }

    pub fn ids(&self) -> &[NodeId] {
        &self.0
    }

    /// Disposes every tracked node, returning how many were still live.
    /// Calling it again disposes nothing.
    pub fn dispose_all(&self, tree: &mut SceneTree) -> usize {
        self.0.iter().filter(|id| tree.dispose(**id)).count()
    }

    /// Whether every tracked node is still reachable from the scene root.
    pub fn all_attached(&self, tree: &SceneTree) -> bool {
        self.0.iter().all(|id| tree.is_attached(*id))
    }
}

/// Shared surface of every vehicle entity.
pub trait SceneComponent {
    fn disposables(&self) -> &Disposables;

    /// Re-applies scales and colours. Safe before any telemetry arrived.
    fn sync_visuals(&mut self, tree: &mut SceneTree, visuals: &VisualConfig);

    fn toggle_axes(&self, tree: &mut SceneTree);
    fn toggle_forces(&self, tree: &mut SceneTree);
    fn toggle_moments(&self, tree: &mut SceneTree);

    fn dispose(&self, tree: &mut SceneTree) -> usize {
        self.disposables().dispose_all(tree)
    }
}
