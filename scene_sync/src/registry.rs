//! Live vehicle components for one build generation.

use std::collections::{BTreeMap, BTreeSet};

use protocol::{BuildMessage, TelemMessage};
use tracing::{debug, warn};

use crate::components::{Hull, Panel, Propulsor, SceneComponent, WingRoot};
use crate::config::VisualConfig;
use crate::frames::FrameRotations;
use crate::tree::{NodeId, SceneTree};

/// Wing roots are fixed by the vehicle layout, not by the build message.
pub const WING_ROOT_IDS: [&str; 2] = ["0", "1"];

/// The transform groups components hang under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hosts {
    pub body: NodeId,
    pub rear_axle: NodeId,
}

/// Overlay groups that can be hidden as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    HullAxes,
    FoilAxes,
    PropulsorAxes,
    Forces,
    Moments,
    Submerged,
    Surfaced,
    Submergence,
}

impl Layer {
    pub const ALL: [Layer; 8] = [
        Layer::HullAxes,
        Layer::FoilAxes,
        Layer::PropulsorAxes,
        Layer::Forces,
        Layer::Moments,
        Layer::Submerged,
        Layer::Surfaced,
        Layer::Submergence,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Layer::HullAxes => "Hull axes",
            Layer::FoilAxes => "Foil axes",
            Layer::PropulsorAxes => "Propulsor axes",
            Layer::Forces => "Forces",
            Layer::Moments => "Moments",
            Layer::Submerged => "Submerged area",
            Layer::Surfaced => "Surfaced area",
            Layer::Submergence => "Submergence",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildReport {
    /// Panel ids disposed from the previous generation.
    pub disposed: Vec<String>,
    pub created: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub panels: usize,
    pub wing_roots: usize,
    /// Ids present in the telemetry but unknown to this generation.
    pub skipped: Vec<String>,
    /// Panels of this generation the telemetry left out.
    pub missing: Vec<String>,
}

impl SyncReport {
    /// The telemetry and the build disagree on which entities exist.
    pub fn is_stale(&self) -> bool {
        !self.skipped.is_empty() || !self.missing.is_empty()
    }
}

#[derive(Debug)]
pub struct ComponentRegistry {
    hosts: Hosts,
    visuals: VisualConfig,
    panels: BTreeMap<String, Panel>,
    hull: Hull,
    wing_roots: BTreeMap<String, WingRoot>,
    propulsor: Propulsor,
    hidden: BTreeSet<Layer>,
    generation: u64,
}

impl ComponentRegistry {
    /// Creates the persistent entities. Panels arrive with the first build.
    pub fn new(tree: &mut SceneTree, hosts: Hosts, visuals: &VisualConfig) -> Self {
        let hull = Hull::new(tree, hosts.body, visuals);
        let wing_roots = WING_ROOT_IDS
            .iter()
            .map(|id| (id.to_string(), WingRoot::new(tree, hosts.body, visuals)))
            .collect();
        let propulsor = Propulsor::new(tree, hosts.rear_axle, visuals);
        Self {
            hosts,
            visuals: *visuals,
            panels: BTreeMap::new(),
            hull,
            wing_roots,
            propulsor,
            hidden: BTreeSet::new(),
            generation: 0,
        }
    }

    /// Replaces every panel with the ones in `msg`. The previous generation
    /// is fully disposed before the first new panel is spawned.
    pub fn rebuild(&mut self, tree: &mut SceneTree, msg: &BuildMessage) -> RebuildReport {
        let mut report = RebuildReport::default();
        for (id, panel) in std::mem::take(&mut self.panels) {
            let live = panel.dispose(tree);
            debug!(%id, live, "disposed panel");
            report.disposed.push(id);
        }

        for (id, spec) in &msg.panels {
            let host = if spec.rear {
                self.hosts.rear_axle
            } else {
                self.hosts.body
            };
            let mut panel = Panel::new(tree, id, host, &self.visuals);
            panel.build(tree, spec);
            self.apply_hidden(tree, &panel);
            report.created.push(id.clone());
            self.panels.insert(id.clone(), panel);
        }

        self.hull.build(tree, &msg.hull);
        for root in self.wing_roots.values_mut() {
            root.build(tree);
        }
        self.propulsor.build(tree, &msg.propulsor);
        self.generation += 1;
        report
    }

    fn apply_hidden(&self, tree: &mut SceneTree, panel: &Panel) {
        for layer in &self.hidden {
            match layer {
                Layer::FoilAxes => panel.toggle_axes(tree),
                Layer::Forces => panel.toggle_forces(tree),
                Layer::Moments => panel.toggle_moments(tree),
                Layer::Submerged => panel.toggle_submerged(tree),
                Layer::Surfaced => panel.toggle_surfaced(tree),
                Layer::Submergence => panel.toggle_submergence(tree),
                Layer::HullAxes | Layer::PropulsorAxes => {}
            }
        }
    }

    /// Pushes one telemetry frame into every entity it names.
    pub fn sync_telem(
        &mut self,
        tree: &mut SceneTree,
        msg: &TelemMessage,
        frames: &FrameRotations,
    ) -> SyncReport {
        let mut report = SyncReport::default();
        let to_rear_axle = frames.body_to_rear_axle;

        for (id, telem) in &msg.panels {
            let Some(panel) = self.panels.get_mut(id) else {
                report.skipped.push(id.clone());
                continue;
            };
            let to_host = if panel.rear() {
                to_rear_axle
            } else {
                bevy_math::Mat3::IDENTITY
            };
            panel.sync_telem(tree, telem, to_host);
            report.panels += 1;
        }

        for (id, telem) in &msg.wing_roots {
            let Some(root) = self.wing_roots.get_mut(id) else {
                report.skipped.push(id.clone());
                continue;
            };
            root.sync_telem(tree, telem);
            report.wing_roots += 1;
        }

        report.missing = self
            .panels
            .keys()
            .filter(|id| !msg.panels.contains_key(*id))
            .cloned()
            .collect();

        self.hull.sync_telem(tree, &msg.hull);
        self.propulsor.sync_telem(tree, &msg.propulsor, to_rear_axle);

        if !report.skipped.is_empty() {
            warn!(
                skipped = ?report.skipped,
                generation = self.generation,
                "telemetry names entities missing from the current build"
            );
        }
        if !report.missing.is_empty() {
            warn!(
                missing = ?report.missing,
                generation = self.generation,
                "telemetry omits panels of the current build"
            );
        }
        report
    }

    pub fn sync_visuals(&mut self, tree: &mut SceneTree, visuals: &VisualConfig) {
        self.visuals = *visuals;
        for component in self.components_mut() {
            component.sync_visuals(tree, visuals);
        }
    }

    /// Flips one overlay group. Returns whether it is now shown.
    pub fn toggle(&mut self, tree: &mut SceneTree, layer: Layer) -> bool {
        match layer {
            Layer::HullAxes => self.hull.toggle_axes(tree),
            Layer::FoilAxes => {
                for panel in self.panels.values() {
                    panel.toggle_axes(tree);
                }
                for root in self.wing_roots.values() {
                    root.toggle_axes(tree);
                }
            }
            Layer::PropulsorAxes => self.propulsor.toggle_axes(tree),
            Layer::Forces => {
                for component in self.components() {
                    component.toggle_forces(tree);
                }
            }
            Layer::Moments => {
                for component in self.components() {
                    component.toggle_moments(tree);
                }
            }
            Layer::Submerged => {
                for panel in self.panels.values() {
                    panel.toggle_submerged(tree);
                }
            }
            Layer::Surfaced => {
                for panel in self.panels.values() {
                    panel.toggle_surfaced(tree);
                }
            }
            Layer::Submergence => {
                for panel in self.panels.values() {
                    panel.toggle_submergence(tree);
                }
                self.propulsor.toggle_submergence(tree);
            }
        }
        if self.hidden.remove(&layer) {
            true
        } else {
            self.hidden.insert(layer);
            false
        }
    }

    pub fn is_shown(&self, layer: Layer) -> bool {
        !self.hidden.contains(&layer)
    }

    fn components(&self) -> impl Iterator<Item = &dyn SceneComponent> {
        let fixed: [&dyn SceneComponent; 2] = [&self.hull, &self.propulsor];
        fixed
            .into_iter()
            .chain(self.wing_roots.values().map(|r| r as &dyn SceneComponent))
            .chain(self.panels.values().map(|p| p as &dyn SceneComponent))
    }

    fn components_mut(&mut self) -> impl Iterator<Item = &mut dyn SceneComponent> {
        let fixed: [&mut dyn SceneComponent; 2] = [&mut self.hull, &mut self.propulsor];
        fixed
            .into_iter()
            .chain(
                self.wing_roots
                    .values_mut()
                    .map(|r| r as &mut dyn SceneComponent),
            )
            .chain(self.panels.values_mut().map(|p| p as &mut dyn SceneComponent))
    }

    pub fn hosts(&self) -> Hosts {
        self.hosts
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn panels(&self) -> &BTreeMap<String, Panel> {
        &self.panels
    }

    pub fn panel(&self, id: &str) -> Option<&Panel> {
        self.panels.get(id)
    }

    pub fn hull(&self) -> &Hull {
        &self.hull
    }

    pub fn wing_roots(&self) -> &BTreeMap<String, WingRoot> {
        &self.wing_roots
    }

    pub fn propulsor(&self) -> &Propulsor {
        &self.propulsor
    }

    /// Disposes everything, persistent entities included.
    pub fn dispose(&mut self, tree: &mut SceneTree) -> usize {
        let mut live = 0;
        for panel in std::mem::take(&mut self.panels).into_values() {
            live += panel.dispose(tree);
        }
        live += self.components().map(|c| c.dispose(tree)).sum::<usize>();
        live
    }
}
