//! Waterplane that appears unbounded: a fixed lattice of tiles re-centred
//! on the vehicle, fading out towards its edge.

use bevy_math::Vec3;
use serde::{Deserialize, Serialize};

use crate::config::VisualConfig;
use crate::tree::{NodeId, SceneTree, Shape};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Edge length of one tile (m).
    pub tile_size: f32,
    /// Grid lines per tile edge.
    pub divisions: u32,
    /// Slab thickness of a tile (m).
    pub depth: f32,
    /// Rings of tiles around the centre tile.
    pub iterations: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            tile_size: 10.0,
            divisions: 10,
            depth: 0.01,
            iterations: 2,
        }
    }
}

impl GridConfig {
    pub fn tile_count(&self) -> usize {
        let side = 2 * self.iterations as usize + 1;
        side * side
    }
}

/// Opacity multiplier for a tile `distance` away from the reference point.
/// Fully opaque out to 0.75 of the lattice radius, then a linear ramp to zero
/// at 1.25.
pub fn fade_factor(distance: f32, tile_size: f32, iterations: u32) -> f32 {
    let reach = tile_size * iterations as f32 * 0.75 * std::f32::consts::SQRT_2;
    if reach <= 0.0 {
        return 1.0;
    }
    let f = distance / reach;
    if f < 0.75 {
        1.0
    } else if f < 1.25 {
        1.0 - (f - 0.75) / 0.5
    } else {
        0.0
    }
}

#[derive(Debug, Clone)]
pub struct TilingGrid {
    root: NodeId,
    tile_group: NodeId,
    line_group: NodeId,
    tiles: Vec<NodeId>,
    lines: Vec<NodeId>,
    base_opacity: Vec<f32>,
    config: GridConfig,
    waterplane_opacity: f32,
}

impl TilingGrid {
    /// Tiles are created here and only ever repositioned afterwards.
    pub fn spawn(
        tree: &mut SceneTree,
        parent: NodeId,
        config: GridConfig,
        visuals: &VisualConfig,
    ) -> Self {
        let root = tree.spawn(parent, Shape::Group);
        let tile_group = tree.spawn(root, Shape::Group);
        let line_group = tree.spawn(root, Shape::Group);
        let count = config.tile_count();
        let mut tiles = Vec::with_capacity(count);
        let mut lines = Vec::with_capacity(count);
        for _ in 0..count {
            tiles.push(tree.spawn(
                tile_group,
                Shape::Tile {
                    size: config.tile_size,
                    depth: config.depth,
                },
            ));
            lines.push(tree.spawn(
                line_group,
                Shape::GridLines {
                    size: config.tile_size,
                    divisions: config.divisions,
                },
            ));
        }
        let mut grid = Self {
            root,
            tile_group,
            line_group,
            tiles,
            lines,
            base_opacity: vec![1.0; count],
            config,
            waterplane_opacity: visuals.waterplane_opacity,
        };
        grid.sync_visuals(tree, visuals);
        grid.update(tree, Vec3::ZERO);
        grid
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn tiles(&self) -> &[NodeId] {
        &self.tiles
    }

    pub fn lines(&self) -> &[NodeId] {
        &self.lines
    }

    /// Snaps the lattice to the tile nearest `pos` and refreshes the fade.
    pub fn update(&mut self, tree: &mut SceneTree, pos: Vec3) {
        let size = self.config.tile_size;
        if size <= 0.0 || !pos.is_finite() {
            return;
        }
        let px = (pos.x / size).round();
        let py = (pos.y / size).round();
        let n = self.config.iterations as i32;
        let mut idx = 0;
        for x in -n..=n {
            for y in -n..=n {
                let at = Vec3::new((px + x as f32) * size, (py + y as f32) * size, 0.0);
                let factor = fade_factor(at.distance(pos), size, self.config.iterations);
                tree.set_translation(self.tiles[idx], at);
                tree.set_translation(self.lines[idx], at);
                tree.set_opacity(self.tiles[idx], factor * self.waterplane_opacity);
                tree.set_opacity(self.lines[idx], factor);
                self.base_opacity[idx] = factor;
                idx += 1;
            }
        }
    }

    pub fn sync_visuals(&mut self, tree: &mut SceneTree, visuals: &VisualConfig) {
        self.waterplane_opacity = visuals.waterplane_opacity;
        for (tile, base) in self.tiles.iter().zip(&self.base_opacity) {
            tree.set_color(*tile, visuals.waterplane_color);
            tree.set_opacity(*tile, base * self.waterplane_opacity);
        }
    }

    /// Returns whether the waterplane is now shown; `None` once disposed.
    pub fn toggle_waterplane(&self, tree: &mut SceneTree) -> Option<bool> {
        tree.toggle_visible(self.tile_group)
    }

    pub fn toggle_grid(&self, tree: &mut SceneTree) -> Option<bool> {
        tree.toggle_visible(self.line_group)
    }

    pub fn waterplane_shown(&self, tree: &SceneTree) -> bool {
        tree.get(self.tile_group).is_some_and(|n| n.visible())
    }

    pub fn grid_shown(&self, tree: &SceneTree) -> bool {
        tree.get(self.line_group).is_some_and(|n| n.visible())
    }

    pub fn dispose(&self, tree: &mut SceneTree) -> bool {
        tree.dispose(self.root)
    }
}
