//! Process-level entities: conductors, layers, fillers, and the database
//! that owns them for the lifetime of the run.
//!
//! Ownership mirrors the original C++ object graph but replaces raw
//! pointers with plain ownership (`Database` owns `Vec<Layer>`, `Layer`
//! owns `Vec<Conductor>`) and stable indices where other modules need to
//! refer back into these collections without borrowing them.

use core_geom::Rectangle;

/// Index of a conductor within its owning [`Layer::conductors`].
pub type ConductorId = usize;

/// Index of a filler within whatever arena currently owns it (the fill
/// engine's per-layer `Vec<Filler>`).
pub type FillerId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    None,
    Horizontal,
    Vertical,
}

impl Direction {
    pub fn name(&self) -> &'static str {
        match self {
            Direction::Horizontal => "Horizontal",
            Direction::Vertical => "Vertical",
            Direction::None => "N/A",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conductor {
    pub rect: Rectangle,
    pub net_id: i64,
    pub is_critical: bool,
}

impl Conductor {
    pub fn new(rect: Rectangle, net_id: i64, is_critical: bool) -> Self {
        Self {
            rect,
            net_id,
            is_critical,
        }
    }
}

impl std::ops::Deref for Conductor {
    type Target = Rectangle;
    fn deref(&self) -> &Rectangle {
        &self.rect
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub id: i64,
    pub direction: Direction,
    pub min_fill_width: i64,
    pub max_fill_width: i64,
    pub min_spacing: i64,
    pub min_metal_density: f64,
    pub max_metal_density: f64,
    pub weight: f64,
    pub conductors: Vec<Conductor>,
}

impl Layer {
    /// Derives direction from the mean aspect ratio of the layer's
    /// conductors: mean >= 1 is horizontal, otherwise vertical. An empty
    /// layer (no conductors) has no well-defined aspect ratio and
    /// defaults to horizontal (the spec's documented degenerate case).
    pub fn derive_direction(&mut self) {
        if self.conductors.is_empty() {
            self.direction = Direction::Horizontal;
            return;
        }
        let mean: f64 = self
            .conductors
            .iter()
            .map(|c| c.rect.aspect_ratio())
            .sum::<f64>()
            / self.conductors.len() as f64;
        self.direction = if mean >= 1.0 {
            Direction::Horizontal
        } else {
            Direction::Vertical
        };
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Filler {
    pub rect: Rectangle,
    pub cost: f64,
    /// `true` if generated from a tile-local free region, `false` if
    /// generated from the chip-global fallback pass.
    pub in_tile: bool,
}

impl Filler {
    pub fn new(rect: Rectangle, in_tile: bool) -> Self {
        Self {
            rect,
            cost: 0.0,
            in_tile,
        }
    }
}

impl std::ops::Deref for Filler {
    type Target = Rectangle;
    fn deref(&self) -> &Rectangle {
        &self.rect
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Database {
    pub chip_boundary: Rectangle,
    pub window_size: i64,
    pub layers: Vec<Layer>,
}
