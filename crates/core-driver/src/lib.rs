//! Per-layer orchestration: grid setup, per-tile discovery, the
//! chip-global fallback, and phases A–C, wired together the way
//! `DensityManager::solve` drives its collaborators in the original.

#[cfg(feature = "debug-dump")]
pub mod debug_dump;

use core_fill::{
    generate_fillers, meet_density_constraint, remove_critical_net_fillers,
    remove_redundant_fillers, FillEngine,
};
use core_geom::Rectangle;
use core_grid::Grid;
use core_process::{ConductorId, Direction, Filler, Layer};
use core_sweep::{discover_free_regions, refine_free_regions};
use std::collections::HashSet;
use std::time::Duration;

/// Sink for the engine's informative (non-contractual) console output.
/// The production binary wires [`StdoutDiagnostics`]; tests use
/// [`NullDiagnostics`] to stay silent or [`RecordingDiagnostics`] to
/// assert on what was reported.
pub trait Diagnostics {
    fn layer_start(&mut self, layer_id: i64, direction: Direction);
    fn density(&mut self, stage: &str, layer_id: i64, min_density: f64, max_density: f64);
    fn empty_layer(&mut self, layer_id: i64);
    fn infeasible_density(
        &mut self,
        layer_id: i64,
        min_density: f64,
        max_density: f64,
        min_target: f64,
        max_target: f64,
    );
    fn timing(&mut self, label: &str, elapsed: Duration);
    /// A preformatted line, used by the `debug-dump` feature's ASCII
    /// tile/window renderer. Most [`Diagnostics`] calls are structured;
    /// this one exists purely to give the renderer somewhere to go.
    fn raw_line(&mut self, line: &str);
}

#[derive(Debug, Default)]
pub struct StdoutDiagnostics;

impl Diagnostics for StdoutDiagnostics {
    fn layer_start(&mut self, layer_id: i64, direction: Direction) {
        println!("Layer {layer_id}: direction {}", direction.name());
    }

    fn density(&mut self, stage: &str, layer_id: i64, min_density: f64, max_density: f64) {
        println!("Layer {layer_id} [{stage}]: min density {min_density:.4}, max density {max_density:.4}");
    }

    fn empty_layer(&mut self, layer_id: i64) {
        println!("Layer {layer_id}: no conductors, defaulting to Horizontal");
    }

    fn infeasible_density(
        &mut self,
        layer_id: i64,
        min_density: f64,
        max_density: f64,
        min_target: f64,
        max_target: f64,
    ) {
        println!(
            "Layer {layer_id}: WARNING density [{min_density:.4}, {max_density:.4}] outside target [{min_target:.4}, {max_target:.4}]"
        );
    }

    fn timing(&mut self, label: &str, elapsed: Duration) {
        println!("{label}: {:.3}s", elapsed.as_secs_f64());
    }

    fn raw_line(&mut self, line: &str) {
        println!("{line}");
    }
}

#[derive(Debug, Default)]
pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {
    fn layer_start(&mut self, _layer_id: i64, _direction: Direction) {}
    fn density(&mut self, _stage: &str, _layer_id: i64, _min_density: f64, _max_density: f64) {}
    fn empty_layer(&mut self, _layer_id: i64) {}
    fn infeasible_density(
        &mut self,
        _layer_id: i64,
        _min_density: f64,
        _max_density: f64,
        _min_target: f64,
        _max_target: f64,
    ) {
    }
    fn timing(&mut self, _label: &str, _elapsed: Duration) {}
    fn raw_line(&mut self, _line: &str) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticEvent {
    LayerStart {
        layer_id: i64,
        direction: Direction,
    },
    Density {
        stage: String,
        layer_id: i64,
        min_density: f64,
        max_density: f64,
    },
    EmptyLayer {
        layer_id: i64,
    },
    InfeasibleDensity {
        layer_id: i64,
        min_density: f64,
        max_density: f64,
        min_target: f64,
        max_target: f64,
    },
    Timing {
        label: String,
        elapsed: Duration,
    },
    RawLine(String),
}

/// Captures every emitted event for assertions, instead of printing.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    pub events: Vec<DiagnosticEvent>,
}

impl Diagnostics for RecordingDiagnostics {
    fn layer_start(&mut self, layer_id: i64, direction: Direction) {
        self.events.push(DiagnosticEvent::LayerStart { layer_id, direction });
    }

    fn density(&mut self, stage: &str, layer_id: i64, min_density: f64, max_density: f64) {
        self.events.push(DiagnosticEvent::Density {
            stage: stage.to_string(),
            layer_id,
            min_density,
            max_density,
        });
    }

    fn empty_layer(&mut self, layer_id: i64) {
        self.events.push(DiagnosticEvent::EmptyLayer { layer_id });
    }

    fn infeasible_density(
        &mut self,
        layer_id: i64,
        min_density: f64,
        max_density: f64,
        min_target: f64,
        max_target: f64,
    ) {
        self.events.push(DiagnosticEvent::InfeasibleDensity {
            layer_id,
            min_density,
            max_density,
            min_target,
            max_target,
        });
    }

    fn timing(&mut self, label: &str, elapsed: Duration) {
        self.events.push(DiagnosticEvent::Timing {
            label: label.to_string(),
            elapsed,
        });
    }

    fn raw_line(&mut self, line: &str) {
        self.events.push(DiagnosticEvent::RawLine(line.to_string()));
    }
}

/// Runs the full per-layer pipeline from `spec.md` §4.7: grid init,
/// per-tile discovery/refine/generate/insert, the chip-global fallback
/// (checked once, after the whole per-tile pass), then phases A, B, C.
/// Returns every filler left placed at the end.
pub fn solve_layer(
    chip_boundary: Rectangle,
    window_size: i64,
    tiles_per_window: usize,
    layer: &mut Layer,
    enable_chip_global_fallback: bool,
    diagnostics: &mut dyn Diagnostics,
) -> Vec<Filler> {
    if layer.conductors.is_empty() {
        diagnostics.empty_layer(layer.id);
        tracing::warn!(target: "engine.fill", layer = layer.id, "empty layer, defaulting to Horizontal");
    }
    layer.derive_direction();
    diagnostics.layer_start(layer.id, layer.direction);

    let lower_left_spacing = layer.min_spacing / 2;
    let upper_right_spacing = layer.min_spacing.div_ceil(2);
    let window_area = window_size * window_size;
    let min_metal_area = (window_area as f64 * layer.min_metal_density).ceil() as i64;
    let max_metal_area = (window_area as f64 * layer.max_metal_density).floor() as i64;

    let mut grid = Grid::build(chip_boundary, window_size, tiles_per_window, layer);
    report_density(diagnostics, "grid init", layer.id, &grid);

    let mut engine = FillEngine::new();

    tracing::debug!(target: "engine.fill", layer = layer.id, tiles = grid.num_tile_row * grid.num_tile_col, "per-tile discovery start");
    for row in 0..grid.num_tile_row {
        for col in 0..grid.num_tile_col {
            let tile_rect = grid.tile(row, col).rect;
            let neighborhood = extended_tile_boundary(&grid, row, col);
            let conductors = conductors_in_boundary(&grid, layer, neighborhood);
            fill_region(
                &mut grid,
                &mut engine,
                tile_rect,
                &conductors,
                layer,
                lower_left_spacing,
                upper_right_spacing,
                true,
            );
        }
    }
    report_density(diagnostics, "filling all", layer.id, &grid);

    let (min_area, _) = grid.min_max_window_area();
    if enable_chip_global_fallback && min_area < min_metal_area {
        tracing::debug!(target: "engine.fill", layer = layer.id, "chip-global fallback triggered");
        grid = Grid::build(chip_boundary, window_size, tiles_per_window, layer);
        engine = FillEngine::new();
        let conductor_rects: Vec<Rectangle> = layer.conductors.iter().map(|c| c.rect).collect();
        fill_region(
            &mut grid,
            &mut engine,
            chip_boundary,
            &conductor_rects,
            layer,
            lower_left_spacing,
            upper_right_spacing,
            false,
        );
    }

    remove_critical_net_fillers(&mut grid, &mut engine, layer, min_metal_area);
    report_density(diagnostics, "critical-net pruning", layer.id, &grid);

    meet_density_constraint(&mut grid, &mut engine, min_metal_area, max_metal_area);
    report_density(diagnostics, "upper-bound reconciliation", layer.id, &grid);

    remove_redundant_fillers(&mut grid, &mut engine, min_metal_area, max_metal_area);
    report_density(diagnostics, "redundant pruning", layer.id, &grid);

    let (final_min, final_max) = grid.min_max_window_density();
    if final_min < layer.min_metal_density || final_max > layer.max_metal_density {
        diagnostics.infeasible_density(
            layer.id,
            final_min,
            final_max,
            layer.min_metal_density,
            layer.max_metal_density,
        );
    }

    engine.active_ids().map(|id| engine.fillers[id]).collect()
}

fn report_density(diagnostics: &mut dyn Diagnostics, stage: &str, layer_id: i64, grid: &Grid) {
    let (min_density, max_density) = grid.min_max_window_density();
    diagnostics.density(stage, layer_id, min_density, max_density);
}

#[allow(clippy::too_many_arguments)]
fn fill_region(
    grid: &mut Grid,
    engine: &mut FillEngine,
    boundary: Rectangle,
    conductors: &[Rectangle],
    layer: &Layer,
    lower_left_spacing: i64,
    upper_right_spacing: i64,
    in_tile: bool,
) {
    let free = discover_free_regions(
        boundary,
        conductors,
        layer.direction,
        lower_left_spacing,
        upper_right_spacing,
    );
    let refined = refine_free_regions(
        &free,
        layer.direction,
        layer.min_fill_width,
        lower_left_spacing,
        upper_right_spacing,
    );
    for region in refined {
        for filler in generate_fillers(
            region,
            layer.max_fill_width,
            lower_left_spacing,
            upper_right_spacing,
            in_tile,
        ) {
            let id = engine.push_candidate(filler);
            engine.insert(grid, id);
        }
    }
}

/// The tile's own rectangle, expanded by one tile's width in each
/// direction and clamped to the chip boundary. Used only to collect the
/// conductors that constrain free space *within* the tile from just
/// outside it (spacing reaches across tile edges); the discovery and
/// fill region itself stays `grid.tile(row, col).rect` so adjacent tiles
/// never generate overlapping fillers.
fn extended_tile_boundary(grid: &Grid, row: usize, col: usize) -> Rectangle {
    let mut r = grid.tile(row, col).rect;
    r.expand(grid.tile_size, grid.tile_size);
    Rectangle::new(
        r.x1.max(grid.chip_boundary.x1),
        r.y1.max(grid.chip_boundary.y1),
        r.x2.min(grid.chip_boundary.x2),
        r.y2.min(grid.chip_boundary.y2),
    )
}

/// Every conductor registered against a tile within `boundary`'s
/// covering tile range, deduplicated (a conductor spanning several
/// tiles would otherwise surface once per tile).
fn conductors_in_boundary(grid: &Grid, layer: &Layer, boundary: Rectangle) -> Vec<Rectangle> {
    let (begin_row, begin_col, end_row, end_col) = grid.tile_range(&boundary);
    let mut ids: HashSet<ConductorId> = HashSet::new();
    for row in begin_row..end_row {
        for col in begin_col..end_col {
            ids.extend(grid.tile(row, col).conductors.iter().copied());
        }
    }
    ids.into_iter().map(|id| layer.conductors[id].rect).collect()
}
