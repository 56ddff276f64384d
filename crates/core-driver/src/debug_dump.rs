//! ASCII visualization of a tile or window's contents, gated behind the
//! `debug-dump` feature. Reimplements the original's `drawTile`/
//! `drawWindow` console dumps, routed through [`Diagnostics`] instead of
//! straight to stdout so tests can capture the output.

use crate::Diagnostics;
use core_geom::Rectangle;
use core_grid::Grid;
use core_process::{ConductorId, FillerId, Layer};
use core_fill::FillEngine;
use std::collections::HashSet;

const RESOLUTION: i64 = 32;

/// Renders one tile: `#` for ordinary conductor, `*` for a critical-net
/// conductor, `.` for a placed filler, space for free area.
pub fn dump_tile(grid: &Grid, layer: &Layer, engine: &FillEngine, row: usize, col: usize, diagnostics: &mut dyn Diagnostics) {
    let tile = grid.tile(row, col);
    let conductors: Vec<Rectangle> = tile
        .conductors
        .iter()
        .map(|&id: &ConductorId| layer.conductors[id].rect)
        .collect();
    let critical: HashSet<ConductorId> = tile
        .conductors
        .iter()
        .copied()
        .filter(|&id| layer.conductors[id].is_critical)
        .collect();
    let critical_rects: Vec<Rectangle> = critical.iter().map(|&id| layer.conductors[id].rect).collect();
    let fillers: Vec<Rectangle> = tile
        .filler_set
        .iter()
        .map(|&id: &FillerId| engine.fillers[id].rect)
        .collect();
    render(tile.rect, &critical_rects, &conductors, &fillers, diagnostics);
}

/// Renders the composite of every tile feeding window `(window_row,
/// window_col)`.
pub fn dump_window(
    grid: &Grid,
    layer: &Layer,
    engine: &FillEngine,
    window_row: usize,
    window_col: usize,
    diagnostics: &mut dyn Diagnostics,
) {
    let k = grid.tiles_per_window;
    let top_left = grid.tile(window_row, window_col).rect;
    let bottom_right = grid.tile(window_row + k - 1, window_col + k - 1).rect;
    let bounds = Rectangle::new(top_left.x1, top_left.y1, bottom_right.x2, bottom_right.y2);

    let mut conductor_ids: HashSet<ConductorId> = HashSet::new();
    let mut filler_ids: HashSet<FillerId> = HashSet::new();
    for r in 0..k {
        for c in 0..k {
            let tile = grid.tile(window_row + r, window_col + c);
            conductor_ids.extend(tile.conductors.iter().copied());
            filler_ids.extend(tile.filler_set.iter().copied());
        }
    }

    let critical_rects: Vec<Rectangle> = conductor_ids
        .iter()
        .filter(|&&id| layer.conductors[id].is_critical)
        .map(|&id| layer.conductors[id].rect)
        .collect();
    let conductors: Vec<Rectangle> = conductor_ids.iter().map(|&id| layer.conductors[id].rect).collect();
    let fillers: Vec<Rectangle> = filler_ids.iter().map(|&id| engine.fillers[id].rect).collect();
    render(bounds, &critical_rects, &conductors, &fillers, diagnostics);
}

fn render(
    bounds: Rectangle,
    critical: &[Rectangle],
    conductors: &[Rectangle],
    fillers: &[Rectangle],
    diagnostics: &mut dyn Diagnostics,
) {
    let width = bounds.width().max(1);
    let height = bounds.height().max(1);
    for row in (0..RESOLUTION).rev() {
        let y = bounds.y1 + row * height / RESOLUTION;
        let mut line = String::with_capacity(RESOLUTION as usize);
        for col in 0..RESOLUTION {
            let x = bounds.x1 + col * width / RESOLUTION;
            line.push(sample(x, y, critical, conductors, fillers));
        }
        diagnostics.raw_line(&line);
    }
}

fn sample(x: i64, y: i64, critical: &[Rectangle], conductors: &[Rectangle], fillers: &[Rectangle]) -> char {
    if critical.iter().any(|r| contains(r, x, y)) {
        return '*';
    }
    if conductors.iter().any(|r| contains(r, x, y)) {
        return '#';
    }
    if fillers.iter().any(|r| contains(r, x, y)) {
        return '.';
    }
    ' '
}

fn contains(r: &Rectangle, x: i64, y: i64) -> bool {
    x >= r.x1 && x < r.x2 && y >= r.y1 && y < r.y2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecordingDiagnostics;
    use core_process::{Conductor, Direction};

    #[test]
    fn dump_tile_marks_a_critical_conductor() {
        let mut layer = Layer {
            id: 0,
            direction: Direction::Horizontal,
            min_fill_width: 2,
            max_fill_width: 10,
            min_spacing: 2,
            min_metal_density: 0.1,
            max_metal_density: 0.9,
            weight: 1.0,
            conductors: vec![Conductor::new(Rectangle::new(0, 0, 100, 100), 1, true)],
        };
        layer.derive_direction();
        let chip = Rectangle::new(0, 0, 100, 100);
        let grid = Grid::build(chip, 100, 1, &layer);
        let engine = FillEngine::new();
        let mut diagnostics = RecordingDiagnostics::default();
        dump_tile(&grid, &layer, &engine, 0, 0, &mut diagnostics);
        assert_eq!(diagnostics.events.len(), RESOLUTION as usize);
        assert!(diagnostics
            .events
            .iter()
            .any(|e| matches!(e, crate::DiagnosticEvent::RawLine(l) if l.contains('*'))));
    }
}
