//! Tile/window grid construction and per-tile conductor-area bookkeeping.
//!
//! A [`Grid`] owns the tile grid and the window-area accumulator for one
//! layer of one run; both are torn down and rebuilt together every time
//! [`Grid::build`] is called (e.g. for the chip-global fallback pass), so
//! the back-references tiles hold into window cells never dangle.

use core_geom::{intersect_region, Rectangle};
use core_process::{Conductor, ConductorId, FillerId, Layer};
use std::collections::{HashMap, HashSet};

/// Which way to round a fractional tile coordinate: `Floor` for the
/// lower-left corner of a covering range, `Ceil` for the (exclusive)
/// upper-right corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundingMode {
    Floor,
    Ceil,
}

/// Index of a free/candidate region recorded against a tile. Opaque to
/// this crate; owned and interpreted by whichever arena created it
/// (`core-sweep` / `core-driver`).
pub type RegionId = usize;

#[derive(Debug, Clone, Default)]
pub struct Tile {
    pub rect: Rectangle,
    pub conductor_area: i64,
    pub filler_area: i64,
    /// `(window_row, window_col)` pairs this tile contributes to.
    pub windows: Vec<(usize, usize)>,
    pub conductors: Vec<ConductorId>,
    pub candidate_regions: Vec<RegionId>,
    pub filler_set: HashSet<FillerId>,
    pub candidate_filler_set: HashSet<FillerId>,
}

impl Tile {
    pub fn occupy_area(&self) -> i64 {
        self.conductor_area + self.filler_area
    }

    pub fn density(&self) -> f64 {
        self.occupy_area() as f64 / self.rect.area() as f64
    }
}

pub struct Grid {
    pub chip_boundary: Rectangle,
    pub tile_size: i64,
    pub tile_area: i64,
    pub window_size: i64,
    pub window_area: i64,
    pub tiles_per_window: usize,
    pub num_tile_row: usize,
    pub num_tile_col: usize,
    pub num_window_row: usize,
    pub num_window_col: usize,
    /// Row-major tile storage: `tiles[row * num_tile_col + col]`.
    tiles: Vec<Tile>,
    /// Row-major window area storage: `windows[row * num_window_col + col]`.
    windows: Vec<i64>,
}

impl Grid {
    /// Builds a fresh grid for `layer` over `chip_boundary`, registering
    /// every conductor against the tiles it intersects and computing each
    /// tile's `conductor_area` up front. Mirrors
    /// `DensityManager::initGrid` in the original.
    pub fn build(chip_boundary: Rectangle, window_size: i64, tiles_per_window: usize, layer: &Layer) -> Self {
        let tile_size = window_size / tiles_per_window as i64;
        let tile_area = tile_size * tile_size;
        let window_area = window_size * window_size;
        let num_tile_row = (chip_boundary.height() / tile_size) as usize;
        let num_tile_col = (chip_boundary.width() / tile_size) as usize;
        let num_window_row = num_tile_row + 1 - tiles_per_window;
        let num_window_col = num_tile_col + 1 - tiles_per_window;

        let mut tiles = Vec::with_capacity(num_tile_row * num_tile_col);
        for row in 0..num_tile_row {
            for col in 0..num_tile_col {
                let x = chip_boundary.x1 + col as i64 * tile_size;
                let y = chip_boundary.y1 + row as i64 * tile_size;
                tiles.push(Tile {
                    rect: Rectangle::new(x, y, x + tile_size, y + tile_size),
                    ..Default::default()
                });
            }
        }

        let mut grid = Self {
            chip_boundary,
            tile_size,
            tile_area,
            window_size,
            window_area,
            tiles_per_window,
            num_tile_row,
            num_tile_col,
            num_window_row,
            num_window_col,
            tiles,
            windows: vec![0; num_window_row * num_window_col],
        };

        for wr in 0..num_window_row {
            for wc in 0..num_window_col {
                for r in 0..tiles_per_window {
                    for c in 0..tiles_per_window {
                        grid.tile_mut(wr + r, wc + c).windows.push((wr, wc));
                    }
                }
            }
        }

        for (conductor_id, conductor) in layer.conductors.iter().enumerate() {
            let (begin_row, begin_col, end_row, end_col) = grid.tile_range(&conductor.rect);
            for row in begin_row..end_row {
                for col in begin_col..end_col {
                    grid.tile_mut(row, col).conductors.push(conductor_id);
                }
            }
        }

        for row in 0..num_tile_row {
            for col in 0..num_tile_col {
                let tile_rect = grid.tile(row, col).rect;
                let conductor_ids = grid.tile(row, col).conductors.clone();
                let conductors: Vec<&Conductor> =
                    conductor_ids.iter().map(|&id| &layer.conductors[id]).collect();
                grid.tile_mut(row, col).conductor_area = conductor_area(&tile_rect, &conductors);
            }
        }

        grid.recompute_all_window_areas();
        grid
    }

    pub fn tile(&self, row: usize, col: usize) -> &Tile {
        &self.tiles[row * self.num_tile_col + col]
    }

    pub fn tile_mut(&mut self, row: usize, col: usize) -> &mut Tile {
        &mut self.tiles[row * self.num_tile_col + col]
    }

    pub fn tiles_row_major(&self) -> impl Iterator<Item = ((usize, usize), &Tile)> {
        let num_tile_col = self.num_tile_col;
        self.tiles
            .iter()
            .enumerate()
            .map(move |(i, t)| ((i / num_tile_col, i % num_tile_col), t))
    }

    pub fn window_area_at(&self, row: usize, col: usize) -> i64 {
        self.windows[row * self.num_window_col + col]
    }

    fn window_area_at_mut(&mut self, row: usize, col: usize) -> &mut i64 {
        &mut self.windows[row * self.num_window_col + col]
    }

    pub fn windows_row_major(&self) -> impl Iterator<Item = i64> + '_ {
        self.windows.iter().copied()
    }

    /// `(row, col)` of the tile containing point `(x, y)`, rounded per
    /// `mode`. Only `Floor` is meaningful for a single point; both modes
    /// exist so [`Self::tile_range`] can share this helper.
    pub fn point_tile_index(&self, x: i64, y: i64, mode: RoundingMode) -> (i64, i64) {
        let row = div_rounding((y - self.chip_boundary.y1) as f64, self.tile_size as f64, mode);
        let col = div_rounding((x - self.chip_boundary.x1) as f64, self.tile_size as f64, mode);
        (row, col)
    }

    /// The covering tile range of `rect`: `[begin_row, begin_col, end_row,
    /// end_col)` where the right/top edges are exclusive. Clamped to the
    /// grid's own bounds so a rectangle expanded past the chip boundary
    /// (e.g. a conductor near the edge, after spacing expansion) doesn't
    /// index out of range.
    pub fn tile_range(&self, rect: &Rectangle) -> (usize, usize, usize, usize) {
        let (begin_row, begin_col) = self.point_tile_index(rect.x1, rect.y1, RoundingMode::Floor);
        let (end_row, end_col) = self.point_tile_index(rect.x2, rect.y2, RoundingMode::Ceil);
        (
            begin_row.clamp(0, self.num_tile_row as i64) as usize,
            begin_col.clamp(0, self.num_tile_col as i64) as usize,
            end_row.clamp(0, self.num_tile_row as i64) as usize,
            end_col.clamp(0, self.num_tile_col as i64) as usize,
        )
    }

    pub fn tile_position(&self, row: usize, col: usize) -> (i64, i64) {
        (
            self.chip_boundary.x1 + col as i64 * self.tile_size,
            self.chip_boundary.y1 + row as i64 * self.tile_size,
        )
    }

    /// Full O(numWindows * K^2) recompute of every window's occupied
    /// area from the tiles composing it. Called once after [`Self::build`];
    /// incremental inserts/removes update the affected windows directly
    /// instead of calling this again.
    pub fn recompute_all_window_areas(&mut self) {
        for wr in 0..self.num_window_row {
            for wc in 0..self.num_window_col {
                let mut occupy = 0i64;
                for r in 0..self.tiles_per_window {
                    for c in 0..self.tiles_per_window {
                        occupy += self.tile(wr + r, wc + c).occupy_area();
                    }
                }
                *self.window_area_at_mut(wr, wc) = occupy;
            }
        }
    }

    /// Applies a filler-area delta to `tile` and every window it feeds,
    /// keeping the invariants in `spec.md` §3 intact. `delta` is positive
    /// on insert, negative on remove.
    pub fn apply_filler_delta(&mut self, row: usize, col: usize, delta: i64) {
        let windows = self.tile(row, col).windows.clone();
        self.tile_mut(row, col).filler_area += delta;
        for (wr, wc) in windows {
            *self.window_area_at_mut(wr, wc) += delta;
        }
    }

    pub fn min_max_window_area(&self) -> (i64, i64) {
        let mut min_area = self.window_area;
        let mut max_area = 0;
        for &area in &self.windows {
            min_area = min_area.min(area);
            max_area = max_area.max(area);
        }
        (min_area, max_area)
    }

    pub fn min_max_window_density(&self) -> (f64, f64) {
        let (min_area, max_area) = self.min_max_window_area();
        (
            min_area as f64 / self.window_area as f64,
            max_area as f64 / self.window_area as f64,
        )
    }
}

fn div_rounding(numerator: f64, denominator: f64, mode: RoundingMode) -> i64 {
    let q = numerator / denominator;
    match mode {
        RoundingMode::Floor => q.floor() as i64,
        RoundingMode::Ceil => q.ceil() as i64,
    }
}

/// The occupied area of `tile_rect` under `conductors`, counting
/// same-net overlap exactly once via inclusion-exclusion. Cross-net
/// overlap (a DRC violation upstream) is not corrected for; see
/// `spec.md` §4.2.
pub fn conductor_area(tile_rect: &Rectangle, conductors: &[&Conductor]) -> i64 {
    let mut area = 0i64;
    let mut by_net: HashMap<i64, Vec<usize>> = HashMap::new();
    for (i, conductor) in conductors.iter().enumerate() {
        area += intersect_region(tile_rect, &conductor.rect).area();
        by_net.entry(conductor.net_id).or_default().push(i);
    }

    for indices in by_net.values() {
        if indices.len() < 2 {
            continue;
        }
        let mut regions: Vec<(Rectangle, usize)> = indices
            .iter()
            .map(|&i| (intersect_region(tile_rect, &conductors[i].rect), i))
            .collect();
        let mut sign = -1i64;
        while !regions.is_empty() {
            let mut next = Vec::new();
            for (region, idx) in &regions {
                for &i in indices.iter().filter(|&&i| i > *idx) {
                    let overlap = intersect_region(region, &conductors[i].rect);
                    if overlap.area() == 0 {
                        continue;
                    }
                    area += sign * overlap.area();
                    next.push((overlap, i));
                }
            }
            sign = -sign;
            regions = next;
        }
    }
    area
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_process::Direction;
    use proptest::prelude::*;

    fn layer_with(conductors: Vec<Conductor>) -> Layer {
        Layer {
            id: 0,
            direction: Direction::Horizontal,
            min_fill_width: 2,
            max_fill_width: 10,
            min_spacing: 2,
            min_metal_density: 0.1,
            max_metal_density: 0.9,
            weight: 1.0,
            conductors,
        }
    }

    #[test]
    fn single_conductor_area_is_just_the_intersection() {
        let tile = Rectangle::new(0, 0, 10, 10);
        let c = Conductor::new(Rectangle::new(2, 2, 8, 8), 1, false);
        assert_eq!(conductor_area(&tile, &[&c]), 36);
    }

    #[test]
    fn same_net_overlap_counted_once() {
        let tile = Rectangle::new(0, 0, 20, 20);
        let a = Conductor::new(Rectangle::new(0, 0, 10, 10), 5, false);
        let b = Conductor::new(Rectangle::new(5, 5, 15, 15), 5, false);
        // 100 + 100 - 25 = 175, per spec Scenario 2.
        assert_eq!(conductor_area(&tile, &[&a, &b]), 175);
    }

    #[test]
    fn different_nets_are_not_corrected() {
        let tile = Rectangle::new(0, 0, 20, 20);
        let a = Conductor::new(Rectangle::new(0, 0, 10, 10), 5, false);
        let b = Conductor::new(Rectangle::new(5, 5, 15, 15), 6, false);
        assert_eq!(conductor_area(&tile, &[&a, &b]), 200);
    }

    #[test]
    fn three_way_same_net_overlap() {
        let tile = Rectangle::new(0, 0, 30, 30);
        let a = Conductor::new(Rectangle::new(0, 0, 10, 10), 1, false);
        let b = Conductor::new(Rectangle::new(5, 0, 15, 10), 1, false);
        let c = Conductor::new(Rectangle::new(0, 5, 10, 15), 1, false);
        // pairwise: ab=5*10=50, ac=10*5=50, bc=5*5=25; triple abc=5*5=25
        // area = (100+100+100) - (50+50+25) + 25 = 300-125+25 = 200
        assert_eq!(conductor_area(&tile, &[&a, &b, &c]), 200);
    }

    #[test]
    fn grid_dimensions_match_spec_formula() {
        let chip = Rectangle::new(0, 0, 1000, 1000);
        let layer = layer_with(vec![]);
        let grid = Grid::build(chip, 100, 4, &layer);
        assert_eq!(grid.tile_size, 25);
        assert_eq!(grid.num_tile_row, 40);
        assert_eq!(grid.num_tile_col, 40);
        assert_eq!(grid.num_window_row, 37);
        assert_eq!(grid.num_window_col, 37);
    }

    #[test]
    fn window_sum_equals_composing_tile_occupy_areas() {
        let chip = Rectangle::new(0, 0, 400, 400);
        let layer = layer_with(vec![Conductor::new(Rectangle::new(0, 0, 50, 400), 1, false)]);
        let mut grid = Grid::build(chip, 100, 4, &layer);
        grid.apply_filler_delta(0, 0, 10);
        grid.recompute_all_window_areas();
        let mut expect = 0i64;
        for r in 0..4 {
            for c in 0..4 {
                expect += grid.tile(r, c).occupy_area();
            }
        }
        assert_eq!(grid.window_area_at(0, 0), expect);
    }

    proptest! {
        #[test]
        fn incremental_window_updates_match_full_recompute(delta in -50i64..50) {
            let chip = Rectangle::new(0, 0, 400, 400);
            let layer = layer_with(vec![]);
            let mut grid = Grid::build(chip, 100, 4, &layer);
            grid.apply_filler_delta(1, 1, delta);
            let incremental = grid.window_area_at(0, 0);
            grid.recompute_all_window_areas();
            let recomputed = grid.window_area_at(0, 0);
            prop_assert_eq!(incremental, recomputed);
        }
    }

    /// Exhaustive unit-cell pixel count over `tile`, counting a pixel
    /// once if any `shapes` rectangle covers it. Only tractable for the
    /// small test layouts used here; exists to cross-check `occupy_area`
    /// against a definition that doesn't rely on inclusion-exclusion.
    fn brute_force_occupy_area(tile: Rectangle, shapes: &[Rectangle]) -> i64 {
        let mut area = 0i64;
        for y in tile.y1..tile.y2 {
            for x in tile.x1..tile.x2 {
                if shapes
                    .iter()
                    .any(|r| x >= r.x1 && x < r.x2 && y >= r.y1 && y < r.y2)
                {
                    area += 1;
                }
            }
        }
        area
    }

    #[test]
    fn occupy_area_matches_brute_force_pixel_count() {
        let chip = Rectangle::new(0, 0, 20, 20);
        let a = Conductor::new(Rectangle::new(0, 0, 10, 10), 1, false);
        let b = Conductor::new(Rectangle::new(5, 5, 15, 15), 1, false);
        let layer = layer_with(vec![a, b]);
        let grid = Grid::build(chip, 20, 1, &layer);

        let tile_rect = grid.tile(0, 0).rect;
        let brute = brute_force_occupy_area(tile_rect, &[a.rect, b.rect]);
        assert_eq!(grid.tile(0, 0).occupy_area(), brute);
    }
}
