//! Free-region discovery and refinement.
//!
//! Both passes operate on a horizontal sweep (the scan axis is X); a
//! `Direction::Vertical` layer is normalized onto that sweep by
//! transposing the boundary, the blocking rectangles, and the output, so
//! a single implementation covers both directions. Each function handles
//! its own transform at entry and untransform at exit, so the two can be
//! called, tested, and reasoned about independently.

use core_geom::Rectangle;
use core_process::Direction;
use std::collections::{BTreeMap, HashSet};

/// Finds the maximal empty rectangles in `boundary` not covered by any of
/// `conductors`, each first expanded by `lower_left_spacing` /
/// `upper_right_spacing` to account for minimum spacing to a filler.
///
/// A single left-to-right sweep over conductor entry/exit events
/// maintains the active set crossing the current X; at every distinct X
/// within the boundary it recomputes the vertical gaps between active
/// conductors and carries each gap forward as an open region until the
/// gap changes, at which point the region closes at the current X.
pub fn discover_free_regions(
    boundary: Rectangle,
    conductors: &[Rectangle],
    direction: Direction,
    lower_left_spacing: i64,
    upper_right_spacing: i64,
) -> Vec<Rectangle> {
    let mut boundary = boundary;
    let mut blockers: Vec<Rectangle> = conductors
        .iter()
        .map(|c| {
            let mut r = *c;
            r.expand(lower_left_spacing, upper_right_spacing);
            r
        })
        .collect();
    if direction == Direction::Vertical {
        boundary.transform();
        for b in &mut blockers {
            b.transform();
        }
    }

    let mut events: BTreeMap<i64, (Vec<usize>, Vec<usize>)> = BTreeMap::new();
    events.entry(boundary.x1).or_default();
    events.entry(boundary.x2).or_default();
    for (i, b) in blockers.iter().enumerate() {
        events.entry(b.x1).or_default().1.push(i);
        events.entry(b.x2).or_default().0.push(i);
    }

    let mut active: HashSet<usize> = HashSet::new();
    let mut open: std::collections::HashMap<(i64, i64), Rectangle> = std::collections::HashMap::new();
    let mut results: Vec<Rectangle> = Vec::new();

    for (&x, (rights, lefts)) in &events {
        for &i in rights {
            active.remove(&i);
        }
        for &i in lefts {
            active.insert(i);
        }

        if boundary.x1 <= x && x < boundary.x2 {
            let mut sorted: Vec<usize> = active.iter().copied().collect();
            sorted.sort_by_key(|&i| {
                let b = blockers[i];
                (b.y1, b.y2, b.x1, b.x2)
            });

            let mut intervals: Vec<(i64, i64)> = Vec::new();
            let mut max_y = boundary.y1;
            for &i in &sorted {
                let b = blockers[i];
                if b.y1 - max_y >= 1 {
                    intervals.push((max_y, b.y1));
                }
                max_y = max_y.max(b.y2);
            }
            if boundary.y2 - max_y >= 1 {
                intervals.push((max_y, boundary.y2));
            }
            let interval_set: HashSet<(i64, i64)> = intervals.iter().copied().collect();

            let mut still_open = std::collections::HashMap::new();
            for (key, rect) in open.drain() {
                if interval_set.contains(&key) {
                    still_open.insert(key, rect);
                } else {
                    let mut closed = rect;
                    closed.x2 = x;
                    if closed.width() >= 1 {
                        results.push(closed);
                    }
                }
            }
            open = still_open;

            for &(y1, y2) in &intervals {
                open.entry((y1, y2))
                    .or_insert_with(|| Rectangle::new(x, y1, x, y2));
            }
        } else if x == boundary.x2 {
            for (_, rect) in open.drain() {
                let mut closed = rect;
                closed.x2 = x;
                if closed.width() >= 1 {
                    results.push(closed);
                }
            }
            break;
        }
    }

    if direction == Direction::Vertical {
        for r in &mut results {
            r.transform();
        }
    }
    results
}

#[derive(Debug, Clone, Copy)]
struct RegionRec {
    rect: Rectangle,
    is_legal: bool,
    alive: bool,
}

/// Merges adjacent free regions that were only split apart by a
/// conductor slicing them at different X (i.e. regions sharing the same Y
/// band across a conductor boundary), and drops pieces too small to ever
/// host a filler once [`min_fill_width`] and spacing are accounted for.
///
/// `min_fill_width` plus the two spacings forms `min_region_width`, the
/// threshold a region's width and height must both clear to count as
/// fillable. A region whose width falls short but whose height clears it
/// is "illegal": it can't host a filler itself, but an adjacent legal
/// region may absorb the Y band it occupies by extending through it, and
/// any leftover band too narrow to extend further is discarded rather
/// than carried forward.
pub fn refine_free_regions(
    free_regions: &[Rectangle],
    direction: Direction,
    min_fill_width: i64,
    lower_left_spacing: i64,
    upper_right_spacing: i64,
) -> Vec<Rectangle> {
    let min_region_width = min_fill_width + lower_left_spacing + upper_right_spacing;

    let mut arena: Vec<RegionRec> = Vec::new();
    for region in free_regions {
        let mut r = *region;
        if direction == Direction::Vertical {
            r.transform();
        }
        if r.height() < min_region_width {
            continue;
        }
        let is_legal = r.width() >= min_region_width;
        arena.push(RegionRec {
            rect: r,
            is_legal,
            alive: true,
        });
    }

    let mut events: BTreeMap<i64, (Vec<usize>, Vec<usize>)> = BTreeMap::new();
    for (id, rec) in arena.iter().enumerate() {
        events.entry(rec.rect.x1).or_default().1.push(id);
        events.entry(rec.rect.x2).or_default().0.push(id);
    }

    while let Some(&x) = events.keys().next() {
        let (rights, mut lefts) = events.remove(&x).unwrap();

        for &former_id in &rights {
            if !arena[former_id].alive {
                continue;
            }
            let mut li = 0;
            while li < lefts.len() {
                let latter_id = lefts[li];
                if !arena[latter_id].alive {
                    li += 1;
                    continue;
                }
                if former_id == latter_id {
                    li += 1;
                    continue;
                }

                let former_legal = arena[former_id].is_legal;
                let latter_legal = arena[latter_id].is_legal;
                let (fy1, fy2) = (arena[former_id].rect.y1, arena[former_id].rect.y2);
                let (ly1, ly2) = (arena[latter_id].rect.y1, arena[latter_id].rect.y2);

                if former_legal && latter_legal {
                    if fy1 == ly1 && fy2 == ly2 {
                        let new_x2 = arena[latter_id].rect.x2;
                        arena[former_id].rect.x2 = new_x2;
                        arena[latter_id].alive = false;
                        events.entry(new_x2).or_default().0.push(former_id);
                        lefts.remove(li);
                        break;
                    }
                    li += 1;
                } else if former_legal && !latter_legal {
                    if ly1 <= fy1 && fy2 <= ly2 {
                        let new_x2 = arena[latter_id].rect.x2;
                        arena[former_id].rect.x2 = new_x2;
                        events.entry(new_x2).or_default().0.push(former_id);

                        if fy1 - ly1 >= min_region_width {
                            let mut bottom = arena[latter_id].rect;
                            bottom.y2 = fy1;
                            let new_id = arena.len();
                            arena.push(RegionRec {
                                rect: bottom,
                                is_legal: false,
                                alive: true,
                            });
                            lefts.push(new_id);
                            events.entry(bottom.x2).or_default().0.push(new_id);
                        }
                        if ly2 - fy2 >= min_region_width {
                            arena[latter_id].rect.y1 = fy2;
                        } else {
                            arena[latter_id].alive = false;
                            lefts.remove(li);
                        }
                        break;
                    }
                    li += 1;
                } else if !former_legal && latter_legal {
                    if fy1 <= ly1 && ly2 <= fy2 {
                        let new_x1 = arena[former_id].rect.x1;
                        arena[latter_id].rect.x1 = new_x1;
                        lefts.remove(li);
                        continue;
                    }
                    li += 1;
                } else {
                    li += 1;
                }
            }
        }
    }

    let mut refined: Vec<Rectangle> = Vec::new();
    for rec in &arena {
        if !rec.alive {
            continue;
        }
        if rec.rect.width() >= min_region_width && rec.rect.height() >= min_region_width {
            let mut out = rec.rect;
            if direction == Direction::Vertical {
                out.transform();
            }
            refined.push(out);
        }
    }
    refined
}
