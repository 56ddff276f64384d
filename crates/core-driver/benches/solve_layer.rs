use core_driver::{solve_layer, NullDiagnostics};
use core_geom::Rectangle;
use core_process::{Conductor, Direction, Layer};
use criterion::Criterion;

fn grid_of_conductors(n: i64, spacing: i64, size: i64) -> Vec<Conductor> {
    let mut conductors = Vec::new();
    let mut net_id = 0;
    let mut y = 0;
    while y + size <= 1000 {
        let mut x = 0;
        while x + size <= 1000 {
            conductors.push(Conductor::new(Rectangle::new(x, y, x + size, y + size), net_id, net_id % 17 == 0));
            net_id += 1;
            x += size + spacing;
        }
        y += size + spacing;
    }
    conductors
}

pub fn solve_layer_dense(c: &mut Criterion) {
    let chip = Rectangle::new(0, 0, 1000, 1000);
    c.bench_function("solve_layer - dense 1000x1000", |b| {
        b.iter(|| {
            let mut layer = Layer {
                id: 1,
                direction: Direction::None,
                min_fill_width: 5,
                max_fill_width: 20,
                min_spacing: 2,
                min_metal_density: 0.1,
                max_metal_density: 0.7,
                weight: 1.0,
                conductors: grid_of_conductors(1000, 10, 15),
            };
            let mut diagnostics = NullDiagnostics;
            solve_layer(chip, 100, 4, &mut layer, true, &mut diagnostics)
        })
    });
}

pub fn solve_layer_empty(c: &mut Criterion) {
    let chip = Rectangle::new(0, 0, 1000, 1000);
    c.bench_function("solve_layer - empty 1000x1000", |b| {
        b.iter(|| {
            let mut layer = Layer {
                id: 1,
                direction: Direction::None,
                min_fill_width: 5,
                max_fill_width: 20,
                min_spacing: 2,
                min_metal_density: 0.1,
                max_metal_density: 0.9,
                weight: 1.0,
                conductors: Vec::new(),
            };
            let mut diagnostics = NullDiagnostics;
            solve_layer(chip, 100, 4, &mut layer, true, &mut diagnostics)
        })
    });
}
