//! Input parsing and output writing for the plain-text file formats
//! described in `spec.md` §6. Kept deliberately dumb: no validation
//! beyond what's needed to build a well-formed [`Database`], no
//! recovery from malformed input.

use core_geom::Rectangle;
use core_process::{Conductor, Database, Direction, Layer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::str::SplitWhitespace;

#[derive(Debug, thiserror::Error)]
pub enum MetalFillError {
    #[error("failed to read input file {path}")]
    InputIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write output file {path}")]
    OutputIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed input: {0}")]
    MalformedInput(String),
}

fn malformed(message: impl Into<String>) -> MetalFillError {
    MetalFillError::MalformedInput(message.into())
}

fn next_field<'a>(fields: &mut SplitWhitespace<'a>, what: &str) -> Result<&'a str, MetalFillError> {
    fields.next().ok_or_else(|| malformed(format!("missing {what}")))
}

fn next_i64(fields: &mut SplitWhitespace, what: &str) -> Result<i64, MetalFillError> {
    next_field(fields, what)?
        .parse()
        .map_err(|_| malformed(format!("invalid integer for {what}")))
}

fn next_f64(fields: &mut SplitWhitespace, what: &str) -> Result<f64, MetalFillError> {
    next_field(fields, what)?
        .parse()
        .map_err(|_| malformed(format!("invalid number for {what}")))
}

fn next_usize(fields: &mut SplitWhitespace, what: &str) -> Result<usize, MetalFillError> {
    next_field(fields, what)?
        .parse()
        .map_err(|_| malformed(format!("invalid count for {what}")))
}

pub fn read_database(path: &Path) -> Result<Database, MetalFillError> {
    let raw = std::fs::read_to_string(path).map_err(|source| MetalFillError::InputIo {
        path: path.to_path_buf(),
        source,
    })?;
    parse_database(&raw)
}

/// Parses the whitespace-separated input format from `spec.md` §6:
/// chip/window line, counts line, critical-net ids, layer declarations,
/// then conductor records. Rows are consumed strictly by count; a
/// mismatch (too few rows, or leftover rows after the last conductor)
/// is `MalformedInput`.
pub fn parse_database(input: &str) -> Result<Database, MetalFillError> {
    let mut lines = input.lines().map(str::trim).filter(|l| !l.is_empty());

    let header = lines.next().ok_or_else(|| malformed("missing chip boundary line"))?;
    let mut fields = header.split_whitespace();
    let chip_x1 = next_i64(&mut fields, "chipX1")?;
    let chip_y1 = next_i64(&mut fields, "chipY1")?;
    let chip_x2 = next_i64(&mut fields, "chipX2")?;
    let chip_y2 = next_i64(&mut fields, "chipY2")?;
    let window_size = next_i64(&mut fields, "windowSize")?;
    let chip_boundary = Rectangle::new(chip_x1, chip_y1, chip_x2, chip_y2);

    let counts = lines.next().ok_or_else(|| malformed("missing counts line"))?;
    let mut fields = counts.split_whitespace();
    let num_critical_net = next_usize(&mut fields, "numCriticalNet")?;
    let num_layer = next_usize(&mut fields, "numLayer")?;
    let num_conductor = next_usize(&mut fields, "numConductor")?;

    let mut critical_nets: BTreeSet<i64> = BTreeSet::new();
    for _ in 0..num_critical_net {
        let line = lines.next().ok_or_else(|| malformed("missing critical-net line"))?;
        let net_id: i64 = line
            .parse()
            .map_err(|_| malformed(format!("invalid critical net id {line:?}")))?;
        critical_nets.insert(net_id);
    }

    let mut layers: Vec<Layer> = Vec::with_capacity(num_layer);
    let mut layer_index: std::collections::HashMap<i64, usize> = std::collections::HashMap::new();
    for _ in 0..num_layer {
        let line = lines.next().ok_or_else(|| malformed("missing layer line"))?;
        let mut fields = line.split_whitespace();
        let id = next_i64(&mut fields, "layer id")?;
        let min_fill_width = next_i64(&mut fields, "minFillWidth")?;
        let min_spacing = next_i64(&mut fields, "minSpacing")?;
        let max_fill_width = next_i64(&mut fields, "maxFillWidth")?;
        let min_metal_density = next_f64(&mut fields, "minDensity")?;
        let max_metal_density = next_f64(&mut fields, "maxDensity")?;
        let weight = next_f64(&mut fields, "weight")?;
        if layer_index.insert(id, layers.len()).is_some() {
            return Err(malformed(format!("duplicate layer id {id}")));
        }
        layers.push(Layer {
            id,
            direction: Direction::None,
            min_fill_width,
            max_fill_width,
            min_spacing,
            min_metal_density,
            max_metal_density,
            weight,
            conductors: Vec::new(),
        });
    }

    for _ in 0..num_conductor {
        let line = lines.next().ok_or_else(|| malformed("missing conductor line"))?;
        let mut fields = line.split_whitespace();
        let _id = next_i64(&mut fields, "conductor id")?;
        let x1 = next_i64(&mut fields, "conductor x1")?;
        let y1 = next_i64(&mut fields, "conductor y1")?;
        let x2 = next_i64(&mut fields, "conductor x2")?;
        let y2 = next_i64(&mut fields, "conductor y2")?;
        let net_id = next_i64(&mut fields, "conductor netId")?;
        let layer_id = next_i64(&mut fields, "conductor layerId")?;
        let &layer_idx = layer_index
            .get(&layer_id)
            .ok_or_else(|| malformed(format!("conductor references unknown layer {layer_id}")))?;
        let is_critical = critical_nets.contains(&net_id);
        layers[layer_idx]
            .conductors
            .push(Conductor::new(Rectangle::new(x1, y1, x2, y2), net_id, is_critical));
    }

    if let Some(extra) = lines.next() {
        return Err(malformed(format!("unexpected trailing input: {extra:?}")));
    }

    tracing::debug!(
        target: "io",
        layers = layers.len(),
        conductors = num_conductor,
        "input_parsed"
    );

    Ok(Database {
        chip_boundary,
        window_size,
        layers,
    })
}

/// Rewrites `database` back into the input format, for round-trip
/// testing. Conductors are emitted grouped by their owning layer
/// (ids renumbered 0-based) rather than in their original interleaving,
/// which the format does not distinguish semantically.
pub fn serialize_database(database: &Database) -> String {
    let mut critical_nets: BTreeSet<i64> = BTreeSet::new();
    for layer in &database.layers {
        for conductor in &layer.conductors {
            if conductor.is_critical {
                critical_nets.insert(conductor.net_id);
            }
        }
    }
    let num_conductor: usize = database.layers.iter().map(|l| l.conductors.len()).sum();

    let mut out = String::new();
    let b = &database.chip_boundary;
    writeln!(out, "{} {} {} {} {}", b.x1, b.y1, b.x2, b.y2, database.window_size).unwrap();
    writeln!(
        out,
        "{} {} {}",
        critical_nets.len(),
        database.layers.len(),
        num_conductor
    )
    .unwrap();
    for net_id in &critical_nets {
        writeln!(out, "{net_id}").unwrap();
    }
    for layer in &database.layers {
        writeln!(
            out,
            "{} {} {} {} {} {} {}",
            layer.id,
            layer.min_fill_width,
            layer.min_spacing,
            layer.max_fill_width,
            layer.min_metal_density,
            layer.max_metal_density,
            layer.weight
        )
        .unwrap();
    }
    let mut conductor_id = 0i64;
    for layer in &database.layers {
        for conductor in &layer.conductors {
            writeln!(
                out,
                "{} {} {} {} {} {} {}",
                conductor_id,
                conductor.rect.x1,
                conductor.rect.y1,
                conductor.rect.x2,
                conductor.rect.y2,
                conductor.net_id,
                layer.id
            )
            .unwrap();
            conductor_id += 1;
        }
    }
    out
}

/// Writes placed fillers, one line `x1 y1 x2 y2 layerId` per filler,
/// grouped by layer id ascending.
pub fn write_fillers(
    path: &Path,
    fillers_by_layer: &BTreeMap<i64, Vec<core_process::Filler>>,
) -> Result<(), MetalFillError> {
    let mut out = String::new();
    for (&layer_id, fillers) in fillers_by_layer {
        for filler in fillers {
            writeln!(
                out,
                "{} {} {} {} {}",
                filler.rect.x1, filler.rect.y1, filler.rect.x2, filler.rect.y2, layer_id
            )
            .unwrap();
        }
    }
    std::fs::write(path, out).map_err(|source| MetalFillError::OutputIo {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
0 0 100 100 100
1 2 3
7
1 2 2 10 0.1 0.9 1.0
2 1 2 10 0.2 0.8 1.0
0 20 20 30 30 7 1
1 0 0 10 10 5 1
2 40 40 50 50 9 2
";

    #[test]
    fn parses_the_documented_format() {
        let db = parse_database(SAMPLE).unwrap();
        assert_eq!(db.chip_boundary, Rectangle::new(0, 0, 100, 100));
        assert_eq!(db.window_size, 100);
        assert_eq!(db.layers.len(), 2);
        assert_eq!(db.layers[0].conductors.len(), 2);
        assert_eq!(db.layers[1].conductors.len(), 1);
        assert!(db.layers[0].conductors[0].is_critical);
        assert!(!db.layers[0].conductors[1].is_critical);
    }

    #[test]
    fn unknown_layer_reference_is_malformed() {
        let bad = "0 0 10 10 10\n0 1 1\n1 2 2 10 0.1 0.9 1.0\n0 0 0 5 5 0 99\n";
        assert!(parse_database(bad).is_err());
    }

    #[test]
    fn missing_rows_is_malformed() {
        let truncated = "0 0 10 10 10\n0 1 1\n1 2 2 10 0.1 0.9 1.0\n";
        assert!(parse_database(truncated).is_err());
    }

    #[test]
    fn round_trip_through_serialize_is_semantically_equal() {
        let db = parse_database(SAMPLE).unwrap();
        let rewritten = serialize_database(&db);
        let reparsed = parse_database(&rewritten).unwrap();
        assert_eq!(db, reparsed);
    }

    #[test]
    fn write_fillers_groups_by_layer_ascending() {
        use core_process::Filler;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let mut by_layer = BTreeMap::new();
        by_layer.insert(2i64, vec![Filler::new(Rectangle::new(0, 0, 5, 5), true)]);
        by_layer.insert(1i64, vec![Filler::new(Rectangle::new(1, 1, 4, 4), true)]);
        write_fillers(&path, &by_layer).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, vec!["1 1 4 4 1", "0 0 5 5 2"]);
    }
}
