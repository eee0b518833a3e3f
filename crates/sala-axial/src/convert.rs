//! Conversions from drawings and data maps to axial and segment graphs.
//!
//! Every conversion removes near-zero and duplicate lines first (see
//! [`quick_tidy`]) and keeps the surviving lines in input order.

use indexmap::IndexMap;

use sala_core::geometry::runion;
use sala_core::{Communicator, Line, Progress, ProgressKind, QtRegion};
use sala_space::{quick_tidy, PixelBase, ShapeMap};

use crate::config::SegmentOptions;
use crate::error::AxialError;
use crate::graph::{GraphKind, ShapeGraph};

/// Column recording which drawing layer a line came from.
pub const DRAWING_LAYER_COL: &str = "Drawing Layer";
/// Column recording the key of the data-map shape a line came from.
pub const DATA_MAP_REF_COL: &str = "Data Map Ref";

/// Segment graphs need at least this many lines.
const MIN_SEGMENT_LINES: usize = 3;

/// Lines that survived tidying, each with the layer or shape it came from.
struct SourcedLines {
    lines: Vec<(Line, i32)>,
    region: QtRegion,
}

fn tidy_sourced(raw: Vec<(Line, i32)>, region: QtRegion) -> Result<SourcedLines, AxialError> {
    let mut keyed: IndexMap<i32, Line> = raw.iter().enumerate().map(|(i, (l, _))| (i as i32, *l)).collect();
    quick_tidy(&mut keyed, &region);
    if keyed.is_empty() {
        return Err(AxialError::NoLines {
            stage: "after removing short and duplicates",
        });
    }
    let lines = keyed.into_iter().map(|(i, l)| (l, raw[i as usize].1)).collect();
    Ok(SourcedLines { lines, region })
}

fn drawing_lines(layers: &[Vec<Line>]) -> Result<SourcedLines, AxialError> {
    let mut raw = Vec::new();
    let mut region: Option<QtRegion> = None;
    for (layer, lines) in layers.iter().enumerate() {
        for l in lines {
            region = Some(match region {
                Some(r) => runion(&r, &l.region()),
                None => l.region(),
            });
            raw.push((*l, layer as i32));
        }
    }
    let region = region.ok_or(AxialError::NoLines { stage: "in drawing" })?;
    tidy_sourced(raw, region)
}

fn data_lines(map: &ShapeMap) -> Result<SourcedLines, AxialError> {
    let raw: Vec<(Line, i32)> = map
        .shapes()
        .flat_map(|(key, shape)| shape.edges().into_iter().map(move |l| (l, key)))
        .collect();
    if raw.is_empty() {
        return Err(AxialError::NoLines { stage: "in data map" });
    }
    tidy_sourced(raw, map.region())
}

fn require_segment_lines(lines: usize) -> Result<(), AxialError> {
    if lines < MIN_SEGMENT_LINES {
        return Err(AxialError::InsufficientGeometry {
            lines,
            required: MIN_SEGMENT_LINES,
        });
    }
    Ok(())
}

/// Build a graph of `kind` from drawing layers, tagging lines with their
/// layer when there is more than one.
fn graph_from_drawing(
    name: &str,
    kind: GraphKind,
    layers: &[Vec<Line>],
    comm: Option<&mut dyn Communicator>,
) -> Result<ShapeGraph, AxialError> {
    let mut progress = Progress::new(comm);
    progress.post(ProgressKind::NumSteps, 2);
    progress.post(ProgressKind::CurrentStep, 1);
    let sourced = drawing_lines(layers)?;
    if kind == GraphKind::Segment {
        require_segment_lines(sourced.lines.len())?;
    }
    progress.check()?;
    progress.post(ProgressKind::CurrentStep, 2);

    let mut graph = ShapeGraph::with_region(name, kind, sourced.lines.len(), &sourced.region);
    match kind {
        GraphKind::Segment => graph.init_segment_attributes(),
        _ => graph.init_axial_attributes(),
    }
    let layer_col = (layers.len() > 1)
        .then(|| graph.map_mut().attributes_mut().insert_or_reset_column(DRAWING_LAYER_COL));
    for (l, layer) in sourced.lines {
        let key = graph.map_mut().make_line_shape(l);
        if let Some(col) = layer_col {
            graph.map_mut().attributes_mut().set_value(key, col, layer as f32);
        }
    }
    Ok(graph)
}

/// Build a graph of `kind` from every shape of a data map, broken into
/// lines. Each line records the key of its source shape and, with
/// `copydata`, every attribute of it.
fn graph_from_data(
    name: &str,
    kind: GraphKind,
    source: &ShapeMap,
    copydata: bool,
    comm: Option<&mut dyn Communicator>,
) -> Result<ShapeGraph, AxialError> {
    let mut progress = Progress::new(comm);
    progress.post(ProgressKind::NumSteps, 2);
    progress.post(ProgressKind::CurrentStep, 1);
    let sourced = data_lines(source)?;
    if kind == GraphKind::Segment {
        require_segment_lines(sourced.lines.len())?;
    }
    progress.check()?;
    progress.post(ProgressKind::CurrentStep, 2);

    let mut graph = ShapeGraph::with_region(name, kind, sourced.lines.len(), &sourced.region);
    match kind {
        GraphKind::Segment => graph.init_segment_attributes(),
        _ => graph.init_axial_attributes(),
    }
    let input = source.attributes();
    let table = graph.map_mut().attributes_mut();
    table.insert_or_reset_column(DATA_MAP_REF_COL);

    // copied columns go in name order, renamed "name k" on a clash
    let mut copied: Vec<(usize, usize)> = Vec::new();
    if copydata {
        let mut names: Vec<(usize, &str)> = input.column_names().enumerate().collect();
        names.sort_by(|a, b| a.1.cmp(b.1));
        for (from, base) in names {
            let mut colname = base.to_string();
            let mut k = 1;
            while table.column_index(&colname).is_some() {
                colname = format!("{base} {k}");
                k += 1;
            }
            copied.push((from, table.insert_or_reset_column(&colname)));
        }
    }
    let ref_col = table.get_or_insert_column(DATA_MAP_REF_COL);

    for (l, shape_key) in sourced.lines {
        let key = graph.map_mut().make_line_shape(l);
        let table = graph.map_mut().attributes_mut();
        table.set_value(key, ref_col, shape_key as f32);
        for &(from, to) in &copied {
            if let Some(v) = input.value(shape_key, from) {
                table.set_value(key, to, v);
            }
        }
    }
    Ok(graph)
}

/// Axial map from drawing layers: every drawn line becomes an axial line.
///
/// Fails with [`AxialError::NoLines`] if the layers are empty or nothing
/// survives tidying.
pub fn convert_drawing_to_axial(
    name: &str,
    layers: &[Vec<Line>],
    comm: Option<&mut dyn Communicator>,
) -> Result<ShapeGraph, AxialError> {
    let mut graph = graph_from_drawing(name, GraphKind::Axial, layers, comm)?;
    graph.make_connections(Vec::new());
    log::info!("converted drawing to axial map '{name}' with {} lines", graph.line_count());
    Ok(graph)
}

/// Segment map from drawing layers, joining lines at shared endpoints.
pub fn convert_drawing_to_segment(
    name: &str,
    layers: &[Vec<Line>],
    comm: Option<&mut dyn Communicator>,
) -> Result<ShapeGraph, AxialError> {
    let mut graph = graph_from_drawing(name, GraphKind::Segment, layers, comm)?;
    graph.make_new_seg_map();
    log::info!("converted drawing to segment map '{name}' with {} segments", graph.line_count());
    Ok(graph)
}

/// Axial map from a data map. Polylines and polygons contribute each edge.
pub fn convert_data_to_axial(
    name: &str,
    source: &ShapeMap,
    copydata: bool,
    comm: Option<&mut dyn Communicator>,
) -> Result<ShapeGraph, AxialError> {
    let mut graph = graph_from_data(name, GraphKind::Axial, source, copydata, comm)?;
    graph.make_connections(Vec::new());
    log::info!(
        "converted data map '{}' to axial map '{name}' with {} lines",
        source.name(),
        graph.line_count()
    );
    Ok(graph)
}

/// Segment map from a data map, joining lines at shared endpoints.
pub fn convert_data_to_segment(
    name: &str,
    source: &ShapeMap,
    copydata: bool,
    comm: Option<&mut dyn Communicator>,
) -> Result<ShapeGraph, AxialError> {
    let mut graph = graph_from_data(name, GraphKind::Segment, source, copydata, comm)?;
    graph.make_new_seg_map();
    log::info!(
        "converted data map '{}' to segment map '{name}' with {} segments",
        source.name(),
        graph.line_count()
    );
    Ok(graph)
}

/// Segment map from an axial map, cutting each line at its crossings.
///
/// With `copydata` every axial attribute is copied onto the segments as
/// an "Axial {name}" column.
pub fn convert_axial_to_segment(
    axial: &ShapeGraph,
    name: &str,
    copydata: bool,
    opts: &SegmentOptions,
) -> Result<ShapeGraph, AxialError> {
    opts.validate()?;
    require_segment_lines(axial.line_count())?;
    let (lines, connectors) = axial.segment_lines(opts);

    let mut graph = ShapeGraph::with_region(name, GraphKind::Segment, lines.len(), &axial.map().region());
    graph.init_segment_attributes();
    for l in lines {
        graph.map_mut().make_line_shape(l);
    }
    graph.make_segment_connections(connectors);
    if copydata {
        graph.push_axial_values(axial)?;
    }
    log::info!(
        "converted axial map '{}' to segment map '{name}' with {} segments",
        axial.name(),
        graph.line_count()
    );
    Ok(graph)
}
