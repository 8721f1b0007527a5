//! Single-hour entry point for host crop models.
//!
//! Takes the weather of one hour and a canopy, runs the tracer and returns
//! the per-facet report as a matrix sorted from the top of the canopy down,
//! with a cumulative leaf area index column.

use std::cmp::Ordering;
use std::path::Path;

use anyhow::Result;

use crate::io::canopy::{CanopyFormat, canopy_from_matrix, read_canopy_or_empty};
use crate::io::report::{flux_row, report_header};
use crate::sim::lighting::{
    CanopySimulation, LightPlane, RunSummary, SolarClimate, TracerConfig,
};

/// Where the canopy rows come from.
#[derive(Debug, Clone, Copy)]
pub enum CanopySource<'a> {
    File(&'a Path),
    Matrix(&'a [Vec<f64>]),
}

/// Inputs of one embedded run.
#[derive(Debug, Clone)]
pub struct EmbeddedRequest<'a> {
    /// Degrees, positive north.
    pub latitude: f64,
    pub day_of_year: u16,
    /// Local solar hour.
    pub hour: f64,
    pub direct: f64,
    pub diffuse: f64,
    pub light_plane: LightPlane,
    pub source: CanopySource<'a>,
    pub format: CanopyFormat,
    /// Tracer settings. Its light plane is replaced by `light_plane`.
    pub tracer: TracerConfig,
}

/// Report matrix of an embedded run.
#[derive(Debug, Clone)]
pub struct EmbeddedOutput {
    pub header: Vec<String>,
    /// One row per facet, highest mean height first.
    pub rows: Vec<Vec<f64>>,
    pub summary: RunSummary,
}

/// Runs one hour and returns the report matrix.
///
/// An unreadable canopy file is logged and gives an empty matrix.
pub fn run_embedded(request: &EmbeddedRequest) -> Result<EmbeddedOutput> {
    let facets = match request.source {
        CanopySource::File(path) => read_canopy_or_empty(path, &request.format),
        CanopySource::Matrix(rows) => canopy_from_matrix(rows, &request.format),
    };

    let config = TracerConfig {
        light_plane: request.light_plane,
        ..request.tracer.clone()
    };
    let ground_area = config.light_plane.width() * config.light_plane.depth();
    let climate = SolarClimate::new(request.latitude, request.day_of_year).with_hour(
        request.hour,
        request.direct,
        request.diffuse,
    );

    let mut simulation = CanopySimulation::new(facets, config)?;
    let summary = simulation.run(&climate);
    let mut facets = simulation.into_facets();

    facets.sort_by(|a, b| {
        b.mean_height()
            .partial_cmp(&a.mean_height())
            .unwrap_or(Ordering::Equal)
    });

    let layout = request.format.layout;
    let mut header = report_header(layout, &[request.hour]);
    header.push("cumulative_lai".to_string());

    let mut leaf_area = 0.0;
    let rows = facets
        .iter()
        .map(|facet| {
            leaf_area += facet.area();
            let mut row = flux_row(facet, layout, 1);
            row.push(leaf_area / ground_area);
            row
        })
        .collect();

    Ok(EmbeddedOutput {
        header,
        rows,
        summary,
    })
}
