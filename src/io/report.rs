//! Per-facet flux report.
//!
//! Tab-separated table with one row per facet: the canopy columns, the
//! facet area, then `up_dir up_dff up_scat down_dir down_dff down_scat`
//! for every simulated hour. Flux values are divided by the facet area.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use crate::canopy::Facet;
use crate::canopy::flux::CHANNEL_NAMES;

use super::canopy::Layout;

/// Column names of a report for the given hours.
pub fn report_header(layout: Layout, hours: &[f64]) -> Vec<String> {
    let mut header: Vec<String> = layout
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();
    header.push("area".to_string());
    for hour in hours {
        for name in CHANNEL_NAMES {
            header.push(format!("{name}_{hour}"));
        }
    }
    header
}

/// One report row: canopy columns, area and per-area flux of every hour slot.
pub fn flux_row(facet: &Facet, layout: Layout, num_hours: usize) -> Vec<f64> {
    let leaf = &facet.attributes;
    let mut row: Vec<f64> = facet.vertices.iter().flat_map(|p| p.to_array()).collect();
    row.extend([leaf.leaf_id as f64, leaf.leaf_length, leaf.position as f64]);
    if layout == Layout::Field {
        row.push(leaf.column_id.unwrap_or(0) as f64);
        row.push(leaf.row_id.unwrap_or(0) as f64);
    }
    row.extend([
        leaf.chlorophyll,
        leaf.transmittance,
        leaf.reflectance,
        leaf.nitrogen_per_area,
    ]);

    let area = facet.area();
    row.push(area);
    for hour in 0..num_hours {
        let channels = facet.flux.hour(hour);
        row.extend(
            channels
                .iter()
                .map(|&flux| if area > 0.0 { flux / area } else { 0.0 }),
        );
    }
    row
}

/// Writes the flux report of `facets`. `hours` labels the hour slots in order.
pub fn write_flux_report(
    path: &Path,
    facets: &[Facet],
    hours: &[f64],
    layout: Layout,
) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create report file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "{}", report_header(layout, hours).join("\t"))?;
    for facet in facets {
        let row = flux_row(facet, layout, hours.len());
        let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        writeln!(writer, "{}", line.join("\t"))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write report file: {}", path.display()))?;

    info!(
        "Wrote flux report for {} facets to {}",
        facets.len(),
        path.display()
    );
    Ok(())
}
