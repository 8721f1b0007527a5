//! Canopy description I/O.
//!
//! A canopy is a table with one row per facet: nine vertex coordinates
//! (x, y, z of each of the three vertices) followed by leaf attributes.
//! Values are separated by whitespace, commas or tabs. Blank lines, lines
//! starting with `#` and a non-numeric header line are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result, bail};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::Point;
use crate::canopy::{Facet, LeafAttributes};

/// Column layout of a canopy row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Coordinates, leaf id, leaf length, position, chlorophyll,
    /// transmittance, reflectance, nitrogen per area.
    #[default]
    Basic,
    /// As `Basic` with column id and row id after the position.
    Field,
}

impl Layout {
    pub fn num_columns(self) -> usize {
        match self {
            Layout::Basic => 16,
            Layout::Field => 18,
        }
    }

    /// Names of every column, in row order.
    pub fn column_names(self) -> Vec<&'static str> {
        let mut names = vec![
            "x1", "y1", "z1", "x2", "y2", "z2", "x3", "y3", "z3", "leaf_id", "leaf_length",
            "position",
        ];
        if self == Layout::Field {
            names.extend(["column_id", "row_id"]);
        }
        names.extend([
            "chlorophyll",
            "transmittance",
            "reflectance",
            "nitrogen_per_area",
        ]);
        names
    }
}

/// Where leaf reflectance and transmittance come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum OpticsSource {
    #[default]
    FromRow,
    /// Same optics for every leaf, row values are ignored.
    Override {
        reflectance: f64,
        transmittance: f64,
    },
}

/// How canopy rows are interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanopyFormat {
    pub layout: Layout,
    pub optics: OpticsSource,
}

impl CanopyFormat {
    /// Format of a numbered canopy model.
    ///
    /// 1: basic rows with their own optics, 2: field rows with their own
    /// optics, 3: field rows with the given optics.
    pub fn from_model_type(model: u8, reflectance: f64, transmittance: f64) -> Result<Self> {
        let format = match model {
            1 => Self {
                layout: Layout::Basic,
                optics: OpticsSource::FromRow,
            },
            2 => Self {
                layout: Layout::Field,
                optics: OpticsSource::FromRow,
            },
            3 => Self {
                layout: Layout::Field,
                optics: OpticsSource::Override {
                    reflectance,
                    transmittance,
                },
            },
            _ => bail!("Unknown canopy model type {model}, expected 1, 2 or 3"),
        };
        Ok(format)
    }

    /// Builds a facet from one row of values.
    ///
    /// Returns None when the row is too short or holds a non-finite value.
    pub fn facet_from_row(&self, values: &[f64]) -> Option<Facet> {
        let num_columns = self.layout.num_columns();
        if values.len() < num_columns || values[..num_columns].iter().any(|v| !v.is_finite()) {
            return None;
        }
        let vertices = [
            Point::new(values[0], values[1], values[2]),
            Point::new(values[3], values[4], values[5]),
            Point::new(values[6], values[7], values[8]),
        ];
        let (column_id, row_id, rest) = match self.layout {
            Layout::Basic => (None, None, &values[12..]),
            Layout::Field => (
                Some(values[12] as i64),
                Some(values[13] as i64),
                &values[14..],
            ),
        };
        let (reflectance, transmittance) = match self.optics {
            OpticsSource::FromRow => (rest[2], rest[1]),
            OpticsSource::Override {
                reflectance,
                transmittance,
            } => (reflectance, transmittance),
        };
        let attributes = LeafAttributes {
            leaf_id: values[9] as i64,
            leaf_length: values[10],
            position: values[11] as i64,
            column_id,
            row_id,
            chlorophyll: rest[0],
            nitrogen_per_area: rest[3],
            reflectance,
            transmittance,
        };
        Some(Facet::new(vertices, attributes))
    }
}

/// Splits a line into numeric fields.
fn parse_fields(line: &str) -> Result<Vec<f64>, std::num::ParseFloatError> {
    line.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

/// Reads canopy rows from any buffered reader.
///
/// Malformed rows are skipped with a warning.
pub fn parse_canopy<R: BufRead>(reader: R, format: &CanopyFormat) -> Result<Vec<Facet>> {
    let mut facets = Vec::new();
    let mut skipped = 0;
    let mut seen_data = false;

    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read canopy line {}", idx + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let values = match parse_fields(trimmed) {
            Ok(values) => values,
            Err(_) if !seen_data => {
                // Header line
                seen_data = true;
                continue;
            }
            Err(err) => {
                warn!("Canopy line {}: skipped, {err}", idx + 1);
                skipped += 1;
                continue;
            }
        };
        seen_data = true;
        match format.facet_from_row(&values) {
            Some(facet) => facets.push(facet),
            None => {
                warn!(
                    "Canopy line {}: skipped, expected {} finite values, found {}",
                    idx + 1,
                    format.layout.num_columns(),
                    values.len()
                );
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!("{skipped} malformed canopy row(s) skipped");
    }
    Ok(facets)
}

/// Reads a canopy file.
pub fn read_canopy(path: &Path, format: &CanopyFormat) -> Result<Vec<Facet>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open canopy file: {}", path.display()))?;
    let facets = parse_canopy(BufReader::new(file), format)
        .with_context(|| format!("Failed to read canopy file: {}", path.display()))?;
    info!("Loaded {} facets from {}", facets.len(), path.display());
    Ok(facets)
}

/// Reads a canopy file, logging an error and returning no facets on failure.
pub fn read_canopy_or_empty(path: &Path, format: &CanopyFormat) -> Vec<Facet> {
    match read_canopy(path, format) {
        Ok(facets) => facets,
        Err(err) => {
            error!("Unable to open canopy file: {err:#}");
            Vec::new()
        }
    }
}

/// Builds facets from in-memory rows. Malformed rows are skipped with a warning.
pub fn canopy_from_matrix<R: AsRef<[f64]>>(rows: &[R], format: &CanopyFormat) -> Vec<Facet> {
    let facets: Vec<Facet> = rows
        .iter()
        .enumerate()
        .filter_map(|(idx, row)| {
            let facet = format.facet_from_row(row.as_ref());
            if facet.is_none() {
                warn!("Canopy matrix row {idx}: skipped");
            }
            facet
        })
        .collect();
    info!("Built {} facets from {} matrix rows", facets.len(), rows.len());
    facets
}
