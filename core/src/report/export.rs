use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

use crate::prelude::{StageError, StageResult};
use crate::report::publish::publish_atomically;
use crate::table::DetectionTable;

pub const EXPORT_HEADER: [&str; 7] = [
    "Frame",
    "Damage Type",
    "Confidence",
    "Width",
    "Height",
    "Bbox",
    "Severity",
];

/// One row of the delimited table export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    #[serde(rename = "Frame")]
    pub frame: usize,
    #[serde(rename = "Damage Type")]
    pub damage_type: String,
    #[serde(rename = "Confidence")]
    pub confidence: f64,
    #[serde(rename = "Width")]
    pub width: u32,
    #[serde(rename = "Height")]
    pub height: u32,
    /// `(x1, y1, x2, y2)`
    #[serde(rename = "Bbox")]
    pub bbox: String,
    #[serde(rename = "Severity")]
    pub severity: Option<String>,
}

pub fn export_rows(table: &DetectionTable) -> Vec<ExportRow> {
    table
        .iter()
        .map(|record| ExportRow {
            frame: record.frame_index(),
            damage_type: record.class_label().to_string(),
            confidence: record.confidence(),
            width: record.width(),
            height: record.height(),
            bbox: record.bbox().to_string(),
            severity: record.severity().map(|tier| tier.to_string()),
        })
        .collect()
}

/// Writes the table as CSV. The header is written even for an empty table.
pub fn write_table_export(table: &DetectionTable, dest: &Path) -> StageResult<()> {
    publish_atomically(dest, |file| {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record(EXPORT_HEADER).map_err(export_error)?;
        for row in export_rows(table) {
            writer.serialize(row).map_err(export_error)?;
        }
        writer.flush()?;
        Ok(())
    })
}

pub fn read_table_export(path: &Path) -> StageResult<Vec<ExportRow>> {
    if !path.exists() {
        return Err(StageError::MissingArtifact(path.to_path_buf()));
    }
    let mut reader = csv::Reader::from_reader(File::open(path)?);
    reader
        .deserialize()
        .collect::<Result<Vec<ExportRow>, _>>()
        .map_err(export_error)
}

fn export_error(err: csv::Error) -> StageError {
    StageError::Export(err.to_string())
}
