//! Bill of materials.
//!
//! Footprints with the same value and library footprint are one BOM line.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::core::KiplaceError;
use crate::parser::pcb_schema::BoardDocument;
use crate::refdes::natural_cmp;

pub const UNKNOWN_REFERENCE: &str = "?";
pub const UNKNOWN_FOOTPRINT: &str = "unknown";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BomLine {
    /// Reference designators in natural order (`R2` before `R10`).
    pub references: Vec<String>,
    pub value: String,
    pub footprint: String,
    pub quantity: usize,
}

#[derive(Serialize)]
struct BomRecord<'a> {
    #[serde(rename = "References")]
    references: String,
    #[serde(rename = "Value")]
    value: &'a str,
    #[serde(rename = "Footprint")]
    footprint: &'a str,
    #[serde(rename = "Quantity")]
    quantity: usize,
}

/// Groups the board's footprints into BOM lines, ordered by first reference.
pub fn build_bom(board: &BoardDocument) -> Vec<BomLine> {
    let mut groups: BTreeMap<(String, String), Vec<String>> = BTreeMap::new();

    for fp in board.footprints() {
        let key = (
            fp.value().unwrap_or_default().to_string(),
            fp.library_ref
                .clone()
                .unwrap_or_else(|| UNKNOWN_FOOTPRINT.to_string()),
        );
        let reference = fp.reference().unwrap_or(UNKNOWN_REFERENCE).to_string();
        groups.entry(key).or_default().push(reference);
    }

    let mut lines: Vec<BomLine> = groups
        .into_iter()
        .map(|((value, footprint), mut references)| {
            references.sort_by(|a, b| natural_cmp(a, b));
            BomLine {
                quantity: references.len(),
                references,
                value,
                footprint,
            }
        })
        .collect();

    lines.sort_by(|a, b| {
        let first_a = a.references.first().map(String::as_str).unwrap_or_default();
        let first_b = b.references.first().map(String::as_str).unwrap_or_default();
        natural_cmp(first_a, first_b)
    });
    lines
}

/// Writes BOM lines as CSV with a `References,Value,Footprint,Quantity` header.
pub fn write_csv(lines: &[BomLine], path: &Path) -> Result<(), KiplaceError> {
    let mut writer = csv::Writer::from_path(path)?;
    write_records(&mut writer, lines)?;
    writer.flush()?;
    Ok(())
}

/// CSV text for BOM lines.
pub fn to_csv_string(lines: &[BomLine]) -> Result<String, KiplaceError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    write_records(&mut writer, lines)?;
    let bytes = writer
        .into_inner()
        .map_err(|e| KiplaceError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| KiplaceError::Other(e.to_string()))
}

fn write_records<W: std::io::Write>(
    writer: &mut csv::Writer<W>,
    lines: &[BomLine],
) -> Result<(), KiplaceError> {
    if lines.is_empty() {
        writer.write_record(["References", "Value", "Footprint", "Quantity"])?;
    }
    for line in lines {
        writer.serialize(BomRecord {
            references: line.references.join(" "),
            value: &line.value,
            footprint: &line.footprint,
            quantity: line.quantity,
        })?;
    }
    Ok(())
}
