//! Project and schematic files written alongside a new board.
//!
//! Both are emitted once by `create_project` and never read back.

use serde_json::{json, Value};
use uuid::Uuid;

use crate::parser::sexp::{format_sexp, SExp};

/// Schematic format version written into new schematics (KiCad 7).
pub const SCHEMATIC_VERSION: &str = "20230121";

/// Contents of `<name>.kicad_pro`.
pub fn project_file() -> Value {
    json!({
        "board": {
            "design_settings": {
                "defaults": {
                    "board_outline_line_width": 0.1,
                    "copper_line_width": 0.2
                }
            }
        },
        "schematic": {
            "drawing": {
                "default_line_thickness": 6.0,
                "default_text_size": 50.0
            }
        },
        "meta": {
            "version": 1
        }
    })
}

/// Serialized `<name>.kicad_pro` text.
pub fn project_file_text() -> Result<String, serde_json::Error> {
    let mut text = serde_json::to_string_pretty(&project_file())?;
    text.push('\n');
    Ok(text)
}

/// An empty schematic sheet.
pub fn empty_schematic(paper: &str) -> SExp {
    SExp::list(vec![
        SExp::atom("kicad_sch"),
        SExp::list(vec![SExp::atom("version"), SExp::atom(SCHEMATIC_VERSION)]),
        SExp::list(vec![SExp::atom("generator"), SExp::atom("kiplace")]),
        SExp::list(vec![SExp::atom("uuid"), SExp::string(Uuid::new_v4().to_string())]),
        SExp::list(vec![SExp::atom("paper"), SExp::string(paper)]),
        SExp::list(vec![SExp::atom("lib_symbols")]),
        SExp::list(vec![
            SExp::atom("sheet_instances"),
            SExp::list(vec![
                SExp::atom("path"),
                SExp::string("/"),
                SExp::list(vec![SExp::atom("page"), SExp::string("1")]),
            ]),
        ]),
    ])
}

/// Serialized `<name>.kicad_sch` text.
pub fn empty_schematic_text(paper: &str) -> String {
    let mut text = format_sexp(&empty_schematic(paper), 0);
    text.push('\n');
    text
}
