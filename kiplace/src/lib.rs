//! kiplace - KiCad project creation and component placement library
//!
//! This library reads and writes KiCad board files (.kicad_pcb), places
//! footprints with automatically allocated reference designators, and lists
//! the components already on a board. Everything in a board file that is not
//! a footprint is carried through unchanged.
//!
//! # Quick Start
//!
//! ```no_run
//! use kiplace::{ComponentRequest, KiplaceCore, PlacementOptions, ProjectRequest};
//!
//! let options = PlacementOptions::default();
//! let project = KiplaceCore::create_project(&ProjectRequest::new("demo", "/tmp/demo"), &options);
//! let pcb = project.files.unwrap().pcb;
//!
//! let added = KiplaceCore::add_component(
//!     std::path::Path::new(&pcb),
//!     &ComponentRequest::new("10k", "Resistor_SMD:R_0603_1608Metric", 10.0, 20.0),
//!     &options,
//! );
//! println!("{}", added.message.unwrap_or_default());
//! ```
//!
//! # Features
//!
//! - **Lossless codec**: unmodified boards re-encode byte for byte
//! - **KiCad 5 to 8**: `module`/`footprint` keywords, `fp_text`/`property` labels
//! - **Placement**: reference designators, labels on the matching side's layers
//! - **BOM**: grouped CSV export

pub mod bom;
pub mod config;
pub mod core;
pub mod parser;
pub mod project;
pub mod refdes;

// Re-export main types
pub use crate::core::{
    default_bom_path, load_board, BomResult, ComponentInfo, ComponentPosition, ComponentRequest,
    ComponentResult, ComponentsResult, KiplaceCore, KiplaceError, PlacementOptions,
    ProjectFiles, ProjectRequest, ProjectResult,
};
pub use config::{load_settings, Settings};
pub use parser::pcb::PcbCodec;
pub use parser::pcb_schema::{BoardDocument, Footprint, GraphicTextItem, Position, Side};

/// Parse a PCB file (convenience wrapper).
pub fn parse_pcb(path: &std::path::Path) -> Result<BoardDocument, KiplaceError> {
    load_board(path)
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        BoardDocument, ComponentRequest, Footprint, KiplaceCore, KiplaceError, PcbCodec,
        PlacementOptions, Position, ProjectRequest, Side,
    };
}
