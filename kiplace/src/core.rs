//! Placement service shared by the CLI and library users.
//!
//! Every operation loads the board, changes or queries it, and writes it
//! back. Public operations never fail: errors are reported in the returned
//! result with `success: false`. The `try_*` variants return the error
//! instead.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bom::{self, BomLine, UNKNOWN_FOOTPRINT, UNKNOWN_REFERENCE};
use crate::config::Settings;
use crate::parser::pcb::{
    board_outline, default_setup, layer_table, paper_section, PcbCodec, PcbParseError,
    PROPERTY_LABELS_VERSION,
};
use crate::parser::pcb_schema::{
    BoardDocument, Footprint, FootprintItem, GraphicTextItem, Position, Side, TextForm, TextKind,
    UnknownSide,
};
use crate::parser::sexp::SExp;
use crate::project;
use crate::refdes::next_designator;

#[derive(Debug, thiserror::Error)]
pub enum KiplaceError {
    #[error("Usage error: {0}")]
    Usage(String),
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Component not found: {0}")]
    ComponentNotFound(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Other(String),
}

impl From<PcbParseError> for KiplaceError {
    fn from(e: PcbParseError) -> Self {
        match e {
            PcbParseError::Io(e) => KiplaceError::Io(e),
            other => KiplaceError::Parse(other.to_string()),
        }
    }
}

const MAX_LAYERS: u32 = 32;
const OUTLINE_LINE_WIDTH: f64 = 0.1;

/// Options for placement runs, derived from [`Settings`].
#[derive(Clone, Debug, PartialEq)]
pub struct PlacementOptions {
    /// Board thickness written into new boards, in mm.
    pub thickness: f64,
    pub paper: String,
    /// Distance of the reference (above) and value (below) labels from the
    /// footprint origin.
    pub label_offset: f64,
    pub text_size: f64,
    pub text_thickness: f64,
}

impl Default for PlacementOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for PlacementOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            thickness: settings.board.thickness,
            paper: settings.board.paper.clone(),
            label_offset: settings.labels.offset,
            text_size: settings.labels.text_size,
            text_thickness: settings.labels.text_thickness,
        }
    }
}

/// Parameters of `create_project`.
#[derive(Clone, Debug)]
pub struct ProjectRequest {
    pub name: String,
    /// Directory the project files are written to; created if missing.
    pub path: PathBuf,
    pub layers: u32,
    /// Board outline in mm.
    pub width: f64,
    pub height: f64,
}

impl ProjectRequest {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            layers: 2,
            width: 100.0,
            height: 80.0,
        }
    }

    fn validate(&self) -> Result<(), KiplaceError> {
        if self.name.trim().is_empty() {
            return Err(KiplaceError::Validation("project name must not be empty".to_string()));
        }
        if self.name.contains(['/', '\\']) {
            return Err(KiplaceError::Validation(format!(
                "project name '{}' must not contain path separators",
                self.name
            )));
        }
        if !(1..=MAX_LAYERS).contains(&self.layers) {
            return Err(KiplaceError::Validation(format!(
                "layer count must be between 1 and {}, got {}",
                MAX_LAYERS, self.layers
            )));
        }
        for (label, value) in [("width", self.width), ("height", self.height)] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(KiplaceError::Validation(format!(
                    "board {} must be a positive number, got {}",
                    label, value
                )));
            }
        }
        Ok(())
    }
}

/// Parameters of `add_component`.
#[derive(Clone, Debug)]
pub struct ComponentRequest {
    pub value: String,
    /// Library footprint, e.g. `Resistor_SMD:R_0603_1608Metric`.
    pub footprint: String,
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
    /// `front` or `back`.
    pub layer: String,
}

impl ComponentRequest {
    pub fn new(value: impl Into<String>, footprint: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            value: value.into(),
            footprint: footprint.into(),
            x,
            y,
            rotation: 0.0,
            layer: Side::Front.label().to_string(),
        }
    }

    pub fn rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = layer.into();
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct ComponentPosition {
    pub x: f64,
    pub y: f64,
}

/// A placed component as reported to callers.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ComponentInfo {
    pub reference: String,
    pub value: String,
    pub footprint: String,
    pub position: ComponentPosition,
    pub rotation: f64,
    /// `front` or `back`.
    pub layer: Side,
}

impl From<&Footprint> for ComponentInfo {
    fn from(fp: &Footprint) -> Self {
        Self {
            reference: fp.reference().unwrap_or(UNKNOWN_REFERENCE).to_string(),
            value: fp.value().unwrap_or_default().to_string(),
            footprint: fp
                .library_ref
                .clone()
                .unwrap_or_else(|| UNKNOWN_FOOTPRINT.to_string()),
            position: ComponentPosition {
                x: fp.position.x,
                y: fp.position.y,
            },
            rotation: fp.position.angle,
            layer: fp.side,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProjectFiles {
    pub project: String,
    pub schematic: String,
    pub pcb: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<ProjectFiles>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<ComponentInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentsResult {
    pub success: bool,
    pub components: Vec<ComponentInfo>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BomResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<Vec<BomLine>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Paths written by `create_project`.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedProject {
    pub project_path: PathBuf,
    pub project_file: PathBuf,
    pub schematic_file: PathBuf,
    pub pcb_file: PathBuf,
}

/// Read a board, reporting a missing file as [`KiplaceError::NotFound`].
pub fn load_board(path: &Path) -> Result<BoardDocument, KiplaceError> {
    match PcbCodec::decode_file(path) {
        Ok(board) => Ok(board),
        Err(PcbParseError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(KiplaceError::NotFound(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

fn save_board(board: &BoardDocument, path: &Path) -> Result<(), KiplaceError> {
    PcbCodec::write_file(board, path)?;
    debug!(path = %path.display(), "board written");
    Ok(())
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

/// Core placement API used by the CLI.
pub struct KiplaceCore;

impl KiplaceCore {
    /// Create `<name>.kicad_pro`, `<name>.kicad_sch` and `<name>.kicad_pcb`
    /// in the request's directory.
    pub fn create_project(request: &ProjectRequest, options: &PlacementOptions) -> ProjectResult {
        match Self::try_create_project(request, options) {
            Ok(created) => ProjectResult {
                success: true,
                project_path: Some(display(&created.project_path)),
                files: Some(ProjectFiles {
                    project: display(&created.project_file),
                    schematic: display(&created.schematic_file),
                    pcb: display(&created.pcb_file),
                }),
                message: Some(format!("Project '{}' created successfully", request.name)),
                error: None,
            },
            Err(e) => {
                warn!(name = %request.name, error = %e, "create_project failed");
                ProjectResult {
                    success: false,
                    project_path: None,
                    files: None,
                    message: Some(format!("Failed to create project: {}", e)),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    pub fn try_create_project(
        request: &ProjectRequest,
        options: &PlacementOptions,
    ) -> Result<CreatedProject, KiplaceError> {
        request.validate()?;

        let dir = &request.path;
        std::fs::create_dir_all(dir)?;

        let created = CreatedProject {
            project_path: dir.join(&request.name),
            project_file: dir.join(format!("{}.kicad_pro", request.name)),
            schematic_file: dir.join(format!("{}.kicad_sch", request.name)),
            pcb_file: dir.join(format!("{}.kicad_pcb", request.name)),
        };

        std::fs::write(&created.project_file, project::project_file_text()?)?;
        std::fs::write(
            &created.schematic_file,
            project::empty_schematic_text(&options.paper),
        )?;

        let board = Self::new_board(request, options);
        save_board(&board, &created.pcb_file)?;

        info!(
            name = %request.name,
            layers = request.layers,
            width = request.width,
            height = request.height,
            "project created"
        );
        Ok(created)
    }

    fn new_board(request: &ProjectRequest, options: &PlacementOptions) -> BoardDocument {
        let mut board = PcbCodec::create_template();
        board.set_thickness(options.thickness);
        board.replace_section(paper_section(&options.paper));
        board.replace_section(layer_table(request.layers));
        board.ensure_section(default_setup());
        board.push_node(board_outline(request.width, request.height, OUTLINE_LINE_WIDTH));
        board
    }

    /// Place a new footprint with an allocated reference designator.
    pub fn add_component(
        pcb_path: &Path,
        request: &ComponentRequest,
        options: &PlacementOptions,
    ) -> ComponentResult {
        match Self::try_add_component(pcb_path, request, options) {
            Ok(component) => ComponentResult {
                success: true,
                message: Some(format!("Added component {} to PCB", component.reference)),
                component: Some(component),
                error: None,
            },
            Err(e) => {
                warn!(path = %pcb_path.display(), error = %e, "add_component failed");
                ComponentResult {
                    success: false,
                    component: None,
                    message: Some(format!("Failed to add component: {}", e)),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    pub fn try_add_component(
        pcb_path: &Path,
        request: &ComponentRequest,
        options: &PlacementOptions,
    ) -> Result<ComponentInfo, KiplaceError> {
        let side: Side = request
            .layer
            .parse()
            .map_err(|e: UnknownSide| KiplaceError::Validation(e.to_string()))?;
        for (label, value) in [("x", request.x), ("y", request.y), ("rotation", request.rotation)] {
            if !value.is_finite() {
                return Err(KiplaceError::Validation(format!(
                    "{} must be a finite number, got {}",
                    label, value
                )));
            }
        }

        let mut board = load_board(pcb_path)?;
        let reference = next_designator(&request.value, &board.reference_designators());
        let form = match board.version() {
            Some(version) if version >= PROPERTY_LABELS_VERSION => TextForm::Property,
            _ => TextForm::FpText,
        };

        let footprint = Self::build_footprint(request, side, &reference, form, options);
        let component = ComponentInfo::from(&footprint);
        board.push_footprint(footprint);
        save_board(&board, pcb_path)?;

        info!(
            reference = %component.reference,
            footprint = %component.footprint,
            side = %side,
            "component added"
        );
        Ok(component)
    }

    fn build_footprint(
        request: &ComponentRequest,
        side: Side,
        reference: &str,
        form: TextForm,
        options: &PlacementOptions,
    ) -> Footprint {
        let position = Position::with_angle(request.x, request.y, request.rotation);
        let mut footprint = Footprint::new(request.footprint.clone(), position, side);

        let id = Uuid::new_v4().to_string();
        let id_node = match form {
            TextForm::Property => SExp::list(vec![SExp::atom("uuid"), SExp::string(id)]),
            TextForm::FpText => SExp::list(vec![SExp::atom("tstamp"), SExp::atom(id)]),
        };
        footprint.items.push(FootprintItem::Other(id_node));
        // layer, id, then at
        footprint.slots.at = Some(2);

        let effects = SExp::list(vec![
            SExp::atom("effects"),
            SExp::list(vec![
                SExp::atom("font"),
                SExp::list(vec![
                    SExp::atom("size"),
                    SExp::number(options.text_size),
                    SExp::number(options.text_size),
                ]),
                SExp::list(vec![
                    SExp::atom("thickness"),
                    SExp::number(options.text_thickness),
                ]),
            ]),
        ]);

        footprint.push_text(
            GraphicTextItem::new(
                TextKind::Reference,
                reference,
                Position::new(0.0, -options.label_offset),
                side.silkscreen_layer(),
            )
            .with_form(form)
            .with_extra(effects.clone()),
        );
        footprint.push_text(
            GraphicTextItem::new(
                TextKind::Value,
                request.value.clone(),
                Position::new(0.0, options.label_offset),
                side.fabrication_layer(),
            )
            .with_form(form)
            .with_extra(effects),
        );
        footprint
    }

    /// List every footprint on the board. Never writes the file.
    pub fn get_components(pcb_path: &Path) -> ComponentsResult {
        match Self::try_get_components(pcb_path) {
            Ok(components) => ComponentsResult {
                success: true,
                count: components.len(),
                components,
                error: None,
            },
            Err(e) => {
                warn!(path = %pcb_path.display(), error = %e, "get_components failed");
                ComponentsResult {
                    success: false,
                    components: Vec::new(),
                    count: 0,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    pub fn try_get_components(pcb_path: &Path) -> Result<Vec<ComponentInfo>, KiplaceError> {
        let board = load_board(pcb_path)?;
        let components: Vec<ComponentInfo> =
            board.footprints().map(ComponentInfo::from).collect();
        debug!(count = components.len(), "components listed");
        Ok(components)
    }

    /// Remove the first footprint whose reference designator is `reference`.
    pub fn remove_component(pcb_path: &Path, reference: &str) -> ComponentResult {
        match Self::try_remove_component(pcb_path, reference) {
            Ok(component) => ComponentResult {
                success: true,
                message: Some(format!("Removed component {} from PCB", component.reference)),
                component: Some(component),
                error: None,
            },
            Err(e) => {
                warn!(path = %pcb_path.display(), reference, error = %e, "remove_component failed");
                ComponentResult {
                    success: false,
                    component: None,
                    message: Some(format!("Failed to remove component: {}", e)),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    pub fn try_remove_component(
        pcb_path: &Path,
        reference: &str,
    ) -> Result<ComponentInfo, KiplaceError> {
        let mut board = load_board(pcb_path)?;
        let index = board
            .footprints()
            .position(|fp| fp.reference() == Some(reference))
            .ok_or_else(|| KiplaceError::ComponentNotFound(reference.to_string()))?;

        let removed = board
            .remove_footprint(index)
            .ok_or_else(|| KiplaceError::ComponentNotFound(reference.to_string()))?;
        save_board(&board, pcb_path)?;

        info!(reference, "component removed");
        Ok(ComponentInfo::from(&removed))
    }

    /// Write a CSV bill of materials. `output` defaults to
    /// `<board stem>-bom.csv` next to the board.
    pub fn bom(pcb_path: &Path, output: Option<&Path>) -> BomResult {
        match Self::try_bom(pcb_path, output) {
            Ok((output, lines)) => BomResult {
                success: true,
                message: Some(format!(
                    "BOM with {} lines written to {}",
                    lines.len(),
                    output.display()
                )),
                output: Some(display(&output)),
                lines: Some(lines),
                error: None,
            },
            Err(e) => {
                warn!(path = %pcb_path.display(), error = %e, "bom failed");
                BomResult {
                    success: false,
                    output: None,
                    lines: None,
                    message: Some(format!("Failed to generate BOM: {}", e)),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    pub fn try_bom(
        pcb_path: &Path,
        output: Option<&Path>,
    ) -> Result<(PathBuf, Vec<BomLine>), KiplaceError> {
        let board = load_board(pcb_path)?;
        let lines = bom::build_bom(&board);
        let output = match output {
            Some(path) => path.to_path_buf(),
            None => default_bom_path(pcb_path),
        };

        bom::write_csv(&lines, &output)?;
        info!(lines = lines.len(), output = %output.display(), "bom written");
        Ok((output, lines))
    }
}

/// `<dir>/<stem>-bom.csv` for a board at `<dir>/<stem>.kicad_pcb`.
pub fn default_bom_path(pcb_path: &Path) -> PathBuf {
    let stem = pcb_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "board".to_string());
    pcb_path.with_file_name(format!("{}-bom.csv", stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn new_project(dir: &TempDir) -> PathBuf {
        let request = ProjectRequest::new("demo", dir.path());
        let created = KiplaceCore::try_create_project(&request, &PlacementOptions::default()).unwrap();
        created.pcb_file
    }

    #[test]
    fn test_create_project_writes_three_files() {
        let dir = TempDir::new().unwrap();
        let result = KiplaceCore::create_project(
            &ProjectRequest::new("demo", dir.path().join("nested/proj")),
            &PlacementOptions::default(),
        );

        assert!(result.success, "{:?}", result.error);
        let files = result.files.unwrap();
        assert!(Path::new(&files.project).exists());
        assert!(Path::new(&files.schematic).exists());
        assert!(Path::new(&files.pcb).exists());
        assert_eq!(result.message.as_deref(), Some("Project 'demo' created successfully"));

        let board = load_board(Path::new(&files.pcb)).unwrap();
        assert_eq!(board.footprint_count(), 0);
        assert_eq!(board.thickness(), Some(1.6));
        assert!(board.section("setup").is_some());
        assert!(board.section("gr_rect").is_some());
    }

    #[test]
    fn test_create_project_in_existing_dir() {
        let dir = TempDir::new().unwrap();
        new_project(&dir);
        let again = KiplaceCore::create_project(
            &ProjectRequest::new("other", dir.path()),
            &PlacementOptions::default(),
        );
        assert!(again.success);
    }

    #[test]
    fn test_create_project_applies_layers_and_outline() {
        let dir = TempDir::new().unwrap();
        let mut request = ProjectRequest::new("four", dir.path());
        request.layers = 4;
        request.width = 50.0;
        request.height = 30.0;
        let created = KiplaceCore::try_create_project(&request, &PlacementOptions::default()).unwrap();

        let board = load_board(&created.pcb_file).unwrap();
        let layers = board.section("layers").unwrap().to_string();
        assert!(layers.contains("In2.Cu"));
        assert!(!layers.contains("In3.Cu"));

        let outline = board.section("gr_rect").unwrap();
        assert_eq!(outline.get("end").unwrap().to_string(), "(end 50 30)");
    }

    #[test]
    fn test_create_project_validation() {
        let dir = TempDir::new().unwrap();
        let options = PlacementOptions::default();

        let mut request = ProjectRequest::new("demo", dir.path());
        request.layers = 0;
        assert!(matches!(
            KiplaceCore::try_create_project(&request, &options),
            Err(KiplaceError::Validation(_))
        ));

        let mut request = ProjectRequest::new("demo", dir.path());
        request.width = -1.0;
        let result = KiplaceCore::create_project(&request, &options);
        assert!(!result.success);
        assert!(result.error.unwrap().contains("width"));

        let request = ProjectRequest::new("", dir.path());
        assert!(KiplaceCore::try_create_project(&request, &options).is_err());
        assert!(!dir.path().join(".kicad_pro").exists());
    }

    #[test]
    fn test_add_component_allocates_designators() {
        let dir = TempDir::new().unwrap();
        let pcb = new_project(&dir);
        let options = PlacementOptions::default();

        let first = KiplaceCore::add_component(&pcb, &ComponentRequest::new("LED", "LED_0603", 1.0, 2.0), &options);
        let second = KiplaceCore::add_component(&pcb, &ComponentRequest::new("LED", "LED_0603", 3.0, 2.0), &options);
        let resistor = KiplaceCore::add_component(&pcb, &ComponentRequest::new("10k", "R_0603", 10.0, 20.0), &options);

        assert_eq!(first.component.unwrap().reference, "L1");
        assert_eq!(second.component.unwrap().reference, "L2");
        let resistor = resistor.component.unwrap();
        assert_eq!(resistor.reference, "11");
        assert_eq!(resistor.position, ComponentPosition { x: 10.0, y: 20.0 });
        assert_eq!(resistor.layer, Side::Front);
    }

    #[test]
    fn test_add_component_labels() {
        let dir = TempDir::new().unwrap();
        let pcb = new_project(&dir);
        let request = ComponentRequest::new("cap", "C_0402", 5.0, 5.0)
            .rotation(90.0)
            .layer("back");
        KiplaceCore::try_add_component(&pcb, &request, &PlacementOptions::default()).unwrap();

        let board = load_board(&pcb).unwrap();
        let fp = board.footprints().next().unwrap();
        assert_eq!(fp.side, Side::Back);
        assert_eq!(fp.position.angle, 90.0);

        let labels: Vec<_> = fp.text_items().collect();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].kind, TextKind::Reference);
        assert_eq!(labels[0].text, "C1");
        assert_eq!(labels[0].position, Position::new(0.0, -2.0));
        assert_eq!(labels[0].layer.as_str(), "B.SilkS");
        assert_eq!(labels[1].kind, TextKind::Value);
        assert_eq!(labels[1].text, "cap");
        assert_eq!(labels[1].position, Position::new(0.0, 2.0));
        assert_eq!(labels[1].layer.as_str(), "B.Fab");
    }

    #[test]
    fn test_add_component_rejects_unknown_side() {
        let dir = TempDir::new().unwrap();
        let pcb = new_project(&dir);
        let before = std::fs::read_to_string(&pcb).unwrap();

        let request = ComponentRequest::new("R", "R_0603", 0.0, 0.0).layer("middle");
        let result = KiplaceCore::add_component(&pcb, &request, &PlacementOptions::default());
        assert!(!result.success);
        assert!(result.message.unwrap().starts_with("Failed to add component:"));
        assert_eq!(std::fs::read_to_string(&pcb).unwrap(), before);
    }

    #[test]
    fn test_get_components_missing_file() {
        let result = KiplaceCore::get_components(Path::new("/nonexistent/board.kicad_pcb"));
        assert!(!result.success);
        assert!(result.components.is_empty());
        assert_eq!(result.count, 0);
        assert!(result.error.unwrap().contains("not found"));
    }

    #[test]
    fn test_remove_component() {
        let dir = TempDir::new().unwrap();
        let pcb = new_project(&dir);
        let options = PlacementOptions::default();
        KiplaceCore::add_component(&pcb, &ComponentRequest::new("R", "R_0603", 0.0, 0.0), &options);
        KiplaceCore::add_component(&pcb, &ComponentRequest::new("R", "R_0603", 5.0, 0.0), &options);

        let removed = KiplaceCore::remove_component(&pcb, "R1");
        assert!(removed.success);
        assert_eq!(removed.message.as_deref(), Some("Removed component R1 from PCB"));

        let remaining = KiplaceCore::try_get_components(&pcb).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].reference, "R2");

        let missing = KiplaceCore::remove_component(&pcb, "R9");
        assert!(!missing.success);
        assert_eq!(missing.error.as_deref(), Some("Component not found: R9"));
    }

    #[test]
    fn test_bom_default_output() {
        let dir = TempDir::new().unwrap();
        let pcb = new_project(&dir);
        let options = PlacementOptions::default();
        KiplaceCore::add_component(&pcb, &ComponentRequest::new("R", "R_0603", 0.0, 0.0), &options);
        KiplaceCore::add_component(&pcb, &ComponentRequest::new("R", "R_0603", 5.0, 0.0), &options);

        let result = KiplaceCore::bom(&pcb, None);
        assert!(result.success, "{:?}", result.error);
        let output = PathBuf::from(result.output.unwrap());
        assert_eq!(output, dir.path().join("demo-bom.csv"));
        let csv = std::fs::read_to_string(output).unwrap();
        assert!(csv.contains("R1 R2,R,R_0603,2"));
    }

    #[test]
    fn test_options_from_settings() {
        let mut settings = Settings::default();
        settings.labels.offset = 3.0;
        let options = PlacementOptions::from(&settings);
        assert_eq!(options.label_offset, 3.0);
        assert_eq!(options.thickness, 1.6);
        assert_eq!(options.paper, "A4");
    }
}
