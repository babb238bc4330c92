//! PCB Schema Definitions
//!
//! Typed view of a KiCad board file (.kicad_pcb). Footprints and their text
//! labels are modelled field by field; every other node of the file (general,
//! setup, layers, nets, tracks, vias, zones, drawings, sections added by
//! newer KiCad versions) is carried as an [`OpaqueNode`] and written back
//! untouched.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::parser::sexp::SExp;

/// 2-D position in millimeters with a rotation in degrees.
#[derive(Debug, Clone, Copy, Serialize, Default, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub angle: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, angle: 0.0 }
    }

    pub fn with_angle(x: f64, y: f64, angle: f64) -> Self {
        Self { x, y, angle }
    }
}

/// Layer name from KiCad's fixed namespace, e.g. `F.Cu` or `B.SilkS`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct LayerId(String);

impl LayerId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
#[error("unknown board side '{0}' (expected \"front\" or \"back\")")]
pub struct UnknownSide(pub String);

/// Board face a footprint is mounted on.
#[derive(Debug, Clone, Copy, Serialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    Front,
    Back,
}

impl Side {
    pub fn copper_layer(self) -> LayerId {
        match self {
            Side::Front => LayerId::new("F.Cu"),
            Side::Back => LayerId::new("B.Cu"),
        }
    }

    pub fn silkscreen_layer(self) -> LayerId {
        match self {
            Side::Front => LayerId::new("F.SilkS"),
            Side::Back => LayerId::new("B.SilkS"),
        }
    }

    pub fn fabrication_layer(self) -> LayerId {
        match self {
            Side::Front => LayerId::new("F.Fab"),
            Side::Back => LayerId::new("B.Fab"),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Side::Front => "front",
            Side::Back => "back",
        }
    }

    /// Side of a footprint placed on `layer`; only `B.*` layers are back.
    pub fn from_layer(layer: &str) -> Self {
        if layer.starts_with("B.") {
            Side::Back
        } else {
            Side::Front
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Side {
    type Err = UnknownSide;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "front" | "top" | "f" | "f.cu" => Ok(Side::Front),
            "back" | "bottom" | "b" | "b.cu" => Ok(Side::Back),
            _ => Err(UnknownSide(s.to_string())),
        }
    }
}

/// Semantic kind of a footprint text label.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TextKind {
    Reference,
    Value,
    User,
}

impl TextKind {
    /// Classifies an `fp_text` type token; anything unrecognized is `User`.
    pub fn from_label(label: &str) -> Self {
        match label {
            "reference" => TextKind::Reference,
            "value" => TextKind::Value,
            _ => TextKind::User,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TextKind::Reference => "reference",
            TextKind::Value => "value",
            TextKind::User => "user",
        }
    }

    /// Property key KiCad 8 uses for this label, if it has one.
    pub fn property_key(self) -> Option<&'static str> {
        match self {
            TextKind::Reference => Some("Reference"),
            TextKind::Value => Some("Value"),
            TextKind::User => None,
        }
    }
}

/// How a text label is spelled in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextForm {
    /// `(fp_text reference "R1" ...)`, KiCad 5 through 7.
    #[default]
    FpText,
    /// `(property "Reference" "R1" ...)`, KiCad 8 and later.
    Property,
}

/// Tokens of an `(at ...)` node beyond the coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct AtStyle {
    /// The angle was written even though it is zero.
    pub(crate) explicit_angle: bool,
    /// Flags such as `unlocked` that follow the angle.
    pub(crate) flags: Vec<SExp>,
}

/// Positions of the `(at ...)` and `(layer ...)` children, counted among
/// all children after the header tokens. `None` means the source had none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ChildSlots {
    pub(crate) at: Option<usize>,
    pub(crate) layer: Option<usize>,
}

/// Text label owned by a footprint.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicTextItem {
    pub kind: TextKind,
    pub text: String,
    pub position: Position,
    pub layer: LayerId,
    pub form: TextForm,
    /// Child nodes not interpreted here (effects, uuid, hide), in order.
    pub extra: Vec<SExp>,
    pub(crate) at_style: AtStyle,
    pub(crate) slots: ChildSlots,
    /// Tokens after the layer name, such as `knockout`.
    pub(crate) layer_flags: Vec<SExp>,
}

impl GraphicTextItem {
    pub fn new(kind: TextKind, text: impl Into<String>, position: Position, layer: LayerId) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
            layer,
            form: TextForm::FpText,
            extra: Vec::new(),
            at_style: AtStyle::default(),
            slots: ChildSlots {
                at: Some(0),
                layer: Some(1),
            },
            layer_flags: Vec::new(),
        }
    }

    pub fn with_form(mut self, form: TextForm) -> Self {
        // User labels have no property spelling
        if self.kind != TextKind::User {
            self.form = form;
        }
        self
    }

    pub fn with_extra(mut self, node: SExp) -> Self {
        self.extra.push(node);
        self
    }
}

/// Child of a footprint: a text label, or any node carried through as-is.
#[derive(Debug, Clone, PartialEq)]
pub enum FootprintItem {
    Text(GraphicTextItem),
    Other(SExp),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FootprintKeyword {
    #[default]
    Footprint,
    /// Pre-KiCad 6 files call footprints `module`.
    Module,
}

impl FootprintKeyword {
    pub fn as_str(self) -> &'static str {
        match self {
            FootprintKeyword::Footprint => "footprint",
            FootprintKeyword::Module => "module",
        }
    }
}

/// Node and text a footprint was decoded from.
#[derive(Debug, Clone)]
pub(crate) struct SourceText {
    pub(crate) node: SExp,
    pub(crate) text: String,
}

/// Component instance placed on a board.
#[derive(Debug, Clone)]
pub struct Footprint {
    pub keyword: FootprintKeyword,
    /// Library identifier such as `Resistor_SMD:R_0603_1608Metric`.
    pub library_ref: Option<String>,
    pub position: Position,
    pub side: Side,
    pub items: Vec<FootprintItem>,
    pub(crate) slots: ChildSlots,
    /// Layer name as written in the file, kept while it agrees with `side`.
    pub(crate) layer_name: Option<LayerId>,
    pub(crate) at_style: AtStyle,
    pub(crate) source: Option<SourceText>,
}

impl Footprint {
    pub fn new(library_ref: impl Into<String>, position: Position, side: Side) -> Self {
        Self {
            keyword: FootprintKeyword::Footprint,
            library_ref: Some(library_ref.into()),
            position,
            side,
            items: Vec::new(),
            slots: ChildSlots {
                at: Some(1),
                layer: Some(0),
            },
            layer_name: None,
            at_style: AtStyle::default(),
            source: None,
        }
    }

    pub fn layer(&self) -> LayerId {
        match &self.layer_name {
            Some(name) if Side::from_layer(name.as_str()) == self.side => name.clone(),
            _ => self.side.copper_layer(),
        }
    }

    pub fn text_items(&self) -> impl Iterator<Item = &GraphicTextItem> {
        self.items.iter().filter_map(|item| match item {
            FootprintItem::Text(text) => Some(text),
            FootprintItem::Other(_) => None,
        })
    }

    pub fn push_text(&mut self, text: GraphicTextItem) {
        self.items.push(FootprintItem::Text(text));
    }

    fn last_text(&self, kind: TextKind) -> Option<&str> {
        self.text_items()
            .filter(|item| item.kind == kind)
            .last()
            .map(|item| item.text.as_str())
    }

    /// Reference designator; the last reference label wins.
    pub fn reference(&self) -> Option<&str> {
        self.last_text(TextKind::Reference)
    }

    /// Component value; the last value label wins.
    pub fn value(&self) -> Option<&str> {
        self.last_text(TextKind::Value)
    }
}

impl PartialEq for Footprint {
    fn eq(&self, other: &Self) -> bool {
        self.keyword == other.keyword
            && self.library_ref == other.library_ref
            && self.position == other.position
            && self.side == other.side
            && self.items == other.items
            && self.at_style == other.at_style
    }
}

/// A top-level node this crate does not interpret.
#[derive(Debug, Clone)]
pub struct OpaqueNode {
    node: SExp,
    pub(crate) source: Option<String>,
}

impl OpaqueNode {
    pub fn new(node: SExp) -> Self {
        Self { node, source: None }
    }

    pub(crate) fn from_source(node: SExp, text: String) -> Self {
        Self {
            node,
            source: Some(text),
        }
    }

    pub fn node(&self) -> &SExp {
        &self.node
    }

    /// Mutable access; the node is re-rendered on the next encode.
    pub fn node_mut(&mut self) -> &mut SExp {
        self.source = None;
        &mut self.node
    }

    pub fn tag(&self) -> Option<&str> {
        self.node.head()
    }
}

impl PartialEq for OpaqueNode {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoardItem {
    Footprint(Footprint),
    Opaque(OpaqueNode),
}

#[derive(Debug, Clone)]
pub(crate) struct BoardEntry {
    pub(crate) leading: String,
    pub(crate) item: BoardItem,
}

pub(crate) const NEW_ENTRY_LEADING: &str = "\n  ";

/// In-memory board: the ordered top-level nodes of a `.kicad_pcb` file.
#[derive(Debug, Clone)]
pub struct BoardDocument {
    pub(crate) entries: Vec<BoardEntry>,
    pub(crate) tail: String,
    pub(crate) trailer: String,
}

impl Default for BoardDocument {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            tail: "\n".to_string(),
            trailer: "\n".to_string(),
        }
    }
}

impl PartialEq for BoardDocument {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(&other.entries)
                .all(|(a, b)| a.item == b.item)
    }
}

impl BoardDocument {
    pub fn items(&self) -> impl Iterator<Item = &BoardItem> {
        self.entries.iter().map(|entry| &entry.item)
    }

    pub fn footprints(&self) -> impl Iterator<Item = &Footprint> {
        self.items().filter_map(|item| match item {
            BoardItem::Footprint(fp) => Some(fp),
            BoardItem::Opaque(_) => None,
        })
    }

    /// Mutable access; a footprint whose fields change is re-rendered on the
    /// next encode, the others keep their source text.
    pub fn footprints_mut(&mut self) -> impl Iterator<Item = &mut Footprint> {
        self.entries.iter_mut().filter_map(|entry| match &mut entry.item {
            BoardItem::Footprint(fp) => Some(fp),
            BoardItem::Opaque(_) => None,
        })
    }

    pub fn footprint_count(&self) -> usize {
        self.footprints().count()
    }

    pub fn opaque_nodes(&self) -> impl Iterator<Item = &OpaqueNode> {
        self.items().filter_map(|item| match item {
            BoardItem::Opaque(node) => Some(node),
            BoardItem::Footprint(_) => None,
        })
    }

    /// Every reference designator on the board, including duplicates' labels.
    pub fn reference_designators(&self) -> BTreeSet<String> {
        self.footprints()
            .flat_map(|fp| fp.text_items())
            .filter(|item| item.kind == TextKind::Reference)
            .map(|item| item.text.clone())
            .collect()
    }

    /// Adds a footprint after the last existing one, or at the end of the
    /// document when there is none.
    pub fn push_footprint(&mut self, footprint: Footprint) {
        let at = self
            .entries
            .iter()
            .rposition(|entry| matches!(entry.item, BoardItem::Footprint(_)))
            .map(|index| index + 1)
            .unwrap_or(self.entries.len());
        self.entries.insert(
            at,
            BoardEntry {
                leading: NEW_ENTRY_LEADING.to_string(),
                item: BoardItem::Footprint(footprint),
            },
        );
    }

    /// Removes the `index`-th footprint (counting footprints only).
    pub fn remove_footprint(&mut self, index: usize) -> Option<Footprint> {
        let position = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| matches!(entry.item, BoardItem::Footprint(_)))
            .nth(index)
            .map(|(position, _)| position)?;

        match self.entries.remove(position).item {
            BoardItem::Footprint(fp) => Some(fp),
            BoardItem::Opaque(_) => None,
        }
    }

    fn section_entry(&self, tag: &str) -> Option<usize> {
        self.entries.iter().position(|entry| match &entry.item {
            BoardItem::Opaque(node) => node.tag() == Some(tag),
            BoardItem::Footprint(_) => false,
        })
    }

    /// First top-level opaque node with the given keyword.
    pub fn section(&self, tag: &str) -> Option<&SExp> {
        self.opaque_nodes()
            .find(|node| node.tag() == Some(tag))
            .map(OpaqueNode::node)
    }

    pub fn section_mut(&mut self, tag: &str) -> Option<&mut SExp> {
        let index = self.section_entry(tag)?;
        match &mut self.entries[index].item {
            BoardItem::Opaque(node) => Some(node.node_mut()),
            BoardItem::Footprint(_) => None,
        }
    }

    /// Appends an opaque node before the first footprint or drawing so that
    /// header sections stay ahead of board content.
    pub fn push_section(&mut self, node: SExp) {
        let at = self
            .entries
            .iter()
            .position(|entry| match &entry.item {
                BoardItem::Footprint(_) => true,
                BoardItem::Opaque(opaque) => !matches!(
                    opaque.tag(),
                    Some("version" | "generator" | "generator_version" | "general" | "paper"
                        | "title_block" | "layers" | "setup" | "property" | "net")
                ),
            })
            .unwrap_or(self.entries.len());
        self.entries.insert(
            at,
            BoardEntry {
                leading: NEW_ENTRY_LEADING.to_string(),
                item: BoardItem::Opaque(OpaqueNode::new(node)),
            },
        );
    }

    /// Appends an opaque node at the end of the document.
    pub fn push_node(&mut self, node: SExp) {
        self.entries.push(BoardEntry {
            leading: NEW_ENTRY_LEADING.to_string(),
            item: BoardItem::Opaque(OpaqueNode::new(node)),
        });
    }

    /// Replaces the first section with the same keyword, or inserts it.
    pub fn replace_section(&mut self, node: SExp) {
        if let Some(tag) = node.head().map(str::to_string) {
            if let Some(existing) = self.section_mut(&tag) {
                *existing = node;
                return;
            }
        }
        self.push_section(node);
    }

    /// Inserts `default` unless a section with its keyword already exists.
    pub fn ensure_section(&mut self, default: SExp) {
        let present = default
            .head()
            .map(|tag| self.section(tag).is_some())
            .unwrap_or(true);
        if !present {
            self.push_section(default);
        }
    }

    /// File format version, e.g. `20221018` for KiCad 7.
    pub fn version(&self) -> Option<u32> {
        self.section("version")?
            .as_list()?
            .get(1)?
            .as_atom()?
            .parse()
            .ok()
    }

    /// Board thickness from the `general` section.
    pub fn thickness(&self) -> Option<f64> {
        self.section("general")?.get("thickness")?.as_f64().ok()
    }

    pub fn set_thickness(&mut self, thickness: f64) {
        let entry = SExp::list(vec![SExp::atom("thickness"), SExp::number(thickness)]);
        match self.section_mut("general").and_then(SExp::as_list_mut) {
            Some(items) => match items.iter_mut().find(|item| item.head() == Some("thickness")) {
                Some(existing) => *existing = entry,
                None => items.push(entry),
            },
            None => self.push_section(SExp::list(vec![SExp::atom("general"), entry])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labelled(reference: &str, value: &str) -> Footprint {
        let mut fp = Footprint::new("R_0603", Position::new(0.0, 0.0), Side::Front);
        fp.push_text(GraphicTextItem::new(
            TextKind::Reference,
            reference,
            Position::new(0.0, -2.0),
            Side::Front.silkscreen_layer(),
        ));
        fp.push_text(GraphicTextItem::new(
            TextKind::Value,
            value,
            Position::new(0.0, 2.0),
            Side::Front.fabrication_layer(),
        ));
        fp
    }

    #[test]
    fn test_side_parsing() {
        assert_eq!("front".parse::<Side>().unwrap(), Side::Front);
        assert_eq!("Back".parse::<Side>().unwrap(), Side::Back);
        assert_eq!("B.Cu".parse::<Side>().unwrap(), Side::Back);
        assert!("middle".parse::<Side>().is_err());
    }

    #[test]
    fn test_side_layers() {
        assert_eq!(Side::Front.silkscreen_layer().as_str(), "F.SilkS");
        assert_eq!(Side::Back.fabrication_layer().as_str(), "B.Fab");
        assert_eq!(Side::from_layer("B.Cu"), Side::Back);
        assert_eq!(Side::from_layer("F.Cu"), Side::Front);
    }

    #[test]
    fn test_text_kind_classification() {
        assert_eq!(TextKind::from_label("reference"), TextKind::Reference);
        assert_eq!(TextKind::from_label("value"), TextKind::Value);
        assert_eq!(TextKind::from_label("user"), TextKind::User);
        assert_eq!(TextKind::from_label("anything"), TextKind::User);
    }

    #[test]
    fn test_footprint_without_labels() {
        let fp = Footprint::new("R_0603", Position::new(1.0, 2.0), Side::Front);
        assert_eq!(fp.reference(), None);
        assert_eq!(fp.value(), None);
    }

    #[test]
    fn test_last_label_wins() {
        let mut fp = labelled("R1", "10k");
        fp.push_text(GraphicTextItem::new(
            TextKind::Value,
            "22k",
            Position::default(),
            Side::Front.fabrication_layer(),
        ));
        assert_eq!(fp.reference(), Some("R1"));
        assert_eq!(fp.value(), Some("22k"));
    }

    #[test]
    fn test_push_footprint_goes_after_last_footprint() {
        let mut board = BoardDocument::default();
        board.push_node(SExp::list(vec![SExp::atom("version"), SExp::atom("20221018")]));
        board.push_footprint(labelled("R1", "10k"));
        board.push_node(SExp::list(vec![SExp::atom("segment")]));
        board.push_footprint(labelled("R2", "10k"));

        let tags: Vec<String> = board
            .items()
            .map(|item| match item {
                BoardItem::Footprint(fp) => fp.reference().unwrap_or("?").to_string(),
                BoardItem::Opaque(node) => node.tag().unwrap_or("").to_string(),
            })
            .collect();
        assert_eq!(tags, vec!["version", "R1", "R2", "segment"]);
    }

    #[test]
    fn test_remove_footprint_counts_footprints_only() {
        let mut board = BoardDocument::default();
        board.push_node(SExp::list(vec![SExp::atom("net"), SExp::atom("0"), SExp::string("")]));
        board.push_footprint(labelled("R1", "10k"));
        board.push_footprint(labelled("C1", "100n"));

        let removed = board.remove_footprint(1).unwrap();
        assert_eq!(removed.reference(), Some("C1"));
        assert_eq!(board.footprint_count(), 1);
        assert!(board.remove_footprint(5).is_none());
    }

    #[test]
    fn test_thickness_and_sections() {
        let mut board = BoardDocument::default();
        assert_eq!(board.thickness(), None);

        board.set_thickness(1.6);
        assert_eq!(board.thickness(), Some(1.6));

        board.set_thickness(0.8);
        assert_eq!(board.thickness(), Some(0.8));

        board.ensure_section(SExp::list(vec![SExp::atom("setup")]));
        board.ensure_section(SExp::list(vec![
            SExp::atom("setup"),
            SExp::list(vec![SExp::atom("pad_to_mask_clearance"), SExp::atom("0")]),
        ]));
        assert_eq!(board.section("setup"), Some(&SExp::list(vec![SExp::atom("setup")])));
    }

    #[test]
    fn test_reference_designators_collects_every_label() {
        let mut board = BoardDocument::default();
        board.push_footprint(labelled("R1", "10k"));
        board.push_footprint(labelled("R3", "10k"));
        let refs = board.reference_designators();
        assert!(refs.contains("R1"));
        assert!(refs.contains("R3"));
        assert_eq!(refs.len(), 2);
    }
}
