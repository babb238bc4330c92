//! KiCad PCB codec
//!
//! Reads and writes KiCad board files (.kicad_pcb) in the S-expression
//! format used since KiCad 6, plus the `module` spelling of older files.
//!
//! Key format details:
//! - All values are in millimeters
//! - Footprints are `(footprint "Lib:Name" (layer "F.Cu") (at x y angle) ...)`
//! - Reference and value labels are `fp_text` nodes up to KiCad 7 and
//!   `property` nodes from KiCad 8 on
//! - Every top-level node that is not a footprint is kept verbatim

use std::path::Path;

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::parser::pcb_schema::*;
use crate::parser::sexp::{format_sexp, ParseError, SExp, SExpParser};

#[derive(Debug, Error)]
pub enum PcbParseError {
    #[error("S-expression parse error: {0}")]
    SExpParse(#[from] ParseError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid PCB format: {0}")]
    InvalidFormat(String),
    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// First file format version that spells reference and value as properties.
pub const PROPERTY_LABELS_VERSION: u32 = 20230620;

/// Format version written into new boards (KiCad 7).
pub const TEMPLATE_VERSION: &str = "20221018";

const DEFAULT_THICKNESS: f64 = 1.6;
const MAX_COPPER_LAYERS: u32 = 32;

const TECHNICAL_LAYERS: &[(u32, &str, Option<&str>)] = &[
    (32, "B.Adhes", Some("B.Adhesive")),
    (33, "F.Adhes", Some("F.Adhesive")),
    (34, "B.Paste", None),
    (35, "F.Paste", None),
    (36, "B.SilkS", Some("B.Silkscreen")),
    (37, "F.SilkS", Some("F.Silkscreen")),
    (38, "B.Mask", None),
    (39, "F.Mask", None),
    (40, "Dwgs.User", Some("User.Drawings")),
    (41, "Cmts.User", Some("User.Comments")),
    (42, "Eco1.User", Some("User.Eco1")),
    (43, "Eco2.User", Some("User.Eco2")),
    (44, "Edge.Cuts", None),
    (45, "Margin", None),
    (46, "B.CrtYd", Some("B.Courtyard")),
    (47, "F.CrtYd", Some("F.Courtyard")),
    (48, "B.Fab", None),
    (49, "F.Fab", None),
];

/// Codec between `.kicad_pcb` text and [`BoardDocument`].
pub struct PcbCodec;

impl PcbCodec {
    /// Read and decode a board file.
    pub fn decode_file(path: &Path) -> Result<BoardDocument, PcbParseError> {
        let content = std::fs::read_to_string(path)?;
        Self::decode(&content)
    }

    /// Decode board text. Unknown top-level sections are kept, not rejected.
    pub fn decode(content: &str) -> Result<BoardDocument, PcbParseError> {
        let document = SExpParser::new(content).parse_document()?;

        if document.keyword != "kicad_pcb" {
            return Err(PcbParseError::InvalidFormat(format!(
                "Expected kicad_pcb, found {}",
                document.keyword
            )));
        }

        let mut board = BoardDocument {
            entries: Vec::with_capacity(document.children.len()),
            tail: document.tail,
            trailer: document.trailer,
        };

        for raw in document.children {
            let item = match raw.node.head() {
                Some("footprint") | Some("module") => {
                    BoardItem::Footprint(Self::decode_footprint(raw.node, raw.text)?)
                }
                _ => BoardItem::Opaque(OpaqueNode::from_source(raw.node, raw.text)),
            };
            board.entries.push(BoardEntry {
                leading: raw.leading,
                item,
            });
        }

        debug!(
            footprints = board.footprint_count(),
            nodes = board.entries.len(),
            "decoded board"
        );
        Ok(board)
    }

    /// Encode a board. Nodes that were decoded and not changed since are
    /// written back exactly as they were read.
    pub fn encode(board: &BoardDocument) -> String {
        let mut out = String::from("(kicad_pcb");

        for entry in &board.entries {
            out.push_str(&entry.leading);
            match &entry.item {
                BoardItem::Opaque(node) => match &node.source {
                    Some(text) => out.push_str(text),
                    None => out.push_str(&format_sexp(node.node(), 1)),
                },
                BoardItem::Footprint(fp) => out.push_str(&Self::encode_footprint(fp)),
            }
        }

        out.push_str(&board.tail);
        out.push(')');
        out.push_str(&board.trailer);
        out
    }

    /// Encode and write a board file. The file is overwritten in place.
    pub fn write_file(board: &BoardDocument, path: &Path) -> Result<(), PcbParseError> {
        std::fs::write(path, Self::encode(board))?;
        Ok(())
    }

    /// Minimal empty board: default general section, A4 paper, the two-layer
    /// table, a default setup section and the unconnected net.
    pub fn create_template() -> BoardDocument {
        let mut board = BoardDocument::default();
        board.push_node(SExp::list(vec![SExp::atom("version"), SExp::atom(TEMPLATE_VERSION)]));
        board.push_node(SExp::list(vec![SExp::atom("generator"), SExp::atom("kiplace")]));
        board.push_node(SExp::list(vec![
            SExp::atom("general"),
            SExp::list(vec![SExp::atom("thickness"), SExp::number(DEFAULT_THICKNESS)]),
        ]));
        board.push_node(paper_section("A4"));
        board.push_node(layer_table(2));
        board.push_node(default_setup());
        board.push_node(SExp::list(vec![SExp::atom("net"), SExp::atom("0"), SExp::string("")]));
        board
    }

    fn encode_footprint(fp: &Footprint) -> String {
        let node = Self::footprint_node(fp);
        match &fp.source {
            Some(source) if same_node(&source.node, &node) => source.text.clone(),
            _ => format_sexp(&node, 1),
        }
    }

    fn footprint_node(fp: &Footprint) -> SExp {
        let mut out = vec![SExp::atom(fp.keyword.as_str())];
        if let Some(name) = &fp.library_ref {
            out.push(SExp::string(name.clone()));
        }

        let items: Vec<SExp> = fp
            .items
            .iter()
            .map(|item| match item {
                FootprintItem::Text(text) => Self::text_node(text),
                FootprintItem::Other(node) => node.clone(),
            })
            .collect();

        let mut slots = Vec::new();
        // A footprint without a layer node reads as front
        let layer_slot = match fp.slots.layer {
            Some(index) => Some(index),
            None if fp.side != Side::Front => Some(0),
            None => None,
        };
        if let Some(index) = layer_slot {
            slots.push((
                index,
                SExp::list(vec![SExp::atom("layer"), SExp::string(fp.layer().as_str())]),
            ));
        }
        let at_slot = match fp.slots.at {
            Some(index) => Some(index),
            None if fp.position != Position::default() => Some(usize::MAX),
            None => None,
        };
        if let Some(index) = at_slot {
            slots.push((index, at_node(&fp.position, &fp.at_style)));
        }

        out.extend(place_slots(items, slots));
        SExp::list(out)
    }

    fn text_node(text: &GraphicTextItem) -> SExp {
        let mut out = match (text.form, text.kind.property_key()) {
            (TextForm::Property, Some(key)) => vec![
                SExp::atom("property"),
                SExp::string(key),
                SExp::string(text.text.clone()),
            ],
            _ => vec![
                SExp::atom("fp_text"),
                SExp::atom(text.kind.label()),
                SExp::string(text.text.clone()),
            ],
        };

        let mut slots = Vec::new();
        let at_slot = match text.slots.at {
            Some(index) => Some(index),
            None if text.position != Position::default() => Some(0),
            None => None,
        };
        if let Some(index) = at_slot {
            slots.push((index, at_node(&text.position, &text.at_style)));
        }
        let layer_slot = match text.slots.layer {
            Some(index) => Some(index),
            None if !text.layer.as_str().is_empty() => Some(at_slot.map_or(0, |at| at + 1)),
            None => None,
        };
        if let Some(index) = layer_slot {
            let mut layer = vec![SExp::atom("layer"), SExp::string(text.layer.as_str())];
            layer.extend(text.layer_flags.iter().cloned());
            slots.push((index, SExp::list(layer)));
        }

        out.extend(place_slots(text.extra.clone(), slots));
        SExp::list(out)
    }

    fn decode_footprint(node: SExp, text: String) -> Result<Footprint, PcbParseError> {
        let list = node
            .as_list()
            .ok_or_else(|| PcbParseError::InvalidFormat("Footprint must be a list".to_string()))?;

        let keyword = match node.head() {
            Some("module") => FootprintKeyword::Module,
            _ => FootprintKeyword::Footprint,
        };

        // Footprint library is the second element
        let library_ref = list
            .get(1)
            .and_then(|name| name.as_atom())
            .map(|name| name.to_string());
        let first_child = if library_ref.is_some() { 2 } else { 1 };

        let mut footprint = Footprint {
            keyword,
            library_ref,
            position: Position::default(),
            side: Side::Front,
            items: Vec::new(),
            slots: ChildSlots::default(),
            layer_name: None,
            at_style: AtStyle::default(),
            source: None,
        };

        for (slot, child) in list.iter().skip(first_child).enumerate() {
            match child.head() {
                Some("layer") if footprint.slots.layer.is_none() => {
                    let layer = Self::atom_at(child, 1)
                        .ok_or_else(|| PcbParseError::MissingField("footprint layer".to_string()))?;
                    footprint.side = Side::from_layer(layer);
                    footprint.layer_name = Some(LayerId::new(layer));
                    footprint.slots.layer = Some(slot);
                }
                Some("at") if footprint.slots.at.is_none() => {
                    let (position, at_style) = Self::parse_at(child)?;
                    footprint.position = position;
                    footprint.at_style = at_style;
                    footprint.slots.at = Some(slot);
                }
                Some("fp_text") => {
                    footprint
                        .items
                        .push(FootprintItem::Text(Self::decode_fp_text(child)?));
                }
                Some("property") if Self::is_label_property(child) => {
                    footprint
                        .items
                        .push(FootprintItem::Text(Self::decode_property(child)?));
                }
                _ => footprint.items.push(FootprintItem::Other(child.clone())),
            }
        }

        footprint.source = Some(SourceText { node, text });
        Ok(footprint)
    }

    fn is_label_property(sexp: &SExp) -> bool {
        matches!(Self::atom_at(sexp, 1), Some("Reference") | Some("Value"))
    }

    fn decode_fp_text(sexp: &SExp) -> Result<GraphicTextItem, PcbParseError> {
        let kind = Self::atom_at(sexp, 1)
            .map(TextKind::from_label)
            .ok_or_else(|| PcbParseError::MissingField("fp_text type".to_string()))?;
        let text = Self::atom_at(sexp, 2)
            .ok_or_else(|| PcbParseError::MissingField("fp_text text".to_string()))?;
        Self::decode_text_children(sexp, kind, text, TextForm::FpText)
    }

    fn decode_property(sexp: &SExp) -> Result<GraphicTextItem, PcbParseError> {
        let kind = match Self::atom_at(sexp, 1) {
            Some("Reference") => TextKind::Reference,
            _ => TextKind::Value,
        };
        let text = Self::atom_at(sexp, 2)
            .ok_or_else(|| PcbParseError::MissingField("property value".to_string()))?;
        Self::decode_text_children(sexp, kind, text, TextForm::Property)
    }

    fn decode_text_children(
        sexp: &SExp,
        kind: TextKind,
        text: &str,
        form: TextForm,
    ) -> Result<GraphicTextItem, PcbParseError> {
        let mut item = GraphicTextItem::new(kind, text, Position::default(), LayerId::new(""));
        item.form = form;
        item.slots = ChildSlots::default();

        for (slot, child) in sexp.as_list().unwrap_or_default().iter().skip(3).enumerate() {
            match child.head() {
                Some("at") if item.slots.at.is_none() => {
                    let (position, at_style) = Self::parse_at(child)?;
                    item.position = position;
                    item.at_style = at_style;
                    item.slots.at = Some(slot);
                }
                Some("layer") if item.slots.layer.is_none() => {
                    match Self::atom_at(child, 1) {
                        Some(layer) => {
                            item.layer = LayerId::new(layer);
                            item.layer_flags =
                                child.as_list().unwrap_or_default()[2..].to_vec();
                        }
                        // Keep a bare `(layer)` as it was
                        None => {
                            item.extra.push(child.clone());
                            continue;
                        }
                    }
                    item.slots.layer = Some(slot);
                }
                _ => item.extra.push(child.clone()),
            }
        }

        Ok(item)
    }

    fn atom_at(sexp: &SExp, index: usize) -> Option<&str> {
        sexp.as_list()
            .and_then(|list| list.get(index))
            .and_then(|value| value.as_atom())
    }

    fn parse_at(sexp: &SExp) -> Result<(Position, AtStyle), PcbParseError> {
        let list = sexp.as_list().unwrap_or_default();
        if list.len() < 3 {
            return Err(PcbParseError::InvalidFormat(format!(
                "Invalid 'at' format: {}",
                sexp
            )));
        }

        let x = list[1].as_f64()?;
        let y = list[2].as_f64()?;
        let mut style = AtStyle::default();
        let mut angle = 0.0;
        let mut rest = &list[3..];

        if let Some(first) = rest.first() {
            if let Ok(value) = first.as_f64() {
                angle = value;
                style.explicit_angle = value == 0.0;
                rest = &rest[1..];
            }
        }
        style.flags = rest.to_vec();

        Ok((Position::with_angle(x, y, angle), style))
    }
}

/// Structural equality that ignores quoting and number spelling, so that
/// `(layer F.Cu)` matches `(layer "F.Cu")` and `1.430` matches `1.43`.
fn same_node(a: &SExp, b: &SExp) -> bool {
    match (a, b) {
        (SExp::List(a), SExp::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(a, b)| same_node(a, b))
        }
        (SExp::List(_), _) | (_, SExp::List(_)) => false,
        _ => match (a.as_atom(), b.as_atom()) {
            (Some(x), Some(y)) if x == y => true,
            (Some(x), Some(y)) => match (x.parse::<f64>(), y.parse::<f64>()) {
                (Ok(x), Ok(y)) => x == y,
                _ => false,
            },
            _ => false,
        },
    }
}

/// Merges `items` with nodes that must sit at a fixed child position.
/// Positions past the end append in order.
fn place_slots(items: Vec<SExp>, mut slots: Vec<(usize, SExp)>) -> Vec<SExp> {
    slots.sort_by_key(|(index, _)| *index);
    let mut out = Vec::with_capacity(items.len() + slots.len());
    let mut slots = slots.into_iter().peekable();
    let mut items = items.into_iter();

    loop {
        while let Some((_, node)) = slots.next_if(|(index, _)| *index <= out.len()) {
            out.push(node);
        }
        match items.next() {
            Some(item) => out.push(item),
            None => break,
        }
    }
    out.extend(slots.map(|(_, node)| node));
    out
}

fn at_node(position: &Position, style: &AtStyle) -> SExp {
    let mut at = vec![
        SExp::atom("at"),
        SExp::number(position.x),
        SExp::number(position.y),
    ];
    if position.angle != 0.0 || style.explicit_angle {
        at.push(SExp::number(position.angle));
    }
    at.extend(style.flags.iter().cloned());
    SExp::list(at)
}

/// `(paper "<size>")` section.
pub fn paper_section(size: &str) -> SExp {
    SExp::list(vec![SExp::atom("paper"), SExp::string(size)])
}

/// Setup section written into new boards.
pub fn default_setup() -> SExp {
    SExp::list(vec![
        SExp::atom("setup"),
        SExp::list(vec![SExp::atom("pad_to_mask_clearance"), SExp::atom("0")]),
    ])
}

/// Layer table with `copper_layers` copper layers (clamped to 1..=32) and
/// KiCad's standard technical layers.
pub fn layer_table(copper_layers: u32) -> SExp {
    let copper_layers = copper_layers.clamp(1, MAX_COPPER_LAYERS);
    let mut layers = vec![SExp::atom("layers")];

    let copper = |ordinal: u32, name: String| {
        SExp::list(vec![
            SExp::atom(ordinal.to_string()),
            SExp::string(name),
            SExp::atom("signal"),
        ])
    };

    layers.push(copper(0, "F.Cu".to_string()));
    for inner in 1..copper_layers.saturating_sub(1) {
        layers.push(copper(inner, format!("In{}.Cu", inner)));
    }
    if copper_layers > 1 {
        layers.push(copper(31, "B.Cu".to_string()));
    }

    for (ordinal, name, user_name) in TECHNICAL_LAYERS {
        let mut layer = vec![
            SExp::atom(ordinal.to_string()),
            SExp::string(*name),
            SExp::atom("user"),
        ];
        if let Some(user_name) = user_name {
            layer.push(SExp::string(*user_name));
        }
        layers.push(SExp::list(layer));
    }

    SExp::list(layers)
}

/// Rectangular board outline on `Edge.Cuts` with its corner at the origin.
pub fn board_outline(width: f64, height: f64, line_width: f64) -> SExp {
    SExp::list(vec![
        SExp::atom("gr_rect"),
        SExp::list(vec![SExp::atom("start"), SExp::number(0.0), SExp::number(0.0)]),
        SExp::list(vec![SExp::atom("end"), SExp::number(width), SExp::number(height)]),
        SExp::list(vec![
            SExp::atom("stroke"),
            SExp::list(vec![SExp::atom("width"), SExp::number(line_width)]),
            SExp::list(vec![SExp::atom("type"), SExp::atom("default")]),
        ]),
        SExp::list(vec![SExp::atom("fill"), SExp::atom("none")]),
        SExp::list(vec![SExp::atom("layer"), SExp::string("Edge.Cuts")]),
        SExp::list(vec![SExp::atom("uuid"), SExp::string(Uuid::new_v4().to_string())]),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOARD: &str = r#"(kicad_pcb (version 20221018) (generator pcbnew)

  (general
    (thickness 1.6)
  )

  (paper "A4")
  (net 0 "")
  (net 1 "GND")

  (footprint "Resistor_SMD:R_0603_1608Metric" (layer "F.Cu")
    (tstamp 3f1c2a4e-1111-4c3b-9c1e-0a1b2c3d4e5f)
    (at 10 20)
    (descr "Resistor SMD 0603")
    (fp_text reference "R1" (at 0 -1.43) (layer "F.SilkS")
        (effects (font (size 1 1) (thickness 0.15)))
      (tstamp 8d2f1c3a-2222-4d5e-8f6a-1b2c3d4e5f60)
    )
    (fp_text value "10k" (at 0 1.43) (layer "F.Fab")
        (effects (font (size 1 1) (thickness 0.15)))
      (tstamp 9e3a2d4b-3333-4e6f-9a7b-2c3d4e5f6071)
    )
    (pad "1" smd roundrect (at -0.775 0) (size 0.9 0.95) (layers "F.Cu" "F.Paste" "F.Mask") (net 1 "GND"))
  )

  (segment (start 10 20) (end 30 20) (width 0.25) (layer "F.Cu") (net 1) (tstamp 0a0b0c0d-4444-4a4b-8c8d-3e3f40414243))
)
"#;

    #[test]
    fn test_decode_footprint_fields() {
        let board = PcbCodec::decode(BOARD).unwrap();
        assert_eq!(board.footprint_count(), 1);

        let fp = board.footprints().next().unwrap();
        assert_eq!(fp.library_ref.as_deref(), Some("Resistor_SMD:R_0603_1608Metric"));
        assert_eq!(fp.position, Position::new(10.0, 20.0));
        assert_eq!(fp.side, Side::Front);
        assert_eq!(fp.reference(), Some("R1"));
        assert_eq!(fp.value(), Some("10k"));

        let reference = fp.text_items().next().unwrap();
        assert_eq!(reference.kind, TextKind::Reference);
        assert_eq!(reference.position, Position::new(0.0, -1.43));
        assert_eq!(reference.layer.as_str(), "F.SilkS");
        assert_eq!(reference.extra.len(), 2);
    }

    #[test]
    fn test_opaque_sections_are_kept_in_order() {
        let board = PcbCodec::decode(BOARD).unwrap();
        let tags: Vec<&str> = board.opaque_nodes().filter_map(|n| n.tag()).collect();
        assert_eq!(
            tags,
            vec!["version", "generator", "general", "paper", "net", "net", "segment"]
        );
        assert_eq!(board.thickness(), Some(1.6));
        assert_eq!(board.version(), Some(20221018));
    }

    #[test]
    fn test_unmodified_encode_is_byte_identical() {
        let board = PcbCodec::decode(BOARD).unwrap();
        assert_eq!(PcbCodec::encode(&board), BOARD);
    }

    #[test]
    fn test_mutation_rewrites_only_the_touched_footprint() {
        let mut board = PcbCodec::decode(BOARD).unwrap();
        board.footprints_mut().next().unwrap().position = Position::new(12.5, 20.0);

        let text = PcbCodec::encode(&board);
        assert!(text.contains("(at 12.5 20)"));
        assert!(text.contains(
            "(segment (start 10 20) (end 30 20) (width 0.25) (layer \"F.Cu\") (net 1) (tstamp 0a0b0c0d-4444-4a4b-8c8d-3e3f40414243))"
        ));
        assert!(text.contains("  (general\n    (thickness 1.6)\n  )"));

        let reparsed = PcbCodec::decode(&text).unwrap();
        assert_eq!(reparsed, board);
    }

    #[test]
    fn test_back_side_and_rotation() {
        let text = r#"(kicad_pcb (version 20221018)
  (footprint "Capacitor_SMD:C_0805" (layer "B.Cu") (at 30 40 90)
    (fp_text reference "C1" (at 0 -2 90) (layer "B.SilkS"))
  )
)"#;
        let board = PcbCodec::decode(text).unwrap();
        let fp = board.footprints().next().unwrap();
        assert_eq!(fp.side, Side::Back);
        assert_eq!(fp.position, Position::with_angle(30.0, 40.0, 90.0));
        assert_eq!(fp.value(), None);
    }

    #[test]
    fn test_property_labels() {
        let text = r#"(kicad_pcb (version 20240108)
  (footprint "LED_SMD:LED_0603" (layer "F.Cu") (uuid "a5c5d6e7-0000-4000-8000-000000000001") (at 5 5 0)
    (property "Reference" "D1" (at 0 -1.5 0) (layer "F.SilkS") (uuid "a5c5d6e7-0000-4000-8000-000000000002")
      (effects (font (size 1 1) (thickness 0.15)))
    )
    (property "Value" "LED" (at 0 1.5 0) (layer "F.Fab") (uuid "a5c5d6e7-0000-4000-8000-000000000003")
      (effects (font (size 1 1) (thickness 0.15)))
    )
    (property "Datasheet" "" (at 0 0 0) (layer "F.Fab") hide (uuid "a5c5d6e7-0000-4000-8000-000000000004"))
  )
)
"#;
        let board = PcbCodec::decode(text).unwrap();
        let fp = board.footprints().next().unwrap();
        assert_eq!(fp.reference(), Some("D1"));
        assert_eq!(fp.value(), Some("LED"));
        assert_eq!(fp.text_items().count(), 2);
        assert!(fp.text_items().all(|t| t.form == TextForm::Property));
        assert_eq!(PcbCodec::encode(&board), text);
    }

    #[test]
    fn test_legacy_module() {
        let text = "(kicad_pcb (version 20171130) (host pcbnew 5.1.9)\n  (module Resistor_SMD:R_0603 (layer B.Cu) (tedit 5B301BBD) (at 1 2 180)\n    (fp_text reference R7 (at 0 -1.43) (layer B.SilkS))\n    (fp_text value 4k7 (at 0 1.43) (layer B.Fab))\n  )\n)\n";
        let board = PcbCodec::decode(text).unwrap();
        let fp = board.footprints().next().unwrap();
        assert_eq!(fp.keyword, FootprintKeyword::Module);
        assert_eq!(fp.library_ref.as_deref(), Some("Resistor_SMD:R_0603"));
        assert_eq!(fp.side, Side::Back);
        assert_eq!(fp.reference(), Some("R7"));
        assert_eq!(fp.value(), Some("4k7"));
        assert_eq!(PcbCodec::encode(&board), text);
    }

    #[test]
    fn test_unknown_sections_are_accepted() {
        let text = "(kicad_pcb (version 20991231) (future_section (a 1) (b \"x\")))";
        let board = PcbCodec::decode(text).unwrap();
        assert_eq!(board.footprint_count(), 0);
        assert!(board.section("future_section").is_some());
        assert_eq!(PcbCodec::encode(&board), text);
    }

    #[test]
    fn test_malformed_documents_are_rejected() {
        assert!(matches!(
            PcbCodec::decode("(kicad_pcb (version 20221018)"),
            Err(PcbParseError::SExpParse(ParseError::UnexpectedEof))
        ));
        assert!(matches!(
            PcbCodec::decode("(kicad_sch (version 20221018))"),
            Err(PcbParseError::InvalidFormat(_))
        ));
        assert!(PcbCodec::decode("").is_err());
        assert!(PcbCodec::decode("(kicad_pcb (footprint \"X\" (at ten 20)))").is_err());
    }

    #[test]
    fn test_template_round_trip() {
        let template = PcbCodec::create_template();
        assert_eq!(template.footprint_count(), 0);
        assert_eq!(template.thickness(), Some(1.6));
        assert!(template.section("setup").is_some());

        let decoded = PcbCodec::decode(&PcbCodec::encode(&template)).unwrap();
        assert_eq!(decoded, template);
    }

    #[test]
    fn test_new_footprint_encoding() {
        let mut board = PcbCodec::create_template();
        let mut fp = Footprint::new("R_0603", Position::with_angle(10.0, 20.0, 45.0), Side::Back);
        fp.push_text(GraphicTextItem::new(
            TextKind::Reference,
            "R1",
            Position::new(0.0, -2.0),
            Side::Back.silkscreen_layer(),
        ));
        board.push_footprint(fp);

        let text = PcbCodec::encode(&board);
        assert!(text.contains("(footprint \"R_0603\"\n    (layer \"B.Cu\")\n    (at 10 20 45)"));
        assert!(text.contains("(fp_text reference \"R1\" (at 0 -2) (layer \"B.SilkS\"))"));

        let decoded = PcbCodec::decode(&text).unwrap();
        assert_eq!(decoded, board);
    }

    #[test]
    fn test_layer_table() {
        let two = layer_table(2);
        let names: Vec<String> = two
            .as_list()
            .unwrap()
            .iter()
            .skip(1)
            .filter_map(|l| l.as_list().and_then(|l| l.get(1)).and_then(|n| n.as_atom()))
            .map(str::to_string)
            .collect();
        assert_eq!(&names[..2], &["F.Cu", "B.Cu"]);
        assert!(names.contains(&"Edge.Cuts".to_string()));

        let four = layer_table(4);
        let copper = four.to_string();
        assert!(copper.contains("(1 \"In1.Cu\" signal)"));
        assert!(copper.contains("(2 \"In2.Cu\" signal)"));
        assert!(!copper.contains("In3.Cu"));
    }

    #[test]
    fn test_label_child_order_survives_encode() {
        let text = "(kicad_pcb (version 20240108)\n  (footprint \"R_0603\" (layer \"F.Cu\") (uuid \"u1\") (at 5 5 0) (property \"Reference\" \"R1\" (at 0 -1.43 0) (unlocked yes) (layer \"F.SilkS\") (uuid \"u2\")))\n)\n";
        let board = PcbCodec::decode(text).unwrap();
        assert_eq!(PcbCodec::encode(&board), text);

        let reference = board.footprints().next().unwrap().text_items().next().unwrap();
        assert_eq!(reference.layer.as_str(), "F.SilkS");
        assert_eq!(reference.slots, ChildSlots { at: Some(0), layer: Some(2) });
    }

    #[test]
    fn test_edited_label_keeps_child_order() {
        let text = "(kicad_pcb (version 20240108)\n  (footprint \"R_0603\" (uuid \"u1\") (at 5 5 0) (layer \"F.Cu\") (property \"Reference\" \"R1\" (at 0 -1.43 0) (unlocked yes) (layer \"F.SilkS\" knockout)))\n)\n";
        let mut board = PcbCodec::decode(text).unwrap();
        board.footprints_mut().next().unwrap().position = Position::new(6.0, 5.0);

        let encoded = PcbCodec::encode(&board);
        let reparsed = SExpParser::new(&encoded).parse().unwrap();
        let fp = reparsed.get("footprint").unwrap();
        let heads: Vec<_> = fp
            .as_list()
            .unwrap()
            .iter()
            .filter_map(|child| child.head())
            .collect();
        assert_eq!(heads, vec!["uuid", "at", "layer", "property"]);

        let property = fp.get("property").unwrap();
        let heads: Vec<_> = property
            .as_list()
            .unwrap()
            .iter()
            .filter_map(|child| child.head())
            .collect();
        assert_eq!(heads, vec!["at", "unlocked", "layer"]);
        assert!(encoded.contains("(layer \"F.SilkS\" knockout)"));
    }

    #[test]
    fn test_footprint_without_layer_is_not_given_one() {
        let text = "(kicad_pcb (version 20221018)\n  (footprint \"X\" (at 1 2))\n)\n";
        let mut board = PcbCodec::decode(text).unwrap();
        assert_eq!(PcbCodec::encode(&board), text);

        let fp = board.footprints_mut().next().unwrap();
        assert_eq!(fp.side, Side::Front);
        fp.position = Position::new(3.0, 4.0);
        assert_eq!(
            PcbCodec::encode(&board),
            "(kicad_pcb (version 20221018)\n  (footprint \"X\" (at 3 4))\n)\n"
        );

        board.footprints_mut().next().unwrap().side = Side::Back;
        assert!(PcbCodec::encode(&board).contains("(footprint \"X\" (layer \"B.Cu\") (at 3 4))"));
    }
}
