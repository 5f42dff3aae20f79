//! End-to-end conversion tests.

use std::collections::HashMap;

use ecow::EcoString;

use crate::ir::{self, Mark, Node};
use crate::model::{Block, DocumentModel, Paragraph, ParagraphChild, RunChild};
use crate::options::{
    CitationResolver, FootnoteMode, ImageBuffer, ImageResolver, PageOptions,
};
use crate::{DocxSerializer, Result};

/// Smallest valid PNG, one transparent pixel.
const PNG_1X1: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

struct StaticImages;

impl ImageResolver for StaticImages {
    fn resolve(&self, src: &str) -> Result<ImageBuffer> {
        if src == "missing.png" {
            return Err("not found".into());
        }
        Ok(ImageBuffer {
            data: PNG_1X1.to_vec(),
            width: 200,
            height: 100,
        })
    }
}

struct FailingCitations;

impl CitationResolver for FailingCitations {
    fn citation(&self, _id: &str, _format: &str) -> Result<EcoString> {
        Err("lookup failed".into())
    }

    fn bibliography(&self, _format: &str) -> Result<Vec<(EcoString, EcoString)>> {
        Err("lookup failed".into())
    }
}

fn serializer() -> DocxSerializer {
    DocxSerializer::new(StaticImages)
}

fn convert(children: Vec<Node>) -> DocumentModel {
    serializer().convert(&ir::Doc { children }).unwrap()
}

fn paragraphs(model: &DocumentModel) -> Vec<&Paragraph> {
    model
        .sections
        .iter()
        .flat_map(|s| &s.children)
        .filter_map(|b| match b {
            Block::Paragraph(p) => Some(p),
            _ => None,
        })
        .collect()
}

fn para(text: &str) -> Node {
    Node::paragraph(vec![Node::text(text)])
}

#[test]
fn sibling_lists_get_distinct_references() {
    let model = convert(vec![
        Node::BulletList {
            children: vec![Node::ListItem {
                children: vec![
                    para("outer"),
                    Node::OrderedList {
                        children: vec![Node::ListItem {
                            children: vec![para("inner")],
                        }],
                    },
                ],
            }],
        },
        Node::OrderedList {
            children: vec![Node::ListItem {
                children: vec![para("sibling")],
            }],
        },
    ]);

    assert_eq!(model.numbering.len(), 2);
    assert_eq!(model.numbering[0].reference, "list-1");
    assert_eq!(model.numbering[1].reference, "list-2");

    let numbered: Vec<_> = paragraphs(&model)
        .into_iter()
        .filter_map(|p| p.options.numbering.clone())
        .collect();
    assert_eq!(numbered.len(), 3);
    assert_eq!(numbered[0].reference, "list-1");
    assert_eq!(numbered[0].level, 0);
    // The nested ordered list reuses the ancestor bullet reference.
    assert_eq!(numbered[1].reference, "list-1");
    assert_eq!(numbered[1].level, 1);
    assert_eq!(numbered[2].reference, "list-2");
    assert_eq!(numbered[2].level, 0);
}

#[test]
fn later_marks_win_per_field() {
    let model = convert(vec![Node::paragraph(vec![Node::Text {
        text: "x".into(),
        marks: vec![
            Mark::Color {
                color: "#ff0000".into(),
            },
            Mark::Bold,
            Mark::Color {
                color: "#00ff00".into(),
            },
        ],
    }])]);
    let paras = paragraphs(&model);
    let ParagraphChild::Run(run) = &paras[0].children[0] else {
        panic!("expected a run");
    };
    assert_eq!(run.format.bold, Some(true));
    assert_eq!(run.format.color.as_deref(), Some("00ff00"));
}

#[test]
fn table_cell_width_from_first_row() {
    let cell = |text: &str| ir::TableCell {
        header: false,
        colspan: 1,
        rowspan: 1,
        children: vec![para(text)],
    };
    let model = convert(vec![Node::Table {
        rows: vec![
            ir::TableRow {
                cells: vec![cell("a"), cell("b"), cell("c")],
            },
            ir::TableRow {
                cells: vec![cell("d"), cell("e")],
            },
        ],
    }]);
    let table = model
        .sections
        .iter()
        .flat_map(|s| &s.children)
        .find_map(|b| match b {
            Block::Table(t) => Some(t),
            _ => None,
        })
        .unwrap();
    for row in &table.rows {
        for cell in &row.cells {
            assert!((cell.width_percent - 33.33).abs() < 1e-4);
        }
    }
}

#[test]
fn table_cells_narrow_the_image_budget() {
    let model = convert(vec![Node::Table {
        rows: vec![ir::TableRow {
            cells: vec![
                ir::TableCell {
                    header: false,
                    colspan: 1,
                    rowspan: 1,
                    children: vec![Node::Image {
                        src: "figure.png".into(),
                        title: "".into(),
                        layout: ir::Align::Center,
                        width_percent: 100.0,
                    }],
                },
                ir::TableCell {
                    header: false,
                    colspan: 1,
                    rowspan: 1,
                    children: vec![para("beside")],
                },
            ],
        }],
    }]);
    let table = model
        .sections
        .iter()
        .flat_map(|s| &s.children)
        .find_map(|b| match b {
            Block::Table(t) => Some(t),
            _ => None,
        })
        .unwrap();
    let img = table.rows[0].cells[0]
        .blocks
        .iter()
        .find_map(|b| match b {
            Block::Paragraph(p) => p.children.iter().find_map(|c| match c {
                ParagraphChild::Run(run) => run.children.iter().find_map(|rc| match rc {
                    RunChild::Image(img) => Some(img),
                    _ => None,
                }),
                _ => None,
            }),
            _ => None,
        })
        .unwrap();
    // Half of the 600px budget for a two-cell row.
    assert_eq!(img.width, 300);
    assert_eq!(img.height, 150);
}

#[test]
fn cell_spans_pass_through() {
    let model = convert(vec![Node::Table {
        rows: vec![ir::TableRow {
            cells: vec![
                ir::TableCell {
                    header: false,
                    colspan: 2,
                    rowspan: 3,
                    children: vec![para("wide")],
                },
                ir::TableCell {
                    header: false,
                    colspan: 1,
                    rowspan: 1,
                    children: vec![para("narrow")],
                },
            ],
        }],
    }]);
    let table = model
        .sections
        .iter()
        .flat_map(|s| &s.children)
        .find_map(|b| match b {
            Block::Table(t) => Some(t),
            _ => None,
        })
        .unwrap();
    assert_eq!(table.rows[0].cells[0].colspan, 2);
    assert_eq!(table.rows[0].cells[0].rowspan, 3);
    assert_eq!(table.rows[0].cells[1].colspan, 1);
    assert_eq!(table.rows[0].cells[1].rowspan, 1);
}

#[test]
fn list_item_paragraphs_flatten_with_breaks() {
    let model = convert(vec![Node::BulletList {
        children: vec![Node::ListItem {
            children: vec![para("first"), para("second")],
        }],
    }]);
    let paras = paragraphs(&model);
    let numbered: Vec<_> = paras
        .iter()
        .filter(|p| p.options.numbering.is_some())
        .collect();
    assert_eq!(numbered.len(), 1);
    let children = &numbered[0].children;
    assert_eq!(children.len(), 3);
    let ParagraphChild::Run(joiner) = &children[1] else {
        panic!("expected a break run");
    };
    assert_eq!(joiner.children, vec![RunChild::Break]);
}

#[test]
fn footnote_indices_are_first_encounter_order() {
    let fr = |id: &str| Node::FootnoteRef { id: id.into() };
    let model = serializer()
        .with_footnotes(vec!["one".into(), "two".into(), "three".into(), "four".into()])
        .convert(&ir::Doc {
            children: vec![Node::paragraph(vec![
                fr("a"),
                fr("b"),
                fr("c"),
                fr("a"),
            ])],
        })
        .unwrap();
    let paras = paragraphs(&model);
    let indices: Vec<_> = paras[0]
        .children
        .iter()
        .filter_map(|c| match c {
            ParagraphChild::FootnoteReference(idx) => Some(*idx),
            _ => None,
        })
        .collect();
    assert_eq!(indices, vec![1, 2, 3, 4]);
    assert_eq!(model.footnotes.len(), 4);
    assert_eq!(
        model.footnotes[&1][0].options.style.as_deref(),
        Some("FootnoteList")
    );
}

#[test]
fn column_regions_become_standalone_sections() {
    let model = convert(vec![
        para("before"),
        Node::Columns {
            columns: vec![
                ir::Column {
                    basis: 50.0,
                    children: vec![para("left")],
                },
                ir::Column {
                    basis: 50.0,
                    children: vec![para("right")],
                },
            ],
        },
        para("after"),
    ]);
    assert_eq!(model.sections.len(), 3);
    let cols = model.sections[1].props.columns.as_ref().unwrap();
    assert_eq!(cols.count, 2);
    assert_eq!(cols.widths, vec![50.0, 50.0]);

    let breaks = model.sections[1]
        .children
        .iter()
        .filter(|b| {
            matches!(b, Block::Paragraph(p)
                if p.children.iter().any(|c| matches!(c, ParagraphChild::ColumnBreak)))
        })
        .count();
    assert_eq!(breaks, 1);
}

#[test]
fn column_basis_narrows_the_image_budget() {
    let model = convert(vec![Node::Columns {
        columns: vec![
            ir::Column {
                basis: 50.0,
                children: vec![Node::Image {
                    src: "figure.png".into(),
                    title: "".into(),
                    layout: ir::Align::Center,
                    width_percent: 100.0,
                }],
            },
            ir::Column {
                basis: 50.0,
                children: vec![para("right")],
            },
        ],
    }]);
    let img = paragraphs(&model)
        .iter()
        .flat_map(|p| &p.children)
        .find_map(|c| match c {
            ParagraphChild::Run(run) => run.children.iter().find_map(|rc| match rc {
                RunChild::Image(img) => Some(img),
                _ => None,
            }),
            _ => None,
        })
        .unwrap();
    // Half of the 600px budget for a 50 percent basis.
    assert_eq!(img.width, 300);
    assert_eq!(img.height, 150);
}

#[test]
fn failed_citation_lookup_degrades_in_place() {
    let model = serializer()
        .with_citation_resolver(FailingCitations)
        .convert(&ir::Doc {
            children: vec![Node::paragraph(vec![
                Node::text("before"),
                Node::CitationRef { id: "doe2021".into() },
                Node::text("after"),
            ])],
        })
        .unwrap();
    let paras = paragraphs(&model);
    assert_eq!(paras[0].children.len(), 2);
}

#[test]
fn opaque_custom_node_is_a_schema_mismatch() {
    let err = serializer()
        .convert(&ir::Doc {
            children: vec![Node::Custom {
                type_name: "vendor_widget".into(),
                kind: ir::CustomKind::Opaque,
                children: vec![],
            }],
        })
        .unwrap_err();
    assert!(err.is_schema_mismatch());
}

#[test]
fn custom_containers_recurse_by_default() {
    let model = convert(vec![Node::Custom {
        type_name: "callout".into(),
        kind: ir::CustomKind::Block,
        children: vec![para("inside")],
    }]);
    assert_eq!(paragraphs(&model).len(), 1);
}

#[test]
fn link_inside_link_closes_the_outer_one() {
    let model = convert(vec![Node::paragraph(vec![Node::Link {
        href: "https://a.example".into(),
        children: vec![
            Node::text("a"),
            Node::Link {
                href: "https://b.example".into(),
                children: vec![Node::text("b")],
            },
        ],
    }])]);
    let paras = paragraphs(&model);
    let hrefs: Vec<_> = paras[0]
        .children
        .iter()
        .filter_map(|c| match c {
            ParagraphChild::Hyperlink(h) => Some(h.href.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(hrefs, vec!["https://a.example", "https://b.example"]);
}

#[test]
fn comments_count_from_zero_with_parsed_dates() {
    let model = convert(vec![Node::paragraph(vec![Node::Comment {
        text: "needs a citation".into(),
        create_date: Some("1700000000000".into()),
        children: vec![Node::text("claim")],
    }])]);
    assert_eq!(model.comments.len(), 1);
    assert_eq!(model.comments[0].id, 0);
    assert_eq!(model.comments[0].date.timestamp_millis(), 1_700_000_000_000);

    let paras = paragraphs(&model);
    assert!(matches!(
        paras[0].children[0],
        ParagraphChild::CommentRangeStart(0)
    ));
    assert!(matches!(
        paras[0].children.last(),
        Some(ParagraphChild::CommentReference(0))
    ));
}

#[test]
fn horizontal_rule_breaks_the_next_paragraph() {
    let model = convert(vec![Node::HorizontalRule, para("next page")]);
    let paras = paragraphs(&model);
    assert_eq!(paras.len(), 1);
    assert!(paras[0].options.page_break_before);
}

#[test]
fn full_citation_splits_on_embedded_line_breaks() {
    let mut contents = HashMap::new();
    contents.insert(
        EcoString::from("cite-1"),
        EcoString::from("Doe, J. (2021).\nSecond line."),
    );
    let model = serializer()
        .with_full_cite_contents(contents)
        .convert(&ir::Doc {
            children: vec![Node::paragraph(vec![Node::Citation {
                cite_id: "cite-1".into(),
                full: true,
                children: vec![],
            }])],
        })
        .unwrap();
    let paras = paragraphs(&model);
    assert_eq!(paras[0].children.len(), 2);
    let ParagraphChild::Run(second) = &paras[0].children[1] else {
        panic!("expected a run");
    };
    assert!(second.format.break_before);
}

#[test]
fn zotero_citation_wraps_children_in_a_hyperlink() {
    let model = convert(vec![Node::paragraph(vec![Node::Citation {
        cite_id: "zotero ([Doe 2021](zotero://select/items/XYZ))".into(),
        full: false,
        children: vec![Node::text("(Doe 2021)")],
    }])]);
    let paras = paragraphs(&model);
    let ParagraphChild::Hyperlink(link) = &paras[0].children[0] else {
        panic!("expected a hyperlink");
    };
    assert_eq!(link.href, "zotero://select/items/XYZ");
}

#[test]
fn endnotes_splice_before_the_bibliography() {
    let mut page = PageOptions::default();
    page.footnote_mode = FootnoteMode::BeforeBibliography;
    let model = serializer()
        .with_page_options(page)
        .with_footnotes(vec!["a note body".into()])
        .convert(&ir::Doc {
            children: vec![
                Node::paragraph(vec![
                    Node::text("ref"),
                    Node::FootnoteRef { id: "n1".into() },
                ]),
                Node::Bibliography {
                    children: vec![para("Doe, J. (2021)")],
                },
            ],
        })
        .unwrap();

    let texts: Vec<String> = paragraphs(&model)
        .iter()
        .map(|p| {
            let mut out = String::new();
            for child in &p.children {
                if let ParagraphChild::Run(run) = child {
                    for rc in &run.children {
                        if let RunChild::Text(t) = rc {
                            out.push_str(t);
                        }
                    }
                }
            }
            out
        })
        .collect();
    let footnotes_at = texts.iter().position(|t| t == "Footnotes").unwrap();
    let bibliography_at = texts.iter().position(|t| t == "Bibliography").unwrap();
    assert!(footnotes_at < bibliography_at);
    assert!(texts.iter().any(|t| t.starts_with("1. ")));
    // Endnote content lives in the body, not the footnote map.
    assert!(model.footnotes.is_empty());
}

#[test]
fn dangling_text_lands_before_spliced_endnotes() {
    let mut page = PageOptions::default();
    page.footnote_mode = FootnoteMode::BeforeBibliography;
    let model = serializer()
        .with_page_options(page)
        .with_footnotes(vec!["a note body".into()])
        .convert(&ir::Doc {
            children: vec![
                Node::paragraph(vec![Node::FootnoteRef { id: "n1".into() }]),
                Node::text("dangling"),
                Node::Bibliography {
                    children: vec![para("Doe, J. (2021)")],
                },
            ],
        })
        .unwrap();

    let texts: Vec<String> = paragraphs(&model)
        .iter()
        .map(|p| {
            let mut out = String::new();
            for child in &p.children {
                if let ParagraphChild::Run(run) = child {
                    for rc in &run.children {
                        if let RunChild::Text(t) = rc {
                            out.push_str(t);
                        }
                    }
                }
            }
            out
        })
        .collect();
    let dangling_at = texts.iter().position(|t| t == "dangling").unwrap();
    let footnotes_at = texts.iter().position(|t| t == "Footnotes").unwrap();
    assert!(dangling_at < footnotes_at);
}

#[test]
fn unresolvable_image_degrades_to_nothing() {
    let model = convert(vec![Node::Image {
        src: "missing.png".into(),
        title: "".into(),
        layout: ir::Align::Center,
        width_percent: 100.0,
    }]);
    let paras = paragraphs(&model);
    assert_eq!(paras.len(), 1);
    assert!(paras[0].children.is_empty());
}

#[test]
fn image_scales_to_width_budget() {
    let model = convert(vec![Node::Image {
        src: "figure.png".into(),
        title: "A figure".into(),
        layout: ir::Align::Left,
        width_percent: 50.0,
    }]);
    let paras = paragraphs(&model);
    let ParagraphChild::Run(run) = &paras[0].children[0] else {
        panic!("expected an image run");
    };
    let RunChild::Image(img) = &run.children[0] else {
        panic!("expected image content");
    };
    // Half of the 600px budget, halved again for the 1:2 aspect.
    assert_eq!(img.width, 300);
    assert_eq!(img.height, 150);
    assert_eq!(paras[0].options.alignment, Some(ir::Align::Left));
    // The title renders as an aside after the image paragraph.
    assert_eq!(paras[1].options.style.as_deref(), Some("Aside"));
}

#[test]
fn inline_images_scale_to_the_height_cap() {
    let model = convert(vec![Node::paragraph(vec![
        Node::text("logo "),
        Node::ImageInline {
            src: "logo.png".into(),
            max_height: 50,
        },
        Node::ImageInline {
            src: "logo.png".into(),
            max_height: 0,
        },
    ])]);
    let paras = paragraphs(&model);
    let images: Vec<_> = paras[0]
        .children
        .iter()
        .filter_map(|c| match c {
            ParagraphChild::Run(run) => run.children.iter().find_map(|rc| match rc {
                RunChild::Image(img) => Some(img),
                _ => None,
            }),
            _ => None,
        })
        .collect();
    assert_eq!(images.len(), 2);
    // 2:1 aspect against the 50px cap.
    assert_eq!(images[0].width, 100);
    assert_eq!(images[0].height, 50);
    // No cap keeps the natural size.
    assert_eq!(images[1].width, 200);
    assert_eq!(images[1].height, 100);
}

#[test]
fn caption_labels_carry_a_sequence_bookmark() {
    let model = convert(vec![Node::Caption {
        id: None,
        kind: "Figure".into(),
        children: vec![Node::text("A map of the area")],
    }]);
    let paras = paragraphs(&model);
    assert_eq!(paras[0].options.style.as_deref(), Some("Aside"));
    let ParagraphChild::Bookmark(label) = &paras[0].children[0] else {
        panic!("expected a bookmark label");
    };
    assert_eq!(label.id, "caption-1");
    let ParagraphChild::Run(run) = &label.children[0] else {
        panic!("expected the label run");
    };
    assert_eq!(run.children[0], RunChild::Text("Figure ".into()));
    assert_eq!(run.children[1], RunChild::Sequence("Figure".into()));
    // The caption text follows the label in the same paragraph.
    let ParagraphChild::Run(text) = paras[0].children.last().unwrap() else {
        panic!("expected the caption text");
    };
    assert_eq!(text.children[0], RunChild::Text("A map of the area".into()));
}

#[test]
fn code_block_keeps_lines_in_one_paragraph() {
    let model = convert(vec![Node::CodeBlock {
        text: "fn main() {}\nprintln!();".into(),
    }]);
    let paras = paragraphs(&model);
    assert_eq!(paras[0].options.style.as_deref(), Some("BlockCode"));
    assert_eq!(paras[0].children.len(), 2);
    let ParagraphChild::Run(second) = &paras[0].children[1] else {
        panic!("expected a run");
    };
    assert!(second.format.break_before);
}

#[test]
fn numbered_display_math_lays_out_on_tab_stops() {
    let model = convert(vec![Node::Math {
        tex: "E = mc^2".into(),
        display: true,
        numbered: true,
        id: Some("einstein".into()),
    }]);
    let paras = paragraphs(&model);
    assert_eq!(paras[0].options.tab_stops.len(), 2);
    assert!(paras[0]
        .children
        .iter()
        .any(|c| matches!(c, ParagraphChild::Bookmark(b) if b.id == "einstein")));
    assert!(paras[0]
        .children
        .iter()
        .any(|c| matches!(c, ParagraphChild::Math(m) if m.tex == "E = mc^2")));
}

#[test]
fn write_docx_smoke() {
    let bytes = serializer()
        .convert_to_docx(&ir::Doc {
            children: vec![
                Node::Title {
                    level: 1,
                    children: vec![Node::text("A Document")],
                },
                para("Body text."),
                Node::BulletList {
                    children: vec![Node::ListItem {
                        children: vec![para("item")],
                    }],
                },
            ],
        })
        .unwrap();
    // Zip container magic.
    assert_eq!(&bytes[..2], b"PK");
}
