//! End-to-end flattening against a multi-page document

mod common;

use common::{create_test_pdf, page_operations};
use lopdf::Document;
use pretty_assertions::assert_eq;
use signmark_core::capture::InkPad;
use signmark_core::config::{InkConfig, MarkSizes, TextConfig};
use signmark_core::{flatten, AnnotationPatch, AnnotationSet, DocPoint, MarkKind};

fn signed_ink() -> String {
    let mut pad = InkPad::new(&InkConfig::default());
    pad.pointer_down(20.0, 90.0);
    pad.pointer_move(480.0, 90.0);
    pad.pointer_up();
    pad.save().unwrap()
}

#[test]
fn test_initials_flatten_onto_every_page() {
    let pdf = create_test_pdf(3);
    let (set, _) = AnnotationSet::new().create(
        MarkKind::Initial,
        1,
        DocPoint::new(500.0, 700.0),
        3,
        1_000,
        &MarkSizes::default(),
    );
    let set = set.broadcast_content(MarkKind::Initial, &signed_ink());

    let out = flatten(&pdf, &set, &TextConfig::default()).unwrap();
    let doc = Document::load_mem(&out).unwrap();
    assert_eq!(doc.get_pages().len(), 3);

    for page in 1..=3 {
        let ops = page_operations(&out, page);
        let draws: Vec<_> = ops.iter().filter(|op| op.operator == "Do").collect();
        assert_eq!(draws.len(), 1, "page {} should draw one image", page);
        assert_eq!(
            draws[0].operands[0].as_name().unwrap(),
            format!("SmIm{}", 1_000 + page as u64).as_bytes()
        );
    }
}

#[test]
fn test_original_content_is_isolated_in_q_block() {
    let pdf = create_test_pdf(1);
    let (set, _) = AnnotationSet::new().create(
        MarkKind::Text,
        1,
        DocPoint::new(10.0, 20.0),
        1,
        1,
        &MarkSizes::default(),
    );
    let set = set.update(1, &AnnotationPatch::text("Hi")).unwrap();

    let out = flatten(&pdf, &set, &TextConfig::default()).unwrap();
    let ops: Vec<String> = page_operations(&out, 1)
        .into_iter()
        .map(|op| op.operator)
        .collect();

    // q, original cm..ET, Q, then our text block
    assert_eq!(ops.first().map(String::as_str), Some("q"));
    let close = ops.iter().position(|op| op == "Q").unwrap();
    let appended = &ops[close + 1..];
    assert_eq!(appended.first().map(String::as_str), Some("BT"));
    assert!(appended.iter().any(|op| op == "Tj"));
}

#[test]
fn test_input_bytes_unchanged_and_output_reloads() {
    let pdf = create_test_pdf(2);
    let original = pdf.clone();
    let (set, _) = AnnotationSet::new().create(
        MarkKind::Signature,
        2,
        DocPoint::new(72.0, 600.0),
        2,
        9,
        &MarkSizes::default(),
    );
    let set = set
        .update(9, &AnnotationPatch::content(signed_ink()))
        .unwrap();

    let out = flatten(&pdf, &set, &TextConfig::default()).unwrap();
    assert_eq!(pdf, original);
    assert!(out.starts_with(b"%PDF-"));
    // Page 1 had nothing to draw
    assert!(page_operations(&out, 1).iter().all(|op| op.operator != "Do"));
    assert!(page_operations(&out, 2).iter().any(|op| op.operator == "Do"));
}

#[test]
fn test_long_text_wraps_inside_box() {
    let pdf = create_test_pdf(1);
    let (set, _) = AnnotationSet::new().create(
        MarkKind::Text,
        1,
        DocPoint::new(50.0, 50.0),
        1,
        4,
        &MarkSizes::default(),
    );
    let set = set
        .update(
            4,
            &AnnotationPatch::text("I agree to the terms and conditions set out in this lease"),
        )
        .unwrap();

    let out = flatten(&pdf, &set, &TextConfig::default()).unwrap();
    let lines = page_operations(&out, 1)
        .iter()
        .filter(|op| op.operator == "Tj")
        .count();
    // One original line plus the wrapped annotation
    assert!(lines > 2, "expected wrapping, got {} text runs", lines);
}
