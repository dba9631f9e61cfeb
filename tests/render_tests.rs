//! Tests for document rendering: topic columns, highlight colors, and
//! placeholder handling.

use creative_wand::render::{highlight_color, topic_labels, DEFAULT_HIGHLIGHT_BASE, WHITE};
use creative_wand::*;
use proptest::prelude::*;

fn snapshot(doc: &[&str], sketch: &[(usize, usize, &str)], coeff: Option<Vec<f64>>) -> DocumentSnapshot {
    DocumentSnapshot {
        document: doc.iter().map(|s| s.to_string()).collect(),
        sketch: sketch
            .iter()
            .map(|&(start, end, topic)| SketchSpan {
                start,
                end,
                topic: topic.to_string(),
            })
            .collect(),
        highlight_coeff: coeff,
    }
}

fn table(rendered: RenderedDocument) -> render::DocumentTable {
    match rendered {
        RenderedDocument::Table(t) => t,
        RenderedDocument::Placeholder => panic!("expected a table"),
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_spanning_topic_without_coefficients() {
    let snap = snapshot(&["A cat sat.", "It slept."], &[(0, 1, "cats")], None);
    let t = table(render_document(&snap, DEFAULT_HIGHLIGHT_BASE));
    assert_eq!(t.rows.len(), 2);
    for row in &t.rows {
        assert_eq!(row.topics_cell(), "'cats'");
        assert!(row.background.is_none());
    }
    assert_eq!(t.rows[0].sentence, "A cat sat.");
    assert_eq!(t.rows[1].index, 1);
}

#[test]
fn test_coefficients_zero_and_point_nine() {
    let snap = snapshot(&["A cat sat.", "It slept."], &[(0, 1, "cats")], Some(vec![0.0, 0.9]));
    let t = table(render_document(&snap, DEFAULT_HIGHLIGHT_BASE));
    assert_eq!(t.rows[0].background, Some(WHITE));

    let bg = t.rows[1].background.unwrap();
    // 0.3 + 0.9 * 0.7 = 0.93, so each channel sits 7% of the way to white.
    let expected = |c: u8| c + ((255 - c) as f64 * 0.07).floor() as u8;
    assert_eq!(bg.r, expected(DEFAULT_HIGHLIGHT_BASE.r));
    assert_eq!(bg.g, expected(DEFAULT_HIGHLIGHT_BASE.g));
    assert_eq!(bg.b, expected(DEFAULT_HIGHLIGHT_BASE.b));
}

#[test]
fn test_tiny_coefficient_stays_white_ish() {
    // At or below the visibility threshold there is no lift to 0.3.
    let c = highlight_color(DEFAULT_HIGHLIGHT_BASE, 0.0001);
    assert!(c.whiteness() >= WHITE.whiteness() - 3);
    let visible = highlight_color(DEFAULT_HIGHLIGHT_BASE, 0.0002);
    assert!(visible.whiteness() < WHITE.whiteness() - 100);
}

#[test]
fn test_empty_document_renders_placeholder() {
    let snap = snapshot(&[], &[], Some(vec![0.5]));
    assert_eq!(render_document(&snap, DEFAULT_HIGHLIGHT_BASE), RenderedDocument::Placeholder);
}

#[test]
fn test_long_coefficient_vector_extra_entries_ignored() {
    let snap = snapshot(&["a"], &[], Some(vec![1.0, 0.0, 0.0]));
    let t = table(render_document(&snap, DEFAULT_HIGHLIGHT_BASE));
    assert_eq!(t.rows.len(), 1);
    assert_eq!(t.rows[0].background, Some(DEFAULT_HIGHLIGHT_BASE));
}

#[test]
fn test_terminal_output_has_header_and_rows() {
    let snap = snapshot(&["One.", "Two."], &[(1, 1, "end")], Some(vec![0.0, 1.0]));
    let text = render_document(&snap, DEFAULT_HIGHLIGHT_BASE).to_terminal(false);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("Sentence"));
    assert!(lines[2].ends_with("'end'"));
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

fn arb_snapshot() -> impl Strategy<Value = DocumentSnapshot> {
    (1usize..12).prop_flat_map(|len| {
        let spans = prop::collection::vec(
            (0..len, 0..len, "[a-z]{1,6}").prop_map(|(a, b, topic)| SketchSpan {
                start: a.min(b),
                end: a.max(b),
                topic,
            }),
            0..6,
        );
        let coeff = prop::option::of(prop::collection::vec(0.0f64..=1.0, len));
        let doc = prop::collection::vec("[A-Za-z ]{0,20}", len);
        (doc, spans, coeff).prop_map(|(document, sketch, highlight_coeff)| DocumentSnapshot {
            document,
            sketch,
            highlight_coeff,
        })
    })
}

proptest! {
    #[test]
    fn prop_covered_indices_list_every_topic_in_order(snap in arb_snapshot()) {
        let labels = topic_labels(snap.document.len(), &snap.sketch);
        for (i, row_labels) in labels.iter().enumerate() {
            let expected: Vec<String> = snap
                .sketch
                .iter()
                .filter(|s| s.start <= i && i <= s.end)
                .map(|s| s.topic.clone())
                .collect();
            prop_assert_eq!(row_labels, &expected);
        }
    }

    #[test]
    fn prop_rendering_is_idempotent(snap in arb_snapshot()) {
        let first = render_document(&snap, DEFAULT_HIGHLIGHT_BASE);
        let second = render_document(&snap, DEFAULT_HIGHLIGHT_BASE);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_one_row_per_sentence(snap in arb_snapshot()) {
        let t = table(render_document(&snap, DEFAULT_HIGHLIGHT_BASE));
        prop_assert_eq!(t.rows.len(), snap.document.len());
        for (i, row) in t.rows.iter().enumerate() {
            prop_assert_eq!(row.index, i);
            prop_assert_eq!(row.background.is_some(), snap.highlight_coeff.is_some());
        }
    }

    #[test]
    fn prop_whiteness_never_increases_with_density(a in 0.0f64..=1.0, b in 0.0f64..=1.0, r in any::<u8>(), g in any::<u8>(), bl in any::<u8>()) {
        let base = Rgb::new(r, g, bl);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let c_lo = highlight_color(base, lo);
        let c_hi = highlight_color(base, hi);
        prop_assert!(c_hi.r <= c_lo.r && c_hi.g <= c_lo.g && c_hi.b <= c_lo.b);
    }

    #[test]
    fn prop_endpoints_are_white_and_base(r in any::<u8>(), g in any::<u8>(), b in any::<u8>()) {
        let base = Rgb::new(r, g, b);
        prop_assert_eq!(highlight_color(base, 0.0), WHITE);
        prop_assert_eq!(highlight_color(base, 1.0), base);
    }
}
