//! Document table rendering.
//!
//! [`render_document`] is a pure function of a [`DocumentSnapshot`]: it
//! builds the per-sentence topic labels from the sketch spans, derives a
//! highlight background per sentence from the coefficient vector, and
//! returns either a placeholder (no sentences yet) or a table of rows.
//! The result can be printed to a terminal or emitted as HTML.

use colored::*;

use crate::error::WandError;
use crate::protocol::{DocumentSnapshot, SketchSpan};

/// Coefficients at or below this are treated as "not highlighted".
pub const MIN_VISIBLE_DENSITY: f64 = 0.0001;
/// Any visible coefficient is lifted to at least this density.
pub const DENSITY_FLOOR: f64 = 0.3;

pub const HEADERS: [&str; 3] = ["#", "Sentence", "Sketch Topics"];
pub const PLACEHOLDER: &str = "No document yet.";

// ---------------------------------------------------------------------------
// Colors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Fully highlighted sentences get this background.
pub const DEFAULT_HIGHLIGHT_BASE: Rgb = Rgb::new(70, 130, 180);
pub const WHITE: Rgb = Rgb::new(255, 255, 255);

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// Parse `#rrggbb` or `rrggbb`.
    pub fn from_hex(s: &str) -> Result<Self, WandError> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(WandError::ConfigParse(format!(
                "color must be #rrggbb, got {s:?}"
            )));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| WandError::ConfigParse(format!("color {s:?}: {e}")))
        };
        Ok(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Sum of channels, used to compare how close to white a color is.
    pub fn whiteness(self) -> u16 {
        self.r as u16 + self.g as u16 + self.b as u16
    }
}

/// Lift any non-negligible coefficient to a perceptible minimum.
///
/// Non-finite input counts as zero; finite input is clamped to `[0, 1]`.
pub fn effective_density(raw: f64) -> f64 {
    let density = if raw.is_finite() { raw.clamp(0.0, 1.0) } else { 0.0 };
    if density > MIN_VISIBLE_DENSITY {
        (DENSITY_FLOOR + density * (1.0 - DENSITY_FLOOR)).min(1.0)
    } else {
        density
    }
}

/// Interpolate between `base` (density 1) and white (density 0).
pub fn highlight_color(base: Rgb, raw_density: f64) -> Rgb {
    let density = effective_density(raw_density);
    let mix = |c: u8| -> u8 {
        let lift = ((255 - c) as f64 * (1.0 - density)).floor() as u8;
        c + lift
    };
    Rgb::new(mix(base.r), mix(base.g), mix(base.b))
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Topic labels per sentence index, in span declaration order.
///
/// Indices past the end of the document are dropped, and spans with
/// `start > end` cover nothing.
pub fn topic_labels(doc_len: usize, sketch: &[SketchSpan]) -> Vec<Vec<String>> {
    let mut labels = vec![Vec::new(); doc_len];
    for span in sketch {
        if span.start > span.end {
            continue;
        }
        let last = span.end.min(doc_len.saturating_sub(1));
        for slot in labels.iter_mut().take(last + 1).skip(span.start) {
            slot.push(span.topic.clone());
        }
    }
    labels
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub index: usize,
    pub sentence: String,
    pub topics: Vec<String>,
    /// Applied to the index and sentence cells only.
    pub background: Option<Rgb>,
}

impl TableRow {
    pub fn index_cell(&self) -> String {
        format!("[{}]", self.index)
    }

    /// Topics quoted and comma-joined; empty when the sentence has none.
    pub fn topics_cell(&self) -> String {
        self.topics
            .iter()
            .map(|t| format!("'{t}'"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentTable {
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderedDocument {
    Placeholder,
    Table(DocumentTable),
}

/// Build the table for `snapshot`, highlighting against `base`.
pub fn render_document(snapshot: &DocumentSnapshot, base: Rgb) -> RenderedDocument {
    if snapshot.document.is_empty() {
        return RenderedDocument::Placeholder;
    }

    let labels = topic_labels(snapshot.document.len(), &snapshot.sketch);
    let rows = snapshot
        .document
        .iter()
        .zip(labels)
        .enumerate()
        .map(|(index, (sentence, topics))| {
            let background = snapshot.highlight_coeff.as_ref().map(|coeff| {
                highlight_color(base, coeff.get(index).copied().unwrap_or(0.0))
            });
            TableRow {
                index,
                sentence: sentence.clone(),
                topics,
                background,
            }
        })
        .collect();

    RenderedDocument::Table(DocumentTable { rows })
}

impl RenderedDocument {
    /// Plain-text table with optional true-color backgrounds.
    pub fn to_terminal(&self, color: bool) -> String {
        let table = match self {
            RenderedDocument::Placeholder => return PLACEHOLDER.to_string(),
            RenderedDocument::Table(table) => table,
        };

        let index_w = table
            .rows
            .iter()
            .map(|r| r.index_cell().len())
            .max()
            .unwrap_or(0)
            .max(HEADERS[0].len());
        let sentence_w = table
            .rows
            .iter()
            .map(|r| r.sentence.chars().count())
            .max()
            .unwrap_or(0)
            .max(HEADERS[1].len());

        let mut out = String::new();
        let header = format!(
            "{:<index_w$}  {:<sentence_w$}  {}",
            HEADERS[0], HEADERS[1], HEADERS[2]
        );
        if color {
            out.push_str(&header.bold().to_string());
        } else {
            out.push_str(&header);
        }

        for row in &table.rows {
            let index = format!("{:<index_w$}", row.index_cell());
            let sentence = format!("{:<sentence_w$}", row.sentence);
            let topics = row.topics_cell();
            out.push('\n');
            match (color, row.background) {
                (true, Some(bg)) => {
                    out.push_str(&format!(
                        "{}  {}  {}",
                        index.black().on_truecolor(bg.r, bg.g, bg.b),
                        sentence.black().on_truecolor(bg.r, bg.g, bg.b),
                        topics.italic()
                    ));
                }
                (true, None) => {
                    out.push_str(&format!("{index}  {sentence}  {}", topics.italic()));
                }
                (false, _) => {
                    out.push_str(&format!("{index}  {sentence}  {topics}"));
                }
            }
        }
        out
    }

    /// HTML fragment with the `row{i}` / `cell{i}-{j}` ids the web client used.
    pub fn to_html(&self) -> String {
        let table = match self {
            RenderedDocument::Placeholder => return format!("<div>{PLACEHOLDER}</div>"),
            RenderedDocument::Table(table) => table,
        };

        let mut out = String::from("<table id=\"simple-board\"><tbody><tr id=\"row00\">");
        for (j, title) in HEADERS.iter().enumerate() {
            out.push_str(&format!("<td id=\"cell00{j}\"><b>{}</b></td>", escape_html(title)));
        }
        out.push_str("</tr>");

        for row in &table.rows {
            let style = row
                .background
                .map(|bg| format!(" style=\"background-color:{}\"", bg.to_hex()))
                .unwrap_or_default();
            let i = row.index;
            out.push_str(&format!("<tr id=\"row{i}\">"));
            out.push_str(&format!(
                "<td id=\"cell{i}-0\"{style}>{}</td>",
                row.index_cell()
            ));
            out.push_str(&format!(
                "<td id=\"cell{i}-1\"{style}>{}</td>",
                escape_html(&row.sentence)
            ));
            out.push_str(&format!(
                "<td id=\"cell{i}-2\"><i>{}</i></td>",
                escape_html(&row.topics_cell())
            ));
            out.push_str("</tr>");
        }
        out.push_str("</tbody></table>");
        out
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
