use crate::field::FieldContent;
use crate::fit::ImageFit;
use crate::pdf::{CircleStyle, PageHandle, StandardFont, encode_winansi};
use crate::types::{Color, PageRect};
use serde::Serialize;

pub const TEXT_FONT: StandardFont = StandardFont::Helvetica;
pub const TEXT_SIZE: f64 = 11.0;
pub const TEXT_LEFT_PAD: f64 = 4.0;
pub const TEXT_BASELINE_OFFSET: f64 = 6.0;
pub const RADIO_BORDER_WIDTH: f64 = 2.0;
const RADIO_RADIUS_DIVISOR: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// No decoder in the chain accepted a raster payload.
    DecodeError,
    /// Raster decoded to a zero-sized image.
    DegenerateRaster,
    /// Text was drawn with unrepresentable characters replaced.
    LossyText,
    /// The page rejected the drawing (malformed resources).
    DrawFailed,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::DecodeError => "decode_error",
            DiagnosticKind::DegenerateRaster => "degenerate_raster",
            DiagnosticKind::LossyText => "lossy_text",
            DiagnosticKind::DrawFailed => "draw_failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDiagnostic {
    pub field_index: usize,
    pub kind: DiagnosticKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Rendered,
    /// Value not provided yet.
    Empty,
    Failed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Rendered => "rendered",
            Outcome::Empty => "empty",
            Outcome::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub kind: DiagnosticKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldReport {
    pub outcome: Outcome,
    pub note: Option<Note>,
}

impl FieldReport {
    fn rendered() -> Self {
        Self {
            outcome: Outcome::Rendered,
            note: None,
        }
    }

    fn empty() -> Self {
        Self {
            outcome: Outcome::Empty,
            note: None,
        }
    }

    fn failed(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Failed,
            note: Some(Note {
                kind,
                message: message.into(),
            }),
        }
    }
}

/// Draws one field into `page` at `rect`. Never fails; problems come back
/// in the report and leave the page untouched for this field.
pub fn render_field(page: &mut PageHandle<'_>, content: &FieldContent, rect: PageRect) -> FieldReport {
    match content {
        FieldContent::Text(text) | FieldContent::Date(text) => render_text(page, text, rect),
        FieldContent::Signature(payload) | FieldContent::Image(payload) => {
            render_raster(page, payload, rect)
        }
        FieldContent::Radio(checked) => render_radio(page, *checked, rect),
    }
}

fn render_text(page: &mut PageHandle<'_>, text: &str, rect: PageRect) -> FieldReport {
    let line = single_line(text);
    if line.is_empty() {
        return FieldReport::empty();
    }
    let encoded = encode_winansi(&line);
    let x = rect.x + TEXT_LEFT_PAD;
    let y = rect.y + rect.height / 2.0 - TEXT_BASELINE_OFFSET;
    if let Err(err) = page.draw_text(x, y, TEXT_FONT, TEXT_SIZE, Color::BLACK, &encoded.bytes) {
        return FieldReport::failed(DiagnosticKind::DrawFailed, err.to_string());
    }
    let mut report = FieldReport::rendered();
    if encoded.replaced > 0 {
        report.note = Some(Note {
            kind: DiagnosticKind::LossyText,
            message: format!(
                "{} character(s) outside WinAnsi replaced with '?'",
                encoded.replaced
            ),
        });
    }
    report
}

fn render_raster(page: &mut PageHandle<'_>, payload: &[u8], rect: PageRect) -> FieldReport {
    if payload.is_empty() {
        return FieldReport::empty();
    }
    let image = match page.embed_raster(payload) {
        Ok(image) => image,
        Err(err) => return FieldReport::failed(DiagnosticKind::DecodeError, err.to_string()),
    };
    let fit = match ImageFit::resolve(rect.width, rect.height, image.width(), image.height()) {
        Ok(fit) => fit,
        Err(err) => return FieldReport::failed(DiagnosticKind::DegenerateRaster, err.to_string()),
    };
    let placed = PageRect {
        x: rect.x + fit.x_offset,
        y: rect.y + fit.y_offset,
        width: fit.render_width,
        height: fit.render_height,
    };
    match page.draw_image(&image, placed) {
        Ok(()) => FieldReport::rendered(),
        Err(err) => FieldReport::failed(DiagnosticKind::DrawFailed, err.to_string()),
    }
}

fn render_radio(page: &mut PageHandle<'_>, checked: bool, rect: PageRect) -> FieldReport {
    let (cx, cy) = rect.center();
    let radius = rect.width.min(rect.height) / RADIO_RADIUS_DIVISOR;
    let style = CircleStyle {
        border_width: RADIO_BORDER_WIDTH,
        border_color: Color::BLACK,
        fill: checked.then_some(Color::BLACK),
    };
    match page.draw_circle(cx, cy, radius, style) {
        Ok(()) => FieldReport::rendered(),
        Err(err) => FieldReport::failed(DiagnosticKind::DrawFailed, err.to_string()),
    }
}

fn single_line(text: &str) -> String {
    text.lines().collect::<Vec<_>>().join(" ").replace('\r', " ")
}
