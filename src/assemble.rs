use crate::debug::BurnTrace;
use crate::error::BurnError;
use crate::field::BurnRequest;
use crate::pdf::{PdfDocument, SerializeOptions};
use crate::render::{FieldDiagnostic, Outcome, render_field};
use crate::transform::to_page_rect;
use crate::types::PageGeometry;
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::collections::BTreeSet;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnSummary {
    pub fields_total: usize,
    pub rendered: usize,
    pub empty: usize,
    pub failed: usize,
    pub pages_touched: Vec<usize>,
}

#[derive(Debug, Clone)]
pub(crate) struct Assembled {
    pub bytes: Vec<u8>,
    pub diagnostics: Vec<FieldDiagnostic>,
    pub summary: BurnSummary,
}

pub(crate) struct AssembleOptions<'a> {
    pub serialize: SerializeOptions,
    pub trace: Option<&'a BurnTrace<'a>>,
}

/// Validates the whole request up front, then renders fields in order.
/// When nothing ends up drawn the base bytes are returned untouched.
#[tracing::instrument(skip_all, fields(base_len = base.len(), fields = request.fields.len()))]
pub(crate) fn assemble(
    base: &[u8],
    request: &BurnRequest,
    options: &AssembleOptions<'_>,
) -> Result<Assembled, BurnError> {
    let mut doc = PdfDocument::parse(base)?;
    let geometry = effective_geometry(&doc, request)?;
    validate_fields(request, doc.page_count())?;

    let mut diagnostics = Vec::new();
    let mut summary = BurnSummary {
        fields_total: request.fields.len(),
        ..BurnSummary::default()
    };
    let mut touched = BTreeSet::new();

    for (index, field) in request.fields.iter().enumerate() {
        let rect = to_page_rect(&field.rect, &geometry[field.page_index]);
        let report = {
            let mut page = doc.page_mut(field.page_index)?;
            render_field(&mut page, &field.content, rect)
        };
        match report.outcome {
            Outcome::Rendered => {
                summary.rendered += 1;
                touched.insert(field.page_index);
            }
            Outcome::Empty => summary.empty += 1,
            Outcome::Failed => summary.failed += 1,
        }
        debug!(
            field = index,
            kind = field.kind().as_str(),
            page = field.page_index,
            outcome = report.outcome.as_str(),
            "field processed"
        );
        if let Some(trace) = options.trace {
            let mut event = Map::new();
            event.insert("index".into(), json!(index));
            event.insert("kind".into(), json!(field.kind().as_str()));
            event.insert("page".into(), json!(field.page_index));
            event.insert("outcome".into(), json!(report.outcome.as_str()));
            if let Some(note) = &report.note {
                event.insert("diagnostic".into(), Value::String(note.kind.as_str().into()));
            }
            trace.log_event("burn.field", event);
            trace.increment(&format!("outcome.{}", report.outcome.as_str()), 1);
            trace.increment(&format!("kind.{}", field.kind().as_str()), 1);
        }
        if let Some(note) = report.note {
            warn!(
                field = index,
                kind = note.kind.as_str(),
                message = %note.message,
                "field diagnostic"
            );
            diagnostics.push(FieldDiagnostic {
                field_index: index,
                kind: note.kind,
                message: note.message,
            });
        }
    }
    summary.pages_touched = touched.into_iter().collect();

    let bytes = if doc.is_modified() {
        doc.serialize(&options.serialize)?
    } else {
        base.to_vec()
    };
    Ok(Assembled {
        bytes,
        diagnostics,
        summary,
    })
}

/// Caller override where present, otherwise the page's own box.
fn effective_geometry(
    doc: &PdfDocument,
    request: &BurnRequest,
) -> Result<Vec<PageGeometry>, BurnError> {
    for (page, override_geometry) in request.page_geometry.iter().enumerate() {
        let Some(geometry) = override_geometry else {
            continue;
        };
        if !geometry.is_valid() {
            return Err(BurnError::validation(format!(
                "page size override for page {} must be positive and finite (width={}, height={})",
                page, geometry.width, geometry.height
            )));
        }
    }
    (0..doc.page_count())
        .map(|page| match request.geometry_override(page) {
            Some(geometry) => Ok(geometry),
            None => doc.page_geometry(page),
        })
        .collect()
}

fn validate_fields(request: &BurnRequest, page_count: usize) -> Result<(), BurnError> {
    for (index, field) in request.fields.iter().enumerate() {
        if field.page_index >= page_count {
            return Err(BurnError::field_validation(
                index,
                format!(
                    "page index {} out of range (allowed 0..{})",
                    field.page_index,
                    page_count - 1
                ),
            ));
        }
        if let Some(message) = field.rect.validation_error() {
            return Err(BurnError::field_validation(index, message));
        }
    }
    Ok(())
}
