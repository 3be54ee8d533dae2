use crate::Burner;
use crate::assemble::BurnSummary;
use crate::error::BurnError;
use crate::field::{Field, FieldContent};
use crate::render::FieldDiagnostic;
use crate::request::{SignRequest, SignResponse, parse_sign_request};
use crate::store::DocumentStore;
use fieldburn_audit::{AuditRecord, AuditSink, AuditedField, fingerprint};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

/// Matches the JSON body limit of the HTTP front end.
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct SignOutcome {
    pub response: SignResponse,
    pub diagnostics: Vec<FieldDiagnostic>,
    pub summary: BurnSummary,
}

/// Load, burn, save, audit. The store is written only after a successful
/// burn, and the audit sink only after a successful save.
pub struct SignService {
    burner: Burner,
    store: Box<dyn DocumentStore>,
    audit: Option<Box<dyn AuditSink>>,
    max_request_bytes: usize,
}

impl SignService {
    pub fn new(burner: Burner, store: impl DocumentStore + 'static) -> Self {
        Self {
            burner,
            store: Box::new(store),
            audit: None,
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
        }
    }

    pub fn with_audit(mut self, sink: impl AuditSink + 'static) -> Self {
        self.audit = Some(Box::new(sink));
        self
    }

    pub fn with_max_request_bytes(mut self, limit: usize) -> Result<Self, BurnError> {
        if limit == 0 {
            return Err(BurnError::InvalidConfiguration(
                "max request bytes must be > 0".to_string(),
            ));
        }
        self.max_request_bytes = limit;
        Ok(self)
    }

    pub fn sign_json(&self, body: &[u8]) -> Result<SignOutcome, BurnError> {
        if body.len() > self.max_request_bytes {
            return Err(BurnError::Request(format!(
                "request body of {} bytes exceeds limit of {}",
                body.len(),
                self.max_request_bytes
            )));
        }
        let request = parse_sign_request(body)?;
        self.sign(&request)
    }

    pub fn sign(&self, request: &SignRequest) -> Result<SignOutcome, BurnError> {
        if request.document_id.trim().is_empty() {
            return Err(BurnError::validation("document id cannot be empty"));
        }
        let burn_request = request.to_burn_request()?;
        let base = self.store.load(&request.document_id)?;
        let result = self.burner.burn(&base, &burn_request)?;

        let output_id = self.store.derived_identity(&request.document_id);
        let url = self.store.save(&output_id, &result.bytes)?;
        info!(
            document = %request.document_id,
            output = %output_id,
            rendered = result.summary.rendered,
            "document signed"
        );

        if let Some(sink) = &self.audit {
            let record = AuditRecord {
                document_id: request.document_id.clone(),
                original_hash: result.original_hash.clone(),
                result_hash: result.result_hash.clone(),
                fields: burn_request.fields.iter().map(audited_field).collect(),
                created_at_ms: now_ms(),
            };
            if let Err(err) = sink.record(&record) {
                warn!(document = %request.document_id, error = %err, "audit write failed");
            }
        }

        Ok(SignOutcome {
            response: SignResponse {
                url,
                original_hash: result.original_hash,
                result_hash: result.result_hash,
            },
            diagnostics: result.diagnostics,
            summary: result.summary,
        })
    }
}

fn audited_field(field: &Field) -> AuditedField {
    let (value, value_sha256) = match &field.content {
        FieldContent::Text(text) | FieldContent::Date(text) => {
            (Some(Value::String(text.clone())), None)
        }
        FieldContent::Radio(checked) => (Some(Value::Bool(*checked)), None),
        FieldContent::Signature(bytes) | FieldContent::Image(bytes) => {
            if bytes.is_empty() {
                (None, None)
            } else {
                (None, Some(fingerprint(bytes)))
            }
        }
    };
    AuditedField {
        kind: field.kind().as_str().to_string(),
        page_index: field.page_index,
        rect: field.rect.as_array(),
        value,
        value_sha256,
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
