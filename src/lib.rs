mod assemble;
mod canvas;
mod debug;
mod error;
mod field;
mod fit;
mod pdf;
mod pdfinspect;
mod raster;
mod render;
mod request;
mod service;
mod store;
#[cfg(test)]
mod testutil;
mod transform;
mod types;

use assemble::{AssembleOptions, assemble};
pub use assemble::BurnSummary;
pub use canvas::{Command, PageCanvas};
use debug::{BurnTrace, DebugLogger};
pub use error::{BurnError, ValidationIssue};
pub use field::{BurnRequest, Field, FieldContent, FieldKind};
pub use fieldburn_audit::{
    AuditError, AuditRecord, AuditSink, AuditedField, IntegrityPair, JsonlAuditLog,
    MemoryAuditLog, fingerprint,
};
pub use fit::{FitError, ImageFit};
pub use pdf::{CircleStyle, ImageHandle, PageHandle, PdfDocument, SerializeOptions, StandardFont};
pub use pdfinspect::{
    PdfInspectError, PdfInspectErrorCode, PdfInspectReport, PdfInspectWarning,
    burn_compatibility_issues, inspect_pdf_bytes, inspect_pdf_path,
};
pub use raster::{
    DEFAULT_DECODERS, DecodeAttempt, JpegDecoder, PngDecoder, RasterColorSpace,
    RasterDecodeError, RasterDecoder, RasterFilter, RasterFormat, RasterImage, decode_raster,
    decode_with,
};
pub use render::{DiagnosticKind, FieldDiagnostic, FieldReport, Note, Outcome, render_field};
pub use request::{FieldPayload, SignRequest, SignResponse, decode_raster_payload, parse_sign_request};
pub use service::{DEFAULT_MAX_REQUEST_BYTES, SignOutcome, SignService};
pub use store::{DocumentStore, FsDocumentStore, StoreConfig};
pub use transform::to_page_rect;
pub use types::{Color, NormalizedRect, PageGeometry, PageRect};

use std::path::PathBuf;
use tracing::info;

/// Burned document plus the integrity pair and per-field report.
#[derive(Debug, Clone)]
pub struct BurnResult {
    pub bytes: Vec<u8>,
    pub original_hash: String,
    pub result_hash: String,
    pub diagnostics: Vec<FieldDiagnostic>,
    pub summary: BurnSummary,
}

impl BurnResult {
    pub fn integrity(&self) -> IntegrityPair {
        IntegrityPair {
            original_hash: self.original_hash.clone(),
            result_hash: self.result_hash.clone(),
        }
    }
}

/// Reusable, thread-safe burn engine.
#[derive(Clone)]
pub struct Burner {
    compress_streams: bool,
    debug: Option<DebugLogger>,
}

#[derive(Clone)]
pub struct BurnerBuilder {
    compress_streams: bool,
    debug_path: Option<PathBuf>,
}

impl Burner {
    pub fn builder() -> BurnerBuilder {
        BurnerBuilder::new()
    }

    pub fn burn(&self, base: &[u8], request: &BurnRequest) -> Result<BurnResult, BurnError> {
        let original_hash = fingerprint(base);
        let trace = self
            .debug
            .as_ref()
            .map(|logger| BurnTrace::new(logger, original_hash.clone()));
        let options = AssembleOptions {
            serialize: SerializeOptions {
                compress_streams: self.compress_streams,
            },
            trace: trace.as_ref(),
        };
        let assembled = assemble(base, request, &options);
        if let Some(trace) = trace {
            trace.finish();
        }
        let assembled = assembled?;
        let result_hash = fingerprint(&assembled.bytes);
        info!(
            fields = assembled.summary.fields_total,
            rendered = assembled.summary.rendered,
            diagnostics = assembled.diagnostics.len(),
            original = %original_hash,
            result = %result_hash,
            "burn complete"
        );
        Ok(BurnResult {
            bytes: assembled.bytes,
            original_hash,
            result_hash,
            diagnostics: assembled.diagnostics,
            summary: assembled.summary,
        })
    }
}

impl Default for BurnerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BurnerBuilder {
    pub fn new() -> Self {
        Self {
            compress_streams: true,
            debug_path: None,
        }
    }

    /// Flate-compress appended overlay streams (default on).
    pub fn compress_streams(mut self, enabled: bool) -> Self {
        self.compress_streams = enabled;
        self
    }

    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<Burner, BurnError> {
        let debug = match self.debug_path {
            Some(path) if path.as_os_str().is_empty() => {
                return Err(BurnError::InvalidConfiguration(
                    "debug log path cannot be empty".to_string(),
                ));
            }
            Some(path) => Some(DebugLogger::new(path)?),
            None => None,
        };
        Ok(Burner {
            compress_streams: self.compress_streams,
            debug,
        })
    }
}
