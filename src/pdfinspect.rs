use crate::pdf::declared_page_geometry;
use crate::types::PageGeometry;
use lopdf::Document as LoDocument;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PdfInspectErrorCode {
    PdfParseFailed,
    PdfEncryptedUnsupported,
    PdfEmptyOrNoPages,
    PdfIoError,
}

impl PdfInspectErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PdfInspectErrorCode::PdfParseFailed => "PDF_PARSE_FAILED",
            PdfInspectErrorCode::PdfEncryptedUnsupported => "PDF_ENCRYPTED_UNSUPPORTED",
            PdfInspectErrorCode::PdfEmptyOrNoPages => "PDF_EMPTY_OR_NO_PAGES",
            PdfInspectErrorCode::PdfIoError => "PDF_IO_ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}: {}", .code.as_str(), .message)]
pub struct PdfInspectError {
    pub code: PdfInspectErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PdfInspectWarning {
    pub code: String,
    pub message: String,
}

/// What a caller needs before placing fields: page sizes and whether the
/// document can be burned at all.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfInspectReport {
    pub pdf_version: String,
    pub page_count: usize,
    pub encrypted: bool,
    pub file_size_bytes: usize,
    pub fingerprint: String,
    pub pages: Vec<PageGeometry>,
    pub warnings: Vec<PdfInspectWarning>,
}

pub fn inspect_pdf_bytes(bytes: &[u8]) -> Result<PdfInspectReport, PdfInspectError> {
    let pdf = LoDocument::load_mem(bytes).map_err(|err| PdfInspectError {
        code: PdfInspectErrorCode::PdfParseFailed,
        message: err.to_string(),
    })?;

    let mut pages = Vec::new();
    let mut warnings = Vec::new();
    for (index, page_id) in pdf.get_pages().values().enumerate() {
        match declared_page_geometry(&pdf, *page_id) {
            Some(geometry) => pages.push(geometry),
            None => {
                warnings.push(PdfInspectWarning {
                    code: "MEDIABOX_MISSING".to_string(),
                    message: format!("page {index} has no usable MediaBox; assuming US Letter"),
                });
                pages.push(PageGeometry::letter());
            }
        }
    }

    Ok(PdfInspectReport {
        pdf_version: pdf.version.clone(),
        page_count: pages.len(),
        encrypted: pdf.is_encrypted(),
        file_size_bytes: bytes.len(),
        fingerprint: fieldburn_audit::fingerprint(bytes),
        pages,
        warnings,
    })
}

pub fn inspect_pdf_path(path: &Path) -> Result<PdfInspectReport, PdfInspectError> {
    let data = std::fs::read(path).map_err(|err| PdfInspectError {
        code: PdfInspectErrorCode::PdfIoError,
        message: err.to_string(),
    })?;
    inspect_pdf_bytes(&data)
}

pub fn burn_compatibility_issues(report: &PdfInspectReport) -> Vec<PdfInspectErrorCode> {
    let mut issues = Vec::new();
    if report.encrypted {
        issues.push(PdfInspectErrorCode::PdfEncryptedUnsupported);
    }
    if report.page_count == 0 {
        issues.push(PdfInspectErrorCode::PdfEmptyOrNoPages);
    }
    issues
}
