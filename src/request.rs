use crate::error::BurnError;
use crate::field::{BurnRequest, Field, FieldContent, FieldKind};
use crate::types::{NormalizedRect, PageGeometry};
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// Browser canvases sometimes drop padding; accept both forms.
const PAYLOAD_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Sign request as posted by clients. Fields stay loosely typed here so a bad
/// entry can be reported with its index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequest {
    #[serde(default, alias = "pdfId")]
    pub document_id: String,
    #[serde(default)]
    pub fields: Vec<Value>,
    #[serde(default, alias = "pageSizesPt")]
    pub page_sizes: Vec<Option<PageGeometry>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldPayload {
    pub page_index: usize,
    pub x_norm: f64,
    pub y_norm: f64,
    pub w_norm: f64,
    pub h_norm: f64,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignResponse {
    pub url: String,
    pub original_hash: String,
    pub result_hash: String,
}

pub fn parse_sign_request(body: &[u8]) -> Result<SignRequest, BurnError> {
    serde_json::from_slice(body).map_err(|err| BurnError::Request(err.to_string()))
}

impl SignRequest {
    pub fn to_burn_request(&self) -> Result<BurnRequest, BurnError> {
        let fields = self
            .fields
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                let payload: FieldPayload = serde_json::from_value(raw.clone())
                    .map_err(|err| BurnError::field_validation(index, err.to_string()))?;
                payload.into_field(index)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(BurnRequest::new(fields).with_page_geometry(self.page_sizes.clone()))
    }
}

impl FieldPayload {
    pub fn into_field(self, index: usize) -> Result<Field, BurnError> {
        let rect = NormalizedRect::new(self.x_norm, self.y_norm, self.w_norm, self.h_norm);
        let content = match self.kind {
            FieldKind::Text => FieldContent::Text(text_value(index, &self.value)?),
            FieldKind::Date => FieldContent::Date(text_value(index, &self.value)?),
            FieldKind::Signature => FieldContent::Signature(raster_value(index, &self.value)?),
            FieldKind::Image => FieldContent::Image(raster_value(index, &self.value)?),
            FieldKind::Radio => FieldContent::Radio(radio_value(&self.value)),
        };
        Ok(Field::new(self.page_index, rect, content))
    }
}

fn text_value(index: usize, value: &Value) -> Result<String, BurnError> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(BurnError::field_validation(
            index,
            "text value must be a string",
        )),
    }
}

fn raster_value(index: usize, value: &Value) -> Result<Vec<u8>, BurnError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(s) => decode_raster_payload(s)
            .map_err(|err| BurnError::field_validation(index, format!("invalid base64 payload: {err}"))),
        _ => Err(BurnError::field_validation(
            index,
            "image value must be a base64 string",
        )),
    }
}

/// Anything other than `true` or `"true"` leaves the radio unfilled.
fn radio_value(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s == "true",
        _ => false,
    }
}

/// Decodes plain base64 or a `data:<mime>;base64,<payload>` URL.
pub fn decode_raster_payload(raw: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let encoded = match raw.split_once(',') {
        Some((_, rest)) => rest,
        None => raw,
    };
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Ok(Vec::new());
    }
    PAYLOAD_BASE64.decode(compact.as_bytes())
}
