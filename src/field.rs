use crate::types::{NormalizedRect, PageGeometry};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Date,
    Signature,
    Image,
    #[serde(alias = "checkbox")]
    Radio,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Date => "date",
            FieldKind::Signature => "signature",
            FieldKind::Image => "image",
            FieldKind::Radio => "radio",
        }
    }

    pub fn is_raster(&self) -> bool {
        matches!(self, FieldKind::Signature | FieldKind::Image)
    }
}

/// What a field draws. Raster payloads are raw encoded image bytes; an empty
/// payload means the value has not been provided yet.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldContent {
    Text(String),
    Date(String),
    Signature(Vec<u8>),
    Image(Vec<u8>),
    Radio(bool),
}

impl FieldContent {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldContent::Text(_) => FieldKind::Text,
            FieldContent::Date(_) => FieldKind::Date,
            FieldContent::Signature(_) => FieldKind::Signature,
            FieldContent::Image(_) => FieldKind::Image,
            FieldContent::Radio(_) => FieldKind::Radio,
        }
    }

    pub fn raster_payload(&self) -> Option<&[u8]> {
        match self {
            FieldContent::Signature(bytes) | FieldContent::Image(bytes) => Some(bytes),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub page_index: usize,
    pub rect: NormalizedRect,
    pub content: FieldContent,
}

impl Field {
    pub fn new(page_index: usize, rect: NormalizedRect, content: FieldContent) -> Self {
        Self {
            page_index,
            rect,
            content,
        }
    }

    pub fn kind(&self) -> FieldKind {
        self.content.kind()
    }
}

/// Fields in render order plus optional per-page geometry overrides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BurnRequest {
    pub fields: Vec<Field>,
    pub page_geometry: Vec<Option<PageGeometry>>,
}

impl BurnRequest {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            page_geometry: Vec::new(),
        }
    }

    pub fn with_page_geometry(mut self, page_geometry: Vec<Option<PageGeometry>>) -> Self {
        self.page_geometry = page_geometry;
        self
    }

    pub fn geometry_override(&self, page_index: usize) -> Option<PageGeometry> {
        self.page_geometry.get(page_index).copied().flatten()
    }
}
