use crate::canvas::PageCanvas;
use crate::error::BurnError;
use crate::raster::{RasterColorSpace, RasterDecodeError, RasterImage, decode_raster, flate_compress};
use crate::types::{Color, PageGeometry, PageRect};
use lopdf::{
    Dictionary as LoDictionary, Document as LoDocument, Object as LoObject,
    ObjectId as LoObjectId, Stream as LoStream, dictionary,
};
use std::collections::{BTreeMap, BTreeSet};

const FONT_RESOURCE_PREFIX: &str = "FbF";
const IMAGE_RESOURCE_PREFIX: &str = "FbIm";
const MAX_INHERIT_DEPTH: usize = 32;

fn lopdf_err(err: lopdf::Error) -> BurnError {
    BurnError::invalid_document(format!("pdf structure error: {err}"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StandardFont {
    Helvetica,
}

impl StandardFont {
    pub fn base_font(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
        }
    }
}

/// Embedded image XObject plus its intrinsic pixel size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHandle {
    id: LoObjectId,
    width: u32,
    height: u32,
}

impl ImageHandle {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleStyle {
    pub border_width: f64,
    pub border_color: Color,
    pub fill: Option<Color>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializeOptions {
    pub compress_streams: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            compress_streams: true,
        }
    }
}

/// A parsed PDF being burned. Overlay drawing is buffered per page and only
/// spliced into the page content streams by [`PdfDocument::serialize`].
pub struct PdfDocument {
    doc: LoDocument,
    page_ids: Vec<LoObjectId>,
    overlays: BTreeMap<usize, PageCanvas>,
    localized_pages: BTreeSet<usize>,
    fonts: BTreeMap<StandardFont, LoObjectId>,
    images: BTreeMap<String, ImageHandle>,
}

impl PdfDocument {
    pub fn parse(bytes: &[u8]) -> Result<Self, BurnError> {
        let doc = LoDocument::load_mem(bytes)
            .map_err(|err| BurnError::invalid_document(format!("pdf parse error: {err}")))?;
        if doc.is_encrypted() {
            return Err(BurnError::invalid_document(
                "encrypted documents are not supported",
            ));
        }
        let page_ids: Vec<LoObjectId> = doc.get_pages().values().copied().collect();
        if page_ids.is_empty() {
            return Err(BurnError::invalid_document("document has no pages"));
        }
        Ok(Self {
            doc,
            page_ids,
            overlays: BTreeMap::new(),
            localized_pages: BTreeSet::new(),
            fonts: BTreeMap::new(),
            images: BTreeMap::new(),
        })
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Page size from the (possibly inherited) MediaBox.
    pub fn page_geometry(&self, index: usize) -> Result<PageGeometry, BurnError> {
        let page_id = self.page_id(index)?;
        Ok(page_geometry_of(&self.doc, page_id))
    }

    pub fn page_mut(&mut self, index: usize) -> Result<PageHandle<'_>, BurnError> {
        let geometry = self.page_geometry(index)?;
        Ok(PageHandle {
            doc: self,
            index,
            geometry,
        })
    }

    /// True once any page has overlay content queued.
    pub fn is_modified(&self) -> bool {
        self.overlays.values().any(|canvas| !canvas.is_empty())
    }

    /// Decodes and embeds a raster payload. Identical payloads share one XObject.
    pub fn embed_raster(&mut self, payload: &[u8]) -> Result<ImageHandle, RasterDecodeError> {
        let key = fieldburn_audit::fingerprint(payload);
        if let Some(handle) = self.images.get(&key) {
            return Ok(*handle);
        }
        let raster = decode_raster(payload)?;
        let handle = self.add_raster(&raster);
        self.images.insert(key, handle);
        Ok(handle)
    }

    pub fn serialize(mut self, options: &SerializeOptions) -> Result<Vec<u8>, BurnError> {
        let overlays = std::mem::take(&mut self.overlays);
        for (index, canvas) in overlays {
            if canvas.is_empty() {
                continue;
            }
            let page_id = self.page_id(index)?;
            self.append_overlay(page_id, canvas.encode(), options.compress_streams)?;
        }
        let mut out = Vec::new();
        self.doc
            .save_to(&mut out)
            .map_err(|err| BurnError::serialization(err.to_string()))?;
        Ok(out)
    }

    fn page_id(&self, index: usize) -> Result<LoObjectId, BurnError> {
        self.page_ids.get(index).copied().ok_or_else(|| {
            BurnError::validation(format!(
                "page index {} out of range (allowed 0..{})",
                index,
                self.page_ids.len().saturating_sub(1)
            ))
        })
    }

    fn add_raster(&mut self, raster: &RasterImage) -> ImageHandle {
        let smask_id = raster.alpha.as_ref().map(|alpha| {
            let mut smask = LoStream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => raster.width as i64,
                    "Height" => raster.height as i64,
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                    "Filter" => "FlateDecode",
                },
                alpha.clone(),
            );
            smask.allows_compression = false;
            self.doc.add_object(smask)
        });

        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => raster.width as i64,
            "Height" => raster.height as i64,
            "ColorSpace" => raster.color_space.pdf_name(),
            "BitsPerComponent" => raster.bits_per_component as i64,
            "Filter" => raster.filter.pdf_name(),
        };
        if raster.inverted && raster.color_space == RasterColorSpace::Cmyk {
            let decode: Vec<LoObject> = (0..4)
                .flat_map(|_| [LoObject::Integer(1), LoObject::Integer(0)])
                .collect();
            dict.set("Decode", decode);
        }
        if let Some(id) = smask_id {
            dict.set("SMask", id);
        }
        let mut stream = LoStream::new(dict, raster.data.clone());
        stream.allows_compression = false;
        let id = self.doc.add_object(stream);
        ImageHandle {
            id,
            width: raster.width,
            height: raster.height,
        }
    }

    fn font_object(&mut self, font: StandardFont) -> LoObjectId {
        if let Some(id) = self.fonts.get(&font) {
            return *id;
        }
        let id = self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        self.fonts.insert(font, id);
        id
    }

    /// Copies the effective (possibly inherited or shared) resources onto the
    /// page as a direct dictionary so new entries stay local to this page.
    fn localize_resources(&mut self, index: usize) -> Result<(), BurnError> {
        if self.localized_pages.contains(&index) {
            return Ok(());
        }
        let page_id = self.page_id(index)?;
        let mut resources = inherited_attribute(&self.doc, page_id, b"Resources")
            .map(|obj| resolve_dict(&self.doc, &obj))
            .unwrap_or_default();
        for category in [b"Font".as_slice(), b"XObject".as_slice()] {
            if let Ok(obj) = resources.get(category) {
                let direct = resolve_dict(&self.doc, obj);
                resources.set(category, LoObject::Dictionary(direct));
            }
        }
        let page = self
            .doc
            .get_object_mut(page_id)
            .and_then(LoObject::as_dict_mut)
            .map_err(lopdf_err)?;
        page.set("Resources", LoObject::Dictionary(resources));
        self.localized_pages.insert(index);
        Ok(())
    }

    /// Name under which `target` is reachable from the page's `category`
    /// resources, adding a fresh `<prefix><n>` entry when needed.
    fn register_resource(
        &mut self,
        index: usize,
        category: &[u8],
        prefix: &str,
        target: LoObjectId,
    ) -> Result<String, BurnError> {
        self.localize_resources(index)?;
        let page_id = self.page_id(index)?;
        let page = self
            .doc
            .get_object_mut(page_id)
            .and_then(LoObject::as_dict_mut)
            .map_err(lopdf_err)?;
        let resources = page
            .get_mut(b"Resources")
            .and_then(LoObject::as_dict_mut)
            .map_err(lopdf_err)?;
        if !resources.has(category) {
            resources.set(category, LoObject::Dictionary(LoDictionary::new()));
        }
        let entries = resources
            .get_mut(category)
            .and_then(LoObject::as_dict_mut)
            .map_err(lopdf_err)?;
        for (name, value) in entries.iter() {
            if value.as_reference().ok() == Some(target) {
                return Ok(String::from_utf8_lossy(name).into_owned());
            }
        }
        let mut n = 1usize;
        loop {
            let name = format!("{prefix}{n}");
            if !entries.has(name.as_bytes()) {
                entries.set(name.clone(), LoObject::Reference(target));
                return Ok(name);
            }
            n += 1;
        }
    }

    fn overlay(&mut self, index: usize) -> &mut PageCanvas {
        self.overlays.entry(index).or_default()
    }

    /// Wraps the existing content in q/Q and appends the overlay stream.
    fn append_overlay(
        &mut self,
        page_id: LoObjectId,
        overlay: Vec<u8>,
        compress: bool,
    ) -> Result<(), BurnError> {
        let existing = self.page_contents(page_id)?;
        let mut contents: Vec<LoObject> = Vec::with_capacity(existing.len() + 2);
        let mut body: Vec<u8> = Vec::with_capacity(overlay.len() + 2);
        if !existing.is_empty() {
            let open_id = self
                .doc
                .add_object(LoStream::new(dictionary! {}, b"q\n".to_vec()));
            contents.push(LoObject::Reference(open_id));
            contents.extend(existing);
            // Leading newline keeps the base stream's last token separate.
            body.extend_from_slice(b"\nQ\n");
        }
        body.extend_from_slice(&overlay);

        let stream = if compress {
            let packed = flate_compress(&body)
                .map_err(|err| BurnError::serialization(format!("overlay compression: {err}")))?;
            LoStream::new(dictionary! { "Filter" => "FlateDecode" }, packed)
        } else {
            LoStream::new(dictionary! {}, body)
        };
        let overlay_id = self.doc.add_object(stream);
        contents.push(LoObject::Reference(overlay_id));

        let page = self
            .doc
            .get_object_mut(page_id)
            .and_then(LoObject::as_dict_mut)
            .map_err(lopdf_err)?;
        page.set("Contents", LoObject::Array(contents));
        Ok(())
    }

    fn page_contents(&self, page_id: LoObjectId) -> Result<Vec<LoObject>, BurnError> {
        let page = self
            .doc
            .get_object(page_id)
            .and_then(LoObject::as_dict)
            .map_err(lopdf_err)?;
        Ok(match page.get(b"Contents") {
            Ok(LoObject::Reference(id)) => match self.doc.get_object(*id) {
                Ok(LoObject::Array(items)) => items.clone(),
                _ => vec![LoObject::Reference(*id)],
            },
            Ok(LoObject::Array(items)) => items.clone(),
            _ => Vec::new(),
        })
    }
}

/// Mutable view of one page. Only one exists at a time per document.
pub struct PageHandle<'a> {
    doc: &'a mut PdfDocument,
    index: usize,
    geometry: PageGeometry,
}

impl PageHandle<'_> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn width(&self) -> f64 {
        self.geometry.width
    }

    pub fn height(&self) -> f64 {
        self.geometry.height
    }

    pub fn embed_raster(&mut self, payload: &[u8]) -> Result<ImageHandle, RasterDecodeError> {
        self.doc.embed_raster(payload)
    }

    /// Single line of pre-encoded text with its baseline origin at (x, y).
    pub fn draw_text(
        &mut self,
        x: f64,
        y: f64,
        font: StandardFont,
        size: f64,
        color: Color,
        text: &[u8],
    ) -> Result<(), BurnError> {
        let font_id = self.doc.font_object(font);
        let name = self
            .doc
            .register_resource(self.index, b"Font", FONT_RESOURCE_PREFIX, font_id)?;
        let canvas = self.doc.overlay(self.index);
        canvas.save_state();
        canvas.set_fill_color(color);
        canvas.draw_string(x, y, name, size, text.to_vec());
        canvas.restore_state();
        Ok(())
    }

    pub fn draw_image(&mut self, image: &ImageHandle, rect: PageRect) -> Result<(), BurnError> {
        let name =
            self.doc
                .register_resource(self.index, b"XObject", IMAGE_RESOURCE_PREFIX, image.id)?;
        self.doc
            .overlay(self.index)
            .draw_image(rect.x, rect.y, rect.width, rect.height, name);
        Ok(())
    }

    pub fn draw_circle(
        &mut self,
        cx: f64,
        cy: f64,
        radius: f64,
        style: CircleStyle,
    ) -> Result<(), BurnError> {
        let canvas = self.doc.overlay(self.index);
        canvas.save_state();
        canvas.set_stroke_color(style.border_color);
        canvas.set_line_width(style.border_width);
        if let Some(fill) = style.fill {
            canvas.set_fill_color(fill);
        }
        canvas.circle_path(cx, cy, radius);
        if style.fill.is_some() {
            canvas.fill_stroke();
        } else {
            canvas.stroke();
        }
        canvas.restore_state();
        Ok(())
    }
}

pub(crate) struct WinAnsiEncoded {
    pub bytes: Vec<u8>,
    pub replaced: usize,
}

/// Encodes for the standard 14 fonts. Unmappable characters become `?`.
pub(crate) fn encode_winansi(input: &str) -> WinAnsiEncoded {
    let mut bytes = Vec::with_capacity(input.len());
    let mut replaced = 0usize;
    for ch in input.chars() {
        let code = ch as u32;
        let mapped = match code {
            0x20..=0x7e | 0xa0..=0xff => Some(code as u8),
            _ => winansi_special(ch),
        };
        match mapped {
            Some(b) => bytes.push(b),
            None => {
                bytes.push(b'?');
                replaced += 1;
            }
        }
    }
    WinAnsiEncoded { bytes, replaced }
}

fn winansi_special(ch: char) -> Option<u8> {
    let b = match ch {
        '\u{20ac}' => 0x80,
        '\u{201a}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201e}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02c6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8a,
        '\u{2039}' => 0x8b,
        '\u{0152}' => 0x8c,
        '\u{017d}' => 0x8e,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201c}' => 0x93,
        '\u{201d}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{02dc}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9a,
        '\u{203a}' => 0x9b,
        '\u{0153}' => 0x9c,
        '\u{017e}' => 0x9e,
        '\u{0178}' => 0x9f,
        _ => return None,
    };
    Some(b)
}

pub(crate) fn page_geometry_of(doc: &LoDocument, page_id: LoObjectId) -> PageGeometry {
    declared_page_geometry(doc, page_id).unwrap_or_else(PageGeometry::letter)
}

/// Usable MediaBox size, or `None` when the page tree carries none.
pub(crate) fn declared_page_geometry(doc: &LoDocument, page_id: LoObjectId) -> Option<PageGeometry> {
    inherited_attribute(doc, page_id, b"MediaBox")
        .and_then(|obj| box_geometry(doc, &obj))
        .filter(PageGeometry::is_valid)
}

fn box_geometry(doc: &LoDocument, obj: &LoObject) -> Option<PageGeometry> {
    let resolved = match obj {
        LoObject::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let arr = resolved.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let mut nums = [0.0f64; 4];
    for (slot, item) in nums.iter_mut().zip(arr.iter()) {
        let item = match item {
            LoObject::Reference(id) => doc.get_object(*id).ok()?,
            other => other,
        };
        *slot = obj_to_f64(item)?;
    }
    Some(PageGeometry::new(
        (nums[2] - nums[0]).abs(),
        (nums[3] - nums[1]).abs(),
    ))
}

fn obj_to_f64(obj: &LoObject) -> Option<f64> {
    match obj {
        LoObject::Integer(i) => Some(*i as f64),
        LoObject::Real(f) => Some(f64::from(*f)),
        _ => None,
    }
}

fn inherited_attribute(doc: &LoDocument, page_id: LoObjectId, key: &[u8]) -> Option<LoObject> {
    let mut current = Some(page_id);
    let mut depth = 0usize;
    while let Some(id) = current {
        if depth > MAX_INHERIT_DEPTH {
            return None;
        }
        let dict = doc.get_object(id).and_then(LoObject::as_dict).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        current = dict.get(b"Parent").and_then(LoObject::as_reference).ok();
        depth += 1;
    }
    None
}

fn resolve_dict(doc: &LoDocument, obj: &LoObject) -> LoDictionary {
    match obj {
        LoObject::Dictionary(d) => d.clone(),
        LoObject::Reference(id) => doc
            .get_object(*id)
            .ok()
            .and_then(|o| o.as_dict().ok())
            .cloned()
            .unwrap_or_default(),
        _ => LoDictionary::new(),
    }
}
