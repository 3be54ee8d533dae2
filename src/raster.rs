use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    Png,
    Jpeg,
}

impl RasterFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            RasterFormat::Png => "png",
            RasterFormat::Jpeg => "jpeg",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterColorSpace {
    Gray,
    Rgb,
    Cmyk,
}

impl RasterColorSpace {
    pub fn pdf_name(&self) -> &'static str {
        match self {
            RasterColorSpace::Gray => "DeviceGray",
            RasterColorSpace::Rgb => "DeviceRGB",
            RasterColorSpace::Cmyk => "DeviceCMYK",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFilter {
    Dct,
    Flate,
}

impl RasterFilter {
    pub fn pdf_name(&self) -> &'static str {
        match self {
            RasterFilter::Dct => "DCTDecode",
            RasterFilter::Flate => "FlateDecode",
        }
    }
}

/// Decoded raster, already in the stream encoding it will be embedded with.
#[derive(Debug, Clone)]
pub struct RasterImage {
    pub format: RasterFormat,
    pub width: u32,
    pub height: u32,
    pub color_space: RasterColorSpace,
    pub bits_per_component: u8,
    pub filter: RasterFilter,
    pub data: Vec<u8>,
    /// Flate-compressed 8-bit soft mask, present only when some pixel is not opaque.
    pub alpha: Option<Vec<u8>>,
    // Set for CMYK JPEGs carrying an Adobe APP14 segment, which store
    // inverted components. Other 4-component streams are taken as plain CMYK.
    pub inverted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeAttempt {
    pub decoder: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RasterDecodeError {
    #[error("raster payload is empty")]
    Empty,
    #[error("no decoder accepted the raster payload: {}", describe_attempts(.attempts))]
    Unsupported { attempts: Vec<DecodeAttempt> },
}

fn describe_attempts(attempts: &[DecodeAttempt]) -> String {
    attempts
        .iter()
        .map(|a| format!("{}: {}", a.decoder, a.message))
        .collect::<Vec<_>>()
        .join("; ")
}

pub trait RasterDecoder {
    fn name(&self) -> &'static str;
    fn decode(&self, bytes: &[u8]) -> Result<RasterImage, image::ImageError>;
}

pub struct PngDecoder;

pub struct JpegDecoder;

/// Lossless first, then lossy.
pub const DEFAULT_DECODERS: &[&dyn RasterDecoder] = &[&PngDecoder, &JpegDecoder];

impl RasterDecoder for PngDecoder {
    fn name(&self) -> &'static str {
        "png"
    }

    fn decode(&self, bytes: &[u8]) -> Result<RasterImage, image::ImageError> {
        let decoded = image::load_from_memory_with_format(bytes, ImageFormat::Png)?;
        flate_raster(RasterFormat::Png, &decoded)
    }
}

impl RasterDecoder for JpegDecoder {
    fn name(&self) -> &'static str {
        "jpeg"
    }

    fn decode(&self, bytes: &[u8]) -> Result<RasterImage, image::ImageError> {
        let decoded = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)?;
        let (width, height) = decoded.dimensions();
        let header = sniff_jpeg(bytes);
        let color_space = match header.components {
            Some(1) => RasterColorSpace::Gray,
            Some(4) => RasterColorSpace::Cmyk,
            Some(_) => RasterColorSpace::Rgb,
            None => match decoded.color() {
                image::ColorType::L8 | image::ColorType::La8 => RasterColorSpace::Gray,
                _ => RasterColorSpace::Rgb,
            },
        };
        // The original DCT stream is embedded untouched.
        Ok(RasterImage {
            format: RasterFormat::Jpeg,
            width,
            height,
            color_space,
            bits_per_component: 8,
            filter: RasterFilter::Dct,
            data: bytes.to_vec(),
            alpha: None,
            inverted: color_space == RasterColorSpace::Cmyk && header.adobe,
        })
    }
}

/// Runs `decoders` in order and returns the first success.
pub fn decode_with(
    decoders: &[&dyn RasterDecoder],
    bytes: &[u8],
) -> Result<RasterImage, RasterDecodeError> {
    if bytes.is_empty() {
        return Err(RasterDecodeError::Empty);
    }
    let mut attempts = Vec::with_capacity(decoders.len());
    for decoder in decoders {
        match decoder.decode(bytes) {
            Ok(image) => return Ok(image),
            Err(err) => attempts.push(DecodeAttempt {
                decoder: decoder.name(),
                message: err.to_string(),
            }),
        }
    }
    Err(RasterDecodeError::Unsupported { attempts })
}

pub fn decode_raster(bytes: &[u8]) -> Result<RasterImage, RasterDecodeError> {
    decode_with(DEFAULT_DECODERS, bytes)
}

fn flate_raster(
    format: RasterFormat,
    decoded: &DynamicImage,
) -> Result<RasterImage, image::ImageError> {
    let (width, height) = decoded.dimensions();
    let gray = matches!(
        decoded.color(),
        image::ColorType::L8 | image::ColorType::La8 | image::ColorType::L16 | image::ColorType::La16
    );
    let rgba = decoded.to_rgba8();
    let channels = if gray { 1 } else { 3 };
    let pixel_count = (width as usize) * (height as usize);
    let mut color = Vec::with_capacity(pixel_count * channels);
    let mut alpha = Vec::with_capacity(pixel_count);
    let mut has_alpha = false;
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        if gray {
            color.push(r);
        } else {
            color.extend_from_slice(&[r, g, b]);
        }
        if a != 255 {
            has_alpha = true;
        }
        alpha.push(a);
    }

    let alpha = if has_alpha {
        Some(flate_compress(&alpha)?)
    } else {
        None
    };
    Ok(RasterImage {
        format,
        width,
        height,
        color_space: if gray {
            RasterColorSpace::Gray
        } else {
            RasterColorSpace::Rgb
        },
        bits_per_component: 8,
        filter: RasterFilter::Flate,
        data: flate_compress(&color)?,
        alpha,
        inverted: false,
    })
}

pub(crate) fn flate_compress(data: &[u8]) -> std::io::Result<Vec<u8>> {
    use flate2::Compression;
    use flate2::write::ZlibEncoder;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct JpegHeader {
    components: Option<u8>,
    adobe: bool,
}

/// Component count from the first SOF marker and whether an Adobe APP14
/// segment precedes it, if the stream is readable that far.
fn sniff_jpeg(data: &[u8]) -> JpegHeader {
    let mut header = JpegHeader::default();
    if data.len() < 4 || data[0] != 0xFF || data[1] != 0xD8 {
        return header;
    }
    let mut i = 2;
    while i + 3 < data.len() {
        if data[i] != 0xFF {
            return header;
        }
        let marker = data[i + 1];
        if marker == 0xFF {
            i += 1;
            continue;
        }
        if marker == 0x01 || (0xD0..=0xD8).contains(&marker) {
            i += 2;
            continue;
        }
        let is_sof = (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_sof {
            header.components = data.get(i + 9).copied();
            return header;
        }
        if marker == 0xDA {
            return header;
        }
        if marker == 0xEE && data.get(i + 4..i + 9) == Some(b"Adobe".as_slice()) {
            header.adobe = true;
        }
        let len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        i += 2 + len;
    }
    header
}
