use lopdf::{Document as LoDocument, Object as LoObject, Stream as LoStream, dictionary};
use std::io::Cursor;

pub(crate) fn make_pdf_bytes(page_sizes: &[(i64, i64)]) -> Vec<u8> {
    let mut doc = LoDocument::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let mut kids = Vec::new();
    for (idx, (w, h)) in page_sizes.iter().enumerate() {
        let content = format!("BT /F1 18 Tf 72 720 Td (PAGE {}) Tj ET", idx + 1).into_bytes();
        let content_id = doc.add_object(LoStream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), (*w).into(), (*h).into()],
        });
        kids.push(LoObject::Reference(page_id));
    }
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_sizes.len() as i64,
    };
    doc.objects.insert(pages_id, LoObject::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("save");
    out
}

pub(crate) fn make_single_page_pdf_bytes() -> Vec<u8> {
    make_pdf_bytes(&[(612, 792)])
}

/// One page whose MediaBox and Resources live on the Pages node.
pub(crate) fn make_inherited_attrs_pdf_bytes() -> Vec<u8> {
    let mut doc = LoDocument::with_version("1.5");
    let pages_id = doc.new_object_id();
    let content_id = doc.add_object(LoStream::new(dictionary! {}, b"0 0 1 rg 10 10 50 50 re f".to_vec()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "MediaBox" => vec![0.into(), 0.into(), 400.into(), 300.into()],
        "Resources" => dictionary! {},
    };
    doc.objects.insert(pages_id, LoObject::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("save");
    out
}

/// Page tree with no kids.
pub(crate) fn make_pageless_pdf_bytes() -> Vec<u8> {
    let mut doc = LoDocument::with_version("1.5");
    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => Vec::<LoObject>::new(),
        "Count" => 0,
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("save");
    out
}

/// A normal one-page document whose trailer points at a standard security handler.
pub(crate) fn make_encrypted_pdf_bytes() -> Vec<u8> {
    let mut doc = LoDocument::load_mem(&make_single_page_pdf_bytes()).expect("load");
    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 1,
        "R" => 2,
        "O" => LoObject::string_literal(vec![0u8; 32]),
        "U" => LoObject::string_literal(vec![0u8; 32]),
        "P" => -4,
    });
    doc.trailer.set("Encrypt", encrypt_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("save");
    out
}

pub(crate) fn png_bytes(width: u32, height: u32, alpha: u8) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, alpha]));
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("png");
    out.into_inner()
}

pub(crate) fn gray_png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::GrayImage::from_pixel(width, height, image::Luma([90]));
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageLuma8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("png");
    out.into_inner()
}

pub(crate) fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]));
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageFormat::Jpeg)
        .expect("jpeg");
    out.into_inner()
}

/// Baseline 8x8 four-component JPEG with flat mid-level planes. Both Huffman
/// tables hold two 2-bit codes, so every block is `00` (DC 0) then `00` (EOB).
pub(crate) fn cmyk_jpeg_bytes(adobe: bool) -> Vec<u8> {
    let mut out = vec![0xFF, 0xD8];
    if adobe {
        out.extend_from_slice(&[0xFF, 0xEE, 0x00, 0x0E]);
        out.extend_from_slice(b"Adobe");
        // version 100, flags0, flags1, transform 0 (no color transform)
        out.extend_from_slice(&[0x00, 0x64, 0x00, 0x00, 0x00, 0x00, 0x00]);
    }
    out.extend_from_slice(&[0xFF, 0xDB, 0x00, 0x43, 0x00]);
    out.extend_from_slice(&[1u8; 64]);
    out.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x14, 0x08, 0x00, 0x08, 0x00, 0x08, 0x04]);
    for id in 1..=4u8 {
        out.extend_from_slice(&[id, 0x11, 0x00]);
    }
    out.extend_from_slice(&[0xFF, 0xC4, 0x00, 0x28]);
    for class in [0x00u8, 0x10] {
        out.push(class);
        let mut counts = [0u8; 16];
        counts[1] = 2;
        out.extend_from_slice(&counts);
        out.extend_from_slice(&[0x00, 0x01]);
    }
    out.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x0E, 0x04]);
    for id in 1..=4u8 {
        out.extend_from_slice(&[id, 0x00]);
    }
    out.extend_from_slice(&[0x00, 0x3F, 0x00]);
    out.extend_from_slice(&[0x00, 0x00]);
    out.extend_from_slice(&[0xFF, 0xD9]);
    out
}

pub(crate) fn page_content(bytes: &[u8], page_index: usize) -> String {
    let doc = LoDocument::load_mem(bytes).expect("load output");
    let page_id = *doc
        .get_pages()
        .values()
        .nth(page_index)
        .expect("page exists");
    let content = doc.get_page_content(page_id).expect("page content");
    String::from_utf8_lossy(&content).into_owned()
}
