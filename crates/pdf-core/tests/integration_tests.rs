//! End-to-end checks of pdf-core output
//!
//! These tests verify end-to-end functionality by re-parsing the output
//! with lopdf.

use pdf_core::{Align, Color, FontData, PdfDocument, PdfError, Rect, ShapeStyle, StandardFont};
use pretty_assertions::assert_eq;

const A4: (f64, f64) = (595.28, 841.89);
const SYSTEM_FONT: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

fn helvetica() -> FontData {
    FontData::standard("latin", StandardFont::Helvetica)
}

/// Optional TrueType font; tests needing it are skipped when absent
fn system_font() -> Option<Vec<u8>> {
    std::fs::read(SYSTEM_FONT).ok()
}

/// SOI, a 16x16 three-component SOF0 header and EOI; enough to embed
fn jpeg_fixture() -> Vec<u8> {
    let mut jpeg = vec![0xFF, 0xD8];
    jpeg.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 8, 0x00, 16, 0x00, 16, 3]);
    for component in 1..=3u8 {
        jpeg.extend_from_slice(&[component, 0x11, 0x00]);
    }
    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    jpeg
}

fn png_fixture() -> Vec<u8> {
    let img = image::GrayImage::from_pixel(16, 16, image::Luma([40]));
    pdf_core::encode_png(&image::DynamicImage::ImageLuma8(img)).expect("png encodes")
}

fn page_count(bytes: &[u8]) -> usize {
    lopdf::Document::load_mem(bytes)
        .expect("output should parse")
        .get_pages()
        .len()
}

fn page_content(bytes: &[u8], page: u32) -> String {
    let doc = lopdf::Document::load_mem(bytes).expect("output should parse");
    let page_id = doc.get_pages()[&page];
    String::from_utf8_lossy(&doc.get_page_content(page_id).expect("content")).into_owned()
}

#[test]
fn test_new_document_roundtrip() {
    let mut doc = PdfDocument::new();
    doc.add_page(A4.0, A4.1);

    let saved = doc.to_bytes().expect("Failed to save PDF");
    assert_eq!(page_count(&saved), 1);
}

#[test]
fn test_insert_text_basic() {
    let mut doc = PdfDocument::new();
    let page = doc.add_page(A4.0, A4.1);
    doc.add_font(helvetica()).expect("Failed to add font");
    doc.set_font("latin", 12.0).expect("Failed to set font");

    doc.insert_text("Hello", page, 100.0, 700.0, Align::Left)
        .expect("Failed to insert text");

    let saved = doc.to_bytes().expect("Failed to save PDF");
    let content = page_content(&saved, 1);
    assert!(content.contains("(Hello) Tj"));
    assert!(content.contains("/F1 12 Tf"));
}

#[test]
fn test_insert_text_alignment() {
    for (align, text) in [
        (Align::Left, "Left"),
        (Align::Center, "Center"),
        (Align::Right, "Right"),
    ] {
        let mut doc = PdfDocument::new();
        doc.add_page(A4.0, A4.1);
        doc.add_font(helvetica()).expect("Failed to add font");
        doc.set_font("latin", 12.0).expect("Failed to set font");
        let width = doc.text_width(text).unwrap();
        doc.insert_text(text, 1, 300.0, 700.0, align)
            .expect("Failed to insert text");

        let expected_x = match align {
            Align::Left => 300.0,
            Align::Center => 300.0 - width / 2.0,
            Align::Right => 300.0 - width,
        };
        let content = page_content(&doc.to_bytes().unwrap(), 1);
        assert!(
            content.contains(&format!("{} 700 Td", pdf_core::fmt_num(expected_x))),
            "{align:?}: {content}"
        );
    }
}

#[test]
fn test_truetype_font_is_embedded() {
    let Some(ttf) = system_font() else {
        return;
    };
    let mut doc = PdfDocument::new();
    doc.add_page(A4.0, A4.1);
    doc.add_font(FontData::from_ttf("sans", &ttf).unwrap())
        .unwrap();
    doc.set_font("sans", 10.0).unwrap();
    doc.insert_text("Grüße", 1, 50.0, 50.0, Align::Left).unwrap();

    let saved = doc.to_bytes().unwrap();
    let parsed = lopdf::Document::load_mem(&saved).unwrap();
    let has_type0 = parsed.objects.values().any(|obj| {
        obj.as_dict()
            .ok()
            .and_then(|d| d.get(b"Subtype").ok())
            .and_then(|s| s.as_name().ok())
            == Some(b"Type0".as_slice())
    });
    assert!(has_type0);
}

#[test]
fn test_insert_image_jpeg() {
    let mut doc = PdfDocument::new();
    doc.add_page(A4.0, A4.1);
    doc.insert_image(&jpeg_fixture(), 1, Rect::new(100.0, 700.0, 50.0, 50.0))
        .expect("Failed to insert JPEG image");

    let saved = doc.to_bytes().expect("Failed to save PDF");
    assert!(page_content(&saved, 1).contains("/Im1 Do"));
}

#[test]
fn test_insert_image_png() {
    let mut doc = PdfDocument::new();
    doc.add_page(A4.0, A4.1);
    doc.insert_image(&png_fixture(), 1, Rect::new(100.0, 700.0, 50.0, 50.0))
        .expect("Failed to insert PNG image");

    let saved = doc.to_bytes().expect("Failed to save PDF");
    assert_eq!(page_count(&saved), 1);
}

#[test]
fn test_insert_image_rejects_garbage() {
    let mut doc = PdfDocument::new();
    doc.add_page(A4.0, A4.1);
    let err = doc
        .insert_image(b"not an image at all", 1, Rect::new(0.0, 0.0, 10.0, 10.0))
        .unwrap_err();
    assert!(matches!(err, PdfError::ImageError(_)));
}

#[test]
fn test_fit_box_image_is_centered() {
    let mut doc = PdfDocument::new();
    doc.add_page(A4.0, A4.1);
    // 16x16 source into a 100x50 box: 50x50, offset 25 horizontally
    doc.insert_image(&png_fixture(), 1, Rect::new(0.0, 0.0, 100.0, 50.0))
        .unwrap();
    let content = page_content(&doc.to_bytes().unwrap(), 1);
    assert!(content.contains("50 0 0 50 25 0 cm"), "{content}");
}

#[test]
fn test_text_on_multiple_pages() {
    let mut doc = PdfDocument::new();
    doc.add_font(helvetica()).unwrap();
    doc.set_font("latin", 12.0).unwrap();
    for i in 1..=3 {
        let page = doc.add_page(A4.0, A4.1);
        doc.insert_text(&format!("Page {i}"), page, 100.0, 700.0, Align::Left)
            .unwrap();
    }

    let saved = doc.to_bytes().unwrap();
    assert_eq!(page_count(&saved), 3);
    assert!(page_content(&saved, 3).contains("(Page 3) Tj"));
}

#[test]
fn test_empty_text() {
    let mut doc = PdfDocument::new();
    doc.add_page(A4.0, A4.1);
    doc.add_font(helvetica()).unwrap();
    doc.set_font("latin", 12.0).unwrap();

    doc.insert_text("", 1, 100.0, 700.0, Align::Left)
        .expect("Empty text should be accepted");
    let content = page_content(&doc.to_bytes().unwrap(), 1);
    assert!(!content.contains("Tj"));
}

#[test]
fn test_shapes_are_written() {
    let mut doc = PdfDocument::new();
    doc.add_page(A4.0, A4.1);
    doc.draw_rect(
        1,
        Rect::new(10.0, 10.0, 100.0, 20.0),
        &ShapeStyle::fill(Color::gray(0.9)),
    )
    .unwrap();
    doc.draw_rounded_rect(
        1,
        Rect::new(10.0, 40.0, 100.0, 20.0),
        4.0,
        &ShapeStyle::stroke(Color::black(), 0.5),
    )
    .unwrap();
    doc.draw_line(1, (0.0, 0.0), (50.0, 0.0), Color::black(), 1.0)
        .unwrap();

    let content = page_content(&doc.to_bytes().unwrap(), 1);
    assert!(content.contains("10 10 100 20 re"));
    assert!(content.contains(" c\n"));
    assert!(content.contains("50 0 l"));
}

#[test]
fn test_invalid_page_number() {
    let mut doc = PdfDocument::new();
    doc.add_page(A4.0, A4.1);
    doc.add_font(helvetica()).unwrap();
    doc.set_font("latin", 12.0).unwrap();

    match doc.insert_text("Test", 0, 100.0, 700.0, Align::Left) {
        Err(PdfError::InvalidPage(page, total)) => {
            assert_eq!(page, 0);
            assert_eq!(total, 1);
        }
        _ => panic!("Expected InvalidPage error"),
    }
    assert!(matches!(
        doc.draw_line(5, (0.0, 0.0), (1.0, 1.0), Color::black(), 1.0),
        Err(PdfError::InvalidPage(5, 1))
    ));
}

#[test]
fn test_font_not_found() {
    let mut doc = PdfDocument::new();
    match doc.set_font("nonexistent", 12.0) {
        Err(PdfError::FontNotFound(name)) => assert_eq!(name, "nonexistent"),
        _ => panic!("Expected FontNotFound error"),
    }
}

#[test]
fn test_image_deduplication() {
    let jpeg = jpeg_fixture();
    let mut doc = PdfDocument::new();
    doc.add_page(A4.0, A4.1);
    doc.add_page(A4.0, A4.1);

    doc.insert_image(&jpeg, 1, Rect::new(100.0, 700.0, 50.0, 50.0))
        .unwrap();
    doc.insert_image(&jpeg, 2, Rect::new(200.0, 700.0, 50.0, 50.0))
        .unwrap();

    let saved = doc.to_bytes().unwrap();
    let parsed = lopdf::Document::load_mem(&saved).unwrap();
    let image_streams = parsed
        .objects
        .values()
        .filter(|obj| {
            obj.as_stream()
                .ok()
                .and_then(|s| s.dict.get(b"Subtype").ok())
                .and_then(|s| s.as_name().ok())
                == Some(b"Image".as_slice())
        })
        .count();
    assert_eq!(image_streams, 1);
    assert!(page_content(&saved, 2).contains("/Im1 Do"));
}
