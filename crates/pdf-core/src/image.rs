//! Image XObjects
//!
//! JPEG bytes are embedded untouched behind `DCTDecode`. PNG is decoded,
//! flattened onto white and re-compressed with `FlateDecode`.

use std::io::{Cursor, Write};

use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::DynamicImage;
use lopdf::{dictionary, Stream};

use crate::graphics::Rect;
use crate::text::fmt_num;
use crate::{PdfError, Result};

impl From<image::ImageError> for PdfError {
    fn from(err: image::ImageError) -> Self {
        PdfError::ImageError(err.to_string())
    }
}

/// Detected image format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Sniff the format from the leading bytes
pub fn detect_format(data: &[u8]) -> Result<ImageFormat> {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Ok(ImageFormat::Jpeg)
    } else if data.starts_with(&PNG_SIGNATURE) {
        Ok(ImageFormat::Png)
    } else {
        Err(PdfError::ImageError("not a JPEG or PNG image".to_string()))
    }
}

/// Largest box with the source aspect ratio that fits in `target`, centered
pub fn fit_rect(source_width: u32, source_height: u32, target: Rect) -> Rect {
    if source_width == 0 || source_height == 0 {
        return target;
    }
    let scale = (target.width / f64::from(source_width)).min(target.height / f64::from(source_height));
    let width = f64::from(source_width) * scale;
    let height = f64::from(source_height) * scale;
    Rect::new(
        target.x + (target.width - width) / 2.0,
        target.y + (target.height - height) / 2.0,
        width,
        height,
    )
}

/// Frame header fields of a baseline or progressive JPEG
fn jpeg_frame(data: &[u8]) -> Option<(u32, u32, u8)> {
    let mut pos = 2;
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }
        let marker = data[pos + 1];
        // SOFn, excluding DHT (C4), JPG (C8) and DAC (CC)
        let is_frame = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_frame {
            let header = data.get(pos + 5..pos + 10)?;
            let height = u16::from_be_bytes([header[0], header[1]]);
            let width = u16::from_be_bytes([header[2], header[3]]);
            return Some((u32::from(width), u32::from(height), header[4]));
        }
        let length = usize::from(u16::from_be_bytes([data[pos + 2], data[pos + 3]]));
        if length < 2 {
            return None;
        }
        pos += 2 + length;
    }
    None
}

/// Image ready to be written as a PDF XObject
#[derive(Debug, Clone)]
pub(crate) struct ImageXObject {
    pub width: u32,
    pub height: u32,
    pub color_space: &'static str,
    pub filter: &'static str,
    pub data: Vec<u8>,
}

impl ImageXObject {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        match detect_format(data)? {
            ImageFormat::Jpeg => Self::from_jpeg(data),
            ImageFormat::Png => Self::from_png(data),
        }
    }

    fn from_jpeg(data: &[u8]) -> Result<Self> {
        let (width, height, components) = jpeg_frame(data)
            .ok_or_else(|| PdfError::ImageError("JPEG has no frame header".to_string()))?;
        let color_space = match components {
            1 => "DeviceGray",
            4 => "DeviceCMYK",
            _ => "DeviceRGB",
        };
        Ok(Self {
            width,
            height,
            color_space,
            filter: "DCTDecode",
            data: data.to_vec(),
        })
    }

    fn from_png(data: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory_with_format(data, image::ImageFormat::Png)?;
        let (width, height) = (decoded.width(), decoded.height());
        let has_alpha = decoded.color().has_alpha();

        let (pixels, color_space): (Vec<u8>, &str) = if decoded.color().has_color() {
            let rgba = decoded.to_rgba8();
            let pixels = rgba
                .pixels()
                .flat_map(|p| [0, 1, 2].map(|c| over_white(p[c], if has_alpha { p[3] } else { 255 })))
                .collect();
            (pixels, "DeviceRGB")
        } else {
            let gray = decoded.to_luma_alpha8();
            let pixels = gray
                .pixels()
                .map(|p| over_white(p[0], if has_alpha { p[1] } else { 255 }))
                .collect();
            (pixels, "DeviceGray")
        };

        Ok(Self {
            width,
            height,
            color_space,
            filter: "FlateDecode",
            data: deflate(&pixels)?,
        })
    }

    pub fn to_pdf_stream(&self) -> Stream {
        Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(self.width),
                "Height" => i64::from(self.height),
                "ColorSpace" => self.color_space,
                "BitsPerComponent" => 8_i64,
                "Filter" => self.filter,
            },
            self.data.clone(),
        )
    }
}

fn deflate(raw: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw)?;
    Ok(encoder.finish()?)
}

fn over_white(value: u8, alpha: u8) -> u8 {
    let a = u16::from(alpha);
    ((u16::from(value) * a + 255 * (255 - a)) / 255) as u8
}

/// Content-stream operators painting `name` into `rect`
pub(crate) fn image_operators(name: &str, rect: Rect) -> Vec<u8> {
    format!(
        "q\n{} 0 0 {} {} {} cm\n/{name} Do\nQ\n",
        fmt_num(rect.width),
        fmt_num(rect.height),
        fmt_num(rect.x),
        fmt_num(rect.y)
    )
    .into_bytes()
}

/// Encode a decoded image as PNG, for tests and callers producing bitmaps
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn translucent_png() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([255, 0, 0, 128]));
        encode_png(&DynamicImage::ImageRgba8(img)).unwrap()
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format(&[0xFF, 0xD8, 0xFF, 0xE0]).unwrap(), ImageFormat::Jpeg);
        assert_eq!(detect_format(&PNG_SIGNATURE).unwrap(), ImageFormat::Png);
        assert!(detect_format(b"<html>404</html>").is_err());
        assert!(detect_format(&[0x89]).is_err());
    }

    #[test]
    fn test_jpeg_frame_header() {
        let jpeg = [
            0xFF, 0xD8, // SOI
            0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00, // APP0, skipped
            0xFF, 0xC0, 0x00, 0x11, 0x08, // SOF0, precision
            0x00, 0x64, // height 100
            0x00, 0xC8, // width 200
            0x03, 0x01, 0x22, 0x00, 0xFF, 0xD9,
        ];
        let xobject = ImageXObject::from_bytes(&jpeg).unwrap();
        assert_eq!((xobject.width, xobject.height), (200, 100));
        assert_eq!(xobject.color_space, "DeviceRGB");
        assert_eq!(xobject.filter, "DCTDecode");

        assert!(jpeg_frame(&[0xFF, 0xD8, 0xFF, 0x00, 0x00, 0x00]).is_none());
    }

    #[test]
    fn test_png_is_flattened() {
        let xobject = ImageXObject::from_bytes(&translucent_png()).unwrap();
        assert_eq!((xobject.width, xobject.height), (3, 2));
        assert_eq!(xobject.color_space, "DeviceRGB");
        assert_eq!(xobject.filter, "FlateDecode");
        assert_eq!(over_white(255, 128), 255);
        assert_eq!(over_white(0, 255), 0);
        assert_eq!(over_white(0, 0), 255);
    }

    #[test]
    fn test_gray_png_stays_gray() {
        let img = image::GrayImage::from_pixel(4, 4, image::Luma([0]));
        let png = encode_png(&DynamicImage::ImageLuma8(img)).unwrap();
        let xobject = ImageXObject::from_bytes(&png).unwrap();
        assert_eq!(xobject.color_space, "DeviceGray");
    }

    #[test]
    fn test_fit_rect_centers() {
        // 800x600 into 100x200: width-limited, centered vertically
        let fitted = fit_rect(800, 600, Rect::new(0.0, 0.0, 100.0, 200.0));
        assert_eq!(fitted, Rect::new(0.0, 62.5, 100.0, 75.0));

        let fitted = fit_rect(600, 800, Rect::new(10.0, 10.0, 200.0, 100.0));
        assert_eq!(fitted, Rect::new(72.5, 10.0, 75.0, 100.0));

        let target = Rect::new(1.0, 2.0, 20.0, 10.0);
        assert_eq!(fit_rect(0, 0, target), target);
    }

    #[test]
    fn test_image_operators() {
        let ops = image_operators("Im1", Rect::new(100.0, 200.0, 50.0, 75.0));
        let ops = String::from_utf8(ops).unwrap();
        assert!(ops.contains("50 0 0 75 100 200 cm"));
        assert!(ops.contains("/Im1 Do"));
    }

    #[test]
    fn test_stream_dictionary() {
        let xobject = ImageXObject::from_bytes(&translucent_png()).unwrap();
        let stream = xobject.to_pdf_stream();
        assert_eq!(stream.dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Image");
        assert_eq!(stream.dict.get(b"Width").unwrap().as_i64().unwrap(), 3);
    }
}
