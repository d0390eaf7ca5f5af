//! Raster payloads: data URIs, PNG encode/decode and PDF image XObjects

use std::io::{Cursor, Write};

use base64::{engine::general_purpose::STANDARD, Engine};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::codecs::jpeg::JpegDecoder;
use image::{ExtendedColorType, ImageDecoder, RgbaImage};
use lopdf::{Dictionary, Object, Stream};

use crate::error::ExportError;

/// Encoding of an embedded mark, chosen from the data URI's media type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    Png,
    Jpeg,
}

impl PayloadFormat {
    /// `image/png` is PNG; every other media type is embedded as JPEG
    pub fn from_media_type(media_type: &str) -> Self {
        if media_type.eq_ignore_ascii_case("image/png") {
            PayloadFormat::Png
        } else {
            PayloadFormat::Jpeg
        }
    }
}

/// Decoded `data:` URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl DataUri {
    pub fn parse(uri: &str) -> Result<Self, ExportError> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| ExportError::DataUri("missing data: scheme".to_string()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| ExportError::DataUri("missing ',' separator".to_string()))?;

        let mut params = header.split(';');
        let media_type = params.next().unwrap_or_default().trim().to_string();
        if !params.any(|p| p.trim().eq_ignore_ascii_case("base64")) {
            return Err(ExportError::DataUri(
                "only base64 data URIs are supported".to_string(),
            ));
        }

        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| ExportError::DataUri(format!("bad base64 payload: {}", e)))?;

        Ok(Self { media_type, bytes })
    }

    pub fn format(&self) -> PayloadFormat {
        PayloadFormat::from_media_type(&self.media_type)
    }
}

/// Encode bytes as a `data:` URI
pub fn to_data_uri(media_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", media_type, STANDARD.encode(bytes))
}

/// True when every pixel is fully transparent
pub fn is_blank(raster: &RgbaImage) -> bool {
    raster.pixels().all(|px| px[3] == 0)
}

/// Decode a PNG into 8-bit RGBA whatever its stored colour type
pub fn decode_png(bytes: &[u8]) -> Result<RgbaImage, ExportError> {
    image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
        .map(|decoded| decoded.to_rgba8())
        .map_err(|e| ExportError::ImageDecode(format!("PNG: {}", e)))
}

pub fn encode_png(raster: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    let mut out = Cursor::new(Vec::new());
    raster
        .write_to(&mut out, image::ImageFormat::Png)
        .map_err(|e| ExportError::ImageDecode(format!("PNG encode: {}", e)))?;
    Ok(out.into_inner())
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, ExportError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| ExportError::ImageDecode(format!("compress: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| ExportError::ImageDecode(format!("compress: {}", e)))
}

/// Header facts needed to pass a JPEG through untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegInfo {
    pub width: u32,
    pub height: u32,
    pub color: ExtendedColorType,
}

/// Read a JPEG's header without decoding its scan data
pub fn jpeg_info(bytes: &[u8]) -> Result<JpegInfo, ExportError> {
    let decoder = JpegDecoder::new(Cursor::new(bytes))
        .map_err(|e| ExportError::ImageDecode(format!("payload is not a JPEG image: {}", e)))?;
    let (width, height) = decoder.dimensions();
    Ok(JpegInfo {
        width,
        height,
        color: decoder.original_color_type(),
    })
}

/// An image ready to be added to a PDF: the XObject plus an optional soft mask
pub struct PdfImage {
    pub width: u32,
    pub height: u32,
    pub xobject: Stream,
    pub smask: Option<Stream>,
}

impl PdfImage {
    /// Build the image XObject for a decoded data URI
    pub fn from_data_uri(uri: &DataUri) -> Result<Self, ExportError> {
        match uri.format() {
            PayloadFormat::Png => Self::from_png(&uri.bytes),
            PayloadFormat::Jpeg => Self::from_jpeg(&uri.bytes),
        }
    }

    fn from_png(bytes: &[u8]) -> Result<Self, ExportError> {
        let raster = decode_png(bytes)?;
        let (width, height) = raster.dimensions();
        let rgb: Vec<u8> = raster
            .pixels()
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect();

        let xobject = image_stream(width, height, b"DeviceRGB", b"FlateDecode", deflate(&rgb)?);

        let smask = if raster.pixels().any(|px| px[3] != 255) {
            let alpha: Vec<u8> = raster.pixels().map(|px| px[3]).collect();
            Some(image_stream(
                width,
                height,
                b"DeviceGray",
                b"FlateDecode",
                deflate(&alpha)?,
            ))
        } else {
            None
        };

        Ok(Self {
            width,
            height,
            xobject,
            smask,
        })
    }

    fn from_jpeg(bytes: &[u8]) -> Result<Self, ExportError> {
        let info = jpeg_info(bytes)?;
        let cmyk = matches!(info.color, ExtendedColorType::Cmyk8);
        let color_space: &[u8] = match info.color {
            ExtendedColorType::L8 | ExtendedColorType::La8 => b"DeviceGray",
            ExtendedColorType::Cmyk8 => b"DeviceCMYK",
            _ => b"DeviceRGB",
        };
        let mut xobject = image_stream(
            info.width,
            info.height,
            color_space,
            b"DCTDecode",
            bytes.to_vec(),
        );
        if cmyk {
            // Adobe CMYK JPEGs are stored inverted
            xobject.dict.set(
                "Decode",
                Object::Array(
                    [1, 0, 1, 0, 1, 0, 1, 0]
                        .iter()
                        .map(|&v| Object::Integer(v))
                        .collect(),
                ),
            );
        }
        Ok(Self {
            width: info.width,
            height: info.height,
            xobject,
            smask: None,
        })
    }
}

fn image_stream(width: u32, height: u32, color_space: &[u8], filter: &[u8], data: Vec<u8>) -> Stream {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(width as i64));
    dict.set("Height", Object::Integer(height as i64));
    dict.set("ColorSpace", Object::Name(color_space.to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict.set("Filter", Object::Name(filter.to_vec()));
    // Data is already encoded; keep lopdf from compressing it again
    Stream::new(dict, data).with_compression(false)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{GrayImage, Rgba, RgbImage};
    use pretty_assertions::assert_eq;

    pub(crate) fn tiny_png_data_uri() -> String {
        let mut raster = RgbaImage::new(4, 2);
        raster.put_pixel(1, 1, Rgba([0, 0, 0, 255]));
        to_data_uri("image/png", &encode_png(&raster).unwrap())
    }

    /// Baseline RGB JPEG of the given size
    pub(crate) fn jpeg_fixture(width: u32, height: u32) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30]))
            .write_to(&mut out, image::ImageFormat::Jpeg)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_parse_png_data_uri() {
        let uri = DataUri::parse("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(uri.media_type, "image/png");
        assert_eq!(uri.bytes, b"hello".to_vec());
        assert_eq!(uri.format(), PayloadFormat::Png);
    }

    #[test]
    fn test_non_png_media_type_is_jpeg() {
        let uri = DataUri::parse("data:image/jpeg;base64,AAAA").unwrap();
        assert_eq!(uri.format(), PayloadFormat::Jpeg);
    }

    #[test]
    fn test_rejects_bad_data_uris() {
        assert!(matches!(
            DataUri::parse("http://example.com/a.png"),
            Err(ExportError::DataUri(_))
        ));
        assert!(matches!(
            DataUri::parse("data:image/png;base64"),
            Err(ExportError::DataUri(_))
        ));
        assert!(matches!(
            DataUri::parse("data:image/png,rawdata"),
            Err(ExportError::DataUri(_))
        ));
        assert!(matches!(
            DataUri::parse("data:image/png;base64,***"),
            Err(ExportError::DataUri(_))
        ));
    }

    #[test]
    fn test_png_encode_decode_preserves_pixels() {
        let mut raster = RgbaImage::new(3, 3);
        raster.put_pixel(2, 0, Rgba([10, 20, 30, 255]));
        let decoded = decode_png(&encode_png(&raster).unwrap()).unwrap();
        assert_eq!(decoded, raster);
    }

    #[test]
    fn test_grayscale_png_expands_to_rgba() {
        let mut out = Cursor::new(Vec::new());
        GrayImage::from_pixel(2, 2, image::Luma([90]))
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        let decoded = decode_png(&out.into_inner()).unwrap();
        assert_eq!(decoded.get_pixel(1, 1), &Rgba([90, 90, 90, 255]));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_png(b"not a png"),
            Err(ExportError::ImageDecode(_))
        ));
    }

    #[test]
    fn test_jpeg_header_info() {
        let info = jpeg_info(&jpeg_fixture(64, 48)).unwrap();
        assert_eq!((info.width, info.height), (64, 48));
        assert_eq!(info.color, ExtendedColorType::Rgb8);
        assert!(jpeg_info(b"\x89PNG\r\n\x1a\n").is_err());
    }

    #[test]
    fn test_jpeg_xobject_keeps_bytes() {
        let bytes = jpeg_fixture(16, 8);
        let uri = DataUri {
            media_type: "image/jpeg".to_string(),
            bytes: bytes.clone(),
        };
        let image = PdfImage::from_data_uri(&uri).unwrap();
        assert_eq!(image.xobject.content, bytes);
        assert_eq!(
            image.xobject.dict.get(b"ColorSpace").unwrap(),
            &Object::Name(b"DeviceRGB".to_vec())
        );
        assert!(image.smask.is_none());
    }

    #[test]
    fn test_png_xobject_has_soft_mask_when_transparent() {
        let uri = DataUri::parse(&tiny_png_data_uri()).unwrap();
        let image = PdfImage::from_data_uri(&uri).unwrap();
        assert_eq!((image.width, image.height), (4, 2));
        assert!(image.smask.is_some());
        assert_eq!(
            image.xobject.dict.get(b"Filter").unwrap(),
            &Object::Name(b"FlateDecode".to_vec())
        );
    }

    #[test]
    fn test_png_declared_as_jpeg_is_mismatch() {
        let png = DataUri::parse(&tiny_png_data_uri()).unwrap();
        let mislabeled = DataUri {
            media_type: "image/jpeg".to_string(),
            bytes: png.bytes,
        };
        assert!(matches!(
            PdfImage::from_data_uri(&mislabeled),
            Err(ExportError::ImageDecode(_))
        ));
    }
}
