//! Extraction backend built on lopdf.
//!
//! Implements the [`DocumentOpener`]/[`DocumentSource`]/[`SourcePage`]
//! capability traits. Each page's content stream is scanned once when the
//! page is opened; text, tables, and image regions are served from that scan.

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Document as LopdfDocument, Object, ObjectId, Stream};

use super::layout::{resolve_dict, ContentScanner, PageLayout};
use super::table_detector::{TableDetector, TableDetectorConfig};
use super::{BoundingBox, DocumentOpener, DocumentSource, SourcePage};
use crate::detect::pdf_version_from_path;
use crate::error::{Error, Result};
use crate::model::Grid;

/// US Letter, used when a page has no usable MediaBox.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Opens PDF files with lopdf.
#[derive(Debug, Clone)]
pub struct LopdfOpener {
    detector: TableDetectorConfig,
    detect_tables: bool,
}

impl Default for LopdfOpener {
    fn default() -> Self {
        Self {
            detector: TableDetectorConfig::default(),
            detect_tables: true,
        }
    }
}

impl LopdfOpener {
    /// Create an opener with default table detection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom table detector configuration.
    pub fn with_table_config(mut self, config: TableDetectorConfig) -> Self {
        self.detector = config;
        self
    }

    /// Enable or disable table detection. Disabled pages report no tables.
    pub fn with_table_detection(mut self, enabled: bool) -> Self {
        self.detect_tables = enabled;
        self
    }
}

impl DocumentOpener for LopdfOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn DocumentSource>> {
        let version = pdf_version_from_path(path)?;
        let doc = LopdfDocument::load(path)?;

        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        log::debug!(
            "Opened {} (PDF {}, {} pages)",
            path.display(),
            version,
            pages.len()
        );

        Ok(Box::new(LopdfSource {
            doc,
            pages,
            detector: self
                .detect_tables
                .then(|| TableDetector::with_config(self.detector.clone())),
        }))
    }
}

/// A PDF loaded into memory.
pub struct LopdfSource {
    doc: LopdfDocument,
    pages: Vec<ObjectId>,
    detector: Option<TableDetector>,
}

impl DocumentSource for LopdfSource {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page(&self, index: usize) -> Result<Box<dyn SourcePage + '_>> {
        let page_id = *self.pages.get(index).ok_or(Error::PageOutOfRange {
            requested: index + 1,
            available: self.pages.len(),
        })?;

        let [x0, y0, x1, y1] = self.media_box(page_id);
        let width = (x1 - x0).abs();
        let height = (y1 - y0).abs();
        let layout = ContentScanner::new(&self.doc, page_id, (x0.min(x1), y0.min(y1)), height)
            .scan()?;

        Ok(Box::new(LopdfPage {
            doc: &self.doc,
            number: index as u32 + 1,
            width,
            height,
            layout,
            detector: self.detector.as_ref(),
        }))
    }
}

impl LopdfSource {
    /// MediaBox of a page, inherited from parents when absent.
    fn media_box(&self, page_id: ObjectId) -> [f32; 4] {
        let mut node = match self.doc.get_dictionary(page_id) {
            Ok(d) => d,
            Err(_) => return DEFAULT_MEDIA_BOX,
        };
        for _ in 0..32 {
            if let Ok(array) = node.get(b"MediaBox").and_then(|o| o.as_array()) {
                let nums: Vec<f32> = array.iter().filter_map(|o| o.as_float().ok()).collect();
                if nums.len() == 4 {
                    return [nums[0], nums[1], nums[2], nums[3]];
                }
            }
            match node
                .get(b"Parent")
                .and_then(|p| p.as_reference())
                .and_then(|r| self.doc.get_dictionary(r))
            {
                Ok(parent) => node = parent,
                Err(_) => break,
            }
        }
        DEFAULT_MEDIA_BOX
    }
}

/// One scanned page.
pub struct LopdfPage<'a> {
    doc: &'a LopdfDocument,
    number: u32,
    width: f32,
    height: f32,
    layout: PageLayout,
    detector: Option<&'a TableDetector>,
}

impl SourcePage for LopdfPage<'_> {
    fn number(&self) -> u32 {
        self.number
    }

    fn width(&self) -> f32 {
        self.width
    }

    fn height(&self) -> f32 {
        self.height
    }

    fn extract_text(&self) -> Result<String> {
        Ok(self.layout.text())
    }

    fn extract_tables(&self) -> Result<Vec<Grid>> {
        Ok(self
            .detector
            .map(|d| d.detect(&self.layout.spans))
            .unwrap_or_default())
    }

    fn list_images(&self) -> Vec<BoundingBox> {
        self.layout.images.iter().map(|p| p.bbox).collect()
    }

    fn render_region(&self, region: &BoundingBox) -> Result<Vec<u8>> {
        let placement = self
            .layout
            .images
            .iter()
            .filter(|p| p.bbox.overlap_area(region) > 0.0)
            .max_by(|a, b| {
                a.bbox
                    .overlap_area(region)
                    .partial_cmp(&b.bbox.overlap_area(region))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .ok_or_else(|| {
                Error::ImageExtract(format!(
                    "no image drawn under region {:?} on page {}",
                    region, self.number
                ))
            })?;

        let stream = match self.doc.get_object(placement.object_id)? {
            Object::Stream(s) => s,
            _ => return Err(Error::ImageExtract("image XObject is not a stream".into())),
        };
        let image = decode_image_stream(self.doc, stream)?;
        let cropped = crop_to_region(&image, &placement.bbox, region);

        let mut buf = Cursor::new(Vec::new());
        cropped.write_to(&mut buf, ImageFormat::Png)?;
        Ok(buf.into_inner())
    }
}

/// Cut the part of `image` (drawn over `drawn`) that lies inside `region`.
fn crop_to_region(image: &DynamicImage, drawn: &BoundingBox, region: &BoundingBox) -> DynamicImage {
    let (w, h) = (image.width() as f32, image.height() as f32);
    let dw = drawn.width().max(f32::EPSILON);
    let dh = drawn.height().max(f32::EPSILON);

    let fx0 = ((region.x0 - drawn.x0) / dw).clamp(0.0, 1.0);
    let fx1 = ((region.x1 - drawn.x0) / dw).clamp(0.0, 1.0);
    let fy0 = ((region.top - drawn.top) / dh).clamp(0.0, 1.0);
    let fy1 = ((region.bottom - drawn.top) / dh).clamp(0.0, 1.0);

    let px = (fx0 * w).floor() as u32;
    let py = (fy0 * h).floor() as u32;
    let pw = (((fx1 - fx0) * w).round() as u32).max(1);
    let ph = (((fy1 - fy0) * h).round() as u32).max(1);

    if px == 0 && py == 0 && pw >= image.width() && ph >= image.height() {
        return image.clone();
    }
    image.crop_imm(px, py, pw, ph)
}

/// Decode an image XObject into pixels.
///
/// Supports JPEG (`DCTDecode`) and 8-bit gray, RGB, or CMYK samples behind
/// any filter lopdf can decompress.
fn decode_image_stream(doc: &LopdfDocument, stream: &Stream) -> Result<DynamicImage> {
    let dict = &stream.dict;
    let filters = stream_filters(dict.get(b"Filter").ok());

    if filters.iter().any(|f| f == "DCTDecode") {
        let data = if filters.len() > 1 {
            stream.decompressed_content()?
        } else {
            stream.content.clone()
        };
        return Ok(image::load_from_memory_with_format(&data, ImageFormat::Jpeg)?);
    }
    if let Some(f) = filters
        .iter()
        .find(|f| matches!(f.as_str(), "JPXDecode" | "JBIG2Decode" | "CCITTFaxDecode"))
    {
        return Err(Error::ImageExtract(format!("{} images are not supported", f)));
    }

    let width = dict_u32(dict, b"Width")?;
    let height = dict_u32(dict, b"Height")?;
    let bits = dict
        .get(b"BitsPerComponent")
        .and_then(|o| o.as_i64())
        .unwrap_or(8);
    if bits != 8 {
        return Err(Error::ImageExtract(format!(
            "{} bits per component is not supported",
            bits
        )));
    }

    let components = color_components(doc, dict.get(b"ColorSpace").ok())?;
    let data = if filters.is_empty() {
        stream.content.clone()
    } else {
        stream.decompressed_content()?
    };

    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(components))
        .ok_or_else(|| {
            Error::ImageExtract(format!("image size {}x{} overflows", width, height))
        })?;
    if data.len() < expected {
        return Err(Error::ImageExtract(format!(
            "image data too short: {} < {}",
            data.len(),
            expected
        )));
    }
    let samples = data[..expected].to_vec();

    let image = match components {
        1 => GrayImage::from_raw(width, height, samples).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(width, height, samples).map(DynamicImage::ImageRgb8),
        _ => RgbImage::from_raw(width, height, cmyk_to_rgb(&samples)).map(DynamicImage::ImageRgb8),
    };
    image.ok_or_else(|| Error::ImageExtract("pixel buffer does not match dimensions".into()))
}

fn stream_filters(filter: Option<&Object>) -> Vec<String> {
    match filter {
        Some(Object::Name(n)) => vec![String::from_utf8_lossy(n).to_string()],
        Some(Object::Array(arr)) => arr
            .iter()
            .filter_map(|o| o.as_name_str().ok())
            .map(String::from)
            .collect(),
        _ => vec![],
    }
}

fn dict_u32(dict: &lopdf::Dictionary, key: &[u8]) -> Result<u32> {
    dict.get(key)
        .and_then(|o| o.as_i64())
        .ok()
        .and_then(|v| u32::try_from(v).ok())
        .filter(|v| *v > 0)
        .ok_or_else(|| {
            Error::ImageExtract(format!(
                "image has no valid /{}",
                String::from_utf8_lossy(key)
            ))
        })
}

/// Number of color components for a color space entry.
fn color_components(doc: &LopdfDocument, cs: Option<&Object>) -> Result<usize> {
    let cs = match cs {
        Some(Object::Reference(r)) => Some(doc.get_object(*r)?),
        other => other,
    };
    let (name, arg) = match cs {
        None => return Ok(1),
        Some(Object::Name(n)) => (String::from_utf8_lossy(n).to_string(), None),
        Some(Object::Array(arr)) => (
            arr.first()
                .and_then(|o| o.as_name_str().ok())
                .unwrap_or_default()
                .to_string(),
            arr.get(1),
        ),
        Some(_) => return Err(Error::ImageExtract("invalid color space".into())),
    };

    match name.as_str() {
        "DeviceGray" | "CalGray" | "G" => Ok(1),
        "DeviceRGB" | "CalRGB" | "RGB" => Ok(3),
        "DeviceCMYK" | "CMYK" => Ok(4),
        "ICCBased" => {
            let n = arg
                .and_then(|o| o.as_reference().ok())
                .and_then(|r| doc.get_object(r).ok())
                .and_then(|o| match o {
                    Object::Stream(s) => s.dict.get(b"N").and_then(|n| n.as_i64()).ok(),
                    other => resolve_dict(doc, other)
                        .and_then(|d| d.get(b"N").and_then(|n| n.as_i64()).ok()),
                })
                .unwrap_or(3);
            match n {
                1 | 3 | 4 => Ok(n as usize),
                _ => Err(Error::ImageExtract(format!("ICC profile with {} components", n))),
            }
        }
        other => Err(Error::ImageExtract(format!(
            "color space {} is not supported",
            other
        ))),
    }
}

fn cmyk_to_rgb(samples: &[u8]) -> Vec<u8> {
    samples
        .chunks_exact(4)
        .flat_map(|px| {
            let k = 255 - px[3] as u16;
            [0, 1, 2].map(|i| ((255 - px[i] as u16) * k / 255) as u8)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn test_stream_filters() {
        assert!(stream_filters(None).is_empty());
        assert_eq!(
            stream_filters(Some(&Object::Name(b"FlateDecode".to_vec()))),
            vec!["FlateDecode"]
        );
        let arr = Object::Array(vec![
            Object::Name(b"FlateDecode".to_vec()),
            Object::Name(b"DCTDecode".to_vec()),
        ]);
        assert_eq!(stream_filters(Some(&arr)), vec!["FlateDecode", "DCTDecode"]);
    }

    #[test]
    fn test_cmyk_to_rgb() {
        assert_eq!(cmyk_to_rgb(&[0, 0, 0, 0]), vec![255, 255, 255]);
        assert_eq!(cmyk_to_rgb(&[0, 0, 0, 255]), vec![0, 0, 0]);
        assert_eq!(cmyk_to_rgb(&[255, 0, 0, 0]), vec![0, 255, 255]);
    }

    #[test]
    fn test_decode_raw_rgb_stream() {
        let doc = LopdfDocument::with_version("1.5");
        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 2,
                "Height" => 1,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            vec![255, 0, 0, 0, 0, 255],
        );
        let image = decode_image_stream(&doc, &stream).unwrap();
        assert_eq!((image.width(), image.height()), (2, 1));
        assert_eq!(image.to_rgb8().get_pixel(1, 0).0, [0, 0, 255]);
    }

    #[test]
    fn test_decode_oversized_dimensions() {
        let doc = LopdfDocument::with_version("1.5");
        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => u32::MAX as i64,
                "Height" => u32::MAX as i64,
                "ColorSpace" => "DeviceCMYK",
                "BitsPerComponent" => 8,
            },
            vec![0; 16],
        );
        assert!(matches!(
            decode_image_stream(&doc, &stream),
            Err(Error::ImageExtract(_))
        ));
    }

    #[test]
    fn test_crop_to_region() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(100, 50));
        let drawn = BoundingBox::new(0.0, 0.0, 200.0, 100.0);

        let half = crop_to_region(&image, &drawn, &BoundingBox::new(100.0, 0.0, 200.0, 100.0));
        assert_eq!((half.width(), half.height()), (50, 50));

        let whole = crop_to_region(&image, &drawn, &BoundingBox::new(-10.0, -10.0, 300.0, 300.0));
        assert_eq!((whole.width(), whole.height()), (100, 50));
    }
}
