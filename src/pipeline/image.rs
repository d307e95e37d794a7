//! Image resolution: reference → bytes → format → display size.
//!
//! ## Dimension inference without a decoder
//!
//! Only two header layouts are read, straight from the raw bytes:
//!
//! | Format | Magic | Width | Height |
//! |--------|-------|-------|--------|
//! | PNG  | `89 50 4E 47` | BE u32 @ 16 | BE u32 @ 20 (IHDR is always the first chunk) |
//! | JPEG | `FF D8` | BE u16 @ SOF0+7 | BE u16 @ SOF0+5 |
//!
//! The JPEG scan looks for the baseline `FF C0` marker from offset 2 and
//! stops 10 bytes before the end of the buffer, so every read stays in
//! bounds. GIF and BMP are never sniffed; they, and any header the sniffers
//! do not recognise, get the configured default size unscaled.

use crate::config::ImageBounds;
use crate::error::ImageError;
use crate::model::{ImageBlock, ImageFormat};
use crate::pipeline::assets::AssetSource;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

const PNG_MAGIC: [u8; 4] = [0x89, 0x50, 0x4E, 0x47];
const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
const JPEG_SOF0: [u8; 2] = [0xFF, 0xC0];
/// Bytes left unscanned at the end of a JPEG buffer.
const JPEG_SCAN_TAIL: usize = 10;

static RE_WIKI_IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^!\[\[(.+?)\]\]").unwrap());
static RE_MD_IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^!\[(.*?)\]\((.*?)\)").unwrap());

/// An image reference taken from a Markdown line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub url: String,
    pub alt_text: String,
}

/// Parse `![[path]]` (tried first) or `![alt](path)` at the start of `line`.
///
/// For the wiki form the alt text is the full inner text and an
/// `|alias`/`|size` suffix is dropped from the path. For the standard form
/// `<…>` brackets around the path and a trailing `"title"` are removed.
pub fn parse_reference(line: &str) -> Option<ImageReference> {
    if let Some(caps) = RE_WIKI_IMAGE.captures(line) {
        let inner = &caps[1];
        let path = inner.split('|').next().unwrap_or(inner).trim();
        return Some(ImageReference {
            url: path.to_string(),
            alt_text: inner.to_string(),
        });
    }

    let caps = RE_MD_IMAGE.captures(line)?;
    let mut target = caps[2].trim();
    if let Some((path, _title)) = target.split_once(" \"") {
        target = path.trim_end();
    }
    let target = target
        .strip_prefix('<')
        .and_then(|t| t.strip_suffix('>'))
        .unwrap_or(target);
    Some(ImageReference {
        url: target.to_string(),
        alt_text: caps[1].to_string(),
    })
}

/// Text of the paragraph that stands in for an image that failed to resolve.
pub fn placeholder_text(alt_text: &str) -> String {
    format!("[Image: {alt_text}]")
}

impl ImageFormat {
    /// Detect the format from the file suffix, case-insensitively.
    ///
    /// `.svg` is rejected; unknown or missing suffixes default to JPEG.
    pub fn from_path(path: &str) -> Result<Self, ImageError> {
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpg" | "jpeg" => Ok(ImageFormat::Jpg),
            "gif" => Ok(ImageFormat::Gif),
            "bmp" => Ok(ImageFormat::Bmp),
            "svg" => Err(ImageError::UnsupportedFormat {
                path: path.to_string(),
                extension: ext,
            }),
            _ => Ok(ImageFormat::Jpg),
        }
    }
}

/// Pixel size read from an image header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// A header whose magic bytes matched but whose size fields are unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    #[error("{format} header truncated at {len} bytes")]
    Truncated { format: &'static str, len: usize },
    #[error("{format} header declares a zero dimension ({width}x{height})")]
    ZeroSize {
        format: &'static str,
        width: u32,
        height: u32,
    },
}

fn be_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

fn be_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([data[offset], data[offset + 1]])
}

fn checked(format: &'static str, width: u32, height: u32) -> Result<Dimensions, HeaderError> {
    if width == 0 || height == 0 {
        return Err(HeaderError::ZeroSize {
            format,
            width,
            height,
        });
    }
    Ok(Dimensions { width, height })
}

/// Read width/height from the IHDR chunk of a PNG buffer.
///
/// `Ok(None)` when the buffer does not start with the PNG magic.
pub fn png_dimensions(data: &[u8]) -> Result<Option<Dimensions>, HeaderError> {
    if !data.starts_with(&PNG_MAGIC) {
        return Ok(None);
    }
    if data.len() < 24 {
        return Err(HeaderError::Truncated {
            format: "PNG",
            len: data.len(),
        });
    }
    checked("PNG", be_u32(data, 16), be_u32(data, 20)).map(Some)
}

/// Read width/height from the first baseline SOF0 marker of a JPEG buffer.
///
/// `Ok(None)` when the buffer does not start with `FF D8` or no SOF0 marker
/// appears before the last 10 bytes (progressive JPEGs use SOF2 and land here).
pub fn jpeg_dimensions(data: &[u8]) -> Result<Option<Dimensions>, HeaderError> {
    if !data.starts_with(&JPEG_SOI) {
        return Ok(None);
    }
    let end = data.len().saturating_sub(JPEG_SCAN_TAIL);
    let mut i = 2;
    while i < end {
        if data[i..i + 2] == JPEG_SOF0 {
            let height = be_u16(data, i + 5) as u32;
            let width = be_u16(data, i + 7) as u32;
            return checked("JPEG", width, height).map(Some);
        }
        i += 1;
    }
    Ok(None)
}

/// Dispatch to the sniffer for `format`; GIF and BMP are not inspected.
pub fn sniff_dimensions(
    format: ImageFormat,
    data: &[u8],
) -> Result<Option<Dimensions>, HeaderError> {
    match format {
        ImageFormat::Png => png_dimensions(data),
        ImageFormat::Jpg => jpeg_dimensions(data),
        ImageFormat::Gif | ImageFormat::Bmp => Ok(None),
    }
}

/// Shrink `width`×`height` to fit the bounds, preserving aspect ratio.
///
/// `scale = min(max_w / w, max_h / h, 1.0)`, so images are never enlarged.
pub fn scale_to_fit(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width, height);
    }
    let scale = (max_width as f64 / width as f64)
        .min(max_height as f64 / height as f64)
        .min(1.0);
    let w = ((width as f64 * scale).round() as u32).max(1);
    let h = ((height as f64 * scale).round() as u32).max(1);
    (w, h)
}

/// Resolves image references against an [`AssetSource`] within fixed bounds.
pub struct ImageResolver<'a, A: AssetSource + ?Sized> {
    assets: &'a A,
    bounds: ImageBounds,
}

impl<'a, A: AssetSource + ?Sized> ImageResolver<'a, A> {
    pub fn new(assets: &'a A, bounds: ImageBounds) -> Self {
        Self { assets, bounds }
    }

    /// Look up, identify and size one image.
    ///
    /// Every failure comes back as an [`ImageError`]; nothing here panics or
    /// aborts the surrounding conversion.
    pub async fn resolve(&self, reference: &ImageReference) -> Result<ImageBlock, ImageError> {
        let format = ImageFormat::from_path(&reference.url)?;
        let data = self.assets.lookup(&reference.url).await?;
        if data.is_empty() {
            return Err(ImageError::CorruptHeader {
                path: reference.url.clone(),
                detail: "file is empty".into(),
            });
        }

        let sniffed = sniff_dimensions(format, &data).map_err(|e| ImageError::CorruptHeader {
            path: reference.url.clone(),
            detail: e.to_string(),
        })?;

        let (width, height) = match sniffed {
            Some(dims) => {
                let scaled = scale_to_fit(
                    dims.width,
                    dims.height,
                    self.bounds.max_width,
                    self.bounds.max_height,
                );
                debug!(
                    "Image {}: {}x{} -> {}x{}",
                    reference.url, dims.width, dims.height, scaled.0, scaled.1
                );
                scaled
            }
            None => {
                debug!(
                    "Image {}: no dimensions for {}, using default {}x{}",
                    reference.url, format, self.bounds.default_width, self.bounds.default_height
                );
                (self.bounds.default_width, self.bounds.default_height)
            }
        };

        Ok(ImageBlock {
            data,
            format,
            width,
            height,
            alt_text: reference.alt_text.clone(),
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Minimal PNG prefix: magic, IHDR length/type, width, height, rest of IHDR.
    pub fn png_header(width: u32, height: u32) -> Vec<u8> {
        let mut data = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        data.extend_from_slice(&[0x00, 0x00, 0x00, 0x0D]);
        data.extend_from_slice(b"IHDR");
        data.extend_from_slice(&width.to_be_bytes());
        data.extend_from_slice(&height.to_be_bytes());
        data.extend_from_slice(&[0x08, 0x06, 0x00, 0x00, 0x00]);
        data.extend_from_slice(&[0x00; 4]);
        data
    }

    /// SOI, an APP0 stub, then a SOF0 segment followed by padding.
    pub fn jpeg_header(width: u16, height: u16) -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8];
        data.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
        data.extend_from_slice(b"JFIF\0");
        data.extend_from_slice(&[0x01, 0x01, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00]);
        data.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08]);
        data.extend_from_slice(&height.to_be_bytes());
        data.extend_from_slice(&width.to_be_bytes());
        data.extend_from_slice(&[0x03, 0x01, 0x22, 0x00]);
        data.extend_from_slice(&[0x00; 16]);
        data
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{jpeg_header, png_header};
    use super::*;
    use crate::pipeline::assets::MemoryAssetSource;

    fn bounds(max_width: u32, max_height: u32) -> ImageBounds {
        ImageBounds {
            max_width,
            max_height,
            default_width: 120,
            default_height: 90,
        }
    }

    // ── Reference parsing ────────────────────────────────────────────────

    #[test]
    fn wiki_reference_uses_path_as_alt() {
        let r = parse_reference("![[assets/cat.png]]").unwrap();
        assert_eq!(r.url, "assets/cat.png");
        assert_eq!(r.alt_text, "assets/cat.png");
    }

    #[test]
    fn wiki_reference_drops_size_suffix_from_path() {
        let r = parse_reference("![[cat.png|300]]").unwrap();
        assert_eq!(r.url, "cat.png");
        assert_eq!(r.alt_text, "cat.png|300");
    }

    #[test]
    fn standard_reference() {
        let r = parse_reference("![A cat](img/cat.jpg)").unwrap();
        assert_eq!(r.url, "img/cat.jpg");
        assert_eq!(r.alt_text, "A cat");
    }

    #[test]
    fn standard_reference_with_title_and_brackets() {
        let r = parse_reference(r#"![x](<my pics/a.png> "Title")"#).unwrap();
        assert_eq!(r.url, "my pics/a.png");
        let r = parse_reference(r#"![x](a.png "Title")"#).unwrap();
        assert_eq!(r.url, "a.png");
    }

    #[test]
    fn wiki_form_has_priority() {
        let r = parse_reference("![[a.png]](b.png)").unwrap();
        assert_eq!(r.url, "a.png");
    }

    #[test]
    fn malformed_reference_is_none() {
        assert!(parse_reference("![no closing").is_none());
        assert!(parse_reference("![alt] (gap.png)").is_none());
    }

    // ── Format detection ─────────────────────────────────────────────────

    #[test]
    fn format_from_suffix() {
        assert_eq!(ImageFormat::from_path("a.PNG").unwrap(), ImageFormat::Png);
        assert_eq!(ImageFormat::from_path("a.jpeg").unwrap(), ImageFormat::Jpg);
        assert_eq!(ImageFormat::from_path("a.JPG").unwrap(), ImageFormat::Jpg);
        assert_eq!(ImageFormat::from_path("a.gif").unwrap(), ImageFormat::Gif);
        assert_eq!(ImageFormat::from_path("a.bmp").unwrap(), ImageFormat::Bmp);
        assert_eq!(ImageFormat::from_path("a.webp").unwrap(), ImageFormat::Jpg);
        assert_eq!(ImageFormat::from_path("noext").unwrap(), ImageFormat::Jpg);
    }

    #[test]
    fn svg_is_unsupported() {
        assert_eq!(
            ImageFormat::from_path("diagram.SVG"),
            Err(ImageError::UnsupportedFormat {
                path: "diagram.SVG".into(),
                extension: "svg".into(),
            })
        );
    }

    // ── PNG sniffing ─────────────────────────────────────────────────────

    #[test]
    fn png_reads_ihdr() {
        assert_eq!(
            png_dimensions(&png_header(800, 600)),
            Ok(Some(Dimensions {
                width: 800,
                height: 600
            }))
        );
    }

    #[test]
    fn png_wrong_magic_is_none() {
        let mut data = png_header(10, 10);
        data[1] = b'X';
        assert_eq!(png_dimensions(&data), Ok(None));
        assert_eq!(png_dimensions(&[]), Ok(None));
    }

    #[test]
    fn png_truncated_is_an_error() {
        let data = &png_header(10, 10)[..20];
        assert_eq!(
            png_dimensions(data),
            Err(HeaderError::Truncated {
                format: "PNG",
                len: 20
            })
        );
    }

    #[test]
    fn png_zero_width_is_an_error() {
        assert!(matches!(
            png_dimensions(&png_header(0, 10)),
            Err(HeaderError::ZeroSize { .. })
        ));
    }

    // ── JPEG sniffing ────────────────────────────────────────────────────

    #[test]
    fn jpeg_reads_sof0() {
        assert_eq!(
            jpeg_dimensions(&jpeg_header(1024, 768)),
            Ok(Some(Dimensions {
                width: 1024,
                height: 768
            }))
        );
    }

    #[test]
    fn jpeg_without_sof0_is_none() {
        let mut data = vec![0xFF, 0xD8, 0xFF, 0xC2, 0x00, 0x11, 0x08, 0x01, 0x00, 0x01, 0x00];
        data.extend_from_slice(&[0x00; 32]);
        assert_eq!(jpeg_dimensions(&data), Ok(None));
    }

    #[test]
    fn jpeg_marker_in_last_ten_bytes_is_ignored() {
        // 2-byte SOI, 4 bytes padding, then SOF0 within the unscanned tail.
        let mut data = vec![0xFF, 0xD8, 0, 0, 0, 0];
        data.extend_from_slice(&[0xFF, 0xC0, 0, 0, 0, 0, 1, 0, 1, 0]);
        assert_eq!(data.len(), 16);
        assert_eq!(jpeg_dimensions(&data), Ok(None));
    }

    #[test]
    fn jpeg_short_buffers_do_not_panic() {
        for len in 0..16 {
            let mut data = vec![0xFF, 0xD8];
            data.resize(len.max(2), 0xFF);
            data.truncate(len);
            let _ = jpeg_dimensions(&data);
        }
        assert_eq!(jpeg_dimensions(&[0xFF, 0xD8, 0xFF, 0xC0]), Ok(None));
    }

    #[test]
    fn jpeg_wrong_magic_is_none() {
        let mut data = jpeg_header(10, 10);
        data[0] = 0x00;
        assert_eq!(jpeg_dimensions(&data), Ok(None));
    }

    #[test]
    fn gif_and_bmp_are_not_sniffed() {
        assert_eq!(sniff_dimensions(ImageFormat::Gif, b"GIF89a\x10\x00\x10\x00"), Ok(None));
        assert_eq!(sniff_dimensions(ImageFormat::Bmp, b"BM"), Ok(None));
    }

    // ── Scaling ──────────────────────────────────────────────────────────

    #[test]
    fn scale_halves_to_fit() {
        assert_eq!(scale_to_fit(800, 600, 400, 300), (400, 300));
    }

    #[test]
    fn scale_never_enlarges() {
        assert_eq!(scale_to_fit(100, 50, 400, 300), (100, 50));
    }

    #[test]
    fn scale_uses_tighter_bound_and_keeps_aspect() {
        // Height is the binding constraint: 300 / 1200 = 0.25.
        assert_eq!(scale_to_fit(1000, 1200, 400, 300), (250, 300));
    }

    #[test]
    fn scaled_size_never_exceeds_bounds() {
        for (w, h) in [(1, 10_000), (10_000, 1), (333, 777), (4096, 4095), (601, 799)] {
            let (sw, sh) = scale_to_fit(w, h, 600, 800);
            assert!(sw <= 600 && sh <= 800, "{w}x{h} -> {sw}x{sh}");
            assert!(sw >= 1 && sh >= 1);
        }
    }

    // ── Resolver ─────────────────────────────────────────────────────────

    fn reference(url: &str) -> ImageReference {
        ImageReference {
            url: url.into(),
            alt_text: url.into(),
        }
    }

    #[tokio::test]
    async fn resolves_and_scales_png() {
        let assets = MemoryAssetSource::new().with("big.png", png_header(800, 600));
        let resolver = ImageResolver::new(&assets, bounds(400, 300));
        let image = resolver.resolve(&reference("big.png")).await.unwrap();
        assert_eq!(image.format, ImageFormat::Png);
        assert_eq!((image.width, image.height), (400, 300));
        assert_eq!(image.data, png_header(800, 600));
    }

    #[tokio::test]
    async fn jpeg_without_marker_gets_defaults() {
        let mut data = vec![0xFF, 0xD8];
        data.extend_from_slice(&[0x00; 64]);
        let assets = MemoryAssetSource::new().with("photo.jpg", data);
        let resolver = ImageResolver::new(&assets, bounds(400, 300));
        let image = resolver.resolve(&reference("photo.jpg")).await.unwrap();
        assert_eq!((image.width, image.height), (120, 90));
    }

    #[tokio::test]
    async fn gif_uses_defaults_unscaled() {
        let assets = MemoryAssetSource::new().with("anim.gif", b"GIF89a....".to_vec());
        let resolver = ImageResolver::new(&assets, bounds(400, 300));
        let image = resolver.resolve(&reference("anim.gif")).await.unwrap();
        assert_eq!(image.format, ImageFormat::Gif);
        assert_eq!((image.width, image.height), (120, 90));
    }

    #[tokio::test]
    async fn missing_asset_is_not_found() {
        let assets = MemoryAssetSource::new();
        let resolver = ImageResolver::new(&assets, bounds(400, 300));
        assert_eq!(
            resolver.resolve(&reference("gone.png")).await,
            Err(ImageError::NotFound {
                path: "gone.png".into()
            })
        );
    }

    #[tokio::test]
    async fn svg_fails_before_lookup() {
        let assets = MemoryAssetSource::new().with("d.svg", b"<svg/>".to_vec());
        let resolver = ImageResolver::new(&assets, bounds(400, 300));
        assert!(matches!(
            resolver.resolve(&reference("d.svg")).await,
            Err(ImageError::UnsupportedFormat { .. })
        ));
    }

    #[tokio::test]
    async fn truncated_png_is_corrupt() {
        let assets = MemoryAssetSource::new().with("t.png", png_header(5, 5)[..18].to_vec());
        let resolver = ImageResolver::new(&assets, bounds(400, 300));
        assert!(matches!(
            resolver.resolve(&reference("t.png")).await,
            Err(ImageError::CorruptHeader { .. })
        ));
    }

    #[tokio::test]
    async fn empty_file_is_corrupt() {
        let assets = MemoryAssetSource::new().with("e.png", Vec::new());
        let resolver = ImageResolver::new(&assets, bounds(400, 300));
        assert!(matches!(
            resolver.resolve(&reference("e.png")).await,
            Err(ImageError::CorruptHeader { .. })
        ));
    }
}
