//! Configuration types for Markdown-to-DOCX conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The image bounds live here rather
//! than in ambient state so the image resolver stays a pure function of its
//! inputs.

use crate::error::Md2DocxError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Configuration for a Markdown-to-DOCX conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use md2docx::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .image_max_width(400)
///     .image_max_height(300)
///     .build()
///     .unwrap();
/// assert_eq!(config.image_max_width, 400);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Maximum displayed image width in pixels. Default: 600.
    ///
    /// Images are scaled down (never up) so the width fits, preserving the
    /// aspect ratio.
    pub image_max_width: u32,

    /// Maximum displayed image height in pixels. Default: 800.
    pub image_max_height: u32,

    /// Width used when dimensions cannot be read from the header. Default: 400.
    ///
    /// GIF and BMP are never sniffed, and a JPEG without a baseline SOF0
    /// marker falls back here too. Must not exceed `image_max_width`.
    pub default_image_width: u32,

    /// Height used when dimensions cannot be read from the header. Default: 300.
    pub default_image_height: u32,

    /// Number of lines classified concurrently. Default: 8.
    ///
    /// Only image lines do I/O; results are always collected in source order.
    pub concurrency: usize,

    /// Emit hyperlinks as clickable `w:hyperlink` elements. Default: false.
    ///
    /// When false a link line renders its display text with the `Hyperlink`
    /// character style and the URL stays in the document model only.
    pub clickable_links: bool,

    /// Directory that relative image paths resolve against.
    /// If None, the directory of the source file is used.
    pub asset_root: Option<PathBuf>,

    /// Name of the sibling folder exports are written into. Default: "exports".
    pub export_dir_name: String,

    /// Title stored in the package core properties.
    /// If None, the source file stem is used.
    pub title: Option<String>,

    /// Receives per-line progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            image_max_width: 600,
            image_max_height: 800,
            default_image_width: 400,
            default_image_height: 300,
            concurrency: 8,
            clickable_links: false,
            asset_root: None,
            export_dir_name: "exports".to_string(),
            title: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("image_max_width", &self.image_max_width)
            .field("image_max_height", &self.image_max_height)
            .field("default_image_width", &self.default_image_width)
            .field("default_image_height", &self.default_image_height)
            .field("concurrency", &self.concurrency)
            .field("clickable_links", &self.clickable_links)
            .field("asset_root", &self.asset_root)
            .field("export_dir_name", &self.export_dir_name)
            .field("title", &self.title)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The image bounds and fallbacks, as handed to the image resolver.
    pub fn image_bounds(&self) -> ImageBounds {
        ImageBounds {
            max_width: self.image_max_width,
            max_height: self.image_max_height,
            default_width: self.default_image_width,
            default_height: self.default_image_height,
        }
    }
}

/// Size limits passed explicitly into [`crate::pipeline::image::ImageResolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageBounds {
    pub max_width: u32,
    pub max_height: u32,
    pub default_width: u32,
    pub default_height: u32,
}

impl Default for ImageBounds {
    fn default() -> Self {
        ConversionConfig::default().image_bounds()
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn image_max_width(mut self, px: u32) -> Self {
        self.config.image_max_width = px.max(1);
        self
    }

    pub fn image_max_height(mut self, px: u32) -> Self {
        self.config.image_max_height = px.max(1);
        self
    }

    pub fn default_image_width(mut self, px: u32) -> Self {
        self.config.default_image_width = px.max(1);
        self
    }

    pub fn default_image_height(mut self, px: u32) -> Self {
        self.config.default_image_height = px.max(1);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn clickable_links(mut self, v: bool) -> Self {
        self.config.clickable_links = v;
        self
    }

    pub fn asset_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.asset_root = Some(dir.into());
        self
    }

    pub fn export_dir_name(mut self, name: impl Into<String>) -> Self {
        self.config.export_dir_name = name.into();
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = Some(title.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Md2DocxError> {
        let c = &self.config;
        if c.default_image_width > c.image_max_width {
            return Err(Md2DocxError::InvalidConfig(format!(
                "default image width {} exceeds maximum width {}",
                c.default_image_width, c.image_max_width
            )));
        }
        if c.default_image_height > c.image_max_height {
            return Err(Md2DocxError::InvalidConfig(format!(
                "default image height {} exceeds maximum height {}",
                c.default_image_height, c.image_max_height
            )));
        }
        let dir = c.export_dir_name.trim();
        if dir.is_empty() || dir.contains(['/', '\\']) || dir == "." || dir == ".." {
            return Err(Md2DocxError::InvalidConfig(format!(
                "export folder name must be a single path component, got '{}'",
                c.export_dir_name
            )));
        }
        Ok(self.config)
    }
}
