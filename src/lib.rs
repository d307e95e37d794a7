//! # md2docx
//!
//! Convert Markdown notes to Word (`.docx`) documents.
//!
//! ## Why this crate?
//!
//! Note-taking Markdown is line oriented: headings, list items, quotes and
//! embedded images almost always fit on one line. This crate leans on that
//! and classifies each source line independently into one document block,
//! which keeps the conversion predictable and lets image lookups for
//! different lines run concurrently.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Markdown
//!  │
//!  ├─ 1. Input     read UTF-8 source, split on \r?\n
//!  ├─ 2. Classify  16 ordered line rules; inline **bold** spans
//!  ├─ 3. Images    asset lookup, PNG/JPEG header sniffing, scale to bounds
//!  ├─ 4. Assemble  blocks + shared ordered-list numbering
//!  ├─ 5. Serialise WordprocessingML package (zip)
//!  └─ 6. Export    exports/<stem>.docx, numeric suffix on collision
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use md2docx::{export, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let (path, stats) = export("notes/today.md", &config).await?;
//!     println!("wrote {}", path.display());
//!     eprintln!("images: {} embedded / {} failed",
//!         stats.images_embedded,
//!         stats.image_failures);
//!     Ok(())
//! }
//! ```
//!
//! Text already in memory converts through [`convert_text`] with any
//! [`AssetSource`]:
//!
//! ```rust
//! use md2docx::{convert_text, ConversionConfig, MemoryAssetSource};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let assets = MemoryAssetSource::new();
//! let output = convert_text("# Title\n- item", &assets, &ConversionConfig::default())
//!     .await
//!     .unwrap();
//! assert_eq!(output.document.blocks.len(), 2);
//! assert!(output.bytes.starts_with(b"PK"));
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `md2docx` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! md2docx = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, ImageBounds};
pub use convert::{convert_file, convert_sync, convert_text, convert_to_file, export};
pub use error::{ImageError, Md2DocxError};
pub use model::{Block, Document, ImageBlock, ImageFormat, NumberingDefinition, StyledSpan};
pub use output::{ConversionOutput, ConversionStats};
pub use pipeline::assets::{AssetSource, FsAssetSource, MemoryAssetSource};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
