//! Conversion entry points.
//!
//! [`convert_text`] is the core: it classifies every line of a Markdown
//! string against an [`AssetSource`], assembles the document and serialises
//! it. The file-based helpers add reading the source, choosing an asset
//! root and writing the package to disk.

use crate::config::ConversionConfig;
use crate::error::Md2DocxError;
use crate::model::Block;
use crate::output::{ConversionOutput, ConversionStats};
use crate::pipeline::assets::{AssetSource, FsAssetSource};
use crate::pipeline::classify::{classify_line, Classification};
use crate::pipeline::docx::{self, DocxOptions};
use crate::pipeline::image::ImageResolver;
use crate::pipeline::{assemble, export, input};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Extension of every exported package.
pub const DOCX_EXTENSION: &str = "docx";

/// Convert Markdown text to a `.docx` package.
///
/// Image references are looked up in `assets`. Lines are classified
/// concurrently (up to `config.concurrency` at a time) but the blocks keep
/// source order.
///
/// # Returns
/// `Ok(ConversionOutput)` on success, even if some images failed
/// (check `output.stats.image_failures`).
///
/// # Errors
/// Returns `Err(Md2DocxError)` only when the package cannot be serialised.
pub async fn convert_text<A: AssetSource + ?Sized>(
    text: &str,
    assets: &A,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Md2DocxError> {
    convert_with_title(text, assets, config, config.title.clone()).await
}

async fn convert_with_title<A: AssetSource + ?Sized>(
    text: &str,
    assets: &A,
    config: &ConversionConfig,
    title: Option<String>,
) -> Result<ConversionOutput, Md2DocxError> {
    let total_start = Instant::now();

    // ── Step 1: Split ────────────────────────────────────────────────────
    let lines = input::split_lines(text);
    let total_lines = lines.len();
    info!("Converting {} lines", total_lines);
    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(total_lines);
    }

    // ── Step 2: Classify (bounded concurrency, source order kept) ────────
    let classify_start = Instant::now();
    let resolver = ImageResolver::new(assets, config.image_bounds());
    let resolver = &resolver;
    let classified: Vec<Classification> = stream::iter(lines.iter().enumerate())
        .map(move |(idx, line)| async move {
            let classification = classify_line(line, resolver).await;
            report_line(config, idx + 1, total_lines, &classification);
            classification
        })
        .buffered(config.concurrency.max(1))
        .collect()
        .await;
    let classify_duration_ms = classify_start.elapsed().as_millis() as u64;
    debug!("Classified {} lines in {}ms", total_lines, classify_duration_ms);

    // ── Step 3: Assemble ─────────────────────────────────────────────────
    let mut stats = ConversionStats {
        total_lines,
        classify_duration_ms,
        ..Default::default()
    };
    let mut blocks = Vec::with_capacity(classified.len());
    for (idx, classification) in classified.into_iter().enumerate() {
        *stats
            .blocks_by_kind
            .entry(classification.block.kind().to_string())
            .or_insert(0) += 1;
        if let Some(err) = classification.image_error {
            stats.image_failures += 1;
            stats.image_errors.push(format!("line {}: {}", idx + 1, err));
        }
        blocks.push(classification.block);
    }
    stats.images_embedded = stats.count("image");
    let document = assemble::assemble(blocks);

    // ── Step 4: Serialise (CPU-bound, off the async threads) ─────────────
    let serialize_start = Instant::now();
    let options = DocxOptions {
        clickable_links: config.clickable_links,
        title,
    };
    let (document, bytes) = tokio::task::spawn_blocking(move || {
        let bytes = docx::serialize(&document, &options);
        (document, bytes)
    })
    .await
    .map_err(|e| Md2DocxError::Internal(format!("Serializer task panicked: {}", e)))?;
    let bytes = bytes?;
    stats.serialize_duration_ms = serialize_start.elapsed().as_millis() as u64;
    stats.output_bytes = bytes.len();
    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    info!(
        "Conversion complete: {} blocks, {} images, {} image failures, {} bytes, {}ms total",
        document.blocks.len(),
        stats.images_embedded,
        stats.image_failures,
        stats.output_bytes,
        stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(document.blocks.len(), stats.image_failures);
    }

    Ok(ConversionOutput {
        document,
        bytes,
        stats,
    })
}

fn report_line(
    config: &ConversionConfig,
    line_num: usize,
    total_lines: usize,
    classification: &Classification,
) {
    let Some(ref cb) = config.progress_callback else {
        return;
    };
    match (&classification.block, &classification.image_error) {
        (Block::Image(image), _) => cb.on_image_resolved(line_num, image.width, image.height),
        (_, Some(err)) => cb.on_image_failed(line_num, &err.to_string()),
        _ => {}
    }
    cb.on_line_complete(line_num, total_lines, classification.block.kind());
}

/// Convert a Markdown file.
///
/// Images resolve against `config.asset_root`, or the file's own directory
/// when unset. The document title defaults to the file stem.
///
/// # Errors
/// - [`Md2DocxError::ContentUnavailable`] if the file cannot be read
/// - [`Md2DocxError::SerializationFailed`] if packing fails
pub async fn convert_file(
    path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Md2DocxError> {
    let path = path.as_ref();
    info!("Starting conversion: {}", path.display());

    let text = input::read_source(path).await?;
    let assets = FsAssetSource::new(asset_root_for(path, config));
    debug!("Resolving images against {}", assets.root().display());
    let title = config.title.clone().or_else(|| {
        path.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
    });
    convert_with_title(&text, &assets, config, title).await
}

fn asset_root_for(path: &Path, config: &ConversionConfig) -> PathBuf {
    match (&config.asset_root, path.parent()) {
        (Some(root), _) => root.clone(),
        (None, Some(parent)) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Convert a Markdown file and write the package to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn convert_to_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionStats, Md2DocxError> {
    let output = convert_file(input_path, config).await?;
    export::write_export(output_path.as_ref(), &output.bytes).await?;
    info!("Wrote {}", output_path.as_ref().display());
    Ok(output.stats)
}

/// Convert a Markdown file into the sibling export folder.
///
/// The target is `<dir>/<export_dir_name>/<stem>.docx`; an existing file is
/// never overwritten, a numeric suffix is appended instead. Returns the path
/// actually written.
pub async fn export(
    input_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<(PathBuf, ConversionStats), Md2DocxError> {
    let input_path = input_path.as_ref();
    let output = convert_file(input_path, config).await?;
    let target = export::write_new_export(
        input_path,
        &config.export_dir_name,
        DOCX_EXTENSION,
        &output.bytes,
    )
    .await?;
    info!("Exported {} to {}", input_path.display(), target.display());
    Ok((target, output.stats))
}

/// Synchronous wrapper around [`convert_file`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Md2DocxError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Md2DocxError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert_file(path, config))
}
