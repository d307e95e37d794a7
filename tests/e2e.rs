//! End-to-end integration tests for md2docx.
//!
//! Each test writes a small Markdown vault into a temp directory (real PNG
//! and JPEG attachments are generated with the `image` crate), converts it
//! through the public API and inspects the resulting `.docx` package with
//! `zip::ZipArchive`.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture

use md2docx::{
    convert_file, convert_sync, convert_to_file, export, Block, ConversionConfig, Md2DocxError,
};
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// `RUST_LOG=md2docx=debug cargo test --test e2e -- --nocapture` shows the
/// pipeline logs.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn write_png(path: &Path, width: u32, height: u32) {
    image::RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30]))
        .save(path)
        .unwrap();
}

fn write_jpeg(path: &Path, width: u32, height: u32) {
    image::RgbImage::from_pixel(width, height, image::Rgb([30, 30, 200]))
        .save(path)
        .unwrap();
}

fn read_part(docx: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(docx)).unwrap();
    let mut part = archive.by_name(name).unwrap();
    let mut xml = String::new();
    part.read_to_string(&mut xml).unwrap();
    xml
}

/// Assert that `needles` appear in `haystack` in the given order.
fn assert_in_order(haystack: &str, needles: &[&str], context: &str) {
    let mut from = 0;
    for needle in needles {
        match haystack[from..].find(needle) {
            Some(pos) => from += pos + needle.len(),
            None => panic!("[{context}] {needle:?} missing or out of order"),
        }
    }
}

const NOTE: &str = "\
# Field notes
## Morning
### Details

> Quiet start with **coffee**
- first bullet
1. step one
2. step two
```let x = 1;```
`inline()`
---
[Project page](https://example.org/project)
![Chart](charts/big.png)
![[photo.jpg|240]]
![Lost](nowhere.png)
**Bold** lead and tail
*leaning words*
Plain closing line";

fn vault() -> (tempfile::TempDir, PathBuf) {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("charts")).unwrap();
    write_png(&dir.path().join("charts/big.png"), 800, 600);
    write_jpeg(&dir.path().join("photo.jpg"), 300, 200);
    let source = dir.path().join("field notes.md");
    std::fs::write(&source, NOTE).unwrap();
    (dir, source)
}

// ── Full conversion ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_every_line_becomes_one_paragraph_in_order() {
    let (_dir, source) = vault();
    let output = convert_file(&source, &ConversionConfig::default())
        .await
        .unwrap();

    let line_count = NOTE.lines().count();
    assert_eq!(output.document.blocks.len(), line_count);

    let xml = read_part(&output.bytes, "word/document.xml");
    assert_eq!(xml.matches("</w:p>").count(), line_count);
    assert_in_order(
        &xml,
        &[
            "Field notes",
            "Morning",
            "Details",
            "Quiet start with ",
            "coffee",
            "first bullet",
            "step one",
            "step two",
            "let x = 1;",
            "inline()",
            "Project page",
            "r:embed=\"rId3\"",
            "r:embed=\"rId4\"",
            "[Image: Lost]",
            "Bold",
            " lead and tail",
            "leaning words",
            "Plain closing line",
        ],
        "document.xml",
    );
}

#[tokio::test]
async fn test_block_kinds_and_stats() {
    let (_dir, source) = vault();
    let output = convert_file(&source, &ConversionConfig::default())
        .await
        .unwrap();
    let stats = &output.stats;

    assert_eq!(stats.total_lines, NOTE.lines().count());
    assert_eq!(stats.count("heading"), 3);
    assert_eq!(stats.count("empty"), 1);
    assert_eq!(stats.count("block_quote"), 1);
    assert_eq!(stats.count("list_item"), 3);
    assert_eq!(stats.count("code_line"), 1);
    assert_eq!(stats.count("inline_code"), 1);
    assert_eq!(stats.count("thematic_break"), 1);
    assert_eq!(stats.count("hyperlink"), 1);
    assert_eq!(stats.images_embedded, 2);
    assert_eq!(stats.image_failures, 1);
    assert_eq!(stats.output_bytes, output.bytes.len());

    // Both ordered items share the document's one numbering definition.
    let numbering = output.document.numbering.num_id;
    let ordered: Vec<_> = output
        .document
        .blocks
        .iter()
        .filter_map(|b| match b {
            Block::ListItem {
                ordered: true,
                numbering,
                ..
            } => Some(*numbering),
            _ => None,
        })
        .collect();
    assert_eq!(ordered, vec![Some(numbering), Some(numbering)]);

    // Stats are JSON-serialisable for `--json`.
    let json = serde_json::to_value(stats).unwrap();
    assert_eq!(json["images_embedded"], 2);
}

#[tokio::test]
async fn test_images_are_scaled_and_embedded() {
    let (_dir, source) = vault();
    let output = convert_file(&source, &ConversionConfig::default())
        .await
        .unwrap();

    let images: Vec<_> = output.document.images().collect();
    assert_eq!(images.len(), 2);
    // 800×600 into 600×800 → scale 0.75.
    assert_eq!((images[0].width, images[0].height), (600, 450));
    assert_eq!(images[0].alt_text, "Chart");
    // Already within bounds.
    assert_eq!((images[1].width, images[1].height), (300, 200));
    assert_eq!(images[1].alt_text, "photo.jpg|240");

    let xml = read_part(&output.bytes, "word/document.xml");
    assert!(xml.contains(r#"<wp:extent cx="5715000" cy="4286250"/>"#));
    assert!(xml.contains(r#"<wp:extent cx="2857500" cy="1905000"/>"#));

    let png = read_part_bytes(&output.bytes, "word/media/image1.png");
    assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
    let jpeg = read_part_bytes(&output.bytes, "word/media/image2.jpeg");
    assert!(jpeg.starts_with(&[0xFF, 0xD8]));
}

fn read_part_bytes(docx: &[u8], name: &str) -> Vec<u8> {
    let mut archive = zip::ZipArchive::new(Cursor::new(docx)).unwrap();
    let mut part = archive.by_name(name).unwrap();
    let mut bytes = Vec::new();
    part.read_to_end(&mut bytes).unwrap();
    bytes
}

#[tokio::test]
async fn test_tighter_bounds_from_config() {
    let (_dir, source) = vault();
    let config = ConversionConfig::builder()
        .image_max_width(400)
        .image_max_height(300)
        .default_image_width(100)
        .default_image_height(100)
        .build()
        .unwrap();
    let output = convert_file(&source, &config).await.unwrap();
    let sizes: Vec<_> = output
        .document
        .images()
        .map(|i| (i.width, i.height))
        .collect();
    assert_eq!(sizes, vec![(400, 300), (300, 200)]);
}

#[tokio::test]
async fn test_title_defaults_to_file_stem() {
    let (_dir, source) = vault();
    let output = convert_file(&source, &ConversionConfig::default())
        .await
        .unwrap();
    let core = read_part(&output.bytes, "docProps/core.xml");
    assert!(core.contains("<dc:title>field notes</dc:title>"), "{core}");
}

#[tokio::test]
async fn test_clickable_links_option() {
    let (_dir, source) = vault();
    let plain = convert_file(&source, &ConversionConfig::default())
        .await
        .unwrap();
    assert!(!read_part(&plain.bytes, "word/document.xml").contains("<w:hyperlink"));

    let config = ConversionConfig::builder()
        .clickable_links(true)
        .build()
        .unwrap();
    let linked = convert_file(&source, &config).await.unwrap();
    assert!(read_part(&linked.bytes, "word/document.xml").contains("<w:hyperlink"));
    assert!(read_part(&linked.bytes, "word/_rels/document.xml.rels")
        .contains("https://example.org/project"));
}

// ── Export & persistence ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_export_collision_suffix() {
    let (dir, source) = vault();
    let config = ConversionConfig::default();

    let (first, _) = export(&source, &config).await.unwrap();
    let (second, _) = export(&source, &config).await.unwrap();
    let (third, _) = export(&source, &config).await.unwrap();

    let exports = dir.path().join("exports");
    assert_eq!(first, exports.join("field notes.docx"));
    assert_eq!(second, exports.join("field notes-1.docx"));
    assert_eq!(third, exports.join("field notes-2.docx"));
    for path in [first, second, third] {
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"PK"), "{} is not a zip", path.display());
    }
}

#[tokio::test]
async fn test_convert_to_file_writes_requested_path() {
    let (dir, source) = vault();
    let target = dir.path().join("out/nested/result.docx");
    let stats = convert_to_file(&source, &target, &ConversionConfig::default())
        .await
        .unwrap();
    assert_eq!(std::fs::metadata(&target).unwrap().len() as usize, stats.output_bytes);
    assert!(!dir.path().join("exports").exists());
}

#[tokio::test]
async fn test_missing_source_is_content_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let err = export(dir.path().join("ghost.md"), &ConversionConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Md2DocxError::ContentUnavailable { .. }));
    assert!(err.to_string().contains("ghost.md"));
    assert!(!dir.path().join("exports").exists());
}

#[test]
fn test_convert_sync_without_runtime() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("crlf.md");
    std::fs::write(&source, "# One\r\n- two\r\nthree").unwrap();

    let output = convert_sync(&source, &ConversionConfig::default()).unwrap();
    let texts: Vec<String> = output.document.blocks.iter().map(Block::text).collect();
    assert_eq!(texts, vec!["One", "two", "three"]);
}
