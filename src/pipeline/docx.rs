//! Serialization: pack a [`Document`] into a WordprocessingML (`.docx`) buffer.
//!
//! The package is built in memory with [`zip::ZipWriter`] over a
//! `Cursor<Vec<u8>>`. Every block becomes exactly one `<w:p>` element in
//! `word/document.xml`, in block order; images are stored under
//! `word/media/` and referenced through `word/_rels/document.xml.rels`.

use crate::error::Md2DocxError;
use crate::model::{Block, Document, ImageBlock, ImageFormat, NumberingDefinition, StyledSpan};
use quick_xml::escape::escape;
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// English Metric Units per pixel at 96 DPI.
pub const EMU_PER_PIXEL: u64 = 9525;

/// `numId` of the bullet list instance; the ordered instance comes from
/// [`NumberingDefinition::num_id`].
pub const BULLET_NUM_ID: u32 = 2;
const BULLET_ABSTRACT_ID: u32 = 1;

const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_WP: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_PIC: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";

const REL_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const REL_NUMBERING: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering";
const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
const REL_HYPERLINK: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";

/// Serializer switches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocxOptions {
    /// Emit `w:hyperlink` elements backed by external relationships instead
    /// of styled display text only.
    pub clickable_links: bool,
    /// `dc:title` in `docProps/core.xml`.
    pub title: Option<String>,
}

/// Serialize `doc` into the bytes of a `.docx` package.
pub fn serialize(doc: &Document, options: &DocxOptions) -> Result<Vec<u8>, Md2DocxError> {
    let body = DocumentBody::render(doc, options);

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opt = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    write_part(&mut zip, opt, "[Content_Types].xml", content_types_xml(&body.media).as_bytes())?;
    write_part(&mut zip, opt, "_rels/.rels", package_rels_xml().as_bytes())?;
    write_part(&mut zip, opt, "docProps/core.xml", core_xml(options.title.as_deref()).as_bytes())?;
    write_part(&mut zip, opt, "docProps/app.xml", app_xml().as_bytes())?;
    write_part(&mut zip, opt, "word/document.xml", body.xml.as_bytes())?;
    write_part(&mut zip, opt, "word/styles.xml", styles_xml().as_bytes())?;
    write_part(&mut zip, opt, "word/numbering.xml", numbering_xml(&doc.numbering).as_bytes())?;
    write_part(
        &mut zip,
        opt,
        "word/_rels/document.xml.rels",
        body.rels.to_xml().as_bytes(),
    )?;

    // Already-compressed formats gain nothing from deflate.
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, image) in &body.media {
        let opt = match image.format {
            ImageFormat::Png | ImageFormat::Jpg | ImageFormat::Gif => stored,
            ImageFormat::Bmp => opt,
        };
        write_part(&mut zip, opt, &format!("word/media/{name}"), &image.data)?;
    }

    let bytes = zip.finish()?.into_inner();
    debug!(
        "Serialized {} blocks, {} media parts into {} bytes",
        doc.blocks.len(),
        body.media.len(),
        bytes.len()
    );
    Ok(bytes)
}

fn write_part(
    zip: &mut ZipWriter<Cursor<Vec<u8>>>,
    opt: SimpleFileOptions,
    name: &str,
    data: &[u8],
) -> Result<(), Md2DocxError> {
    let failed = |detail: String| Md2DocxError::SerializationFailed {
        part: name.to_string(),
        detail,
    };
    zip.start_file(name, opt).map_err(|e| failed(e.to_string()))?;
    zip.write_all(data).map_err(|e| failed(e.to_string()))
}

// ── Relationships ─────────────────────────────────────────────────────────

#[derive(Debug)]
struct Relationship {
    id: String,
    kind: &'static str,
    target: String,
    external: bool,
}

/// Relationships of `word/document.xml`. `rId1`/`rId2` are fixed (styles,
/// numbering); images and hyperlinks are numbered from `rId3` on.
#[derive(Debug)]
struct RelationshipMap {
    rels: Vec<Relationship>,
}

impl RelationshipMap {
    fn new() -> Self {
        let mut map = Self { rels: Vec::new() };
        map.push(REL_STYLES, "styles.xml".into(), false);
        map.push(REL_NUMBERING, "numbering.xml".into(), false);
        map
    }

    fn push(&mut self, kind: &'static str, target: String, external: bool) -> String {
        let id = format!("rId{}", self.rels.len() + 1);
        self.rels.push(Relationship {
            id: id.clone(),
            kind,
            target,
            external,
        });
        id
    }

    fn add_image(&mut self, media_name: &str) -> String {
        self.push(REL_IMAGE, format!("media/{media_name}"), false)
    }

    fn add_hyperlink(&mut self, url: &str) -> String {
        self.push(REL_HYPERLINK, url.to_string(), true)
    }

    fn to_xml(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for rel in &self.rels {
            let _ = write!(
                xml,
                r#"<Relationship Id="{}" Type="{}" Target="{}"{}/>"#,
                rel.id,
                rel.kind,
                escape(xml_safe(&rel.target).as_ref()),
                if rel.external {
                    r#" TargetMode="External""#
                } else {
                    ""
                }
            );
        }
        xml.push_str("</Relationships>");
        xml
    }
}

// ── document.xml ──────────────────────────────────────────────────────────

struct DocumentBody<'d> {
    xml: String,
    rels: RelationshipMap,
    /// `(file name under word/media, image)` in document order.
    media: Vec<(String, &'d ImageBlock)>,
}

impl<'d> DocumentBody<'d> {
    fn render(doc: &'d Document, options: &DocxOptions) -> Self {
        let mut body = Self {
            xml: String::with_capacity(256 + doc.blocks.len() * 96),
            rels: RelationshipMap::new(),
            media: Vec::new(),
        };
        let _ = write!(
            body.xml,
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{NS_W}" xmlns:r="{NS_R}" xmlns:wp="{NS_WP}" xmlns:a="{NS_A}" xmlns:pic="{NS_PIC}"><w:body>"#
        );
        for block in &doc.blocks {
            body.paragraph(block, &doc.numbering, options);
        }
        body.xml.push_str(
            r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720" w:gutter="0"/></w:sectPr></w:body></w:document>"#,
        );
        body
    }

    fn paragraph(&mut self, block: &'d Block, numbering: &NumberingDefinition, options: &DocxOptions) {
        self.xml.push_str("<w:p>");
        match block {
            Block::Heading { level, spans } => {
                let _ = write!(self.xml, r#"<w:pPr><w:pStyle w:val="Heading{level}"/></w:pPr>"#);
                self.runs(spans);
            }
            Block::Paragraph { spans } => self.runs(spans),
            Block::BlockQuote { spans } => {
                self.xml.push_str(r#"<w:pPr><w:pStyle w:val="Quote"/></w:pPr>"#);
                self.runs(spans);
            }
            Block::ListItem {
                ordered,
                numbering: num_id,
                spans,
            } => {
                let (style, id) = if *ordered {
                    ("ListNumber", num_id.unwrap_or(numbering.num_id))
                } else {
                    ("ListBullet", BULLET_NUM_ID)
                };
                let _ = write!(
                    self.xml,
                    r#"<w:pPr><w:pStyle w:val="{style}"/><w:numPr><w:ilvl w:val="0"/><w:numId w:val="{id}"/></w:numPr></w:pPr>"#
                );
                self.runs(spans);
            }
            Block::CodeLine { text } | Block::InlineCode { text } => {
                self.xml.push_str(r#"<w:pPr><w:pStyle w:val="Code"/></w:pPr>"#);
                self.run(text, false, false, None);
            }
            Block::ThematicBreak => self.xml.push_str(
                r#"<w:pPr><w:pBdr><w:bottom w:val="single" w:sz="6" w:space="1" w:color="auto"/></w:pBdr></w:pPr>"#,
            ),
            Block::Hyperlink { text, url } => {
                if options.clickable_links && !url.is_empty() {
                    let id = self.rels.add_hyperlink(url);
                    let _ = write!(self.xml, r#"<w:hyperlink r:id="{id}" w:history="1">"#);
                    self.run(text, false, false, Some("Hyperlink"));
                    self.xml.push_str("</w:hyperlink>");
                } else {
                    self.run(text, false, false, Some("Hyperlink"));
                }
            }
            Block::Image(image) => self.drawing(image),
            Block::Empty => {}
        }
        self.xml.push_str("</w:p>");
    }

    fn runs(&mut self, spans: &[StyledSpan]) {
        for span in spans {
            self.run(&span.text, span.bold, span.italic, None);
        }
    }

    fn run(&mut self, text: &str, bold: bool, italic: bool, char_style: Option<&str>) {
        if text.is_empty() {
            return;
        }
        self.xml.push_str("<w:r>");
        if bold || italic || char_style.is_some() {
            self.xml.push_str("<w:rPr>");
            if let Some(style) = char_style {
                let _ = write!(self.xml, r#"<w:rStyle w:val="{style}"/>"#);
            }
            if bold {
                self.xml.push_str("<w:b/>");
            }
            if italic {
                self.xml.push_str("<w:i/>");
            }
            self.xml.push_str("</w:rPr>");
        }
        let _ = write!(
            self.xml,
            r#"<w:t xml:space="preserve">{}</w:t></w:r>"#,
            escape(xml_safe(text).as_ref())
        );
    }

    fn drawing(&mut self, image: &'d ImageBlock) {
        let index = self.media.len() + 1;
        let media_name = format!("image{index}.{}", image.format.extension());
        let rel_id = self.rels.add_image(&media_name);
        self.media.push((media_name, image));

        let cx = u64::from(image.width) * EMU_PER_PIXEL;
        let cy = u64::from(image.height) * EMU_PER_PIXEL;
        let descr = escape(xml_safe(&image.alt_text).as_ref()).into_owned();
        let _ = write!(
            self.xml,
            r#"<w:r><w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0"><wp:extent cx="{cx}" cy="{cy}"/><wp:effectExtent l="0" t="0" r="0" b="0"/><wp:docPr id="{index}" name="Picture {index}" descr="{descr}"/><wp:cNvGraphicFramePr><a:graphicFrameLocks noChangeAspect="1"/></wp:cNvGraphicFramePr><a:graphic><a:graphicData uri="{NS_PIC}"><pic:pic><pic:nvPicPr><pic:cNvPr id="{index}" name="Picture {index}" descr="{descr}"/><pic:cNvPicPr/></pic:nvPicPr><pic:blipFill><a:blip r:embed="{rel_id}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill><pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr></pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r>"#
        );
    }
}

/// Drop control characters other than tab, LF and CR; XML 1.0 cannot carry
/// most of them.
fn xml_safe(text: &str) -> Cow<'_, str> {
    let allowed = |c: char| matches!(c, '\t' | '\n' | '\r') || !c.is_control();
    if text.chars().all(allowed) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|&c| allowed(c)).collect())
    }
}

// ── Static parts ──────────────────────────────────────────────────────────

fn content_types_xml(media: &[(String, &ImageBlock)]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/>"#,
    );
    let formats: BTreeSet<(&str, &str)> = media
        .iter()
        .map(|(_, image)| (image.format.extension(), image.format.mime_type()))
        .collect();
    for (ext, mime) in formats {
        let _ = write!(xml, r#"<Default Extension="{ext}" ContentType="{mime}"/>"#);
    }
    xml.push_str(concat!(
        r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
        r#"<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>"#,
        r#"<Override PartName="/word/numbering.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml"/>"#,
        r#"<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>"#,
        r#"<Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>"#,
        "</Types>"
    ));
    xml
}

fn package_rels_xml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/></Relationships>"#
}

fn core_xml(title: Option<&str>) -> String {
    let title = title
        .map(|t| format!("<dc:title>{}</dc:title>", escape(xml_safe(t).as_ref())))
        .unwrap_or_default();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">{title}<dc:creator>md2docx</dc:creator></cp:coreProperties>"#
    )
}

fn app_xml() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"><Application>md2docx {}</Application></Properties>"#,
        env!("CARGO_PKG_VERSION")
    )
}

fn styles_xml() -> String {
    let heading = |level: u8, size: u32| {
        format!(
            r#"<w:style w:type="paragraph" w:styleId="Heading{level}"><w:name w:val="heading {level}"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:keepNext/><w:spacing w:before="240" w:after="120"/><w:outlineLvl w:val="{}"/></w:pPr><w:rPr><w:b/><w:sz w:val="{size}"/></w:rPr></w:style>"#,
            level - 1
        )
    };
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="{NS_W}"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Calibri" w:hAnsi="Calibri" w:cs="Calibri"/><w:sz w:val="22"/></w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:after="120"/></w:pPr></w:pPrDefault></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style>{}{}{}<w:style w:type="paragraph" w:styleId="Quote"><w:name w:val="Quote"/><w:basedOn w:val="Normal"/><w:qFormat/><w:pPr><w:pBdr><w:left w:val="single" w:sz="18" w:space="8" w:color="BFBFBF"/></w:pBdr><w:shd w:val="clear" w:color="auto" w:fill="F2F2F2"/><w:ind w:left="720"/></w:pPr></w:style><w:style w:type="paragraph" w:styleId="ListBullet"><w:name w:val="List Bullet"/><w:basedOn w:val="Normal"/></w:style><w:style w:type="paragraph" w:styleId="ListNumber"><w:name w:val="List Number"/><w:basedOn w:val="Normal"/></w:style><w:style w:type="paragraph" w:styleId="Code"><w:name w:val="Code"/><w:basedOn w:val="Normal"/><w:pPr><w:spacing w:after="0"/></w:pPr><w:rPr><w:rFonts w:ascii="Consolas" w:hAnsi="Consolas" w:cs="Consolas"/><w:sz w:val="20"/></w:rPr></w:style><w:style w:type="character" w:styleId="Hyperlink"><w:name w:val="Hyperlink"/><w:rPr><w:color w:val="0563C1"/><w:u w:val="single"/></w:rPr></w:style></w:styles>"#,
        heading(1, 32),
        heading(2, 28),
        heading(3, 24)
    )
}

fn numbering_xml(ordered: &NumberingDefinition) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:numbering xmlns:w="{NS_W}"><w:abstractNum w:abstractNumId="{abs}"><w:multiLevelType w:val="singleLevel"/><w:lvl w:ilvl="0"><w:start w:val="{start}"/><w:numFmt w:val="{fmt}"/><w:lvlText w:val="{text}"/><w:lvlJc w:val="left"/><w:pPr><w:ind w:left="{left}" w:hanging="{hanging}"/></w:pPr></w:lvl></w:abstractNum><w:abstractNum w:abstractNumId="{BULLET_ABSTRACT_ID}"><w:multiLevelType w:val="singleLevel"/><w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="bullet"/><w:lvlText w:val="•"/><w:lvlJc w:val="left"/><w:pPr><w:ind w:left="{left}" w:hanging="{hanging}"/></w:pPr></w:lvl></w:abstractNum><w:num w:numId="{num}"><w:abstractNumId w:val="{abs}"/></w:num><w:num w:numId="{BULLET_NUM_ID}"><w:abstractNumId w:val="{BULLET_ABSTRACT_ID}"/></w:num></w:numbering>"#,
        abs = ordered.abstract_num_id,
        start = ordered.start,
        fmt = ordered.format.as_str(),
        text = escape(ordered.level_text),
        left = ordered.indent_left,
        hanging = ordered.hanging,
        num = ordered.num_id,
    )
}
