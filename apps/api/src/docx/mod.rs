//! DOCX conversion.
//!
//! DOCX files are ZIP archives; the content lives in `word/document.xml`.
//! Manual ZIP + XML parsing — the writer-oriented docx crates don't read.
//! One walk over the paragraph/run events backs both outputs: plain text for
//! the field extractor and a small layout-preserving HTML subset for the
//! redaction pipeline.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;
use zip::ZipArchive;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("failed to open document: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a readable DOCX archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("missing word/document.xml")]
    MissingDocumentXml,

    #[error("malformed document XML: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// Conversion seam between the pipeline and the document format. Implemented
/// by [`DocxConverter`]; tests substitute stubs.
pub trait DocumentConverter: Send + Sync {
    /// Plain text, one line per paragraph.
    fn extract_text(&self, path: &Path) -> Result<String, ConvertError>;

    /// Layout-preserving markup: `<h1>`/`<h2>` for heading-styled paragraphs,
    /// `<p>` otherwise, `<strong>`/`<em>` for bold/italic runs.
    fn to_markup(&self, path: &Path) -> Result<String, ConvertError>;
}

#[derive(Debug, Default)]
pub struct DocxConverter;

impl DocumentConverter for DocxConverter {
    fn extract_text(&self, path: &Path) -> Result<String, ConvertError> {
        let paragraphs = parse_paragraphs(&read_document_xml(path)?)?;
        Ok(paragraphs
            .iter()
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn to_markup(&self, path: &Path) -> Result<String, ConvertError> {
        let paragraphs = parse_paragraphs(&read_document_xml(path)?)?;
        let mut html = String::from("<div class=\"document\">\n");
        for paragraph in &paragraphs {
            let tag = paragraph.block_tag();
            html.push('<');
            html.push_str(tag);
            html.push('>');
            for run in &paragraph.runs {
                if run.bold {
                    html.push_str("<strong>");
                }
                if run.italic {
                    html.push_str("<em>");
                }
                // partial_escape leaves quotes alone so extracted values like
                // "O'Brien" still match the markup during redaction
                html.push_str(&quick_xml::escape::partial_escape(&run.text));
                if run.italic {
                    html.push_str("</em>");
                }
                if run.bold {
                    html.push_str("</strong>");
                }
            }
            html.push_str("</");
            html.push_str(tag);
            html.push_str(">\n");
        }
        html.push_str("</div>\n");
        Ok(html)
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Run {
    text: String,
    bold: bool,
    italic: bool,
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Paragraph {
    /// `w:pStyle` value, e.g. "Heading1".
    style: Option<String>,
    runs: Vec<Run>,
}

impl Paragraph {
    fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    fn block_tag(&self) -> &'static str {
        match self.style.as_deref() {
            Some("Title") | Some("Heading1") => "h1",
            Some(style) if style.starts_with("Heading") => "h2",
            _ => "p",
        }
    }

    /// Appends text to the trailing run when the formatting matches,
    /// otherwise starts a new run.
    fn push_text(&mut self, text: &str, bold: bool, italic: bool) {
        match self.runs.last_mut() {
            Some(run) if run.bold == bold && run.italic == italic => run.text.push_str(text),
            _ => self.runs.push(Run {
                text: text.to_string(),
                bold,
                italic,
            }),
        }
    }
}

fn read_document_xml(path: &Path) -> Result<String, ConvertError> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)?;
    let mut document_xml = archive.by_name("word/document.xml").map_err(|e| match e {
        zip::result::ZipError::FileNotFound => ConvertError::MissingDocumentXml,
        other => ConvertError::Zip(other),
    })?;
    let mut content = String::new();
    document_xml.read_to_string(&mut content)?;
    Ok(content)
}

/// Extract an attribute value by key from an element.
fn get_attr(e: &quick_xml::events::BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .find(|a| a.as_ref().ok().map(|x| x.key.as_ref()) == Some(key))
        .and_then(Result::ok)
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

/// Check if w:val is explicitly "0" or "false" (formatting toggled off).
fn check_val_off(e: &quick_xml::events::BytesStart) -> bool {
    matches!(
        get_attr(e, b"w:val").as_deref(),
        Some("0") | Some("false")
    )
}

fn parse_paragraphs(xml: &str) -> Result<Vec<Paragraph>, ConvertError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut paragraphs = Vec::new();
    let mut current: Option<Paragraph> = None;
    let mut in_p_pr = false;
    let mut in_run = false;
    let mut in_text = false;
    let mut run_bold = false;
    let mut run_italic = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:p" => current = Some(Paragraph::default()),
                b"w:pPr" => in_p_pr = true,
                b"w:r" => {
                    in_run = true;
                    run_bold = false;
                    run_italic = false;
                }
                b"w:t" => in_text = true,
                b"w:b" if in_run && !in_p_pr => run_bold = !check_val_off(&e),
                b"w:i" if in_run && !in_p_pr => run_italic = !check_val_off(&e),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:pStyle" if in_p_pr => {
                    if let Some(paragraph) = current.as_mut() {
                        paragraph.style = get_attr(&e, b"w:val");
                    }
                }
                b"w:b" if in_run && !in_p_pr => run_bold = !check_val_off(&e),
                b"w:i" if in_run && !in_p_pr => run_italic = !check_val_off(&e),
                b"w:tab" if in_run => {
                    if let Some(paragraph) = current.as_mut() {
                        paragraph.push_text("\t", run_bold, run_italic);
                    }
                }
                b"w:br" if in_run => {
                    if let Some(paragraph) = current.as_mut() {
                        paragraph.push_text("\n", run_bold, run_italic);
                    }
                }
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let text = t.unescape()?;
                if let Some(paragraph) = current.as_mut() {
                    paragraph.push_text(&text, run_bold, run_italic);
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:p" => {
                    if let Some(paragraph) = current.take() {
                        paragraphs.push(paragraph);
                    }
                }
                b"w:pPr" => in_p_pr = false,
                b"w:r" => in_run = false,
                b"w:t" => in_text = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ConvertError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}

/// DOCX fixtures shared by the converter tests and the route tests.
#[cfg(test)]
pub(crate) mod testutil {
    use std::io::{Cursor, Write};
    use zip::write::{SimpleFileOptions, ZipWriter};

    pub(crate) const SAMPLE_DOCUMENT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p>
      <w:pPr><w:pStyle w:val="Heading1"/></w:pPr>
      <w:r><w:t>John Smith</w:t></w:r>
    </w:p>
    <w:p>
      <w:r><w:t>Email: john.smith@example.com</w:t></w:r>
    </w:p>
    <w:p>
      <w:r><w:t>Summary: R&amp;D engineering</w:t></w:r>
    </w:p>
    <w:p>
      <w:r><w:rPr><w:b w:val="0"/><w:i/></w:rPr><w:t>plain italic</w:t></w:r>
    </w:p>
    <w:p>
      <w:r><w:rPr><w:b/></w:rPr><w:t>Skills:</w:t></w:r>
      <w:r><w:t xml:space="preserve"> Python, Go; Rust</w:t></w:r>
    </w:p>
  </w:body>
</w:document>"#;

    /// Builds an in-memory DOCX archive; `None` omits `word/document.xml`.
    pub(crate) fn docx_bytes(document_xml: Option<&str>) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut zip = ZipWriter::new(&mut cursor);
            zip.start_file("[Content_Types].xml", SimpleFileOptions::default())
                .expect("start types entry");
            zip.write_all(b"<Types/>").expect("write types entry");
            if let Some(xml) = document_xml {
                zip.start_file("word/document.xml", SimpleFileOptions::default())
                    .expect("start document entry");
                zip.write_all(xml.as_bytes()).expect("write document entry");
            }
            zip.finish().expect("finish archive");
        }
        cursor.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::testutil::{docx_bytes, SAMPLE_DOCUMENT_XML};
    use super::*;
    use std::io::Write;

    fn write_docx(document_xml: Option<&str>) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(&docx_bytes(document_xml)).expect("write docx");
        file
    }

    #[test]
    fn test_extract_text_one_line_per_paragraph() {
        let docx = write_docx(Some(SAMPLE_DOCUMENT_XML));
        let text = DocxConverter.extract_text(docx.path()).expect("converts");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "John Smith",
                "Email: john.smith@example.com",
                "Summary: R&D engineering",
                "plain italic",
                "Skills: Python, Go; Rust",
            ]
        );
    }

    #[test]
    fn test_markup_maps_styles_to_tags() {
        let docx = write_docx(Some(SAMPLE_DOCUMENT_XML));
        let markup = DocxConverter.to_markup(docx.path()).expect("converts");
        assert!(markup.contains("<h1>John Smith</h1>"));
        assert!(markup.contains("<strong>Skills:</strong>"));
        assert!(markup.contains("<em>plain italic</em>"));
        // w:val="0" turns bold off even when the run also sets italic
        assert!(!markup.contains("<strong>plain italic"));
    }

    #[test]
    fn test_markup_escapes_text_content() {
        let docx = write_docx(Some(SAMPLE_DOCUMENT_XML));
        let markup = DocxConverter.to_markup(docx.path()).expect("converts");
        assert!(markup.contains("R&amp;D engineering"));
    }

    #[test]
    fn test_archive_without_document_xml_is_an_error() {
        let docx = write_docx(None);
        let err = DocxConverter.extract_text(docx.path()).unwrap_err();
        assert!(matches!(err, ConvertError::MissingDocumentXml));
    }

    #[test]
    fn test_non_zip_payload_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(b"this is not a zip archive").expect("write");
        let err = DocxConverter.extract_text(file.path()).unwrap_err();
        assert!(matches!(err, ConvertError::Zip(_)));
    }
}
