use anyhow::{Context, Result};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::{Read, Seek};
use std::path::Path;

use crate::error::{ExtractionStage, MetaError};

const DOCUMENT_XML: &str = "word/document.xml";

/// Extract paragraph text from a DOCX file.
///
/// Paragraphs are joined with `\n` in document order and the result is trimmed.
pub async fn extract_text(path: &Path) -> Result<String, MetaError> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let file = std::fs::File::open(&owned)
            .with_context(|| format!("Failed to open DOCX file: {}", owned.display()))?;
        read_paragraphs(file)
    })
    .await
    .map_err(|e| MetaError::extraction(ExtractionStage::DocxParse, e))?
    .map(|paragraphs| paragraphs.join("\n").trim().to_string())
    .map_err(|e| MetaError::extraction(ExtractionStage::DocxParse, format!("{:#}", e)))
}

/// Read the paragraphs of the main document part of a DOCX archive
pub fn read_paragraphs<R: Read + Seek>(reader: R) -> Result<Vec<String>> {
    let mut archive = zip::ZipArchive::new(reader).context("Not a valid DOCX (zip) archive")?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_XML)
        .with_context(|| format!("DOCX archive has no {}", DOCUMENT_XML))?
        .read_to_string(&mut xml)
        .context("Failed to read DOCX document body")?;

    paragraphs_from_xml(&xml)
}

/// Pull paragraph text out of WordprocessingML.
///
/// Every `w:p` becomes one entry, ordered by where it opens, so a paragraph
/// nested in a text box or table cell follows the paragraph that contains it.
/// A paragraph only collects its own runs: `w:t` text, `w:tab` as a tab and
/// `w:br` / `w:cr` as line breaks.
pub fn paragraphs_from_xml(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs: Vec<String> = Vec::new();
    let mut open: Vec<OpenParagraph> = Vec::new();
    let mut in_text = false;

    loop {
        let event = reader
            .read_event()
            .with_context(|| format!("Malformed document XML at byte {}", reader.buffer_position()))?;

        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => {
                    open.push(OpenParagraph {
                        index: paragraphs.len(),
                        runs: 0,
                    });
                    paragraphs.push(String::new());
                }
                b"w:r" => {
                    if let Some(para) = open.last_mut() {
                        para.runs += 1;
                    }
                }
                b"w:t" => in_text = in_run(&open),
                name => push_marker(name, &open, &mut paragraphs),
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:p" => paragraphs.push(String::new()),
                name => push_marker(name, &open, &mut paragraphs),
            },
            Event::End(e) => match e.name().as_ref() {
                b"w:p" => {
                    open.pop();
                    in_text = false;
                }
                b"w:r" => {
                    if let Some(para) = open.last_mut() {
                        para.runs = para.runs.saturating_sub(1);
                    }
                }
                b"w:t" => in_text = false,
                _ => {}
            },
            Event::Text(t) if in_text => {
                let text = t.unescape().context("Invalid text in document XML")?;
                push_text(&open, &mut paragraphs, &text);
            }
            Event::CData(c) if in_text => {
                push_text(&open, &mut paragraphs, &String::from_utf8_lossy(&c.into_inner()));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

/// A `w:p` that has been opened but not closed yet
struct OpenParagraph {
    index: usize,
    runs: usize,
}

fn in_run(open: &[OpenParagraph]) -> bool {
    open.last().is_some_and(|para| para.runs > 0)
}

fn push_text(open: &[OpenParagraph], paragraphs: &mut [String], text: &str) {
    if let Some(para) = open.last() {
        paragraphs[para.index].push_str(text);
    }
}

/// Tabs and breaks count only inside a run; `w:tab` also names tab stops in `w:pPr`
fn push_marker(name: &[u8], open: &[OpenParagraph], paragraphs: &mut [String]) {
    if !in_run(open) {
        return;
    }
    match name {
        b"w:tab" => push_text(open, paragraphs, "\t"),
        b"w:br" | b"w:cr" => push_text(open, paragraphs, "\n"),
        _ => {}
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    /// Build a minimal DOCX archive around the given body XML
    pub(crate) fn docx_bytes(body: &str) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(b"<?xml version=\"1.0\"?><Types/>").unwrap();
        zip.start_file(DOCUMENT_XML, options).unwrap();
        let xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
             <w:body>{}</w:body></w:document>",
            body
        );
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_paragraphs_in_document_order() {
        let xml = r#"<w:body>
            <w:p><w:r><w:t>First</w:t></w:r><w:r><w:t xml:space="preserve"> paragraph</w:t></w:r></w:p>
            <w:p w:rsidR="00AB"><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:t>Second</w:t></w:r></w:p>
        </w:body>"#;
        let paragraphs = paragraphs_from_xml(xml).unwrap();
        assert_eq!(paragraphs, vec!["First paragraph", "Second"]);
    }

    #[test]
    fn test_empty_paragraphs_are_kept() {
        let xml = "<w:p><w:r><w:t>One</w:t></w:r></w:p><w:p/><w:p w:rsidR=\"00C1\"/><w:p></w:p><w:p><w:r><w:t>Two</w:t></w:r></w:p>";
        let paragraphs = paragraphs_from_xml(xml).unwrap();
        assert_eq!(paragraphs, vec!["One", "", "", "", "Two"]);
    }

    #[test]
    fn test_tabs_breaks_and_entities() {
        let xml = "<w:p><w:r><w:t>Q&amp;A</w:t><w:tab/><w:t>&lt;x&gt;</w:t><w:br/><w:t>&#233;t&#xE9;</w:t></w:r></w:p>";
        let paragraphs = paragraphs_from_xml(xml).unwrap();
        assert_eq!(paragraphs, vec!["Q&A\t<x>\nété"]);
    }

    #[test]
    fn test_paragraph_properties_are_not_paragraphs() {
        let xml = "<w:p><w:pPr><w:pStyle w:val=\"Title\"/></w:pPr><w:r><w:t>Heading</w:t></w:r></w:p>";
        assert_eq!(paragraphs_from_xml(xml).unwrap(), vec!["Heading"]);
    }

    #[test]
    fn test_text_box_paragraph_keeps_surrounding_text() {
        let xml = "<w:p><w:r><w:t>Before</w:t></w:r>\
                   <w:r><w:drawing><wps:txbx><w:txbxContent>\
                   <w:p><w:r><w:t>Boxed</w:t></w:r></w:p>\
                   </w:txbxContent></wps:txbx></w:drawing></w:r>\
                   <w:r><w:t>After</w:t></w:r></w:p>\
                   <w:p><w:r><w:t>Next</w:t></w:r></w:p>";
        let paragraphs = paragraphs_from_xml(xml).unwrap();
        assert_eq!(paragraphs, vec!["BeforeAfter", "Boxed", "Next"]);
    }

    #[test]
    fn test_alternate_content_paragraph_after_properties() {
        let xml = "<w:p><w:pPr><w:tabs><w:tab w:val=\"left\" w:pos=\"720\"/></w:tabs></w:pPr>\
                   <w:r><w:t>Lead</w:t></w:r>\
                   <w:r><mc:AlternateContent><mc:Choice Requires=\"wps\"><w:txbxContent>\
                   <w:p><w:pPr><w:jc w:val=\"center\"/></w:pPr><w:r><w:t>Inner</w:t><w:tab/><w:t>cell</w:t></w:r></w:p>\
                   </w:txbxContent></mc:Choice></mc:AlternateContent></w:r>\
                   <w:r><w:t xml:space=\"preserve\"> tail</w:t></w:r></w:p>";
        let paragraphs = paragraphs_from_xml(xml).unwrap();
        assert_eq!(paragraphs, vec!["Lead tail", "Inner\tcell"]);
    }

    #[test]
    fn test_table_cells_are_read_in_row_order() {
        let xml = "<w:p><w:r><w:t>Intro</w:t></w:r></w:p>\
                   <w:tbl><w:tblPr/>\
                   <w:tr><w:tc><w:tcPr/><w:p><w:r><w:t>A1</w:t></w:r></w:p></w:tc>\
                   <w:tc><w:p><w:r><w:t>B1</w:t></w:r></w:p></w:tc></w:tr>\
                   <w:tr><w:tc><w:p><w:r><w:t>A2</w:t></w:r></w:p><w:p/></w:tc></w:tr>\
                   </w:tbl>\
                   <w:p><w:r><w:t>Outro</w:t></w:r></w:p>";
        let paragraphs = paragraphs_from_xml(xml).unwrap();
        assert_eq!(paragraphs, vec!["Intro", "A1", "B1", "A2", "", "Outro"]);
    }

    #[test]
    fn test_field_codes_and_deleted_text_are_skipped() {
        let xml = "<w:p><w:r><w:instrText>PAGE</w:instrText></w:r>\
                   <w:del><w:r><w:delText>old</w:delText></w:r></w:del>\
                   <w:r><w:t>7</w:t></w:r></w:p>";
        assert_eq!(paragraphs_from_xml(xml).unwrap(), vec!["7"]);
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        assert!(paragraphs_from_xml("<w:p><w:r><w:t>open</w:r></w:p>").is_err());
    }

    #[tokio::test]
    async fn test_extract_text_from_docx_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.docx");
        std::fs::write(
            &path,
            docx_bytes("<w:p><w:r><w:t>  Quarterly report</w:t></w:r></w:p><w:p><w:r><w:t>Revenue grew.</w:t></w:r></w:p><w:p/>"),
        )
        .unwrap();

        let text = extract_text(&path).await.unwrap();
        assert_eq!(text, "Quarterly report\nRevenue grew.");
    }

    #[tokio::test]
    async fn test_non_zip_is_docx_parse_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.docx");
        std::fs::write(&path, b"plain bytes").unwrap();

        let err = extract_text(&path).await.unwrap_err();
        assert!(matches!(
            err,
            MetaError::ExtractionFailed {
                stage: ExtractionStage::DocxParse,
                ..
            }
        ));
    }
}
