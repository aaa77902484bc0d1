use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::ReviewError;

const DOCUMENT_XML: &str = "word/document.xml";

/// Where a review run gets spliced into `word/document.xml`.
#[derive(Debug, Clone, Copy)]
enum Anchor {
    /// Byte offset of the paragraph's closing `</w:p>`.
    BeforeClose(usize),
    /// Byte span of a self-closing `<w:p/>`.
    SelfClosing { start: usize, end: usize },
}

#[derive(Debug, Clone)]
struct Paragraph {
    text: String,
    anchor: Anchor,
}

/// A `.docx` file opened for reading and inline annotation.
///
/// Only the body paragraphs (direct children of `w:body`) are exposed,
/// so table cells and text boxes are not addressable.
pub struct DocxDocument {
    source: PathBuf,
    xml: String,
    paragraphs: Vec<Paragraph>,
    notes: Vec<Vec<String>>,
}

impl DocxDocument {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let mut archive = ZipArchive::new(file)
            .map_err(|e| ReviewError::Docx(format!("{}: {}", path.display(), e)))?;
        let mut xml = String::new();
        archive
            .by_name(DOCUMENT_XML)
            .map_err(|_| ReviewError::Docx(format!("{} has no {}", path.display(), DOCUMENT_XML)))?
            .read_to_string(&mut xml)
            .context("Failed to read document body")?;

        let paragraphs = parse_paragraphs(&xml)?;
        debug!(path = %path.display(), paragraphs = paragraphs.len(), "docx opened");
        Ok(Self {
            source: path.to_path_buf(),
            notes: vec![Vec::new(); paragraphs.len()],
            xml,
            paragraphs,
        })
    }

    pub fn paragraph_texts(&self) -> Vec<String> {
        self.paragraphs.iter().map(|p| p.text.clone()).collect()
    }

    /// Full text: paragraphs joined by newlines.
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Queue a bold red `[REVIEW: ..]` run at the end of a paragraph.
    pub fn annotate(&mut self, index: usize, comment: &str) -> Result<(), ReviewError> {
        let Some(notes) = self.notes.get_mut(index) else {
            return Err(ReviewError::Docx(format!(
                "paragraph {} out of range ({} paragraphs)",
                index,
                self.paragraphs.len()
            )));
        };
        notes.push(comment.to_string());
        Ok(())
    }

    /// `word/document.xml` with every queued annotation applied.
    fn render_xml(&self) -> String {
        let mut out = String::with_capacity(self.xml.len() + 256);
        let mut cursor = 0;

        for (paragraph, notes) in self.paragraphs.iter().zip(&self.notes) {
            if notes.is_empty() {
                continue;
            }
            let runs: String = notes.iter().map(|n| review_run(n)).collect();
            match paragraph.anchor {
                Anchor::BeforeClose(at) => {
                    out.push_str(&self.xml[cursor..at]);
                    out.push_str(&runs);
                    cursor = at;
                }
                Anchor::SelfClosing { start, end } => {
                    out.push_str(&self.xml[cursor..start]);
                    let open = self.xml[start..end].trim_end_matches("/>").trim_end();
                    out.push_str(open);
                    out.push('>');
                    out.push_str(&runs);
                    out.push_str("</w:p>");
                    cursor = end;
                }
            }
        }

        out.push_str(&self.xml[cursor..]);
        out
    }

    /// Write the annotated copy. Every archive entry except the body is copied raw.
    pub fn save(&self, dest: &Path) -> Result<()> {
        let body = self.render_xml();

        let mut archive = ZipArchive::new(
            File::open(&self.source)
                .with_context(|| format!("Failed to reopen {}", self.source.display()))?,
        )?;
        let out = File::create(dest).with_context(|| format!("Failed to create {}", dest.display()))?;
        let mut writer = ZipWriter::new(out);

        for i in 0..archive.len() {
            let entry = archive.by_index_raw(i)?;
            if entry.name() == DOCUMENT_XML {
                let options =
                    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
                writer.start_file(DOCUMENT_XML, options)?;
                writer.write_all(body.as_bytes())?;
            } else {
                writer.raw_copy_file(entry)?;
            }
        }

        writer.finish()?;
        debug!(dest = %dest.display(), "annotated docx written");
        Ok(())
    }
}

fn review_run(comment: &str) -> String {
    format!(
        "<w:r><w:rPr><w:b/><w:color w:val=\"FF0000\"/></w:rPr>\
         <w:t xml:space=\"preserve\">  [REVIEW: {}]</w:t></w:r>",
        escape(comment)
    )
}

fn parse_paragraphs(xml: &str) -> Result<Vec<Paragraph>, ReviewError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut paragraphs = Vec::new();
    // (depth of the open body paragraph, text collected so far)
    let mut open: Option<(usize, String)> = None;

    loop {
        let before = reader.buffer_position() as usize;
        let event = reader
            .read_event()
            .map_err(|e| ReviewError::Docx(format!("malformed document.xml at byte {before}: {e}")))?;

        match event {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                if name == b"w:p" && open.is_none() && stack.last().is_some_and(|n| n == b"w:body") {
                    open = Some((stack.len() + 1, String::new()));
                }
                stack.push(name);
            }
            Event::End(e) => {
                let closes_open = e.name().as_ref() == b"w:p"
                    && open.as_ref().is_some_and(|(depth, _)| *depth == stack.len());
                if closes_open {
                    if let Some((_, text)) = open.take() {
                        paragraphs.push(Paragraph {
                            text,
                            anchor: Anchor::BeforeClose(before),
                        });
                    }
                }
                stack.pop();
            }
            Event::Empty(e) => {
                let name = e.name();
                let parent = stack.last().map(Vec::as_slice);
                match (name.as_ref(), &mut open) {
                    (b"w:p", None) if parent == Some(b"w:body".as_slice()) => {
                        paragraphs.push(Paragraph {
                            text: String::new(),
                            anchor: Anchor::SelfClosing {
                                start: before,
                                end: reader.buffer_position() as usize,
                            },
                        });
                    }
                    (b"w:tab", Some((_, text)))
                        if parent == Some(b"w:r".as_slice()) && !in_textbox(&stack) =>
                    {
                        text.push('\t');
                    }
                    (b"w:br" | b"w:cr", Some((_, text)))
                        if parent == Some(b"w:r".as_slice()) && !in_textbox(&stack) =>
                    {
                        text.push('\n');
                    }
                    _ => {}
                }
            }
            Event::Text(t) => {
                if let Some((_, text)) = &mut open {
                    if stack.last().is_some_and(|n| n == b"w:t") && !in_textbox(&stack) {
                        let unescaped = t
                            .unescape()
                            .map_err(|e| ReviewError::Docx(format!("bad text at byte {before}: {e}")))?;
                        text.push_str(&unescaped);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

fn in_textbox(stack: &[Vec<u8>]) -> bool {
    stack.iter().any(|n| n == b"w:txbxContent")
}
