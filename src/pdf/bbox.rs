use anyhow::{Context, Result, anyhow};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::path::Path;
use std::process::Command;
use tracing::info;

use crate::ocr::{Detection, Rect, rect_from_top_down};

use super::{VectorExtractor, VectorPage};

/// Reads positioned text lines with poppler's `pdftotext -bbox-layout`.
#[derive(Debug, Clone, Default)]
pub struct PopplerExtractor;

impl VectorExtractor for PopplerExtractor {
    fn extract(&self, pdf_path: &Path) -> Result<Vec<VectorPage>> {
        info!("vector: pdftotext -bbox-layout");
        let output = Command::new("pdftotext")
            .arg("-bbox-layout")
            .arg("-enc")
            .arg("UTF-8")
            .arg(pdf_path)
            .arg("-")
            .output()
            .with_context(|| "failed to run pdftotext (is poppler installed?)")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("pdftotext failed: {}", stderr.trim()));
        }
        let xhtml = String::from_utf8_lossy(&output.stdout);
        parse_bbox_layout(&xhtml)
    }
}

#[derive(Default)]
struct LineState {
    x_min: f32,
    y_min: f32,
    x_max: f32,
    y_max: f32,
    words: Vec<String>,
}

/// Turns the `-bbox-layout` XHTML into one page of line fragments per
/// `<page>`. Boxes there are top-down, so they are flipped against the page
/// height; lines taller than they are wide are rotated text and dropped.
pub(super) fn parse_bbox_layout(xhtml: &str) -> Result<Vec<VectorPage>> {
    let mut reader = Reader::from_str(xhtml);
    reader.trim_text(true);

    let mut pages = Vec::new();
    let mut page_height: Option<f32> = None;
    let mut fragments: Vec<Detection<Rect>> = Vec::new();
    let mut line: Option<LineState> = None;
    let mut word: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"page" => {
                    page_height = Some(float_attr(&e, "height")?);
                    fragments.clear();
                }
                b"line" => {
                    line = Some(LineState {
                        x_min: float_attr(&e, "xMin")?,
                        y_min: float_attr(&e, "yMin")?,
                        x_max: float_attr(&e, "xMax")?,
                        y_max: float_attr(&e, "yMax")?,
                        words: Vec::new(),
                    });
                }
                b"word" => word = Some(String::new()),
                _ => {}
            },
            Ok(Event::Empty(e)) if e.name().as_ref() == b"page" => {
                pages.push(VectorPage::default());
            }
            Ok(Event::Text(e)) => {
                if let Some(current) = word.as_mut() {
                    let text = e
                        .unescape()
                        .with_context(|| "failed to decode pdftotext word")?;
                    current.push_str(&text);
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"word" => {
                    if let (Some(text), Some(current)) = (word.take(), line.as_mut()) {
                        if !text.trim().is_empty() {
                            current.words.push(text.trim().to_string());
                        }
                    }
                }
                b"line" => {
                    let (Some(state), Some(height)) = (line.take(), page_height) else {
                        continue;
                    };
                    let text = state.words.join(" ");
                    if text.is_empty() || !is_horizontal(&state, &text) {
                        continue;
                    }
                    let order = fragments.len();
                    fragments.push(Detection::new(
                        text,
                        rect_from_top_down(
                            state.x_min,
                            state.y_min,
                            state.x_max,
                            state.y_max,
                            height,
                        ),
                        order,
                    ));
                }
                b"page" => {
                    pages.push(VectorPage {
                        fragments: std::mem::take(&mut fragments),
                    });
                    page_height = None;
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(anyhow!("failed to parse pdftotext output: {}", err)),
        }
    }

    Ok(pages)
}

fn is_horizontal(line: &LineState, text: &str) -> bool {
    let width = line.x_max - line.x_min;
    let height = line.y_max - line.y_min;
    width >= height || text.chars().count() <= 1
}

fn float_attr(element: &BytesStart, name: &str) -> Result<f32> {
    let attr = element
        .try_get_attribute(name)
        .with_context(|| format!("malformed attribute {}", name))?
        .ok_or_else(|| anyhow!("missing attribute {} on <{}>", name, tag_name(element)))?;
    let value = attr
        .unescape_value()
        .with_context(|| format!("failed to decode attribute {}", name))?;
    value
        .trim()
        .parse::<f32>()
        .with_context(|| format!("attribute {} is not a number: {:?}", name, value))
}

fn tag_name(element: &BytesStart) -> String {
    String::from_utf8_lossy(element.name().as_ref()).to_string()
}
