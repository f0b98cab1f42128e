use anyhow::{anyhow, Result};

use crate::ocr::{Detection, Quad};

use super::geom::quad_from_box;

const TSV_COLUMNS: usize = 12;
const WORD_LEVEL: i32 = 5;

/// Reads word rows from tesseract's TSV output.
///
/// Confidence is dropped; rows tesseract marks with a negative confidence
/// are structural (page, block, line) and never carry text.
pub(super) fn parse_tsv_detections(tsv: &str) -> Result<Vec<Detection<Quad>>> {
    let mut detections = Vec::new();

    for (idx, row) in tsv.lines().enumerate() {
        if idx == 0 {
            continue;
        }
        let cols = row.split('\t').collect::<Vec<_>>();
        if cols.len() < TSV_COLUMNS {
            continue;
        }
        let level: i32 = cols[0].parse().unwrap_or(0);
        if level != WORD_LEVEL {
            continue;
        }
        let conf: f32 = cols[10].parse().unwrap_or(-1.0);
        let text = cols[11].trim();
        if text.is_empty() || conf < 0.0 {
            continue;
        }
        let left = parse_coord(cols[6], "left", idx)?;
        let top = parse_coord(cols[7], "top", idx)?;
        let width = parse_coord(cols[8], "width", idx)?;
        let height = parse_coord(cols[9], "height", idx)?;

        let order = detections.len();
        detections.push(Detection::new(
            text,
            quad_from_box(left, top, width, height),
            order,
        ));
    }

    Ok(detections)
}

fn parse_coord(value: &str, name: &str, row: usize) -> Result<f32> {
    value
        .trim()
        .parse::<f32>()
        .map_err(|_| anyhow!("invalid {} value {:?} in tesseract tsv row {}", name, value, row))
}
