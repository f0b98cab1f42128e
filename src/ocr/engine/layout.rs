use std::borrow::Cow;
use std::cmp::Ordering;

use tracing::debug;

use crate::ocr::{Detection, GeometryError, Quad, Rect};

use super::geom::{Anchor, Geometry};
use super::text::{clean_fragment_text, join_line};

/// Direction in which the vertical axis of a coordinate space grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Image space: origin top-left, y grows downward.
    TopDown,
    /// Content-stream space: origin bottom-left, y grows upward.
    BottomUp,
}

#[derive(Debug, Clone, Copy)]
pub struct LayoutOptions {
    /// Largest vertical distance from a line's first detection that still joins the line.
    pub threshold: f32,
    pub orientation: Orientation,
    pub clean_text: bool,
}

pub const IMAGE_LINE_THRESHOLD: f32 = 10.0;
pub const VECTOR_LINE_THRESHOLD: f32 = 5.0;

struct Placed<'a> {
    text: Cow<'a, str>,
    anchor: Anchor,
    order: usize,
}

/// A detection left out of a page because its geometry could not be placed.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedDetection {
    pub order: usize,
    pub error: GeometryError,
}

/// Lines of one page, plus every detection that could not take part.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub lines: Vec<String>,
    pub rejected: Vec<RejectedDetection>,
}

impl PageLayout {
    pub fn text(&self) -> String {
        render_page(&self.lines)
    }

    /// One message per rejected detection, in input order.
    pub fn warnings(&self) -> Vec<String> {
        self.rejected
            .iter()
            .map(|rejected| format!("detection {} skipped: {}", rejected.order, rejected.error))
            .collect()
    }
}

/// Groups detections into reading-order lines.
///
/// Detections are ordered top of page first, then left to right, with the
/// input order breaking full ties. A new line starts whenever a detection
/// sits more than `threshold` away from the first detection of the current
/// line; the reference is never moved while a line grows, so a long run of
/// slightly slanted words cannot drift into the next line.
///
/// A detection with malformed geometry is left out and reported in
/// [`PageLayout::rejected`]; the rest of the page is still assembled. Only a
/// bad threshold fails the whole call.
pub fn assemble_lines<G: Geometry>(
    detections: &[Detection<G>],
    options: LayoutOptions,
) -> Result<PageLayout, GeometryError> {
    if !options.threshold.is_finite() || options.threshold < 0.0 {
        return Err(GeometryError::InvalidThreshold(options.threshold));
    }

    let mut placed = Vec::with_capacity(detections.len());
    let mut rejected = Vec::new();
    for detection in detections {
        let anchor = match detection.geometry.anchor() {
            Ok(anchor) => anchor,
            Err(error) => {
                rejected.push(RejectedDetection {
                    order: detection.order,
                    error,
                });
                continue;
            }
        };
        let text = if options.clean_text {
            Cow::Owned(clean_fragment_text(&detection.text))
        } else {
            Cow::Borrowed(detection.text.as_str())
        };
        placed.push(Placed {
            text,
            anchor,
            order: detection.order,
        });
    }
    rejected.sort_by_key(|rejected| rejected.order);

    placed.sort_by(|a, b| reading_order(a, b, options.orientation));

    let mut lines = Vec::new();
    let mut current: Vec<Placed> = Vec::new();
    let mut reference: Option<f32> = None;
    for item in placed {
        let starts_line = match reference {
            None => true,
            Some(value) => (item.anchor.vertical - value).abs() > options.threshold,
        };
        if starts_line {
            flush_line(&mut current, &mut lines);
            reference = Some(item.anchor.vertical);
        }
        current.push(item);
    }
    flush_line(&mut current, &mut lines);

    debug!(
        "layout: {} detections -> {} lines, {} rejected",
        detections.len(),
        lines.len(),
        rejected.len()
    );
    Ok(PageLayout { lines, rejected })
}

/// Image variant: quads in pixel space, no text cleaning.
pub fn assemble_image_lines(
    detections: &[Detection<Quad>],
    threshold: f32,
) -> Result<PageLayout, GeometryError> {
    assemble_lines(
        detections,
        LayoutOptions {
            threshold,
            orientation: Orientation::TopDown,
            clean_text: false,
        },
    )
}

/// Vector variant: content-stream boxes in points, fragments cleaned first.
pub fn assemble_vector_lines(
    fragments: &[Detection<Rect>],
    threshold: f32,
) -> Result<PageLayout, GeometryError> {
    assemble_lines(
        fragments,
        LayoutOptions {
            threshold,
            orientation: Orientation::BottomUp,
            clean_text: true,
        },
    )
}

pub fn render_page(lines: &[String]) -> String {
    lines.join("\n")
}

fn reading_order(a: &Placed, b: &Placed, orientation: Orientation) -> Ordering {
    let vertical = match orientation {
        Orientation::TopDown => a.anchor.vertical.total_cmp(&b.anchor.vertical),
        Orientation::BottomUp => b.anchor.vertical.total_cmp(&a.anchor.vertical),
    };
    vertical.then_with(|| left_to_right(a, b))
}

fn left_to_right(a: &Placed, b: &Placed) -> Ordering {
    a.anchor
        .horizontal
        .total_cmp(&b.anchor.horizontal)
        .then(a.order.cmp(&b.order))
}

fn flush_line(current: &mut Vec<Placed>, lines: &mut Vec<String>) {
    if current.is_empty() {
        return;
    }
    current.sort_by(left_to_right);
    lines.push(join_line(current.iter().map(|item| item.text.as_ref())));
    current.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::engine::geom::quad_from_box;

    fn word(text: &str, left: f32, top: f32, order: usize) -> Detection<Quad> {
        Detection::new(text, quad_from_box(left, top, 40.0, 12.0), order)
    }

    fn fragment(text: &str, x0: f32, y1: f32, order: usize) -> Detection<Rect> {
        Detection::new(
            text,
            Rect {
                x0,
                y0: y1 - 10.0,
                x1: x0 + 100.0,
                y1,
            },
            order,
        )
    }

    #[test]
    fn nearby_words_share_a_line_sorted_left_to_right() {
        let detections = vec![word("Hello", 50.0, 100.0, 0), word("World", 10.0, 104.0, 1)];
        let lines = assemble_image_lines(&detections, 10.0).expect("lines").lines;
        assert_eq!(lines, vec!["World Hello"]);
    }

    #[test]
    fn distant_words_split_in_vertical_order() {
        let detections = vec![word("below", 10.0, 150.0, 0), word("above", 10.0, 100.0, 1)];
        let lines = assemble_image_lines(&detections, 10.0).expect("lines").lines;
        assert_eq!(lines, vec!["above", "below"]);
    }

    #[test]
    fn empty_page_has_no_lines() {
        let lines = assemble_image_lines(&[], 10.0).expect("lines").lines;
        assert!(lines.is_empty());
        assert_eq!(render_page(&lines), "");
    }

    #[test]
    fn single_detection_is_single_line() {
        let lines = assemble_image_lines(&[word("only", 3.0, 3.0, 0)], 10.0).expect("lines").lines;
        assert_eq!(lines, vec!["only"]);
    }

    #[test]
    fn full_ties_keep_input_order() {
        let detections = vec![
            word("first", 10.0, 100.0, 0),
            word("second", 10.0, 100.0, 1),
            word("third", 10.0, 100.0, 2),
        ];
        let lines = assemble_image_lines(&detections, 10.0).expect("lines").lines;
        assert_eq!(lines, vec!["first second third"]);
    }

    #[test]
    fn reference_does_not_drift_along_a_line() {
        let detections = vec![
            word("a0", 0.0, 0.0, 0),
            word("a8", 50.0, 8.0, 1),
            word("a16", 100.0, 16.0, 2),
        ];
        let lines = assemble_image_lines(&detections, 10.0).expect("lines").lines;
        assert_eq!(lines, vec!["a0 a8", "a16"]);
    }

    #[test]
    fn huge_threshold_collapses_to_one_line() {
        let detections = vec![
            word("c", 30.0, 500.0, 0),
            word("a", 10.0, 0.0, 1),
            word("b", 20.0, 250.0, 2),
        ];
        let lines = assemble_image_lines(&detections, 1000.0).expect("lines").lines;
        assert_eq!(lines, vec!["a b c"]);
    }

    #[test]
    fn line_count_matches_gap_runs() {
        // tops 0, 4, 30, 33, 80: gaps 4, 26, 3, 47 with T=5 give three runs.
        let tops = [33.0, 0.0, 80.0, 4.0, 30.0];
        let detections = tops
            .iter()
            .enumerate()
            .map(|(idx, top)| word(&format!("w{}", idx), 0.0, *top, idx))
            .collect::<Vec<_>>();
        let lines = assemble_image_lines(&detections, 5.0).expect("lines").lines;
        assert_eq!(lines.len(), 3);
        assert_eq!(lines, vec!["w1 w3", "w0 w4", "w2"]);
    }

    #[test]
    fn output_is_deterministic() {
        let detections = (0..40)
            .map(|idx| {
                word(
                    &format!("t{}", idx),
                    ((idx * 37) % 11) as f32 * 10.0,
                    ((idx * 13) % 7) as f32 * 6.0,
                    idx,
                )
            })
            .collect::<Vec<_>>();
        let first = assemble_image_lines(&detections, 10.0).expect("lines").lines;
        for _ in 0..5 {
            assert_eq!(assemble_image_lines(&detections, 10.0).expect("lines").lines, first);
        }
    }

    #[test]
    fn rotated_quad_uses_its_highest_corner() {
        let tilted = Detection::new(
            "tilted",
            Quad {
                points: vec![
                    crate::ocr::Point { x: 60.0, y: 112.0 },
                    crate::ocr::Point { x: 120.0, y: 101.0 },
                    crate::ocr::Point { x: 122.0, y: 113.0 },
                    crate::ocr::Point { x: 62.0, y: 124.0 },
                ],
            },
            1,
        );
        let detections = vec![word("flat", 0.0, 100.0, 0), tilted];
        let lines = assemble_image_lines(&detections, 10.0).expect("lines").lines;
        assert_eq!(lines, vec!["flat tilted"]);
    }

    #[test]
    fn vector_lines_read_from_the_top_of_the_page() {
        let fragments = vec![
            fragment("footer", 72.0, 40.0, 0),
            fragment("Rated voltage", 72.0, 760.0, 1),
            fragment("a 24 V DC", 300.0, 762.0, 2),
            fragment("Title", 72.0, 800.0, 3),
        ];
        let lines = assemble_vector_lines(&fragments, 5.0).expect("lines").lines;
        assert_eq!(lines, vec!["Title", "Rated voltage 24 V DC", "footer"]);
    }

    #[test]
    fn malformed_quad_is_skipped_alone() {
        let mut detections = (0..49)
            .map(|idx| word(&format!("w{}", idx), idx as f32 * 50.0, 100.0, idx))
            .collect::<Vec<_>>();
        detections.insert(
            20,
            Detection::new(
                "broken",
                Quad {
                    points: vec![crate::ocr::Point { x: 0.0, y: 0.0 }],
                },
                49,
            ),
        );

        let layout = assemble_image_lines(&detections, 10.0).expect("layout");
        assert_eq!(layout.lines.len(), 1);
        assert_eq!(layout.lines[0].split(' ').count(), 49);
        assert!(!layout.lines[0].contains("broken"));
        assert_eq!(
            layout.rejected,
            vec![RejectedDetection {
                order: 49,
                error: GeometryError::WrongCornerCount {
                    expected: 4,
                    found: 1
                },
            }]
        );
        assert_eq!(
            layout.warnings(),
            vec!["detection 49 skipped: detection has 1 corner points, expected 4"]
        );
    }

    #[test]
    fn distance_equal_to_threshold_joins_the_line() {
        let detections = vec![word("b", 20.0, 10.0, 0), word("a", 0.0, 0.0, 1)];
        let lines = assemble_image_lines(&detections, 10.0).expect("lines").lines;
        assert_eq!(lines, vec!["a b"]);

        let detections = vec![word("b", 20.0, 10.5, 0), word("a", 0.0, 0.0, 1)];
        let lines = assemble_image_lines(&detections, 10.0).expect("lines").lines;
        assert_eq!(lines, vec!["a", "b"]);
    }

    #[test]
    fn vector_full_ties_keep_input_order() {
        let fragments = vec![
            fragment("one", 72.0, 700.0, 0),
            fragment("two", 72.0, 700.0, 1),
            fragment("three", 72.0, 700.0, 2),
        ];
        let lines = assemble_vector_lines(&fragments, 5.0).expect("lines").lines;
        assert_eq!(lines, vec!["one two three"]);

        let reversed = fragments
            .into_iter()
            .rev()
            .enumerate()
            .map(|(order, fragment)| Detection::new(fragment.text, fragment.geometry, order))
            .collect::<Vec<_>>();
        let lines = assemble_vector_lines(&reversed, 5.0).expect("lines").lines;
        assert_eq!(lines, vec!["three two one"]);
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let err = assemble_image_lines(&[], -1.0).expect_err("threshold");
        assert_eq!(err, GeometryError::InvalidThreshold(-1.0));
    }
}
