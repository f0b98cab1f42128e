use crate::ocr::{GeometryError, Point, Quad, Rect};

/// Reference coordinates used to order a detection on its page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub vertical: f32,
    pub horizontal: f32,
}

/// Any bounding shape the line assembler can place on a page.
pub trait Geometry {
    fn anchor(&self) -> Result<Anchor, GeometryError>;
}

impl Geometry for Quad {
    /// Top edge is the smallest y over the corners (image space grows downward).
    fn anchor(&self) -> Result<Anchor, GeometryError> {
        if self.points.len() != 4 {
            return Err(GeometryError::WrongCornerCount {
                expected: 4,
                found: self.points.len(),
            });
        }
        if self.points.iter().any(|point| !point_is_finite(point)) {
            return Err(GeometryError::NonFiniteCoordinate);
        }
        let vertical = self
            .points
            .iter()
            .map(|point| point.y)
            .fold(f32::INFINITY, f32::min);
        let horizontal = self
            .points
            .iter()
            .map(|point| point.x)
            .fold(f32::INFINITY, f32::min);
        Ok(Anchor {
            vertical,
            horizontal,
        })
    }
}

impl Geometry for Rect {
    /// Content-stream space grows upward, so `y1` is the top edge.
    fn anchor(&self) -> Result<Anchor, GeometryError> {
        let coords = [self.x0, self.y0, self.x1, self.y1];
        if coords.iter().any(|value| !value.is_finite()) {
            return Err(GeometryError::NonFiniteCoordinate);
        }
        Ok(Anchor {
            vertical: self.y1,
            horizontal: self.x0,
        })
    }
}

fn point_is_finite(point: &Point) -> bool {
    point.x.is_finite() && point.y.is_finite()
}

/// Converts a top-down pixel box into the four corners of a quad, clockwise from top-left.
pub(crate) fn quad_from_box(x: f32, y: f32, w: f32, h: f32) -> Quad {
    Quad {
        points: vec![
            Point { x, y },
            Point { x: x + w, y },
            Point { x: x + w, y: y + h },
            Point { x, y: y + h },
        ],
    }
}

/// Flips a top-down box into bottom-up page coordinates.
pub(crate) fn rect_from_top_down(
    x_min: f32,
    y_min: f32,
    x_max: f32,
    y_max: f32,
    page_height: f32,
) -> Rect {
    Rect {
        x0: x_min,
        y0: page_height - y_max,
        x1: x_max,
        y1: page_height - y_min,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_anchor_uses_minimum_corner_values() {
        let quad = Quad {
            points: vec![
                Point { x: 12.0, y: 104.0 },
                Point { x: 80.0, y: 100.0 },
                Point { x: 82.0, y: 120.0 },
                Point { x: 10.0, y: 124.0 },
            ],
        };
        let anchor = quad.anchor().expect("anchor");
        assert_eq!(anchor.vertical, 100.0);
        assert_eq!(anchor.horizontal, 10.0);
    }

    #[test]
    fn quad_with_three_corners_is_rejected() {
        let quad = Quad {
            points: vec![
                Point { x: 0.0, y: 0.0 },
                Point { x: 1.0, y: 0.0 },
                Point { x: 1.0, y: 1.0 },
            ],
        };
        let err = quad.anchor().expect_err("three corners");
        assert_eq!(
            err,
            GeometryError::WrongCornerCount {
                expected: 4,
                found: 3
            }
        );
    }

    #[test]
    fn rect_anchor_is_top_left_in_bottom_up_space() {
        let rect = Rect {
            x0: 72.0,
            y0: 700.0,
            x1: 300.0,
            y1: 712.0,
        };
        let anchor = rect.anchor().expect("anchor");
        assert_eq!(anchor.vertical, 712.0);
        assert_eq!(anchor.horizontal, 72.0);
    }

    #[test]
    fn nan_coordinates_are_rejected() {
        let rect = Rect {
            x0: f32::NAN,
            y0: 0.0,
            x1: 1.0,
            y1: 1.0,
        };
        assert_eq!(rect.anchor(), Err(GeometryError::NonFiniteCoordinate));
    }

    #[test]
    fn top_down_box_is_flipped_against_page_height() {
        let rect = rect_from_top_down(10.0, 20.0, 110.0, 32.0, 842.0);
        assert_eq!(rect.y1, 822.0);
        assert_eq!(rect.y0, 810.0);
        assert_eq!(rect.x0, 10.0);
        assert_eq!(rect.x1, 110.0);
    }
}
