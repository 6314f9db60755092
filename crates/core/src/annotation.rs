use serde::{Deserialize, Serialize};

/// A pixel coordinate as reported by the text detector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vertex {
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
}

impl Vertex {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// One recognized word with its four-corner bounding box.
///
/// Corner order is whatever the detector returned. By convention vertex 0 is
/// the detector's top-left and vertex 1 its top-right, but the box is not
/// guaranteed to be clockwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordAnnotation {
    pub text: String,
    pub bounding_box: [Vertex; 4],
}

impl WordAnnotation {
    pub fn new(text: impl Into<String>, bounding_box: [Vertex; 4]) -> Self {
        Self { text: text.into(), bounding_box }
    }

    /// Axis-aligned box helper, mostly for fixtures: `(x, y)` top-left plus size.
    pub fn from_rect(text: impl Into<String>, x: i32, y: i32, width: i32, height: i32) -> Self {
        Self::new(
            text,
            [
                Vertex::new(x, y),
                Vertex::new(x + width, y),
                Vertex::new(x + width, y + height),
                Vertex::new(x, y + height),
            ],
        )
    }

    /// Vertical position used for line clustering: the floored mean of the
    /// first two vertices' y.
    pub fn line_y(&self) -> i32 {
        let [v0, v1, _, _] = self.bounding_box;
        let sum = i64::from(v0.y) + i64::from(v1.y);
        // the mean of two i32 values is always an i32
        sum.div_euclid(2) as i32
    }

    /// Horizontal position used to order words within a line.
    pub fn left_x(&self) -> i32 {
        self.bounding_box[0].x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_y_averages_top_edge() {
        let w = WordAnnotation::new(
            "MILK",
            [
                Vertex::new(10, 100),
                Vertex::new(60, 103),
                Vertex::new(60, 120),
                Vertex::new(10, 118),
            ],
        );
        assert_eq!(w.line_y(), 101);
        assert_eq!(w.left_x(), 10);
    }

    #[test]
    fn line_y_floors_negative_coordinates() {
        let w = WordAnnotation::new(
            "edge",
            [Vertex::new(0, -3), Vertex::new(5, 0), Vertex::new(5, 5), Vertex::new(0, 5)],
        );
        assert_eq!(w.line_y(), -2);
    }

    #[test]
    fn line_y_at_coordinate_limits() {
        let top = |y| {
            WordAnnotation::new("x", [Vertex::new(0, y), Vertex::new(1, y), Vertex::new(1, y), Vertex::new(0, y)])
        };
        assert_eq!(top(i32::MAX).line_y(), i32::MAX);
        assert_eq!(top(i32::MIN).line_y(), i32::MIN);
    }

    #[test]
    fn missing_vertex_fields_default_to_zero() {
        let v: Vertex = serde_json::from_str(r#"{"y": 7}"#).unwrap();
        assert_eq!(v, Vertex::new(0, 7));
    }
}
