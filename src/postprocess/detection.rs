//! Detector output rows to boxes on the original image.
//!
//! The detector emits fixed-stride rows of `[x1, y1, x2, y2, score, class_id]`
//! in letterbox canvas coordinates. Extra trailing values in a row are ignored.

use crate::error::{Error, Result};
use crate::imaging::Letterbox;
use serde::Serialize;

/// Minimum row width: four corners, score and class id.
const MIN_ROW_STRIDE: usize = 6;

/// Axis-aligned box with `x1 <= x2` and `y1 <= y2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectionBox {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    score: f32,
    class_id: i32,
}

impl DetectionBox {
    /// Build a box from two corners in any order.
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, score: f32, class_id: i32) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
            score,
            class_id,
        }
    }

    /// Left edge.
    pub fn x1(&self) -> f32 {
        self.x1
    }

    /// Top edge.
    pub fn y1(&self) -> f32 {
        self.y1
    }

    /// Right edge.
    pub fn x2(&self) -> f32 {
        self.x2
    }

    /// Bottom edge.
    pub fn y2(&self) -> f32 {
        self.y2
    }

    /// Detection confidence.
    pub fn score(&self) -> f32 {
        self.score
    }

    /// Class index reported by the model.
    pub fn class_id(&self) -> i32 {
        self.class_id
    }

    /// Box width.
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    /// Box height.
    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }
}

/// Decode rows with `score >= threshold`, keeping model order.
///
/// An empty buffer decodes to no boxes.
#[allow(clippy::cast_possible_truncation)]
pub fn decode_detections(output: &[f32], row_stride: usize, threshold: f32) -> Result<Vec<DetectionBox>> {
    if row_stride < MIN_ROW_STRIDE {
        return Err(Error::MalformedOutput {
            message: format!("row stride {row_stride} is below {MIN_ROW_STRIDE}"),
        });
    }
    if output.len() % row_stride != 0 {
        return Err(Error::MalformedOutput {
            message: format!(
                "output length {} is not a multiple of row stride {row_stride}",
                output.len()
            ),
        });
    }

    Ok(output
        .chunks_exact(row_stride)
        .filter(|row| row[4] >= threshold)
        .map(|row| DetectionBox::new(row[0], row[1], row[2], row[3], row[4], row[5].round() as i32))
        .collect())
}

/// Map canvas boxes back onto the original image, clamping to its bounds.
pub fn map_to_original(boxes: &[DetectionBox], letterbox: &Letterbox) -> Vec<DetectionBox> {
    boxes
        .iter()
        .map(|b| {
            DetectionBox::new(
                letterbox.unmap_x(b.x1),
                letterbox.unmap_y(b.y1),
                letterbox.unmap_x(b.x2),
                letterbox.unmap_y(b.y2),
                b.score,
                b.class_id,
            )
        })
        .collect()
}
