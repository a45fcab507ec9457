//! Detection decoding and non-maximum suppression.
//!
//! Pure functions over raw score arrays and structured detections, kept
//! independent of the inference backend so the post-processing chain can be
//! exercised without a model.

use crate::frame::Region;

/// One scored box in absolute pixel coordinates.
#[derive(Clone, Debug)]
pub struct Detection {
    pub region: Region,
    pub confidence: f32,
    pub class_id: usize,
}

/// Index and value of the highest class score, if any.
pub fn top_class(scores: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (id, &score) in scores.iter().enumerate() {
        match best {
            Some((_, current)) if score <= current => {}
            _ => best = Some((id, score)),
        }
    }
    best
}

/// Decode fixed-width detector output rows into pixel-space detections.
///
/// Each row is `[cx, cy, w, h, objectness, class scores...]` with the box in
/// normalized 0..1 coordinates. A row survives only when its best class score
/// is strictly greater than `confidence_threshold`; that score becomes the
/// detection confidence. Centers convert to top-left corners here.
pub fn decode_rows(
    data: &[f32],
    row_len: usize,
    frame_width: u32,
    frame_height: u32,
    confidence_threshold: f32,
) -> Vec<Detection> {
    let mut detections = Vec::new();
    if row_len < 6 {
        return detections;
    }
    for row in data.chunks_exact(row_len) {
        let Some((class_id, confidence)) = top_class(&row[5..]) else {
            continue;
        };
        if confidence <= confidence_threshold {
            continue;
        }

        let center_x = row[0] * frame_width as f32;
        let center_y = row[1] * frame_height as f32;
        let w = (row[2] * frame_width as f32) as i32;
        let h = (row[3] * frame_height as f32) as i32;
        let x = (center_x - w as f32 / 2.0) as i32;
        let y = (center_y - h as f32 / 2.0) as i32;

        detections.push(Detection {
            region: Region::new(x, y, w, h),
            confidence,
            class_id,
        });
    }
    detections
}

/// Intersection-over-union of two regions.
pub fn iou(a: Region, b: Region) -> f32 {
    let intersection = a
        .intersection(&b)
        .map(|overlap| overlap.area())
        .unwrap_or(0);
    let union = a.area() + b.area() - intersection;
    if union <= 0 {
        return 0.0;
    }
    intersection as f32 / union as f32
}

/// Greedy class-agnostic non-maximum suppression.
///
/// Detections at or below `confidence_threshold` are dropped first. The rest
/// are taken in descending confidence order; each kept box removes every
/// remaining box whose IoU with it exceeds `overlap_threshold`.
pub fn non_max_suppression(
    mut detections: Vec<Detection>,
    confidence_threshold: f32,
    overlap_threshold: f32,
) -> Vec<Detection> {
    detections.retain(|det| det.confidence > confidence_threshold);
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Detection> = Vec::new();
    for candidate in detections {
        let suppressed = kept
            .iter()
            .any(|winner| iou(winner.region, candidate.region) > overlap_threshold);
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x: i32, y: i32, w: i32, h: i32, confidence: f32) -> Detection {
        Detection {
            region: Region::new(x, y, w, h),
            confidence,
            class_id: 0,
        }
    }

    #[test]
    fn top_class_picks_highest_score() {
        assert_eq!(top_class(&[0.1, 0.7, 0.3]), Some((1, 0.7)));
        assert_eq!(top_class(&[]), None);
    }

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let a = Region::new(10, 10, 50, 50);
        assert!((iou(a, a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = Region::new(0, 0, 10, 10);
        let b = Region::new(100, 100, 10, 10);
        assert_eq!(iou(a, b), 0.0);
    }

    #[test]
    fn heavily_overlapping_boxes_keep_only_the_stronger() {
        // Offset by 5px on a 100px box: IoU well above 0.4.
        let a = det(0, 0, 100, 100, 0.9);
        let b = det(5, 5, 100, 100, 0.6);
        let kept = non_max_suppression(vec![b, a], 0.5, 0.4);
        assert_eq!(kept.len(), 1);
        assert!((kept[0].confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn lightly_overlapping_boxes_both_survive() {
        // Offset by 60px: IoU = 1600 / 18400 ~ 0.087, below 0.4.
        let a = det(0, 0, 100, 100, 0.9);
        let b = det(60, 60, 100, 100, 0.6);
        let kept = non_max_suppression(vec![a, b], 0.5, 0.4);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn confidence_exactly_at_threshold_is_excluded() {
        let kept = non_max_suppression(vec![det(0, 0, 10, 10, 0.5)], 0.5, 0.4);
        assert!(kept.is_empty());

        let kept = non_max_suppression(vec![det(0, 0, 10, 10, 0.51)], 0.5, 0.4);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn decode_converts_centers_to_corners() {
        // One row: centered box at (0.5, 0.5), half the frame wide/tall,
        // objectness then two class scores.
        let row = [0.5, 0.5, 0.5, 0.5, 0.9, 0.2, 0.8];
        let dets = decode_rows(&row, row.len(), 640, 480, 0.5);
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class_id, 1);
        assert_eq!(dets[0].region, Region::new(160, 120, 320, 240));
    }

    #[test]
    fn decode_excludes_confidence_at_threshold() {
        let row = [0.5, 0.5, 0.2, 0.2, 0.9, 0.5, 0.1];
        assert!(decode_rows(&row, row.len(), 640, 480, 0.5).is_empty());

        let row = [0.5, 0.5, 0.2, 0.2, 0.9, 0.500001, 0.1];
        assert_eq!(decode_rows(&row, row.len(), 640, 480, 0.5).len(), 1);
    }

    #[test]
    fn decode_ignores_rows_without_class_scores() {
        let row = [0.5, 0.5, 0.2, 0.2, 0.9];
        assert!(decode_rows(&row, row.len(), 640, 480, 0.5).is_empty());
    }
}
