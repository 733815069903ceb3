//! Decoding detector rows and mapping them back through the letterbox.

#![allow(clippy::unwrap_used, clippy::float_cmp)]

use birdlens::imaging::Letterbox;
use birdlens::postprocess::{decode_detections, map_to_original};

const ROWS: [f32; 12] = [
    0.0, 0.0, 10.0, 10.0, 0.9, 1.0, //
    0.0, 0.0, 5.0, 5.0, 0.1, 2.0,
];

#[test]
fn test_threshold_filters_low_scores() {
    let boxes = decode_detections(&ROWS, 6, 0.5).unwrap();

    assert_eq!(boxes.len(), 1);
    assert_eq!(boxes[0].class_id(), 1);
    assert_eq!(boxes[0].score(), 0.9);
}

#[test]
fn test_low_threshold_keeps_model_order() {
    let boxes = decode_detections(&ROWS, 6, 0.05).unwrap();

    let classes: Vec<_> = boxes.iter().map(|b| b.class_id()).collect();
    assert_eq!(classes, vec![1, 2]);
}

#[test]
fn test_letterbox_inverse_restores_full_frame() {
    let letterbox = Letterbox::new(1000, 500, 640).unwrap();
    let boxes = decode_detections(&[0.0, 160.0, 640.0, 480.0, 0.8, 0.0], 6, 0.25).unwrap();

    let mapped = map_to_original(&boxes, &letterbox);

    let b = mapped[0];
    assert!(b.x1().abs() < 1e-3);
    assert!(b.y1().abs() < 1e-3);
    assert!((b.x2() - 1000.0).abs() < 1e-2);
    assert!((b.y2() - 500.0).abs() < 1e-2);
    assert_eq!(b.score(), 0.8);
}

#[test]
fn test_boxes_in_padding_are_clamped() {
    let letterbox = Letterbox::new(1000, 500, 640).unwrap();
    let boxes = decode_detections(&[-20.0, 0.0, 700.0, 100.0, 0.8, 0.0], 6, 0.25).unwrap();

    let b = map_to_original(&boxes, &letterbox)[0];

    assert_eq!(b.x1(), 0.0);
    assert_eq!(b.y1(), 0.0);
    assert_eq!(b.x2(), 1000.0);
    assert_eq!(b.y2(), 0.0);
    assert_eq!(b.height(), 0.0);
}

#[test]
fn test_forward_then_inverse_round_trips_points() {
    let letterbox = Letterbox::new(300, 600, 640).unwrap();
    let (pad_x, pad_y) = letterbox.padding();

    for &(x, y) in &[(0.0f32, 0.0f32), (150.0, 300.0), (300.0, 600.0), (17.0, 431.0)] {
        let canvas_x = x * letterbox.scale_x() + pad_x as f32;
        let canvas_y = y * letterbox.scale_y() + pad_y as f32;
        assert!((letterbox.unmap_x(canvas_x) - x).abs() < 1e-3);
        assert!((letterbox.unmap_y(canvas_y) - y).abs() < 1e-3);
    }
}
