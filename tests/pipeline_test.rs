//! End-to-end classification and detection through the shared context.

#![allow(clippy::unwrap_used, clippy::float_cmp)]

mod common;

use birdlens::Error;
use birdlens::cache::StaticAsset;
use birdlens::config::Config;
use birdlens::inference::{ExecutionProvider, ModelKind, SessionStatus};
use birdlens::pipeline::InferenceContext;
use common::{FakeFactory, classifier, detector, write_png};
use std::sync::Arc;
use tempfile::TempDir;

fn config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.cache.dir = Some(dir.path().join("cache"));
    config.inference.providers = Some(vec![ExecutionProvider::Cpu]);
    config.classification.cache_key = "cls.onnx".to_string();
    config.detection.cache_key = "det.onnx".to_string();
    config
}

fn context(dir: &TempDir, factory: FakeFactory) -> InferenceContext {
    InferenceContext::with_assets(
        &config(dir),
        Arc::new(factory),
        Arc::new(StaticAsset::new("cls", b"classifier")),
        Arc::new(StaticAsset::new("det", b"detector")),
    )
    .unwrap()
}

fn detection_rows() -> Vec<f32> {
    vec![
        0.0, 160.0, 640.0, 480.0, 0.9, 0.0, //
        100.0, 200.0, 200.0, 300.0, 0.1, 0.0,
    ]
}

#[tokio::test]
async fn test_classify_before_initialize_is_not_ready() {
    let dir = TempDir::new().unwrap();
    let image = write_png(dir.path(), "bird.png", 32, 32, [10, 20, 30, 255]);
    let ctx = context(&dir, FakeFactory::new());

    let err = ctx.classify_image(&image).await.unwrap_err();

    assert!(matches!(
        err,
        Error::SessionNotReady {
            model: ModelKind::Classification
        }
    ));
}

#[tokio::test]
async fn test_classify_returns_best_class() {
    let dir = TempDir::new().unwrap();
    let image = write_png(dir.path(), "bird.png", 400, 300, [120, 90, 60, 255]);
    let factory = FakeFactory::new()
        .with_model("cls.onnx", classifier(vec![0.5, 4.0, 1.0, -2.0]))
        .with_model("det.onnx", detector(detection_rows()));
    let counters = Arc::clone(&factory.counters);
    let ctx = context(&dir, factory);
    assert!(ctx.initialize().await.all_ready());

    let result = ctx.classify_image(&image).await.unwrap();

    assert_eq!(result.index, 1);
    assert!(result.confidence > 0.9 && result.confidence <= 1.0);
    let ranked: Vec<_> = result.top.iter().map(|p| p.index).collect();
    assert_eq!(ranked, vec![1, 2, 0, 3]);
    assert_eq!(
        counters.seen_shapes.lock().unwrap().as_slice(),
        &[vec![1, 224, 224, 3]]
    );
}

#[tokio::test]
async fn test_detect_maps_boxes_to_original_image() {
    let dir = TempDir::new().unwrap();
    let image = write_png(dir.path(), "wide.png", 1000, 500, [200, 200, 200, 255]);
    let factory = FakeFactory::new()
        .with_model("cls.onnx", classifier(vec![0.0, 1.0]))
        .with_model("det.onnx", detector(detection_rows()));
    let counters = Arc::clone(&factory.counters);
    let ctx = context(&dir, factory);
    ctx.initialize().await;

    let result = ctx.detect_birds(&image, None).await.unwrap();

    assert_eq!((result.original_width, result.original_height), (1000, 500));
    assert_eq!(result.boxes.len(), 1);
    let b = result.boxes[0];
    assert!(b.x1().abs() < 1e-3 && b.y1().abs() < 1e-3);
    assert!((b.x2() - 1000.0).abs() < 1e-2);
    assert!((b.y2() - 500.0).abs() < 1e-2);
    assert_eq!(b.score(), 0.9);
    assert_eq!(b.class_id(), 0);
    assert_eq!(
        counters.seen_shapes.lock().unwrap().as_slice(),
        &[vec![1, 640, 640, 3]]
    );
}

#[tokio::test]
async fn test_detect_threshold_override() {
    let dir = TempDir::new().unwrap();
    let image = write_png(dir.path(), "wide.png", 1000, 500, [0, 0, 0, 255]);
    let factory = FakeFactory::new()
        .with_model("cls.onnx", classifier(vec![0.0]))
        .with_model("det.onnx", detector(detection_rows()));
    let ctx = context(&dir, factory);
    ctx.initialize().await;

    let result = ctx.detect_birds(&image, Some(0.05)).await.unwrap();

    assert_eq!(result.boxes.len(), 2);
    assert_eq!(result.boxes[0].score(), 0.9);
    assert_eq!(result.boxes[1].score(), 0.1);
}

#[tokio::test]
async fn test_missing_image_leaves_session_ready() {
    let dir = TempDir::new().unwrap();
    let factory = FakeFactory::new()
        .with_model("cls.onnx", classifier(vec![0.0, 1.0]))
        .with_model("det.onnx", detector(detection_rows()));
    let counters = Arc::clone(&factory.counters);
    let ctx = context(&dir, factory);
    ctx.initialize().await;

    let missing = dir.path().join("nope.jpg");
    let err = ctx
        .detect_birds(&missing.to_string_lossy(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::SourceNotFound { .. }));
    assert_eq!(counters.runs.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert!(matches!(
        ctx.sessions().status(ModelKind::Detection),
        SessionStatus::Ready { .. }
    ));
}

#[tokio::test]
async fn test_file_uri_is_accepted() {
    let dir = TempDir::new().unwrap();
    let path = write_png(dir.path(), "bird.png", 64, 64, [1, 2, 3, 255]);
    let uri = url::Url::from_file_path(&path).unwrap().to_string();
    let factory = FakeFactory::new()
        .with_model("cls.onnx", classifier(vec![2.0, 0.0]))
        .with_model("det.onnx", detector(Vec::new()));
    let ctx = context(&dir, factory);
    ctx.initialize().await;

    assert_eq!(ctx.classify_image(&uri).await.unwrap().index, 0);
    assert!(ctx.detect_birds(&uri, None).await.unwrap().boxes.is_empty());
}

#[tokio::test]
async fn test_one_model_failing_does_not_block_the_other() {
    let dir = TempDir::new().unwrap();
    let factory = FakeFactory::new().with_model("det.onnx", detector(detection_rows()));
    let ctx = context(&dir, factory);

    let readiness = ctx.initialize().await;

    assert!(!readiness.all_ready());
    assert!(matches!(
        readiness.classification,
        Err(Error::SessionInitFailed { .. })
    ));
    assert_eq!(readiness.detection.unwrap(), ExecutionProvider::Cpu);
    assert!(matches!(
        ctx.sessions().status(ModelKind::Classification),
        SessionStatus::Failed { .. }
    ));
}

#[tokio::test]
async fn test_newer_request_supersedes_older() {
    let dir = TempDir::new().unwrap();
    let image = write_png(dir.path(), "bird.png", 50, 50, [9, 9, 9, 255]);
    let factory = FakeFactory::new()
        .with_model("cls.onnx", classifier(vec![0.0, 1.0]))
        .with_model("det.onnx", detector(Vec::new()));
    let ctx = context(&dir, factory);
    ctx.initialize().await;

    let first = ctx.classify_image(&image).await.unwrap();
    let second = ctx.classify_image(&image).await.unwrap();

    assert!(second.request_id > first.request_id);
    assert!(!ctx.is_latest(ModelKind::Classification, first.request_id));
    assert!(ctx.is_latest(ModelKind::Classification, second.request_id));
}
