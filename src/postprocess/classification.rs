//! Logits to class probabilities.

use crate::error::{Error, Result};
use serde::Serialize;
use std::cmp::Ordering;

/// A class index with its probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    /// Index into the model's class list.
    pub index: usize,
    /// Softmax probability in `[0, 1]`.
    pub confidence: f32,
}

/// Numerically stable softmax.
///
/// The maximum logit is subtracted before exponentiating, so large logits do
/// not overflow.
pub fn softmax(logits: &[f32]) -> Result<Vec<f32>> {
    if logits.is_empty() {
        return Err(Error::EmptyOutput);
    }
    if let Some(bad) = logits.iter().find(|v| !v.is_finite()) {
        return Err(Error::MalformedOutput {
            message: format!("logits contain non-finite value {bad}"),
        });
    }

    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    Ok(exps.into_iter().map(|e| e / sum).collect())
}

/// Most probable class. Ties go to the lowest index.
pub fn classify(logits: &[f32]) -> Result<Prediction> {
    let probs = softmax(logits)?;
    let mut best = Prediction {
        index: 0,
        confidence: probs[0],
    };
    for (index, &confidence) in probs.iter().enumerate().skip(1) {
        if confidence > best.confidence {
            best = Prediction { index, confidence };
        }
    }
    Ok(best)
}

/// The `k` most probable classes, best first. Ties keep index order.
pub fn top_k(logits: &[f32], k: usize) -> Result<Vec<Prediction>> {
    let probs = softmax(logits)?;
    let mut ranked: Vec<Prediction> = probs
        .into_iter()
        .enumerate()
        .map(|(index, confidence)| Prediction { index, confidence })
        .collect();
    ranked.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });
    ranked.truncate(k);
    Ok(ranked)
}
