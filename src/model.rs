// EnvSynth - Environmental value synthesis
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Predictive model adapter.
//!
//! The model itself is opaque: a fixed-shape tensor goes in, a mean field and
//! an uncertainty field come out. The adapter validates the shape contract
//! once at construction and reduces each output to two scalars.
//!
//! [`SurrogateModel`] is a small deterministic model honouring the same
//! contract, loadable from a JSON weight file.

use crate::error::{ConstructionError, InferenceError};
use crate::tensor::{PATCH_SIZE, SEQUENCE_LEN};
use log::{debug, info};
use ndarray::{s, Array2, Array4, Array5, ArrayView5, Axis};
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Model input shape: `[batch, frames, height, width, channels]`
pub const MODEL_INPUT_SHAPE: [usize; 5] = [1, SEQUENCE_LEN, PATCH_SIZE, PATCH_SIZE, 1];

/// Model output shape: `[batch, height, width, (mean, uncertainty)]`
pub const MODEL_OUTPUT_SHAPE: [usize; 4] = [1, PATCH_SIZE, PATCH_SIZE, 2];

/// Guards the activity normalization against constant mean fields
pub const ACTIVITY_EPSILON: f64 = 1e-7;

/// An opaque predictive model.
pub trait PredictiveModel: Send + Sync {
    /// Run the model on a `[1, 3, 128, 128, 1]` tensor.
    fn predict(&self, input: ArrayView5<'_, f32>) -> Result<Array4<f32>, InferenceError>;

    /// Name used in logs
    fn name(&self) -> &str {
        "model"
    }
}

/// Scalars extracted from one model output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inference {
    /// `(mean - min) / (max - min + eps)` over the mean field, in [0, 1]
    pub normalized_activity: f64,
    /// Mean of the uncertainty field
    pub uncertainty: f64,
}

/// Reduce a `[1, 128, 128, 2]` model output to activity and uncertainty.
pub fn summarize(output: &Array4<f32>) -> Result<Inference, InferenceError> {
    if output.shape() != MODEL_OUTPUT_SHAPE {
        return Err(InferenceError::ShapeMismatch {
            expected: MODEL_OUTPUT_SHAPE.to_vec(),
            actual: output.shape().to_vec(),
        });
    }

    let mean_field = output.index_axis(Axis(3), 0);
    let uncertainty_field = output.index_axis(Axis(3), 1);

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    for &v in mean_field.iter() {
        let v = v as f64;
        if !v.is_finite() {
            return Err(InferenceError::NonFinite);
        }
        min = min.min(v);
        max = max.max(v);
        sum += v;
    }
    let mean = sum / mean_field.len() as f64;

    let mut uncertainty_sum = 0.0;
    for &v in uncertainty_field.iter() {
        if !v.is_finite() {
            return Err(InferenceError::NonFinite);
        }
        uncertainty_sum += v as f64;
    }

    let normalized_activity = ((mean - min) / (max - min + ACTIVITY_EPSILON)).clamp(0.0, 1.0);
    let uncertainty = (uncertainty_sum / uncertainty_field.len() as f64).max(0.0);

    Ok(Inference {
        normalized_activity,
        uncertainty,
    })
}

/// Validated wrapper around a predictive model.
pub struct ModelAdapter {
    model: Box<dyn PredictiveModel>,
}

impl std::fmt::Debug for ModelAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelAdapter")
            .field("model", &self.model.name())
            .finish()
    }
}

impl ModelAdapter {
    /// Wrap a model after a self-test on entropy-seeded random input.
    pub fn new(model: Box<dyn PredictiveModel>) -> Result<Self, ConstructionError> {
        Self::with_self_test_seed(model, None)
    }

    /// Wrap a model, seeding the self-test input when `seed` is given.
    pub fn with_self_test_seed(
        model: Box<dyn PredictiveModel>,
        seed: Option<u64>,
    ) -> Result<Self, ConstructionError> {
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let probe = Array5::from_shape_fn(MODEL_INPUT_SHAPE, |_| rng.gen::<f32>());

        let output = model
            .predict(probe.view())
            .map_err(|e| ConstructionError::SelfTest(e.to_string()))?;
        if output.shape() != MODEL_OUTPUT_SHAPE {
            return Err(ConstructionError::ShapeMismatch {
                expected: MODEL_OUTPUT_SHAPE.to_vec(),
                actual: output.shape().to_vec(),
            });
        }

        info!("model '{}' passed self-test", model.name());
        Ok(Self { model })
    }

    /// Run the model on a `[3, 128, 128, 1]` sequence.
    pub fn infer(&self, sequence: &Array4<f32>) -> Result<Inference, InferenceError> {
        let batch = sequence.view().insert_axis(Axis(0));
        if batch.shape() != MODEL_INPUT_SHAPE {
            return Err(InferenceError::ShapeMismatch {
                expected: MODEL_INPUT_SHAPE.to_vec(),
                actual: batch.shape().to_vec(),
            });
        }
        let output = self.model.predict(batch)?;
        let inference = summarize(&output)?;
        debug!(
            "inference: activity={:.4} uncertainty={:.4}",
            inference.normalized_activity, inference.uncertainty
        );
        Ok(inference)
    }

    /// Name of the wrapped model
    pub fn model_name(&self) -> &str {
        self.model.name()
    }
}

/// Deterministic stand-in for a trained model.
///
/// The mean field is a box-blurred weighted sum of the input frames; the
/// uncertainty field grows with the change between the first and last frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurrogateModel {
    /// Per-frame weights, oldest first
    pub frame_weights: [f32; SEQUENCE_LEN],
    /// Added to every mean-field pixel
    #[serde(default)]
    pub bias: f32,
    /// Half-width of the box blur (0 = none)
    #[serde(default)]
    pub blur_radius: usize,
    /// Scale of the frame-change term
    pub uncertainty_gain: f32,
    /// Minimum uncertainty per pixel
    #[serde(default)]
    pub uncertainty_floor: f32,
}

impl Default for SurrogateModel {
    fn default() -> Self {
        Self {
            frame_weights: [0.2, 0.3, 0.5],
            bias: 0.0,
            blur_radius: 2,
            uncertainty_gain: 1.0,
            uncertainty_floor: 0.01,
        }
    }
}

impl SurrogateModel {
    /// Load weights from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConstructionError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConstructionError::ModelNotFound {
                path: path.to_path_buf(),
            });
        }
        let text = fs::read_to_string(path).map_err(|e| ConstructionError::ModelUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| ConstructionError::ModelUnreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    fn blur(&self, field: &Array2<f32>) -> Array2<f32> {
        let r = self.blur_radius;
        if r == 0 {
            return field.clone();
        }
        let (h, w) = field.dim();
        Array2::from_shape_fn((h, w), |(i, j)| {
            let window = field.slice(s![
                i.saturating_sub(r)..(i + r + 1).min(h),
                j.saturating_sub(r)..(j + r + 1).min(w)
            ]);
            window.sum() / window.len() as f32
        })
    }
}

impl PredictiveModel for SurrogateModel {
    fn predict(&self, input: ArrayView5<'_, f32>) -> Result<Array4<f32>, InferenceError> {
        if input.shape() != MODEL_INPUT_SHAPE {
            return Err(InferenceError::ModelFailed(format!(
                "expected input shape {:?}, got {:?}",
                MODEL_INPUT_SHAPE,
                input.shape()
            )));
        }

        let frames = input.index_axis(Axis(0), 0).index_axis_move(Axis(3), 0);
        let mut combined = Array2::from_elem((PATCH_SIZE, PATCH_SIZE), self.bias);
        for (t, weight) in self.frame_weights.iter().enumerate() {
            combined.scaled_add(*weight, &frames.index_axis(Axis(0), t));
        }
        let mean_field = self.blur(&combined);

        let first = frames.index_axis(Axis(0), 0);
        let last = frames.index_axis(Axis(0), SEQUENCE_LEN - 1);

        let mut output = Array4::zeros(MODEL_OUTPUT_SHAPE);
        for i in 0..PATCH_SIZE {
            for j in 0..PATCH_SIZE {
                output[[0, i, j, 0]] = mean_field[[i, j]];
                output[[0, i, j, 1]] = self.uncertainty_floor
                    + self.uncertainty_gain * (last[[i, j]] - first[[i, j]]).abs();
            }
        }
        Ok(output)
    }

    fn name(&self) -> &str {
        "surrogate"
    }
}
