//! Declared model I/O contracts and their validation.

use super::{ModelKind, TensorSpec};
use crate::error::{Error, Result};
use crate::tensor::Tensor;
use tracing::debug;

/// Shapes the pipeline expects a model to consume and produce.
///
/// `-1` is a wildcard on either side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredContract {
    /// Expected input dims, e.g. `[1, 224, 224, 3]`.
    pub input_dims: Vec<i64>,
    /// Expected output dims, e.g. `[1, -1]`.
    pub output_dims: Vec<i64>,
}

/// A contract confirmed against a loaded session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedContract {
    model: ModelKind,
    input_name: String,
    output_name: String,
    declared: DeclaredContract,
}

fn dims_compatible(expected: &[i64], actual: &[i64]) -> bool {
    expected.len() == actual.len()
        && expected
            .iter()
            .zip(actual)
            .all(|(&e, &a)| e < 0 || a < 0 || e == a)
}

fn usize_dims(shape: &[usize]) -> Vec<i64> {
    shape
        .iter()
        .map(|&d| i64::try_from(d).unwrap_or(i64::MAX))
        .collect()
}

impl DeclaredContract {
    /// Check a session's declared I/O against this contract.
    ///
    /// The model must have exactly one input. When it has several outputs
    /// the first one is used.
    pub fn validate(
        &self,
        model: ModelKind,
        inputs: &[TensorSpec],
        outputs: &[TensorSpec],
    ) -> Result<ValidatedContract> {
        let mismatch = |message: String| Error::ContractMismatch { model, message };

        let [input] = inputs else {
            return Err(mismatch(format!(
                "expected exactly one input, model has {}",
                inputs.len()
            )));
        };
        let Some(output) = outputs.first() else {
            return Err(mismatch("model has no outputs".to_string()));
        };
        if outputs.len() > 1 {
            debug!(
                "{} model has {} outputs, using '{}'",
                model,
                outputs.len(),
                output.name
            );
        }

        if !dims_compatible(&self.input_dims, &input.dims) {
            return Err(mismatch(format!(
                "input '{}' has dims {:?}, expected {:?}",
                input.name, input.dims, self.input_dims
            )));
        }
        if !dims_compatible(&self.output_dims, &output.dims) {
            return Err(mismatch(format!(
                "output '{}' has dims {:?}, expected {:?}",
                output.name, output.dims, self.output_dims
            )));
        }

        Ok(ValidatedContract {
            model,
            input_name: input.name.clone(),
            output_name: output.name.clone(),
            declared: self.clone(),
        })
    }
}

impl ValidatedContract {
    /// Graph input name.
    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    /// Graph output name.
    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    /// Reject an input tensor the model would not accept.
    pub fn check_input(&self, tensor: &Tensor) -> Result<()> {
        let dims = usize_dims(tensor.shape());
        if dims_compatible(&self.declared.input_dims, &dims) {
            Ok(())
        } else {
            Err(Error::InvalidTensor {
                message: format!(
                    "{} input has shape {:?}, expected {:?}",
                    self.model, dims, self.declared.input_dims
                ),
            })
        }
    }

    /// Reject an output tensor that does not match the declared shape.
    pub fn check_output(&self, tensor: &Tensor) -> Result<()> {
        let dims = usize_dims(tensor.shape());
        if dims_compatible(&self.declared.output_dims, &dims) {
            Ok(())
        } else {
            Err(Error::MalformedOutput {
                message: format!(
                    "{} output has shape {:?}, expected {:?}",
                    self.model, dims, self.declared.output_dims
                ),
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn detection_contract() -> DeclaredContract {
        DeclaredContract {
            input_dims: vec![1, 640, 640, 3],
            output_dims: vec![1, -1, 6],
        }
    }

    #[test]
    fn test_dynamic_axes_match_anything() {
        let contract = detection_contract();
        let validated = contract
            .validate(
                ModelKind::Detection,
                &[TensorSpec::new("images", [-1, 640, 640, 3])],
                &[TensorSpec::new("output0", [1, 300, 6])],
            )
            .unwrap();
        assert_eq!(validated.input_name(), "images");
        assert_eq!(validated.output_name(), "output0");
    }

    #[test]
    fn test_wrong_layout_is_a_mismatch() {
        let result = detection_contract().validate(
            ModelKind::Detection,
            &[TensorSpec::new("images", [1, 3, 640, 640])],
            &[TensorSpec::new("output0", [1, 300, 6])],
        );
        assert!(matches!(result, Err(Error::ContractMismatch { .. })));
    }

    #[test]
    fn test_two_inputs_rejected() {
        let result = detection_contract().validate(
            ModelKind::Detection,
            &[
                TensorSpec::new("a", [1, 640, 640, 3]),
                TensorSpec::new("b", [1]),
            ],
            &[TensorSpec::new("output0", [1, 300, 6])],
        );
        assert!(matches!(result, Err(Error::ContractMismatch { .. })));
    }

    #[test]
    fn test_first_output_is_used() {
        let validated = DeclaredContract {
            input_dims: vec![1, 3, 224, 224],
            output_dims: vec![1, -1],
        }
        .validate(
            ModelKind::Classification,
            &[TensorSpec::new("pixel_values", [1, 3, 224, 224])],
            &[
                TensorSpec::new("logits", [1, 1486]),
                TensorSpec::new("hidden", [1, 768]),
            ],
        )
        .unwrap();
        assert_eq!(validated.output_name(), "logits");
    }

    #[test]
    fn test_check_output_shape() {
        let validated = detection_contract()
            .validate(
                ModelKind::Detection,
                &[TensorSpec::new("images", [1, 640, 640, 3])],
                &[TensorSpec::new("output0", [1, 300, 6])],
            )
            .unwrap();
        let good = Tensor::new(vec![1, 2, 6], vec![0.0; 12]).unwrap();
        let bad = Tensor::new(vec![1, 2, 7], vec![0.0; 14]).unwrap();
        assert!(validated.check_output(&good).is_ok());
        assert!(matches!(
            validated.check_output(&bad),
            Err(Error::MalformedOutput { .. })
        ));
    }
}
