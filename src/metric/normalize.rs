//! Normalization.

pub use super::*;

/// The configuration for [`MinMaxNorm`].
#[derive(Config, Copy, Debug)]
pub struct MinMaxNormConfig {
    /// Maximum value.
    #[config(default = 1.0)]
    pub range_max: f32,
    /// Minimum value.
    #[config(default = 0.0)]
    pub range_min: f32,
}

/// Stretching all values of a tensor onto `[range_min, range_max]`.
///
/// A constant input maps to `range_min`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MinMaxNorm {
    /// `range_max - range_min`
    pub scale: f32,
    /// `range_min`
    pub shift: f32,
}

impl MinMaxNormConfig {
    /// Initialize from the configuration.
    pub fn init(&self) -> MinMaxNorm {
        MinMaxNorm {
            scale: self.range_max - self.range_min,
            shift: self.range_min,
        }
    }
}

impl MinMaxNorm {
    pub fn forward<B: Backend, const D: usize>(
        &self,
        input: Tensor<B, D>,
    ) -> Tensor<B, D> {
        let shape = input.shape();
        let input = input.flatten::<1>(0, D - 1);
        let input_min = input.to_owned().min();
        let input_span = input.to_owned().max() - input_min.to_owned() + f32::EPSILON;
        let factor = input_span.recip().mul_scalar(self.scale);

        (input - input_min)
            .mul(factor)
            .add_scalar(self.shift)
            .reshape(shape)
    }
}

impl Default for MinMaxNormConfig {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
