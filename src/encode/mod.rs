//! Positional encoding.

pub use crate::error::Error;
pub use burn::{
    config::Config,
    module::Module,
    tensor::{backend::Backend, Tensor},
};

/// The configuration for [`PositionalEncoder`].
#[derive(Config, Copy, Debug)]
pub struct PositionalEncoderConfig {
    /// Frequency count, `L`.
    pub frequency_count: usize,
    /// Retaining the raw input before the frequency bands.
    #[config(default = true)]
    pub include_input: bool,
}

/// Expand coordinates into sinusoidal frequency bands.
///
/// `[x, sin(2^0 x), cos(2^0 x), ..., sin(2^(L-1) x), cos(2^(L-1) x)]`
#[derive(Clone, Debug, Module)]
pub struct PositionalEncoder {
    /// `L`
    pub frequency_count: usize,
    /// Whether `x` leads the output.
    pub include_input: bool,
}

impl PositionalEncoderConfig {
    /// Initialize from the configuration.
    pub fn init(&self) -> Result<PositionalEncoder, Error> {
        if self.frequency_count == 0 && !self.include_input {
            return Err(Error::Validation(
                "PositionalEncoderConfig::frequency_count".into(),
                "positive when the input is not included".into(),
            ));
        }

        Ok(PositionalEncoder {
            frequency_count: self.frequency_count,
            include_input: self.include_input,
        })
    }
}

impl PositionalEncoder {
    /// The output dimension for an input of dimension `dim_input`.
    ///
    /// `D * (2L + 1)` with the raw input, otherwise `D * 2L`.
    #[inline]
    pub const fn dim_output(
        &self,
        dim_input: usize,
    ) -> usize {
        let dim_bands = dim_input * self.frequency_count * 2;
        if self.include_input {
            dim_bands + dim_input
        } else {
            dim_bands
        }
    }

    /// Encode the last dimension of the input tensor.
    ///
    /// ## Shapes
    ///
    /// * `input` - `[..., D]`
    /// * `output` - [`[..., dim_output(D)]`](Self::dim_output)
    pub fn forward<B: Backend, const D: usize>(
        &self,
        input: Tensor<B, D>,
    ) -> Tensor<B, D> {
        let dim_last = D - 1;
        let mut bands = Vec::with_capacity(self.frequency_count * 2 + 1);

        if self.include_input {
            bands.push(input.to_owned());
        }
        for frequency in 0..self.frequency_count {
            let scaled = input.to_owned().mul_scalar(2.0_f32.powi(frequency as i32));
            bands.push(scaled.to_owned().sin());
            bands.push(scaled.cos());
        }

        Tensor::cat(bands, dim_last)
    }
}
