//! Radiance field query interface.

pub mod constant;
pub mod latent;

pub use crate::error::Error;
pub use burn::tensor::{backend::Backend, Int, Tensor};
pub use constant::*;
pub use latent::*;

use std::fmt;

/// A learned function from encoded samples to density and color.
///
/// The field is treated as opaque. It is queried with a flattened batch of
/// `N` samples and must return one row per sample.
pub trait RadianceField<B: Backend> {
    fn query(
        &self,
        input: FieldInput<B>,
        device: &B::Device,
    ) -> FieldOutput<B>;
}

/// The training stage a field belongs to.
///
/// The coarse variant never receives appearance latents.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum FieldVariant {
    #[default]
    Coarse,
    Fine,
}

#[derive(Clone, Debug)]
pub struct FieldInput<B: Backend> {
    pub variant: FieldVariant,
    /// `[N, D_p]`
    pub positions_encoded: Tensor<B, 2>,
    /// `[N, D_d]`
    pub directions_encoded: Tensor<B, 2>,
    /// `[N, N_a]`
    pub appearance_latents: Option<Tensor<B, 2>>,
    /// `[N, N_t]`
    pub transient_latents: Option<Tensor<B, 2>>,
}

#[derive(Clone, Debug)]
pub struct FieldOutput<B: Backend> {
    /// `[N, 1]`
    pub densities: Tensor<B, 2>,
    /// `[N, 3]`
    pub colors_rgb: Tensor<B, 2>,
    pub transient: Option<TransientFieldOutput<B>>,
}

#[derive(Clone, Debug)]
pub struct TransientFieldOutput<B: Backend> {
    /// `[N, 1]`
    pub densities: Tensor<B, 2>,
    /// `[N, 3]`
    pub colors_rgb: Tensor<B, 2>,
    /// `[N, 3]`
    pub flows: Option<Tensor<B, 2>>,
}

/// The fine field and the optional coarse field.
///
/// The coarse field is required only when importance samples are drawn.
/// Otherwise the fine field alone renders the stratified samples.
#[derive(Clone)]
pub struct RadianceFields<F> {
    pub coarse: Option<F>,
    pub fine: F,
}

impl<B: Backend> FieldInput<B> {
    /// `N`
    #[inline]
    pub fn sample_count(&self) -> usize {
        self.positions_encoded.dims()[0]
    }
}

impl<B: Backend> FieldOutput<B> {
    /// Checking that every output has `sample_count` rows and the expected width.
    pub fn validate(
        &self,
        sample_count: usize,
    ) -> Result<(), Error> {
        let check = |name: &str, dims: [usize; 2], width: usize| {
            if dims[0] != sample_count {
                return Err(Error::MismatchedShape(name.into(), sample_count, dims[0]));
            }
            if dims[1] != width {
                return Err(Error::Validation(
                    format!("{name}.dims()[1]"),
                    width.to_string(),
                ));
            }
            Ok(())
        };

        check("FieldOutput::densities", self.densities.dims(), 1)?;
        check("FieldOutput::colors_rgb", self.colors_rgb.dims(), 3)?;
        if let Some(transient) = &self.transient {
            check("TransientFieldOutput::densities", transient.densities.dims(), 1)?;
            check(
                "TransientFieldOutput::colors_rgb",
                transient.colors_rgb.dims(),
                3,
            )?;
            if let Some(flows) = &transient.flows {
                check("TransientFieldOutput::flows", flows.dims(), 3)?;
            }
        }

        Ok(())
    }
}

impl<F> RadianceFields<F> {
    #[inline]
    pub const fn new(
        coarse: F,
        fine: F,
    ) -> Self {
        Self {
            coarse: Some(coarse),
            fine,
        }
    }

    /// Only the fine field, suitable when no importance samples are drawn.
    #[inline]
    pub const fn single(field: F) -> Self {
        Self {
            coarse: None,
            fine: field,
        }
    }

    #[inline]
    pub fn get(
        &self,
        variant: FieldVariant,
    ) -> Option<&F> {
        match variant {
            FieldVariant::Coarse => self.coarse.as_ref(),
            FieldVariant::Fine => Some(&self.fine),
        }
    }
}

impl<B: Backend, F: RadianceField<B> + ?Sized> RadianceField<B> for Box<F> {
    #[inline]
    fn query(
        &self,
        input: FieldInput<B>,
        device: &B::Device,
    ) -> FieldOutput<B> {
        (**self).query(input, device)
    }
}

impl<B: Backend, F: RadianceField<B> + ?Sized> RadianceField<B> for &F {
    #[inline]
    fn query(
        &self,
        input: FieldInput<B>,
        device: &B::Device,
    ) -> FieldOutput<B> {
        (**self).query(input, device)
    }
}

impl<F> fmt::Debug for RadianceFields<F> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("RadianceFields")
            .field("coarse.is_some()", &self.coarse.is_some())
            .field("fine", &std::any::type_name::<F>())
            .finish()
    }
}
