//! Spatially constant radiance field.

pub use super::*;

/// A field returning the same density and color at every sample.
///
/// It has a closed-form volume rendering integral, which makes it useful for
/// calibrating the renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ConstantField {
    /// `σ`
    pub density: f32,
    pub color_rgb: [f32; 3],
    pub transient: Option<ConstantTransient>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ConstantTransient {
    /// `σ_t`
    pub density: f32,
    pub color_rgb: [f32; 3],
    pub flow: Option<[f32; 3]>,
}

impl ConstantField {
    #[inline]
    pub const fn new(
        density: f32,
        color_rgb: [f32; 3],
    ) -> Self {
        Self {
            density,
            color_rgb,
            transient: None,
        }
    }

    #[inline]
    pub const fn with_transient(
        mut self,
        transient: ConstantTransient,
    ) -> Self {
        self.transient = Some(transient);
        self
    }
}

impl<B: Backend> RadianceField<B> for ConstantField {
    fn query(
        &self,
        input: FieldInput<B>,
        device: &B::Device,
    ) -> FieldOutput<B> {
        let sample_count = input.sample_count();
        let rows = |values: [f32; 3]| {
            Tensor::<B, 2>::from_data([values], device).repeat_dim(0, sample_count)
        };

        let transient = self.transient.map(|transient| TransientFieldOutput {
            densities: Tensor::full([sample_count, 1], transient.density, device),
            colors_rgb: rows(transient.color_rgb),
            flows: transient.flow.map(rows),
        });

        FieldOutput {
            densities: Tensor::full([sample_count, 1], self.density, device),
            colors_rgb: rows(self.color_rgb),
            transient,
        }
    }
}
