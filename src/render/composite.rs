//! Volumetric compositing with the emission-absorption model.

pub use super::*;

use crate::{
    function::tensor_extensions::TensorFloatExtension,
    preset::render::INTERVAL_SENTINEL,
};

/// How the distance between samples is measured.
#[derive(Config, Copy, Debug, Eq, PartialEq)]
pub enum IntervalMode {
    /// `δ_i = t_(i+1) - t_i`, and the last interval is a large sentinel.
    Open,
    /// The intervals partition `[near, far]` at the midpoints between samples.
    Bounded,
}

/// Field outputs reshaped per ray, ready to be composited.
#[derive(Clone, Debug)]
pub struct SampledRays<B: Backend> {
    /// `[R, S]`, sorted along each row
    pub depths: Tensor<B, 2>,
    /// `[R, S]`
    pub densities: Tensor<B, 2>,
    /// `[R, S, 3]`
    pub colors_rgb: Tensor<B, 3>,
    pub transient: Option<SampledTransient<B>>,
}

#[derive(Clone, Debug)]
pub struct SampledTransient<B: Backend> {
    /// `[R, S]`
    pub densities: Tensor<B, 2>,
    /// `[R, S, 3]`
    pub colors_rgb: Tensor<B, 3>,
    /// `[R, S, 3]`
    pub flows: Option<Tensor<B, 3>>,
}

#[derive(Clone, Debug)]
pub struct Composite<B: Backend> {
    /// `[R, 3]`
    pub colors_rgb: Tensor<B, 2>,
    /// `[R, 1]`
    pub depths: Tensor<B, 2>,
    /// `[R, 1]`
    pub opacities: Tensor<B, 2>,
    /// `[R, S]`
    pub weights: Tensor<B, 2>,
    pub decomposition: Option<Decomposition<B>>,
}

/// Static-only and transient-only renderings, each with its own transmittance.
#[derive(Clone, Debug)]
pub struct Decomposition<B: Backend> {
    /// `[R, 3]`
    pub colors_rgb_static: Tensor<B, 2>,
    /// `[R, 1]`
    pub depths_static: Tensor<B, 2>,
    /// `[R, 3]`
    pub colors_rgb_transient: Tensor<B, 2>,
    /// `[R, 1]`
    pub depths_transient: Tensor<B, 2>,
    /// `[R, 3]`
    pub flows: Option<Tensor<B, 2>>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VolumetricCompositor {
    pub interval_mode: IntervalMode,
    /// The last interval in [`IntervalMode::Open`].
    pub interval_sentinel: f32,
    /// Combining the transient field with the static one.
    pub output_transient: bool,
    /// Filling the unoccupied opacity with white.
    pub white_background: bool,
}

impl VolumetricCompositor {
    pub fn from_options(options: &RenderOptions) -> Self {
        Self {
            interval_mode: options.interval_mode,
            interval_sentinel: INTERVAL_SENTINEL,
            output_transient: options.output_transient,
            white_background: options.white_background,
        }
    }

    /// ## Shapes
    ///
    /// * `depths` - `[R, S]`
    /// * `nears` - `[R, 1]`
    /// * `fars` - `[R, 1]`
    /// * `output` - `[R, S]`
    pub fn intervals<B: Backend>(
        &self,
        depths: Tensor<B, 2>,
        nears: Tensor<B, 2>,
        fars: Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        let [ray_count, sample_count] = depths.dims();
        let device = depths.device();

        match self.interval_mode {
            IntervalMode::Open => {
                let last = Tensor::full([ray_count, 1], self.interval_sentinel, &device);
                if sample_count == 1 {
                    return last;
                }
                let gaps = depths.to_owned().slice([0..ray_count, 1..sample_count])
                    - depths.slice([0..ray_count, 0..sample_count - 1]);
                Tensor::cat(vec![gaps, last], 1)
            },
            IntervalMode::Bounded => {
                if sample_count == 1 {
                    return fars - nears;
                }
                let midpoints = (depths.to_owned().slice([0..ray_count, 1..sample_count])
                    + depths.slice([0..ray_count, 0..sample_count - 1]))
                .mul_scalar(0.5);
                let uppers = Tensor::cat(vec![midpoints.to_owned(), fars], 1);
                let lowers = Tensor::cat(vec![nears, midpoints], 1);
                uppers - lowers
            },
        }
    }

    /// Compositing the samples along each ray.
    ///
    /// `decompose` additionally renders the static and transient parts alone,
    /// if the samples carry a transient part.
    pub fn composite<B: Backend>(
        &self,
        samples: SampledRays<B>,
        nears: Tensor<B, 2>,
        fars: Tensor<B, 2>,
        decompose: bool,
    ) -> Composite<B> {
        let [ray_count, _] = samples.depths.dims();
        let intervals = self.intervals(samples.depths.to_owned(), nears, fars);
        let transient = samples.transient.filter(|_| self.output_transient);

        let (colors_rgb, weights, decomposition) = match transient {
            None => {
                let weights = Self::weights(Self::alphas(samples.densities, intervals));
                let colors_rgb =
                    Self::integrate_vectors(weights.to_owned(), samples.colors_rgb);
                (colors_rgb, weights, None)
            },
            Some(transient) => {
                let alphas_static =
                    Self::alphas(samples.densities.to_owned(), intervals.to_owned());
                let alphas_transient =
                    Self::alphas(transient.densities.to_owned(), intervals.to_owned());
                let alphas =
                    Self::alphas(samples.densities + transient.densities, intervals);

                // T_i <- Π_(j < i) (1 - α_j)
                let transmittances = (-alphas.to_owned() + 1.0).prod_cumulative_exclusive(1);
                let weights = alphas * transmittances.to_owned();
                let weights_static_part = alphas_static.to_owned() * transmittances.to_owned();
                let weights_transient_part = alphas_transient.to_owned() * transmittances;

                // Σ T_i (α_s,i c_s,i + α_t,i c_t,i)
                let colors_rgb = Self::integrate_vectors(
                    weights_static_part,
                    samples.colors_rgb.to_owned(),
                ) + Self::integrate_vectors(
                    weights_transient_part.to_owned(),
                    transient.colors_rgb.to_owned(),
                );

                let decomposition = if decompose {
                    let weights_static = Self::weights(alphas_static);
                    let weights_transient = Self::weights(alphas_transient);
                    Some(Decomposition {
                        colors_rgb_static: Self::integrate_vectors(
                            weights_static.to_owned(),
                            samples.colors_rgb,
                        ),
                        depths_static: Self::integrate_scalars(
                            weights_static,
                            samples.depths.to_owned(),
                        ),
                        colors_rgb_transient: Self::integrate_vectors(
                            weights_transient.to_owned(),
                            transient.colors_rgb,
                        ),
                        depths_transient: Self::integrate_scalars(
                            weights_transient,
                            samples.depths.to_owned(),
                        ),
                        flows: transient.flows.map(|flows| {
                            Self::integrate_vectors(weights_transient_part, flows)
                        }),
                    })
                } else {
                    None
                };

                (colors_rgb, weights, decomposition)
            },
        };

        let opacities = weights.to_owned().sum_dim(1);
        let depths = Self::integrate_scalars(weights.to_owned(), samples.depths);
        let colors_rgb = if self.white_background {
            colors_rgb + (-opacities.to_owned() + 1.0).expand([ray_count, 3])
        } else {
            colors_rgb
        };

        Composite {
            colors_rgb,
            depths,
            opacities,
            weights,
            decomposition,
        }
    }

    /// `α_i = 1 - exp(-σ_i δ_i)`
    #[inline]
    pub fn alphas<B: Backend>(
        densities: Tensor<B, 2>,
        intervals: Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        -(densities * intervals).neg().exp() + 1.0
    }

    /// `w_i = α_i Π_(j < i) (1 - α_j)`
    #[inline]
    pub fn weights<B: Backend>(alphas: Tensor<B, 2>) -> Tensor<B, 2> {
        let transmittances = (-alphas.to_owned() + 1.0).prod_cumulative_exclusive(1);
        alphas * transmittances
    }

    /// `[R, S] x [R, S] -> [R, 1]`
    #[inline]
    fn integrate_scalars<B: Backend>(
        weights: Tensor<B, 2>,
        values: Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        (weights * values).sum_dim(1)
    }

    /// `[R, S] x [R, S, C] -> [R, C]`
    #[inline]
    fn integrate_vectors<B: Backend>(
        weights: Tensor<B, 2>,
        values: Tensor<B, 3>,
    ) -> Tensor<B, 2> {
        let [ray_count, sample_count, width] = values.dims();
        let weights = weights
            .unsqueeze_dim::<3>(2)
            .expand([ray_count, sample_count, width]);
        (weights * values).sum_dim(1).reshape([ray_count, width])
    }
}

impl Default for IntervalMode {
    #[inline]
    fn default() -> Self {
        Self::Open
    }
}

impl Default for VolumetricCompositor {
    #[inline]
    fn default() -> Self {
        Self {
            interval_mode: Default::default(),
            interval_sentinel: INTERVAL_SENTINEL,
            output_transient: false,
            white_background: false,
        }
    }
}
