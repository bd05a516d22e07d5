//! Hierarchical depth sampling.

pub use super::*;

use crate::function::tensor_extensions::TensorFloatExtension;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::Uniform;

/// Added to the coarse weights before normalizing them into a PDF.
pub const PDF_EPSILON: f32 = 1e-5;

/// How sample positions are drawn inside their bins.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum SamplingMode {
    /// Bin midpoints and evenly spaced CDF percentiles.
    #[default]
    Deterministic,
    /// Uniform jitter, reproducible from the seed.
    Stochastic { seed: u64 },
}

/// Coarse stratified sampling followed by inverse-CDF importance sampling.
#[derive(Clone, Debug)]
pub struct HierarchicalSampler {
    /// `S`
    pub sample_count_coarse: usize,
    /// `K`
    pub sample_count_fine: usize,
    mode: SamplingMode,
    rng: Option<StdRng>,
}

impl HierarchicalSampler {
    pub fn new(
        sample_count_coarse: usize,
        sample_count_fine: usize,
        mode: SamplingMode,
    ) -> Result<Self, Error> {
        if sample_count_coarse == 0 {
            return Err(Error::Validation(
                "sample_count_coarse".into(),
                "positive".into(),
            ));
        }
        if sample_count_fine > 0 && sample_count_coarse < 3 {
            return Err(Error::Validation(
                "sample_count_coarse".into(),
                "at least 3 when importance samples are drawn".into(),
            ));
        }

        let rng = match mode {
            SamplingMode::Deterministic => None,
            SamplingMode::Stochastic { seed } => Some(StdRng::seed_from_u64(seed)),
        };

        Ok(Self {
            sample_count_coarse,
            sample_count_fine,
            mode,
            rng,
        })
    }

    #[inline]
    pub const fn mode(&self) -> SamplingMode {
        self.mode
    }

    /// Whether the fine pass is skipped.
    #[inline]
    pub const fn is_coarse_only(&self) -> bool {
        self.sample_count_fine == 0
    }

    /// One sample in each of `S` equal bins over `[near, far]`.
    ///
    /// ## Shapes
    ///
    /// * `nears` - `[R, 1]`
    /// * `fars` - `[R, 1]`
    /// * `output` - `[R, S]`, strictly increasing along each row
    pub fn sample_coarse<B: Backend>(
        &mut self,
        nears: Tensor<B, 2>,
        fars: Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        let ray_count = nears.dims()[0];
        let sample_count = self.sample_count_coarse;
        let shape = [ray_count, sample_count];
        let device = nears.device();

        // [R, S] in (0, 1)
        let offsets_in_bin = self.uniforms::<B>(shape, 0.5, &device);
        let offsets = Tensor::<B, 1, Int>::arange(0..sample_count as i64, &device)
            .float()
            .reshape([1, sample_count])
            .expand(shape)
            .add(offsets_in_bin)
            .div_scalar(sample_count as f32);

        let nears = nears.expand(shape);
        let spans = fars.expand(shape) - nears.to_owned();
        nears + spans * offsets
    }

    /// Merging `K` importance samples into the coarse samples.
    ///
    /// ## Shapes
    ///
    /// * `depths_coarse` - `[R, S]`
    /// * `weights_coarse` - `[R, S]`
    /// * `output` - `[R, S + K]`, sorted along each row
    ///
    /// ## Details
    ///
    /// The PDF is piecewise-constant over the midpoints of the coarse samples,
    /// using only the interior weights.
    pub fn sample_fine<B: Backend>(
        &mut self,
        depths_coarse: Tensor<B, 2>,
        weights_coarse: Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        if self.is_coarse_only() {
            return depths_coarse;
        }

        let [ray_count, sample_count] = depths_coarse.dims();

        // [R, S - 1]
        let bins = (depths_coarse.to_owned().slice([0..ray_count, 1..sample_count])
            + depths_coarse.to_owned().slice([0..ray_count, 0..sample_count - 1]))
        .mul_scalar(0.5);
        // [R, S - 2]
        let weights = weights_coarse
            .slice([0..ray_count, 1..sample_count - 1])
            .detach();

        let depths_importance = self.sample_pdf(bins, weights);

        Tensor::cat(vec![depths_coarse, depths_importance], 1).sort(1)
    }

    /// Inverse transform sampling of `K` depths.
    ///
    /// ## Shapes
    ///
    /// * `bins` - `[R, M + 1]`
    /// * `weights` - `[R, M]`
    /// * `output` - `[R, K]`
    pub fn sample_pdf<B: Backend>(
        &mut self,
        bins: Tensor<B, 2>,
        weights: Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        let [ray_count, bin_count] = weights.dims();
        let sample_count = self.sample_count_fine;
        let shape = [ray_count, sample_count];
        let device = weights.device();

        // [R, M]
        let weights = weights.add_scalar(PDF_EPSILON);
        let pdf = weights.to_owned() / weights.sum_dim(1);
        // [R, M + 1]
        let cdf = Tensor::cat(
            vec![Tensor::zeros([ray_count, 1], &device), pdf.sum_cumulative(1)],
            1,
        );

        // [R, K]
        let percentiles = if self.rng.is_none() {
            Tensor::<B, 1, Int>::arange(0..sample_count as i64, &device)
                .float()
                .div_scalar(sample_count.saturating_sub(1).max(1) as f32)
                .reshape([1, sample_count])
                .expand(shape)
        } else {
            self.uniforms::<B>(shape, 0.5, &device)
        };

        // [R, K] <- Count of CDF values no more than each percentile
        let mut indices = Tensor::<B, 2, Int>::zeros(shape, &device);
        for cdf_column in cdf.to_owned().iter_dim(1) {
            indices = indices
                + cdf_column
                    .expand(shape)
                    .lower_equal(percentiles.to_owned())
                    .int();
        }
        let indices_below = indices.to_owned().sub_scalar(1).clamp_min(0);
        let indices_above = indices.clamp_max(bin_count as i32);

        let cdf_below = cdf.to_owned().gather(1, indices_below.to_owned());
        let cdf_above = cdf.gather(1, indices_above.to_owned());
        let bins_below = bins.to_owned().gather(1, indices_below);
        let bins_above = bins.gather(1, indices_above);

        let denominators = cdf_above - cdf_below.to_owned();
        let denominators = denominators
            .to_owned()
            .mask_fill(denominators.lower_elem(PDF_EPSILON), 1.0);
        let ratios = (percentiles - cdf_below) / denominators;

        bins_below.to_owned() + ratios * (bins_above - bins_below)
    }

    /// Uniform values in `[0, 1)`, or `fallback` everywhere in deterministic mode.
    fn uniforms<B: Backend>(
        &mut self,
        shape: [usize; 2],
        fallback: f32,
        device: &B::Device,
    ) -> Tensor<B, 2> {
        match self.rng.as_mut() {
            None => Tensor::full(shape, fallback, device),
            Some(rng) => {
                let values = rng
                    .sample_iter(Uniform::new(0.0_f32, 1.0))
                    .take(shape[0] * shape[1])
                    .collect::<Vec<_>>();
                Tensor::from_data(TensorData::new(values, shape), device)
            },
        }
    }
}
