pub mod batch;
pub mod composite;
pub mod output;
pub mod ray;
pub mod sample;

pub use crate::{
    encode::{PositionalEncoder, PositionalEncoderConfig},
    error::Error,
    field::*,
};
pub use batch::*;
pub use burn::{
    config::Config,
    tensor::{backend::Backend, Int, Tensor, TensorData},
};
pub use composite::*;
pub use output::*;
pub use ray::*;
pub use sample::*;

use crate::preset::render::{
    CHUNK_SIZE, DIRECTION_FREQUENCY_COUNT, POSITION_FREQUENCY_COUNT,
    SAMPLE_COUNT_COARSE, SAMPLE_COUNT_FINE,
};
use std::fmt;

#[derive(Config, Debug)]
pub struct RenderOptions {
    /// `N_samples`
    #[config(default = "SAMPLE_COUNT_COARSE")]
    pub sample_count_coarse: usize,
    /// `N_importance`, zero to skip the fine pass.
    #[config(default = "SAMPLE_COUNT_FINE")]
    pub sample_count_fine: usize,
    /// The most rays rendered at once.
    #[config(default = "CHUNK_SIZE")]
    pub chunk_size: usize,
    #[config(default = false)]
    pub output_transient: bool,
    #[config(default = false)]
    pub white_background: bool,
    #[config(default = "IntervalMode::Open")]
    pub interval_mode: IntervalMode,
    /// The default near bound of rays.
    #[config(default = 0.0)]
    pub near: f32,
    /// The default far bound of rays.
    #[config(default = 1.0)]
    pub far: f32,
}

/// The configuration for [`Renderer`].
#[derive(Config, Debug)]
pub struct RendererConfig {
    #[config(default = "PositionalEncoderConfig::new(POSITION_FREQUENCY_COUNT)")]
    pub position_encoder: PositionalEncoderConfig,
    #[config(default = "PositionalEncoderConfig::new(DIRECTION_FREQUENCY_COUNT)")]
    pub direction_encoder: PositionalEncoderConfig,
}

/// Coarse-to-fine volume renderer over learned radiance fields.
///
/// The fields and the embeddings are read-only during rendering.
pub struct Renderer<B: Backend, F> {
    pub position_encoder: PositionalEncoder,
    pub direction_encoder: PositionalEncoder,
    pub embeddings: LatentEmbeddings<B>,
    pub fields: RadianceFields<F>,
}

/// The composited coarse and fine passes of a ray batch.
#[derive(Clone, Debug)]
pub struct RaysOutput<B: Backend> {
    pub coarse: Composite<B>,
    /// It equals the coarse pass when no importance samples are drawn.
    pub fine: Composite<B>,
}

impl RenderOptions {
    /// Rays bounded by [`Self::near`] and [`Self::far`].
    pub fn rays<B: Backend>(
        &self,
        origins: Tensor<B, 2>,
        directions: Tensor<B, 2>,
    ) -> Result<Rays<B>, Error> {
        Rays::from_bounds(origins, directions, self.near, self.far)
    }
}

impl RendererConfig {
    /// Initialize from the configuration.
    pub fn init<B: Backend, F>(
        &self,
        fields: RadianceFields<F>,
        embeddings: LatentEmbeddings<B>,
    ) -> Result<Renderer<B, F>, Error> {
        Ok(Renderer {
            position_encoder: self.position_encoder.init()?,
            direction_encoder: self.direction_encoder.init()?,
            embeddings,
            fields,
        })
    }
}

impl<B: Backend, F: RadianceField<B>> Renderer<B, F> {
    /// Rendering one chunk of rays.
    ///
    /// The rays, the latents and the fields should be on `device`.
    pub fn render_rays(
        &self,
        rays: &Rays<B>,
        latents: &Latents<B>,
        sampler: &mut HierarchicalSampler,
        options: &RenderOptions,
        device: &B::Device,
    ) -> Result<RaysOutput<B>, Error> {
        let compositor = VolumetricCompositor::from_options(options);
        let field = |variant: FieldVariant| {
            self.fields.get(variant).ok_or_else(|| {
                Error::Validation(
                    "The coarse field".into(),
                    "present when importance samples are drawn".into(),
                )
            })
        };

        // Without a fine pass, the fine field renders the stratified samples
        let variant_coarse = if sampler.is_coarse_only() {
            FieldVariant::Fine
        } else {
            FieldVariant::Coarse
        };
        let field_coarse = field(variant_coarse)?;

        #[cfg(debug_assertions)]
        log::debug!(target: "nerf_renderer::render", "coarse ({variant_coarse:?})");

        let depths_coarse =
            sampler.sample_coarse::<B>(rays.nears.to_owned(), rays.fars.to_owned());
        let samples_coarse = self.query_samples(
            variant_coarse,
            field_coarse,
            rays,
            depths_coarse.to_owned(),
            latents,
            device,
        )?;
        let coarse = compositor.composite(
            samples_coarse,
            rays.nears.to_owned(),
            rays.fars.to_owned(),
            sampler.is_coarse_only(),
        );

        if sampler.is_coarse_only() {
            return Ok(RaysOutput {
                fine: coarse.to_owned(),
                coarse,
            });
        }

        #[cfg(debug_assertions)]
        log::debug!(target: "nerf_renderer::render", "fine");

        let depths_fine = sampler.sample_fine(depths_coarse, coarse.weights.to_owned());
        let samples_fine = self.query_samples(
            FieldVariant::Fine,
            field(FieldVariant::Fine)?,
            rays,
            depths_fine,
            latents,
            device,
        )?;
        let fine = compositor.composite(
            samples_fine,
            rays.nears.to_owned(),
            rays.fars.to_owned(),
            true,
        );

        Ok(RaysOutput { coarse, fine })
    }

    /// Querying `field` at `depths` along `rays`.
    ///
    /// ## Shapes
    ///
    /// * `depths` - `[R, S]`
    fn query_samples(
        &self,
        variant: FieldVariant,
        field: &F,
        rays: &Rays<B>,
        depths: Tensor<B, 2>,
        latents: &Latents<B>,
        device: &B::Device,
    ) -> Result<SampledRays<B>, Error> {
        let [ray_count, sample_count] = depths.dims();
        let point_count = ray_count * sample_count;

        // [R * S, 3]
        let positions = rays.positions(depths.to_owned()).reshape([point_count, 3]);
        let directions = rays
            .directions
            .to_owned()
            .unsqueeze_dim::<3>(1)
            .expand([ray_count, sample_count, 3])
            .reshape([point_count, 3]);
        // [R, N] -> [R * S, N]
        let repeat = |latents: &Tensor<B, 2>| {
            let size = latents.dims()[1];
            latents
                .to_owned()
                .unsqueeze_dim::<3>(1)
                .expand([ray_count, sample_count, size])
                .reshape([point_count, size])
        };

        let input = FieldInput {
            variant,
            positions_encoded: self.position_encoder.forward(positions),
            directions_encoded: self.direction_encoder.forward(directions),
            appearance_latents: match variant {
                FieldVariant::Coarse => None,
                FieldVariant::Fine => latents.appearance.as_ref().map(repeat),
            },
            transient_latents: latents.transient.as_ref().map(repeat),
        };

        let output = field.query(input, device);
        output.validate(point_count)?;

        let transient = output.transient.map(|transient| SampledTransient {
            densities: transient.densities.reshape([ray_count, sample_count]),
            colors_rgb: transient.colors_rgb.reshape([ray_count, sample_count, 3]),
            flows: transient
                .flows
                .map(|flows| flows.reshape([ray_count, sample_count, 3])),
        });

        Ok(SampledRays {
            depths,
            densities: output.densities.reshape([ray_count, sample_count]),
            colors_rgb: output.colors_rgb.reshape([ray_count, sample_count, 3]),
            transient,
        })
    }
}

impl<B: Backend> RaysOutput<B> {
    /// Every channel of the batch, `[R, C]` each.
    pub fn into_channels(self) -> Vec<(Channel, Tensor<B, 2>)> {
        let mut channels = vec![
            (Channel::RgbCoarse, self.coarse.colors_rgb),
            (Channel::DepthCoarse, self.coarse.depths),
            (Channel::OpacityCoarse, self.coarse.opacities),
            (Channel::RgbFine, self.fine.colors_rgb),
            (Channel::DepthFine, self.fine.depths),
            (Channel::OpacityFine, self.fine.opacities),
        ];

        if let Some(decomposition) = self.fine.decomposition {
            channels.extend([
                (Channel::RgbFineStatic, decomposition.colors_rgb_static),
                (Channel::DepthFineStatic, decomposition.depths_static),
                (Channel::RgbFineTransient, decomposition.colors_rgb_transient),
                (Channel::DepthFineTransient, decomposition.depths_transient),
            ]);
            if let Some(flows) = decomposition.flows {
                channels.push((Channel::FlowFine, flows));
            }
        }

        channels
    }
}

impl Default for RenderOptions {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Default for RendererConfig {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend, F> fmt::Debug for Renderer<B, F> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct(&format!("Renderer<{}>", B::name()))
            .field("position_encoder", &self.position_encoder)
            .field("direction_encoder", &self.direction_encoder)
            .field("embeddings.is_empty()", &self.embeddings.is_empty())
            .field("fields", &self.fields)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    /// A field returning the sample depth along `+z` as its density.
    struct DepthField;

    impl RadianceField<B> for DepthField {
        fn query(
            &self,
            input: FieldInput<B>,
            device: &<B as Backend>::Device,
        ) -> FieldOutput<B> {
            let count = input.sample_count();
            assert_eq!(input.positions_encoded.dims(), [count, 3]);
            assert_eq!(input.directions_encoded.dims(), [count, 3]);
            FieldOutput {
                densities: input.positions_encoded.slice([0..count, 2..3]),
                colors_rgb: Tensor::ones([count, 3], device),
                transient: None,
            }
        }
    }

    /// A field asserting the latents it receives.
    struct LatentCheckField;

    impl RadianceField<B> for LatentCheckField {
        fn query(
            &self,
            input: FieldInput<B>,
            device: &<B as Backend>::Device,
        ) -> FieldOutput<B> {
            let count = input.sample_count();
            match input.variant {
                FieldVariant::Coarse => assert!(input.appearance_latents.is_none()),
                FieldVariant::Fine => {
                    assert_eq!(input.appearance_latents.map(|l| l.dims()), Some([count, 2]))
                },
            }
            assert_eq!(input.transient_latents.map(|l| l.dims()), Some([count, 3]));
            FieldOutput {
                densities: Tensor::ones([count, 1], device),
                colors_rgb: Tensor::ones([count, 3], device),
                transient: None,
            }
        }
    }

    fn raw_renderer<F>(fields: RadianceFields<F>) -> Renderer<B, F> {
        RendererConfig::new()
            .with_position_encoder(PositionalEncoderConfig::new(0))
            .with_direction_encoder(PositionalEncoderConfig::new(0))
            .init(fields, LatentEmbeddings::empty())
            .unwrap()
    }

    #[test]
    fn default_options() {
        let options = RenderOptions::default();
        assert_eq!(options.sample_count_coarse, 64);
        assert_eq!(options.sample_count_fine, 128);
        assert_eq!(options.chunk_size, 32 * 1024);
        assert_eq!(options.interval_mode, IntervalMode::Open);
        assert!(!options.output_transient);

        let config = RendererConfig::default();
        assert_eq!(config.position_encoder.frequency_count, 10);
        assert_eq!(config.direction_encoder.frequency_count, 4);
    }

    #[test]
    fn render_rays_queries_positions_along_rays() {
        let device = Default::default();
        let renderer = raw_renderer(RadianceFields::single(DepthField));
        let options = RenderOptions::new()
            .with_sample_count_coarse(4)
            .with_sample_count_fine(0)
            .with_interval_mode(IntervalMode::Bounded);
        let mut sampler = HierarchicalSampler::new(4, 0, SamplingMode::Deterministic).unwrap();

        // Density equals depth along +z from the origin
        let rays = options
            .rays::<B>(
                Tensor::zeros([1, 3], &device),
                Tensor::from_data([[0.0, 0.0, 1.0]], &device),
            )
            .unwrap();
        let output = renderer
            .render_rays(&rays, &Latents::empty(), &mut sampler, &options, &device)
            .unwrap();

        let alphas = [0.125_f32, 0.375, 0.625, 0.875].map(|t| 1.0 - (-t * 0.25).exp());
        let mut transmittance = 1.0;
        let mut opacity = 0.0;
        for alpha in alphas {
            opacity += transmittance * alpha;
            transmittance *= 1.0 - alpha;
        }
        output.fine.opacities.into_data().assert_approx_eq_diff(
            &Tensor::<B, 2>::from_data([[opacity]], &device).into_data(),
            1e-5,
        );
        assert!(output.fine.decomposition.is_none());
    }

    #[test]
    fn render_rays_routes_latents_by_variant() {
        let device = Default::default();
        let renderer = raw_renderer(RadianceFields::new(LatentCheckField, LatentCheckField));
        let options = RenderOptions::new()
            .with_sample_count_coarse(4)
            .with_sample_count_fine(4);
        let mut sampler = HierarchicalSampler::new(4, 4, SamplingMode::Deterministic).unwrap();

        let rays = options
            .rays::<B>(Tensor::zeros([2, 3], &device), Tensor::ones([2, 3], &device))
            .unwrap();
        let latents = Latents {
            appearance: Some(Tensor::zeros([2, 2], &device)),
            transient: Some(Tensor::zeros([2, 3], &device)),
        };
        let output = renderer
            .render_rays(&rays, &latents, &mut sampler, &options, &device)
            .unwrap();
        assert_eq!(output.fine.weights.dims(), [2, 8]);
        assert_eq!(output.coarse.weights.dims(), [2, 4]);
    }

    #[test]
    fn render_rays_rejects_missing_coarse_field() {
        let device = Default::default();
        let renderer = raw_renderer(RadianceFields::single(ConstantField::new(
            1.0,
            [1.0, 1.0, 1.0],
        )));
        let options = RenderOptions::new().with_sample_count_coarse(4);
        let mut sampler = HierarchicalSampler::new(4, 8, SamplingMode::Deterministic).unwrap();

        let rays = options
            .rays::<B>(Tensor::zeros([1, 3], &device), Tensor::ones([1, 3], &device))
            .unwrap();
        let result =
            renderer.render_rays(&rays, &Latents::empty(), &mut sampler, &options, &device);
        assert!(matches!(result, Err(Error::Validation(..))));
    }

    #[test]
    fn into_channels_with_decomposition() {
        let device = Default::default();
        let field = ConstantField::new(1.0, [1.0, 0.0, 0.0]).with_transient(ConstantTransient {
            density: 1.0,
            color_rgb: [0.0, 0.0, 1.0],
            flow: Some([0.0, 1.0, 0.0]),
        });
        let renderer = raw_renderer(RadianceFields::new(field, field));
        let options = RenderOptions::new()
            .with_sample_count_coarse(4)
            .with_sample_count_fine(4)
            .with_output_transient(true);
        let mut sampler = HierarchicalSampler::new(4, 4, SamplingMode::Deterministic).unwrap();

        let rays = options
            .rays::<B>(Tensor::zeros([3, 3], &device), Tensor::ones([3, 3], &device))
            .unwrap();
        let channels = renderer
            .render_rays(&rays, &Latents::empty(), &mut sampler, &options, &device)
            .unwrap()
            .into_channels();

        assert_eq!(channels.len(), Channel::ALL.len());
        for (channel, values) in channels {
            assert_eq!(values.dims(), [3, channel.width()], "{channel}");
        }
    }
}
