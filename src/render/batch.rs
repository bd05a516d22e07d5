//! Chunked inference over ray batches.

pub use super::*;

impl<B: Backend, F: RadianceField<B>> Renderer<B, F> {
    /// Rendering all rays chunk by chunk with deterministic sampling.
    ///
    /// ## Arguments
    ///
    /// * `frame_indices` - `[R]`, selecting the latent codes of each ray
    /// * `frame_index_max` - The largest valid frame index, i.e., `N_frames - 1`
    pub fn infer(
        &self,
        rays: &Rays<B>,
        frame_indices: Option<&Tensor<B, 1, Int>>,
        frame_index_max: u32,
        options: &RenderOptions,
        device: &B::Device,
    ) -> Result<RenderOutput, Error> {
        self.infer_with_mode(
            rays,
            frame_indices,
            frame_index_max,
            options,
            SamplingMode::Deterministic,
            device,
        )
    }

    /// Rendering all rays chunk by chunk.
    ///
    /// Every chunk is moved to the host once rendered, so the device memory is
    /// bounded by [`RenderOptions::chunk_size`].
    pub fn infer_with_mode(
        &self,
        rays: &Rays<B>,
        frame_indices: Option<&Tensor<B, 1, Int>>,
        frame_index_max: u32,
        options: &RenderOptions,
        mode: SamplingMode,
        device: &B::Device,
    ) -> Result<RenderOutput, Error> {
        let chunk_size = options.chunk_size;
        if chunk_size == 0 {
            return Err(Error::Validation(
                "RenderOptions::chunk_size".into(),
                "positive".into(),
            ));
        }

        let mut sampler = HierarchicalSampler::new(
            options.sample_count_coarse,
            options.sample_count_fine,
            mode,
        )?;
        if !sampler.is_coarse_only() && self.fields.coarse.is_none() {
            return Err(Error::Validation(
                "The coarse field".into(),
                "present when importance samples are drawn".into(),
            ));
        }

        let ray_count = rays.len();
        self.validate_frame_indices(frame_indices, frame_index_max, ray_count)?;

        let mut output = RenderOutput::new(ray_count);

        for offset in (0..ray_count).step_by(chunk_size) {
            let range = offset..(offset + chunk_size).min(ray_count);
            let rays_chunk = rays.slice(range.to_owned()).to_device(device);
            let latents = match frame_indices {
                Some(frame_indices) if !self.embeddings.is_empty() => self
                    .embeddings
                    .lookup(frame_indices.to_owned().slice([range.to_owned()]).to_device(device)),
                _ => Latents::empty(),
            };

            let channels = self
                .render_rays(&rays_chunk, &latents, &mut sampler, options, device)?
                .into_channels();
            for (channel, values) in channels {
                output.write(channel, offset, values)?;
            }

            #[cfg(debug_assertions)]
            log::debug!(
                target: "nerf_renderer::render",
                "chunk ({}..{} / {ray_count})",
                range.start,
                range.end,
            );
        }

        Ok(output)
    }

    /// Checking the frame indices before any field query.
    fn validate_frame_indices(
        &self,
        frame_indices: Option<&Tensor<B, 1, Int>>,
        frame_index_max: u32,
        ray_count: usize,
    ) -> Result<(), Error> {
        let frame_indices = match frame_indices {
            Some(frame_indices) => frame_indices,
            None if self.embeddings.is_empty() => return Ok(()),
            None => {
                return Err(Error::Validation(
                    "The frame indices".into(),
                    "provided when latent embeddings are enabled".into(),
                ))
            },
        };

        let frame_count = frame_indices.dims()[0];
        if frame_count != ray_count {
            return Err(Error::MismatchedShape(
                "The frame indices".into(),
                ray_count,
                frame_count,
            ));
        }

        let frame_index_max = match self.embeddings.frame_count() {
            Some(vocabulary_size) => frame_index_max
                .min(vocabulary_size.saturating_sub(1).try_into().unwrap_or(u32::MAX)),
            None => frame_index_max,
        };
        let frame_indices = frame_indices
            .to_owned()
            .into_data()
            .convert::<i64>()
            .into_vec::<i64>()
            .map_err(|err| Error::TensorData(format!("{err:?}")))?;
        match frame_indices
            .into_iter()
            .find(|index| *index < 0 || *index > frame_index_max as i64)
        {
            Some(index) => Err(Error::FrameIndexOutOfRange(index, frame_index_max)),
            None => Ok(()),
        }
    }
}
