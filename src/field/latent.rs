//! Per-frame latent codes.

pub use super::*;
pub use burn::{
    config::Config,
    module::Module,
    nn::{Embedding, EmbeddingConfig},
};

use crate::preset::render::{
    FRAME_COUNT, LATENT_SIZE_APPEARANCE, LATENT_SIZE_TRANSIENT,
};

/// The configuration for [`LatentEmbeddings`].
#[derive(Config, Copy, Debug)]
pub struct LatentEmbeddingsConfig {
    /// Vocabulary size, i.e., the number of frames seen in training.
    #[config(default = "FRAME_COUNT")]
    pub frame_count: usize,
    /// `N_a`
    #[config(default = "LATENT_SIZE_APPEARANCE")]
    pub appearance_size: usize,
    /// `N_t`
    #[config(default = "LATENT_SIZE_TRANSIENT")]
    pub transient_size: usize,
    #[config(default = false)]
    pub encode_appearance: bool,
    #[config(default = false)]
    pub encode_transient: bool,
}

/// Learned appearance and transient codes indexed by frame.
#[derive(Debug, Module)]
pub struct LatentEmbeddings<B: Backend> {
    /// `[frame_count, N_a]`
    pub appearance: Option<Embedding<B>>,
    /// `[frame_count, N_t]`
    pub transient: Option<Embedding<B>>,
}

/// Latent codes looked up for a batch of rays.
#[derive(Clone, Debug)]
pub struct Latents<B: Backend> {
    /// `[R, N_a]`
    pub appearance: Option<Tensor<B, 2>>,
    /// `[R, N_t]`
    pub transient: Option<Tensor<B, 2>>,
}

impl LatentEmbeddingsConfig {
    /// Initialize from the configuration.
    pub fn init<B: Backend>(
        &self,
        device: &B::Device,
    ) -> LatentEmbeddings<B> {
        let appearance = self.encode_appearance.then(|| {
            EmbeddingConfig::new(self.frame_count, self.appearance_size).init(device)
        });
        let transient = self.encode_transient.then(|| {
            EmbeddingConfig::new(self.frame_count, self.transient_size).init(device)
        });
        LatentEmbeddings {
            appearance,
            transient,
        }
    }
}

impl<B: Backend> LatentEmbeddings<B> {
    /// No embedding at all.
    #[inline]
    pub const fn empty() -> Self {
        Self {
            appearance: None,
            transient: None,
        }
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.appearance.is_none() && self.transient.is_none()
    }

    /// The smallest vocabulary size among the embeddings.
    pub fn frame_count(&self) -> Option<usize> {
        [&self.appearance, &self.transient]
            .into_iter()
            .flatten()
            .map(|embedding| embedding.weight.dims()[0])
            .min()
    }

    /// Looking up the codes of each ray.
    ///
    /// ## Shapes
    ///
    /// * `frame_indices` - `[R]`
    pub fn lookup(
        &self,
        frame_indices: Tensor<B, 1, Int>,
    ) -> Latents<B> {
        let ray_count = frame_indices.dims()[0];
        // [R, 1]
        let frame_indices = frame_indices.reshape([ray_count, 1]);
        let lookup = |embedding: &Embedding<B>| {
            let size = embedding.weight.dims()[1];
            embedding
                .forward(frame_indices.to_owned())
                .reshape([ray_count, size])
        };

        Latents {
            appearance: self.appearance.as_ref().map(lookup),
            transient: self.transient.as_ref().map(lookup),
        }
    }
}

impl<B: Backend> Latents<B> {
    #[inline]
    pub const fn empty() -> Self {
        Self {
            appearance: None,
            transient: None,
        }
    }
}

impl<B: Backend> Default for LatentEmbeddings<B> {
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

impl<B: Backend> Default for Latents<B> {
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

impl Default for LatentEmbeddingsConfig {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn init_by_flags() {
        let device = Default::default();

        let embeddings = LatentEmbeddingsConfig::default().init::<B>(&device);
        assert!(embeddings.is_empty());
        assert_eq!(embeddings.frame_count(), None);

        let embeddings = LatentEmbeddingsConfig::default()
            .with_frame_count(12)
            .with_appearance_size(8)
            .with_encode_appearance(true)
            .init::<B>(&device);
        assert!(!embeddings.is_empty());
        assert!(embeddings.transient.is_none());
        assert_eq!(embeddings.frame_count(), Some(12));
    }

    #[test]
    fn lookup_rows_follow_frame_indices() {
        let device = Default::default();
        let embeddings = LatentEmbeddingsConfig::default()
            .with_frame_count(4)
            .with_appearance_size(3)
            .with_transient_size(2)
            .with_encode_appearance(true)
            .with_encode_transient(true)
            .init::<B>(&device);

        let frame_indices = Tensor::<B, 1, Int>::from_data([2, 0, 2], &device);
        let latents = embeddings.lookup(frame_indices);

        let appearance = latents.appearance.unwrap();
        assert_eq!(appearance.dims(), [3, 3]);
        assert_eq!(latents.transient.unwrap().dims(), [3, 2]);

        let weight = embeddings.appearance.unwrap().weight.val();
        appearance
            .to_owned()
            .slice([0..1, 0..3])
            .into_data()
            .assert_approx_eq(&weight.to_owned().slice([2..3, 0..3]).into_data(), 6);
        appearance
            .slice([2..3, 0..3])
            .into_data()
            .assert_approx_eq(&weight.slice([2..3, 0..3]).into_data(), 6);
    }
}
