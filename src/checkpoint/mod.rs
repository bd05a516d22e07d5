//! Named module records on disk.

pub use crate::error::Error;
pub use burn::{module::Module, tensor::backend::Backend};

use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use std::path::{Path, PathBuf};

/// A directory of named records, e.g., `nerf_coarse`, `nerf_fine`,
/// `embedding_a` and `embedding_t`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Checkpoint {
    pub directory: PathBuf,
}

impl Checkpoint {
    pub const NAME_EMBEDDING_APPEARANCE: &'static str = "embedding_a";
    pub const NAME_EMBEDDING_TRANSIENT: &'static str = "embedding_t";
    pub const NAME_FIELD_COARSE: &'static str = "nerf_coarse";
    pub const NAME_FIELD_FINE: &'static str = "nerf_fine";

    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// The record path of `name` without the file extension.
    pub fn path(
        &self,
        name: &str,
    ) -> PathBuf {
        self.directory.join(name)
    }

    /// Loading the record of `name` into `module`.
    pub fn load<B: Backend, M: Module<B>>(
        &self,
        name: &str,
        module: M,
        device: &B::Device,
    ) -> Result<M, Error> {
        let path = self.path(name);

        #[cfg(debug_assertions)]
        log::debug!(target: "nerf_renderer::checkpoint", "load ({})", path.display());

        let module = module.load_file(&path, &Self::recorder(), device)?;

        log::info!(
            target: "nerf_renderer::checkpoint",
            "Loaded {name} ({} parameters) from {}",
            module.num_params(),
            self.directory.display(),
        );

        Ok(module)
    }

    /// Saving `module` as the record of `name`.
    pub fn save<B: Backend, M: Module<B>>(
        &self,
        name: &str,
        module: M,
    ) -> Result<(), Error> {
        let path = self.path(name);
        module.save_file(&path, &Self::recorder())?;

        log::info!(
            target: "nerf_renderer::checkpoint",
            "Saved {name} to {}",
            self.directory.display(),
        );

        Ok(())
    }

    #[inline]
    fn recorder() -> NamedMpkFileRecorder<FullPrecisionSettings> {
        NamedMpkFileRecorder::new()
    }
}

impl AsRef<Path> for Checkpoint {
    #[inline]
    fn as_ref(&self) -> &Path {
        &self.directory
    }
}
