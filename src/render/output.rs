//! Rendered channels on the host.

pub use super::*;

use humansize::{format_size, BINARY};
use std::{collections::BTreeMap, fmt};

/// A named per-ray output.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Channel {
    RgbCoarse,
    DepthCoarse,
    OpacityCoarse,
    RgbFine,
    DepthFine,
    OpacityFine,
    RgbFineStatic,
    DepthFineStatic,
    RgbFineTransient,
    DepthFineTransient,
    FlowFine,
}

/// Host buffers of every rendered channel, one row per ray.
///
/// Chunks are written at their ray offset, so the rows keep the input order.
#[derive(Clone, Default, PartialEq)]
pub struct RenderOutput {
    ray_count: usize,
    buffers: BTreeMap<Channel, Vec<f32>>,
}

impl Channel {
    pub const ALL: [Self; 11] = [
        Self::RgbCoarse,
        Self::DepthCoarse,
        Self::OpacityCoarse,
        Self::RgbFine,
        Self::DepthFine,
        Self::OpacityFine,
        Self::RgbFineStatic,
        Self::DepthFineStatic,
        Self::RgbFineTransient,
        Self::DepthFineTransient,
        Self::FlowFine,
    ];

    /// The channels of both passes, rendered for every batch.
    pub const BASE: [Self; 6] = [
        Self::RgbCoarse,
        Self::DepthCoarse,
        Self::OpacityCoarse,
        Self::RgbFine,
        Self::DepthFine,
        Self::OpacityFine,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            Self::RgbCoarse => "rgb_coarse",
            Self::DepthCoarse => "depth_coarse",
            Self::OpacityCoarse => "opacity_coarse",
            Self::RgbFine => "rgb_fine",
            Self::DepthFine => "depth_fine",
            Self::OpacityFine => "opacity_fine",
            Self::RgbFineStatic => "rgb_fine_static",
            Self::DepthFineStatic => "depth_fine_static",
            Self::RgbFineTransient => "rgb_fine_transient",
            Self::DepthFineTransient => "depth_fine_transient",
            Self::FlowFine => "flow_fine",
        }
    }

    /// The number of values per ray.
    pub const fn width(&self) -> usize {
        match self {
            Self::RgbCoarse
            | Self::RgbFine
            | Self::RgbFineStatic
            | Self::RgbFineTransient
            | Self::FlowFine => 3,
            _ => 1,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|channel| channel.name() == name)
    }
}

impl RenderOutput {
    /// Zeroed buffers of the base channels for `ray_count` rays.
    pub fn new(ray_count: usize) -> Self {
        let buffers = Channel::BASE
            .into_iter()
            .map(|channel| (channel, vec![0.0; ray_count * channel.width()]))
            .collect();
        Self { ray_count, buffers }
    }

    /// `R`
    #[inline]
    pub const fn ray_count(&self) -> usize {
        self.ray_count
    }

    /// Moving `values` to the host rows starting at `offset`.
    ///
    /// The buffer of an optional channel is allocated for all rays on its first write.
    ///
    /// ## Shapes
    ///
    /// * `values` - `[R_chunk, channel.width()]`
    pub fn write<B: Backend>(
        &mut self,
        channel: Channel,
        offset: usize,
        values: Tensor<B, 2>,
    ) -> Result<(), Error> {
        let [row_count, width] = values.dims();
        if width != channel.width() {
            return Err(Error::Validation(
                format!("The width of channel {channel}"),
                channel.width().to_string(),
            ));
        }
        let row_end = offset + row_count;
        if row_end > self.ray_count {
            return Err(Error::Validation(
                format!("The end row {row_end} of channel {channel}"),
                format!("no more than {}", self.ray_count),
            ));
        }

        let values = values
            .into_data()
            .convert::<f32>()
            .into_vec::<f32>()
            .map_err(|err| Error::TensorData(format!("{err:?}")))?;
        let ray_count = self.ray_count;
        let buffer = self
            .buffers
            .entry(channel)
            .or_insert_with(|| vec![0.0; ray_count * width]);
        buffer[offset * width..row_end * width].copy_from_slice(&values);

        Ok(())
    }

    /// Row-major values of `channel`.
    #[inline]
    pub fn get(
        &self,
        channel: Channel,
    ) -> Option<&[f32]> {
        self.buffers.get(&channel).map(Vec::as_slice)
    }

    #[inline]
    pub fn contains(
        &self,
        channel: Channel,
    ) -> bool {
        self.buffers.contains_key(&channel)
    }

    pub fn channels(&self) -> impl Iterator<Item = Channel> + '_ {
        self.buffers.keys().copied()
    }

    /// Replacing NaN in `channel` with zero.
    ///
    /// It returns the number of replaced values.
    pub fn sanitize_nan(
        &mut self,
        channel: Channel,
    ) -> usize {
        self.buffers
            .get_mut(&channel)
            .map(|buffer| {
                buffer
                    .iter_mut()
                    .filter(|value| value.is_nan())
                    .map(|value| *value = 0.0)
                    .count()
            })
            .unwrap_or_default()
    }

    /// ## Shapes
    ///
    /// * `output` - `[R, channel.width()]`
    pub fn tensor<B: Backend>(
        &self,
        channel: Channel,
        device: &B::Device,
    ) -> Result<Tensor<B, 2>, Error> {
        let buffer = self.buffers.get(&channel).ok_or_else(|| {
            Error::Validation(format!("The channel {channel}"), "rendered".into())
        })?;
        Ok(Tensor::from_data(
            TensorData::new(buffer.to_owned(), [self.ray_count, channel.width()]),
            device,
        ))
    }

    /// Viewing `channel` as an image of rays in row-major pixel order.
    ///
    /// ## Shapes
    ///
    /// * `output` - `[I_y, I_x, channel.width()]`
    pub fn image<B: Backend>(
        &self,
        channel: Channel,
        image_height: usize,
        image_width: usize,
        device: &B::Device,
    ) -> Result<Tensor<B, 3>, Error> {
        let pixel_count = image_height * image_width;
        if pixel_count != self.ray_count {
            return Err(Error::MismatchedShape(
                format!("The image of channel {channel}"),
                self.ray_count,
                pixel_count,
            ));
        }

        Ok(self
            .tensor(channel, device)?
            .reshape([image_height, image_width, channel.width()]))
    }

    /// [`Self::image`] with values clamped to `[0, 1]`.
    pub fn image_rgb<B: Backend>(
        &self,
        channel: Channel,
        image_height: usize,
        image_width: usize,
        device: &B::Device,
    ) -> Result<Tensor<B, 3>, Error> {
        if channel.width() != 3 {
            return Err(Error::Validation(
                format!("The channel {channel}"),
                "an RGB channel".into(),
            ));
        }

        Ok(self
            .image(channel, image_height, image_width, device)?
            .clamp(0.0, 1.0))
    }

    /// Size of the host buffers in bytes.
    pub fn size(&self) -> usize {
        self.buffers
            .values()
            .map(|buffer| buffer.len() * size_of::<f32>())
            .sum()
    }

    pub fn size_readable(&self) -> String {
        format_size(self.size(), BINARY.decimal_places(1))
    }
}

impl fmt::Display for Channel {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for RenderOutput {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("RenderOutput")
            .field("ray_count", &self.ray_count)
            .field("channels", &self.buffers.keys().collect::<Vec<_>>())
            .field("size()", &self.size_readable())
            .finish()
    }
}
