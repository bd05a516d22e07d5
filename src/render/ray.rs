//! Ray batches.

pub use super::*;

use std::ops::Range;

/// An ordered batch of `R` rays.
///
/// Row `i` of every rendered channel belongs to ray `i`.
#[derive(Clone, Debug)]
pub struct Rays<B: Backend> {
    /// `[R, 3]`
    pub origins: Tensor<B, 2>,
    /// `[R, 3]`
    pub directions: Tensor<B, 2>,
    /// `[R, 1]`
    pub nears: Tensor<B, 2>,
    /// `[R, 1]`
    pub fars: Tensor<B, 2>,
}

impl<B: Backend> Rays<B> {
    /// ## Shapes
    ///
    /// * `origins` - `[R, 3]`
    /// * `directions` - `[R, 3]`
    /// * `nears` - `[R, 1]`
    /// * `fars` - `[R, 1]`
    pub fn new(
        origins: Tensor<B, 2>,
        directions: Tensor<B, 2>,
        nears: Tensor<B, 2>,
        fars: Tensor<B, 2>,
    ) -> Result<Self, Error> {
        let ray_count = origins.dims()[0];
        let check = |name: &str, dims: [usize; 2], width: usize| {
            if dims[0] != ray_count {
                return Err(Error::MismatchedShape(name.into(), ray_count, dims[0]));
            }
            if dims[1] != width {
                return Err(Error::Validation(
                    format!("{name}.dims()[1]"),
                    width.to_string(),
                ));
            }
            Ok(())
        };

        check("Rays::origins", origins.dims(), 3)?;
        check("Rays::directions", directions.dims(), 3)?;
        check("Rays::nears", nears.dims(), 1)?;
        check("Rays::fars", fars.dims(), 1)?;

        Ok(Self {
            origins,
            directions,
            nears,
            fars,
        })
    }

    /// Rays sharing the same depth bounds.
    pub fn from_bounds(
        origins: Tensor<B, 2>,
        directions: Tensor<B, 2>,
        near: f32,
        far: f32,
    ) -> Result<Self, Error> {
        let ray_count = origins.dims()[0];
        let device = origins.device();
        let nears = Tensor::full([ray_count, 1], near, &device);
        let fars = Tensor::full([ray_count, 1], far, &device);
        Self::new(origins, directions, nears, fars)
    }

    /// Unpacking rays from `[R, 8]`, i.e., `(origin, direction, near, far)`.
    pub fn from_packed(packed: Tensor<B, 2>) -> Result<Self, Error> {
        let [ray_count, width] = packed.dims();
        if width != 8 {
            return Err(Error::Validation(
                "The packed rays dims()[1]".into(),
                "8".into(),
            ));
        }

        let origins = packed.to_owned().slice([0..ray_count, 0..3]);
        let directions = packed.to_owned().slice([0..ray_count, 3..6]);
        let nears = packed.to_owned().slice([0..ray_count, 6..7]);
        let fars = packed.slice([0..ray_count, 7..8]);
        Self::new(origins, directions, nears, fars)
    }

    /// `R`
    #[inline]
    pub fn len(&self) -> usize {
        self.origins.dims()[0]
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The contiguous sub-batch of `range`.
    pub fn slice(
        &self,
        range: Range<usize>,
    ) -> Self {
        Self {
            origins: self.origins.to_owned().slice([range.to_owned(), 0..3]),
            directions: self.directions.to_owned().slice([range.to_owned(), 0..3]),
            nears: self.nears.to_owned().slice([range.to_owned(), 0..1]),
            fars: self.fars.to_owned().slice([range, 0..1]),
        }
    }

    pub fn to_device(
        self,
        device: &B::Device,
    ) -> Self {
        Self {
            origins: self.origins.to_device(device),
            directions: self.directions.to_device(device),
            nears: self.nears.to_device(device),
            fars: self.fars.to_device(device),
        }
    }

    /// Points along each ray at `depths`.
    ///
    /// ## Shapes
    ///
    /// * `depths` - `[R, S]`
    /// * `output` - `[R, S, 3]`
    pub fn positions(
        &self,
        depths: Tensor<B, 2>,
    ) -> Tensor<B, 3> {
        let [ray_count, sample_count] = depths.dims();
        let shape = [ray_count, sample_count, 3];
        let origins = self.origins.to_owned().unsqueeze_dim::<3>(1).expand(shape);
        let directions = self.directions.to_owned().unsqueeze_dim::<3>(1).expand(shape);
        let depths = depths.unsqueeze_dim::<3>(2).expand(shape);
        origins + directions * depths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn new_rejects_mismatched_lengths() {
        let device = Default::default();
        let result = Rays::<B>::from_bounds(
            Tensor::zeros([4, 3], &device),
            Tensor::zeros([5, 3], &device),
            0.0,
            1.0,
        );
        assert!(matches!(
            result,
            Err(Error::MismatchedShape(_, 4, 5))
        ));

        let result = Rays::<B>::from_bounds(
            Tensor::zeros([4, 3], &device),
            Tensor::zeros([4, 2], &device),
            0.0,
            1.0,
        );
        assert!(matches!(result, Err(Error::Validation(..))));
    }

    #[test]
    fn from_packed() {
        let device = Default::default();
        let packed = Tensor::<B, 2>::from_data(
            [
                [0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 2.0, 6.0],
                [1.0, 2.0, 3.0, 1.0, 0.0, 0.0, 0.5, 1.5],
            ],
            &device,
        );
        let rays = Rays::from_packed(packed).unwrap();
        assert_eq!(rays.len(), 2);
        rays.fars
            .into_data()
            .assert_approx_eq(&Tensor::<B, 2>::from_data([[6.0], [1.5]], &device).into_data(), 6);

        let result = Rays::<B>::from_packed(Tensor::zeros([2, 6], &device));
        assert!(result.is_err());
    }

    #[test]
    fn positions_and_slice() {
        let device = Default::default();
        let rays = Rays::<B>::from_bounds(
            Tensor::from_data([[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [0.0, 0.0, 2.0]], &device),
            Tensor::from_data([[0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 2.0, 0.0]], &device),
            0.0,
            1.0,
        )
        .unwrap();

        let rays = rays.slice(1..3);
        assert_eq!(rays.len(), 2);

        let depths = Tensor::<B, 2>::from_data([[0.5, 1.0], [0.25, 2.0]], &device);
        let positions = rays.positions(depths);
        let target = Tensor::<B, 3>::from_data(
            [
                [[1.5, 1.0, 1.0], [2.0, 1.0, 1.0]],
                [[0.0, 0.5, 2.0], [0.0, 4.0, 2.0]],
            ],
            &device,
        );
        positions.into_data().assert_approx_eq(&target.into_data(), 6);
    }
}
