//! Image quality metrics.

pub mod normalize;

pub use crate::error::Error;
pub use burn::{
    config::Config,
    tensor::{backend::Backend, Tensor},
};
pub use normalize::*;

use burn::tensor::ElementConversion;
use std::f32::consts::LN_10;

/// Peak signal-to-noise ratio in decibels for values in `[0, 1]`.
///
/// `10 log10(1 / MSE)`
///
/// ## Shapes
///
/// * `value` - `[I_y, I_x, C]`
/// * `target` - `[I_y, I_x, C]`
/// * `output` - `[1]`
pub fn psnr<B: Backend>(
    value: Tensor<B, 3>,
    target: Tensor<B, 3>,
) -> Result<Tensor<B, 1>, Error> {
    check_dims(&value, &target)?;
    let mse = (value - target).powi_scalar(2).mean();
    Ok(mse.recip().log() * 10.0 / LN_10)
}

/// The mean of [`psnr`] over image pairs.
pub fn mean_psnr<B: Backend>(
    pairs: impl IntoIterator<Item = (Tensor<B, 3>, Tensor<B, 3>)>
) -> Result<Option<f32>, Error> {
    let mut count = 0;
    let mut sum = 0.0;
    for (value, target) in pairs {
        sum += psnr(value, target)?.into_scalar().elem::<f32>();
        count += 1;
    }
    Ok((count > 0).then(|| sum / count as f32))
}

/// The absolute error summed over channels, min-max normalized to `[0, 1]`.
///
/// ## Shapes
///
/// * `value` - `[I_y, I_x, C]`
/// * `target` - `[I_y, I_x, C]`
/// * `output` - `[I_y, I_x]`
pub fn error_map<B: Backend>(
    value: Tensor<B, 3>,
    target: Tensor<B, 3>,
) -> Result<Tensor<B, 2>, Error> {
    check_dims(&value, &target)?;
    let [image_height, image_width, _] = value.dims();
    let errors = (value - target)
        .abs()
        .sum_dim(2)
        .reshape([image_height, image_width]);
    Ok(MinMaxNormConfig::default().init().forward(errors))
}

fn check_dims<B: Backend>(
    value: &Tensor<B, 3>,
    target: &Tensor<B, 3>,
) -> Result<(), Error> {
    if value.dims() != target.dims() {
        return Err(Error::Validation(
            "The dimensions of the rendered image".into(),
            format!("{:?}, but got {:?}", target.dims(), value.dims()),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    #[test]
    fn psnr_of_uniform_error() {
        let device = Default::default();
        let target = Tensor::<B, 3>::zeros([4, 4, 3], &device);
        let value = Tensor::<B, 3>::full([4, 4, 3], 0.1, &device);

        // MSE = 0.01
        let output = psnr(value, target).unwrap().into_scalar();
        assert!((output - 20.0).abs() < 1e-3, "{output}");
    }

    #[test]
    fn mean_psnr_of_pairs() {
        let device = Default::default();
        let target = Tensor::<B, 3>::zeros([2, 2, 3], &device);
        let pairs = [0.1, 0.01].map(|error| {
            (Tensor::<B, 3>::full([2, 2, 3], error, &device), target.to_owned())
        });

        let output = mean_psnr(pairs).unwrap().unwrap();
        assert!((output - 30.0).abs() < 1e-3, "{output}");
        assert_eq!(mean_psnr::<B>([]).unwrap(), None);
    }

    #[test]
    fn error_map_is_normalized() {
        let device = Default::default();
        let target = Tensor::<B, 3>::zeros([1, 3, 3], &device);
        let value = Tensor::<B, 3>::from_data(
            [[[0.1, 0.1, 0.1], [0.2, 0.2, 0.2], [0.5, 0.0, 0.0]]],
            &device,
        );

        let output = error_map(value, target).unwrap();
        output.into_data().assert_approx_eq_diff(
            &Tensor::<B, 2>::from_data([[0.0, 1.0, 0.66666667]], &device).into_data(),
            1e-5,
        );
    }

    #[test]
    fn mismatched_images() {
        let device = Default::default();
        let result = psnr(
            Tensor::<B, 3>::zeros([2, 2, 3], &device),
            Tensor::<B, 3>::zeros([2, 3, 3], &device),
        );
        assert!(matches!(result, Err(Error::Validation(..))));
    }
}
