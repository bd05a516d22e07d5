use burn::tensor::{backend, Float, Tensor};

pub trait TensorFloatExtension {
    /// `output[.., i, ..] = Π_{j < i} input[.., j, ..]`
    fn prod_cumulative_exclusive(
        self,
        dim: usize,
    ) -> Self;

    /// `output[.., i, ..] = Σ_{j <= i} input[.., j, ..]`
    fn sum_cumulative(
        self,
        dim: usize,
    ) -> Self;
}

impl<B: backend::Backend, const D: usize> TensorFloatExtension
    for Tensor<B, D, Float>
{
    fn prod_cumulative_exclusive(
        self,
        dim: usize,
    ) -> Self {
        assert!(dim < D, "dim should be less than self.dims().len()");

        let mut result = self.to_owned();

        let dims_batch = {
            let mut dims = self.dims();
            dims[dim] = 1;
            dims
        };
        let mut state_batch = Tensor::ones(dims_batch, &self.device());
        let mut ranges_batch = dims_batch.map(|dim| 0..dim);

        for (index, value_batch) in self.iter_dim(dim).enumerate() {
            ranges_batch[dim] = index..(index + 1);
            result = result
                .slice_assign(ranges_batch.to_owned(), state_batch.to_owned());
            state_batch = state_batch * value_batch;
        }

        result
    }

    fn sum_cumulative(
        self,
        dim: usize,
    ) -> Self {
        assert!(dim < D, "dim should be less than self.dims().len()");

        let mut result = self.to_owned();

        let dims_batch = {
            let mut dims = self.dims();
            dims[dim] = 1;
            dims
        };
        let mut state_batch = Tensor::zeros(dims_batch, &self.device());
        let mut ranges_batch = dims_batch.map(|dim| 0..dim);

        for (index, value_batch) in self.iter_dim(dim).enumerate() {
            ranges_batch[dim] = index..(index + 1);
            state_batch = state_batch + value_batch;
            result = result
                .slice_assign(ranges_batch.to_owned(), state_batch.to_owned());
        }

        result
    }
}
