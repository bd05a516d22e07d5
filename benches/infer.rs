use burn::backend::NdArray;
use divan::Bencher;
use nerf_renderer::render::{
    ConstantField, LatentEmbeddings, RadianceFields, Rays, RenderOptions,
    Renderer, RendererConfig, Tensor,
};

type B = NdArray<f32>;

fn main() {
    divan::main();
}

#[divan::bench(args = [1024, 4096], sample_count = 20)]
fn infer_constant_field(
    bencher: Bencher,
    chunk_size: usize,
) {
    let device = Default::default();
    let renderer = data::renderer();
    let options = RenderOptions::new()
        .with_sample_count_coarse(32)
        .with_sample_count_fine(32)
        .with_chunk_size(chunk_size);

    bencher
        .with_inputs(|| data::rays(&device))
        .bench_local_refs(|rays| renderer.infer(rays, None, 0, &options, &device));
}

mod data {
    use super::*;

    pub const RAY_COUNT: usize = 64 * 64;

    pub fn renderer() -> Renderer<B, ConstantField> {
        let field = ConstantField::new(0.5, [0.2, 0.4, 0.6]);
        RendererConfig::new()
            .init(RadianceFields::new(field, field), LatentEmbeddings::empty())
            .expect("The renderer config should be valid")
    }

    pub fn rays(device: &<B as burn::tensor::backend::Backend>::Device) -> Rays<B> {
        let origins = Tensor::zeros([RAY_COUNT, 3], device);
        let directions = Tensor::random(
            [RAY_COUNT, 3],
            burn::tensor::Distribution::Normal(0.0, 1.0),
            device,
        );
        Rays::from_bounds(origins, directions, 2.0, 6.0)
            .expect("The rays should be valid")
    }
}
