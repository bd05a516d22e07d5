pub const CHUNK_SIZE: usize = 32 * 1024;
pub const DIRECTION_FREQUENCY_COUNT: usize = 4;
pub const FRAME_COUNT: usize = 100;
/// The last interval along an open ray.
pub const INTERVAL_SENTINEL: f32 = 1e2;
pub const LATENT_SIZE_APPEARANCE: usize = 48;
pub const LATENT_SIZE_TRANSIENT: usize = 48;
pub const POSITION_FREQUENCY_COUNT: usize = 10;
pub const SAMPLE_COUNT_COARSE: usize = 64;
pub const SAMPLE_COUNT_FINE: usize = 128;
