use burn::record::RecorderError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Frame index out of range: {0} should be in 0..={1}")]
    FrameIndexOutOfRange(i64, u32),

    #[error("Mismatched shape: {0} should have {1} rows, but got {2}")]
    MismatchedShape(String, usize, usize),

    #[error("Recorder error: {0}")]
    Recorder(#[from] RecorderError),

    #[error("Tensor data error: {0}")]
    TensorData(String),

    #[error("Validation error: {0} should be {1}")]
    Validation(String, String),
}
