use thiserror::Error;

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("Failed to read input file: {0}")]
    InputReadError(String),

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("Failed to decode raster: {0}")]
    DecodeError(String),

    #[error("Failed to encode tile: {0}")]
    EncodeError(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Raster buffer holds {actual} samples, expected {expected}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error(
        "Image and mask must have the same dimensions: image={image_width}x{image_height}, mask={mask_width}x{mask_height}"
    )]
    DimensionMismatch {
        image_width: usize,
        image_height: usize,
        mask_width: usize,
        mask_height: usize,
    },

    #[error("Image {width}x{height} is too small for patch size {patch_size} with edge margin {edge_margin}")]
    ImageTooSmall {
        width: usize,
        height: usize,
        patch_size: usize,
        edge_margin: usize,
    },

    #[error("Invalid patch size: {0}")]
    InvalidPatchSize(usize),

    #[error("Invalid worker assignment: worker_id={worker_id}, worker_count={worker_count}")]
    InvalidWorker { worker_count: usize, worker_id: usize },

    #[error("Grid cell {linear_index} does not fit inside a {width}x{height} raster")]
    CellOutOfBounds {
        linear_index: usize,
        width: usize,
        height: usize,
    },

    #[error("Mask of patch {patch_name} is not binary: {binary} of {expected} pixels are 0 or 1")]
    MaskNotBinary {
        patch_name: String,
        binary: u64,
        expected: u64,
    },

    #[error("Texture channel {channel} is {width}x{height}, primary grid is {grid_width}x{grid_height}")]
    TextureDimensionMismatch {
        channel: String,
        width: usize,
        height: usize,
        grid_width: usize,
        grid_height: usize,
    },

    #[error("Missing statistics record: {0}")]
    MissingRecord(String),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PatchError {
    /// Fatal for the current image: the worker cannot produce any patch from it.
    pub fn is_precondition_violation(&self) -> bool {
        matches!(
            self,
            PatchError::DimensionMismatch { .. }
                | PatchError::ImageTooSmall { .. }
                | PatchError::InvalidPatchSize(_)
                | PatchError::InvalidWorker { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PatchError>;
