use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Invalid radius {radius}: must be positive")]
    InvalidRadius { radius: u32 },

    #[error("Unsupported sample count {points}: must be in 1..={max}")]
    UnsupportedPointCount { points: u32, max: u32 },

    #[error("Location ({x}, {y}) is inside the radius {radius} margin")]
    LocationOutOfMargin { x: usize, y: usize, radius: u32 },

    #[error("Unsupported tensor rank {rank}: expected 2 or 3")]
    UnsupportedRank { rank: usize },

    #[error("Size mismatch: expected {expected} elements, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Invalid stride layout: {0}")]
    InvalidStride(String),

    #[error("Unknown option: {0}")]
    UnknownOption(String),

    #[error("Geometry cache has no model grid")]
    EmptyModel,

    #[error("Geometry cache has no sub-window mapped onto the model grid")]
    NoSubWindow,
}

pub type Result<T> = std::result::Result<T, Error>;
