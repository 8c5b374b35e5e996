use std::path::PathBuf;

use thiserror::Error;

use crate::Crop;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown crop '{0}'")]
    UnknownCrop(String),

    #[error("no model loaded for {0}")]
    ModelUnavailable(Crop),

    #[error("could not load model from {path:?}: {source}")]
    ModelLoad {
        path: PathBuf,
        source: tensorflow::Status,
    },

    #[error("model signature has no {0} tensor")]
    Signature(&'static str),

    #[error("TensorFlow: {0}")]
    TensorFlow(#[from] tensorflow::Status),

    #[error("could not decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not fetch image: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("input holds {actual} values, expected {expected}")]
    InputSize { expected: usize, actual: usize },

    #[error("model returned {actual} scores for {expected} labels")]
    OutputMismatch { expected: usize, actual: usize },

    #[error("model returned no scores")]
    EmptyOutput,
}

impl Error {
    /// Whether the error was caused by the submitted image rather than the
    /// server side model.
    pub fn is_bad_input(&self) -> bool {
        matches!(
            self,
            Error::Image(_) | Error::Fetch(_) | Error::UnknownCrop(_)
        )
    }
}
