use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Body, Response, StatusCode};
use log::{error, warn};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("No plant selected, choose one on /options first")]
    NoCropSelected,

    #[error("No file part named 'file' in the request")]
    MissingFile,

    #[error("Unusable file name '{0}'")]
    InvalidFilename(String),

    #[error("Malformed upload: {0}")]
    Multipart(#[from] multer::Error),

    #[error("Request body is larger than {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("Could not read request body: {0}")]
    Body(#[from] hyper::Error),

    #[error("Classification failure: '{0}'")]
    Classification(#[from] leaf_serve::Error),

    #[error("Could not store upload: {0}")]
    Io(#[from] std::io::Error),

    #[error("Prediction worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NoCropSelected | AppError::MissingFile | AppError::InvalidFilename(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::BodyTooLarge { .. }
            | AppError::Multipart(multer::Error::StreamSizeExceeded { .. })
            | AppError::Multipart(multer::Error::FieldSizeExceeded { .. }) => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            AppError::Multipart(_) | AppError::Body(_) => StatusCode::BAD_REQUEST,
            AppError::Classification(err) if err.is_bad_input() => StatusCode::BAD_REQUEST,
            AppError::Classification(_) | AppError::Io(_) | AppError::Worker(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn into_response(self) -> Response<Body> {
        let status = self.status();

        if status.is_server_error() {
            error!("{}", self);
        } else {
            warn!("{}", self);
        }

        let mut response = Response::new(Body::from(self.to_string()));
        *response.status_mut() = status;
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leaf_serve::Crop;

    #[test]
    fn client_mistakes_are_bad_requests() {
        assert_eq!(AppError::NoCropSelected.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::MissingFile.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::InvalidFilename("..".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn missing_model_is_a_server_error() {
        let err = AppError::from(leaf_serve::Error::ModelUnavailable(Crop::Corn));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn classification_errors_keep_the_failure_prefix() {
        let err = AppError::from(leaf_serve::Error::EmptyOutput);
        assert_eq!(
            err.to_string(),
            "Classification failure: 'model returned no scores'"
        );
    }
}
