use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http request failed: {0}")]
    Http(#[from] Box<ureq::Error>),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("image encode error: {0}")]
    Image(#[from] image::ImageError),
}

impl From<ureq::Error> for TransportError {
    fn from(err: ureq::Error) -> Self {
        TransportError::Http(Box::new(err))
    }
}
