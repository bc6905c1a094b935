use std::fmt;

/// Errors raised by the detection stages at process-boundary points.
///
/// Per-frame detection failures (low template-match confidence, missing
/// HUD text, ambiguous calibration) are never represented here — those are
/// reported as `None`/default values and absorbed by carry-forward in the
/// validator. Only configuration and I/O failures that should terminate the
/// process reach this type.
#[derive(Debug)]
pub enum Error {
    /// `--templates` directory is missing or unreadable.
    TemplateDirMissing { path: String },
    /// A template PNG failed to decode.
    TemplateDecode { path: String, source: image::ImageError },
    /// `--crop` or `--grid-offset` could not be parsed.
    InvalidArg { flag: &'static str, value: String },
    /// Wrapper for I/O errors raised while reading templates or frames from disk.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TemplateDirMissing { path } => {
                write!(f, "template directory not found: {path}")
            }
            Self::TemplateDecode { path, source } => {
                write!(f, "failed to decode template {path}: {source}")
            }
            Self::InvalidArg { flag, value } => {
                write!(f, "invalid value for {flag}: {value}")
            }
            Self::Io(err) => write!(f, "i/o error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TemplateDecode { source, .. } => Some(source),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
