use std::path::PathBuf;

use ddparse_core::ParseError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarnessError>;

/// Errors raised by the verification harness
///
/// The conversion core itself is total; everything here comes from the
/// surroundings: suite files, malformed stored rows, or inputs the reference
/// parser refuses.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("suite file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed bit pattern {0:?} (expected 0x followed by 16 hex digits)")]
    MalformedBits(String),

    #[error("reference parser rejected {input:?}")]
    OracleRejected { input: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl HarnessError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
