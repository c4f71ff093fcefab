//! Error types shared by the library and the CLI.
//!
//! Every failure is terminal for a run. [`Error::exit_code`] gives the
//! process outcome the binary reports for each [`ErrorKind`].

use std::path::PathBuf;

/// The broad class of a failure, one per distinct process outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or unusable credential, or an unknown display time zone.
    Config,
    /// Static dataset unreadable or malformed.
    DataAccess,
    /// No stop matched the query.
    Resolution,
    /// Realtime endpoint unreachable or returned a non-success status.
    Transport,
    /// Realtime payload could not be decoded.
    Decode,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("missing API key: pass --api-key or set {env_var}")]
    MissingCredential { env_var: &'static str },

    #[error("invalid API key header {header}: {reason}")]
    InvalidCredential { header: String, reason: String },

    #[error("unknown time zone {name:?}")]
    InvalidTimezone { name: String },

    #[error("cannot read {}", .path.display())]
    DataAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read {member} from archive {}", .path.display())]
    Archive {
        path: PathBuf,
        member: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("malformed {table}")]
    Format {
        table: String,
        #[source]
        source: csv::Error,
    },

    #[error("no stop found for query: {query}")]
    StopNotFound { query: String },

    #[error("invalid feed URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("realtime request failed ({status}). {body}")]
    Transport { status: u16, body: String },

    #[error("realtime request failed")]
    Http(#[from] reqwest::Error),

    #[error("malformed realtime feed")]
    Decode(#[from] prost::DecodeError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingCredential { .. }
            | Error::InvalidCredential { .. }
            | Error::InvalidTimezone { .. } => ErrorKind::Config,
            Error::DataAccess { .. } | Error::Archive { .. } | Error::Format { .. } => {
                ErrorKind::DataAccess
            }
            Error::StopNotFound { .. } => ErrorKind::Resolution,
            Error::InvalidUrl { .. } | Error::Transport { .. } | Error::Http(_) => {
                ErrorKind::Transport
            }
            Error::Decode(_) => ErrorKind::Decode,
        }
    }

    /// Process exit code for this error.
    ///
    /// | Kind       | Code |
    /// |------------|------|
    /// | Resolution | 1    |
    /// | Config     | 2    |
    /// | Transport  | 3    |
    /// | Decode     | 4    |
    /// | DataAccess | 5    |
    pub fn exit_code(&self) -> u8 {
        match self.kind() {
            ErrorKind::Resolution => 1,
            ErrorKind::Config => 2,
            ErrorKind::Transport => 3,
            ErrorKind::Decode => 4,
            ErrorKind::DataAccess => 5,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
