use crate::boxes::FourCC;
use crate::known_boxes::AtomKind;
use std::io;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("io: {0}")]
    Io(io::Error),
    /// Malformed header, inconsistent declared length, integrity mismatch.
    #[error("format: {0}")]
    Format(String),
    #[error("{op} is not supported on {kind} atom '{typ}'")]
    InvalidKind {
        op: &'static str,
        kind: AtomKind,
        typ: FourCC,
    },
    #[error("out of bounds: {0}")]
    Bounds(String),
    #[error("no matching '{0}' atom")]
    NotFound(FourCC),
    #[error("source stream is closed")]
    SourceClosed,
    #[error("source stream is already in use")]
    SourceBusy,
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<io::Error> for Error {
    // Crate errors tunnelled through the std::io traits on Atom come back out intact.
    fn from(e: io::Error) -> Self {
        if e.get_ref().is_some_and(|inner| inner.is::<Error>()) {
            match e.into_inner().map(|inner| inner.downcast::<Error>()) {
                Some(Ok(inner)) => *inner,
                Some(Err(other)) => Error::Io(io::Error::other(other)),
                None => Error::Format("lost wrapped error".into()),
            }
        } else {
            Error::Io(e)
        }
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(e) => e,
            other => io::Error::other(other),
        }
    }
}
