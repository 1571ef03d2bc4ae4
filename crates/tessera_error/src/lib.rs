use std::error::Error;
use std::fmt;

pub type Result<T, E = TesseraError> = std::result::Result<T, E>;

/// Broad category of an error.
///
/// Callers match on the kind, messages are for humans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A value isn't representable in the target width or unit.
    Encoding,
    /// Columns don't conform to a schema (arity, nullability).
    SchemaViolation,
    /// Columns in a batch have differing lengths.
    LengthMismatch,
    /// A column's type isn't assignable to the declared field type.
    TypeMismatch,
    /// Malformed framing, truncated bodies, inconsistent buffer layouts.
    CorruptStream,
    /// Write attempted after the writer was closed.
    WriterClosed,
    /// A message arrived in a state that doesn't accept it.
    UnexpectedMessage,
    /// Valid input using a feature we don't support.
    NotImplemented,
    Io,
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Encoding => "Encoding error",
            Self::SchemaViolation => "Schema violation",
            Self::LengthMismatch => "Length mismatch",
            Self::TypeMismatch => "Type mismatch",
            Self::CorruptStream => "Corrupt stream",
            Self::WriterClosed => "Writer closed",
            Self::UnexpectedMessage => "Unexpected message",
            Self::NotImplemented => "Not implemented",
            Self::Io => "IO error",
            Self::Other => "Error",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug)]
pub struct TesseraError {
    inner: Box<TesseraErrorInner>,
}

#[derive(Debug)]
struct TesseraErrorInner {
    kind: ErrorKind,
    msg: String,
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl TesseraError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self::of_kind(ErrorKind::Other, msg)
    }

    pub fn of_kind(kind: ErrorKind, msg: impl Into<String>) -> Self {
        TesseraError {
            inner: Box::new(TesseraErrorInner {
                kind,
                msg: msg.into(),
                source: None,
            }),
        }
    }

    /// Create an error wrapping some source error.
    ///
    /// If the source is itself a `TesseraError`, its kind is carried over.
    pub fn with_source(msg: impl Into<String>, source: Box<dyn Error + Send + Sync>) -> Self {
        let kind = source
            .downcast_ref::<TesseraError>()
            .map(|e| e.kind())
            .unwrap_or(ErrorKind::Other);

        TesseraError {
            inner: Box::new(TesseraErrorInner {
                kind,
                msg: msg.into(),
                source: Some(source),
            }),
        }
    }

    /// Replace the kind of this error.
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.inner.kind = kind;
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.inner.kind
    }

    pub fn get_msg(&self) -> &str {
        self.inner.msg.as_str()
    }
}

impl fmt::Display for TesseraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.inner.kind, self.inner.msg)?;
        if let Some(source) = &self.inner.source {
            write!(f, "\nError source: {source}")?;
        }
        Ok(())
    }
}

impl Error for TesseraError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl From<std::io::Error> for TesseraError {
    fn from(value: std::io::Error) -> Self {
        let kind = match value.kind() {
            std::io::ErrorKind::UnexpectedEof => ErrorKind::CorruptStream,
            _ => ErrorKind::Io,
        };
        Self::with_source("IO error", Box::new(value)).with_kind(kind)
    }
}

impl From<fmt::Error> for TesseraError {
    fn from(value: fmt::Error) -> Self {
        Self::with_source("Format error", Box::new(value))
    }
}

/// Early return a `NotImplemented` error.
#[macro_export]
macro_rules! not_implemented {
    ($($arg:tt)+) => {{
        let msg = format!($($arg)+);
        return Err($crate::TesseraError::of_kind(
            $crate::ErrorKind::NotImplemented,
            format!("Not yet implemented: {msg}"),
        ));
    }};
}

/// Extension trait for attaching context to foreign errors.
pub trait ResultExt<T, E> {
    fn context(self, msg: &'static str) -> Result<T>;

    fn context_fn<F: Fn() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Error + Send + Sync + 'static> ResultExt<T, E> for std::result::Result<T, E> {
    fn context(self, msg: &'static str) -> Result<T> {
        self.map_err(|e| TesseraError::with_source(msg, Box::new(e)))
    }

    fn context_fn<F: Fn() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| TesseraError::with_source(f(), Box::new(e)))
    }
}

pub trait OptionExt<T> {
    /// Return an error if the option is None.
    fn required(self, msg: &'static str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn required(self, msg: &'static str) -> Result<T> {
        match self {
            Some(v) => Ok(v),
            None => Err(TesseraError::new(format!("Missing required value: {msg}"))),
        }
    }
}
