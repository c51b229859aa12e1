use std::backtrace::{Backtrace, BacktraceStatus};
use std::borrow::Cow;
use std::error::Error;
use std::fmt;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug)]
pub struct DbError {
    inner: Box<DbErrorInner>,
}

#[derive(Debug)]
struct DbErrorInner {
    /// Message for the error.
    msg: Cow<'static, str>,
    /// Source of the error.
    source: Option<Box<dyn Error + Send + Sync>>,
    /// Additional key/value pairs describing the error.
    fields: Vec<(Cow<'static, str>, String)>,
    /// If this error indicates a broken invariant in the planner or one of
    /// the nodes it manipulates.
    ///
    /// Internal errors should never happen with a correct planner, and
    /// should not be retried or masked.
    internal: bool,
    /// Captured backtrace.
    ///
    /// Only captured if RUST_BACKTRACE is set.
    backtrace: Backtrace,
}

impl DbError {
    pub fn new(msg: impl Into<Cow<'static, str>>) -> Self {
        DbError {
            inner: Box::new(DbErrorInner {
                msg: msg.into(),
                source: None,
                fields: Vec::new(),
                internal: false,
                backtrace: Backtrace::capture(),
            }),
        }
    }

    /// Create an error indicating that an internal invariant was violated.
    pub fn internal(msg: impl Into<Cow<'static, str>>) -> Self {
        let mut err = Self::new(msg);
        err.inner.internal = true;
        err
    }

    pub fn with_source(
        msg: impl Into<Cow<'static, str>>,
        source: Box<dyn Error + Send + Sync>,
    ) -> Self {
        let mut err = Self::new(msg);
        err.inner.source = Some(source);
        err
    }

    /// Attach a key/value pair to the error.
    pub fn with_field(
        mut self,
        key: impl Into<Cow<'static, str>>,
        value: impl fmt::Display,
    ) -> Self {
        self.inner.fields.push((key.into(), value.to_string()));
        self
    }

    pub fn with_fields<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Cow<'static, str>>,
        V: fmt::Display,
    {
        for (k, v) in fields {
            self.inner.fields.push((k.into(), v.to_string()));
        }
        self
    }

    pub fn get_msg(&self) -> &str {
        self.inner.msg.as_ref()
    }

    pub fn get_field(&self, key: &str) -> Option<&str> {
        self.inner
            .fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_internal(&self) -> bool {
        self.inner.internal
    }

    pub fn get_backtrace(&self) -> &Backtrace {
        &self.inner.backtrace
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inner.internal {
            write!(f, "Internal error: ")?;
        }
        write!(f, "{}", self.inner.msg)?;

        for (key, value) in &self.inner.fields {
            write!(f, "\n  {key}: {value}")?;
        }

        if let Some(source) = &self.inner.source {
            write!(f, "\nError source: {source}")?;
        }

        if self.inner.backtrace.status() == BacktraceStatus::Captured {
            write!(f, "\nBacktrace: {}", self.inner.backtrace)?;
        }

        Ok(())
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl From<fmt::Error> for DbError {
    fn from(value: fmt::Error) -> Self {
        DbError::with_source("Format error", Box::new(value))
    }
}

/// Extension trait for adding context to errors.
pub trait ResultExt<T, E> {
    /// Wrap an error with a static context string.
    fn context(self, msg: &'static str) -> Result<T>;

    /// Wrap an error with a lazily computed context string.
    fn context_fn<F: Fn() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Error + Send + Sync + 'static> ResultExt<T, E> for std::result::Result<T, E> {
    fn context(self, msg: &'static str) -> Result<T> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(DbError::with_source(msg, Box::new(e))),
        }
    }

    fn context_fn<F: Fn() -> String>(self, f: F) -> Result<T> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(DbError::with_source(f(), Box::new(e))),
        }
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
            None => Err(DbError::new(format!("Missing required value: {msg}"))),
        }
    }
}
