use std::borrow::Cow;

/// Errors returned by [`ObjectStore`](crate::ObjectStore) operations.
#[sos_derive::sos_error]
pub enum StoreError {
    /// The store could not be constructed from the supplied settings (e.g. an empty root).
    #[error("Invalid store configuration{}: {message}", format_context(.context))]
    InvalidConfiguration { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The handle was destroyed; it stays unusable for good.
    #[error("Store destroyed{}: {message}", format_context(.context))]
    StoreDestroyed { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// No object exists for the key. The message carries the key digest, never the key.
    #[error("Object not found{}: {message}", format_context(.context))]
    NotFound { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Any failure of the underlying filesystem, passed through unchanged.
    #[error("Filesystem I/O failure{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Object value is not UTF-8{}: {source}", format_context(.context))]
    InvalidUtf8 { source: std::string::FromUtf8Error, context: Option<Cow<'static, str>> },

    #[error("Internal store error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl StoreError {
    /// `true` when the key had no object, as opposed to a failure to read it.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        matches!(self, Self::StoreDestroyed { .. })
    }
}
