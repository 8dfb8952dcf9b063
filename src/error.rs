use thiserror::Error;

#[derive(Debug, Error)]
pub enum RefineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Input error: {0}")]
    InputError(String),

    #[error("PDF read error: {0}")]
    PdfReadError(String),

    #[error("Content stream error: {0}")]
    ContentStreamError(String),

    #[error("Layout invariant violated: {0}")]
    InvariantError(String),

    #[error("Output error: {0}")]
    OutputError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Generates factory methods for [`RefineError`] variants that wrap a `String`.
macro_rules! error_constructors {
    ($(
        $(#[doc = $doc:expr])*
        $method:ident => $variant:ident
    ),* $(,)?) => {
        impl RefineError {
            $(
                $(#[doc = $doc])*
                pub fn $method(msg: impl Into<String>) -> Self {
                    Self::$variant(msg.into())
                }
            )*
        }
    };
}

error_constructors! {
    /// Create a configuration error.
    config => ConfigError,
    /// Create an input (layout service JSON) error.
    input => InputError,
    /// Create a PDF read error.
    pdf_read => PdfReadError,
    /// Create a content stream error.
    content_stream => ContentStreamError,
    /// Create a layout invariant error.
    invariant => InvariantError,
    /// Create an output error.
    output => OutputError,
}

impl From<lopdf::Error> for RefineError {
    fn from(e: lopdf::Error) -> Self {
        Self::PdfReadError(e.to_string())
    }
}

impl From<serde_json::Error> for RefineError {
    fn from(e: serde_json::Error) -> Self {
        Self::InputError(e.to_string())
    }
}

impl From<serde_yml::Error> for RefineError {
    fn from(e: serde_yml::Error) -> Self {
        Self::ConfigError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RefineError>;
