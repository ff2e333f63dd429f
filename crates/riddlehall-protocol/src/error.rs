//! Error types for the protocol layer.
//!
//! Each crate in Riddlehall defines its own error enum. A `ProtocolError`
//! always means a client-supplied value could not be understood; it never
//! describes a room or match rule being broken.

/// Errors that can occur while interpreting client-supplied values.
///
/// `#[derive(thiserror::Error)]` auto-generates the `std::error::Error`
/// trait implementation, and each `#[error("...")]` attribute is the
/// message shown when the error is printed or logged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// A string did not name any variant of the expected enum.
    ///
    /// `kind` is the enum being parsed (for example `"answer status"`),
    /// `value` the rejected input.
    #[error("unknown {kind}: {value:?}")]
    UnknownVariant {
        /// Human-readable name of the enum being parsed.
        kind: &'static str,
        /// The rejected input.
        value: String,
    },
}

impl ProtocolError {
    pub(crate) fn unknown(kind: &'static str, value: &str) -> Self {
        Self::UnknownVariant {
            kind,
            value: value.to_string(),
        }
    }
}
