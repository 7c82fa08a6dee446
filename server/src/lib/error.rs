use thiserror::Error;

/// Failures reported by [`crate::data_store::DataStore`] operations.
///
/// Every variant is a local, recoverable condition. The `Display` text is what
/// a client sees after `ERR ` when strict error reporting is enabled.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0}")]
    InvalidArgument(&'static str),

    #[error("channel not found")]
    NotFound,

    #[error("channel is full")]
    ChannelFull,

    #[error("channel is empty")]
    ChannelEmpty,
}
