use thiserror::Error;

/// Main error type for the Starknet watcher
#[derive(Error, Debug)]
pub enum WatcherError {
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Watch list error: {0}")]
    WatchList(#[from] WatchListError),

    #[error("Block sink failed: {0}")]
    Sink(String),
}

/// RPC-related errors
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("RPC method error: code={code}, message={message}")]
    Method { code: i64, message: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Transaction not found: {hash}")]
    TransactionNotFound { hash: String },
}

/// Calldata decoding errors
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Invalid number in {field}: {value}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Value of {field} does not fit: {value}")]
    Overflow { field: &'static str, value: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Configuration parsing failed: {0}")]
    Parsing(String),

    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),

    #[error("Invalid address in {key}: {address}")]
    InvalidAddress { key: String, address: String },
}

/// Failures of an external watch-list lookup
#[derive(Error, Debug)]
pub enum WatchListError {
    #[error("Watch list unavailable: {0}")]
    Unavailable(String),

    #[error("Lookup failed for {address}: {reason}")]
    Lookup { address: String, reason: String },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Error severity levels for logging and monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical errors that require immediate attention
    Critical,
    /// High priority errors that affect functionality
    High,
    /// Medium priority errors that may affect performance
    Medium,
    /// Low priority errors that are mostly informational
    Low,
}

impl WatcherError {
    /// Get the severity level of an error
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            WatcherError::Config(_) => ErrorSeverity::Critical,

            WatcherError::Rpc(RpcError::Connection(_)) => ErrorSeverity::High,
            WatcherError::WatchList(WatchListError::Unavailable(_)) => ErrorSeverity::High,
            WatcherError::Sink(_) => ErrorSeverity::High,

            WatcherError::Rpc(RpcError::Timeout { .. }) => ErrorSeverity::Medium,
            WatcherError::Decode(_) => ErrorSeverity::Medium,

            WatcherError::Rpc(RpcError::TransactionNotFound { .. }) => ErrorSeverity::Low,
            _ => ErrorSeverity::Medium,
        }
    }

    /// Whether retrying the same operation can reasonably succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            WatcherError::Rpc(RpcError::Timeout { .. }) => true,
            WatcherError::Rpc(RpcError::Connection(_)) => true,
            WatcherError::Rpc(RpcError::Http(_)) => true,
            WatcherError::WatchList(WatchListError::Unavailable(_)) => true,
            WatcherError::Sink(_) => true,

            WatcherError::Config(_) => false,
            WatcherError::Decode(_) => false,
            WatcherError::Rpc(RpcError::TransactionNotFound { .. }) => false,

            _ => false,
        }
    }
}
