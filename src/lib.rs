pub mod backoff;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;

pub use backoff::{BackoffPolicy, FailureTracker};
pub use blockchain::{AddressMatcher, ChainProvider, ChainWatcher, OnBlock, StarknetRpcClient, StarknetWatch, WatchList};
pub use config::{AppConfig, ChainConfig, LoggingConfig, ReplayConfig, RpcConfig, WatchConfig};
pub use error::{Result, WatcherError};
pub use logging::{init_logging, ErrorLogger, LogContext, MetricsLogger, PerformanceMonitor};
pub use models::{AddressMapTransactions, ReplayCursor, Transaction, TransactionRef};
