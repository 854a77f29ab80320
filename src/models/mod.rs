pub mod block;
pub mod transaction;

pub use block::{ActualFee, Block, OriginTransaction, TransactionReceipt, TransactionRef, INVOKE_TRANSACTION_TYPES};
pub use transaction::{AddressMapTransactions, ReplayCursor, Transaction, TransactionStatus};
