//! Transactions: single writer, snapshot readers.

mod manager;
mod read;
mod state;
mod write;

pub use manager::TransactionManager;
pub use read::ReadTransaction;
pub use state::TransactionState;
pub use write::WriteTransaction;

pub(crate) use state::PendingWrite;
