//! Persistence layer: the [`Store`] contract and its two implementations.

mod database;
pub mod error;
mod memory;
mod store;

pub use database::Database;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use store::Store;
