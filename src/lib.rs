// todostore - Persistent to-do list store with manual ordering

pub mod error;
pub mod model;
pub mod snapshot;
pub mod store;

// Re-export main types for convenience
pub use error::{Result, StorageError, StoreError};
pub use model::{Task, now_ms};
pub use store::TaskStore;
