//! Service layer: the local storage engine behind the retail application.
//! - `storage` emulates table, blob, queue and file-share services on the local filesystem.
//! - Entity definitions and their validation live in the `models` crate.
//! - Errors are reported through `errors::ServiceError`.

pub mod errors;
pub mod runtime;
#[cfg(test)]
pub mod test_support;
pub mod storage;

pub use storage::{LocalStorage, StorageService};
