//! fsassert-store: Remote Store Abstraction
//!
//! The durable, path-addressed store that sits between a running job and the
//! process that later reads its verdict. Neither side shares memory with the
//! other; this store is the only thing they have in common.
//!
//! ## Key Components
//!
//! - `RemoteStore`: async trait over whole-object replacement stores
//! - `RemotePath`: validated, store-addressable handle for a path
//! - `LocalFileStore`: a rooted directory on the local filesystem
//! - `fakes::MemoryStore`: in-memory store with an operation log (testing)

mod error;
pub mod fakes;
pub mod local;
pub mod store_traits;

pub use error::StoreError;
pub use local::LocalFileStore;
pub use store_traits::{RemotePath, RemoteStore, StoreResult};
