//! Object-store access for skiff.
//!
//! This crate defines the [`ObjectStore`] trait for the remote chunk and
//! index namespaces, along with three implementations:
//!
//! - [`S3Store`] — signed HEAD/GET/PUT against an S3-dialect HTTP endpoint.
//! - [`MemoryStore`] — in-memory store that records operation counts, used
//!   as the test double.
//! - [`SlowStore`] — wrapper that injects seeded random latency, used to
//!   exercise ordering under concurrency.

mod error;
mod memory_store;
mod s3;
mod sign;
mod slow_store;
mod traits;

pub use error::StoreError;
pub use memory_store::{MemoryStore, OpCounts};
pub use s3::{S3Config, S3Store};
pub use sign::Credentials;
pub use slow_store::SlowStore;
pub use traits::ObjectStore;
