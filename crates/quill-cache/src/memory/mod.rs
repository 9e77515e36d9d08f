//! In-process backing store.

pub mod store;

pub use store::MemoryCacheProvider;
