//! Server-side session records and their backing store.

mod model;
mod store;

pub use model::{Session, SessionMetadata};
pub use store::SessionStore;
