//! Core traits defined in `quill-core` and implemented by other crates.

pub mod cache;
pub mod clock;
pub mod users;

pub use cache::CacheProvider;
pub use clock::{Clock, ManualClock, SystemClock};
pub use users::{UserAccount, UserDirectory};
