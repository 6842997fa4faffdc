//! # Vera-Session
//!
//! Time-bounded survey sessions and the expiry batch that turns their raw
//! responses into synthetic data before deleting them.
//!
//! Session identifiers are passed explicitly through every call; there is no
//! ambient "current session".

pub mod retention;
pub mod session;
pub mod store;

pub use retention::*;
pub use session::*;
pub use store::*;
