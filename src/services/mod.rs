//! Per-entity data access.
//!
//! The database functions run one statement against the connection they are
//! handed; controllers decide the transaction boundary. `tokens` holds the
//! password and access-token primitives.

pub mod logs;
pub mod sessions;
pub mod tokens;
pub mod users;
