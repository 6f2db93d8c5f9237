//! Request handlers. Controllers validate input, choose the transaction
//! boundary and translate service results into responses; the route tables in
//! [`crate::routes`] only bind paths to them.

pub mod auth;
pub mod logs;
