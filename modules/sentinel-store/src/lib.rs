//! Idempotent persistent queue for raw ingested items, backed by Postgres.
//! See §4.2.

pub mod store;

pub use store::{RawRow, RawStore};
