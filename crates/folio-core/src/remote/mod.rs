//! Remote post store
//!
//! The remote side is a table-shaped resource shared by many clients. It is
//! reached through the [`RemoteTable`] trait so the store logic can run
//! against the hosted PostgREST table ([`RestTable`]) or an in-process
//! table ([`MemoryTable`]).
//!
//! Slug uniqueness is enforced by the table itself. [`RemoteStore`] checks
//! for a free slug before writing and moves to the next suffix when a
//! concurrent writer wins the race, giving up after a fixed number of
//! candidates.

mod error;
mod memory;
mod rest;
mod row;
mod store;
mod table;

pub use error::{RemoteError, RemoteResult};
pub use memory::MemoryTable;
pub use rest::{filter_params, query_params, RestTable};
pub use row::{columns, RemoteInsert, RemotePatch, RemoteRow};
pub use store::{RemoteStore, MAX_SLUG_ATTEMPTS};
pub use table::{Filter, Order, Query, RemoteTable};
