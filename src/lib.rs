//! Client for sparse, sorted, column-family table stores.
//!
//! A [`TableClient`] is built once from a [`ClientConfig`] and a
//! [`TableStore`], then shared. Requests ([`Put`], [`Get`], [`Delete`],
//! [`Scan`]) are plain values built per call. [`MemoryStore`] is an
//! in-process store for tests and demos.

pub mod admin;
pub mod cell;
pub mod client;
pub mod config;
pub mod descriptor;
pub mod encoding;
pub mod error;
pub mod request;
pub mod scanner;
pub mod store;

pub use admin::Admin;
pub use cell::{Cell, RowResult};
pub use client::{CreateOutcome, TableClient};
pub use config::ClientConfig;
pub use descriptor::{ColumnFamilyDescriptor, TableDescriptor};
pub use error::{Error, ErrorKind, Result};
pub use request::{Action, BatchOutcome, Condition, Delete, Get, Mutation, Put, Scan};
pub use scanner::ResultScanner;
pub use store::{MemoryStore, TableStore};
