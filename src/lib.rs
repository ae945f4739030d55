//! # Strata
//!
//! Blueprint-driven schema migrations for MySQL.
//!
//! - [`schema`]: the table blueprint DSL, its DDL compiler and the [`SchemaGateway`](schema::SchemaGateway)
//! - [`inspect`]: catalog reads normalized into the blueprint model
//! - [`migration`]: artifacts, the batch ledger and the [`MigrationManager`](migration::MigrationManager)
//! - [`generator`]: new artifacts, blank or reconstructed from live tables
//!
//! Everything runs synchronously through a [`StrataExecutor`]; [`connect`] opens the MySQL one.

pub mod config;
pub mod connection;
pub mod executor;
pub mod generator;
pub mod inspect;
pub mod migration;
pub mod pretend;
pub mod schema;
#[cfg(any(test, feature = "mock"))]
pub mod testing;
pub mod transaction;
pub mod value;

pub use config::StrataConfig;
#[cfg(feature = "mysql")]
pub use connection::connect;
pub use connection::ConnectionError;
#[cfg(feature = "mysql")]
pub use executor::MySqlExecutor;
pub use executor::{StrataError, StrataExecutor};
pub use transaction::Transaction;
pub use value::{Row, SqlValue};
