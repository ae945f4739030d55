//! Schema DSL: column/index/foreign key model, the table blueprint, and the gateway that
//! executes compiled blueprints.

pub mod blueprint;
pub mod column;
pub mod gateway;
pub mod index;

pub use blueprint::{Blueprint, ForeignKeyBuilder, DEFAULT_CHARSET, DEFAULT_COLLATION, DEFAULT_ENGINE};
pub use column::{ColumnDefinition, ColumnType, DefaultValue};
pub use gateway::SchemaGateway;
pub use index::{ForeignKeyDefinition, IndexDefinition, IndexKind, ReferentialAction};
