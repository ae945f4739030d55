//! Migration trait definition

use crate::executor::StrataError;
use crate::schema::SchemaGateway;

/// Trait that all migrations must implement
///
/// Each artifact file defines a unit struct implementing this trait. The manager runs `up()` or
/// `down()` inside a transaction and records the outcome in the ledger.
///
/// Migrations are synchronous: the gateway issues each statement as it is called.
pub trait Migration {
    /// Apply the migration
    fn up(&self, schema: &SchemaGateway<'_>) -> Result<(), StrataError>;

    /// Revert what `up()` did
    fn down(&self, schema: &SchemaGateway<'_>) -> Result<(), StrataError>;
}
