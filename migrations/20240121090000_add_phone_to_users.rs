//! Alter the `users` table

use strata::migration::Migration;
use strata::schema::SchemaGateway;
use strata::StrataError;

pub struct AddPhoneToUsers;

impl Migration for AddPhoneToUsers {
    fn up(&self, schema: &SchemaGateway<'_>) -> Result<(), StrataError> {
        schema.alter_table("users", |table| {
            table.string("phone", 20).nullable().after("email");
        })
    }

    fn down(&self, schema: &SchemaGateway<'_>) -> Result<(), StrataError> {
        schema.drop_column("users", "phone")
    }
}
