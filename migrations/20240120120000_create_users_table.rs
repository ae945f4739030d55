//! Create the `users` table

use strata::migration::Migration;
use strata::schema::SchemaGateway;
use strata::StrataError;

pub struct CreateUsersTable;

impl Migration for CreateUsersTable {
    fn up(&self, schema: &SchemaGateway<'_>) -> Result<(), StrataError> {
        schema.create("users", |table| {
            table.id("id");
            table.string("name", 255);
            table.string("email", 255);
            table.boolean("active").default(true);
            table.unique(&["email"]);
            table.timestamps();
        })
    }

    fn down(&self, schema: &SchemaGateway<'_>) -> Result<(), StrataError> {
        schema.drop_if_exists("users")
    }
}
