//! Dry-run executor
//!
//! Writes are captured instead of executed; reads go through to the wrapped executor so
//! migrations that branch on `has_table`/`has_column` still see the real schema.

use crate::executor::{StrataError, StrataExecutor};
use crate::value::{Row, SqlValue};
use std::cell::RefCell;

pub struct PretendExecutor<'a> {
    inner: &'a dyn StrataExecutor,
    captured: RefCell<Vec<String>>,
}

impl<'a> PretendExecutor<'a> {
    pub fn new(inner: &'a dyn StrataExecutor) -> Self {
        Self {
            inner,
            captured: RefCell::new(Vec::new()),
        }
    }

    /// Drain the statements captured so far
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.captured.borrow_mut())
    }
}

impl StrataExecutor for PretendExecutor<'_> {
    fn execute(&self, sql: &str, _params: &[SqlValue]) -> Result<u64, StrataError> {
        self.captured.borrow_mut().push(sql.to_string());
        Ok(0)
    }

    fn query_all(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, StrataError> {
        self.inner.query_all(sql, params)
    }

    fn begin(&self) -> Result<(), StrataError> {
        Ok(())
    }

    fn commit(&self) -> Result<(), StrataError> {
        Ok(())
    }

    fn rollback(&self) -> Result<(), StrataError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::schema::SchemaGateway;
    use crate::testing::MemoryExecutor;

    #[test]
    fn test_writes_are_captured_reads_forwarded() {
        let real = MemoryExecutor::new();
        SchemaGateway::new(&real)
            .create("users", |t| {
                t.id("id");
            })
            .unwrap();

        let pretend = PretendExecutor::new(&real);
        let schema = SchemaGateway::new(&pretend);
        assert!(schema.has_table("users").unwrap());
        schema.drop("users").unwrap();

        assert_eq!(pretend.take(), vec!["DROP TABLE `users`"]);
        assert!(pretend.take().is_empty());
        assert!(real.has_table("users"));
    }
}
