//! [`Collection`] over a PostgreSQL table.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::unique::Collection;
use crate::db::StoreError;

/// A table whose whitelisted plaintext columns can be checked for equality.
///
/// Field names are matched against `fields` and never interpolated from the
/// caller. Encrypted columns must not be listed: `pgp_sym_encrypt` output is
/// randomised, so equality on ciphertext never matches.
#[derive(Debug, Clone)]
pub struct PgCollection {
    pool: PgPool,
    table: &'static str,
    fields: &'static [&'static str],
}

impl PgCollection {
    /// Create a collection over `table` that accepts queries on `fields`.
    pub fn new(pool: PgPool, table: &'static str, fields: &'static [&'static str]) -> Self {
        Self {
            pool,
            table,
            fields,
        }
    }

    fn column(&self, field: &str) -> Result<&'static str, StoreError> {
        self.fields
            .iter()
            .copied()
            .find(|f| *f == field)
            .ok_or_else(|| StoreError::UnknownField(field.to_owned()))
    }

    fn first_match_query(&self, column: &'static str, value: &str) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT id FROM ");
        qb.push(self.table)
            .push(" WHERE ")
            .push(column)
            .push(" = ")
            .push_bind(value.to_owned())
            .push(" LIMIT 1");
        qb
    }
}

#[async_trait]
impl Collection for PgCollection {
    async fn first_match(&self, field: &str, value: &str) -> Result<Option<Uuid>, StoreError> {
        let column = self.column(field)?;
        let mut qb = self.first_match_query(column, value);
        let row: Option<(Uuid,)> = qb.build_query_as().fetch_optional(&self.pool).await?;
        Ok(row.map(|(id,)| id))
    }
}
