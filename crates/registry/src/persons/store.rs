//! [`PgPersonStore`]: `persons` table access with encrypted name columns.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{NewPerson, Person, PersonKey, PersonStore, KEY_FIELD, TABLE};
use crate::crypto::{ColumnError, EncryptedColumn, Passphrase};
use crate::db::StoreError;
use crate::validation::{Collection, PgCollection};

/// Plaintext columns that may be checked for uniqueness.
const QUERYABLE_FIELDS: &[&str] = &[KEY_FIELD];

/// Postgres-backed [`PersonStore`].
///
/// Every statement that touches `first_name` or `last_name` goes through an
/// [`EncryptedColumn`], so plaintext names only ever travel as bind parameters
/// and result values.
#[derive(Debug, Clone)]
pub struct PgPersonStore {
    pool: PgPool,
    keys: PgCollection,
    first_name: EncryptedColumn,
    last_name: EncryptedColumn,
}

impl PgPersonStore {
    /// Build a store over `pool`, encrypting names with `passphrase`.
    ///
    /// # Errors
    ///
    /// Returns [`ColumnError::EmptyPassphrase`] if `passphrase` is blank.
    pub fn new(
        pool: PgPool,
        passphrase: Passphrase,
        max_name_len: usize,
    ) -> Result<Self, ColumnError> {
        Ok(Self {
            keys: PgCollection::new(pool.clone(), TABLE, QUERYABLE_FIELDS),
            first_name: EncryptedColumn::new("first_name", passphrase.clone(), Some(max_name_len))?,
            last_name: EncryptedColumn::new("last_name", passphrase, Some(max_name_len))?,
            pool,
        })
    }

    /// `RETURNING`/`SELECT` column list with decrypted names.
    fn push_columns(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        qb.push("id, key, ");
        self.first_name.push_decrypt(qb);
        qb.push(" AS first_name, ");
        self.last_name.push_decrypt(qb);
        qb.push(" AS last_name");
    }

    fn select_query(&self, id: Uuid) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT ");
        self.push_columns(&mut qb);
        qb.push(" FROM ")
            .push(TABLE)
            .push(" WHERE id = ")
            .push_bind(id);
        qb
    }

    fn key_query(id: Uuid) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT id, key FROM ");
        qb.push(TABLE).push(" WHERE id = ").push_bind(id);
        qb
    }

    fn insert_query(
        &self,
        id: Uuid,
        person: &NewPerson,
    ) -> Result<QueryBuilder<'static, Postgres>, ColumnError> {
        let mut qb = QueryBuilder::new("INSERT INTO ");
        qb.push(TABLE)
            .push(" (id, key, first_name, last_name) VALUES (")
            .push_bind(id)
            .push(", ")
            .push_bind(person.key.clone())
            .push(", ");
        self.first_name.push_encrypt(&mut qb, &person.first_name)?;
        qb.push(", ");
        self.last_name.push_encrypt(&mut qb, &person.last_name)?;
        qb.push(") RETURNING ");
        self.push_columns(&mut qb);
        Ok(qb)
    }

    fn update_query(
        &self,
        id: Uuid,
        person: &NewPerson,
    ) -> Result<QueryBuilder<'static, Postgres>, ColumnError> {
        let mut qb = QueryBuilder::new("UPDATE ");
        qb.push(TABLE)
            .push(" SET key = ")
            .push_bind(person.key.clone())
            .push(", first_name = ");
        self.first_name.push_encrypt(&mut qb, &person.first_name)?;
        qb.push(", last_name = ");
        self.last_name.push_encrypt(&mut qb, &person.last_name)?;
        qb.push(", updated_at = now() WHERE id = ")
            .push_bind(id)
            .push(" RETURNING ");
        self.push_columns(&mut qb);
        Ok(qb)
    }
}

#[async_trait]
impl Collection for PgPersonStore {
    async fn first_match(&self, field: &str, value: &str) -> Result<Option<Uuid>, StoreError> {
        self.keys.first_match(field, value).await
    }
}

#[async_trait]
impl PersonStore for PgPersonStore {
    async fn get(&self, id: Uuid) -> Result<Option<Person>, StoreError> {
        let mut qb = self.select_query(id);
        let person = qb
            .build_query_as::<Person>()
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from_decrypt)?;
        Ok(person)
    }

    async fn find_key(&self, id: Uuid) -> Result<Option<PersonKey>, StoreError> {
        let mut qb = Self::key_query(id);
        let key = qb
            .build_query_as::<PersonKey>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(key)
    }

    async fn insert(&self, person: &NewPerson) -> Result<Person, StoreError> {
        let mut qb = self.insert_query(Uuid::new_v4(), person)?;
        let person = qb
            .build_query_as::<Person>()
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::from_decrypt)?;
        Ok(person)
    }

    async fn update(&self, id: Uuid, person: &NewPerson) -> Result<Option<Person>, StoreError> {
        let mut qb = self.update_query(id, person)?;
        let person = qb
            .build_query_as::<Person>()
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from_decrypt)?;
        Ok(person)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    const OPTIONS: &str = "'compress-algo=1, cipher-algo=aes256'";

    fn lazy_store() -> PgPersonStore {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        PgPersonStore::new(pool, Passphrase::from("s3cret"), 255).unwrap()
    }

    fn ada(key: &str) -> NewPerson {
        NewPerson {
            key: key.into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
        }
    }

    #[tokio::test]
    async fn select_decrypts_both_name_columns() {
        let qb = lazy_store().select_query(Uuid::nil());
        assert_eq!(
            qb.sql(),
            "SELECT id, key, pgp_sym_decrypt(first_name, $1) AS first_name, \
             pgp_sym_decrypt(last_name, $2) AS last_name FROM persons WHERE id = $3"
        );
    }

    #[test]
    fn key_lookup_reads_no_ciphertext() {
        let qb = PgPersonStore::key_query(Uuid::nil());
        assert_eq!(qb.sql(), "SELECT id, key FROM persons WHERE id = $1");
    }

    #[tokio::test]
    async fn insert_encrypts_names_and_returns_plaintext_view() {
        let qb = lazy_store().insert_query(Uuid::nil(), &ada("ABC123")).unwrap();
        let expected = format!(
            "INSERT INTO persons (id, key, first_name, last_name) VALUES ($1, $2, \
             pgp_sym_encrypt($3, $4, {OPTIONS}), pgp_sym_encrypt($5, $6, {OPTIONS})) \
             RETURNING id, key, pgp_sym_decrypt(first_name, $7) AS first_name, \
             pgp_sym_decrypt(last_name, $8) AS last_name"
        );
        assert_eq!(qb.sql(), expected);
        assert!(!qb.sql().contains("Lovelace"));
    }

    #[tokio::test]
    async fn update_touches_timestamp_and_filters_by_id() {
        let qb = lazy_store().update_query(Uuid::nil(), &ada("ABC123")).unwrap();
        assert!(qb.sql().starts_with("UPDATE persons SET key = $1, first_name = pgp_sym_encrypt($2, $3, "));
        assert!(qb.sql().contains("updated_at = now() WHERE id = $6 RETURNING"));
    }

    #[tokio::test]
    async fn over_long_name_is_rejected_before_sending() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        let store = PgPersonStore::new(pool, Passphrase::from("s3cret"), 3).unwrap();
        let err = store.insert(&ada("ABC123")).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Column(ColumnError::TooLong { column: "last_name", max: 3 })
        ));
    }

    #[tokio::test]
    async fn blank_passphrase_is_refused() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        assert!(PgPersonStore::new(pool, Passphrase::from(""), 255).is_err());
    }

    // -----------------------------------------------------------------------
    // Live database: `TEST_DATABASE_URL=postgres://... cargo test -- --ignored`
    // -----------------------------------------------------------------------

    async fn live_pool() -> PgPool {
        let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
        let pool = PgPool::connect(&url).await.unwrap();
        crate::db::migrate(&pool).await.unwrap();
        pool
    }

    fn unique_key() -> String {
        format!("test-{}", Uuid::new_v4())
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL with pgcrypto"]
    async fn names_round_trip_through_the_database() {
        let store = PgPersonStore::new(live_pool().await, Passphrase::from("s3cret"), 255).unwrap();
        let input = NewPerson {
            key: unique_key(),
            first_name: "Zoë".into(),
            last_name: "O'Brien-Łukasz".into(),
        };
        let created = store.insert(&input).await.unwrap();
        let loaded = store.get(created.id).await.unwrap().unwrap();
        assert_eq!(loaded.first_name, input.first_name);
        assert_eq!(loaded.last_name, input.last_name);
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL with pgcrypto"]
    async fn stored_bytes_are_ciphertext() {
        let pool = live_pool().await;
        let store = PgPersonStore::new(pool.clone(), Passphrase::from("s3cret"), 255).unwrap();
        let created = store.insert(&ada(&unique_key())).await.unwrap();
        let (raw,): (Vec<u8>,) = sqlx::query_as("SELECT first_name FROM persons WHERE id = $1")
            .bind(created.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert!(!raw.windows(3).any(|w| w == b"Ada"));
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL with pgcrypto"]
    async fn tampered_ciphertext_is_an_integrity_error() {
        let pool = live_pool().await;
        let store = PgPersonStore::new(pool.clone(), Passphrase::from("s3cret"), 255).unwrap();
        let created = store.insert(&ada(&unique_key())).await.unwrap();
        sqlx::query(
            "UPDATE persons SET first_name = \
             set_byte(first_name, length(first_name) - 4, get_byte(first_name, length(first_name) - 4) # 255) \
             WHERE id = $1",
        )
        .bind(created.id)
        .execute(&pool)
        .await
        .unwrap();
        let err = store.get(created.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Integrity(_)), "got {err:?}");
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL with pgcrypto"]
    async fn corrupt_record_can_be_overwritten() {
        let pool = live_pool().await;
        let writer = PgPersonStore::new(pool.clone(), Passphrase::from("old"), 255).unwrap();
        let store = PgPersonStore::new(pool, Passphrase::from("s3cret"), 255).unwrap();
        let created = writer.insert(&ada(&unique_key())).await.unwrap();
        assert!(matches!(store.get(created.id).await, Err(StoreError::Integrity(_))));

        let key = store.find_key(created.id).await.unwrap().unwrap();
        assert_eq!(key.key, created.key);
        let repaired = store
            .update(created.id, &ada(&created.key))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(repaired.first_name, "Ada");
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL with pgcrypto"]
    async fn wrong_passphrase_is_an_integrity_error() {
        let pool = live_pool().await;
        let writer = PgPersonStore::new(pool.clone(), Passphrase::from("s3cret"), 255).unwrap();
        let reader = PgPersonStore::new(pool, Passphrase::from("other"), 255).unwrap();
        let created = writer.insert(&ada(&unique_key())).await.unwrap();
        let err = reader.get(created.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Integrity(_)), "got {err:?}");
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL with pgcrypto"]
    async fn duplicate_key_hits_the_constraint() {
        let store = PgPersonStore::new(live_pool().await, Passphrase::from("s3cret"), 255).unwrap();
        let key = unique_key();
        store.insert(&ada(&key)).await.unwrap();
        assert!(store.first_match(KEY_FIELD, &key).await.unwrap().is_some());
        let err = store.insert(&ada(&key)).await.unwrap_err();
        assert!(
            matches!(err, StoreError::Conflict(Some(ref c)) if c == crate::persons::KEY_CONSTRAINT),
            "got {err:?}"
        );
    }
}
