use async_trait::async_trait;
use serde_json::Value;
use sqlx::{types::Json, PgPool};

use super::{
    document_id, Collection, Document, Filter, RecordStore, Sort, SortDirection, StoreError,
};

/// Documents live in one JSONB table keyed by `(collection, id)`. Equality
/// filters become JSONB containment (`@>`), which matches scalar fields
/// exactly.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

pub async fn create_database_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPool::connect(database_url).await?;

    // Test the connection
    sqlx::query("SELECT 1").fetch_one(&pool).await?;

    log::info!("Connected to database successfully");
    Ok(pool)
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = create_database_pool(database_url).await?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                body JSONB NOT NULL,
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn order_clause(sort: Option<&Sort>) -> Result<String, StoreError> {
    let Some(sort) = sort else {
        return Ok(String::new());
    };
    // The field name is spliced into SQL, so only plain identifiers pass.
    if sort.field.is_empty()
        || !sort
            .field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(StoreError::Malformed(format!(
            "invalid sort field {:?}",
            sort.field
        )));
    }
    let direction = match sort.direction {
        SortDirection::Ascending => "ASC",
        SortDirection::Descending => "DESC",
    };
    Ok(format!(" ORDER BY body->>'{}' {}", sort.field, direction))
}

fn into_document(body: Json<Value>) -> Result<Document, StoreError> {
    match body.0 {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Malformed(format!(
            "stored body is not an object: {}",
            other
        ))),
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        let body = sqlx::query_scalar::<_, Json<Value>>(
            "SELECT body FROM documents WHERE collection = $1 AND body @> $2 LIMIT 1",
        )
        .bind(collection.as_str())
        .bind(Json(filter.as_json()))
        .fetch_optional(&self.pool)
        .await?;

        body.map(into_document).transpose()
    }

    async fn find_many(
        &self,
        collection: Collection,
        filter: &Filter,
        sort: Option<&Sort>,
        limit: Option<usize>,
    ) -> Result<Vec<Document>, StoreError> {
        let sql = format!(
            "SELECT body FROM documents WHERE collection = $1 AND body @> $2{} LIMIT $3",
            order_clause(sort)?
        );
        let rows = sqlx::query_scalar::<_, Json<Value>>(&sql)
            .bind(collection.as_str())
            .bind(Json(filter.as_json()))
            .bind(limit.map(|n| n as i64))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(into_document).collect()
    }

    async fn insert_one(&self, collection: Collection, doc: Document) -> Result<(), StoreError> {
        let id = document_id(&doc)?;
        sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)")
            .bind(collection.as_str())
            .bind(id)
            .bind(Json(Value::Object(doc)))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn replace_one(
        &self,
        collection: Collection,
        filter: &Filter,
        doc: Document,
    ) -> Result<u64, StoreError> {
        document_id(&doc)?;
        let result = sqlx::query(
            r#"
            UPDATE documents SET body = $3
            WHERE collection = $1 AND id = (
                SELECT id FROM documents WHERE collection = $1 AND body @> $2 LIMIT 1
            )
            "#,
        )
        .bind(collection.as_str())
        .bind(Json(filter.as_json()))
        .bind(Json(Value::Object(doc)))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_one(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM documents
            WHERE collection = $1 AND id = (
                SELECT id FROM documents WHERE collection = $1 AND body @> $2 LIMIT 1
            )
            "#,
        )
        .bind(collection.as_str())
        .bind(Json(filter.as_json()))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM documents WHERE collection = $1 AND body @> $2",
        )
        .bind(collection.as_str())
        .bind(Json(filter.as_json()))
        .fetch_one(&self.pool)
        .await?;
        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_clause_accepts_plain_fields_only() {
        assert_eq!(order_clause(None).unwrap(), "");
        assert_eq!(
            order_clause(Some(&Sort::descending("created_at"))).unwrap(),
            " ORDER BY body->>'created_at' DESC"
        );
        assert!(order_clause(Some(&Sort::ascending("x'; DROP TABLE documents; --"))).is_err());
    }
}
