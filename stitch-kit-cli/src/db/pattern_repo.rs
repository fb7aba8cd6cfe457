use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use stitch_kit_core::models::Pattern;

use super::{join_tags, split_tags};

pub struct PatternRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct PatternRow {
    id: String,
    name: String,
    brand: String,
    number: Option<String>,
    sizes: String,
    pieces: Option<i32>,
    notes: String,
    tags: String,
    image_url: Option<String>,
    created_by: String,
    created_at: String,
    updated_at: String,
}

impl PatternRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, pattern: &Pattern) -> Result<Pattern, sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO patterns (id, name, brand, number, sizes, pieces, notes, tags, image_url, created_by, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(pattern.id.to_string())
        .bind(&pattern.name)
        .bind(&pattern.brand)
        .bind(&pattern.number)
        .bind(pattern.sizes.join(","))
        .bind(pattern.pieces)
        .bind(&pattern.notes)
        .bind(join_tags(&pattern.tags))
        .bind(&pattern.image_url)
        .bind(&pattern.created_by)
        .bind(pattern.created_at.to_rfc3339())
        .bind(pattern.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.get_by_id(pattern.id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Pattern>, sqlx::Error> {
        let row: Option<PatternRow> = sqlx::query_as("SELECT * FROM patterns WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(hydrate_pattern))
    }

    pub async fn list(&self) -> Result<Vec<Pattern>, sqlx::Error> {
        let rows: Vec<PatternRow> =
            sqlx::query_as("SELECT * FROM patterns ORDER BY brand, name")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(hydrate_pattern).collect())
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM patterns WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn hydrate_pattern(row: PatternRow) -> Pattern {
    Pattern {
        id: Uuid::parse_str(&row.id).unwrap_or_default(),
        name: row.name,
        brand: row.brand,
        number: row.number,
        sizes: split_tags(&row.sizes),
        pieces: row.pieces,
        notes: row.notes,
        tags: split_tags(&row.tags),
        image_url: row.image_url,
        created_by: row.created_by,
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use tempfile::tempdir;

    async fn test_repo() -> (PatternRepository, tempfile::TempDir) {
        let temp_dir = tempdir().unwrap();
        let pool = init_db(&temp_dir.path().join("test.db")).await.unwrap();
        (PatternRepository::new(pool), temp_dir)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (repo, _temp) = test_repo().await;
        let pattern = Pattern::new("Wrap skirt", "Burda", "erin")
            .with_number("6401")
            .with_sizes(vec!["34".to_string(), "36".to_string()]);

        repo.create(&pattern).await.unwrap();

        let fetched = repo.get_by_id(pattern.id).await.unwrap().unwrap();
        assert_eq!(fetched.label(), "Burda 6401");
        assert_eq!(fetched.sizes, vec!["34", "36"]);
    }

    #[tokio::test]
    async fn test_list_orders_by_brand() {
        let (repo, _temp) = test_repo().await;
        repo.create(&Pattern::new("Culottes", "Vogue", "erin"))
            .await
            .unwrap();
        repo.create(&Pattern::new("Shift dress", "Burda", "erin"))
            .await
            .unwrap();

        let patterns = repo.list().await.unwrap();
        assert_eq!(patterns.len(), 2);
        assert_eq!(patterns[0].brand, "Burda");
    }

    #[tokio::test]
    async fn test_delete_missing_is_false() {
        let (repo, _temp) = test_repo().await;
        assert!(!repo.delete(Uuid::new_v4()).await.unwrap());
    }
}
