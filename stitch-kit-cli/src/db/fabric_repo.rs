use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use stitch_kit_core::models::Fabric;

use super::{join_tags, split_tags};

pub struct FabricRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct FabricRow {
    id: String,
    name: String,
    fiber: String,
    color: String,
    width_cm: Option<i32>,
    length_m: f64,
    weight_gsm: Option<i32>,
    location: Option<String>,
    tags: String,
    created_by: String,
    created_at: String,
    updated_at: String,
}

impl FabricRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, fabric: &Fabric) -> Result<Fabric, sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO fabrics (id, name, fiber, color, width_cm, length_m, weight_gsm, location, tags, created_by, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(fabric.id.to_string())
        .bind(&fabric.name)
        .bind(&fabric.fiber)
        .bind(&fabric.color)
        .bind(fabric.width_cm)
        .bind(fabric.length_m)
        .bind(fabric.weight_gsm)
        .bind(&fabric.location)
        .bind(join_tags(&fabric.tags))
        .bind(&fabric.created_by)
        .bind(fabric.created_at.to_rfc3339())
        .bind(fabric.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.get_by_id(fabric.id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Fabric>, sqlx::Error> {
        let row: Option<FabricRow> = sqlx::query_as("SELECT * FROM fabrics WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(hydrate_fabric))
    }

    pub async fn list(&self) -> Result<Vec<Fabric>, sqlx::Error> {
        let rows: Vec<FabricRow> = sqlx::query_as("SELECT * FROM fabrics ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(hydrate_fabric).collect())
    }

    /// Records usage by shrinking the remaining length, clamped at zero.
    pub async fn set_length(&self, id: Uuid, length_m: f64) -> Result<Option<Fabric>, sqlx::Error> {
        sqlx::query("UPDATE fabrics SET length_m = ?, updated_at = ? WHERE id = ?")
            .bind(length_m.max(0.0))
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        self.get_by_id(id).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM fabrics WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn hydrate_fabric(row: FabricRow) -> Fabric {
    Fabric {
        id: Uuid::parse_str(&row.id).unwrap_or_default(),
        name: row.name,
        fiber: row.fiber,
        color: row.color,
        width_cm: row.width_cm,
        length_m: row.length_m,
        weight_gsm: row.weight_gsm,
        location: row.location,
        tags: split_tags(&row.tags),
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

    async fn test_repo() -> (FabricRepository, tempfile::TempDir) {
        let temp_dir = tempdir().unwrap();
        let pool = init_db(&temp_dir.path().join("test.db")).await.unwrap();
        (FabricRepository::new(pool), temp_dir)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (repo, _temp) = test_repo().await;
        let fabric = Fabric::new("Washed linen", "100% linen", "erin")
            .with_color("rust")
            .with_width_cm(140)
            .with_length_m(2.5);

        repo.create(&fabric).await.unwrap();

        let fetched = repo.get_by_id(fabric.id).await.unwrap().unwrap();
        assert_eq!(fetched.color, "rust");
        assert_eq!(fetched.length_m, 2.5);
    }

    #[tokio::test]
    async fn test_set_length_clamps_at_zero() {
        let (repo, _temp) = test_repo().await;
        let fabric = Fabric::new("Scrap jersey", "cotton", "erin").with_length_m(1.0);
        repo.create(&fabric).await.unwrap();

        let updated = repo.set_length(fabric.id, -0.5).await.unwrap().unwrap();
        assert_eq!(updated.length_m, 0.0);
    }

    #[tokio::test]
    async fn test_list_orders_by_name() {
        let (repo, _temp) = test_repo().await;
        repo.create(&Fabric::new("Wool coating", "wool", "erin"))
            .await
            .unwrap();
        repo.create(&Fabric::new("Cotton lawn", "cotton", "erin"))
            .await
            .unwrap();

        let fabrics = repo.list().await.unwrap();
        assert_eq!(fabrics[0].name, "Cotton lawn");
    }
}
