use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use stitch_kit_core::models::{Project, ProjectStatus};

use super::{join_tags, split_tags};

pub struct ProjectRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: String,
    name: String,
    description: String,
    status: String,
    pattern_id: Option<String>,
    due_date: Option<String>,
    tags: String,
    created_by: String,
    created_at: String,
    updated_at: String,
}

#[derive(sqlx::FromRow)]
struct FabricIdRow {
    fabric_id: String,
}

impl ProjectRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, project: &Project) -> Result<Project, sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO projects (id, name, description, status, pattern_id, due_date, tags, created_by, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(project.id.to_string())
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.status.to_string())
        .bind(project.pattern_id.map(|id| id.to_string()))
        .bind(project.due_date.map(|d| d.to_string()))
        .bind(join_tags(&project.tags))
        .bind(&project.created_by)
        .bind(project.created_at.to_rfc3339())
        .bind(project.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        for fabric_id in &project.fabric_ids {
            self.add_fabric(project.id, *fabric_id).await?;
        }

        self.get_by_id(project.id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Project>, sqlx::Error> {
        let row: Option<ProjectRow> = sqlx::query_as("SELECT * FROM projects WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => self.hydrate_project(row).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn list(&self) -> Result<Vec<Project>, sqlx::Error> {
        let rows: Vec<ProjectRow> =
            sqlx::query_as("SELECT * FROM projects ORDER BY created_at")
                .fetch_all(&self.pool)
                .await?;

        let mut projects = Vec::with_capacity(rows.len());
        for row in rows {
            projects.push(self.hydrate_project(row).await?);
        }
        Ok(projects)
    }

    pub async fn list_by_status(
        &self,
        status: ProjectStatus,
    ) -> Result<Vec<Project>, sqlx::Error> {
        let rows: Vec<ProjectRow> =
            sqlx::query_as("SELECT * FROM projects WHERE status = ? ORDER BY created_at")
                .bind(status.to_string())
                .fetch_all(&self.pool)
                .await?;

        let mut projects = Vec::with_capacity(rows.len());
        for row in rows {
            projects.push(self.hydrate_project(row).await?);
        }
        Ok(projects)
    }

    pub async fn set_status(
        &self,
        id: Uuid,
        status: ProjectStatus,
    ) -> Result<Option<Project>, sqlx::Error> {
        sqlx::query("UPDATE projects SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        self.get_by_id(id).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn add_fabric(&self, project_id: Uuid, fabric_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT OR IGNORE INTO project_fabrics (project_id, fabric_id) VALUES (?, ?)",
        )
        .bind(project_id.to_string())
        .bind(fabric_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn hydrate_project(&self, row: ProjectRow) -> Result<Project, sqlx::Error> {
        // Get associated fabric IDs
        let fabric_id_rows: Vec<FabricIdRow> =
            sqlx::query_as("SELECT fabric_id FROM project_fabrics WHERE project_id = ?")
                .bind(&row.id)
                .fetch_all(&self.pool)
                .await?;

        let fabric_ids: Vec<Uuid> = fabric_id_rows
            .into_iter()
            .filter_map(|r| Uuid::parse_str(&r.fabric_id).ok())
            .collect();

        let status: ProjectStatus = row.status.parse().unwrap_or(ProjectStatus::Planned);

        Ok(Project {
            id: Uuid::parse_str(&row.id).unwrap_or_default(),
            name: row.name,
            description: row.description,
            status,
            pattern_id: row
                .pattern_id
                .and_then(|id| Uuid::parse_str(&id).ok()),
            fabric_ids,
            due_date: row
                .due_date
                .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
            tags: split_tags(&row.tags),
            created_by: row.created_by,
            created_at: parse_timestamp(&row.created_at),
            updated_at: parse_timestamp(&row.updated_at),
        })
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

    async fn test_repo() -> (ProjectRepository, tempfile::TempDir) {
        let temp_dir = tempdir().unwrap();
        let pool = init_db(&temp_dir.path().join("test.db")).await.unwrap();
        (ProjectRepository::new(pool), temp_dir)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (repo, _temp) = test_repo().await;
        let project = Project::new("Linen shift dress", "erin")
            .with_description("Summer wardrobe")
            .with_tags(vec!["summer".to_string()]);

        let created = repo.create(&project).await.unwrap();
        assert_eq!(created.name, "Linen shift dress");
        assert_eq!(created.tags, vec!["summer"]);

        let fetched = repo.get_by_id(project.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, project.id);
        assert_eq!(fetched.status, ProjectStatus::Planned);
    }

    #[tokio::test]
    async fn test_fabric_associations_roundtrip() {
        let (repo, _temp) = test_repo().await;
        let fabric_ids = vec![Uuid::new_v4(), Uuid::new_v4()];
        let project = Project::new("Quilted jacket", "erin").with_fabrics(fabric_ids.clone());

        let created = repo.create(&project).await.unwrap();
        assert_eq!(created.fabric_ids.len(), 2);
        for id in fabric_ids {
            assert!(created.fabric_ids.contains(&id));
        }
    }

    #[tokio::test]
    async fn test_set_status() {
        let (repo, _temp) = test_repo().await;
        let project = Project::new("Tote bag", "erin");
        repo.create(&project).await.unwrap();

        let updated = repo
            .set_status(project.id, ProjectStatus::Finished)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, ProjectStatus::Finished);
        assert!(updated.updated_at >= project.updated_at);
    }

    #[tokio::test]
    async fn test_list_by_status() {
        let (repo, _temp) = test_repo().await;
        repo.create(&Project::new("A", "erin")).await.unwrap();
        repo.create(&Project::new("B", "erin").with_status(ProjectStatus::Finished))
            .await
            .unwrap();

        let planned = repo.list_by_status(ProjectStatus::Planned).await.unwrap();
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].name, "A");
    }

    #[tokio::test]
    async fn test_delete() {
        let (repo, _temp) = test_repo().await;
        let project = Project::new("Wadder", "erin");
        repo.create(&project).await.unwrap();

        assert!(repo.delete(project.id).await.unwrap());
        assert!(!repo.delete(project.id).await.unwrap());
        assert!(repo.get_by_id(project.id).await.unwrap().is_none());
    }
}
