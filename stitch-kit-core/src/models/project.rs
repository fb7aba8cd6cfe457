use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    Planned,
    InProgress,
    Finished,
    Abandoned,
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectStatus::Planned => write!(f, "planned"),
            ProjectStatus::InProgress => write!(f, "in-progress"),
            ProjectStatus::Finished => write!(f, "finished"),
            ProjectStatus::Abandoned => write!(f, "abandoned"),
        }
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "planned" => Ok(ProjectStatus::Planned),
            "in-progress" | "inprogress" => Ok(ProjectStatus::InProgress),
            "finished" => Ok(ProjectStatus::Finished),
            "abandoned" => Ok(ProjectStatus::Abandoned),
            _ => Err(format!(
                "Invalid project status '{}'. Valid options: planned, in-progress, finished, abandoned",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: ProjectStatus,
    pub pattern_id: Option<Uuid>,
    pub fabric_ids: Vec<Uuid>,
    pub due_date: Option<NaiveDate>,
    pub tags: Vec<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(name: impl Into<String>, created_by: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: String::new(),
            status: ProjectStatus::Planned,
            pattern_id: None,
            fabric_ids: Vec::new(),
            due_date: None,
            tags: Vec::new(),
            created_by: created_by.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_status(mut self, status: ProjectStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_pattern(mut self, pattern_id: Uuid) -> Self {
        self.pattern_id = Some(pattern_id);
        self
    }

    pub fn with_fabrics(mut self, fabric_ids: Vec<Uuid>) -> Self {
        self.fabric_ids = fabric_ids;
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Whether the project still needs work.
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            ProjectStatus::Planned | ProjectStatus::InProgress
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_new_defaults() {
        let project = Project::new("Linen shift dress", "erin");
        assert_eq!(project.name, "Linen shift dress");
        assert_eq!(project.status, ProjectStatus::Planned);
        assert!(project.pattern_id.is_none());
        assert!(project.fabric_ids.is_empty());
        assert_eq!(project.created_at, project.updated_at);
    }

    #[test]
    fn test_project_builder() {
        let pattern_id = Uuid::new_v4();
        let project = Project::new("Quilted jacket", "erin")
            .with_description("Wadder rescue attempt")
            .with_status(ProjectStatus::InProgress)
            .with_pattern(pattern_id)
            .with_tags(vec!["outerwear".to_string()]);

        assert_eq!(project.description, "Wadder rescue attempt");
        assert_eq!(project.status, ProjectStatus::InProgress);
        assert_eq!(project.pattern_id, Some(pattern_id));
        assert_eq!(project.tags, vec!["outerwear"]);
    }

    #[test]
    fn test_is_active() {
        let project = Project::new("Tote bag", "erin");
        assert!(project.is_active());
        assert!(!project.with_status(ProjectStatus::Finished).is_active());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(format!("{}", ProjectStatus::Planned), "planned");
        assert_eq!(format!("{}", ProjectStatus::InProgress), "in-progress");
        assert_eq!(format!("{}", ProjectStatus::Finished), "finished");
        assert_eq!(format!("{}", ProjectStatus::Abandoned), "abandoned");
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!(
            ProjectStatus::from_str("planned").unwrap(),
            ProjectStatus::Planned
        );
        assert_eq!(
            ProjectStatus::from_str("IN-PROGRESS").unwrap(),
            ProjectStatus::InProgress
        );
        assert_eq!(
            ProjectStatus::from_str("inprogress").unwrap(),
            ProjectStatus::InProgress
        );
        assert!(ProjectStatus::from_str("done").is_err());
    }

    #[test]
    fn test_status_json_roundtrip() {
        let status = ProjectStatus::InProgress;
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, "\"in-progress\"");

        let parsed: ProjectStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, status);
    }
}
