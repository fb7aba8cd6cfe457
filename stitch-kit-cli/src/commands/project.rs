use chrono::NaiveDate;
use clap::{Args, Subcommand};
use uuid::Uuid;

use stitch_kit_core::models::{Project, ProjectStatus};
use stitch_kit_core::offline::OperationKind;

use super::{confirm, OutputFormat};
use crate::config::Config;
use crate::db::{init_db, ProjectRepository};
use crate::sync::SyncContext;

/// Manage sewing projects
#[derive(Args)]
pub struct ProjectCommand {
    #[command(subcommand)]
    pub command: ProjectSubcommand,
}

#[derive(Subcommand)]
pub enum ProjectSubcommand {
    /// Add a new project
    Add {
        /// Project name
        name: String,

        /// Description
        #[arg(long, short)]
        description: Option<String>,

        /// Pattern ID (UUID)
        #[arg(long)]
        pattern: Option<String>,

        /// Assign a fabric by ID (can be repeated)
        #[arg(long = "fabric", value_name = "FABRIC_ID")]
        fabrics: Vec<String>,

        /// Target completion date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,

        /// Tag (can be repeated)
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,
    },

    /// List projects
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Filter by status (planned, in-progress, finished, abandoned)
        #[arg(long, short)]
        status: Option<String>,

        /// Read the last synced snapshot instead of the local database
        #[arg(long)]
        cached: bool,
    },

    /// Show project details
    Show {
        /// Project ID (UUID)
        id: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Change a project's status
    Status {
        /// Project ID (UUID)
        id: String,

        /// New status (planned, in-progress, finished, abandoned)
        status: String,
    },

    /// Delete a project
    Delete {
        /// Project ID (UUID)
        id: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl ProjectCommand {
    pub fn is_read(&self) -> bool {
        matches!(
            self.command,
            ProjectSubcommand::List { .. } | ProjectSubcommand::Show { .. }
        )
    }

    pub fn is_write(&self) -> bool {
        !self.is_read()
    }

    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.execute(config))
    }

    async fn execute(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let ctx = SyncContext::open(config)?;

        match &self.command {
            ProjectSubcommand::Add {
                name,
                description,
                pattern,
                fabrics,
                due,
                tags,
            } => {
                let mut project = Project::new(name, &config.created_by.value);
                if let Some(description) = description {
                    project = project.with_description(description);
                }
                if let Some(pattern) = pattern {
                    project = project.with_pattern(Uuid::parse_str(pattern)?);
                }
                if !fabrics.is_empty() {
                    let ids = fabrics
                        .iter()
                        .map(|f| Uuid::parse_str(f))
                        .collect::<Result<Vec<_>, _>>()?;
                    project = project.with_fabrics(ids);
                }
                if let Some(due) = due {
                    project = project.with_due_date(NaiveDate::parse_from_str(due, "%Y-%m-%d")?);
                }
                if !tags.is_empty() {
                    project = project.with_tags(tags.clone());
                }

                let repo = repository(config).await?;
                let created = repo.create(&project).await?;
                ctx.record_mutation(
                    OperationKind::Create,
                    "project",
                    created.id,
                    Some(serde_json::to_vec(&created)?),
                )
                .await?;

                println!("Created project '{}' ({})", created.name, created.id);
                Ok(())
            }

            ProjectSubcommand::List {
                format,
                status,
                cached,
            } => {
                let projects = if *cached {
                    match ctx.cache.load::<Project>("projects").await {
                        Some(projects) => {
                            println!("(from cache)");
                            projects
                        }
                        None => {
                            println!("No cached snapshot. Run 'stitch sync pull' while online.");
                            return Ok(());
                        }
                    }
                } else {
                    let repo = repository(config).await?;
                    match status {
                        Some(status) => repo.list_by_status(status.parse::<ProjectStatus>()?).await?,
                        None => repo.list().await?,
                    }
                };

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&projects)?)
                    }
                    OutputFormat::Text => {
                        if projects.is_empty() {
                            println!("No projects.");
                        }
                        for project in &projects {
                            println!("{}  {:<12} {}", project.id, project.status, project.name);
                        }
                    }
                }
                Ok(())
            }

            ProjectSubcommand::Show { id, format } => {
                let repo = repository(config).await?;
                let project = repo
                    .get_by_id(Uuid::parse_str(id)?)
                    .await?
                    .ok_or_else(|| format!("Project not found: {}", id))?;

                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&project)?),
                    OutputFormat::Text => {
                        println!("{} ({})", project.name, project.id);
                        println!("  status:   {}", project.status);
                        if !project.description.is_empty() {
                            println!("  about:    {}", project.description);
                        }
                        if let Some(pattern_id) = project.pattern_id {
                            println!("  pattern:  {}", pattern_id);
                        }
                        for fabric_id in &project.fabric_ids {
                            println!("  fabric:   {}", fabric_id);
                        }
                        if let Some(due) = project.due_date {
                            println!("  due:      {}", due);
                        }
                        if !project.tags.is_empty() {
                            println!("  tags:     {}", project.tags.join(", "));
                        }
                    }
                }
                Ok(())
            }

            ProjectSubcommand::Status { id, status } => {
                let repo = repository(config).await?;
                let updated = repo
                    .set_status(Uuid::parse_str(id)?, status.parse::<ProjectStatus>()?)
                    .await?
                    .ok_or_else(|| format!("Project not found: {}", id))?;
                ctx.record_mutation(
                    OperationKind::Update,
                    "project",
                    updated.id,
                    Some(serde_json::to_vec(&updated)?),
                )
                .await?;

                println!("'{}' is now {}", updated.name, updated.status);
                Ok(())
            }

            ProjectSubcommand::Delete { id, force } => {
                let id = Uuid::parse_str(id)?;
                let repo = repository(config).await?;
                let project = repo
                    .get_by_id(id)
                    .await?
                    .ok_or_else(|| format!("Project not found: {}", id))?;

                if !force && !confirm(&format!("Delete project '{}'?", project.name)) {
                    println!("Aborted.");
                    return Ok(());
                }

                repo.delete(id).await?;
                ctx.record_mutation(OperationKind::Delete, "project", id, None)
                    .await?;

                println!("Deleted project '{}'", project.name);
                Ok(())
            }
        }
    }
}

async fn repository(config: &Config) -> Result<ProjectRepository, sqlx::Error> {
    let pool = init_db(&config.database_path.value).await?;
    Ok(ProjectRepository::new(pool))
}
