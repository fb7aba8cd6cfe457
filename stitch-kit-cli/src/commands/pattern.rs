use clap::{Args, Subcommand};
use uuid::Uuid;

use stitch_kit_core::models::Pattern;
use stitch_kit_core::offline::OperationKind;

use super::{confirm, OutputFormat};
use crate::config::Config;
use crate::db::{init_db, PatternRepository};
use crate::sync::SyncContext;

/// Manage sewing patterns
#[derive(Args)]
pub struct PatternCommand {
    #[command(subcommand)]
    pub command: PatternSubcommand,
}

#[derive(Subcommand)]
pub enum PatternSubcommand {
    /// Add a pattern to the catalog
    Add {
        /// Pattern name
        name: String,

        /// Brand (e.g. Burda, Vogue, self-drafted)
        brand: String,

        /// Catalog number
        #[arg(long)]
        number: Option<String>,

        /// Size in the envelope (can be repeated)
        #[arg(long = "size", value_name = "SIZE")]
        sizes: Vec<String>,

        /// Number of pattern pieces
        #[arg(long)]
        pieces: Option<i32>,

        /// Notes
        #[arg(long)]
        notes: Option<String>,

        /// Tag (can be repeated)
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,
    },

    /// List patterns
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show pattern details
    Show {
        /// Pattern ID (UUID)
        id: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Delete a pattern
    Delete {
        /// Pattern ID (UUID)
        id: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl PatternCommand {
    pub fn is_read(&self) -> bool {
        matches!(
            self.command,
            PatternSubcommand::List { .. } | PatternSubcommand::Show { .. }
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
        let pool = init_db(&config.database_path.value).await?;
        let repo = PatternRepository::new(pool);

        match &self.command {
            PatternSubcommand::Add {
                name,
                brand,
                number,
                sizes,
                pieces,
                notes,
                tags,
            } => {
                let mut pattern = Pattern::new(name, brand, &config.created_by.value);
                if let Some(number) = number {
                    pattern = pattern.with_number(number);
                }
                if !sizes.is_empty() {
                    pattern = pattern.with_sizes(sizes.clone());
                }
                if let Some(pieces) = pieces {
                    pattern = pattern.with_pieces(*pieces);
                }
                if let Some(notes) = notes {
                    pattern = pattern.with_notes(notes);
                }
                if !tags.is_empty() {
                    pattern = pattern.with_tags(tags.clone());
                }

                let created = repo.create(&pattern).await?;
                ctx.record_mutation(
                    OperationKind::Create,
                    "pattern",
                    created.id,
                    Some(serde_json::to_vec(&created)?),
                )
                .await?;

                println!("Added pattern '{}' ({})", created.label(), created.id);
                Ok(())
            }

            PatternSubcommand::List { format } => {
                let patterns = repo.list().await?;
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&patterns)?)
                    }
                    OutputFormat::Text => {
                        if patterns.is_empty() {
                            println!("No patterns.");
                        }
                        for pattern in &patterns {
                            println!("{}  {:<20} {}", pattern.id, pattern.label(), pattern.name);
                        }
                    }
                }
                Ok(())
            }

            PatternSubcommand::Show { id, format } => {
                let pattern = repo
                    .get_by_id(Uuid::parse_str(id)?)
                    .await?
                    .ok_or_else(|| format!("Pattern not found: {}", id))?;

                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&pattern)?),
                    OutputFormat::Text => {
                        println!("{} ({})", pattern.label(), pattern.id);
                        println!("  name:   {}", pattern.name);
                        if !pattern.sizes.is_empty() {
                            println!("  sizes:  {}", pattern.sizes.join(", "));
                        }
                        if let Some(pieces) = pattern.pieces {
                            println!("  pieces: {}", pieces);
                        }
                        if !pattern.notes.is_empty() {
                            println!("  notes:  {}", pattern.notes);
                        }
                    }
                }
                Ok(())
            }

            PatternSubcommand::Delete { id, force } => {
                let id = Uuid::parse_str(id)?;
                let pattern = repo
                    .get_by_id(id)
                    .await?
                    .ok_or_else(|| format!("Pattern not found: {}", id))?;

                if !force && !confirm(&format!("Delete pattern '{}'?", pattern.label())) {
                    println!("Aborted.");
                    return Ok(());
                }

                repo.delete(id).await?;
                ctx.record_mutation(OperationKind::Delete, "pattern", id, None)
                    .await?;

                println!("Deleted pattern '{}'", pattern.label());
                Ok(())
            }
        }
    }
}
