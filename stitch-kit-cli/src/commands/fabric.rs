use clap::{Args, Subcommand};
use uuid::Uuid;

use stitch_kit_core::models::Fabric;
use stitch_kit_core::offline::OperationKind;

use super::{confirm, OutputFormat};
use crate::config::Config;
use crate::db::{init_db, FabricRepository};
use crate::sync::SyncContext;

/// Manage the fabric stash
#[derive(Args)]
pub struct FabricCommand {
    #[command(subcommand)]
    pub command: FabricSubcommand,
}

#[derive(Subcommand)]
pub enum FabricSubcommand {
    /// Add fabric to the stash
    Add {
        /// Fabric name
        name: String,

        /// Fiber content (e.g. "100% linen")
        fiber: String,

        /// Color
        #[arg(long)]
        color: Option<String>,

        /// Bolt width in centimeters
        #[arg(long)]
        width: Option<i32>,

        /// Length in meters
        #[arg(long)]
        length: Option<f64>,

        /// Weight in g/m²
        #[arg(long)]
        weight: Option<i32>,

        /// Storage location
        #[arg(long)]
        location: Option<String>,

        /// Tag (can be repeated)
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,
    },

    /// List the stash
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show fabric details
    Show {
        /// Fabric ID (UUID)
        id: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Record fabric used by a project, shrinking the remaining length
    Use {
        /// Fabric ID (UUID)
        id: String,

        /// Meters used
        meters: f64,
    },

    /// Delete a fabric
    Delete {
        /// Fabric ID (UUID)
        id: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl FabricCommand {
    pub fn is_read(&self) -> bool {
        matches!(
            self.command,
            FabricSubcommand::List { .. } | FabricSubcommand::Show { .. }
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
        let repo = FabricRepository::new(pool);

        match &self.command {
            FabricSubcommand::Add {
                name,
                fiber,
                color,
                width,
                length,
                weight,
                location,
                tags,
            } => {
                let mut fabric = Fabric::new(name, fiber, &config.created_by.value);
                if let Some(color) = color {
                    fabric = fabric.with_color(color);
                }
                if let Some(width) = width {
                    fabric = fabric.with_width_cm(*width);
                }
                if let Some(length) = length {
                    fabric = fabric.with_length_m(*length);
                }
                if let Some(weight) = weight {
                    fabric = fabric.with_weight_gsm(*weight);
                }
                if let Some(location) = location {
                    fabric = fabric.with_location(location);
                }
                if !tags.is_empty() {
                    fabric = fabric.with_tags(tags.clone());
                }

                let created = repo.create(&fabric).await?;
                ctx.record_mutation(
                    OperationKind::Create,
                    "fabric",
                    created.id,
                    Some(serde_json::to_vec(&created)?),
                )
                .await?;

                println!("Added '{}' to the stash ({})", created.name, created.id);
                Ok(())
            }

            FabricSubcommand::List { format } => {
                let fabrics = repo.list().await?;
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&fabrics)?)
                    }
                    OutputFormat::Text => {
                        if fabrics.is_empty() {
                            println!("The stash is empty.");
                        }
                        for fabric in &fabrics {
                            println!(
                                "{}  {:<24} {:>6.2} m  {}",
                                fabric.id, fabric.name, fabric.length_m, fabric.fiber
                            );
                        }
                    }
                }
                Ok(())
            }

            FabricSubcommand::Show { id, format } => {
                let fabric = repo
                    .get_by_id(Uuid::parse_str(id)?)
                    .await?
                    .ok_or_else(|| format!("Fabric not found: {}", id))?;

                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&fabric)?),
                    OutputFormat::Text => {
                        println!("{} ({})", fabric.name, fabric.id);
                        println!("  fiber:    {}", fabric.fiber);
                        if !fabric.color.is_empty() {
                            println!("  color:    {}", fabric.color);
                        }
                        println!("  length:   {:.2} m", fabric.length_m);
                        if let Some(width) = fabric.width_cm {
                            println!("  width:    {} cm", width);
                        }
                        if let Some(area) = fabric.area_m2() {
                            println!("  area:     {:.2} m²", area);
                        }
                        if let Some(location) = &fabric.location {
                            println!("  location: {}", location);
                        }
                    }
                }
                Ok(())
            }

            FabricSubcommand::Use { id, meters } => {
                let id = Uuid::parse_str(id)?;
                let fabric = repo
                    .get_by_id(id)
                    .await?
                    .ok_or_else(|| format!("Fabric not found: {}", id))?;

                let updated = repo
                    .set_length(id, fabric.length_m - meters)
                    .await?
                    .ok_or_else(|| format!("Fabric not found: {}", id))?;
                ctx.record_mutation(
                    OperationKind::Update,
                    "fabric",
                    updated.id,
                    Some(serde_json::to_vec(&updated)?),
                )
                .await?;

                println!(
                    "Used {:.2} m of '{}'; {:.2} m remaining",
                    meters, updated.name, updated.length_m
                );
                Ok(())
            }

            FabricSubcommand::Delete { id, force } => {
                let id = Uuid::parse_str(id)?;
                let fabric = repo
                    .get_by_id(id)
                    .await?
                    .ok_or_else(|| format!("Fabric not found: {}", id))?;

                if !force && !confirm(&format!("Delete fabric '{}'?", fabric.name)) {
                    println!("Aborted.");
                    return Ok(());
                }

                repo.delete(id).await?;
                ctx.record_mutation(OperationKind::Delete, "fabric", id, None)
                    .await?;

                println!("Deleted fabric '{}'", fabric.name);
                Ok(())
            }
        }
    }
}
