use anyhow::Context;
use catalog_doctor::batch_writer::BatchWriter;
use catalog_doctor::catalog;
use catalog_doctor::classifier::Classifier;
use catalog_doctor::config::Config;
use catalog_doctor::error::CatalogError;
use catalog_doctor::logging;
use catalog_doctor::report::report;
use catalog_doctor::runner::ReconcileRun;
use catalog_doctor::seeder::{SeedMode, Seeder};
use catalog_doctor::storage::{DocumentStore, JsonFileStore};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "catalog_doctor")]
#[command(about = "Seed, validate and repair the services marketplace catalog")]
#[command(version = "0.1.0")]
struct Cli {
    /// Config file (defaults to $CATALOG_CONFIG, then catalog.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the category taxonomy
    SeedCategories {
        /// Delete every existing category first
        #[arg(long)]
        replace: bool,
        /// JSON list of categories to use instead of the built-in set
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Validate and import the service list
    ImportServices {
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Expand the per-sub-service catalog into services and import them
    PopulateSubServices {
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Fill the featured and popular collections
    SeedHighlights {
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Remap and infer categories and sub-services of stored services, then report
    Reconcile {
        /// Compute and log patches without writing them
        #[arg(long)]
        dry_run: bool,
        /// Print the outcome and report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show how services are distributed over categories
    Report {
        #[arg(long)]
        json: bool,
    },
    /// Print the active rule tables
    Taxonomy {
        /// Validate the tables against the stored categories instead of printing them
        #[arg(long)]
        check: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();

    let config_path = Config::resolve_path(cli.config.as_deref());
    let config = Config::load(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    let taxonomy = config.load_taxonomy().context("loading taxonomy")?;

    if let Commands::Taxonomy { check: false } = cli.command {
        print!("{}", taxonomy.to_toml_string()?);
        return Ok(());
    }

    let store = Arc::new(
        JsonFileStore::open(&config.store.path, config.store.max_batch_writes)
            .context("opening document store")?,
    );
    info!("Using document store at {}", store.path().display());
    let writer = BatchWriter::for_store(store.as_ref(), config.writer.chunk_size)?;
    let collections = &config.collections;
    let seeder = Seeder::new(store.as_ref(), collections, writer);

    let result: Result<(), CatalogError> = async {
        match cli.command {
            Commands::SeedCategories { replace, file } => {
                println!("🌱 Seeding service categories...");
                let categories = catalog::seed_categories(file.as_deref())?;
                let mode = if replace { SeedMode::Replace } else { SeedMode::Merge };
                let summary = seeder.seed_categories(&categories, mode).await?;
                println!("\n📊 Category seeding:");
                println!("   Written: {}", summary.written);
                println!("   Deleted: {}", summary.deleted);
                println!("   Failed: {}", summary.failed);
            }
            Commands::ImportServices { file } => {
                println!("🚀 Importing services...");
                let services = catalog::seed_services(file.as_deref())?;
                let summary = seeder.import_services(services).await?;
                println!("\n📊 Import Summary:");
                println!("   ✅ Imported: {}", summary.imported);
                println!("   ⚠️  Rejected: {}", summary.rejected);
                println!("   ❌ Failed: {}", summary.failed);
            }
            Commands::PopulateSubServices { file } => {
                println!("🚀 Populating services per sub-service...");
                let catalogs = catalog::seed_sub_services(file.as_deref())?;
                let summary = seeder.populate_sub_services(&catalogs).await?;
                println!("\n📊 Summary:");
                println!("   Categories: {}", catalogs.len());
                println!("   Sub-services: {}", catalogs.iter().map(|c| c.sub_services.len()).sum::<usize>());
                println!("   ✅ Imported: {}", summary.imported);
                println!("   ⚠️  Rejected: {}", summary.rejected);
                println!("   ❌ Failed: {}", summary.failed);
            }
            Commands::SeedHighlights { file } => {
                println!("⭐ Importing featured and popular services...");
                let highlights = catalog::seed_highlights(file.as_deref())?;
                let summary = seeder.seed_highlights(&highlights).await;
                println!("   Written: {}", summary.written);
                println!("   Failed: {}", summary.failed);
            }
            Commands::Reconcile { dry_run, json } => {
                if !json {
                    println!("🔧 Reconciling service categories and sub-services...");
                }
                let classifier = Classifier::new(&taxonomy, config.taxonomy.strategy);
                let run = ReconcileRun::new(store.clone(), collections.clone(), writer).dry_run(dry_run);
                let outcome = run.run(&classifier).await?;
                let summary = report(store.as_ref(), &collections.services, &collections.categories).await?;
                if json {
                    let body = serde_json::json!({ "reconcile": outcome, "report": summary });
                    println!("{}", serde_json::to_string_pretty(&body)?);
                } else {
                    println!("\n{}", outcome);
                    println!("{}", summary);
                }
            }
            Commands::Report { json } => {
                let summary = report(store.as_ref(), &collections.services, &collections.categories).await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                } else {
                    println!("{}", summary);
                }
            }
            Commands::Taxonomy { .. } => {
                let categories = catalog::load_categories(store.as_ref(), &collections.categories).await?;
                let live = (!categories.is_empty()).then_some(&categories);
                taxonomy.validate(live)?;
                println!(
                    "✅ Taxonomy is consistent ({} categories, {} remaps, checked against {} stored categories)",
                    taxonomy.categories.len(),
                    taxonomy.category_remap.len() + taxonomy.sub_service_remap.len(),
                    categories.len()
                );
            }
        }
        Ok(())
    }
    .await;

    match result {
        Ok(()) => {
            info!("Done ({} writes allowed per batch)", store.max_batch_writes());
            Ok(())
        }
        Err(e) if e.is_fatal() => Err(e.into()),
        Err(e) => {
            error!("Run failed: {}", e);
            println!("❌ {}", e);
            Ok(())
        }
    }
}
