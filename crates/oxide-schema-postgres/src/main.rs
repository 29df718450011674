//! oxide-schema CLI
//!
//! Inspects a PostgreSQL schema or reconciles it against a model file.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_schema::{Database, DatabaseConfig, DdlGenerator, Introspector, ReconcileOptions, UuidGenerator};
use oxide_schema_postgres::{ModelFile, PgConnection, DEFAULT_MAX_CONNECTIONS};

/// Model-driven schema reconciliation for PostgreSQL.
#[derive(Parser)]
#[command(name = "oxide-schema")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// PostgreSQL connection string.
    #[arg(short, long, env = "DATABASE_URL")]
    database_url: String,

    /// Schema (namespace) to read and change.
    #[arg(short, long, env = "OXIDE_SCHEMA", default_value = "public")]
    schema: String,

    /// Maximum pooled connections.
    #[arg(long, default_value_t = DEFAULT_MAX_CONNECTIONS)]
    max_connections: u32,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the live schema as JSON.
    Inspect,

    /// Reconcile the database against a model file.
    Sync {
        /// JSON model file.
        #[arg(short, long)]
        models: PathBuf,

        /// Apply corrective DDL instead of failing on divergence.
        #[arg(long)]
        auto_migrate: bool,

        /// Show SQL without executing.
        #[arg(long)]
        dry_run: bool,

        /// Function used for generated UUID defaults.
        #[arg(long, value_enum, default_value_t = UuidGeneratorArg::Uuidv7)]
        uuid_generator: UuidGeneratorArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum UuidGeneratorArg {
    /// `uuidv7()`, PostgreSQL 18 and later.
    Uuidv7,
    /// `gen_random_uuid()`, PostgreSQL 13 and later.
    GenRandomUuid,
}

impl From<UuidGeneratorArg> for UuidGenerator {
    fn from(arg: UuidGeneratorArg) -> Self {
        match arg {
            UuidGeneratorArg::Uuidv7 => Self::UuidV7,
            UuidGeneratorArg::GenRandomUuid => Self::GenRandomUuid,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let conn = PgConnection::connect(&cli.database_url, cli.max_connections)
        .context("connecting to the database")?;

    match cli.command {
        Commands::Inspect => {
            let snapshot = Introspector::new(&conn)
                .with_schema(cli.schema.as_str())
                .build_snapshot()?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }

        Commands::Sync {
            models,
            auto_migrate,
            dry_run,
            uuid_generator,
        } => {
            let file = ModelFile::load(&models)?;
            if dry_run {
                info!("Dry run mode - SQL will be printed but not executed.");
            }

            let config = DatabaseConfig {
                schema: cli.schema,
                options: ReconcileOptions {
                    auto_migrate,
                    dry_run,
                },
                generator: DdlGenerator::new().with_uuid_generator(uuid_generator.into()),
            };
            let mut db = Database::open(&conn, config)?;

            let mut total = 0;
            for model in &file.models {
                let table = model
                    .table_definition()
                    .with_context(|| format!("model '{}'", model.name))?;
                let actions = db
                    .register_table(&table, &model.name)
                    .with_context(|| format!("reconciling model '{}'", model.name))?;
                for action in &actions {
                    println!("{};", db.generator().render(action));
                }
                total += actions.len();
            }
            info!(
                models = file.models.len(),
                statements = total,
                "schema reconciled"
            );
        }
    }

    conn.close();
    Ok(())
}
