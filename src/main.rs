use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;

use pgtesthelper::conn::AdminConnection;
use pgtesthelper::{naming, ConnectionSettings, NameStrategy, Options, TestDatabase, TruncateMode};

/// pgtesthelper: create, reset and drop temporary PostgreSQL test databases.
#[derive(Parser)]
#[command(name = "pgtesthelper", version, about)]
struct Cli {
    /// Role used for both the admin and the target connection.
    #[arg(long, global = true, env = "PGTESTHELPER_USER", default_value = "postgres")]
    user: String,

    #[arg(long, global = true, env = "PGTESTHELPER_PASS", default_value = "", hide_env_values = true)]
    password: String,

    #[arg(long, global = true, env = "PGTESTHELPER_HOST", default_value = "localhost")]
    host: String,

    #[arg(long, global = true, env = "PGTESTHELPER_PORT", default_value_t = 5432)]
    port: u16,

    /// Log every statement the helper issues.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a database from a schema file and keep it.
    Create {
        /// SQL file executed against the new database.
        #[arg(long)]
        schema: PathBuf,

        /// Name prefix; the database is called <prefix>_<unix-seconds>.
        #[arg(long, default_value = "testing")]
        prefix: String,

        /// Use a microsecond suffix instead of seconds.
        #[arg(long)]
        micros: bool,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Truncate tables (and restart sequences) in an existing database.
    Reset {
        /// Database name, as printed by `create`.
        database: String,

        /// Table to truncate; repeat for several, in order.
        #[arg(long = "table", required = true)]
        tables: Vec<String>,

        /// Sequence to restart at its declared start value; repeat for several, in order.
        #[arg(long = "sequence")]
        sequences: Vec<String>,

        /// Fail instead of cascading to referencing tables.
        #[arg(long)]
        restrict: bool,
    },

    /// Drop a database created earlier.
    Drop {
        /// Database name.
        database: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    let settings = ConnectionSettings::new(&cli.user, &cli.password)
        .host(&cli.host)
        .port(cli.port);

    match cli.command {
        Commands::Create {
            schema,
            prefix,
            micros,
            json,
        } => cmd_create(settings, schema, &prefix, micros, json),
        Commands::Reset {
            database,
            tables,
            sequences,
            restrict,
        } => cmd_reset(settings, &database, &tables, &sequences, restrict),
        Commands::Drop { database } => cmd_drop(settings, &database),
    }
}

fn cmd_create(
    settings: ConnectionSettings,
    schema: PathBuf,
    prefix: &str,
    micros: bool,
    json: bool,
) -> Result<()> {
    let strategy = if micros {
        NameStrategy::UnixMicros
    } else {
        NameStrategy::UnixSeconds
    };
    let options = Options::new(schema, prefix, settings.clone())
        .keep(true)
        .name_strategy(strategy);

    let mut db = TestDatabase::new(options).context("Failed to connect to admin database")?;
    db.create()
        .with_context(|| format!("Failed to create database {}", db.db_name()))?;
    db.cleanup()?;

    if json {
        let out = serde_json::json!({
            "database": db.db_name(),
            "host": settings.host,
            "port": settings.port,
            "user": settings.user,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", db.db_name());
    }
    Ok(())
}

fn cmd_reset(
    settings: ConnectionSettings,
    database: &str,
    tables: &[String],
    sequences: &[String],
    restrict: bool,
) -> Result<()> {
    let mode = if restrict {
        TruncateMode::Restrict
    } else {
        TruncateMode::Cascade
    };
    let mut db = TestDatabase::attach(settings, database)
        .with_context(|| format!("Failed to connect to {}", database))?
        .with_truncate_mode(mode);
    db.reset(tables, sequences)?;
    db.close_connection()?;

    println!(
        "Reset {} tables and {} sequences in '{}'",
        tables.len(),
        sequences.len(),
        database
    );
    Ok(())
}

fn cmd_drop(settings: ConnectionSettings, database: &str) -> Result<()> {
    naming::check_identifier("database", database)?;
    let mut admin =
        AdminConnection::connect(&settings).context("Failed to connect to admin database")?;
    admin.drop_database(database)?;
    println!("Dropped '{}'", database);
    Ok(())
}
