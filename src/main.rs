// src/main.rs

use clap::{Parser, Subcommand};
use odai::{Result, Store};
use std::fs;
use tracing::info;

/// Database path resolution: `--db-path`, falling back to `ODAI_DB_PATH`,
/// falling back to `odai.db` in the current directory.
fn resolve_db_path(db_path: Option<String>) -> String {
    db_path
        .or_else(|| std::env::var("ODAI_DB_PATH").ok())
        .unwrap_or_else(|| "odai.db".to_string())
}

#[derive(Parser)]
#[command(name = "odai")]
#[command(author, version, about = "Versioned, schema-evolving object store", long_about = None)]
struct Cli {
    /// Database path (default: $ODAI_DB_PATH, or ./odai.db)
    #[arg(short, long, global = true)]
    db_path: Option<String>,

    /// Emit machine-readable JSON instead of the human-readable rendering
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and apply the bootstrap metadata schema
    Init,
    /// Apply a DDL file's datatype/class/attribute/reference declarations
    Run {
        /// Path to a DDL source file
        ddl_path: String,
    },
    /// Fetch an object by id and print its id/class/status
    Get {
        /// Object id
        id: i64,
    },
    /// Fetch an object by id and print a full attribute dump
    Dump {
        /// Object id
        id: i64,
    },
    /// Print the most recent entries of the activity log
    Info {
        /// Maximum number of entries to show
        #[arg(short, long)]
        limit: Option<i64>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);
    let json = cli.json;

    match cli.command {
        Commands::Init => {
            info!(db_path, "initializing odai database");
            let store = Store::open(&db_path)?;
            store.log("initialized")?;
            println!("Database initialized at: {db_path}");
            Ok(())
        }
        Commands::Run { ddl_path } => {
            info!(db_path, ddl_path, "applying DDL program");
            let store = Store::open(&db_path)?;
            let text = fs::read_to_string(&ddl_path)
                .map_err(|e| odai::Error::NotFound(format!("DDL file '{ddl_path}': {e}")))?;
            store.run_ddl(&text)?;
            store.log(&format!("applied DDL '{ddl_path}'"))?;
            println!("Applied DDL: {ddl_path}");
            Ok(())
        }
        Commands::Get { id } => {
            let store = Store::open(&db_path)?;
            let object = store.get_object(id)?;
            println!("{} {} ({})", object.class.name, object.id, object.status);
            Ok(())
        }
        Commands::Dump { id } => {
            let store = Store::open(&db_path)?;
            let object = store.get_object(id)?;
            if json {
                let mut attributes = std::collections::HashMap::new();
                for name in object.attribute_names() {
                    let value = store.get_value(&object, &name)?;
                    attributes.insert(name, value);
                }
                let payload = serde_json::json!({
                    "id": object.id,
                    "class": object.class.name,
                    "status": object.status.to_string(),
                    "current_version": object.current_version,
                    "attributes": attributes,
                });
                println!("{}", serde_json::to_string_pretty(&payload).expect("json values are always serializable"));
            } else {
                println!("{}", store.dump(&object)?);
            }
            Ok(())
        }
        Commands::Info { limit } => {
            let store = Store::open(&db_path)?;
            let entries = store.info(limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries).expect("info rows are always serializable"));
            } else {
                for entry in entries {
                    println!(
                        "{}  {}  {}",
                        entry.time,
                        entry.version.as_deref().unwrap_or("-"),
                        entry.comment.as_deref().unwrap_or("")
                    );
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_db_path_prefers_explicit_flag() {
        assert_eq!(resolve_db_path(Some("explicit.db".to_string())), "explicit.db");
    }
}
