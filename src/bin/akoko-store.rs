use akoko_store::query::parse_query_json;
use akoko_store::{Collection, Document, DocumentStore, StoreConfig, StoreController, UpdateOptions};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "akoko-store", version, about = "School site document store (remote with local fallback)", long_about = None)]
struct Cli {
    /// Path to a config file (TOML)
    #[arg(long, help = "Path to a config file (TOML). Defaults to ./akoko-store.toml if present.")]
    config: Option<PathBuf>,
    #[arg(long, help = "Directory for the local fallback tables. Takes precedence over config/env.")]
    data_dir: Option<PathBuf>,
    #[arg(long, help = "Remote database connection string. Takes precedence over config/env.")]
    mongodb_uri: Option<String>,
    #[arg(long, help = "Skip the remote database and use the local store directly.")]
    local: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Connect and report which store is active")]
    Status,
    #[command(about = "List table names")]
    Collections,
    #[command(name = "find-one", about = "Print the first document matching a query")]
    FindOne {
        collection: String,
        #[arg(default_value = "{}")]
        query: String,
    },
    #[command(about = "Print all documents matching a query as a JSON array")]
    Find {
        collection: String,
        #[arg(default_value = "{}")]
        query: String,
    },
    #[command(about = "Print the distinct values of a field")]
    Distinct { collection: String, field: String },
    #[command(about = "Insert one JSON object")]
    Insert { collection: String, document: String },
    #[command(name = "insert-many", about = "Insert a JSON array of objects")]
    InsertMany { collection: String, documents: String },
    #[command(about = "Update the first match ($set/$push/$pull or a plain object)")]
    Update {
        collection: String,
        query: String,
        update: String,
        #[arg(long)]
        upsert: bool,
    },
    #[command(about = "Delete the first match")]
    Delete { collection: String, query: String },
}

fn parse_object(json: &str) -> Result<Document, Box<dyn std::error::Error>> {
    match serde_json::from_str::<Value>(json)? {
        Value::Object(m) => Ok(m),
        _ => Err("expected a JSON object".into()),
    }
}

fn print_json<T: serde::Serialize>(v: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(v)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut cfg = StoreConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        cfg.data_dir = dir;
    }
    if let Some(uri) = cli.mongodb_uri {
        cfg = cfg.with_env(|k| (k == "MONGODB_URI").then(|| uri.clone()));
    }
    if cli.local {
        cfg.remote = None;
    }
    if let Err(e) = akoko_store::init_logging(&cfg) {
        eprintln!("logging disabled: {e}");
    }

    let controller = StoreController::new(cfg);
    let store = controller.connect().await?;

    match cli.command {
        Commands::Status => {
            println!("backend={} state={:?}", store.backend(), controller.state());
        }
        Commands::Collections => {
            for name in store.list_collection_names().await? {
                println!("{name}");
            }
        }
        Commands::FindOne { collection, query } => {
            let col = store.collection(&collection)?;
            let found = col.find_one(&parse_query_json(&query)?).await?;
            print_json(&found)?;
        }
        Commands::Find { collection, query } => {
            let col = store.collection(&collection)?;
            let docs = col.find(&parse_query_json(&query)?).await?.to_vec();
            print_json(&docs)?;
        }
        Commands::Distinct { collection, field } => {
            let col = store.collection(&collection)?;
            print_json(&col.distinct(&field).await?)?;
        }
        Commands::Insert { collection, document } => {
            let col = store.collection(&collection)?;
            print_json(&col.insert_one(parse_object(&document)?).await?)?;
        }
        Commands::InsertMany { collection, documents } => {
            let docs: Vec<Document> = serde_json::from_str(&documents)?;
            let col = store.collection(&collection)?;
            print_json(&col.insert_many(docs).await?)?;
        }
        Commands::Update { collection, query, update, upsert } => {
            let col = store.collection(&collection)?;
            let update: Value = serde_json::from_str(&update)?;
            let res = col
                .update_one(&parse_query_json(&query)?, &update, UpdateOptions { upsert })
                .await?;
            print_json(&res)?;
        }
        Commands::Delete { collection, query } => {
            let col = store.collection(&collection)?;
            print_json(&col.delete_one(&parse_query_json(&query)?).await?)?;
        }
    }
    Ok(())
}
