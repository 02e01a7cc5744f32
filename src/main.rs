mod cli;
mod completions;
mod ui;

use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use arbor::cache::MemoryCache;
use arbor::clock::{Clock, SystemClock};
use arbor::config::{ArborConfig, ConfigError};
use arbor::connection::{Connection, SqliteConnection};
use arbor::repository::TreeCacheEntry;
use arbor::{NodeSpec, StoreError, TreeService};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("invalid node file: {0}")]
    NodeFile(#[from] serde_json::Error),

    #[error("{0}")]
    InvalidArgument(String),
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn print_json(value: &impl serde::Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).expect("json serialization should work")
    );
}

fn run() -> Result<(), CliError> {
    use clap::Parser;
    use cli::{Commands, NodeSubcommands, TreeSubcommands};

    let cli = cli::Cli::parse();
    if let Commands::Completions(args) = &cli.command {
        return completions::run_completions_command(args.shell.as_deref());
    }

    let mut config = ArborConfig::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    arbor::logging::init(cli.verbose, &config.log_filter);

    ensure_parent_dir(&config.db_path)?;
    let conn: Rc<dyn Connection> = Rc::new(SqliteConnection::open(&config.db_path)?);
    if let Commands::Init = &cli.command {
        println!("arbor store ready at {}", config.db_path);
        return Ok(());
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cache: Arc<MemoryCache<TreeCacheEntry>> = Arc::new(MemoryCache::new(clock.clone()));
    let mut service = TreeService::with_connection(conn, cache, config.cache_ttl(), clock);

    match cli.command {
        Commands::Tree(args) => match args.command {
            TreeSubcommands::New(args) => {
                let specs = match args.nodes.as_deref() {
                    Some(path) => read_node_specs(path)?,
                    None => Vec::new(),
                };
                let tree =
                    service.create_tree_with_nodes(&args.name, args.desc.as_deref(), &specs)?;
                println!(
                    "created tree #{} {} with {} node(s)",
                    tree.id().unwrap_or_default(),
                    tree.name(),
                    specs.len()
                );
            }
            TreeSubcommands::Ls(args) => {
                let (trees, scope) = if args.all {
                    (service.trees().find_all()?, "all")
                } else if args.deleted {
                    (service.trees().find_deleted()?, "deleted")
                } else {
                    (service.trees().find_active()?, "active")
                };
                if args.json {
                    print_json(&trees);
                } else {
                    ui::print_tree_list(&trees, scope);
                }
            }
            TreeSubcommands::Show(args) => {
                let tree = service
                    .trees()
                    .find_by_id(args.id)?
                    .ok_or(StoreError::NotFound {
                        entity: "Tree",
                        id: args.id,
                    })?;
                let roots = service.get_tree_structure(args.id)?;
                if args.json {
                    print_json(&serde_json::json!({ "tree": tree, "nodes": roots }));
                } else {
                    ui::print_tree_detail(&tree, &roots);
                }
            }
            TreeSubcommands::Rm(args) => {
                service.soft_delete_tree(args.id)?;
                println!("deleted tree #{}", args.id);
            }
            TreeSubcommands::Restore(args) => {
                service.restore_tree(args.id)?;
                println!("restored tree #{}", args.id);
            }
            TreeSubcommands::Purge(args) => {
                if !service.delete_tree_with_nodes(args.id)? {
                    return Err(StoreError::NotFound {
                        entity: "Tree",
                        id: args.id,
                    }
                    .into());
                }
                println!("purged tree #{}", args.id);
            }
        },
        Commands::Node(args) => match args.command {
            NodeSubcommands::Add(args) => {
                let spec = match (args.button_text, args.button_action) {
                    (Some(text), Some(action)) => NodeSpec::button(&args.name, text, action),
                    _ => NodeSpec::simple(&args.name),
                };
                let spec = NodeSpec {
                    parent_id: args.parent,
                    ..spec.sorted(args.sort)
                };
                let node = service.add_node(args.tree_id, &spec)?;
                println!(
                    "added node #{} {} to tree #{}",
                    node.id().unwrap_or_default(),
                    node.name(),
                    node.tree_id()
                );
            }
            NodeSubcommands::Mv(args) => {
                let node = service.move_node(args.id, args.parent)?;
                match node.parent_id() {
                    Some(parent) => println!("moved node #{} under #{parent}", args.id),
                    None => println!("moved node #{} to root", args.id),
                }
            }
        },
        Commands::Init | Commands::Completions(_) => unreachable!("handled before dispatch"),
    }
    Ok(())
}

fn ensure_parent_dir(db_path: &str) -> std::io::Result<()> {
    match Path::new(db_path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn read_node_specs(path: &Path) -> Result<Vec<NodeSpec>, CliError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
