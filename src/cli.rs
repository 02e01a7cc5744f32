use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{ArgAction, Args, Parser, Subcommand};

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::BrightCyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightGreen.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::BrightMagenta.on_default())
}

#[derive(Debug, Parser)]
#[command(name = "arbor")]
#[command(bin_name = "arbor")]
#[command(version)]
#[command(about = "Persistent store for named trees of typed nodes")]
#[command(styles = cli_styles())]
pub struct Cli {
    #[arg(
        short = 'd',
        long,
        env = "ARBOR_DB_PATH",
        help = "Path to the SQLite database (overrides the config file)."
    )]
    pub db: Option<String>,

    #[arg(
        short = 'c',
        long,
        env = "ARBOR_CONFIG",
        help = "Path to a TOML config file."
    )]
    pub config: Option<PathBuf>,

    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        global = true,
        help = "Increase log verbosity (-v info, -vv debug, -vvv trace)."
    )]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Create the database and apply migrations.")]
    Init,
    #[command(about = "Manage trees.")]
    Tree(TreeArgs),
    #[command(about = "Manage nodes within a tree.")]
    Node(NodeArgs),
    #[command(about = "Generate shell completions.")]
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    #[arg(help = "Shell name (bash, zsh, fish). Auto-detected if omitted.")]
    pub shell: Option<String>,
}

#[derive(Debug, Args)]
pub struct TreeArgs {
    #[command(subcommand)]
    pub command: TreeSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum TreeSubcommands {
    #[command(about = "Create a tree, optionally with nodes from a JSON file.")]
    New(TreeNewArgs),
    #[command(about = "List trees.")]
    Ls(TreeListArgs),
    #[command(about = "Show one tree and its node hierarchy.")]
    Show(TreeShowArgs),
    #[command(about = "Soft-delete a tree.")]
    Rm(TreeIdArgs),
    #[command(about = "Restore a soft-deleted tree.")]
    Restore(TreeIdArgs),
    #[command(about = "Permanently delete a tree and all of its nodes.")]
    Purge(TreeIdArgs),
}

#[derive(Debug, Args)]
pub struct TreeNewArgs {
    #[arg(help = "Tree name.")]
    pub name: String,

    #[arg(long = "desc", help = "Optional description text.")]
    pub desc: Option<String>,

    #[arg(
        long = "nodes",
        value_name = "FILE",
        help = "JSON array of node specs to create with the tree."
    )]
    pub nodes: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct TreeListArgs {
    #[arg(long, conflicts_with = "all", help = "List only soft-deleted trees.")]
    pub deleted: bool,

    #[arg(long, help = "List active and deleted trees.")]
    pub all: bool,

    #[arg(long, help = "Emit JSON output.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct TreeShowArgs {
    #[arg(help = "Tree id.")]
    pub id: i64,

    #[arg(long, help = "Emit JSON output.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct TreeIdArgs {
    #[arg(help = "Tree id.")]
    pub id: i64,
}

#[derive(Debug, Args)]
pub struct NodeArgs {
    #[command(subcommand)]
    pub command: NodeSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum NodeSubcommands {
    #[command(about = "Add a node to an existing tree.")]
    Add(NodeAddArgs),
    #[command(about = "Move a node under a new parent, or to the root.")]
    Mv(NodeMoveArgs),
}

#[derive(Debug, Args)]
pub struct NodeAddArgs {
    #[arg(help = "Id of the tree to add to.")]
    pub tree_id: i64,

    #[arg(help = "Node name.")]
    pub name: String,

    #[arg(long, help = "Parent node id. Omit for a root node.")]
    pub parent: Option<i64>,

    #[arg(long, default_value_t = 0, help = "Sort order among siblings.")]
    pub sort: i64,

    #[arg(
        long = "button-text",
        requires = "button_action",
        help = "Make a button node with this label."
    )]
    pub button_text: Option<String>,

    #[arg(
        long = "button-action",
        requires = "button_text",
        help = "Action fired by the button node."
    )]
    pub button_action: Option<String>,
}

#[derive(Debug, Args)]
pub struct NodeMoveArgs {
    #[arg(help = "Node id.")]
    pub id: i64,

    #[arg(long, help = "New parent node id. Omit to move to the root.")]
    pub parent: Option<i64>,
}
