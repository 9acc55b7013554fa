use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use stateview_cli::{parse_command, parse_indices, Session};
use stateview_tree::TreeConfig;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "stateview")]
#[command(about = "Browse captured API state as a lazily built tree", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the identifier of the tree for the state after a command
    Resolve(TreeArgs),

    /// Describe nodes addressed by child-index paths
    Node(NodeArgs),

    /// List a page of a node's children
    Ls(LsArgs),
}

#[derive(Args)]
struct TreeArgs {
    /// Capture document (JSON)
    #[arg(long)]
    capture: PathBuf,

    /// Command whose resulting state is shown, e.g. `12`
    #[arg(long = "command", value_name = "INDEX")]
    after: String,

    /// Children per node before grouping; 0 disables grouping
    /// [default: $STATEVIEW_GROUP_LIMIT or 100]
    #[arg(long)]
    group_limit: Option<u64>,
}

#[derive(Args)]
struct NodeArgs {
    #[command(flatten)]
    tree: TreeArgs,

    /// Child-index path such as `0/2/1` (repeatable; empty is the root)
    #[arg(long = "path", default_value = "")]
    paths: Vec<String>,
}

#[derive(Args)]
struct LsArgs {
    #[command(flatten)]
    tree: TreeArgs,

    /// Child-index path of the node to list
    #[arg(long, default_value = "")]
    path: String,

    /// Index of the first child to list
    #[arg(long, default_value_t = 0)]
    offset: u64,

    /// Maximum number of children to list
    #[arg(long, short = 'n', default_value_t = 50)]
    limit: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Resolve(args) => run_resolve(args).await?,
        Commands::Node(args) => run_node(args).await?,
        Commands::Ls(args) => run_ls(args).await?,
    }

    Ok(())
}

async fn open_session(args: TreeArgs) -> Result<Arc<Session>> {
    let command = parse_command(&args.after)?;
    let config = TreeConfig::from_env();
    let session = tokio::task::spawn_blocking(move || {
        Session::open(&args.capture, command, args.group_limit, config)
    })
    .await
    .context("capture loader panicked")??;
    Ok(Arc::new(session))
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_resolve(args: TreeArgs) -> Result<()> {
    let session = open_session(args).await?;
    print_json(&session.resolve_report())
}

async fn run_node(args: NodeArgs) -> Result<()> {
    let paths = args
        .paths
        .iter()
        .map(|p| parse_indices(p))
        .collect::<Result<Vec<_>>>()?;
    let session = open_session(args.tree).await?;

    let reports = session.describe_all(paths).await;
    print_json(&reports)?;

    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    if failed > 0 {
        for report in reports.iter().filter(|r| r.error.is_some()) {
            log::error!("{}: {}", report.path, report.error.as_deref().unwrap_or(""));
        }
        bail!("{failed} of {} paths could not be described", reports.len());
    }
    Ok(())
}

async fn run_ls(args: LsArgs) -> Result<()> {
    let indices = parse_indices(&args.path)?;
    let session = open_session(args.tree).await?;
    let (offset, limit) = (args.offset, args.limit);
    let listing =
        tokio::task::spawn_blocking(move || session.list(indices, offset, limit))
            .await
            .context("listing task panicked")??;
    print_json(&listing)
}
