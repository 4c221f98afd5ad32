mod flows;
mod render;
mod transport;


use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use duopack_core::Settings;
use duopack_installer::{default_state_root, BaseLayout, SystemArchiver};

use crate::transport::HttpFetcher;

#[derive(Parser, Debug)]
#[command(name = "duopack")]
#[command(about = "Package manager for modern and legacy repositories", long_about = None)]
#[command(version)]
struct Cli {
    /// State root directory (default: /data/duopack)
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    /// Verbose diagnostics
    #[arg(short = 'v', long, global = true)]
    verbose: bool,
    /// Suppress normal output
    #[arg(short = 'q', long, global = true)]
    quiet: bool,
    /// Assume yes to all prompts
    #[arg(short = 'y', long = "yes", global = true)]
    assume_yes: bool,
    /// Dry-run: report actions without performing them
    #[arg(short = 's', long, global = true)]
    simulate: bool,
    /// Download packages only, don't install
    #[arg(short = 'd', long, global = true)]
    download_only: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Refresh the cached package indexes
    Update,
    /// Install or upgrade packages
    Install {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Upgrade one installed package, or all of them
    Upgrade { name: Option<String> },
    /// Remove installed packages
    Purge {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Search the cached indexes
    Search { query: String },
    /// Show details for a package
    Show {
        name: String,
        #[arg(long)]
        json: bool,
    },
    /// List installed packages
    List {
        #[arg(long)]
        json: bool,
    },
    /// List configured repositories
    RepoList,
    /// Add a repository
    RepoAdd { url: String },
    /// Remove a repository
    RepoRemove { url: String },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = Settings {
        verbose: cli.verbose,
        quiet: cli.quiet,
        assume_yes: cli.assume_yes,
        simulate: cli.simulate,
        download_only: cli.download_only,
    };
    let layout = BaseLayout::new(cli.root.clone().unwrap_or_else(default_state_root));

    match cli.command {
        Commands::Update => {
            let fetcher = HttpFetcher::new(&settings)?;
            flows::run_update(&layout, &settings, &fetcher)
        }
        Commands::Install { names } => {
            let fetcher = HttpFetcher::new(&settings)?;
            flows::run_install(&layout, &settings, &fetcher, &SystemArchiver, &names)
        }
        Commands::Upgrade { name } => {
            let fetcher = HttpFetcher::new(&settings)?;
            flows::run_upgrade(&layout, &settings, &fetcher, &SystemArchiver, name.as_deref())
        }
        Commands::Purge { names } => flows::run_purge(&layout, &settings, &names),
        Commands::Search { query } => {
            let fetcher = HttpFetcher::new(&settings)?;
            flows::run_search(&layout, &settings, &fetcher, &query)
        }
        Commands::Show { name, json } => {
            let fetcher = HttpFetcher::new(&settings)?;
            flows::run_show(&layout, &fetcher, &name, json)
        }
        Commands::List { json } => flows::run_list(&layout, json),
        Commands::RepoList => {
            let fetcher = HttpFetcher::new(&settings)?;
            flows::run_repo_list(&layout, &fetcher)
        }
        Commands::RepoAdd { url } => {
            let fetcher = HttpFetcher::new(&settings)?;
            flows::run_repo_add(&layout, &fetcher, &url)
        }
        Commands::RepoRemove { url } => flows::run_repo_remove(&layout, &url),
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "duopack", &mut std::io::stdout());
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "duopack_core=debug,duopack_registry=debug,duopack_resolver=debug,duopack_installer=debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}
