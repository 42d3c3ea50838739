mod commands;

use clap::{ArgAction, CommandFactory, Parser};
use clap_complete::{Shell, generate};
use folio_core::config::CONFIG_FILE;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "folio")]
#[command(version, about = "Build-time prerendering for a client-rendered portfolio site", long_about = None)]
struct Cli {
    /// Show diagnostic logs (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Serve the built site, render every route headlessly, and write the HTML back
    Prerender {
        /// Path to folio.toml
        #[arg(short, long, default_value = CONFIG_FILE)]
        config: PathBuf,
    },

    /// Serve a directory with single-page-app fallback
    Serve {
        /// Directory to serve
        dir: PathBuf,

        /// Port to serve on
        #[arg(short, long, default_value = "3001")]
        port: u16,
    },

    /// List the routes a prerender run would render
    Routes {
        /// Path to folio.toml
        #[arg(short, long, default_value = CONFIG_FILE)]
        config: PathBuf,
    },

    /// Write sitemap.xml and the blog and news RSS feeds into the output directory
    Feeds {
        /// Path to folio.toml
        #[arg(short, long, default_value = CONFIG_FILE)]
        config: PathBuf,
    },

    /// Check prerendered pages for search and social meta tags
    Verify {
        /// Path to folio.toml
        #[arg(short, long, default_value = CONFIG_FILE)]
        config: PathBuf,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "warn,folio=debug,folio_core=debug,folio_prerender=debug,folio_generator=debug,folio_validator=debug",
        _ => "debug,folio=trace,folio_core=trace,folio_prerender=trace,folio_generator=trace,folio_validator=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Prerender { config } => commands::prerender::run(config).await,
        Command::Serve { dir, port } => commands::serve::run(dir, port).await,
        Command::Routes { config } => commands::routes::run(config),
        Command::Feeds { config } => commands::feeds::run(config),
        Command::Verify { config } => commands::verify::run(config),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "folio", &mut io::stdout());
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("\n✗ Error: {:#}", e);
            1
        }
    };

    // Exit explicitly so a lingering child handle or task cannot keep the run alive
    std::process::exit(code);
}
