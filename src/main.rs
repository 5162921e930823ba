//! cm-price - Resolve Pokemon card tags into Cardmarket price data
//!
//! Searches Cardmarket for a card tag, follows the matching product page, and
//! prints its price summary.

use anyhow::Result;
use clap::{Parser, Subcommand};
use cm_price::commands::{InteractiveCommand, LookupCommand};
use cm_price::config::{Config, FetchStrategy, OutputFormat};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "cm-price",
    version,
    about = "Resolve Pokemon card tags into Cardmarket price data",
    long_about = "Looks up a card tag such as sv2a182 on Cardmarket and prints the From, Price Trend and 30-day average prices."
)]
struct Cli {
    /// Page fetching strategy (direct, rendered)
    #[arg(long, global = true, env = "CM_FETCHER")]
    fetcher: Option<FetchStrategy>,

    /// WebDriver endpoint used by the rendered strategy
    #[arg(long, global = true, env = "CM_WEBDRIVER_URL")]
    webdriver: Option<String>,

    /// Page load timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Proxy URL (e.g., socks5://host:port)
    #[arg(long, global = true, env = "CM_PROXY")]
    proxy: Option<String>,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true)]
    format: Option<OutputFormat>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up a single card tag
    #[command(alias = "l")]
    Lookup {
        /// Card tag, e.g. sv2a182 (spaces are removed)
        #[arg(num_args = 1.., required = true)]
        tag: Vec<String>,
    },

    /// Look up several card tags in sequence
    #[command(alias = "b")]
    Batch {
        /// Card tags
        #[arg(required = true)]
        tags: Vec<String>,
    },

    /// Read tags from stdin, one per line
    #[command(alias = "i")]
    Interactive,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();

    // Apply CLI overrides
    if let Some(fetcher) = cli.fetcher {
        config.fetcher = fetcher;
    }
    if let Some(url) = cli.webdriver {
        config.webdriver_url = url;
    }
    if let Some(secs) = cli.timeout {
        config.render_timeout_secs = secs;
        config.request_timeout_secs = secs;
    }
    if let Some(proxy) = cli.proxy {
        config.proxy = Some(proxy);
    }
    if let Some(format) = cli.format {
        config.format = format;
    }

    let report = match cli.command {
        Commands::Lookup { tag } => {
            // "sv2a 182" typed without quotes arrives as two arguments
            let cmd = LookupCommand::new(config);
            cmd.execute(&tag.concat()).await?
        }

        Commands::Batch { tags } => {
            let cmd = LookupCommand::new(config);
            cmd.execute_batch(&tags).await?
        }

        Commands::Interactive => {
            let cmd = InteractiveCommand::new(config);
            cmd.execute().await?;
            return Ok(());
        }
    };

    println!("{}", report.output);

    if !report.is_success() {
        std::process::exit(1);
    }

    Ok(())
}
