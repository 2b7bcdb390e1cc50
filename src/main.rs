use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use review_claw::config::Settings;
use review_claw::driver::Browser;
use review_claw::driver::http::HttpBrowser;
use review_claw::engine::{HarvestRequest, ReviewHarvester, SourceSelection};
use review_claw::model::DateWindow;
use review_claw::output::{output_filename, write_reviews};
use review_claw::server::{AppState, serve};

#[derive(Parser)]
#[command(
    name = "review-claw",
    about = "Harvest product reviews from G2, Capterra and TrustRadius",
    version
)]
struct Cli {
    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file (defaults to $CLAW_CONFIG, then ./claw.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Page driver
    #[arg(long, value_enum, default_value = "http", global = true)]
    driver: DriverKind,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DriverKind {
    /// Fetch pages over plain HTTP
    Http,
    /// Render pages in Chromium (needs the `chromium` feature)
    Chromium,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest reviews for one company and write them to a JSON file
    Harvest {
        /// Company / product name
        #[arg(long)]
        company: String,
        /// First day of the window (YYYY-MM-DD)
        #[arg(long)]
        start_date: String,
        /// Last day of the window (YYYY-MM-DD)
        #[arg(long)]
        end_date: String,
        /// g2, capterra, trustradius, a comma list, or all
        #[arg(long, default_value = "all")]
        source: SourceSelection,
        /// Run the browser without a window (default)
        #[arg(long, overrides_with = "no_headless")]
        headless: bool,
        /// Show the browser window (Chromium driver only)
        #[arg(long, overrides_with = "headless")]
        no_headless: bool,
        /// Output path (defaults to {company}_reviews.json)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Serve the harvester over HTTP
    Serve {
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,
    },
}

fn init_tracing(verbose: bool, json: bool) -> Result<()> {
    let directive = if verbose { "review_claw=debug" } else { "review_claw=info" };
    let filter = EnvFilter::from_default_env().add_directive(directive.parse()?);
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

fn build_browser(kind: DriverKind, settings: &Settings, headless: bool) -> Result<Arc<dyn Browser>> {
    match kind {
        DriverKind::Http => Ok(Arc::new(HttpBrowser::new(
            settings.nav_timeout(),
            settings.respect_robots,
            settings.user_agent,
        ))),
        #[cfg(feature = "chromium")]
        DriverKind::Chromium => Ok(Arc::new(
            review_claw::driver::chromium::ChromiumBrowser::new(headless, settings.user_agent),
        )),
        #[cfg(not(feature = "chromium"))]
        DriverKind::Chromium => {
            let _ = headless;
            anyhow::bail!("this build has no Chromium driver; rebuild with --features chromium")
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs)?;

    let settings = Settings::load(cli.config.as_deref()).context("loading settings")?;

    match cli.command {
        Commands::Harvest {
            company,
            start_date,
            end_date,
            source,
            headless: _,
            no_headless,
            output,
        } => {
            let window = DateWindow::parse(&start_date, &end_date)?;
            let req = HarvestRequest {
                company,
                window,
                selection: source,
                headless: !no_headless,
            };
            let browser = build_browser(cli.driver, &settings, req.headless)?;
            let report = ReviewHarvester::new(browser.as_ref(), &settings)
                .run(&req)
                .await?;

            for tally in &report.per_source {
                println!("Collected {} reviews from {}", tally.collected, tally.source);
            }
            let path = output.unwrap_or_else(|| output_filename(&req.company));
            write_reviews(&path, &report.reviews)?;
            println!("Saved {} reviews to {}", report.reviews.len(), path.display());
        }
        Commands::Serve { bind } => {
            let headless = true;
            let browser = build_browser(cli.driver, &settings, headless)?;
            info!(driver = ?cli.driver, headless, "service ready");
            let state = AppState {
                settings: Arc::new(settings),
                browser,
                headless,
            };
            serve(&bind, state).await?;
        }
    }
    Ok(())
}
