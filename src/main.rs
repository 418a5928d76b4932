//! edgar13f command line.
//!
//! Reads `edgar13f.toml` (or the path given with `--config`) and `EDGAR13F_*` environment
//! variables (`EDGAR13F_TABLES__HOLDINGS` for nested keys), then runs one of:
//!
//! ```text
//! edgar13f links --year 2020 --prior-years 1   # list published master index files
//! edgar13f delta --year 2020                   # list files not processed yet
//! edgar13f run   --year 2020 --skip-errors     # crawl them into the database
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context as _, bail};
use chrono::Datelike;
use clap::{Args, Parser, Subcommand};
use edgar13f::{
    DEFAULT_PROGRESS_EVERY, Edgar, EdgarConfig, ErrorPolicy, FORM_13F_HR, LinkDelta, Pipeline,
    PipelineOptions, Store, TableNames,
};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Incremental SEC Form 13F-HR crawler")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "edgar13f.toml")]
    config: PathBuf,

    /// SQLite database file; overrides the configuration.
    #[arg(long)]
    database: Option<PathBuf>,

    /// SEC.gov-required user agent (e.g. "MyApp you@example.com"); overrides the configuration.
    #[arg(long)]
    user_agent: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the daily master index files published for the requested years.
    Links(Years),
    /// List the master index files that have not been processed yet.
    Delta(Years),
    /// Crawl unprocessed master index files and store their 13F filings.
    Run {
        #[command(flatten)]
        years: Years,

        /// Skip malformed filings instead of aborting the run.
        #[arg(long)]
        skip_errors: bool,
    },
}

#[derive(Args)]
struct Years {
    /// Last year to crawl; defaults to the current year.
    #[arg(long)]
    year: Option<i32>,

    /// Number of years before `--year` to include.
    #[arg(long)]
    prior_years: Option<i32>,
}

impl Years {
    fn year(&self) -> i32 {
        self.year.unwrap_or_else(|| chrono::Local::now().year())
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Settings {
    user_agent: String,
    database: PathBuf,
    rate_limit: u32,
    timeout_secs: u64,
    max_retries: u32,
    speed_bump_ms: u64,
    batch_size: usize,
    progress_every: usize,
    form_type: String,
    error_policy: ErrorPolicy,
    tables: TableNames,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            user_agent: String::new(),
            database: PathBuf::from("edgar13f.db"),
            rate_limit: 10,
            timeout_secs: 30,
            max_retries: 0,
            speed_bump_ms: 100,
            batch_size: 500,
            progress_every: DEFAULT_PROGRESS_EVERY,
            form_type: FORM_13F_HR.to_string(),
            error_policy: ErrorPolicy::Abort,
            tables: TableNames::default(),
        }
    }
}

impl Settings {
    fn load(cli: &Cli) -> anyhow::Result<Self> {
        let mut settings: Settings = config::Config::builder()
            .add_source(config::File::from(cli.config.clone()).required(false))
            .add_source(
                config::Environment::with_prefix("EDGAR13F")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("failed to deserialise Settings")?;

        if let Some(user_agent) = &cli.user_agent {
            settings.user_agent = user_agent.clone();
        }
        if let Some(database) = &cli.database {
            settings.database = database.clone();
        }
        if settings.user_agent.trim().is_empty() {
            bail!("a user agent is required (--user-agent or EDGAR13F_USER_AGENT)");
        }
        Ok(settings)
    }

    fn edgar_config(&self) -> EdgarConfig {
        EdgarConfig::new(
            &self.user_agent,
            self.rate_limit,
            Duration::from_secs(self.timeout_secs),
            None,
        )
        .with_max_retries(self.max_retries)
    }

    fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions::new()
            .with_form_type(&self.form_type)
            .with_error_policy(self.error_policy)
            .with_speed_bump(Duration::from_millis(self.speed_bump_ms))
            .with_batch_size(self.batch_size)
            .with_progress_every(self.progress_every)
            .with_tables(self.tables.clone())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(&cli)?;

    let edgar = Edgar::with_config(settings.edgar_config()).context("failed to create Edgar client")?;
    let urls = edgar.urls().clone();
    let store = Store::open(&settings.database)
        .with_context(|| format!("failed to open database at {:?}", settings.database))?;

    let mut options = settings.pipeline_options();
    if let Command::Run {
        skip_errors: true, ..
    } = &cli.command
    {
        options = options.with_error_policy(ErrorPolicy::Skip);
    }
    let mut pipeline = Pipeline::new(edgar, urls, store, options);

    match &cli.command {
        Command::Links(years) => {
            let links = pipeline
                .crawler()
                .master_index_links(years.year(), years.prior_years)
                .await
                .context("failed to list master index files")?;
            for link in links {
                println!("{link}");
            }
        }
        Command::Delta(years) => {
            let delta = pipeline
                .delta(years.year(), years.prior_years)
                .await
                .context("failed to resolve unprocessed links")?;
            match delta {
                LinkDelta::Initialized => println!("link table created; run again to list files"),
                LinkDelta::UpToDate => println!("database is up to date"),
                LinkDelta::Unseen(links) => {
                    for link in links {
                        println!("{link}");
                    }
                }
            }
        }
        Command::Run { years, .. } => {
            let report = pipeline
                .run(years.year(), years.prior_years)
                .await
                .context("crawl failed")?;
            println!("{report:#?}");
        }
    }

    Ok(())
}
