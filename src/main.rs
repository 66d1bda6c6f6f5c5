mod config;
mod deliver;
mod draft;
mod groups;
mod llm;
mod period;
mod render;
mod schedule;
mod slack;
mod sources;
mod store;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "varsla",
    version,
    about = "Date-triggered Slack reminders for earnings and macro events"
)]
struct Cli {
    #[arg(short, long, default_value = "config.toml")]
    config: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the on-disk layout and a sample config.toml
    Init,
    /// Schedule reminders from unparsed earnings report files
    PopulateReports,
    /// Schedule reminders from the macro event calendar
    PopulateMacro,
    /// Post today's day-files to their Slack channels
    Send,
    /// Draft message proposals with the LLM into inbox/
    Draft {
        /// Topic or title hint for the draft
        #[arg(long, default_value = "")]
        title: String,
        /// What the message should cover
        #[arg(long, default_value = "")]
        body: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Init => {
            let cfg = config::load(&cli.config)?;
            config::init_config_dir(&cfg.store.base_dir).await?;
            tracing::info!("Initialized {}", cfg.store.base_dir.display());
        }
        Commands::PopulateReports => {
            let cfg = config::load(&cli.config)?;
            schedule::populate_reports(&cfg)?;
        }
        Commands::PopulateMacro => {
            let cfg = config::load(&cli.config)?;
            schedule::populate_macro(&cfg)?;
        }
        Commands::Send => {
            let cfg = config::load(&cli.config)?;
            send(&cfg).await?;
        }
        Commands::Draft { title, body } => {
            let cfg = config::load(&cli.config)?;
            let written = draft::generate(&cfg, &title, &body).await?;
            for path in &written {
                println!("{}", path.display());
            }
        }
    }
    Ok(())
}

async fn send(cfg: &config::Config) -> Result<()> {
    let Some(token) = cfg.slack.bot_token.as_deref() else {
        anyhow::bail!("SLACK_BOT_TOKEN (or [slack] bot_token) is required");
    };

    let poster = slack::SlackClient::new(token);
    let report = deliver::run(
        &cfg.store.messages_root(),
        deliver::today(),
        &poster,
        cfg.slack.default_channel.as_deref(),
    )
    .await?;

    if report.all_delivered() {
        tracing::info!(
            "Delivery run complete: {} sent, {} empty file(s) skipped",
            report.sent,
            report.skipped_empty
        );
        Ok(())
    } else {
        anyhow::bail!(
            "Delivery run degraded: {} sent, {} failed",
            report.sent,
            report.failed
        )
    }
}
