//! poller - queue を読んで message をログに出す worker
//!
//! ```text
//! poller                 # bounded: 60 秒 or 空の poll で終了
//! poller forever         # 止められるまで poll し続ける
//! poller --config /etc/poller.toml --raw
//! ```

mod logging;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use poller_core::app::PollerBuilder;
use poller_core::config::{DEFAULT_CONFIG_PATH, PollerConfig};
use poller_core::domain::WorkerMode;
use poller_core::impls::{BodyMode, NotificationLogHandler, SqsQueueClient};
use tracing::instrument::WithSubscriber;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "poller", version, about = "Long-poll a queue and log every message")]
struct Args {
    /// `forever` keeps polling until the process is killed.
    #[arg(value_name = "MODE", value_parser = ["forever"], ignore_case = true)]
    mode: Option<String>,

    /// Same as the `forever` mode word.
    #[arg(long)]
    forever: bool,

    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log bodies as-is instead of unwrapping notification envelopes.
    #[arg(long)]
    raw: bool,

    /// DEBUG on the console for every crate, SDK included.
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn worker_mode(&self) -> WorkerMode {
        WorkerMode::from_forever_flag(self.forever || self.mode.is_some())
    }

    fn body_mode(&self, config: &PollerConfig) -> BodyMode {
        if self.raw {
            BodyMode::Raw
        } else {
            config.handler.body_mode
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("poller: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let config = PollerConfig::load(&args.config)
        .with_context(|| format!("loading config from {}", args.config.display()))?;
    let (dispatch, _guards) = logging::build_dispatch(&config, args.debug)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting tokio runtime")?;
    Ok(runtime.block_on(serve(args, config).with_subscriber(dispatch)))
}

async fn serve(args: Args, config: PollerConfig) -> ExitCode {
    let mode = args.worker_mode();
    let body_mode = args.body_mode(&config);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        queue = %config.aws.queue_name,
        region = %config.aws.region,
        %mode,
        ?body_mode,
        "poller starting"
    );

    let client = SqsQueueClient::from_config(&config.aws).await;
    let poller = PollerBuilder::from_config(&config)
        .client(Arc::new(client))
        .handler(Arc::new(NotificationLogHandler::new(body_mode)))
        .mode(mode)
        .build(&config.aws.queue_name)
        .await;

    let poller = match poller {
        Ok(poller) => poller,
        Err(e) => {
            error!(error = %e, "could not start poller");
            return ExitCode::FAILURE;
        }
    };

    let report = poller.run().await;
    info!(stop_reason = ?report.stop_reason, had_errors = report.had_errors(), "bye");
    ExitCode::SUCCESS
}
