use std::process::ExitCode;
use std::sync::Arc;

use chrono::Local;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use cachebox::batch::BatchScheduler;
use cachebox::config::load_config;
use cachebox::error::RunError;
use cachebox::http_probe::prelude::*;
use cachebox::http_probe::report;
use cachebox::logging;
use cachebox::report::{RunReport, console_line, summary_block};
use cachebox::source::{ConfiguredUrls, UrlSource};

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", report(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), RunError> {
    let config = load_config()?;
    let urls = ConfiguredUrls::new(config.urls.clone()).urls().await?;
    let prober = Arc::new(HttpProber::new()?);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, finishing current batch");
            on_interrupt.cancel();
        }
    });

    let url_width = urls.iter().map(|url| url.len()).max().unwrap_or(40).min(80);
    let (progress, mut records) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(record) = records.recv().await {
            eprintln!("{}", console_line(&record, url_width));
        }
    });

    let scheduler = BatchScheduler::new(prober, config.run.clone())
        .with_cancellation(cancel)
        .with_progress(progress);
    let batch_run = scheduler.run(&urls).await;
    // closes the progress channel so the printer drains and exits
    drop(scheduler);
    let _ = printer.await;

    let report = RunReport::new(batch_run, Local::now());
    eprintln!("{}", summary_block(&report.summary));

    let json = serde_json::to_string_pretty(&report)?;
    match &config.report_file {
        Some(path) => {
            tokio::fs::write(path, json).await?;
            tracing::info!(path = %path.display(), "report written");
        }
        None => println!("{json}"),
    }

    Ok(())
}
