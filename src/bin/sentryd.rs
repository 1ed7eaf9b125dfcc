//! sentryd - motion detection streaming daemon
//!
//! This daemon:
//! 1. Opens the configured frame source (stub:// or dir://)
//! 2. Runs the detection pipeline on its own thread
//! 3. Publishes annotated frames into a latest-frame mailbox
//! 4. Serves the MJPEG stream and health endpoints over HTTP

use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use motion_sentry::{
    build_strategy, open_source, FrameMailbox, Pipeline, PipelineSettings, SentryConfig,
    StreamServer,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path to a JSON config file.
    #[arg(long, env = "SENTRY_CONFIG")]
    config: Option<PathBuf>,
    /// Address the HTTP server binds to (host:port).
    #[arg(long)]
    addr: Option<String>,
    /// Frame source URL (stub://name or dir:///path/to/jpegs).
    #[arg(long)]
    source_url: Option<String>,
    /// Detection strategy (weighted|adaptive).
    #[arg(long)]
    strategy: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = SentryConfig::load_without_validation(args.config.as_deref())?;
    if let Some(addr) = args.addr {
        cfg.stream.addr = addr;
    }
    if let Some(url) = args.source_url {
        cfg.source.url = url;
    }
    if let Some(strategy) = args.strategy {
        cfg.detection.strategy = strategy.parse()?;
    }
    cfg.validate()?;

    let mailbox = Arc::new(FrameMailbox::new());
    let source = open_source(&cfg.source)?;
    let strategy = build_strategy(&cfg.detection);

    let pipeline_handle = Pipeline::new(
        source,
        strategy,
        mailbox.clone(),
        PipelineSettings {
            warmup_frames: cfg.detection.warmup_frames,
            target_width: cfg.detection.target_width,
        },
    )
    .spawn();

    let stream_handle = StreamServer::new(cfg.stream.clone(), mailbox).spawn()?;
    log::info!(
        "sentryd running. source={} strategy={:?} feed=http://{}/feed",
        cfg.source.url,
        cfg.detection.strategy,
        stream_handle.addr
    );

    let (tx, rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = tx.send(());
    })
    .expect("error setting Ctrl-C handler");

    log::info!("sentryd waiting for shutdown signal (Ctrl-C)...");
    let _ = rx.recv();
    log::info!("shutdown signal received, stopping...");
    stream_handle.stop()?;
    pipeline_handle.stop()?;

    Ok(())
}
