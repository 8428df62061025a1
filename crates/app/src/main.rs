//! SafeView scenario simulator.

use anyhow::{bail, Context, Result};
use catalog::{ApprovedVideos, MemoryStore, MetadataSource, StaticMetadata, VideoMetadata};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use safeview::{AppConfig, Scenario, DEFAULT_VIDEO_ID};

/// Replays containment scenarios against a scripted player.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Use the mobile profile and screen
    #[arg(long)]
    mobile: bool,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Scenarios to run: a..f, comma separated, or "all"
    #[arg(long, default_value = "all")]
    scenario: String,

    /// Video to mount
    #[arg(long, default_value = DEFAULT_VIDEO_ID)]
    video_id: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("SafeView v{}", safeview::VERSION);

    let config = match &args.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None if args.mobile => AppConfig::mobile(),
        None => AppConfig::desktop(),
    };

    let Some(scenarios) = Scenario::parse_selection(&args.scenario) else {
        bail!("unknown scenario selection '{}'", args.scenario);
    };

    // Only approved videos reach the player.
    let metadata = StaticMetadata::new();
    metadata.insert(
        VideoMetadata::new(args.video_id.clone(), "Demo video")
            .with_duration("3:00")
            .with_channel("UCdemo", "Demo Channel"),
    );
    let approved = ApprovedVideos::new(Arc::new(MemoryStore::new()));
    let video = metadata.fetch_video_metadata(&args.video_id).await?;
    approved.approve(video.clone()).await?;
    if !approved.is_approved(&args.video_id).await? {
        bail!("{} is not on the approved list", args.video_id);
    }
    info!("Mounting '{}' from {}", video.title, video.owner_channel_title);

    let mut failed = 0;
    for scenario in scenarios {
        let report = scenario.run(&config, args.mobile, &args.video_id)?;
        println!("{}", report);
        if !report.passed() {
            failed += 1;
        }
    }

    if failed > 0 {
        bail!("{} scenario(s) failed", failed);
    }
    info!("All scenarios passed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_default() {
        let args = Args::parse_from(["safeview"]);
        assert_eq!(args.scenario, "all");
        assert_eq!(args.video_id, DEFAULT_VIDEO_ID);
        assert!(!args.mobile);
        assert!(args.config.is_none());
    }

    #[test]
    fn test_args_mobile_scenario() {
        let args = Args::parse_from(["safeview", "--mobile", "--scenario", "a,e", "-v"]);
        assert!(args.mobile && args.verbose);
        assert_eq!(args.scenario, "a,e");
    }
}
