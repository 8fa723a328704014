use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    load_settings, ActionOutcome, ConfirmationGate, DashboardState, HttpClusterGateway,
    PreConfirmed, SkipReason, UploadFile, WorkflowController,
};
use shared::domain::{ClusterId, Coherence};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Command-line client for the image clustering service")]
struct Args {
    /// Overrides the configured service URL.
    #[arg(long)]
    server_url: Option<String>,
    /// Where downloaded group archives are written.
    #[arg(long)]
    download_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Lists groups with their stats.
    #[command(alias = "list")]
    Images,
    /// Runs a clustering pass.
    Cluster {
        #[arg(long)]
        eps: Option<f64>,
    },
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Removes every image and grouping on the service.
    Clear {
        #[arg(long)]
        yes: bool,
    },
    /// Saves a group archive; groups are numbered from 1 as displayed.
    Download { group: i64 },
}

const DEFAULT_LOG_FILTER: &str = "info";

/// `RUST_LOG` when it parses, else `info`.
fn log_filter(from_env: Option<String>) -> EnvFilter {
    from_env
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

struct StdinConfirmation;

impl ConfirmationGate for StdinConfirmation {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{prompt} [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim(), "y" | "Y" | "yes")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok()))
        .init();
    let args = Args::parse();

    let mut settings = load_settings()?;
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    if let Some(download_dir) = args.download_dir {
        settings.download_dir = download_dir;
    }
    let server_url = settings.validated_server_url()?;
    let controller =
        WorkflowController::new(Arc::new(HttpClusterGateway::new(server_url)), &settings);

    let outcome = match args.command {
        Command::Images => {
            controller
                .refresh_images()
                .await
                .context("failed to list images")?
                .settled()
                .await;
            print_groups(&controller.snapshot());
            return Ok(());
        }
        Command::Cluster { eps } => {
            controller.load().await;
            if let Some(eps) = eps {
                let level = controller.set_sensitivity(eps);
                println!("Sensitivity {level} ({})", level.label());
            }
            controller.recluster().await
        }
        Command::Upload { paths } => {
            let mut files = Vec::with_capacity(paths.len());
            for path in &paths {
                files.push(UploadFile::from_path(path).await?);
            }
            controller.upload(files).await
        }
        Command::Clear { yes } => {
            if yes {
                controller.clear(&PreConfirmed).await
            } else {
                controller.clear(&StdinConfirmation).await
            }
        }
        Command::Download { group } => {
            if group < 1 {
                bail!("group numbers start at 1");
            }
            let outcome = controller.download(ClusterId(group - 1)).await;
            if matches!(outcome, ActionOutcome::Completed(_)) {
                println!(
                    "Saved {}",
                    controller.archive_path(ClusterId(group - 1)).display()
                );
            }
            outcome
        }
    };

    report(outcome)
}

fn report(outcome: ActionOutcome) -> Result<()> {
    match outcome {
        ActionOutcome::Completed(message) => {
            println!("{message}");
            Ok(())
        }
        ActionOutcome::Failed(message) => bail!(message),
        ActionOutcome::Skipped(reason) => {
            let text = match reason {
                SkipReason::Busy => "another operation is in progress",
                SkipReason::NotEnoughImages => "at least 2 images are needed for clustering",
                SkipReason::NoFiles => "no files to upload",
                SkipReason::NotConfirmed => "cancelled",
            };
            println!("Skipped: {text}");
            Ok(())
        }
    }
}

fn coherence_marker(coherence: &Coherence) -> &'static str {
    match coherence.rating() {
        3 => "***",
        2 => "**",
        1 => "*",
        _ => "-",
    }
}

fn print_groups(state: &DashboardState) {
    println!(
        "{} image(s), {} cluster(s), {}",
        state.total_images,
        state.cluster_count(),
        state.status_label()
    );
    for (cluster_id, images) in state.groups.iter() {
        let stats = state
            .stats_for(*cluster_id)
            .map(|s| {
                format!(
                    "{:.1}% similar, {} {}",
                    s.similarity_percent,
                    s.coherence,
                    coherence_marker(&s.coherence)
                )
            })
            .unwrap_or_else(|| "no stats".to_string());
        println!(
            "Group {} ({} images, {stats})",
            cluster_id.display_number(),
            images.len()
        );
        for image in images {
            println!("  {}", image.filename);
        }
    }
    let unassigned = state.images.iter().filter(|i| i.cluster_id.is_none()).count();
    if unassigned > 0 {
        println!("{unassigned} image(s) not yet clustered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_follow_coherence_rating() {
        assert_eq!(coherence_marker(&Coherence::Excellent), "***");
        assert_eq!(coherence_marker(&Coherence::Good), "**");
        assert_eq!(coherence_marker(&Coherence::Moderate), "*");
        assert_eq!(coherence_marker(&Coherence::Other("perfect".into())), "-");
    }

    #[test]
    fn parses_download_and_cluster_subcommands() {
        let args = Args::try_parse_from(["desktop", "download", "2"]).expect("parse");
        assert!(matches!(args.command, Command::Download { group: 2 }));

        let args = Args::try_parse_from(["desktop", "--server-url", "http://h:1", "cluster", "--eps", "0.3"])
            .expect("parse");
        assert_eq!(args.server_url.as_deref(), Some("http://h:1"));
        assert!(matches!(args.command, Command::Cluster { eps: Some(e) } if e == 0.3));
    }

    #[test]
    fn logs_at_info_unless_rust_log_says_otherwise() {
        assert_eq!(log_filter(None).to_string(), "info");
        assert_eq!(log_filter(Some("debug".into())).to_string(), "debug");
        assert_eq!(log_filter(Some("desktop=loudest".into())).to_string(), "info");
    }

    #[test]
    fn upload_requires_paths() {
        assert!(Args::try_parse_from(["desktop", "upload"]).is_err());
    }
}
