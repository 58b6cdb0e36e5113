use clap::Parser;
use report::model::SessionReport;
use report::writer::{export_feed, ReportWriter};
use roadcore::store::DetectionStore;
use std::path::PathBuf;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;

mod generator;
mod report;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Offline triage-session driver for the roadwatch engine")]
struct Args {
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Read detections from a JSON feed instead of the workflow's source
    #[arg(long)]
    feed: Option<PathBuf>,
    /// Generate this many synthetic detections
    #[arg(long)]
    generate: Option<usize>,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Run the scripted session and write a JSON report
    #[arg(long, default_value_t = false)]
    offline: bool,
    #[arg(long, default_value = "tools/data/session_report.json")]
    report: PathBuf,
    /// Write the resolved detection batch as a feed document
    #[arg(long)]
    export_feed: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let workflow_config = match args.workflow {
        Some(path) => WorkflowConfig::load(path)?,
        None => WorkflowConfig::default(),
    }
    .with_overrides(args.feed, args.generate, args.seed);

    let feed_label = workflow_config.feed.describe();
    let batch = workflow_config.feed.resolve()?;
    log::info!("resolved {} feed entries from {feed_label}", batch.len());

    if let Some(path) = &args.export_feed {
        export_feed(path, &batch)?;
        println!("Exported {} entries -> {}", batch.len(), path.display());
    }

    if args.offline {
        let runner = Runner::new(workflow_config);
        let result = runner.execute(batch)?;

        println!(
            "Offline session -> accepted {}, dropped {}, steps {}, notifications {}",
            result.load.accepted,
            result.load.dropped,
            result.steps.len(),
            result.notifications.len()
        );
        for note in &result.notifications {
            println!("  [{:?}] {}", note.level, note.message);
        }

        let writer = ReportWriter::new(&args.report);
        writer.write(&SessionReport::new(feed_label, result))?;
        println!(
            "Report written to {} (summary appended to {})",
            args.report.display(),
            writer.log_path().display()
        );
    } else {
        let mut store = DetectionStore::new();
        let load = store.load(batch);
        let [severe, moderate, minor] = store.severity_counts();
        println!(
            "Feed {feed_label}: {} accepted, {} dropped",
            load.accepted, load.dropped
        );
        println!("  severe {severe} | moderate {moderate} | minor {minor}");
        for rejection in &load.rejections {
            println!("  entry {}: {}", rejection.index, rejection.reason);
        }
    }

    Ok(())
}
