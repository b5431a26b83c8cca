use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use log::{error, info, warn};
use tokio::sync::broadcast::error::RecvError;

use gradewatch::logging::{self, LogFormat};
use gradewatch::{
    load_config, Collection, EntityKind, HttpStatusSource, JobTracker, StoreChange, TrackerConfig,
};

const USAGE: &str = "\
Usage: gradewatch (--config <file> | --base-url <url>) [--json-logs] <target>

Targets:
  submissions <assignment-id>   watch the evaluation of every submission
  assignment <assignment-id>    watch document processing of one assignment
  assignments                   refresh the assignment list until interrupted";

#[derive(Debug, PartialEq)]
struct CliArgs {
    config: Option<PathBuf>,
    base_url: Option<String>,
    log_format: LogFormat,
    collection: Collection,
}

fn parse_args<I>(args: I) -> Result<CliArgs, String>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut config = None;
    let mut base_url = None;
    let mut log_format = LogFormat::Pretty;
    let mut positional = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                config = Some(PathBuf::from(
                    args.next().ok_or("--config needs a file path")?,
                ))
            }
            "--base-url" => base_url = Some(args.next().ok_or("--base-url needs a URL")?),
            "--json-logs" => log_format = LogFormat::Json,
            flag if flag.starts_with("--") => return Err(format!("Unknown option '{}'", flag)),
            _ => positional.push(arg.clone()),
        }
    }

    if config.is_none() && base_url.is_none() {
        return Err("Either --config or --base-url is required".to_string());
    }

    let collection = match positional
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .as_slice()
    {
        ["submissions", id] => Collection::Submissions {
            assignment_id: id.to_string(),
        },
        ["assignment", id] => Collection::Assignment { id: id.to_string() },
        ["assignments"] => Collection::Assignments,
        [] => return Err("Missing target".to_string()),
        other => return Err(format!("Unrecognized target '{}'", other.join(" "))),
    };

    Ok(CliArgs {
        config,
        base_url,
        log_format,
        collection,
    })
}

fn report(tracker: &JobTracker, id: &str) {
    let Some(entity) = tracker.entity(id) else {
        return;
    };

    let labels = tracker
        .labels(id)
        .into_iter()
        .map(|(kind, label)| format!("{}: {}", kind, label))
        .collect::<Vec<_>>()
        .join(", ");
    let name = entity.name.as_deref().unwrap_or("-");

    match entity.kind {
        EntityKind::Submission => info!(
            "{} ({}) {} score={} [{}]",
            entity.id,
            name,
            entity.status,
            entity
                .score
                .map(|s| format!("{:.1}", s))
                .unwrap_or_else(|| "-".to_string()),
            labels
        ),
        EntityKind::Assignment => info!(
            "{} ({}) {}% {} [{}]",
            entity.id,
            name,
            tracker.progress(id).unwrap_or(0),
            tracker
                .readiness(id)
                .map(|r| r.to_string())
                .unwrap_or_default(),
            labels
        ),
    }
}

fn report_all(tracker: &JobTracker) {
    for entity in tracker.entities() {
        report(tracker, &entity.id);
    }
    if matches!(tracker.collection(), Some(Collection::Submissions { .. })) {
        let stats = tracker.stats();
        info!(
            "{} graded: mean {:.1}, std-dev {:.2}, median {:.1}, min {:.1}, max {:.1}",
            stats.count, stats.mean, stats.std_dev, stats.median, stats.min, stats.max
        );
    }
}

async fn run(args: CliArgs) -> gradewatch::Result<()> {
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => TrackerConfig::with_base_url(args.base_url.as_deref().unwrap_or_default()),
    };

    let source = Arc::new(HttpStatusSource::new(&config.source)?);
    let tracker = JobTracker::new(source, config);
    tracker.load(args.collection).await?;
    report_all(&tracker);

    let mut events = tracker.subscribe();
    let Some(session) = tracker.start_polling() else {
        info!("Everything has settled");
        return Ok(());
    };

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping");
                tracker.stop();
                break;
            }
            _ = session.finished() => break,
            event = events.recv() => match event {
                Ok(event) => {
                    if let StoreChange::Updated { id, just_updated: true } = &event.change {
                        report(&tracker, id);
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!("Skipped {} store events", skipped),
                Err(RecvError::Closed) => break,
            },
        }
    }

    report_all(&tracker);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}\n\n{}", message, USAGE);
            return ExitCode::from(2);
        }
    };

    if let Err(e) = logging::init(args.log_format) {
        eprintln!("{}", e);
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
