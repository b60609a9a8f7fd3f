use anyhow::{Context, Result, bail};
use fleetwatch::*;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

const USAGE: &str = "usage: fleetwatch [render] | fleetwatch append <response.json> [columns.json]";

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    tracing::info!("Starting {}", version::label());
    let app_config = config::AppConfig::load()?;
    let history = history_log::HistoryLog::new(&app_config.log.path);

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None | Some("render") => {}
        Some("append") => {
            let Some(response_path) = args.get(1) else {
                bail!(USAGE);
            };
            let body = std::fs::read_to_string(response_path)
                .with_context(|| format!("read {}", response_path))?;
            let columns = match args.get(2) {
                Some(path) => {
                    let raw = std::fs::read_to_string(path)
                        .with_context(|| format!("read {}", path))?;
                    serde_json::from_str::<Vec<String>>(&raw)
                        .with_context(|| format!("parse column list {}", path))?
                }
                None => collector::default_columns(),
            };
            let collected_at = chrono::Local::now()
                .format(collector::COLLECTED_AT_FORMAT)
                .to_string();
            let appended = collector::import(&body, &columns, &history, &collected_at)?;
            tracing::info!("Appended {} snapshots to {}", appended, history.path().display());
        }
        Some(other) => bail!("unknown command {:?}\n{}", other, USAGE),
    }

    let contents = history.read()?;
    let report = report::build_report(&contents, &app_config, chrono::Utc::now());
    render::write_outputs(&report, &app_config.report)?;
    tracing::info!("Dashboard written to {}", app_config.report.html_path);
    Ok(())
}
