mod app;
mod keys;
mod settings;

use anyhow::Context;
use app::App;
use settings::AppSettings;
use ssrt_experiment::JsonlStore;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_thread_names(true)
        .init();

    let settings = AppSettings::load()?;
    let store = JsonlStore::open(&settings.store_dir, &settings.collection)
        .with_context(|| format!("opening result store in {}", settings.store_dir.display()))?;
    tracing::info!(path = %store.path().display(), "result store ready");
    let demographic = settings.load_demographic()?;

    let Some(report) = App::run(settings, store, demographic)? else {
        tracing::warn!("window closed before the session produced a report");
        return Ok(());
    };

    tracing::info!(
        end = ?report.end,
        trials = report.trials,
        record_id = ?report.record_id.as_ref().map(ToString::to_string),
        "session finished"
    );
    println!("{}", serde_json::to_string_pretty(&report.summary)?);
    Ok(())
}
