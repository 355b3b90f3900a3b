use anyhow::{bail, Context};
use conflict_harness::{HarnessConfig, ScenarioRunner};
use tracing::{error, info};
use transfer_engine::postgres::PgStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = HarnessConfig::from_env().context("loading configuration")?;

    info!("conflict harness starting");

    let store = PgStore::connect_with_retry(config.database.clone(), config.retry_policy())
        .await
        .context("waiting for store")?;

    let runner = ScenarioRunner::new(store);
    let outcomes = runner.run_all().await.context("running scenarios")?;

    let mut failures = 0usize;
    for outcome in &outcomes {
        info!(
            scenario = %outcome.scenario,
            passed = outcome.passed(),
            outcome = %serde_json::to_string(outcome)?,
            "scenario outcome"
        );
        if !outcome.passed() {
            failures += 1;
        }
    }

    if failures > 0 {
        error!(failures, total = outcomes.len(), "harness run failed");
        bail!("{} of {} scenarios failed", failures, outcomes.len());
    }

    info!(total = outcomes.len(), "all scenarios passed");
    Ok(())
}
