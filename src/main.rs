use anyhow::Context;
use env_logger::Env;
use orcamento::{config::Config, front, ledger::Ledger, migration};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    env_logger::try_init_from_env(Env::default().default_filter_or(&config.log_filter))?;

    let ledger = Ledger::open(&config.database_url)
        .await
        .context("cannot open ledger")?;

    migration::migrate(ledger.pool(), &config.migrations_dir).await?;

    log::info!("loading templates...");
    let t = front::template::Template::new(&config.templates_dir)?;

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("cannot bind {}", config.listen_addr))?;

    let state = front::AppState {
        ledger: ledger.clone(),
        t,
    };
    let served = front::start_web_server(listener, state, &config.public_dir).await;

    ledger.close().await;
    served
}
