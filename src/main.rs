use dotenvy::dotenv;
use mess_manager::{
    config::{database, members},
    core::{ledger::Ledger, period::Period, settlement::format_report_summary},
    errors::Result,
};
use std::env;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Month to settle: first argument, else the current month
    let period = match env::args().nth(1) {
        Some(arg) => arg.parse::<Period>().inspect_err(|e| error!("{e}"))?,
        None => Period::current(),
    };

    // 4. Open the ledger
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to open database: {}", e))?;
    database::create_tables(&db).await?;
    let ledger = Ledger::new(db);

    // 5. Seed members from the optional config file
    let config = members::load_default_config()?.unwrap_or_default();
    if !config.members.is_empty() {
        let added = ledger.seed_members(&config.members).await?;
        info!("Seeded {} new members from config", added);
    }

    // 6. Settle the month
    let report = ledger.report(period).await?;
    if let Some(name) = &config.mess_name {
        println!("{name}");
    }
    print!("{}", format_report_summary(&report));

    Ok(())
}
