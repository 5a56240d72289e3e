use dotenvy::dotenv;
use invoice_ledger::{
    config::{database, settings},
    core::{
        report, team,
        tenancy::{AuthContext, CurrentUser},
    },
    entities::Profile,
    errors::{Error, Result},
};
use sea_orm::{DatabaseConnection, EntityTrait};
use std::env;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file (non-fatal, env vars can be set externally)
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the application configuration
    let config = settings::load_default_config()
        .inspect_err(|e| error!("Failed to load application configuration: {}", e))?;

    // 4. Connect and make sure the schema exists
    tokio::fs::create_dir_all(&config.storage.root).await?;
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Promote the first admin if requested
    let Ok(admin_id) = env::var("LEDGER_BOOTSTRAP_ADMIN") else {
        info!("LEDGER_BOOTSTRAP_ADMIN not set, nothing else to do.");
        return Ok(());
    };
    match team::bootstrap_admin(&db, &admin_id).await {
        Ok(promoted) => info!(user_id = %admin_id, promoted, "Admin bootstrap finished"),
        Err(Error::NotFound { .. }) => {
            warn!(user_id = %admin_id, "Bootstrap admin has never signed in, skipping");
            return Ok(());
        }
        Err(e) => return Err(e),
    }

    // 6. Log the dashboard of that admin's workspace
    log_dashboard(&db, &admin_id).await
}

async fn log_dashboard(db: &DatabaseConnection, user_id: &str) -> Result<()> {
    let Some(profile) = Profile::find_by_id(user_id.to_string()).one(db).await? else {
        return Ok(());
    };
    let user = CurrentUser {
        id: profile.id,
        email: profile.email,
    };
    let ctx = AuthContext::for_user(db, Some(user)).await?;
    match report::dashboard(db, &ctx).await {
        Ok(dash) => info!(
            revenue = dash.summary.total_revenue,
            pending = dash.summary.pending_amount,
            pending_count = dash.summary.pending_count,
            expenses = dash.summary.total_expenses,
            net = dash.summary.net_profit,
            active_debt = dash.active_debt_total,
            "Dashboard"
        ),
        Err(e) => warn!(user_id, error = %e, "Dashboard unavailable"),
    }
    Ok(())
}
