//! Smart-farm dashboard CLI
//!
//! Entry point for session management, live channel monitoring and sensor
//! series export.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use anyhow::{Context, bail};
use chrono::Local;
use clap::Parser;
use dotenvy::dotenv;
use tracing::{info, warn};
use url::Url;

use smartfarm_dash::AppContext;
use smartfarm_dash::api::series;
use smartfarm_dash::channel::{ChannelStatus, Record};
use smartfarm_dash::config::{AppConfig, Cli, Command};
use smartfarm_dash::session::{Credentials, UserName};
use smartfarm_dash::telemetry;

/// Longest string field printed verbatim by `watch`.
const MAX_FIELD_PREVIEW: usize = 64;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present)
    let _ = dotenv();

    let cli = Cli::parse();
    let config = AppConfig::from_cli(&cli).context("Failed to load configuration")?;
    telemetry::init(config.logging.json);

    info!(
        name: "config.loaded",
        api = %config.api.base_url,
        storage = %config.storage.path.display(),
        "Configuration loaded"
    );

    let ctx = AppContext::bootstrap(config).await?;

    match cli.command {
        Command::Login {
            name,
            token,
            expires_in,
        } => login(&ctx, name, token, expires_in).await,
        Command::Logout => {
            let session = ctx.session()?;
            session.logout().await;
            println!("{}", serde_json::to_string(&session.state())?);
            Ok(())
        }
        Command::Whoami => {
            println!("{}", serde_json::to_string(&ctx.session()?.state())?);
            Ok(())
        }
        Command::Watch {
            endpoint,
            fields,
            count,
        } => watch(&ctx, endpoint, fields, count).await,
        Command::Series { metric } => {
            let records = ctx.dashboard_client()?.environment().await?;
            for point in series(&records, metric.into()) {
                println!("{}\t{}", point.at, point.value);
            }
            Ok(())
        }
        Command::Operations { device, week } => {
            let history = ctx
                .dashboard_client()?
                .operation_history(device.as_deref())
                .await?;
            if history.is_empty() {
                warn!(name: "operations.empty", "No operation history recorded");
            }
            let week = week.unwrap_or_else(|| Local::now().date_naive());
            for day in history.week(week) {
                println!(
                    "{}\t{}\t{}\t{}",
                    day.date.format("%Y-%m-%d %a"),
                    day.totals.wtime1,
                    day.totals.wtime2,
                    day.totals.ctime
                );
            }
            Ok(())
        }
    }
}

async fn login(
    ctx: &AppContext,
    name: UserName,
    token: String,
    expires_in: i64,
) -> anyhow::Result<()> {
    Credentials::new(name.clone(), token, expires_in)?
        .persist(ctx.storage.as_ref())
        .await
        .context("Failed to persist credentials")?;

    let session = ctx.session()?;
    session.login(name).await;
    println!("{}", serde_json::to_string(&session.state())?);
    Ok(())
}

async fn watch(
    ctx: &AppContext,
    endpoint: Option<String>,
    fields: Vec<String>,
    count: Option<usize>,
) -> anyhow::Result<()> {
    let channel = &ctx.config.channel;
    let endpoint = Url::parse(endpoint.as_deref().unwrap_or(&channel.endpoint))
        .context("Invalid channel endpoint")?;
    let fields = if fields.is_empty() {
        channel.expected_fields.clone()
    } else {
        fields
    };
    let policy = channel.reconnect_policy();

    let subscription = ctx.subscriber().subscribe(endpoint, fields);
    let mut updates = subscription.watch();
    let mut seen: u64 = 0;
    let mut printed: usize = 0;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }

        let snapshot = updates.borrow_and_update().clone();
        if snapshot.accepted > seen {
            seen = snapshot.accepted;
            if let Some(record) = &snapshot.value {
                println!("{}", preview(record));
                printed += 1;
            }
            if count.is_some_and(|limit| printed >= limit) {
                break;
            }
        }

        if snapshot.status.is_terminal(policy) {
            match snapshot.status {
                ChannelStatus::Failed(reason) => {
                    subscription.unsubscribe();
                    bail!("live channel failed: {reason}");
                }
                _ => {
                    warn!(name: "channel.watch.closed", "Live channel closed by server");
                    break;
                }
            }
        }
    }

    subscription.unsubscribe();
    Ok(())
}

/// Render a record with long string fields (e.g. base64 images) elided.
fn preview(record: &Record) -> String {
    let shortened: Record = record
        .iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) if s.len() > MAX_FIELD_PREVIEW => {
                    serde_json::Value::String(format!("<{} chars>", s.len()))
                }
                other => other.clone(),
            };
            (key.clone(), value)
        })
        .collect();
    serde_json::Value::Object(shortened).to_string()
}
