mod config;
mod db;
mod errors;
mod extract;
mod import;
mod intake;
mod llm_client;
mod lookup;
mod map;
mod models;
mod requests;
mod routes;
mod state;
mod status;
mod store;
#[cfg(test)]
mod testing;

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::intake::pipeline::process_report;
use crate::llm_client::LlmClient;
use crate::lookup::LookupCache;
use crate::map::heat::{GridHeatRenderer, HeatRenderer};
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::postgres::PgStore;

const USAGE: &str = "Usage: api [serve | import <csv> [--limit N] | intake <text> | \
                     intake --batch <file> [--out F] | evaluate <csv>]";

#[derive(Debug, PartialEq)]
enum Command {
    Serve,
    Import { path: PathBuf, limit: Option<usize> },
    Intake(IntakeInput),
    Evaluate { path: PathBuf },
}

#[derive(Debug, PartialEq)]
enum IntakeInput {
    Text(String),
    Batch { input: PathBuf, output: Option<PathBuf> },
}

/// Value following `flag`, if the flag is present.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Result<Option<&'a String>> {
    match args.iter().position(|a| a == flag) {
        Some(idx) => {
            let value = args
                .get(idx + 1)
                .with_context(|| format!("{flag} needs a value"))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

fn parse_args(args: &[String]) -> Result<Command> {
    match args.get(1).map(String::as_str) {
        None | Some("serve") => Ok(Command::Serve),
        Some("import") => {
            let Some(path) = args.get(2) else {
                bail!("Usage: api import <csv> [--limit N]");
            };
            let limit = match flag_value(args, "--limit")? {
                Some(raw) => Some(
                    raw.parse()
                        .with_context(|| format!("Invalid --limit '{raw}'"))?,
                ),
                None => None,
            };
            Ok(Command::Import {
                path: PathBuf::from(path),
                limit,
            })
        }
        Some("intake") => {
            if args.get(2).map(String::as_str) == Some("--batch") {
                let Some(input) = args.get(3) else {
                    bail!("Usage: api intake --batch <file> [--out F]");
                };
                return Ok(Command::Intake(IntakeInput::Batch {
                    input: PathBuf::from(input),
                    output: flag_value(args, "--out")?.map(PathBuf::from),
                }));
            }
            let text = args.get(2..).unwrap_or_default().join(" ");
            if text.trim().is_empty() {
                bail!("Usage: api intake <text>");
            }
            Ok(Command::Intake(IntakeInput::Text(text)))
        }
        Some("evaluate") => match args.get(2) {
            Some(path) => Ok(Command::Evaluate {
                path: PathBuf::from(path),
            }),
            None => bail!("Usage: api evaluate <csv>"),
        },
        Some(other) => bail!("Unknown command '{other}'. {USAGE}"),
    }
}

fn init_tracing(rust_log: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    match parse_args(&args)? {
        Command::Serve => serve().await,
        Command::Import { path, limit } => {
            let database_url = config::database_url_from_env()?;
            init_tracing(&env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()));

            let db = create_pool(&database_url).await?;
            let report = import::run_import(&db, &path, limit).await?;
            info!(
                "Import finished: {} rows read, {} skipped, {} lookup names seeded, {} inserted",
                report.rows_read, report.rows_skipped, report.seeded_lookups, report.inserted
            );
            Ok(())
        }
        Command::Intake(input) => run_intake(input).await,
        Command::Evaluate { path } => {
            let services = IntakeServices::from_env().await?;
            let rows = intake::evaluate::read_labelled(&path)?;
            info!("Evaluating {} labelled reports from {}", rows.len(), path.display());
            let report = intake::evaluate::evaluate(
                &services.model,
                &services.store,
                &services.lookups,
                &rows,
            )
            .await?;
            println!("{report}");
            Ok(())
        }
    }
}

/// Store, lookups and model for the command-line intake tools.
struct IntakeServices {
    store: PgStore,
    lookups: LookupCache,
    model: LlmClient,
}

impl IntakeServices {
    async fn from_env() -> Result<Self> {
        let config = Config::from_env()?;
        init_tracing(&config.rust_log);
        let store = PgStore::new(create_pool(&config.database_url).await?);
        let lookups = LookupCache::load(&store)
            .await
            .context("Failed to load lookup tables")?;
        let model = LlmClient::new(config.anthropic_api_key, config.llm_model)?;
        Ok(Self {
            store,
            lookups,
            model,
        })
    }
}

async fn run_intake(input: IntakeInput) -> Result<()> {
    let services = IntakeServices::from_env().await?;
    match input {
        IntakeInput::Text(text) => {
            let outcome =
                process_report(&services.model, &services.store, &services.lookups, &text).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        IntakeInput::Batch { input, output } => {
            let reports = intake::batch::read_reports(&input)?;
            let results = intake::batch::process_reports(
                &services.model,
                &services.store,
                &services.lookups,
                &reports,
            )
            .await?;
            let output = output.unwrap_or_else(|| intake::batch::default_output_path(&input));
            intake::batch::write_results(&output, &results)?;
            info!("Processed {} reports. Results saved to {}", results.len(), output.display());
        }
    }
    Ok(())
}

async fn serve() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;
    init_tracing(&config.rust_log);

    info!("Starting Boston 311 API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL and load reference data
    let db = create_pool(&config.database_url).await?;
    let store = Arc::new(PgStore::new(db));
    let lookups = LookupCache::load(store.as_ref())
        .await
        .context("Failed to load lookup tables")?;

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone(), config.llm_model.clone())?;
    info!("LLM client initialized (model: {})", llm.model());

    let heat: Option<Arc<dyn HeatRenderer>> = if config.heatmap_enabled {
        Some(Arc::new(GridHeatRenderer))
    } else {
        info!("Heat layer disabled; map will draw markers only");
        None
    };

    let state = AppState {
        store,
        lookups: Arc::new(lookups),
        intake: Arc::new(llm),
        heat,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the dashboard host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr} (fetch mode: {:?})", config.fetch_mode);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
