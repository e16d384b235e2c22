//! KannDeutsch: German-English glossary lookup.
//! Main library: read-only entry store, debounced query coordination,
//! result processing, and the terminal driver.

pub mod cancellation;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod entry;
pub mod lifecycle;
pub mod metrics;
pub mod processor;
pub mod repository;
pub mod session;
pub mod store;

use futures_util::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use cli::Command;
use config::Settings;
use entry::SearchConfiguration;
use session::GlossarySession;

pub use coordinator::{ResultBatch, ResultStream, SearchFailure, SearchOutcome};
pub use entry::{Entry, FieldMode, Gender, SortMode};
pub use session::SessionError;
pub use store::StoreError;

/// Install the global tracing subscriber. `RUST_LOG` wins over `default_filter`.
pub fn init_tracing(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .try_init();
}

/// Run the terminal driver until stdin closes or `:quit`.
pub async fn run() -> anyhow::Result<()> {
    let settings = Settings::from_env()?;
    init_tracing(&settings.log_filter);

    info!(db = %settings.database_path.display(), "kanndeutsch starting");

    let (session, mut results) = GlossarySession::new(&settings);

    match session.load().await {
        Ok(total) => println!("{total} entries loaded. Type to search, :quit to exit."),
        Err(e) => println!(
            "{} (type :retry to try again)",
            session.last_error().unwrap_or_else(|| e.to_string())
        ),
    }

    let printer = tokio::spawn(async move {
        while let Some(outcome) = results.next().await {
            match outcome {
                Ok(batch) => print!("{}", cli::render_batch(&batch)),
                Err(failure) => eprintln!("{failure}"),
            }
        }
    });

    let mut config = SearchConfiguration::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Ok(command) => command,
            Err(msg) => {
                eprintln!("{msg}");
                continue;
            }
        };

        match command {
            Command::Query(text) => config.query_text = text,
            Command::Mode(mode) => config.field_mode = mode,
            Command::Sort(sort) => config.sort_mode = sort,
            Command::Idioms(on) => config.idiom_only = on,
            Command::Shuffle => {
                if let Err(e) = session.reshuffle().await {
                    warn!(error = %e, "reshuffle failed");
                    continue;
                }
            }
            Command::Count => {
                println!("{} entries", session.total_entries());
                continue;
            }
            Command::Retry => {
                match session.retry().await {
                    Ok(total) => println!("{total} entries loaded."),
                    Err(e) => println!("{}", session.last_error().unwrap_or_else(|| e.to_string())),
                }
                continue;
            }
            Command::Stats => {
                println!("{}", serde_json::to_string_pretty(&session.metrics().summary())?);
                continue;
            }
            Command::Quit => break,
        }

        session.update(config.clone());
    }

    session.shutdown();
    printer.abort();
    info!("kanndeutsch exiting");
    Ok(())
}
