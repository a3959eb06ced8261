//! Tandem terminal client.
//!
//! Connects to a tandem-server, restores your ID, your partner's ID and your
//! durations from a local preferences file, and runs an interactive prompt.
//! Two participants who link with each other share one timer.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin tandem-client
//! cargo run --bin tandem-client -- --prefs bob.json
//! cargo run --bin tandem-client -- -u ws://192.168.0.10:8080/ws --single-writer-completion
//! ```

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use tandem_client::{
    infrastructure::{
        notifier::ChannelNotifier, preference::JsonFilePreferenceStore,
        store::WebSocketRemoteStore,
    },
    ui::run_session,
    usecase::{CompletionPolicy, SessionController},
};
use tandem_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "tandem-client")]
#[command(about = "Two-party synchronized focus timer", long_about = None)]
struct Args {
    /// WebSocket URL of the tandem-server store
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080/ws")]
    url: String,

    /// Device-local preferences file
    #[arg(short = 'p', long, default_value = "tandem-prefs.json")]
    prefs: PathBuf,

    /// Only the participant whose ID sorts first records completed segments
    #[arg(long)]
    single_writer_completion: bool,

    /// Default log level (overridden by RUST_LOG)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    if let Err(e) = run(args).await {
        tracing::error!("Client error: {}", e);
        eprintln!("Client error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let store = WebSocketRemoteStore::connect(&args.url).await?;
    let preferences = JsonFilePreferenceStore::open(&args.prefs);
    tracing::info!("Using preferences at {}", preferences.path().display());

    let (notifier, notices) = ChannelNotifier::new();
    let policy = if args.single_writer_completion {
        CompletionPolicy::LowestIdentifier
    } else {
        CompletionPolicy::EveryClient
    };

    let controller = SessionController::new(
        Arc::new(store),
        Arc::new(preferences),
        Arc::new(notifier),
        policy,
    );
    run_session(controller, notices).await
}
