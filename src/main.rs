use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use terapia::api::{create_router, AppState};
use terapia::config::Config;
use terapia::db::Database;
use terapia::models::CreateTherapistInput;
use terapia::report::ReportStore;

#[derive(Parser)]
#[command(name = "terapia")]
#[command(about = "Patient, session, and activity tracking for therapists")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port for the HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
    /// Register a therapist account
    AddTherapist {
        username: String,
        password: String,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "terapia=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn serve(port: u16) -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let db = Database::open(config.db_path.clone())?;
    db.migrate()?;

    let state = AppState {
        db,
        reports: ReportStore::new(config.media_root, config.media_url),
    };
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("terapia server listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Some(Commands::Serve { port }) => serve(port).await?,
        Some(Commands::AddTherapist { username, password }) => {
            let config = Config::from_env()?;
            let db = Database::open(config.db_path)?;
            db.migrate()?;

            let therapist = db.create_therapist(CreateTherapistInput { username, password })?;
            println!("Created therapist '{}'", therapist.username);
        }
        None => serve(3000).await?,
    }

    Ok(())
}
