use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use musicalart::config::{Cli, Command, Config, ShowTarget};
use musicalart::db;
use musicalart::handlers;
use musicalart::models::Registration;
use musicalart::state::{AppState, Collaborators};
use musicalart::storage::SqliteStorage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli)?;
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;
    let db_path = config
        .storage_path()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("storage path not resolved"))?;

    // Only the session record lives on disk; registries are reseeded per run
    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let storage = Arc::new(SqliteStorage::new(pool));

    let mut state = AppState::seeded(config, storage, Collaborators::headless())?;

    match cli.command.unwrap_or(Command::Whoami) {
        Command::Login { email, secret } => {
            let identity = handlers::login(&mut state, &email, &secret)?;
            print_json(&identity)?;
        }
        Command::Register {
            username,
            email,
            name,
            secret,
            bio,
            avatar,
        } => {
            let mut registration = Registration::new(username, email, name, secret);
            if let Some(bio) = bio {
                registration = registration.with_bio(bio);
            }
            if let Some(avatar) = avatar {
                registration = registration.with_avatar(avatar);
            }
            let identity = handlers::register(&mut state, registration)?;
            print_json(&identity)?;
        }
        Command::Logout => {
            handlers::logout(&mut state)?;
            println!("Logged out");
        }
        Command::Whoami => match state.session.current() {
            Some(identity) => print_json(identity)?,
            None => println!("Not logged in"),
        },
        Command::Show { what } => show(&state, what)?,
    }

    Ok(())
}

fn show(state: &AppState, what: ShowTarget) -> anyhow::Result<()> {
    match what {
        ShowTarget::Posts => match state.session.current() {
            Some(identity) => print_json(&state.session.user_posts(&identity.id)),
            None => print_json(state.session.posts()),
        },
        ShowTarget::Feed => print_json(state.community.posts()),
        ShowTarget::Competitions => print_json(state.competitions.list()),
        ShowTarget::Streams => print_json(state.live.streams()),
        ShowTarget::Donations => print_json(&state.donations.stats()),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
