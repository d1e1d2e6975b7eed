//! Procura CLI - manage a Procura platform session from the terminal.
//!
//! Wires the session core end to end: persisted credentials are checked
//! on `status`, `login` authenticates and stores the session, `logout`
//! ends it. Set `PROCURA_API_URL` (or a `.env` file) to point at a
//! backend, and `RUST_LOG` to control log output.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use procura_core::api::ApiClient;
use procura_core::auth::{AuthController, CredentialStore, LogoutOptions, SessionEvent};
use procura_core::config::Config;
use procura_core::models::Credentials;

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn print_usage() {
    eprintln!("Usage: procura <command>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  login [email]   Authenticate and store the session");
    eprintln!("  status          Show the current session");
    eprintln!("  logout          End the session");
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let args: Vec<String> = std::env::args().collect();

    let mut config = Config::load()?;
    let store = CredentialStore::new(config.credential_dir()?)?;
    let api = ApiClient::new(&config.api_base_url)?;
    let (controller, mut events) = AuthController::new(api, store, config.login_path.clone());

    let result = match args.get(1).map(String::as_str) {
        Some("login") => login(&controller, &mut config, args.get(2).cloned()).await,
        Some("status") => status(&controller).await,
        Some("logout") => {
            controller.logout(LogoutOptions::default()).await;
            println!("Logged out.");
            Ok(())
        }
        _ => {
            print_usage();
            Ok(())
        }
    };

    // Report session events the operation produced
    while let Ok(event) = events.try_recv() {
        match event {
            SessionEvent::SessionExpired => println!("Session expired."),
            SessionEvent::RedirectRequested { path } => {
                info!(path = %path, "redirect requested")
            }
        }
    }

    controller.dispose();
    result
}

async fn login(
    controller: &Arc<AuthController<ApiClient>>,
    config: &mut Config,
    email_arg: Option<String>,
) -> Result<()> {
    let email = match email_arg {
        Some(email) => email,
        None => prompt_email(config.last_email.as_deref())?,
    };
    let password = rpassword::prompt_password("Password: ")?;

    match controller.login(Credentials::new(email.clone(), password)).await {
        Ok(user) => {
            config.last_email = Some(email);
            if let Err(e) = config.save() {
                tracing::warn!(error = %e, "Failed to save config");
            }
            println!("Logged in as {} ({})", user.email, user.role);
            Ok(())
        }
        Err(e) => {
            eprintln!("Login failed: {}", e);
            std::process::exit(1);
        }
    }
}

async fn status(controller: &Arc<AuthController<ApiClient>>) -> Result<()> {
    controller.check_auth_status(false).await;

    let snapshot = controller.snapshot();
    match snapshot.user {
        Some(ref user) => {
            println!("Logged in as {} ({})", user.email, user.role);
            if !user.permissions.is_empty() {
                let mut permissions: Vec<_> = user.permissions.iter().cloned().collect();
                permissions.sort();
                println!("Permissions: {}", permissions.join(", "));
            }
            if !user.email_verified {
                println!("Note: email not verified");
            }
        }
        None => {
            println!("Not logged in.");
            if let Some(ref error) = snapshot.error {
                eprintln!("({})", error);
            }
        }
    }
    Ok(())
}

fn prompt_email(last_email: Option<&str>) -> Result<String> {
    match last_email {
        Some(last) => print!("Email [{}]: ", last),
        None => print!("Email: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    if input.is_empty() {
        last_email
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("An email address is required"))
    } else {
        Ok(input.to_string())
    }
}
