//! Subcommand implementations.

use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::debug;

use sessionvault_core::config::PASSPHRASE_ENV;
use sessionvault_core::{
    check_after_delay, check_for_update, AutoLoginResult, Config, CredentialVault, Destination,
    KeyValueStore, ReleaseFeed, SessionAuthenticator, SessionController, UpdateDecision,
};

/// Version compared against the release feed
const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

const SERVER_ENV: &str = "SESSIONVAULT_SERVER";
const USERNAME_ENV: &str = "SESSIONVAULT_USERNAME";
const PASSWORD_ENV: &str = "SESSIONVAULT_PASSWORD";

type Controller = SessionController<Box<dyn KeyValueStore>, SessionAuthenticator>;

fn controller(config: &Config) -> Result<Controller> {
    let store = config.open_store(std::env::var(PASSPHRASE_ENV).ok())?;
    let authenticator = SessionAuthenticator::new(config.request_timeout())?;
    Ok(SessionController::new(CredentialVault::new(store), authenticator))
}

fn release_feed(config: &Config) -> Result<ReleaseFeed> {
    ReleaseFeed::new(config.release_feed_url.clone(), config.request_timeout())
}

fn describe(destination: Destination) -> &'static str {
    match destination {
        Destination::Login => "login screen",
        Destination::Landing => "home",
        Destination::Setup => "setup (the server requires setup before use)",
    }
}

fn print_update(decision: &UpdateDecision, current: &str) {
    if !decision.should_prompt {
        return;
    }
    println!(
        "A new version is available: {} (you have {})",
        decision.latest_version.as_deref().unwrap_or("unknown"),
        current
    );
    if let Some(ref url) = decision.url {
        println!("Download: {}", url);
    }
}

pub async fn start(config: &Config) -> Result<()> {
    let controller = controller(config)?;
    let feed = release_feed(config)?;

    let login = async {
        let result = controller.auto_login().await;
        match result {
            AutoLoginResult::SignedIn { destination, ref role } => {
                println!("Signed in as {} -> {}", role, describe(destination));
            }
            AutoLoginResult::NotAttempted | AutoLoginResult::SignedOut => {
                println!("Not signed in -> {}", describe(Destination::Login));
            }
            AutoLoginResult::Ignored => debug!("Auto-login already running"),
        }
    };

    let update = async {
        let decision =
            check_after_delay(config.update_check_delay(), CURRENT_VERSION, || feed.fetch_latest())
                .await;
        print_update(&decision, CURRENT_VERSION);
    };

    tokio::join!(login, update);
    Ok(())
}

pub async fn login(
    config: &Config,
    server: Option<String>,
    username: Option<String>,
) -> Result<()> {
    let controller = controller(config)?;

    let server = match server.or_else(|| std::env::var(SERVER_ENV).ok()) {
        Some(server) => server,
        None => prompt_line("Server: ")?,
    };
    let username = match username.or_else(|| std::env::var(USERNAME_ENV).ok()) {
        Some(username) => username,
        None => prompt_line("Username: ")?,
    };
    let password = match std::env::var(PASSWORD_ENV) {
        Ok(password) => password,
        Err(_) => rpassword::prompt_password("Password: ").context("Failed to read password")?,
    };

    println!("\nAuthenticating...");
    let report = controller.login_interactive(&server, &username, &password).await;
    println!("{}", report.message);

    if report.destination == Destination::Login {
        anyhow::bail!("Login failed");
    }
    println!("Next: {}", describe(report.destination));
    Ok(())
}

pub async fn logout(config: &Config) -> Result<()> {
    controller(config)?.logout().await?;
    println!("Saved credentials removed.");
    Ok(())
}

pub async fn status(config: &Config) -> Result<()> {
    let controller = controller(config)?;
    match controller.vault().load().await? {
        Some(record) => {
            println!("Server:   {}", record.server_address);
            println!("Username: {}", record.username);
            println!("Role:     {}", record.role);
            println!(
                "Session:  {}",
                if record.session_token.is_some() { "saved" } else { "none" }
            );
        }
        None => println!("No saved credentials."),
    }
    Ok(())
}

pub async fn check_update(config: &Config, current: Option<String>) -> Result<()> {
    let feed = release_feed(config)?;
    let current = current.unwrap_or_else(|| CURRENT_VERSION.to_string());
    let decision = check_for_update(&current, || feed.fetch_latest()).await;
    if decision.should_prompt {
        print_update(&decision, &current);
    } else if let Some(ref latest) = decision.latest_version {
        println!("Up to date (latest release is {}).", latest);
    } else {
        println!("Could not determine the latest release.");
    }
    Ok(())
}

fn prompt_line(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}
