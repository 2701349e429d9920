use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::parse_api_base, load_settings, Event, FileTokenStore, HttpPredictionClient,
    ImageUpload, NoPreview, Screen, Session, TokenStore, UiState, UploadController,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "melanoma", about = "Melanoma detection client", version)]
struct Args {
    /// Base url of the prediction service.
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Where the session token is kept between runs.
    #[arg(long, global = true)]
    token_path: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Exchange admin credentials for a token and keep it for later runs.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored token.
    Logout,
    /// Classify one or more images; each replaces the previous selection.
    Predict {
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Check that the service is up.
    Ping,
    /// Show the resolved settings and whether a token is stored.
    Status,
}

type CliController = UploadController<FileTokenStore, NoPreview>;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings()?;
    if let Some(api_url) = args.api_url.as_deref() {
        settings.api_base = parse_api_base(api_url)?;
    }
    if let Some(token_path) = args.token_path {
        settings.token_path = token_path;
    }

    let client = HttpPredictionClient::new(settings.api_base.clone());
    let store = FileTokenStore::new(settings.token_path.clone());
    let mut controller = CliController::new(Session::new(store), NoPreview);

    match args.command {
        Command::Login { username, password } => {
            let state = controller
                .dispatch(
                    Event::SubmitCredentials { username, password },
                    &client,
                    &client,
                )
                .await;
            if !state.is_logged_in() {
                bail!(
                    "{}",
                    controller
                        .login_error()
                        .unwrap_or(client_core::LOGIN_ERROR_MESSAGE)
                );
            }
            if token_persisted(&controller) {
                println!(
                    "Logged in; token saved to {}",
                    settings.token_path.display()
                );
            } else {
                bail!(
                    "logged in, but the token could not be saved to {}; later commands will not see it",
                    settings.token_path.display()
                );
            }
        }
        Command::Logout => {
            logout(&mut controller).with_context(|| {
                format!(
                    "failed to erase stored token at {}",
                    settings.token_path.display()
                )
            })?;
            println!("Logged out");
        }
        Command::Predict { images } => {
            if !controller.resume()? {
                bail!("not logged in; run `melanoma login` first");
            }
            predict_all(&mut controller, &client, images).await?;
        }
        Command::Ping => {
            let message = client
                .ping()
                .await
                .with_context(|| format!("service at {} is not responding", settings.api_base))?;
            println!("{message}");
        }
        Command::Status => {
            let logged_in = controller.resume()?;
            println!("api:     {}", settings.api_base);
            println!("session: {}", settings.token_path.display());
            println!("login:   {}", if logged_in { "token stored" } else { "logged out" });
        }
    }

    Ok(())
}

/// Whether the token held by the session also made it into the store.
fn token_persisted(controller: &CliController) -> bool {
    let session = controller.session();
    match (session.store().load(), session.token()) {
        (Ok(Some(stored)), Some(token)) => &stored == token,
        _ => false,
    }
}

/// Logs out of a resumed session if there is one, and erases the stored
/// token even when the session file cannot be read.
fn logout(controller: &mut CliController) -> Result<()> {
    match controller.resume() {
        Ok(true) => {
            controller.handle(Event::Logout);
        }
        Ok(false) => {}
        Err(err) => tracing::warn!("ignoring unreadable session: {err:#}"),
    }
    controller.session().store().clear()
}

async fn predict_all(
    controller: &mut CliController,
    client: &HttpPredictionClient,
    images: Vec<PathBuf>,
) -> Result<()> {
    let mut failures = 0usize;
    for path in images {
        let image = ImageUpload::from_path(&path).await?;
        if !image.is_image() {
            tracing::warn!(path = %path.display(), "file does not look like an image");
        }
        let state = controller
            .dispatch(Event::ImageSelected(image), client, client)
            .await;
        match (state, controller.result()) {
            (UiState::LoggedIn(Screen::ShowingResult), Some(result)) => {
                println!(
                    "{}\t{}\t{}",
                    path.display(),
                    result.label,
                    result.confidence_text()
                );
            }
            _ => {
                failures += 1;
                eprintln!(
                    "{}\t{}",
                    path.display(),
                    controller
                        .prediction_error()
                        .unwrap_or(client_core::PREDICT_ERROR_MESSAGE)
                );
            }
        }
        controller.handle(Event::Clear);
    }

    if failures > 0 {
        bail!("{failures} image(s) could not be classified");
    }
    Ok(())
}
