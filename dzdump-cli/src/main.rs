use std::env;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use deezer_api::auth::Credential;
use deezer_api::{DeezerClient, DeezerError};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the long-lived arl credential.
const CREDENTIAL_VAR: &str = "DEEZER_ARL_TOKEN";

#[derive(Parser)]
#[command(name = "dzdump", version, about = "Deezer track downloader")]
struct Cli {
    /// Detailed trace of each resolution attempt
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download a track
    Download {
        /// Track ID, track URL, or short link
        track: String,
        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
    /// Show track details
    Info {
        /// Track ID, track URL, or short link
        track: String,
    },
    /// Walk through obtaining an arl credential
    Token,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Download { track, output } => cmd_download(&track, &output),
        Command::Info { track } => cmd_info(&track),
        Command::Token => cmd_token(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            if let Some(remedy) = remedy_for(&e) {
                eprintln!("hint: {remedy}");
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn remedy_for(err: &anyhow::Error) -> Option<&'static str> {
    if let Some(e) = err.downcast_ref::<DeezerError>() {
        return e.remedy();
    }
    if let Some(dzdump::DumpError::Api(e)) = err.downcast_ref::<dzdump::DumpError>() {
        return e.remedy();
    }
    None
}

/// Load and validate the credential. Runs before any network activity.
fn credential_from_env() -> Result<Credential> {
    let raw = env::var(CREDENTIAL_VAR).map_err(|_| {
        DeezerError::Config(format!("{CREDENTIAL_VAR} environment variable is required"))
    })?;
    Ok(Credential::new(&raw)?)
}

// ── download ──

fn cmd_download(track: &str, output: &Path) -> Result<()> {
    let credential = credential_from_env()?;
    let track_id = deezer_api::url::parse_track_ref(track)?;
    let mut client = DeezerClient::establish(&credential)?;

    let done = dzdump::download(&mut client, track_id, output, &mut |done, total| {
        match total {
            Some(total) if total > 0 => {
                #[allow(clippy::cast_precision_loss)]
                let percent = done as f64 / total as f64 * 100.0;
                print!("\rDownloading: {percent:.1}%");
            }
            _ => print!("\rDownloading: {done} bytes"),
        }
        let _ = io::stdout().flush();
    })?;
    println!();

    println!("Downloaded {} ({} bytes)", done.path.display(), done.bytes);
    if done.preview {
        println!("Note: full track was not available; wrote the preview clip.");
    }
    Ok(())
}

// ── info ──

fn cmd_info(track: &str) -> Result<()> {
    let credential = credential_from_env()?;
    let track_id = deezer_api::url::parse_track_ref(track)?;
    let mut client = DeezerClient::establish(&credential)?;
    let meta = client.track_details(track_id)?;

    println!("Track:     {} (id={})", meta.title, meta.id);
    println!("Artist:    {}", meta.artist);
    println!(
        "Duration:  {}:{:02}",
        meta.duration_secs / 60,
        meta.duration_secs % 60
    );
    let qualities: Vec<&str> = meta.qualities.iter().map(|q| q.format_code()).collect();
    println!(
        "Qualities: {}",
        if qualities.is_empty() {
            "none".to_owned()
        } else {
            qualities.join(", ")
        }
    );
    println!(
        "Preview:   {}",
        if meta.preview_url.is_some() { "available" } else { "none" }
    );
    Ok(())
}

// ── token ──

fn cmd_token() -> Result<()> {
    println!("To get your arl credential:");
    println!("1. Open your browser and go to https://www.deezer.com");
    println!("2. Log in to your account");
    println!("3. Open Developer Tools (F12) -> Application/Storage -> Cookies");
    println!("4. Select https://www.deezer.com and find the cookie named 'arl'");
    println!("5. Copy its value (a ~192-character alphanumeric string)");
    println!();

    match env::var(CREDENTIAL_VAR) {
        Ok(current) => match Credential::new(&current) {
            Ok(_) => println!(
                "Current {CREDENTIAL_VAR} format looks valid ({} characters).",
                current.trim().len()
            ),
            Err(e) => println!("Current {CREDENTIAL_VAR} appears invalid: {e}"),
        },
        Err(_) => println!("No {CREDENTIAL_VAR} environment variable found."),
    }
    println!();

    let stdin = io::stdin();
    loop {
        print!("Paste your arl credential (or 'quit' to exit): ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Ok(());
        }
        let token = line.trim();
        if matches!(token, "quit" | "exit" | "q") {
            return Ok(());
        }
        if token.is_empty() {
            continue;
        }

        let credential = match Credential::new(token) {
            Ok(c) => c,
            Err(e) => {
                println!("{e}");
                println!("Please try again with a valid credential.");
                continue;
            }
        };
        println!("Credential format looks valid ({} characters).", token.len());
        println!();
        println!("To use it:");
        println!("  export {CREDENTIAL_VAR}=\"{token}\"");
        println!();

        print!("Test this credential against the live service? [y/N] ");
        io::stdout().flush()?;
        let mut answer = String::new();
        stdin.lock().read_line(&mut answer)?;
        if matches!(answer.trim(), "y" | "Y" | "yes") {
            match DeezerClient::establish(&credential) {
                Ok(client) => println!(
                    "Credential test successful; authenticated as {}.",
                    client.session().user_name
                ),
                Err(e) => {
                    println!("Credential test failed: {e}");
                    println!("The credential may be expired; get a fresh one from your browser.");
                }
            }
        }
        return Ok(());
    }
}
