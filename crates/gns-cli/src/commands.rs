use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use serde_json::{Map, Value};
use tracing::warn;

use gns_core::notify::{Attachment, NotificationClient, Submission};
use gns_core::{Config, CredentialStore, Navigator, Route, SessionController, SessionState};

/// Shows route changes on the terminal.
struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate(&self, route: Route) {
        eprintln!("-> {}", route);
    }
}

fn session(config: &Config) -> Result<SessionController> {
    let store = Arc::new(CredentialStore::load(config.open_storage()?));
    Ok(SessionController::from_config(config, store, Arc::new(ConsoleNavigator))?)
}

/// Save the username for next time; failures only cost convenience.
fn remember_username(username: &str) {
    // Reload so flag/env overrides aren't written back
    match Config::load() {
        Ok(mut config) => {
            config.last_username = Some(username.to_string());
            if let Err(e) = config.save() {
                warn!(error = %e, "Failed to save config");
            }
        }
        Err(e) => warn!(error = %e, "Failed to load config"),
    }
}

fn prompt_username(last: Option<&str>) -> Result<String> {
    match last {
        Some(last) => print!("Username [{}]: ", last),
        None => print!("Username: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    Ok(match last {
        Some(last) if input.is_empty() => last.to_string(),
        _ => input.to_string(),
    })
}

fn prompt_password() -> Result<String> {
    let password = rpassword::prompt_password("Password: ")?;
    Ok(password)
}

pub async fn login(config: &Config, username: Option<String>) -> Result<()> {
    let username = match username {
        Some(username) => username,
        None => prompt_username(config.last_username.as_deref())?,
    };
    let password = prompt_password()?;
    if username.is_empty() || password.is_empty() {
        bail!("Username and password required");
    }

    let user = session(config)?.login(&username, &password).await?;
    remember_username(&username);

    println!("Logged in as {}", user.display_name());
    Ok(())
}

pub async fn register(config: &Config, username: &str, email: &str) -> Result<()> {
    let password = prompt_password()?;
    if password.is_empty() {
        bail!("Password required");
    }

    let user = session(config)?.register(username, &password, email).await?;
    remember_username(username);

    println!("Registered and logged in as {}", user.display_name());
    Ok(())
}

pub fn logout(config: &Config) -> Result<()> {
    session(config)?.logout();
    println!("Logged out");
    Ok(())
}

pub async fn whoami(config: &Config, refresh: bool) -> Result<()> {
    let session = session(config)?;
    if !session.is_authenticated() {
        bail!("Not logged in. Run `gns login` first.");
    }

    let user = if refresh {
        session.refresh_user().await?
    } else {
        session.store().user()
    };
    println!("{}", serde_json::to_string_pretty(&user)?);
    Ok(())
}

pub fn status(config: &Config) -> Result<()> {
    let session = session(config)?;

    println!("Server:  {}", config.api_base_url());
    println!("Storage: {:?}", config.storage);
    match session.state() {
        SessionState::Authenticated => {
            println!("Session: logged in as {}", session.store().user().display_name())
        }
        SessionState::Anonymous => println!("Session: not logged in"),
    }
    Ok(())
}

pub fn open(config: &Config, path: &str) -> Result<()> {
    let target = Route::from_path(path).ok_or_else(|| anyhow!("Unknown route: {}", path))?;
    let destination = session(config)?.navigate(target);
    if destination != target {
        println!("Redirected to {}", destination);
    }
    Ok(())
}

#[derive(Args)]
pub struct SendArgs {
    /// Notification task id
    #[arg(long, short)]
    pub task: String,

    /// Template variable as key=value (repeatable)
    #[arg(long = "var", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,

    /// Template variables as a JSON object; --var entries override its keys
    #[arg(long)]
    pub data: Option<String>,

    /// File to attach (repeatable)
    #[arg(long = "attach")]
    pub attachments: Vec<PathBuf>,

    /// Priority override
    #[arg(long)]
    pub priority: Option<String>,

    /// API token issued from the dashboard
    #[arg(long, env = "GNS_API_TOKEN", hide_env_values = true)]
    pub token: String,
}

fn parse_var(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{}`", s))?;
    if key.is_empty() {
        return Err(format!("empty key in `{}`", s));
    }
    Ok((key.to_string(), value.to_string()))
}

fn build_submission(args: &SendArgs) -> Result<Submission> {
    let mut data = match args.data.as_deref() {
        Some(json) => match serde_json::from_str::<Value>(json).context("Invalid --data JSON")? {
            Value::Object(map) => map,
            _ => bail!("--data must be a JSON object"),
        },
        None => Map::new(),
    };
    for (key, value) in &args.vars {
        data.insert(key.clone(), Value::String(value.clone()));
    }

    let mut submission = Submission::new(args.task.clone()).data(data);
    for path in &args.attachments {
        let content = std::fs::read(path)
            .with_context(|| format!("Failed to read attachment {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow!("Attachment path has no file name: {}", path.display()))?;
        submission = submission.attachment(Attachment::bytes(filename, content));
    }
    if let Some(ref priority) = args.priority {
        submission = submission.priority(priority.clone());
    }
    Ok(submission)
}

pub async fn send(config: &Config, args: SendArgs) -> Result<()> {
    let submission = build_submission(&args)?;

    let client = NotificationClient::builder(&config.server_url, &args.token)
        .timeout(config.notify_timeout())
        .rate_limit_retries(config.rate_limit_retries)
        .build()?;
    let response = client.send_notification(&submission).await?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
