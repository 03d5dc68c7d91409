use std::path::PathBuf;

use actix_login_gate_demo::security_config::SecurityConfig;
use actix_login_gate_demo::settings::{Settings, SettingsOverrides};
use actix_web::HttpServer;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "actix-login-gate-demo")]
#[command(about = "Form and OAuth2 login in front of an Actix Web application")]
#[command(version)]
struct Cli {
    /// Config file path (optional)
    #[arg(short, long, env = "LOGIN_GATE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind to, overrides the config file
    #[arg(short, long, env = "LOGIN_GATE_BIND")]
    bind: Option<String>,

    /// Session cookie key, base64 of at least 64 bytes
    #[arg(long, env = "LOGIN_GATE_SESSION_KEY", hide_env_values = true)]
    session_key: Option<String>,

    /// Session lifetime in seconds
    #[arg(long, env = "LOGIN_GATE_SESSION_MAX_AGE")]
    session_max_age: Option<u64>,

    /// Only send the session cookie over HTTPS
    #[arg(long, env = "LOGIN_GATE_COOKIE_SECURE")]
    cookie_secure: Option<bool>,

    /// Timeout of the OAuth2 provider round trip in seconds
    #[arg(long, env = "LOGIN_GATE_OAUTH2_TIMEOUT")]
    oauth2_timeout: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, env = "LOGIN_GATE_VERBOSE")]
    verbose: bool,
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "actix_login_gate_demo=debug,actix_login_gate_core=debug,actix_web=debug"
    } else {
        "actix_login_gate_demo=info,actix_login_gate_core=info,actix_web=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };
    settings.apply_overrides(SettingsOverrides {
        bind: cli.bind,
        session_key_base64: cli.session_key,
        session_max_age_secs: cli.session_max_age,
        cookie_secure: cli.cookie_secure,
        oauth2_timeout_secs: cli.oauth2_timeout,
    });
    settings.validate()?;

    let security = SecurityConfig::new(&settings)?;
    let key = settings.session_key()?;

    info!("Starting login gate demo on {}", settings.bind);

    HttpServer::new(move || actix_login_gate_demo::app(&security, key.clone()))
        .bind(&settings.bind)?
        .run()
        .await?;

    Ok(())
}
