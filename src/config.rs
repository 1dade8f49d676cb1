use anyhow::{Context, Result};
use clap::Parser;
use std::{env, str::FromStr, time::Duration};

use crate::render::{
    DEFAULT_MAX_HTML_BYTES, DEFAULT_MAX_NESTING_DEPTH, DEFAULT_RENDER_TIMEOUT, Renderer,
};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_html_bytes: usize,
    pub max_nesting_depth: usize,
    pub render_timeout: Duration,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Render HTML to PDF and store the documents per user")]
pub struct Args {
    /// Host to bind to (overrides PDFORGE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides PDFORGE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides PDFORGE_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Largest accepted HTML body in bytes (overrides PDFORGE_MAX_HTML_BYTES)
    #[arg(long)]
    pub max_html_bytes: Option<usize>,

    /// Deepest accepted element nesting (overrides PDFORGE_MAX_NESTING_DEPTH)
    #[arg(long)]
    pub max_nesting_depth: Option<usize>,

    /// Seconds one render may take (overrides PDFORGE_RENDER_TIMEOUT)
    #[arg(long)]
    pub render_timeout: Option<u64>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        Ok((Self::resolve(args, |key| env::var(key))?, migrate))
    }

    /// Merge CLI arguments over values looked up through `lookup`.
    pub fn resolve<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        // --- Environment fallback ---
        let env_host = lookup("PDFORGE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = parse_var(&lookup, "PDFORGE_PORT", 3000u16)?;
        let env_db = lookup("PDFORGE_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/pdforge.db".into());
        let env_max_html = parse_var(&lookup, "PDFORGE_MAX_HTML_BYTES", DEFAULT_MAX_HTML_BYTES)?;
        let env_max_depth =
            parse_var(&lookup, "PDFORGE_MAX_NESTING_DEPTH", DEFAULT_MAX_NESTING_DEPTH)?;
        let env_timeout = parse_var(
            &lookup,
            "PDFORGE_RENDER_TIMEOUT",
            DEFAULT_RENDER_TIMEOUT.as_secs(),
        )?;

        // --- Merge ---
        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
            max_html_bytes: args.max_html_bytes.unwrap_or(env_max_html),
            max_nesting_depth: args.max_nesting_depth.unwrap_or(env_max_depth),
            render_timeout: Duration::from_secs(args.render_timeout.unwrap_or(env_timeout)),
        })
    }

    /// A renderer bounded by the configured input limits.
    pub fn renderer(&self) -> Renderer {
        Renderer::new(self.max_html_bytes)
            .with_max_depth(self.max_nesting_depth)
            .with_timeout(self.render_timeout)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Result<String, env::VarError>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", key)),
    }
}
