//! Command-line argument parsing.
//!
//! Every option can also be set through the environment variable named in
//! its help text. Values given here override the config file.

use crate::config::{parse_cors_origins, Config};
use clap::Parser;
use std::path::PathBuf;

/// Natural-language to SQL query service.
#[derive(Parser, Debug, Default)]
#[command(name = "nlq-service")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH", env = "NLQ_CONFIG")]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short = 'p', long, value_name = "PORT", env = "PORT")]
    pub port: Option<u16>,

    /// Database URL (postgres://... or sqlite:...). DATABASE_URL is used when
    /// NLQ_DATABASE_URL is unset.
    #[arg(long, value_name = "URL", env = "NLQ_DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Comma-separated list of allowed CORS origins, or "*"
    #[arg(long, value_name = "ORIGINS", env = "CORS_ORIGIN")]
    pub cors_origin: Option<String>,

    /// LLM provider: groq, openai or mock
    #[arg(long, value_name = "PROVIDER", env = "LLM_PROVIDER")]
    pub llm: Option<String>,

    /// Model name
    #[arg(long, value_name = "MODEL", env = "LLM_MODEL")]
    pub model: Option<String>,

    /// API key for the LLM provider. Falls back to GROQ_API_KEY or
    /// OPENAI_API_KEY depending on the provider.
    #[arg(long, value_name = "KEY", env = "LLM_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Override for the provider's chat-completions URL
    #[arg(long, value_name = "URL", env = "LLM_BASE_URL")]
    pub llm_base_url: Option<String>,

    /// Row cap appended to generated queries without a LIMIT
    #[arg(long, value_name = "ROWS", env = "ROW_LIMIT")]
    pub row_limit: Option<u32>,

    /// SQL file to run against a SQLite database before serving
    #[arg(long, value_name = "PATH")]
    pub seed: Option<PathBuf>,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path (from CLI or default).
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Layers CLI and environment values over the loaded config.
    pub fn apply_to(&self, config: &mut Config) {
        self.apply_to_with(config, |name| std::env::var(name).ok());
    }

    fn apply_to_with(&self, config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(port) = self.port {
            config.server.port = port;
        }

        if let Some(origins) = &self.cors_origin {
            config.server.cors_origins = parse_cors_origins(origins);
        }

        let database_url = self
            .database_url
            .clone()
            .or_else(|| lookup("DATABASE_URL"))
            .filter(|url| !url.is_empty());
        if let Some(url) = database_url {
            config.database.url = Some(url);
        }

        if let Some(provider) = &self.llm {
            config.llm.provider = provider.clone();
        }
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }
        if let Some(key) = &self.api_key {
            config.llm.api_key = Some(key.clone());
        }
        if let Some(base_url) = &self.llm_base_url {
            config.llm.base_url = Some(base_url.clone());
        }

        if let Some(row_limit) = self.row_limit {
            config.query.row_limit = row_limit;
        }
    }
}
