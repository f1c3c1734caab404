//! Process configuration.
//!
//! Values come from built-in defaults, then an optional JSON file, then
//! environment variables. Later sources win.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use broadsheet_core::{LogTransport, MailTransport, SmtpTransport};
use broadsheet_smtp::{ConnectOptions, Credentials, Security};
use serde::Deserialize;
use thiserror::Error;

/// Configuration errors. All of them are fatal at start-up.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for [`Config`].
    #[error("Failed to parse {path}: {source}")]
    Parse {
        /// File that was parsed.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// An environment variable holds an unusable value.
    #[error("Invalid value for {key}: {value:?}")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listen address.
    pub bind: String,
    /// `SQLite` database path, or `:memory:`.
    pub database_url: String,
    /// SMTP relay host. Without one, mail is only logged.
    pub smtp_host: Option<String>,
    /// SMTP relay port.
    pub smtp_port: u16,
    /// SMTP security mode: `tls`, `starttls` or `none`.
    pub smtp_security: String,
    /// SMTP AUTH username.
    pub smtp_username: Option<String>,
    /// SMTP AUTH password.
    pub smtp_password: Option<String>,
    /// Sender address for newsletters.
    pub smtp_from: String,
    /// Email of the superuser created at start-up.
    pub admin_email: Option<String>,
    /// API token of the superuser created at start-up.
    pub admin_token: Option<String>,
    /// Lifetime of the cached full recipient listing, in seconds.
    pub recipient_cache_ttl: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
            database_url: "broadsheet.db".to_string(),
            smtp_host: None,
            smtp_port: 587,
            smtp_security: "starttls".to_string(),
            smtp_username: None,
            smtp_password: None,
            smtp_from: "noreply@localhost".to_string(),
            admin_email: None,
            admin_token: None,
            recipient_cache_ttl: 300,
        }
    }
}

impl Config {
    /// Load configuration from the file (if any) and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if a variable holds an invalid value.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os("BROADSHEET_CONFIG")
            .map(PathBuf::from)
            .or_else(default_config_path);

        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file over the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Override fields from variables returned by `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable does not parse.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("BROADSHEET_BIND") {
            self.bind = v;
        }
        if let Some(v) = lookup("DATABASE_URL") {
            self.database_url = v;
        }
        if let Some(v) = lookup("SMTP_HOST") {
            self.smtp_host = Some(v).filter(|h| !h.is_empty());
        }
        if let Some(v) = lookup("SMTP_PORT") {
            self.smtp_port = v.parse().map_err(|_| ConfigError::Invalid {
                key: "SMTP_PORT",
                value: v,
            })?;
        }
        if let Some(v) = lookup("SMTP_SECURITY") {
            self.smtp_security = v;
        }
        if let Some(v) = lookup("SMTP_USERNAME") {
            self.smtp_username = Some(v);
        }
        if let Some(v) = lookup("SMTP_PASSWORD") {
            self.smtp_password = Some(v);
        }
        if let Some(v) = lookup("SMTP_FROM") {
            self.smtp_from = v;
        }
        if let Some(v) = lookup("BROADSHEET_ADMIN_EMAIL") {
            self.admin_email = Some(v);
        }
        if let Some(v) = lookup("BROADSHEET_ADMIN_TOKEN") {
            self.admin_token = Some(v);
        }
        if let Some(v) = lookup("BROADSHEET_RECIPIENT_CACHE_TTL") {
            self.recipient_cache_ttl = v.parse().map_err(|_| ConfigError::Invalid {
                key: "BROADSHEET_RECIPIENT_CACHE_TTL",
                value: v,
            })?;
        }
        Ok(())
    }

    /// Check values that only make sense together.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP security mode is unknown.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.security()?;
        Ok(())
    }

    /// Lifetime of the cached recipient listing.
    #[must_use]
    pub const fn recipient_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.recipient_cache_ttl)
    }

    /// Bootstrap superuser credentials, when both are set.
    #[must_use]
    pub fn admin(&self) -> Option<(&str, &str)> {
        match (&self.admin_email, &self.admin_token) {
            (Some(email), Some(token)) if !email.is_empty() && !token.is_empty() => {
                Some((email, token))
            }
            _ => None,
        }
    }

    /// SMTP connection options, if a relay is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP security mode is unknown.
    pub fn smtp_options(&self) -> Result<Option<ConnectOptions>, ConfigError> {
        let Some(host) = &self.smtp_host else {
            return Ok(None);
        };

        let mut options = ConnectOptions::new(host);
        options.port = self.smtp_port;
        options.security = self.security()?;
        if let (Some(username), Some(password)) = (&self.smtp_username, &self.smtp_password) {
            options.credentials = Some(Credentials {
                username: username.clone(),
                password: password.clone(),
            });
        }
        Ok(Some(options))
    }

    /// The transport newsletters are sent through.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP security mode is unknown.
    pub fn transport(&self) -> Result<Arc<dyn MailTransport>, ConfigError> {
        Ok(match self.smtp_options()? {
            Some(options) => Arc::new(SmtpTransport::new(options)),
            None => Arc::new(LogTransport),
        })
    }

    fn security(&self) -> Result<Security, ConfigError> {
        Security::parse(&self.smtp_security).ok_or_else(|| ConfigError::Invalid {
            key: "SMTP_SECURITY",
            value: self.smtp_security.clone(),
        })
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("broadsheet").join("config.json"))
}
