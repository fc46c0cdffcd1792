//! config-rs/lib.rs
//! Shared configuration utilities for the complexity analyzer services.
//! Provides standardized functions for port/address management and typed
//! environment lookups.

use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

/// Load a `.env` file from the working directory if one exists.
///
/// Missing files are not an error; variables already set in the process
/// environment take precedence.
pub fn load_dotenv() {
    if let Err(err) = dotenv::dotenv() {
        log::debug!("No .env file loaded: {}", err);
    }
}

/// Read an environment variable and parse it, falling back to `default`
/// when the variable is unset or does not parse.
pub fn get_env_var<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            log::warn!("Invalid value for {}, using default", name);
            default
        }),
        Err(_) => default,
    }
}

/// Read an environment variable, treating empty or whitespace-only values as unset.
pub fn get_non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read a comma separated list, skipping empty entries.
pub fn get_list_var(name: &str) -> Option<Vec<String>> {
    get_non_empty_var(name).map(|raw| {
        raw.split(',')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    })
}

/// Get service port from environment variables with proper fallback
///
/// `PORT` wins when set, then `<SERVICE>_SERVICE_PORT`, then `default_port`.
pub fn get_service_port(service_name: &str, default_port: u16) -> u16 {
    if let Some(port) = get_non_empty_var("PORT") {
        match port.parse::<u16>() {
            Ok(port) => return port,
            Err(_) => log::warn!("Invalid port in PORT, ignoring"),
        }
    }

    let var_name = format!("{}_SERVICE_PORT", env_prefix(service_name));
    env::var(&var_name)
        .unwrap_or_else(|_| default_port.to_string())
        .parse::<u16>()
        .unwrap_or_else(|_| {
            log::warn!("Invalid port in {}, using default {}", var_name, default_port);
            default_port
        })
}

/// Create a SocketAddr for binding a service
///
/// `<SERVICE>_SERVICE_ADDR` may hold a full `host:port` (optionally prefixed
/// with `http://` or `https://`); otherwise the service binds every interface
/// on the port from [`get_service_port`].
pub fn get_bind_address(service_name: &str, default_port: u16) -> SocketAddr {
    let var_name = format!("{}_SERVICE_ADDR", env_prefix(service_name));

    if let Ok(addr_str) = env::var(&var_name) {
        let stripped = addr_str
            .strip_prefix("http://")
            .or_else(|| addr_str.strip_prefix("https://"))
            .unwrap_or(&addr_str);
        match stripped.parse::<SocketAddr>() {
            Ok(addr) => return addr,
            Err(_) => log::warn!("Invalid address format in {}, using default", var_name),
        }
    }

    let port = get_service_port(service_name, default_port);
    SocketAddr::from(([0, 0, 0, 0], port))
}

fn env_prefix(service_name: &str) -> String {
    service_name.to_uppercase().replace('-', "_")
}

/// Deployment mode of the running process, read from `APP_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn from_env() -> Self {
        get_env_var("APP_ENV", Environment::Development)
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
