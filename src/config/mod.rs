use crate::debugger::Error;
use crate::{muted_error, weak_error};
use log::error;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::fs::read_to_string;
use std::path::Path;

static DEFAULT: Lazy<Config> = Lazy::new(Config::default);

/// Event dispatcher settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatcherConfig {
    /// Name of the worker thread that reads the event channel.
    pub thread_name: String,
    /// If `true` a class-prepare event handled by the target model counts as
    /// a vote for resuming the event set. Otherwise, the target stays suspended
    /// after such event until somebody resumes it.
    pub class_prepare_resumes: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            thread_name: "remora-event-dispatcher".to_string(),
            class_prepare_resumes: false,
        }
    }
}

/// Well known names used by the interpreter when it talks to a target.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvalConfig {
    /// Type of class objects, a receiver of the `for_name_method`.
    pub class_type: String,
    /// Static method that forces type loading by its qualified name.
    pub for_name_method: String,
    pub for_name_signature: String,
    /// Exception raised by `for_name_method` if no type found.
    pub not_found_exception: String,
    /// Method used to convert an object into a string (for string concatenation).
    pub to_string_method: String,
    pub to_string_signature: String,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            class_type: "java.lang.Class".to_string(),
            for_name_method: "forName".to_string(),
            for_name_signature: "(Ljava/lang/String;)Ljava/lang/Class;".to_string(),
            not_found_exception: "java.lang.ClassNotFoundException".to_string(),
            to_string_method: "toString".to_string(),
            to_string_signature: "()Ljava/lang/String;".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Filter used when `RUST_LOG` is not set.
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_filter: "warn".to_string(),
        }
    }
}

/// Remora configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub dispatcher: DispatcherConfig,
    pub eval: EvalConfig,
    pub log: LogConfig,
}

impl Config {
    const DEFAULT_PATH: &'static str = ".config/remora/remora.toml";

    /// Return configuration shipped with the crate.
    pub fn preset() -> Result<Self, Error> {
        Self::parse(include_str!("preset/remora.toml"))
    }

    /// Return a shared default configuration.
    pub fn global_default() -> &'static Config {
        &DEFAULT
    }

    /// Parse configuration from a TOML document, missing keys take default values.
    pub fn parse(data: &str) -> Result<Self, Error> {
        Ok(toml::de::from_str(data)?)
    }

    /// Load configuration from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let data = read_to_string(path)?;
        Self::parse(&data)
    }

    /// Load configuration from file, `$HOME/.config/remora/remora.toml` used if `path` is `None`.
    /// Return a default configuration on errors.
    pub fn from_file(path: Option<&str>) -> Self {
        let data = match path {
            None => {
                let Some(home) = home::home_dir() else {
                    return Self::default();
                };
                match muted_error!(read_to_string(home.join(Self::DEFAULT_PATH))) {
                    Some(data) => data,
                    None => return Self::default(),
                }
            }
            Some(path) => match read_to_string(path) {
                Ok(data) => data,
                Err(err) => {
                    error!(target: "remora", "error while load config file: {err}");
                    return Self::default();
                }
            },
        };

        weak_error!(Self::parse(&data), "invalid configuration, defaults are used:")
            .unwrap_or_default()
    }
}
