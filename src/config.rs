//! Configuration management for schema reconstruction
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (proto-recon.toml)
//! - Environment variables (PROTO_RECON__*)
//!
//! ## Example config file (proto-recon.toml):
//! ```toml
//! [input]
//! bundle = "extracted/definitions.json"
//!
//! [output]
//! package = "aiserver.v1"
//! option_name = "go_package"
//! go_prefix = "cursor/gen"
//!
//! [targets]
//! modules = ["proto/aiserver/v1/aiserver_connectweb"]
//!
//! [render]
//! enum_numbering = "positional"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::codegen::{DocumentHeader, EnumNumbering};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconConfig {
    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub targets: TargetConfig,

    #[serde(default)]
    pub render: RenderConfig,
}

/// Where definition records come from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputConfig {
    /// Bundle file or directory of bundle files
    #[serde(default)]
    pub bundle: Option<PathBuf>,
}

/// Document header and placement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Package name; defaults to the package of the first emitted service
    #[serde(default)]
    pub package: Option<String>,

    /// Document file name; defaults to `<first package segment>.proto`
    #[serde(default)]
    pub file_name: Option<String>,

    /// Name of the output-binding option
    #[serde(default = "default_option_name")]
    pub option_name: String,

    /// Explicit option value; derived from `go_prefix` when absent
    #[serde(default)]
    pub option_value: Option<String>,

    #[serde(default = "default_go_prefix")]
    pub go_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Modules whose exports each hold exactly one service descriptor
    #[serde(default = "default_targets")]
    pub modules: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default)]
    pub enum_numbering: EnumNumbering,
}

// Default value functions
fn default_option_name() -> String {
    "go_package".to_string()
}

fn default_go_prefix() -> String {
    "cursor/gen".to_string()
}

fn default_targets() -> Vec<String> {
    vec![
        "proto/aiserver/v1/aiserver_connectweb".to_string(),
        "proto/aiserver/v1/repository_connectweb".to_string(),
    ]
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            package: None,
            file_name: None,
            option_name: default_option_name(),
            option_value: None,
            go_prefix: default_go_prefix(),
        }
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            modules: default_targets(),
        }
    }
}

impl OutputConfig {
    pub fn file_name_for(&self, package: &str) -> String {
        match &self.file_name {
            Some(name) => name.clone(),
            None => {
                let stem = package.split('.').next().filter(|s| !s.is_empty()).unwrap_or("schema");
                format!("{}.proto", stem)
            }
        }
    }

    /// `<go_prefix>/<package path>;<package without dots>` unless set explicitly
    pub fn option_value_for(&self, package: &str) -> String {
        match &self.option_value {
            Some(value) => value.clone(),
            None => format!(
                "{}/{};{}",
                self.go_prefix.trim_end_matches('/'),
                package.replace('.', "/"),
                package.replace('.', "")
            ),
        }
    }

    pub fn header(&self, package: &str) -> DocumentHeader {
        DocumentHeader {
            package: package.to_string(),
            option_name: self.option_name.clone(),
            option_value: self.option_value_for(package),
        }
    }
}

impl ReconConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, adding a required file when a path is given
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["proto-recon.toml", ".proto-recon.toml", "config/proto-recon.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        let project_dirs = directories::ProjectDirs::from("dev", "protorecon", "proto-recon");
        if let Some(config_dir) = project_dirs {
            let xdg_config = config_dir.config_dir().join("proto-recon.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("PROTO_RECON")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}
