use serde::{Deserialize, Serialize};

use crate::mapping::{CachePolicy, PathMapping};

/// Name of the project configuration file.
pub const CONFIG_FILE_NAME: &str = "bale.toml";

/// bale.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaleConfig {
    /// Ignore fragments applied in addition to `.baleignore` files
    #[serde(default)]
    pub ignore: Vec<String>,
    #[serde(default)]
    pub revision: RevisionConfig,
    #[serde(default)]
    pub function: FunctionConfig,
}

/// Code-deploy revision bundle (tar.gz).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RevisionConfig {
    /// Source → target mappings. Empty means `codedeploy/` at the archive root.
    #[serde(default)]
    pub folders: Vec<PathMapping>,
}

/// Serverless function package (zip).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionConfig {
    /// Runtime identifier, e.g. `python3.12` or `nodejs20.x`
    #[serde(default = "default_runtime")]
    pub runtime: String,
    /// Handler source file, placed at the archive root
    #[serde(default = "default_handler_file")]
    pub handler_file: String,
    #[serde(default)]
    pub folders: Vec<PathMapping>,
    /// Content of the generated `settings.conf` artifact
    #[serde(default)]
    pub settings: Option<String>,
    /// Keep isolated environments and module caches between runs
    #[serde(default)]
    pub keep: bool,
    /// Scripts run in the project directory before bundling
    #[serde(default)]
    pub pre_bundle: Vec<String>,
    /// Directory of prebuilt `.whl` files consulted before pip builds from source
    #[serde(default)]
    pub wheel_cache_dir: Option<String>,
}

impl Default for FunctionConfig {
    fn default() -> Self {
        Self {
            runtime: default_runtime(),
            handler_file: default_handler_file(),
            folders: Vec::new(),
            settings: None,
            keep: false,
            pre_bundle: Vec::new(),
            wheel_cache_dir: None,
        }
    }
}

impl FunctionConfig {
    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy::from_keep(self.keep)
    }
}

impl BaleConfig {
    /// Load from bale.toml at the given path, or return defaults if not found.
    pub fn load(project_dir: &std::path::Path) -> crate::Result<Self> {
        let config_path = project_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            let content =
                std::fs::read_to_string(&config_path).map_err(|e| crate::Error::ConfigLoad {
                    path: config_path.clone(),
                    source: e,
                })?;
            toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
                path: config_path,
                source: e,
            })
        } else {
            tracing::debug!(path = %config_path.display(), "no config file; using defaults");
            Ok(Self::default())
        }
    }
}

fn default_runtime() -> String {
    "python3.12".to_owned()
}

fn default_handler_file() -> String {
    "handler.py".to_owned()
}
