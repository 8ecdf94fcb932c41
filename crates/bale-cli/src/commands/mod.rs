mod function;
mod prebundle;
mod revision;

use bale_core::{BaleConfig, IgnoreRules};
use std::path::{Path, PathBuf};

pub use function::function;
pub use prebundle::prebundle;
pub use revision::revision;

/// Ignore rules from `~/.baleignore`, `<project>/.baleignore` and `bale.toml`.
pub(crate) fn load_ignore(project_dir: &Path, config: &BaleConfig) -> anyhow::Result<IgnoreRules> {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let rules = IgnoreRules::load(project_dir, home.as_deref(), &config.ignore)?;
    tracing::debug!(rules = rules.rules().len(), "loaded ignore rules");
    Ok(rules)
}
