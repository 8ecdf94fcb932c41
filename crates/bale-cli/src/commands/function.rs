use bale_build::{BundleOutcome, FunctionRequest};
use bale_core::{BaleConfig, CachePolicy};
use bale_deps::{DependencyResolver, RealExecutor};
use std::path::Path;

/// Build the function package and write it to `output`.
///
/// Pre-bundle scripts run first unless skipped. `--keep` overrides the
/// configured cache policy.
pub async fn function(
    project_dir: &Path,
    keep: bool,
    output: &Path,
    skip_prebundle: bool,
) -> anyhow::Result<()> {
    let config = BaleConfig::load(project_dir)?;
    let function = &config.function;

    if !skip_prebundle && !function.pre_bundle.is_empty() {
        println!("Running pre-bundle scripts...");
        bale_deps::run_prebundle(&RealExecutor, &function.pre_bundle, project_dir).await?;
    }

    let resolver = match &function.wheel_cache_dir {
        Some(dir) => DependencyResolver::with_wheel_cache(&project_dir.join(dir))?,
        None => DependencyResolver::new(),
    };

    let cache_policy = if keep {
        CachePolicy::Keep
    } else {
        function.cache_policy()
    };
    let request = FunctionRequest {
        project_dir: project_dir.to_path_buf(),
        runtime: function.runtime.clone(),
        handler_file: function.handler_file.clone(),
        mappings: function.folders.clone(),
        ignore: super::load_ignore(project_dir, &config)?,
        settings: function.settings.clone(),
        cache_policy,
    };

    println!("Bundling {} function...", request.runtime);
    match bale_build::bundle_function(&request, &resolver).await? {
        BundleOutcome::Ready(bytes) => {
            std::fs::write(output, &bytes).map_err(|e| {
                anyhow::anyhow!("failed to write {}: {e}", output.display())
            })?;
            println!("Wrote {} ({} bytes)", output.display(), bytes.len());
            Ok(())
        }
        BundleOutcome::TooLarge { size, limit } => {
            anyhow::bail!(
                "bundle is {size} bytes, at or above the {limit} byte limit; nothing was written"
            )
        }
    }
}
