use bale_core::BaleConfig;
use bale_deps::RealExecutor;
use std::path::Path;

pub async fn prebundle(project_dir: &Path) -> anyhow::Result<()> {
    let config = BaleConfig::load(project_dir)?;
    let scripts = &config.function.pre_bundle;
    if scripts.is_empty() {
        println!("No pre-bundle scripts configured");
        return Ok(());
    }

    bale_deps::run_prebundle(&RealExecutor, scripts, project_dir).await?;

    println!("Ran {} pre-bundle script(s)", scripts.len());
    Ok(())
}
