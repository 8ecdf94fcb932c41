use bale_build::RevisionRequest;
use bale_core::BaleConfig;
use std::path::Path;

pub fn revision(
    project_dir: &Path,
    output_dir: &Path,
    build_tag: Option<String>,
) -> anyhow::Result<()> {
    let config = BaleConfig::load(project_dir)?;
    let ignore = super::load_ignore(project_dir, &config)?;

    let request = RevisionRequest {
        project_dir: project_dir.to_path_buf(),
        mappings: config.revision.folders,
        ignore,
        output_dir: output_dir.to_path_buf(),
        build_tag,
    };
    let path = bale_build::bundle_revision(&request)?;

    println!("Wrote revision bundle {}", path.display());
    Ok(())
}
