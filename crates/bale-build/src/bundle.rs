use std::path::{Path, PathBuf};

use bale_core::{Artifact, CachePolicy, IgnoreRules, PathMapping, append_unique};
use bale_deps::{DependencyError, DependencyResolver, DependencySpec, ToolExecutor, WheelIndex};
use indexmap::IndexMap;

use crate::archive::{ArchiveError, ArchiveFormat, build_archive};
use crate::limit::{SIZE_LIMIT_BYTES, exceeds_limit};
use crate::paths::{MappingError, resolve};
use crate::select::{FileSelector, SelectError, SelectedFile};

/// Source directory bundled when a revision declares no mappings.
pub const DEFAULT_REVISION_SOURCE: &str = "codedeploy";
/// File name stem of revision bundles.
pub const REVISION_BUNDLE_STEM: &str = "revision-bundle";
/// Archive member holding the optional function settings.
pub const SETTINGS_ARTIFACT: &str = "settings.conf";
const SETTINGS_MODE: u32 = 0o644;

/// Inputs for a tar.gz revision bundle.
#[derive(Debug, Clone)]
pub struct RevisionRequest {
    pub project_dir: PathBuf,
    /// Empty means `[{ source = "codedeploy", target = "" }]`.
    pub mappings: Vec<PathMapping>,
    pub ignore: IgnoreRules,
    pub output_dir: PathBuf,
    /// Appended to the bundle name as `_<tag>` when non-empty.
    pub build_tag: Option<String>,
}

impl RevisionRequest {
    /// Name of the archive written by [`bundle_revision`].
    pub fn file_name(&self) -> String {
        match self.build_tag.as_deref().filter(|t| !t.is_empty()) {
            Some(tag) => format!("{REVISION_BUNDLE_STEM}_{tag}.tar.gz"),
            None => format!("{REVISION_BUNDLE_STEM}.tar.gz"),
        }
    }
}

/// Inputs for a zip function package.
#[derive(Debug, Clone)]
pub struct FunctionRequest {
    pub project_dir: PathBuf,
    pub runtime: String,
    pub handler_file: String,
    pub mappings: Vec<PathMapping>,
    pub ignore: IgnoreRules,
    /// Written to the archive root as `settings.conf` when present.
    pub settings: Option<String>,
    pub cache_policy: CachePolicy,
}

/// Result of a function bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum BundleOutcome {
    Ready(Vec<u8>),
    /// The archive was built but is too large to deploy; nothing is produced.
    TooLarge { size: u64, limit: u64 },
}

#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error(transparent)]
    Select(#[from] SelectError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    Dependencies(#[from] DependencyError),
    #[error("failed to write bundle to {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Resolve every mapping and select its files.
///
/// Results are keyed by archive target. When mappings overlap, the one
/// declared last supplies the file; the target keeps its first position.
pub fn collect_files(
    mappings: &[PathMapping],
    project_dir: &Path,
    ignore: &IgnoreRules,
) -> Result<Vec<SelectedFile>, BundleError> {
    let by_target = mappings.iter().try_fold(
        IndexMap::<String, SelectedFile>::new(),
        |mut acc, mapping| {
            let resolved = resolve(mapping, project_dir)?;
            let selector = FileSelector::new(&resolved.base_dir, [resolved.pattern.as_str()], ignore);
            for matched in selector.select()? {
                let archive_target = format!("{}{}", resolved.target_prefix, matched.relative);
                if let Some(previous) = acc.get(&archive_target) {
                    tracing::debug!(
                        target = %archive_target,
                        replaced = %previous.absolute_path.display(),
                        "later mapping overrides file"
                    );
                }
                acc.insert(
                    archive_target.clone(),
                    SelectedFile {
                        absolute_path: matched.absolute,
                        relative_path: matched.relative,
                        archive_target,
                    },
                );
            }
            Ok::<_, BundleError>(acc)
        },
    )?;
    Ok(by_target.into_values().collect())
}

/// Build a tar.gz revision bundle and write it to the request's output
/// directory. Returns the written path.
pub fn bundle_revision(request: &RevisionRequest) -> Result<PathBuf, BundleError> {
    let default_mappings = [PathMapping::at_root(DEFAULT_REVISION_SOURCE)];
    let mappings = if request.mappings.is_empty() {
        &default_mappings[..]
    } else {
        &request.mappings[..]
    };

    let files = collect_files(mappings, &request.project_dir, &request.ignore)?;
    let bytes = build_archive(ArchiveFormat::TarGz, &files, &[])?;

    std::fs::create_dir_all(&request.output_dir).map_err(|e| BundleError::Write {
        path: request.output_dir.clone(),
        source: e,
    })?;
    let path = request.output_dir.join(request.file_name());
    std::fs::write(&path, &bytes).map_err(|e| BundleError::Write {
        path: path.clone(),
        source: e,
    })?;

    tracing::info!(path = %path.display(), files = files.len(), "wrote revision bundle");
    Ok(path)
}

/// Build a zip function package.
///
/// Dependencies are installed for the request's runtime, the handler file is
/// placed at the archive root and settings become `settings.conf`. An archive
/// at or above the size limit yields [`BundleOutcome::TooLarge`].
pub async fn bundle_function<E, W>(
    request: &FunctionRequest,
    resolver: &DependencyResolver<E, W>,
) -> Result<BundleOutcome, BundleError>
where
    E: ToolExecutor,
    W: WheelIndex,
{
    let project_dir = &request.project_dir;
    let spec = DependencySpec::for_project(&request.runtime, project_dir, request.cache_policy)?;

    let mut mappings = request.mappings.clone();
    if let Some(dependencies) = resolver.resolve(&spec, project_dir).await? {
        append_unique(&mut mappings, dependencies);
    }

    if !project_dir.join(&request.handler_file).is_file() {
        tracing::warn!(handler = %request.handler_file, "handler file not found");
    }
    mappings.push(PathMapping::at_root(request.handler_file.as_str()));

    let artifacts: Vec<Artifact> = request
        .settings
        .iter()
        .map(|settings| {
            Artifact::new(SETTINGS_ARTIFACT, settings.as_bytes()).with_permissions(SETTINGS_MODE)
        })
        .collect();

    let files = collect_files(&mappings, project_dir, &request.ignore)?;
    let bytes = build_archive(ArchiveFormat::Zip, &files, &artifacts)?;

    if exceeds_limit(&bytes) {
        return Ok(BundleOutcome::TooLarge {
            size: bytes.len() as u64,
            limit: SIZE_LIMIT_BYTES,
        });
    }
    tracing::info!(
        runtime = %request.runtime,
        files = files.len(),
        size = bytes.len(),
        "built function bundle"
    );
    Ok(BundleOutcome::Ready(bytes))
}
