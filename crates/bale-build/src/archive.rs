use std::io::{Cursor, Write};
use std::path::PathBuf;

use bale_core::Artifact;
use flate2::Compression;
use flate2::write::GzEncoder;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::select::SelectedFile;

/// Permission bits for members without explicit ones.
pub const DEFAULT_MODE: u32 = 0o644;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Deflate-compressed zip.
    Zip,
    /// Gzip-compressed tar.
    TarGz,
}

impl ArchiveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::TarGz => "tar.gz",
        }
    }
}

impl std::fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("failed to read {path}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to add '{member}' to zip archive")]
    Zip { member: String, source: ZipError },
    #[error("failed to add '{member}' to tar archive")]
    Tar {
        member: String,
        source: std::io::Error,
    },
    #[error("failed to finish zip archive")]
    FinishZip(#[source] ZipError),
    #[error("failed to finish tar archive")]
    FinishTar(#[source] std::io::Error),
}

/// Build an in-memory archive.
///
/// Selected files are written first, in order, at their archive targets with
/// their on-disk permission bits. Artifacts follow in declaration order and
/// replace any selected file at the same target.
pub fn build_archive(
    format: ArchiveFormat,
    files: &[SelectedFile],
    artifacts: &[Artifact],
) -> Result<Vec<u8>, ArchiveError> {
    let files: Vec<&SelectedFile> = files
        .iter()
        .filter(|file| {
            let shadowed = artifacts.iter().any(|a| a.target == file.archive_target);
            if shadowed {
                tracing::debug!(
                    target = %file.archive_target,
                    path = %file.absolute_path.display(),
                    "artifact replaces selected file"
                );
            }
            !shadowed
        })
        .collect();

    let bytes = match format {
        ArchiveFormat::Zip => build_zip(&files, artifacts)?,
        ArchiveFormat::TarGz => build_tar_gz(&files, artifacts)?,
    };
    tracing::debug!(
        %format,
        files = files.len(),
        artifacts = artifacts.len(),
        size = bytes.len(),
        "built archive"
    );
    Ok(bytes)
}

fn build_zip(
    files: &[&SelectedFile],
    artifacts: &[Artifact],
) -> Result<Vec<u8>, ArchiveError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut add = |member: &str, mode: u32, content: &[u8]| -> Result<(), ArchiveError> {
        let zip_err = |source: ZipError| ArchiveError::Zip {
            member: member.to_owned(),
            source,
        };
        zip.start_file(member, options.unix_permissions(mode))
            .map_err(zip_err)?;
        zip.write_all(content)
            .map_err(|e| zip_err(ZipError::Io(e)))
    };

    for file in files {
        let (content, mode) = read_file(file)?;
        add(&file.archive_target, mode, &content)?;
    }
    for artifact in artifacts {
        add(
            &artifact.target,
            artifact.permission_bits.unwrap_or(DEFAULT_MODE),
            &artifact.content,
        )?;
    }

    let cursor = zip.finish().map_err(ArchiveError::FinishZip)?;
    Ok(cursor.into_inner())
}

fn build_tar_gz(
    files: &[&SelectedFile],
    artifacts: &[Artifact],
) -> Result<Vec<u8>, ArchiveError> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut tar = tar::Builder::new(encoder);
    let mtime = now_secs();

    let mut add = |member: &str, mode: u32, content: &[u8]| -> Result<(), ArchiveError> {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(mode);
        header.set_mtime(mtime);
        header.set_cksum();
        tar.append_data(&mut header, member, content)
            .map_err(|e| ArchiveError::Tar {
                member: member.to_owned(),
                source: e,
            })
    };

    for file in files {
        let (content, mode) = read_file(file)?;
        add(&file.archive_target, mode, &content)?;
    }
    for artifact in artifacts {
        add(
            &artifact.target,
            artifact.permission_bits.unwrap_or(DEFAULT_MODE),
            &artifact.content,
        )?;
    }

    let encoder = tar.into_inner().map_err(ArchiveError::FinishTar)?;
    encoder.finish().map_err(ArchiveError::FinishTar)
}

fn read_file(file: &SelectedFile) -> Result<(Vec<u8>, u32), ArchiveError> {
    let read_err = |e| ArchiveError::ReadFile {
        path: file.absolute_path.clone(),
        source: e,
    };
    let metadata = std::fs::metadata(&file.absolute_path).map_err(read_err)?;
    let content = std::fs::read(&file.absolute_path).map_err(read_err)?;
    Ok((content, file_mode(&metadata)))
}

#[cfg(unix)]
fn file_mode(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn file_mode(metadata: &std::fs::Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        DEFAULT_MODE
    }
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        // arch-lint: allow(no-silent-result-drop) reason="a clock before the epoch only affects member timestamps"
        .unwrap_or(0)
}
