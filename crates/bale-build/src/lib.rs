//! File selection, path mapping, and archive assembly for bale.
//!
//! # Bundle pipeline
//!
//! ```text
//! bale function
//!   1. Dependencies ── pip / npm into .bale/  → mapping appended
//!   2. Resolve      ── PathMapping → (base_dir, pattern, target prefix)
//!   3. Select       ── walk base_dir, include patterns, ignore rules
//!   4. Collect      ── fold into archive target → file, last mapping wins
//!   5. Archive      ── zip (function) or tar.gz (revision), artifacts last
//!   6. Size gate    ── ≥ 50 MB → BundleOutcome::TooLarge
//! ```
//!
//! # Ignore rules
//!
//! Ignore rules always beat include patterns. They are matched against the
//! path a file would have inside its mapping, so `boto3*` drops a vendored
//! `boto3/` package while `*.pyc` drops bytecode anywhere.

pub mod archive;
pub mod bundle;
pub mod limit;
pub mod paths;
pub mod select;

pub use archive::{ArchiveError, ArchiveFormat, build_archive};
pub use bundle::{
    BundleError, BundleOutcome, FunctionRequest, RevisionRequest, bundle_function,
    bundle_revision, collect_files,
};
pub use limit::{SIZE_LIMIT_BYTES, exceeds_limit};
pub use paths::{MappingError, ResolvedMapping, resolve};
pub use select::{FileSelector, MatchedFile, SelectError, SelectedFile};
