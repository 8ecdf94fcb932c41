//! Dependency vendoring and pre-bundle hooks for bale.
//!
//! # Protocols
//!
//! ```text
//! runtime python*  ── requirements.txt ── venv + pip  ──▶ site-packages  → archive root
//! runtime nodejs*  ── package.json     ── nodeenv + npm ─▶ node_modules  → node_modules/
//! ```
//!
//! Every external command goes through [`ToolExecutor`], so the branching
//! logic (cache hit vs. source build, empty vs. populated manifest) can be
//! tested against a mock without spawning pip or npm.

pub mod error;
pub mod executor;
pub mod hooks;
pub mod node;
pub mod python;
pub mod resolver;
pub mod runtime;
pub mod tool;
pub mod wheels;

pub use error::{DependencyError, Result};
pub use executor::{RealExecutor, ToolCommand, ToolExecutor};
pub use hooks::{HookError, run_prebundle};
pub use python::InstallReport;
pub use resolver::{DependencyResolver, DependencySpec};
pub use runtime::Runtime;
pub use tool::ToolError;
pub use wheels::{LocalWheelIndex, StaticWheelIndex, WheelIndex};
