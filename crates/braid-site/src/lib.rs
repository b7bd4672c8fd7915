//! Site resolution for braid.
//!
//! This crate turns a configuration document into a [`SiteModel`]:
//!
//! - [`ConfigResolver`]: loads root and child documents and materializes
//!   their sources
//! - [`build_nav`]: builds a source's navigation tree, from its directory
//!   layout or from an explicit declaration
//! - [`Session`]: runs both for every source and assembles the model
//!
//! # Quick Start
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::path::{Path, PathBuf};
//! use std::sync::Arc;
//! use braid_site::Session;
//! use braid_vcs::GitCache;
//!
//! let cache = Arc::new(GitCache::new(PathBuf::from(".braid/cache")));
//! let model = Session::new(cache).run(Path::new("braid.toml"))?;
//! for source in &model.sources {
//!     println!("{}: {} pages", source.name(), source.pages.len());
//! }
//! # Ok(())
//! # }
//! ```

mod model;
mod nav;
mod resolve;
mod session;

pub use model::{SiteModel, SourceModel};
pub use nav::{LinkTarget, NavError, NavLink, NavNode, NavSection, NavTree, build_nav};
pub use resolve::{ConfigResolver, ResolveError, ResolvedSite, ResolvedSource, SkippedSource};
pub use session::{BuildError, ResolveOptions, Session};
