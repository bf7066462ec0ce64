//! Path rewriting between server and local spellings.
//!
//! - **Rules**: validated `(remote, local)` pairs in config order
//! - **Resolver**: per-direction pipeline, longest search form first,
//!   rejecting ambiguous and cascading rules
//! - **Content**: literal byte-level replacement over whole buffers or
//!   line streams
//!
//! # Example
//!
//! ```ignore
//! use ssync::model::SyncDirection;
//! use ssync::rewrite::{resolve_pipeline, rewrite, RuleEntry, RuleStore};
//!
//! let store = RuleStore::load(&[RuleEntry::new("/home/dev", "/Users/dev")])?;
//! let pipeline = resolve_pipeline(&store, SyncDirection::ServerToLocal)?;
//! assert_eq!(rewrite(b"/home/dev/app", &pipeline), b"/Users/dev/app");
//! ```

mod content;
mod resolver;
mod rules;

pub use content::{rewrite, rewrite_file, rewrite_str, rewrite_stream, RewrittenFile};
pub use resolver::{resolve_pipeline, Pipeline, RewriteOp};
pub use rules::{RewriteRule, RuleEntry, RuleStore};
