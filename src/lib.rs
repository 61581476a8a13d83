//! Automatic rewriting of AMD modules (`sap.ui.define` / `sap.ui.require`).
//!
//! Lint findings carry fix descriptors addressed by line and column. For each
//! resource the engine locates the described nodes in the original syntax
//! tree, merges the module imports the fixes need into the enclosing module
//! declarations and splices all edits into the original text in one pass.
//! Everything not explicitly changed keeps its formatting and comments.

pub mod amd_edit;
pub mod autofix;
pub mod change_set;
pub mod comments;
pub mod config;
pub mod dependency_map;
pub mod error;
pub mod fix;
pub mod identifiers;
pub mod imports;
pub mod model;
pub mod module_declaration;
pub mod node_search;
pub mod parse;
pub mod replace;
pub mod syntax;
pub mod syntax_list;
pub mod text;
pub mod tracing_config;

pub use autofix::{autofix, fix_resource};
pub use config::AutofixOptions;
pub use error::{AutofixError, Result};
pub use model::{
    AutofixInput, AutofixOutput, Finding, FixDescriptor, ResourceFailure, ResourceInput,
};
pub use text::Position;
