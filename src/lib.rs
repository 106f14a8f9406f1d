//! Position-aware reading and surgical editing of `NuGet.Config` files.
//!
//! [`parse_with_positions`] records the byte range of every element and
//! attribute value it reads. A [`ConfigEditor`] turns mutations into byte-range
//! [`Edit`]s against those positions and applies them in one pass, so every
//! byte outside the edited ranges comes back unchanged.

// Position tracking module
pub mod position;

// Error types
pub mod error;

// Logical configuration model
pub mod model;

// Element position index
pub mod index;

// Parser module
pub mod parser;

// Whitespace and line layout helpers
pub mod layout;

// Edit engine module
pub mod edit;

// Edit queue
pub mod queue;

// Position-aware editor
pub mod editor;

// Canonical writer
pub mod serialize;

// In-memory CRUD on the logical model
pub mod manage;

// Config file discovery
pub mod discovery;

// File operations module
pub mod file;

// JSON batch module
pub mod json;

// Re-exports
pub use position::{LineIndex, Position, Range, byte_to_position};
pub use error::{ConfigError, ErrorKind, Result};
pub use model::{CredentialMap, KeyValue, NuGetConfig, PackageSource, SourceCredential};
pub use index::{AttributeSpan, ElementPosition, PositionIndex};
pub use parser::{ParseResult, parse, parse_with_positions};
pub use layout::Indentation;
pub use edit::{Edit, EditKind, EditTarget, apply_edits, check_conflicts, sort_edits_descending};
pub use queue::{EditQueue, QueueState};
pub use editor::ConfigEditor;
pub use serialize::to_xml;
pub use discovery::{SearchPaths, candidate_paths, find_config};
pub use file::{ConfigFile, checksum, read_config_file, write_config_file};
