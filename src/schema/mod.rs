//! Schema inference over arbitrary source column names.
//!
//! Third-party boundary layers agree on almost nothing: `ADM3_PCODE`,
//! `adm3_pcod`, `admin_pcode`, bare `pcode`. The resolver runs an ordered list
//! of typed matcher rules and returns explicit `Resolved`/`Unresolved` markers
//! so callers can decide what a miss means for them.

mod matcher;
mod resolver;

pub use matcher::ColumnMatch;
pub(crate) use matcher::{first_match, Rule};
pub use resolver::{detect_level_token, resolve_schema, LevelSource, ResolvedSchema};
