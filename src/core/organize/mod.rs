//! Album organization module.
//!
//! Groups media into named albums under a library root and moves them
//! there:
//! - `Photos/<year>/<album>/` and `Videos/<year>/<album>/` from source folders
//! - `Music/<artist>/<album>/` from audio tags
//!
//! Duplicate non-survivors go to a trash folder that mirrors their
//! original location.

mod executor;
mod naming;
mod planner;
mod types;

pub use executor::{move_file, move_file_with, unique_destination, OrganizeExecutor};
pub use naming::{
    build_prompt, clean_suggestion, fallback_album_name, sanitize_album_name, DisabledSuggester,
    NameSuggester, OllamaSuggester, DEFAULT_ENDPOINT, DEFAULT_MODEL,
};
pub use planner::{median_date, AlbumPlanner, MIN_ALBUM_SIZE};
pub use types::*;
