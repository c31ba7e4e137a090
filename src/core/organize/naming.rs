//! Album naming: the external suggestion service and the local fallback.
//!
//! The service speaks the Ollama HTTP API. It is optional; any failure
//! (unreachable, bad status, unreadable or empty reply) falls back to a
//! name derived from the folder.

use crate::error::NamingError;
use regex::Regex;
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

/// Default model asked for suggestions
pub const DEFAULT_MODEL: &str = "gemma2:2b";

/// Default base URL of the naming service
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Folder segments that carry no meaning for naming
const IGNORED_SEGMENTS: &[&str] = &["Volumes", "TimeMachine"];

/// Prefixes models like to put in front of the answer
const REPLY_PREFIXES: &[&str] = &["Album name: ", "Suggested album name: ", "I suggest: "];

/// Most sample file names sent with a request
pub const MAX_SAMPLES: usize = 5;

static FILLER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_{5,}").expect("filler pattern is valid"));

/// Source of album names for a folder of media
pub trait NameSuggester: Send + Sync {
    /// Probe the service. Called once per organizing run.
    fn is_available(&self) -> bool;

    /// Ask for one album name for `folder`, given sample member paths
    fn suggest(&self, folder: &Path, samples: &[PathBuf]) -> Result<String, NamingError>;
}

/// Suggester that is never available; every album gets a fallback name
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSuggester;

impl NameSuggester for DisabledSuggester {
    fn is_available(&self) -> bool {
        false
    }

    fn suggest(&self, _folder: &Path, _samples: &[PathBuf]) -> Result<String, NamingError> {
        Err(NamingError::Unavailable("naming is disabled".to_string()))
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Client for an Ollama-compatible text generation endpoint
pub struct OllamaSuggester {
    endpoint: String,
    model: String,
    agent: ureq::Agent,
}

impl OllamaSuggester {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(2))
            .timeout_read(Duration::from_secs(60))
            .timeout_write(Duration::from_secs(10))
            .build();

        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            agent,
        }
    }

    /// Model this client asks
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl NameSuggester for OllamaSuggester {
    fn is_available(&self) -> bool {
        self.agent
            .get(&format!("{}/api/tags", self.endpoint))
            .call()
            .map(|response| response.status() == 200)
            .unwrap_or(false)
    }

    fn suggest(&self, folder: &Path, samples: &[PathBuf]) -> Result<String, NamingError> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": build_prompt(folder, samples),
            "stream": false,
        });

        let response = self
            .agent
            .post(&format!("{}/api/generate", self.endpoint))
            .send_json(body)
            .map_err(|error| match error {
                ureq::Error::Status(status, response) => NamingError::Status {
                    status,
                    body: response.into_string().unwrap_or_default(),
                },
                ureq::Error::Transport(transport) => {
                    NamingError::Unavailable(transport.to_string())
                }
            })?;

        let reply: GenerateResponse = response
            .into_json()
            .map_err(|e| NamingError::InvalidResponse(e.to_string()))?;

        clean_suggestion(&reply.response).ok_or(NamingError::EmptySuggestion)
    }
}

/// Meaningful trailing segments of a folder path, at most three
fn context_segments(folder: &Path) -> Vec<String> {
    let segments: Vec<String> = folder
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .filter(|part| !part.starts_with('.') && !IGNORED_SEGMENTS.contains(&part.as_str()))
        .collect();

    let skip = segments.len().saturating_sub(3);
    segments.into_iter().skip(skip).collect()
}

/// Prompt sent to the naming service
pub fn build_prompt(folder: &Path, samples: &[PathBuf]) -> String {
    let names: Vec<String> = samples
        .iter()
        .take(MAX_SAMPLES)
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect();

    format!(
        "Given these folder names from a photo/video path: {}\n\n\
         And these sample filenames: {}\n\n\
         Suggest a good album name in format: YYYY-MM Description \
         (e.g., \"2005-06 Cyprus Vacation\" or \"2021-10 Yellowstone Trip\")\n\n\
         If you can't determine a date, use just the description (e.g., \"Family Photos\").\n\n\
         Reply with ONLY the album name, nothing else.",
        context_segments(folder).join(" / "),
        names.join(", ")
    )
}

/// Normalize a raw model reply; `None` when nothing usable remains
pub fn clean_suggestion(raw: &str) -> Option<String> {
    let mut suggestion = raw.trim().trim_matches(|c| c == '"' || c == '\'');
    for prefix in REPLY_PREFIXES {
        suggestion = suggestion.strip_prefix(prefix).unwrap_or(suggestion);
    }
    let suggestion = sanitize_album_name(suggestion.trim());
    (!suggestion.is_empty()).then_some(suggestion)
}

/// Make a name usable as a single path segment.
///
/// Returns an empty string when nothing usable remains, including the
/// relative segments `.` and `..`.
pub fn sanitize_album_name(name: &str) -> String {
    let name = name.replace(['/', '\\'], "-");
    match name.trim() {
        "." | ".." => String::new(),
        trimmed => trimmed.to_string(),
    }
}

/// Name derived from the folder itself: `"{year_month} {folder}"`
pub fn fallback_album_name(folder: &Path, year_month: &str) -> String {
    let base = folder
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let cleaned = FILLER.replace_all(&base, "");
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned == "." {
        format!("{year_month} Photos")
    } else {
        sanitize_album_name(&format!("{year_month} {cleaned}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_uses_last_segment() {
        assert_eq!(
            fallback_album_name(Path::new("/src/Trip2019"), "2019-07"),
            "2019-07 Trip2019"
        );
    }

    #[test]
    fn fallback_strips_filler_runs() {
        assert_eq!(
            fallback_album_name(Path::new("/src/_____Beach_____"), "2020-01"),
            "2020-01 Beach"
        );
        assert_eq!(
            fallback_album_name(Path::new("/src/__________"), "Unknown Date"),
            "Unknown Date Photos"
        );
    }

    #[test]
    fn fallback_for_root_folder() {
        assert_eq!(fallback_album_name(Path::new("/"), "2020-01"), "2020-01 Photos");
    }

    #[test]
    fn suggestion_cleanup_removes_quotes_and_prefixes() {
        assert_eq!(
            clean_suggestion("  \"Album name: 2005-06 Cyprus Vacation\"\n"),
            Some("2005-06 Cyprus Vacation".to_string())
        );
        assert_eq!(
            clean_suggestion("I suggest: Summer/Fall"),
            Some("Summer-Fall".to_string())
        );
        assert_eq!(clean_suggestion(" '' "), None);
        assert_eq!(clean_suggestion("Album name: .."), None);
    }

    #[test]
    fn relative_segments_sanitize_to_empty() {
        assert_eq!(sanitize_album_name(".."), "");
        assert_eq!(sanitize_album_name(" . "), "");
        assert_eq!(sanitize_album_name("../.."), "..-..");
        assert_eq!(sanitize_album_name("...Beach"), "...Beach");
    }

    #[test]
    fn prompt_uses_meaningful_segments_and_samples() {
        let samples: Vec<PathBuf> = (0..7)
            .map(|i| PathBuf::from(format!("/Volumes/Backup/.hidden/Trips/Cyprus/IMG_{i}.jpg")))
            .collect();
        let prompt = build_prompt(Path::new("/Volumes/Backup/.hidden/Trips/Cyprus"), &samples);

        assert!(prompt.contains("Backup / Trips / Cyprus"));
        assert!(prompt.contains("IMG_4.jpg"));
        assert!(!prompt.contains("IMG_5.jpg"));
        assert!(!prompt.contains("Volumes"));
    }

    #[test]
    fn disabled_suggester_is_unavailable() {
        let suggester = DisabledSuggester;
        assert!(!suggester.is_available());
        assert!(suggester.suggest(Path::new("/x"), &[]).is_err());
    }

    #[test]
    fn unreachable_service_is_unavailable() {
        let suggester = OllamaSuggester::new("http://127.0.0.1:9/", DEFAULT_MODEL);
        assert_eq!(suggester.model(), DEFAULT_MODEL);
        assert!(!suggester.is_available());
        assert!(suggester.suggest(Path::new("/x"), &[]).is_err());
    }
}
