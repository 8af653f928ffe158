//! Feature-detection word list
//!
//! The companion header names its probes `check_<identifier>`; every such
//! identifier is a structure or command relevant to feature detection.

use regex::Regex;
use std::io::BufRead;
use std::path::Path;
use std::sync::OnceLock;

use indexmap::IndexSet;

use crate::error::{RegistryError, Result};

/// Cached regex for `check_<identifier>` extraction
static CHECK_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_check_regex() -> &'static Regex {
    CHECK_REGEX.get_or_init(|| Regex::new(r"check_(\w+)").expect("Failed to compile check_ regex"))
}

/// Extract identifiers from a reader, one per matching line, first-seen order.
pub fn parse<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let regex = get_check_regex();
    let mut words = IndexSet::new();

    for line in reader.lines() {
        let line = line.map_err(RegistryError::Io)?;
        if let Some(caps) = regex.captures(&line) {
            words.insert(caps[1].to_owned());
        }
    }

    Ok(words.into_iter().collect())
}

/// Load the word list from `path`.
///
/// When `optional` is set, a missing file yields an empty list and a warning.
pub fn load(path: &Path, optional: bool) -> Result<Vec<String>> {
    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if optional {
                tracing::warn!(
                    "feature detection word list {} not found, continuing without it",
                    path.display()
                );
                return Ok(Vec::new());
            }
            return Err(RegistryError::InputNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(RegistryError::Io(e)),
    };

    let words = parse(std::io::BufReader::new(file))?;
    tracing::debug!("loaded {} feature detection words from {}", words.len(), path.display());
    Ok(words)
}
