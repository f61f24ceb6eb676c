//! Ping ID <-> filename encoding
//!
//! The store directory plays the role of a table, so the mapping between a
//! ping's integer ID and its filename must be an explicit bijection rather
//! than something recovered from filesystem metadata. Stored pings are named
//! `ping-<id>.json`; the decimal ID is the only digit run in the name, so it
//! can be extracted with a single capture group of the form
//! "non-digits, digits, non-digits".
//!
//! Both functions are pure and unit-tested without touching disk.

use std::sync::OnceLock;

use regex::Regex;

/// Prefix of every stored ping filename.
pub const FILE_PREFIX: &str = "ping-";

/// Suffix of every stored ping filename.
pub const FILE_SUFFIX: &str = ".json";

/// Prefix for in-flight temporary files.
///
/// The leading dot keeps temp names from ever matching [`name_pattern`], so a
/// concurrent enumeration cannot observe a half-written ping.
pub(crate) const TEMP_PREFIX: &str = ".";

/// Suffix for in-flight temporary files.
pub(crate) const TEMP_SUFFIX: &str = ".tmp";

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^ping-([0-9]+)\.json$").expect("ping filename pattern is valid")
    })
}

/// Returns the filename for a ping ID.
pub fn name_for(id: u64) -> String {
    format!("{FILE_PREFIX}{id}{FILE_SUFFIX}")
}

/// Extracts the ping ID from a filename, or `None` if the name does not
/// match the encoding.
///
/// Exact inverse of [`name_for`]: `id_from_name(&name_for(id)) == Some(id)`
/// for every `u64`. Names whose digit run overflows `u64` are rejected.
pub fn id_from_name(name: &str) -> Option<u64> {
    let captures = name_pattern().captures(name)?;
    captures[1].parse().ok()
}

/// Returns the temporary filename a ping is written under before being
/// renamed into place.
pub(crate) fn temp_name_for(id: u64) -> String {
    format!("{TEMP_PREFIX}{}{TEMP_SUFFIX}", name_for(id))
}
