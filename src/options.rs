//! UCI options: `Hash` (resizes the transposition table) and
//! `SyzygyPath` (handed to the tablebase oracle). Mutated only by the
//! front-end/controller thread, never concurrently with a running
//! search, per spec.md §5. Grounded on the teacher's
//! `uci/options.rs::UciOptions`/`print_spin`/`parse_setoption`, trimmed
//! to the two options spec.md lists (the teacher's `Threads`,
//! `MultiPV`, and SPSA-tunable options have no counterpart here — SMP
//! and multi-PV are explicit Non-goals).

pub const DEFAULT_HASH_MB: usize = 16;
pub const MIN_HASH_MB: usize = 1;
pub const MAX_HASH_MB: usize = 65536;

/// What a `setoption` call needs the caller to do, since `UciOptions`
/// itself owns neither the transposition table nor the tablebase
/// oracle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OptionEffect {
    /// No follow-up action required.
    None,
    /// `Hash` changed: resize the TT to this many bytes.
    ResizeHash(usize),
    /// `SyzygyPath` changed: hand this path to the tablebase oracle.
    SyzygyPath(String),
}

pub struct UciOptions {
    pub hash_mb: usize,
    pub syzygy_path: String,
}

impl UciOptions {
    #[must_use]
    pub fn new() -> Self {
        UciOptions {
            hash_mb: DEFAULT_HASH_MB,
            syzygy_path: String::new(),
        }
    }

    /// Prints the `option name ...` advertisements expected between
    /// `id author ...` and `uciok`.
    pub fn print_advertisements(&self) {
        println!(
            "option name Hash type spin default {DEFAULT_HASH_MB} min {MIN_HASH_MB} max {MAX_HASH_MB}"
        );
        println!("option name SyzygyPath type string default <empty>");
    }

    /// Applies a parsed `setoption name <name> [value <value>]`. Unknown
    /// option names and malformed values are reported as errors rather
    /// than silently ignored, so the front end can echo a diagnostic.
    pub fn apply(&mut self, name: &str, value: Option<&str>) -> Result<OptionEffect, crate::error::UciError> {
        use crate::error::UciError;

        match name.trim().to_ascii_lowercase().as_str() {
            "hash" => {
                let requested: usize = value
                    .ok_or_else(|| UciError::BadSetOptionArgument("Hash requires a value".to_string()))?
                    .trim()
                    .parse()
                    .map_err(|_| UciError::BadSetOptionArgument(format!("Hash value is not an integer: {value:?}")))?;
                let mb = requested.clamp(MIN_HASH_MB, MAX_HASH_MB);
                self.hash_mb = mb;
                Ok(OptionEffect::ResizeHash(mb))
            }
            "syzygypath" => {
                let path = value.unwrap_or("").to_string();
                self.syzygy_path = path.clone();
                Ok(OptionEffect::SyzygyPath(path))
            }
            other => Err(UciError::BadSetOptionArgument(format!("unknown option: {other}"))),
        }
    }
}

impl Default for UciOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses `setoption name <name...> [value <value...>]` tokens (already
/// split on whitespace, including the leading `setoption`) into the
/// option name and an optional value, joining multi-word names/values
/// back together. Returns `None` if the `name` keyword is missing.
#[must_use]
pub fn parse_setoption(parts: &[&str]) -> Option<(String, Option<String>)> {
    let name_idx = parts.iter().position(|&p| p.eq_ignore_ascii_case("name"))?;
    let value_idx = parts.iter().position(|&p| p.eq_ignore_ascii_case("value"));

    let name_end = value_idx.unwrap_or(parts.len());
    let name = parts[name_idx + 1..name_end].join(" ");
    if name.is_empty() {
        return None;
    }

    let value = value_idx.map(|i| parts[i + 1..].join(" "));
    Some((name, value))
}
