//! Syzygy endgame tablebases, treated per spec.md §1 as an opaque
//! win/draw/loss oracle external to the engine core — no probing code or
//! tablebase files ship with this crate. This module is the stable seam
//! `SyzygyPath` changes flow into, and the interface search/the engine
//! layer would call against if tablebase support is wired in later.

use crate::position::Position;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wdl {
    Win,
    Draw,
    Loss,
}

pub trait TablebaseOracle: Send + Sync {
    /// Records where tablebase files live (from the `SyzygyPath` UCI
    /// option). Implementations that cannot find usable files at `path`
    /// should fall back to reporting misses rather than erroring.
    fn set_path(&mut self, path: &str);

    /// Looks up the win/draw/loss outcome for `pos` from the side to
    /// move's perspective. `None` means "no answer" — a materially too-
    /// large position, a missing file, or (for [`NoTablebase`]) simply no
    /// tablebase support at all.
    fn probe_wdl(&self, pos: &Position) -> Option<Wdl>;
}

/// The default oracle: no tablebase files are configured, so every probe
/// misses. Search treats a miss exactly like "the tablebase was never
/// consulted."
#[derive(Default)]
pub struct NoTablebase {
    path: String,
}

impl NoTablebase {
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl TablebaseOracle for NoTablebase {
    fn set_path(&mut self, path: &str) {
        self.path = path.to_string();
    }

    fn probe_wdl(&self, _pos: &Position) -> Option<Wdl> {
        None
    }
}
