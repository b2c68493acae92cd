//! Events streamed from the search worker to the UCI printer thread:
//! `info ...` progress snapshots during a search, and a terminal
//! `bestmove` event once the worker has wound down — whether the search
//! ran to completion or was stopped. Generalizes the teacher's
//! `uci_info.rs` `Info`/`to_uci_line()` with `seldepth`/`currmove`
//! fields and a distinct terminal variant, so the front-end thread that
//! owns stdin never has to block on the worker to learn the result
//! (spec.md §5: the controller thread "never blocks on the search").

use std::sync::mpsc::{Receiver, Sender};

use crate::search::{Score, SearchReport};
use crate::types::Move;

/// One `info` line's worth of search progress.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Info {
    pub depth: Option<u32>,
    pub seldepth: Option<u32>,
    pub nodes: Option<u64>,
    pub nps: Option<u64>,
    pub time_ms: Option<u128>,
    pub score_cp: Option<i32>,
    pub score_mate: Option<i32>,
    pub pv: Option<String>,
    pub currmove: Option<String>,
    pub currmovenumber: Option<u32>,
}

impl Info {
    #[must_use]
    pub fn from_report(report: &SearchReport) -> Info {
        let time_ms = report.elapsed.as_millis();
        let nps = if time_ms > 0 {
            (report.nodes as u128 * 1000 / time_ms) as u64
        } else {
            0
        };
        let (score_cp, score_mate) = match report.score {
            Score::Centipawns(cp) => (Some(cp), None),
            Score::Mate(n) => (None, Some(n)),
        };
        let pv = if report.pv.is_empty() {
            None
        } else {
            Some(
                report
                    .pv
                    .iter()
                    .map(Move::to_long_algebraic)
                    .collect::<Vec<_>>()
                    .join(" "),
            )
        };

        Info {
            depth: Some(report.depth),
            seldepth: Some(report.seldepth),
            nodes: Some(report.nodes),
            nps: Some(nps),
            time_ms: Some(time_ms),
            score_cp,
            score_mate,
            pv,
            currmove: report.currmove.map(|m| m.to_long_algebraic()),
            currmovenumber: report.currmovenumber,
        }
    }

    /// Formats this snapshot as a single `info ...` line. Fields that
    /// were never populated are simply omitted, matching the teacher's
    /// conditional-field-joining approach.
    #[must_use]
    pub fn to_uci_line(&self) -> String {
        let mut parts = Vec::new();

        if let Some(d) = self.depth {
            parts.push(format!("depth {d}"));
        }
        if let Some(sd) = self.seldepth {
            parts.push(format!("seldepth {sd}"));
        }
        if let (Some(mv), Some(num)) = (&self.currmove, self.currmovenumber) {
            parts.push(format!("currmove {mv} currmovenumber {num}"));
        }
        if let Some(mate) = self.score_mate {
            parts.push(format!("score mate {mate}"));
        } else if let Some(cp) = self.score_cp {
            parts.push(format!("score cp {cp}"));
        }
        if let Some(n) = self.nodes {
            parts.push(format!("nodes {n}"));
        }
        if let Some(nps) = self.nps {
            parts.push(format!("nps {nps}"));
        }
        if let Some(t) = self.time_ms {
            parts.push(format!("time {t}"));
        }
        if let Some(ref pv) = self.pv {
            parts.push(format!("pv {pv}"));
        }

        if parts.is_empty() {
            "info".to_string()
        } else {
            format!("info {}", parts.join(" "))
        }
    }
}

/// Sent exactly once per search, right before the worker signals
/// `finished-ack`, carrying the move the front-end should report as
/// `bestmove`/`ponder`.
#[derive(Clone, Debug)]
pub enum UciEvent {
    Progress(Info),
    BestMove { best: Move, ponder: Option<Move> },
}

#[must_use]
pub fn channel() -> (Sender<UciEvent>, Receiver<UciEvent>) {
    std::sync::mpsc::channel()
}
