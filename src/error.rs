//! UCI-facing error type: wraps `position::fen::ParseError` (bad FEN /
//! bad move text) and adds diagnostics for malformed `go` and
//! `setoption` arguments, grounded on the teacher's
//! `engine.rs::SearchError`'s plain-enum-with-`Display` style.

use std::fmt;

use crate::position::ParseError as PositionError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UciError {
    Position(PositionError),
    BadGoArgument(String),
    BadSetOptionArgument(String),
}

impl fmt::Display for UciError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UciError::Position(e) => write!(f, "{e}"),
            UciError::BadGoArgument(detail) => write!(f, "invalid go argument: {detail}"),
            UciError::BadSetOptionArgument(detail) => {
                write!(f, "invalid setoption argument: {detail}")
            }
        }
    }
}

impl std::error::Error for UciError {}

impl From<PositionError> for UciError {
    fn from(e: PositionError) -> Self {
        UciError::Position(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_go_argument_formats_with_detail() {
        let err = UciError::BadGoArgument("depth requires a value".to_string());
        assert_eq!(err.to_string(), "invalid go argument: depth requires a value");
    }

    #[test]
    fn bad_setoption_argument_formats_with_detail() {
        let err = UciError::BadSetOptionArgument("unknown option: Ponder".to_string());
        assert_eq!(
            err.to_string(),
            "invalid setoption argument: unknown option: Ponder"
        );
    }

    #[test]
    fn position_error_is_forwarded_via_from() {
        let parse_err = crate::position::Position::from_fen("not a fen").unwrap_err();
        let uci_err: UciError = parse_err.into();
        assert!(matches!(uci_err, UciError::Position(_)));
    }
}
