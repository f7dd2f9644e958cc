//! Protocol Messages
//!
//! Commands flow controller → worker, responses flow worker → controller.

use std::fmt;
use thiserror::Error;

/// Violations of the line protocol
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    /// A line that is not a known command
    #[error("unrecognized command: {0:?}")]
    UnknownCommand(String),

    /// `ITERS` with a missing, zero, negative or non-integer count
    #[error("invalid iteration count in {0:?}, expected a positive integer")]
    InvalidIterationCount(String),

    /// `VALUE` payload that is not a float
    #[error("malformed VALUE payload: {0:?}")]
    MalformedValue(String),

    /// `VALUES` payload that is not a numeric array
    #[error("malformed VALUES payload: {0:?}")]
    MalformedValues(String),
}

/// Commands sent from controller to worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run the registered iteration unit this many times
    Iters(u64),
    /// Terminate without replying
    Quit,
}

impl Command {
    /// Parse one line (without its trailing newline) into a command.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let line = line.trim_end_matches('\r');
        if line == "QUIT" {
            return Ok(Command::Quit);
        }

        match line.split_once(' ') {
            Some(("ITERS", count)) => match count.trim().parse::<u64>() {
                Ok(n) if n > 0 => Ok(Command::Iters(n)),
                _ => Err(ProtocolError::InvalidIterationCount(line.to_string())),
            },
            _ if line == "ITERS" => Err(ProtocolError::InvalidIterationCount(line.to_string())),
            _ => Err(ProtocolError::UnknownCommand(line.to_string())),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Iters(n) => write!(f, "ITERS {}", n),
            Command::Quit => write!(f, "QUIT"),
        }
    }
}

/// Terminal markers sent from worker to controller
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Batch succeeded, the controller times it
    Ok,
    /// Batch failed
    NotOk,
    /// One explicit measurement for the batch
    Value(f64),
    /// One explicit measurement per iteration
    Values(Vec<f64>),
}

impl Response {
    /// Parse one worker output line.
    ///
    /// Returns `Ok(None)` for lines that carry no marker (banners, stray
    /// prints); those are ignored by the controller but still count toward
    /// [`crate::MAX_UNMARKED_OUTPUT`].
    pub fn parse(line: &str) -> Result<Option<Self>, ProtocolError> {
        let line = line.trim_end_matches('\r');
        match line {
            "OK" => return Ok(Some(Response::Ok)),
            "NOT OK" => return Ok(Some(Response::NotOk)),
            _ => {}
        }

        let (keyword, payload) = line.split_once(' ').unwrap_or((line, ""));
        match keyword {
            "VALUE" => payload
                .trim()
                .parse::<f64>()
                .map(|x| Some(Response::Value(x)))
                .map_err(|_| ProtocolError::MalformedValue(payload.to_string())),
            "VALUES" => parse_values(payload.trim()).map(|v| Some(Response::Values(v))),
            _ => Ok(None),
        }
    }
}

/// Parse a JSON numeric array. The first element must be numeric, and so
/// must every other element; non-finite values serialize as `null` and are
/// rejected here.
fn parse_values(payload: &str) -> Result<Vec<f64>, ProtocolError> {
    let malformed = || ProtocolError::MalformedValues(payload.to_string());
    let raw: Vec<serde_json::Value> = serde_json::from_str(payload).map_err(|_| malformed())?;

    if !raw.first().is_some_and(serde_json::Value::is_number) {
        return Err(malformed());
    }

    raw.iter()
        .map(|v| v.as_f64().ok_or_else(malformed))
        .collect()
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Ok => write!(f, "OK"),
            Response::NotOk => write!(f, "NOT OK"),
            Response::Value(x) => write!(f, "VALUE {}", x),
            Response::Values(values) => {
                let json = serde_json::to_string(values).map_err(|_| fmt::Error)?;
                write!(f, "VALUES {}", json)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("ITERS 10"), Ok(Command::Iters(10)));
        assert_eq!(Command::parse("ITERS 1\r"), Ok(Command::Iters(1)));
        assert_eq!(Command::parse("QUIT"), Ok(Command::Quit));
    }

    #[test]
    fn test_reject_bad_iteration_counts() {
        for line in ["ITERS 0", "ITERS -3", "ITERS abc", "ITERS", "ITERS "] {
            assert!(
                matches!(
                    Command::parse(line),
                    Err(ProtocolError::InvalidIterationCount(_))
                ),
                "{line:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_reject_unknown_commands() {
        assert!(matches!(
            Command::parse("FROB 3"),
            Err(ProtocolError::UnknownCommand(_))
        ));
        assert!(matches!(
            Command::parse("quit"),
            Err(ProtocolError::UnknownCommand(_))
        ));
        assert!(matches!(
            Command::parse(""),
            Err(ProtocolError::UnknownCommand(_))
        ));
    }

    #[test]
    fn test_command_display() {
        assert_eq!(Command::Iters(42).to_string(), "ITERS 42");
        assert_eq!(Command::Quit.to_string(), "QUIT");
    }

    #[test]
    fn test_parse_markers() {
        assert_eq!(Response::parse("OK"), Ok(Some(Response::Ok)));
        assert_eq!(Response::parse("NOT OK"), Ok(Some(Response::NotOk)));
        assert_eq!(Response::parse("VALUE 0.25"), Ok(Some(Response::Value(0.25))));
        assert_eq!(
            Response::parse("VALUES [0.5, 1, 2.5]"),
            Ok(Some(Response::Values(vec![0.5, 1.0, 2.5])))
        );
    }

    #[test]
    fn test_non_marker_lines_are_ignored() {
        assert_eq!(Response::parse("sleeping 0.1 seconds"), Ok(None));
        assert_eq!(Response::parse(""), Ok(None));
        assert_eq!(Response::parse("OKAY"), Ok(None));
    }

    #[test]
    fn test_malformed_payloads() {
        assert!(matches!(
            Response::parse("VALUE fast"),
            Err(ProtocolError::MalformedValue(_))
        ));
        assert!(matches!(
            Response::parse("VALUES [\"a\", 1]"),
            Err(ProtocolError::MalformedValues(_))
        ));
        assert!(matches!(
            Response::parse("VALUES []"),
            Err(ProtocolError::MalformedValues(_))
        ));
        assert!(matches!(
            Response::parse("VALUES [1, null]"),
            Err(ProtocolError::MalformedValues(_))
        ));
        assert!(matches!(
            Response::parse("VALUES 3"),
            Err(ProtocolError::MalformedValues(_))
        ));
    }

    #[test]
    fn test_response_display_parses_back() {
        let values = Response::Values(vec![0.001, 0.002]);
        assert_eq!(Response::parse(&values.to_string()), Ok(Some(values)));
        assert_eq!(Response::Value(1.5).to_string(), "VALUE 1.5");
        assert_eq!(Response::NotOk.to_string(), "NOT OK");
    }
}
