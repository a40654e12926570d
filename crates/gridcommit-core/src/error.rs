//! Unified error taxonomy for commitment runs
//!
//! Every failure a run can hit maps onto one [`GridError`] variant. The
//! variants carry enough context (day, hour, entity id, line number) to
//! rebuild and reproduce the failing window.
//!
//! | Variant | Raised by | Fatal for |
//! |---------|-----------|-----------|
//! | [`GridError::DataIntegrity`] | data loading / grid validation | the whole run, before solving |
//! | [`GridError::ModelConstruction`] | model builder | the run |
//! | [`GridError::SolveInfeasible`], [`GridError::SolveTimeout`], [`GridError::SolveUnbounded`], [`GridError::SolverEngine`] | solver adapter | the rolling loop |
//! | [`GridError::Cancelled`] | rolling driver | the rolling loop |

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridError {
    /// Malformed or inconsistent static data.
    #[error("data integrity error ({entity}): {message}")]
    DataIntegrity { entity: String, message: String },

    /// A planning window cannot be formulated.
    #[error("model construction error for day {day} ({entity}): {message}")]
    ModelConstruction {
        day: usize,
        entity: String,
        message: String,
    },

    /// The engine proved the window infeasible.
    #[error("window for day {day} is infeasible: {message}")]
    SolveInfeasible { day: usize, message: String },

    /// The engine did not finish inside the solve budget.
    #[error("window for day {day} timed out after {seconds:.1} s")]
    SolveTimeout { day: usize, seconds: f64 },

    /// The engine reported an unbounded objective.
    #[error("window for day {day} is unbounded")]
    SolveUnbounded { day: usize },

    /// The engine failed for another reason; the message is the engine's own.
    #[error("solver engine failed on day {day}: {message}")]
    SolverEngine { day: usize, message: String },

    /// The caller cancelled the run before the window for `day` was built.
    #[error("run cancelled before day {day}")]
    Cancelled { day: usize },

    /// Syntax error in a model-data file.
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Invalid run parameters or settings.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results using GridError.
pub type GridResult<T> = Result<T, GridError>;

impl GridError {
    pub fn integrity(entity: impl Into<String>, message: impl Into<String>) -> Self {
        GridError::DataIntegrity {
            entity: entity.into(),
            message: message.into(),
        }
    }

    pub fn construction(day: usize, entity: impl Into<String>, message: impl Into<String>) -> Self {
        GridError::ModelConstruction {
            day,
            entity: entity.into(),
            message: message.into(),
        }
    }

    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        GridError::Parse {
            line,
            message: message.into(),
        }
    }

    /// Day index the error is attached to, if it arose inside the rolling loop.
    pub fn day(&self) -> Option<usize> {
        match self {
            GridError::ModelConstruction { day, .. }
            | GridError::SolveInfeasible { day, .. }
            | GridError::SolveTimeout { day, .. }
            | GridError::SolveUnbounded { day }
            | GridError::SolverEngine { day, .. }
            | GridError::Cancelled { day } => Some(*day),
            _ => None,
        }
    }

    /// True for the failures reported by the solving engine.
    pub fn is_solve_failure(&self) -> bool {
        matches!(
            self,
            GridError::SolveInfeasible { .. }
                | GridError::SolveTimeout { .. }
                | GridError::SolveUnbounded { .. }
                | GridError::SolverEngine { .. }
        )
    }
}

impl From<anyhow::Error> for GridError {
    fn from(err: anyhow::Error) -> Self {
        GridError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_carries_context() {
        let err = GridError::integrity("gen G7", "references unknown node X");
        let text = err.to_string();
        assert!(text.contains("gen G7"));
        assert!(text.contains("unknown node X"));

        let err = GridError::construction(3, "derate[G1]", "series ends at hour 70");
        assert!(err.to_string().contains("day 3"));
    }

    #[test]
    fn test_day_context() {
        assert_eq!(GridError::Cancelled { day: 4 }.day(), Some(4));
        assert_eq!(
            GridError::SolveInfeasible {
                day: 2,
                message: "x".into()
            }
            .day(),
            Some(2)
        );
        assert_eq!(GridError::Config("bad".into()).day(), None);
    }

    #[test]
    fn test_solve_failure_classification() {
        assert!(GridError::SolveTimeout {
            day: 0,
            seconds: 1.0
        }
        .is_solve_failure());
        assert!(GridError::SolveUnbounded { day: 0 }.is_solve_failure());
        assert!(!GridError::parse(3, "oops").is_solve_failure());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: GridError = io_err.into();
        assert!(matches!(err, GridError::Io(_)));
    }
}
