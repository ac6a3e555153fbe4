//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Keep transport layers decoupled from storage details.
//! - Emit one outcome event per mutating call.

use crate::logging::{EventLine, EventStatus};
use crate::repo::RepoResult;
use log::{info, warn};
use std::time::Instant;

pub mod entity_service;
pub mod graph_service;
pub mod query_service;

/// Opens the event line of a finished service call with status, duration
/// and, on failure, the error code.
fn outcome_line<T>(event: &str, started_at: Instant, result: &RepoResult<T>) -> EventLine {
    match result {
        Ok(_) => EventLine::new(event, "service", EventStatus::Ok).elapsed(started_at),
        Err(err) => EventLine::new(event, "service", EventStatus::Error)
            .elapsed(started_at)
            .error_code(err.code()),
    }
}

/// Emits `line` at `info` for success and `warn` for failure.
fn log_outcome<T>(result: &RepoResult<T>, line: EventLine) {
    if result.is_ok() {
        info!("{line}");
    } else {
        warn!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::outcome_line;
    use crate::repo::{RepoError, RepoResult};
    use std::time::Instant;
    use uuid::Uuid;

    #[test]
    fn failed_call_reports_code_without_message() {
        let id = Uuid::new_v4();
        let result: RepoResult<()> = Err(RepoError::InvalidCursor("secret page".to_string()));
        let line = outcome_line("entity_delete", Instant::now(), &result)
            .field("id", id)
            .to_string();

        assert!(line.starts_with("event=entity_delete module=service status=error duration_ms="));
        assert!(line.contains(" error_code=invalid_cursor "));
        assert!(line.ends_with(&format!(" id={id}")));
        assert!(!line.contains("secret"));
    }

    #[test]
    fn successful_call_has_no_error_code() {
        let result: RepoResult<usize> = Ok(3);
        let line = outcome_line("entity_update", Instant::now(), &result).to_string();
        assert!(line.starts_with("event=entity_update module=service status=ok duration_ms="));
        assert!(!line.contains("error_code"));
    }
}
