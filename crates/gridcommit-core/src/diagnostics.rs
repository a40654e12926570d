//! Non-fatal findings collected while loading and validating a grid.
//!
//! Hard violations (unknown node, overlapping role sets, ...) abort loading
//! with [`GridError::DataIntegrity`](crate::GridError). Everything that is
//! merely suspicious, such as an isolated node or a unit with zero capacity,
//! lands here so that callers can log it and keep going.
//!
//! ```
//! use gridcommit_core::diagnostics::{Diagnostics, Severity};
//!
//! let mut diag = Diagnostics::new();
//! diag.add_warning_with_entity("topology", "node has no transmission line", "BEBE");
//! assert_eq!(diag.warning_count(), 1);
//! assert_eq!(diag.issues[0].severity, Severity::Warning);
//! ```

use serde::Serialize;

/// Severity level for diagnostic issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

/// A single finding
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticIssue {
    pub severity: Severity,
    /// Grouping key, e.g. "topology", "fleet", "series"
    pub category: String,
    pub message: String,
    /// Offending node or generator id, when there is one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl DiagnosticIssue {
    pub fn new(
        severity: Severity,
        category: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            entity: None,
        }
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }
}

impl std::fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Info => "info",
            Severity::Warning => "warning",
        };
        write!(f, "[{}:{}] {}", severity, self.category, self.message)?;
        if let Some(entity) = &self.entity {
            write!(f, " ({})", entity)?;
        }
        Ok(())
    }
}

/// Collection of findings for one load/validation pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, issue: DiagnosticIssue) {
        self.issues.push(issue);
    }

    pub fn add_info(&mut self, category: &str, message: impl Into<String>) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Info, category, message));
    }

    pub fn add_warning(&mut self, category: &str, message: impl Into<String>) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, category, message));
    }

    pub fn add_warning_with_entity(
        &mut self,
        category: &str,
        message: impl Into<String>,
        entity: impl Into<String>,
    ) {
        self.issues.push(
            DiagnosticIssue::new(Severity::Warning, category, message).with_entity(entity),
        );
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn has_warnings(&self) -> bool {
        self.warnings().next().is_some()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
    }

    pub fn issues_by_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a DiagnosticIssue> {
        self.issues.iter().filter(move |i| i.category == category)
    }

    pub fn merge(&mut self, other: Diagnostics) {
        self.issues.extend(other.issues);
    }

    /// Emit every issue as a `tracing` event.
    pub fn log(&self) {
        for issue in &self.issues {
            match issue.severity {
                Severity::Info => tracing::info!(category = %issue.category, "{}", issue),
                Severity::Warning => tracing::warn!(category = %issue.category, "{}", issue),
            }
        }
    }

    pub fn summary(&self) -> String {
        match self.warning_count() {
            0 => "No warnings".to_string(),
            1 => "1 warning".to_string(),
            w => format!("{} warnings", w),
        }
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Diagnostics: {}", self.summary())?;
        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_summary() {
        let mut diag = Diagnostics::new();
        assert_eq!(diag.summary(), "No warnings");

        diag.add_info("fleet", "4 generators loaded");
        diag.add_warning("topology", "2 islands");
        assert_eq!(diag.summary(), "1 warning");

        diag.add_warning_with_entity("fleet", "zero capacity", "G9");
        assert_eq!(diag.warning_count(), 2);
        assert_eq!(diag.summary(), "2 warnings");
        assert_eq!(diag.issues_by_category("fleet").count(), 2);
    }

    #[test]
    fn test_serialization_skips_missing_entity() {
        let mut diag = Diagnostics::new();
        diag.add_warning("topology", "isolated");
        diag.add_warning_with_entity("fleet", "zero capacity", "G1");

        let json = serde_json::to_string_pretty(&diag).unwrap();
        assert!(json.contains("\"warning\""));
        assert!(json.contains("\"entity\": \"G1\""));
        assert_eq!(json.matches("\"entity\"").count(), 1);
    }

    #[test]
    fn test_issue_display() {
        let issue = DiagnosticIssue::new(Severity::Warning, "topology", "no lines")
            .with_entity("BEBE");
        let display = issue.to_string();
        assert!(display.starts_with("[warning:topology]"));
        assert!(display.ends_with("(BEBE)"));
    }

    #[test]
    fn test_merge() {
        let mut a = Diagnostics::new();
        a.add_warning("fleet", "one");
        let mut b = Diagnostics::new();
        b.add_warning("series", "two");
        a.merge(b);
        assert_eq!(a.warning_count(), 2);
    }
}
