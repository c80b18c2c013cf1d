//! Render-engine boundary – the zip-container and mark-up engine that
//! performs the actual token substitution is an external collaborator; this
//! module pins down the interface the orchestrator needs from it.

use std::fmt;

use thiserror::Error;

use crate::paginate::Page;

/// One structured problem reported by the external templating engine
/// (e.g. an unresolved token or malformed token syntax).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineIssue {
    pub explanation: String,
    /// The offending tag text, when the engine can attribute one.
    pub tag: Option<String>,
}

impl EngineIssue {
    pub fn new(explanation: impl Into<String>, tag: Option<String>) -> Self {
        Self {
            explanation: explanation.into(),
            tag,
        }
    }

    /// True for the well-known docx-engine failure caused by a stray space
    /// after the opening brace (`{ genus}`), which the engine misreads as an
    /// unclosed loop tag.
    pub fn is_unclosed_tag(&self) -> bool {
        self.explanation.to_lowercase().contains("unclosed")
    }
}

/// Failure raised by the external engine, carrying zero or more issues.
#[derive(Debug, Clone, Error)]
pub struct EngineError {
    pub message: String,
    pub issues: Vec<EngineIssue>,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            issues: Vec::new(),
        }
    }

    pub fn with_issues(message: impl Into<String>, issues: Vec<EngineIssue>) -> Self {
        Self {
            message: message.into(),
            issues,
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for issue in &self.issues {
            match &issue.tag {
                Some(tag) if issue.is_unclosed_tag() => write!(
                    f,
                    "; placeholder \"{{{tag}}}\" has an extra space after the \
                     opening brace, remove the space"
                )?,
                Some(tag) => write!(f, "; {} (tag: {tag})", issue.explanation)?,
                None => write!(f, "; {}", issue.explanation)?,
            }
        }
        Ok(())
    }
}

/// The orchestrator's view of the external zip + mark-up engine.
///
/// An implementation owns one template buffer exclusively for the duration of
/// a generation call; there are no concurrent calls against the same buffer.
pub trait RenderEngine {
    /// The template's body mark-up (`word/document.xml` text).
    fn body_xml(&self) -> Result<String, EngineError>;

    /// Replace the body mark-up with the preprocessed version.
    fn set_body_xml(&mut self, xml: String) -> Result<(), EngineError>;

    /// Substitute the page data into the template and assemble the binary
    /// output document.
    fn render(&mut self, pages: &[Page]) -> Result<Vec<u8>, EngineError>;

    /// Concatenated text of the rendered document, used for the post-render
    /// unresolved-token sweep. `None` skips the sweep.
    fn full_text(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_issue_details() {
        let err = EngineError::with_issues(
            "render failed",
            vec![
                EngineIssue::new("unresolved tag", Some("Genus".into())),
                EngineIssue::new("duplicate open tag", None),
            ],
        );
        let msg = err.to_string();
        assert!(msg.contains("render failed"));
        assert!(msg.contains("unresolved tag (tag: Genus)"));
        assert!(msg.contains("duplicate open tag"));
    }

    #[test]
    fn unclosed_tag_gets_actionable_hint() {
        let err = EngineError::with_issues(
            "render failed",
            vec![EngineIssue::new("Unclosed loop", Some(" genus".into()))],
        );
        assert!(err.to_string().contains("extra space after the opening brace"));
    }
}
