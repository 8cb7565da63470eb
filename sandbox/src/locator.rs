use std::fmt;
use std::ops::Range;
use std::path::PathBuf;

use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};

use doccheck::rewrite::Advisory;
use doccheck::source::Document;

use crate::error::{Failure, FailureKind};
use crate::executor::LintWarning;

/// A position in one of the document's original files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: PathBuf,
    /// Index into the document's file list.
    pub file: usize,
    /// 1-based line.
    pub line: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.line)
    }
}

/// Translates expanded-document lines back to original file:line through the
/// document's origin map. Rewriting keeps lines one-to-one, so the origin map
/// is the only indirection.
pub struct Locator<'d> {
    document: &'d Document,
}

impl<'d> Locator<'d> {
    pub fn new(document: &'d Document) -> Self {
        Locator { document }
    }

    pub fn locate(&self, line: usize) -> Location {
        let origin = self
            .document
            .origin(line)
            .or_else(|| self.document.origins.last().copied())
            .unwrap_or(doccheck::source::Origin { file: 0, line: 0 });
        Location {
            path: self.document.files[origin.file].path.clone(),
            file: origin.file,
            line: origin.line + 1,
        }
    }

    pub fn attach<'i, T: Diagnose>(&self, item: &'i T) -> Located<'i, T> {
        Located {
            item,
            location: self.locate(item.line()),
        }
    }

    /// Byte range of the located line in its original file, for snippets.
    pub fn span(&self, location: &Location) -> Range<usize> {
        let text = &self.document.files[location.file].text;
        line_span(text, location.line - 1)
    }
}

/// Something reportable at an expanded-document line.
pub trait Diagnose {
    fn line(&self) -> usize;
    fn severity(&self) -> Severity;
    fn headline(&self) -> String;
    fn details(&self) -> Vec<String>;
}

impl Diagnose for Failure {
    fn line(&self) -> usize {
        self.line
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn headline(&self) -> String {
        match (&self.kind, &self.assertion) {
            (FailureKind::Run, Some(_)) => format!("assertion failed: {}", self.message),
            (kind, _) => format!("{}: {}", kind, self.message),
        }
    }

    fn details(&self) -> Vec<String> {
        match &self.assertion {
            Some(assertion) => vec![
                format!("actual:   {}", assertion.actual),
                format!("expected: {}", assertion.expected),
                format!("source:   {}", assertion.label.trim()),
            ],
            None => {
                let mut details = vec![format!("source: {}", self.source_line.trim())];
                details.extend(self.context.iter().cloned());
                details
            }
        }
    }
}

impl Diagnose for LintWarning {
    fn line(&self) -> usize {
        self.line
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn headline(&self) -> String {
        format!("lint [{}]: {}", self.finding.rule, self.finding.message)
    }

    fn details(&self) -> Vec<String> {
        Vec::new()
    }
}

impl Diagnose for Advisory {
    fn line(&self) -> usize {
        self.line
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn headline(&self) -> String {
        format!("warning: {}", self)
    }

    fn details(&self) -> Vec<String> {
        vec![format!("source: {}", self.text.trim())]
    }
}

/// A reportable item paired with its original location.
pub struct Located<'i, T> {
    pub item: &'i T,
    pub location: Location,
}

impl<T: Diagnose> Located<'_, T> {
    /// Render as a codespan diagnostic labelled at the original line. The
    /// file id is the index into the document's file list.
    pub fn to_diagnostic(&self, locator: &Locator<'_>) -> Diagnostic<usize> {
        Diagnostic::new(self.item.severity())
            .with_message(self.item.headline())
            .with_labels(vec![Label::primary(
                self.location.file,
                locator.span(&self.location),
            )])
            .with_notes(self.item.details())
    }
}

impl<T: Diagnose> fmt::Display for Located<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.item.headline(), self.location)?;
        for detail in self.item.details() {
            write!(f, "\n    {}", detail)?;
        }
        Ok(())
    }
}

/// Byte range of 0-based `line` in `text`, excluding the line terminator.
fn line_span(text: &str, line: usize) -> Range<usize> {
    let mut start = 0;
    for (index, chunk) in text.split_inclusive('\n').enumerate() {
        if index == line {
            let content = chunk.trim_end_matches(|c: char| c == '\n' || c == '\r');
            return start..start + content.len();
        }
        start += chunk.len();
    }
    text.len()..text.len()
}
