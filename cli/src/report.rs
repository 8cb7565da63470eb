use std::io::Write;

use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use doccheck::Extraction;
use doccheck::rewrite::Advisory;
use doccheck::source::Document;
use sandbox::{Diagnose, DocumentReport, Located, Locator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// codespan diagnostics with a snippet of the original file.
    Snippets,
    /// One `<headline> at <file>:<line>` block per error.
    Plain,
}

pub struct Reporter {
    color: ColorChoice,
    style: Style,
}

impl Reporter {
    pub fn new(color: ColorChoice, style: Style) -> Self {
        Reporter { color, style }
    }

    /// Summary line, then every error and advisory of one document.
    pub fn document(&self, report: &DocumentReport) {
        self.summary(report);

        let locator = report.locator();
        let files = file_database(&report.document);
        let writer = StandardStream::stderr(self.color);
        let config = term::Config::default();

        let errors = report.error_count();
        if errors > 0 {
            let _ = writeln!(writer.lock(), "{} errors:", errors);
        }
        for failure in report.located_failures() {
            self.emit(&writer, &config, &files, &locator, &failure);
        }
        for finding in report.located_findings() {
            self.emit(&writer, &config, &files, &locator, &finding);
        }
        for advisory in report.located_advisories() {
            self.emit(&writer, &config, &files, &locator, &advisory);
        }
    }

    fn summary(&self, report: &DocumentReport) {
        let mut out = StandardStream::stdout(self.color);
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(if report.is_clean() {
            Color::Green
        } else {
            Color::Red
        }))
        .set_bold(true);

        let _ = out.set_color(&spec);
        let _ = write!(out, "{}", report.summary());
        let _ = out.reset();
        let _ = writeln!(out);
    }

    fn emit<T: Diagnose>(
        &self,
        writer: &StandardStream,
        config: &term::Config,
        files: &SimpleFiles<String, String>,
        locator: &Locator<'_>,
        item: &Located<'_, T>,
    ) {
        match self.style {
            Style::Snippets => {
                let diagnostic = item.to_diagnostic(locator);
                let _ = term::emit_to_write_style(&mut writer.lock(), config, files, &diagnostic);
            }
            Style::Plain => {
                let _ = writeln!(writer.lock(), "{}", item);
            }
        }
    }
}

/// One codespan file per document file, so file ids equal the document's
/// file indices.
fn file_database(document: &Document) -> SimpleFiles<String, String> {
    let mut files = SimpleFiles::new();
    for file in &document.files {
        files.add(file.path.display().to_string(), file.text.clone());
    }
    files
}

/// Print where each block starts, how it runs and its prolog.
pub fn list_blocks(extraction: &Extraction, advisories: &[Advisory], rewritten: bool) {
    let locator = Locator::new(&extraction.document);

    for block in &extraction.blocks {
        println!("{}  {}", locator.locate(block.fence_line()), block.mode);
        for line in &block.prolog {
            println!("    > {}", line.text);
        }
        if rewritten {
            for code in &block.code {
                println!("    | {}", code);
            }
        }
    }

    for advisory in advisories {
        eprintln!("{}", locator.attach(advisory));
    }
}
