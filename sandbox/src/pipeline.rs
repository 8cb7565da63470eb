use std::path::Path;

use doccheck::Extraction;
use doccheck::rewrite::{Advisory, Heuristic, ParseRetry, Rewriter};
use doccheck::source::Document;

use crate::config::{Config, Overrides, ValueStrategy};
use crate::error::{CheckError, Failure};
use crate::executor::{Executor, LintWarning};
use crate::host::{Host, HostOptions};
use crate::lint::{Linter, StrictLinter};
use crate::locator::{Located, Locator};

/// Everything learned from checking one document.
#[derive(Debug)]
pub struct DocumentReport {
    pub document: Document,
    /// Blocks found in the document, whatever their mode.
    pub blocks: usize,
    /// Blocks that compiled and ran without error.
    pub blocks_ran: usize,
    /// Assertions that passed.
    pub assertions: u64,
    pub failures: Vec<Failure>,
    pub findings: Vec<LintWarning>,
    pub advisories: Vec<Advisory>,
}

impl DocumentReport {
    /// Failures plus lint findings. Advisories are not errors.
    pub fn error_count(&self) -> usize {
        self.failures.len() + self.findings.len()
    }

    pub fn is_clean(&self) -> bool {
        self.error_count() == 0
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: {} code blocks and {} assertions passed.",
            self.document.path().display(),
            self.blocks_ran,
            self.assertions
        )
    }

    pub fn locator(&self) -> Locator<'_> {
        Locator::new(&self.document)
    }

    pub fn located_failures(&self) -> Vec<Located<'_, Failure>> {
        let locator = self.locator();
        self.failures.iter().map(|f| locator.attach(f)).collect()
    }

    pub fn located_findings(&self) -> Vec<Located<'_, LintWarning>> {
        let locator = self.locator();
        self.findings.iter().map(|f| locator.attach(f)).collect()
    }

    pub fn located_advisories(&self) -> Vec<Located<'_, Advisory>> {
        let locator = self.locator();
        self.advisories.iter().map(|a| locator.attach(a)).collect()
    }
}

/// Load `path` with its includes, resolve its config, and check it.
pub fn check_document(
    path: impl AsRef<Path>,
    overrides: &Overrides,
) -> Result<DocumentReport, CheckError> {
    let document = Document::load(path)?;
    let mut config = Config::resolve(&document.base_dir())?;
    config.apply(overrides);
    Ok(check(document, &config, &StrictLinter::new()))
}

/// Segment, rewrite and run every block of a loaded document.
pub fn check(document: Document, config: &Config, linter: &dyn Linter) -> DocumentReport {
    let host = host_for(&document, config);
    let (Extraction { document, blocks }, advisories) =
        rewritten(document, &host, config.arrow_values);

    let lint_config = config.lint_config();
    let mut executor = Executor::new(&document, &host);
    if config.lint.enabled {
        executor = executor.with_linter(linter, &lint_config);
    }
    let outcome = executor.run(&blocks);

    tracing::debug!(
        path = %document.path().display(),
        blocks = blocks.len(),
        ran = outcome.blocks_ran,
        failures = outcome.failures.len(),
        "checked document"
    );

    DocumentReport {
        blocks: blocks.len(),
        blocks_ran: outcome.blocks_ran,
        assertions: host.counter().get(),
        failures: outcome.failures,
        findings: outcome.findings,
        advisories,
        document,
    }
}

/// Segment and rewrite without running anything.
pub fn extract(document: Document, config: &Config) -> (Extraction, Vec<Advisory>) {
    let host = host_for(&document, config);
    rewritten(document, &host, config.arrow_values)
}

fn host_for(document: &Document, config: &Config) -> Host {
    Host::new(&HostOptions {
        timeout: config.timeout(),
        module_dir: document.base_dir(),
    })
}

fn rewritten(
    document: Document,
    host: &Host,
    strategy: ValueStrategy,
) -> (Extraction, Vec<Advisory>) {
    let mut extraction = Extraction::new(document);
    let advisories = match strategy {
        ValueStrategy::Parse => {
            let values = ParseRetry::new(host.expressions());
            Rewriter::new(&values).rewrite_all(&mut extraction.blocks)
        }
        ValueStrategy::Heuristic => Rewriter::new(&Heuristic).rewrite_all(&mut extraction.blocks),
    };
    (extraction, advisories)
}
