use rhai::{EvalAltResult, ParseError};

use doccheck::block::{Block, Mode, PrologLine};
use doccheck::source::Document;

use crate::assert;
use crate::environment::{Environment, EnvironmentManager};
use crate::error::{Failure, FailureKind};
use crate::host::Host;
use crate::lint::{LintConfig, LintFinding, Linter};

/// Call frames kept in a failure's context.
const MAX_FRAMES: usize = 3;

/// A lint finding resolved to an expanded document line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintWarning {
    pub line: usize,
    pub finding: LintFinding,
}

/// Result of running every block of a document.
#[derive(Debug, Default)]
pub struct Outcome {
    /// Blocks that compiled and ran to completion.
    pub blocks_ran: usize,
    pub failures: Vec<Failure>,
    pub findings: Vec<LintWarning>,
}

/// The part of a block being compiled or run; maps engine line numbers back
/// to expanded document lines.
#[derive(Clone, Copy)]
enum Segment<'b> {
    Prolog(&'b [PrologLine]),
    Code(&'b Block),
}

impl Segment<'_> {
    fn expanded(self, line: Option<usize>) -> usize {
        match self {
            Segment::Prolog(prolog) => line
                .and_then(|l| prolog.get(l.checked_sub(1)?))
                .or_else(|| prolog.first())
                .map_or(0, |p| p.line),
            Segment::Code(block) => match line {
                Some(l) if l >= 1 && !block.code.is_empty() => {
                    block.line_of((l - 1).min(block.code.len() - 1))
                }
                _ => block.start,
            },
        }
    }
}

/// Runs blocks in document order, each in the environment its mode selects.
/// A failing block never stops the blocks after it.
pub struct Executor<'a> {
    document: &'a Document,
    host: &'a Host,
    environments: EnvironmentManager,
    linter: Option<(&'a dyn Linter, &'a LintConfig)>,
    outcome: Outcome,
}

impl<'a> Executor<'a> {
    pub fn new(document: &'a Document, host: &'a Host) -> Self {
        Executor {
            document,
            host,
            environments: EnvironmentManager::new(host.counter().clone()),
            linter: None,
            outcome: Outcome::default(),
        }
    }

    pub fn with_linter(mut self, linter: &'a dyn Linter, config: &'a LintConfig) -> Self {
        self.linter = Some((linter, config));
        self
    }

    pub fn run(mut self, blocks: &[Block]) -> Outcome {
        for block in blocks {
            self.run_block(block);
        }
        self.outcome
    }

    fn run_block(&mut self, block: &Block) {
        tracing::debug!(start = block.start, mode = %block.mode, "block");

        let environment = match &block.mode {
            Mode::Off => return,
            Mode::Lint => {
                self.lint(block, Vec::new(), Vec::new());
                return;
            }
            mode => match self.environments.obtain(mode) {
                Some(environment) => environment,
                None => return,
            },
        };

        let (variables, modules): (Vec<String>, Vec<String>) = {
            let environment = environment.borrow();
            (
                environment.variables(),
                environment.modules().map(str::to_string).collect(),
            )
        };
        self.lint(block, variables, modules);

        let prolog = match block.prolog_source() {
            Some(source) => match self.host.compile(&source) {
                Ok(ast) => Some((source, ast)),
                Err(err) => {
                    self.compile_failure(&err, Segment::Prolog(&block.prolog));
                    return;
                }
            },
            None => None,
        };

        let source = block.source();
        let code = match self.host.compile(&source) {
            Ok(ast) => ast,
            Err(err) => {
                self.compile_failure(&err, Segment::Code(block));
                return;
            }
        };

        let mut environment = environment.borrow_mut();
        if let Some((prolog_source, prolog)) = prolog {
            let result = self.host.run(&mut environment, &prolog);
            keep_imports(&mut environment, &prolog_source, &result);
            if let Err(err) = result {
                self.run_failure(*err, Segment::Prolog(&block.prolog));
                return;
            }
        }
        let result = self.host.run(&mut environment, &code);
        keep_imports(&mut environment, &source, &result);
        if let Err(err) = result {
            self.run_failure(*err, Segment::Code(block));
            return;
        }

        self.outcome.blocks_ran += 1;
    }

    /// Lint the prolog followed by the code. `variables` and `modules` are
    /// names already bound in the block's environment.
    fn lint(&mut self, block: &Block, variables: Vec<String>, modules: Vec<String>) {
        let Some((linter, config)) = self.linter else {
            return;
        };
        let config = config.with_writable(variables).with_modules(modules);

        let mut text: Vec<&str> = block.prolog.iter().map(|p| p.text.as_str()).collect();
        text.extend(block.code.iter().map(String::as_str));

        let prolog_len = block.prolog.len();
        for finding in linter.lint(&text.join("\n"), &config) {
            let line = if finding.line <= prolog_len {
                Segment::Prolog(&block.prolog).expanded(Some(finding.line))
            } else {
                Segment::Code(block).expanded(Some(finding.line - prolog_len))
            };
            self.outcome.findings.push(LintWarning { line, finding });
        }
    }

    fn source_line(&self, line: usize) -> String {
        self.document.line(line).unwrap_or_default().to_string()
    }

    fn compile_failure(&mut self, err: &ParseError, segment: Segment<'_>) {
        let line = segment.expanded(err.position().line());
        self.outcome.failures.push(Failure {
            kind: FailureKind::Compile,
            message: err.err_type().to_string(),
            line,
            source_line: self.source_line(line),
            assertion: None,
            context: Vec::new(),
        });
    }

    fn run_failure(&mut self, err: EvalAltResult, segment: Segment<'_>) {
        let line = segment.expanded(err.position().line());
        let (mut innermost, context) = unwind(err);

        let assertion = assert::failure_of(&innermost);
        let message = match (&assertion, &innermost) {
            (Some(failure), _) => failure.to_string(),
            (None, EvalAltResult::ErrorTerminated(..)) => format!(
                "execution timed out after {} ms",
                self.host.timeout().as_millis()
            ),
            (None, _) => {
                innermost.clear_position();
                innermost.to_string()
            }
        };

        self.outcome.failures.push(Failure {
            kind: FailureKind::Run,
            message,
            line,
            source_line: self.source_line(line),
            assertion,
            context,
        });
    }
}

/// Record the imports of a segment that ran, unless resolving one of them is
/// what failed.
fn keep_imports(
    environment: &mut Environment,
    source: &str,
    result: &Result<(), Box<EvalAltResult>>,
) {
    if let Err(err) = result {
        if matches!(
            **err,
            EvalAltResult::ErrorModuleNotFound(..) | EvalAltResult::ErrorInModule(..)
        ) {
            return;
        }
    }
    environment.record_imports(source);
}

/// Strip the function-call wrappers off `err`, collecting one frame per
/// sample-defined function. Closures generated by assertion rewriting are
/// not frames of the sample and are skipped.
fn unwind(mut err: EvalAltResult) -> (EvalAltResult, Vec<String>) {
    let mut frames = Vec::new();
    loop {
        err = match err {
            EvalAltResult::ErrorInFunctionCall(name, _, inner, _) => {
                if !name.starts_with("anon$") && frames.len() < MAX_FRAMES {
                    frames.push(format!("in call to '{}'", name));
                }
                *inner
            }
            EvalAltResult::ErrorInModule(name, inner, _) => {
                if frames.len() < MAX_FRAMES {
                    frames.push(format!("in module '{}'", name));
                }
                *inner
            }
            other => return (other, frames),
        };
    }
}
