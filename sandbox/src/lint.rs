use std::collections::BTreeSet;

use rhai::{Engine, ParseError, ParseErrorType, Scope};

/// One finding reported by a linter, positioned in the linted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintFinding {
    /// 1-based line within the linted text.
    pub line: usize,
    /// 1-based column, 0 when unknown.
    pub column: usize,
    pub message: String,
    pub rule: String,
}

/// Names the linted code may reference without defining them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LintConfig {
    pub readonly: BTreeSet<String>,
    pub writable: BTreeSet<String>,
    /// Module aliases imported by earlier code in the same environment.
    pub modules: BTreeSet<String>,
}

impl LintConfig {
    pub fn with_writable(&self, names: impl IntoIterator<Item = String>) -> Self {
        let mut config = self.clone();
        for name in names {
            if !config.readonly.contains(&name) {
                config.writable.insert(name);
            }
        }
        config
    }

    pub fn with_modules(mut self, aliases: impl IntoIterator<Item = String>) -> Self {
        self.modules.extend(aliases);
        self
    }
}

/// Static analysis of one piece of sample code.
pub trait Linter {
    fn lint(&self, code: &str, config: &LintConfig) -> Vec<LintFinding>;
}

/// Compiles with strict variables, so any reference to a name that is neither
/// declared in the code nor listed in the config is reported.
pub struct StrictLinter {
    engine: Engine,
}

impl StrictLinter {
    pub fn new() -> Self {
        let mut engine = Engine::new();
        engine.set_strict_variables(true);
        StrictLinter { engine }
    }
}

impl Default for StrictLinter {
    fn default() -> Self {
        Self::new()
    }
}

impl Linter for StrictLinter {
    fn lint(&self, code: &str, config: &LintConfig) -> Vec<LintFinding> {
        let mut scope = Scope::new();
        for name in &config.readonly {
            scope.push_constant(name.as_str(), ());
        }
        for name in &config.writable {
            scope.push(name.as_str(), ());
        }

        if config.modules.is_empty() {
            return match self.engine.compile_with_scope(&scope, code) {
                Ok(_) => Vec::new(),
                Err(err) => vec![finding(&err)],
            };
        }

        // Known modules are declared on one extra leading line.
        let header: Vec<String> = config
            .modules
            .iter()
            .map(|alias| format!("import \"{}\" as {};", alias, alias))
            .collect();
        let text = format!("{}\n{}", header.join(" "), code);
        match self.engine.compile_with_scope(&scope, &text) {
            Ok(_) => Vec::new(),
            Err(err) => {
                let mut finding = finding(&err);
                finding.line = finding.line.saturating_sub(1).max(1);
                vec![finding]
            }
        }
    }
}

fn finding(err: &ParseError) -> LintFinding {
    let rule = match err.err_type() {
        ParseErrorType::VariableUndefined(_) => "undefined-variable",
        ParseErrorType::AssignmentToConstant(_) => "readonly-assignment",
        _ => "syntax",
    };
    let pos = err.position();
    LintFinding {
        line: pos.line().unwrap_or(1),
        column: pos.position().unwrap_or(0),
        message: err.err_type().to_string(),
        rule: rule.to_string(),
    }
}
