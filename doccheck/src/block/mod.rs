pub mod directive;

use std::fmt;

pub use directive::Directive;

/// How a block is treated when the document is checked.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Mode {
    /// Run in a brand-new environment that is discarded afterwards.
    #[default]
    Isolated,
    /// Never compiled, run, or linted.
    Off,
    /// Linted only.
    Lint,
    /// Run in the named environment shared with every other block of that name.
    Shared(String),
}

impl Mode {
    /// Interpret the value of a `// test:` directive. An empty value resets
    /// to [`Mode::Isolated`].
    pub fn from_token(token: &str) -> Self {
        match token.trim() {
            "" => Mode::Isolated,
            "off" => Mode::Off,
            "lint" => Mode::Lint,
            name => Mode::Shared(name.to_string()),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Isolated => write!(f, "isolated"),
            Mode::Off => write!(f, "off"),
            Mode::Lint => write!(f, "lint"),
            Mode::Shared(name) => write!(f, "shared:{}", name),
        }
    }
}

/// A line of setup code declared by a `// test>` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrologLine {
    pub text: String,
    /// Expanded line index of the directive that declared it.
    pub line: usize,
}

/// Directive state gathered between two blocks, consumed by the next opening fence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingConfig {
    mode: Option<Mode>,
    name: Option<String>,
    prolog: Vec<PrologLine>,
}

impl PendingConfig {
    pub fn apply(&mut self, directive: Directive, line: usize) {
        match directive {
            Directive::Mode(mode) => self.mode = Some(mode),
            Directive::Name(name) => self.name = name,
            Directive::Prolog(text) => self.prolog.push(PrologLine { text, line }),
        }
    }

    /// Resolve the accumulated directives into a block mode. `off` and `lint`
    /// win over a context name; a name wins over an isolated mode.
    pub fn resolve_mode(&self) -> Mode {
        match (&self.mode, &self.name) {
            (Some(Mode::Off), _) => Mode::Off,
            (Some(Mode::Lint), _) => Mode::Lint,
            (_, Some(name)) => Mode::Shared(name.clone()),
            (Some(mode), None) => mode.clone(),
            (None, None) => Mode::Isolated,
        }
    }

    /// Take the accumulated state, leaving this config empty.
    pub fn take(&mut self) -> (Mode, Vec<PrologLine>) {
        let mode = self.resolve_mode();
        let taken = std::mem::take(self);
        (mode, taken.prolog)
    }
}

/// A fenced region of sample code.
#[derive(Debug, Clone)]
pub struct Block {
    /// Code lines, rewritten in place by the assertion rewriter. The count
    /// never changes after segmentation.
    pub code: Vec<String>,
    /// Expanded line index of the first code line.
    pub start: usize,
    pub mode: Mode,
    pub prolog: Vec<PrologLine>,
}

impl Block {
    /// Expanded line index of code line `index`.
    pub fn line_of(&self, index: usize) -> usize {
        self.start + index
    }

    /// Expanded line index of the opening fence.
    pub fn fence_line(&self) -> usize {
        self.start.saturating_sub(1)
    }

    pub fn source(&self) -> String {
        self.code.join("\n")
    }

    pub fn prolog_source(&self) -> Option<String> {
        if self.prolog.is_empty() {
            return None;
        }
        Some(
            self.prolog
                .iter()
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }
}
