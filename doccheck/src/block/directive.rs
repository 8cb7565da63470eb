use std::sync::LazyLock;

use regex::Regex;

use crate::block::Mode;

static MODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^//\s*test(?:code)?:(?P<value>.*)$").unwrap());
static NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^//\s*test=(?P<value>.*)$").unwrap());
static PROLOG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^//\s*test>(?P<code>.*)$").unwrap());

/// A configuration comment found between blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// `// test:<value>` or the legacy `// testcode:<value>`.
    Mode(Mode),
    /// `// test=<name>`; an empty name clears it.
    Name(Option<String>),
    /// `// test><code>`.
    Prolog(String),
}

impl Directive {
    /// Recognize a directive. Directives must start at column 0.
    pub fn parse(line: &str) -> Option<Self> {
        if let Some(caps) = MODE.captures(line) {
            return Some(Directive::Mode(Mode::from_token(&caps["value"])));
        }
        if let Some(caps) = NAME.captures(line) {
            let name = caps["value"].trim();
            return Some(Directive::Name(
                (!name.is_empty()).then(|| name.to_string()),
            ));
        }
        if let Some(caps) = PROLOG.captures(line) {
            return Some(Directive::Prolog(caps["code"].trim().to_string()));
        }
        None
    }
}
