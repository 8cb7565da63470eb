//! Rewrites assertion comments inside sample code into calls on the `assert`
//! object injected into every execution environment.
//!
//! Three comment dialects are recognized, tried in this order:
//!
//! * arrow: `expr // => value` becomes `assert.equal(expr, value, "<line>");`
//! * named equality: `code // name == value; note` keeps `code` and appends
//!   `assert.equal(name, value, "<comment>");`
//! * throws: `expr // !note` becomes `assert.throws(|| { expr }, "<line>");`
//!
//! A rewrite always replaces exactly one line with exactly one line, so the
//! block keeps its line count and every line keeps its origin.

pub mod value;

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::block::{Block, Mode};

pub use value::{ExpressionParser, Heuristic, ParseRetry, ValueExtractor};

static ARROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<indent>\s*)(?P<expr>.*\S)\s*//\s*=>\s*(?P<value>.*?)\s*$").unwrap()
});
static NAMED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<code>.*?)(?P<comment>//\s*(?P<name>[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)\s*==\s*(?P<value>[^;]*[^;\s])\s*(?:;.*)?)$",
    )
    .unwrap()
});
static THROWS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<indent>\s*)(?P<expr>.*\S)\s*//\s*!(?P<note>.*)$").unwrap()
});

/// An assertion comment recognized on a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assertion<'a> {
    Arrow {
        indent: &'a str,
        expr: &'a str,
        value: &'a str,
    },
    Named {
        code: &'a str,
        name: &'a str,
        value: &'a str,
        comment: &'a str,
    },
    Throws {
        indent: &'a str,
        expr: &'a str,
    },
}

impl<'a> Assertion<'a> {
    /// Detect the first matching dialect on `line`.
    pub fn detect(line: &'a str) -> Option<Self> {
        if let Some(caps) = ARROW.captures(line) {
            let expr = caps.name("expr")?.as_str().trim_end();
            let expr = expr.strip_suffix(';').unwrap_or(expr).trim_end();
            let value = caps.name("value")?.as_str();
            if !expr.is_empty() && !value.is_empty() {
                return Some(Assertion::Arrow {
                    indent: caps.name("indent")?.as_str(),
                    expr,
                    value,
                });
            }
        }
        if let Some(caps) = NAMED.captures(line) {
            return Some(Assertion::Named {
                code: caps.name("code")?.as_str(),
                name: caps.name("name")?.as_str(),
                value: caps.name("value")?.as_str().trim(),
                comment: caps.name("comment")?.as_str(),
            });
        }
        if let Some(caps) = THROWS.captures(line) {
            let expr = caps.name("expr")?.as_str();
            return Some(Assertion::Throws {
                indent: caps.name("indent")?.as_str(),
                expr: expr.strip_suffix(';').unwrap_or(expr).trim_end(),
            });
        }
        None
    }

    /// Render the executable replacement for `line`, the text this assertion
    /// was detected on.
    pub fn render(&self, line: &str, values: &dyn ValueExtractor) -> String {
        match self {
            Assertion::Arrow {
                indent,
                expr,
                value,
            } => format!(
                "{}assert.equal({}, {}, \"{}\");",
                indent,
                expr,
                values.extract(value),
                escape(line)
            ),
            Assertion::Named {
                code,
                name,
                value,
                comment,
            } => {
                let kept = code.trim_end();
                let call = format!(
                    "assert.equal({}, {}, \"{}\");",
                    name,
                    value,
                    escape(comment)
                );
                // A trailing `}` may close a map literal or closure, so only
                // `;` and an opening brace count as already terminated.
                if kept.trim().is_empty() {
                    format!("{}{}", code, call)
                } else if kept.ends_with(|c: char| matches!(c, ';' | '{')) {
                    format!("{} {}", kept, call)
                } else {
                    format!("{}; {}", kept, call)
                }
            }
            Assertion::Throws { indent, expr } => format!(
                "{}assert.throws(|| {{ {} }}, \"{}\");",
                indent,
                expr,
                escape(line)
            ),
        }
    }
}

/// Escape `text` for use inside a double-quoted string literal.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

/// An assertion comment found in a block that is configured `off`. Reported,
/// never counted as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advisory {
    /// Expanded line index.
    pub line: usize,
    pub text: String,
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "assertion present in a block that will not run")
    }
}

/// Rewrites assertion comments in blocks.
pub struct Rewriter<'v> {
    values: &'v dyn ValueExtractor,
}

impl<'v> Rewriter<'v> {
    pub fn new(values: &'v dyn ValueExtractor) -> Self {
        Rewriter { values }
    }

    /// Rewrite a single line, or `None` if it carries no assertion comment.
    pub fn rewrite_line(&self, line: &str) -> Option<String> {
        Assertion::detect(line).map(|assertion| assertion.render(line, self.values))
    }

    /// Rewrite `block` in place. Blocks in `off` mode are left untouched and
    /// every assertion in them yields an advisory instead.
    pub fn rewrite_block(&self, block: &mut Block) -> Vec<Advisory> {
        let mut advisories = Vec::new();
        let off = block.mode == Mode::Off;

        for index in 0..block.code.len() {
            let line = &block.code[index];
            if off {
                if Assertion::detect(line).is_some() {
                    let advisory = Advisory {
                        line: block.line_of(index),
                        text: line.clone(),
                    };
                    tracing::warn!(line = advisory.line, text = %advisory.text, "{}", advisory);
                    advisories.push(advisory);
                }
                continue;
            }
            if let Some(rewritten) = self.rewrite_line(line) {
                block.code[index] = rewritten;
            }
        }

        advisories
    }

    pub fn rewrite_all(&self, blocks: &mut [Block]) -> Vec<Advisory> {
        blocks
            .iter_mut()
            .flat_map(|block| self.rewrite_block(block))
            .collect()
    }
}
