/// Picks the value expression out of the text that follows `// =>`, which may
/// carry trailing commentary after a `;` or `:`.
pub trait ValueExtractor {
    fn extract<'t>(&self, fragment: &'t str) -> &'t str;
}

/// Checks whether a piece of text parses as a single expression.
pub trait ExpressionParser {
    /// `Err` carries the byte offset of the parse failure when it is known.
    fn check(&self, source: &str) -> Result<(), Option<usize>>;
}

/// Textual truncation: cut at the first `;`, otherwise at the first `:` unless
/// the value contains a `{`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Heuristic;

impl ValueExtractor for Heuristic {
    fn extract<'t>(&self, fragment: &'t str) -> &'t str {
        let value = fragment.trim();
        if let Some(at) = value.find(';') {
            return value[..at].trim_end();
        }
        if !value.contains('{') {
            if let Some(at) = value.find(':') {
                return value[..at].trim_end();
            }
        }
        value
    }
}

/// Parse the fragment as an expression and, while it fails, cut it back at
/// the last `:` or `;` at or before the failure point. Falls back to the
/// whole fragment once nothing is left to cut, so the compile error surfaces.
pub struct ParseRetry<P> {
    parser: P,
}

impl<P: ExpressionParser> ParseRetry<P> {
    pub fn new(parser: P) -> Self {
        ParseRetry { parser }
    }
}

impl<P: ExpressionParser> ValueExtractor for ParseRetry<P> {
    fn extract<'t>(&self, fragment: &'t str) -> &'t str {
        let whole = fragment.trim();
        let mut candidate = whole;

        loop {
            let failed_at = match self.parser.check(candidate) {
                Ok(()) => return candidate,
                Err(at) => at.unwrap_or(candidate.len()),
            };

            let cut = candidate
                .char_indices()
                .filter(|&(i, c)| i <= failed_at && (c == ':' || c == ';'))
                .map(|(i, _)| i)
                .last();

            match cut {
                Some(at) if !candidate[..at].trim().is_empty() => {
                    candidate = candidate[..at].trim_end();
                }
                _ => return whole,
            }
        }
    }
}
