use std::sync::LazyLock;

use regex::Regex;

use crate::block::{Block, Directive, PendingConfig};
use crate::source::Document;

static FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-{4,}").unwrap());

pub fn is_fence(line: &str) -> bool {
    FENCE.is_match(line)
}

enum State {
    Outside,
    Inside(Block),
}

/// Splits a document into code blocks, applying the directives found between
/// them to the block that follows.
pub struct Segmenter<'a> {
    document: &'a Document,
    state: State,
    pending: PendingConfig,
    blocks: Vec<Block>,
}

impl<'a> Segmenter<'a> {
    pub fn new(document: &'a Document) -> Self {
        Segmenter {
            document,
            state: State::Outside,
            pending: PendingConfig::default(),
            blocks: Vec::new(),
        }
    }

    pub fn segment(mut self) -> Vec<Block> {
        let document = self.document;
        for (index, line) in document.lines.iter().enumerate() {
            self.state = match std::mem::replace(&mut self.state, State::Outside) {
                State::Outside if is_fence(line) => {
                    let (mode, prolog) = self.pending.take();
                    State::Inside(Block {
                        code: Vec::new(),
                        start: index + 1,
                        mode,
                        prolog,
                    })
                }
                State::Outside => {
                    if let Some(directive) = Directive::parse(line) {
                        self.pending.apply(directive, index);
                    }
                    State::Outside
                }
                State::Inside(block) if is_fence(line) => {
                    tracing::debug!(start = block.start, mode = %block.mode, "closed block");
                    self.blocks.push(block);
                    State::Outside
                }
                State::Inside(mut block) => {
                    block.code.push(line.clone());
                    State::Inside(block)
                }
            };
        }

        if let State::Inside(block) = self.state {
            tracing::warn!(start = block.start, "dropping unterminated block");
        }

        self.blocks
    }
}
