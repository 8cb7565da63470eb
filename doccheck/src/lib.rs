pub mod block;
pub mod parser;
pub mod rewrite;
pub mod source;

use crate::block::Block;
use crate::source::Document;

/// A loaded document together with its segmented code blocks.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// The include-expanded document the blocks were cut from.
    pub document: Document,
    /// Code blocks in document order.
    pub blocks: Vec<Block>,
}

impl Extraction {
    /// Segment an already-loaded document.
    pub fn new(document: Document) -> Self {
        let blocks = parser::Segmenter::new(&document).segment();
        Extraction { document, blocks }
    }
}
