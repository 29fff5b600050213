/// Block-level view of a converted document, ready for HTML rendering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentAst {
    pub blocks: Vec<BlockNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockNode {
    /// A paragraph or heading; `html` is its rendered inline content.
    Paragraph {
        kind: BlockKind,
        align: Option<Align>,
        html: String,
    },
    /// One numbered or bulleted paragraph. `level` is zero-based.
    ListItem {
        ordered: bool,
        level: usize,
        html: String,
    },
    TableHtml(String),
    RawHtml(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    /// Heading level, 1 to 6.
    Heading(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Center,
    Right,
}
