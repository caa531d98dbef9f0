//! Renderable fragments.
//!
//! A [`Block`] is the unit of output a slot function produces. The slot core
//! does not render blocks; it only needs a representation that can carry a
//! branch key, so that conditional branches sharing a slot name are treated
//! as distinct fragments by the diffing layer downstream.

/// A renderable fragment with an optional branch key.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    node: BlockNode,
    key: Option<String>,
}

/// The content of a block.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum BlockNode {
    /// Nothing to render. An empty block is never stamped with a branch key.
    #[default]
    Empty,
    /// A run of text.
    Text(String),
    /// An ordered group of child blocks.
    Fragment(Vec<Block>),
}

impl Block {
    /// The empty fragment.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A text fragment.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            node: BlockNode::Text(text.into()),
            key: None,
        }
    }

    /// A fragment grouping the given children.
    pub fn fragment(children: Vec<Block>) -> Self {
        Self {
            node: BlockNode::Fragment(children),
            key: None,
        }
    }

    /// Whether this block renders nothing.
    pub fn is_empty(&self) -> bool {
        matches!(self.node, BlockNode::Empty)
    }

    /// The block's content.
    pub fn node(&self) -> &BlockNode {
        &self.node
    }

    /// The branch key, if one was stamped.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Stamp a branch key onto this block.
    pub fn set_key(&mut self, key: impl Into<String>) {
        self.key = Some(key.into());
    }

    /// Builder form of [`set_key`](Self::set_key).
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.set_key(key);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_block_has_no_key() {
        let block = Block::empty();
        assert!(block.is_empty());
        assert!(block.key().is_none());
    }

    #[test]
    fn key_stamping() {
        let block = Block::text("hi").with_key("branch-a");
        assert_eq!(block.key(), Some("branch-a"));
        assert_eq!(block.node(), &BlockNode::Text("hi".into()));
    }

    #[test]
    fn fragment_groups_children() {
        let block = Block::fragment(vec![Block::text("a"), Block::text("b")]);
        match block.node() {
            BlockNode::Fragment(children) => assert_eq!(children.len(), 2),
            other => panic!("expected fragment, got {other:?}"),
        }
    }
}
