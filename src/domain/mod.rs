pub mod node;
pub mod tree;

pub use node::{NodeBranch, NodeKind, NodeVisitor, TreeNode};
pub use tree::Tree;

/// Borrowed view over any persisted entity family, used where a mapper must
/// reject values that belong to a different family.
#[derive(Debug, Clone, Copy)]
pub enum EntityRef<'a> {
    Tree(&'a Tree),
    Node(&'a TreeNode),
}

impl EntityRef<'_> {
    pub fn family(&self) -> &'static str {
        match self {
            EntityRef::Tree(_) => "Tree",
            EntityRef::Node(_) => "TreeNode",
        }
    }
}

impl<'a> From<&'a Tree> for EntityRef<'a> {
    fn from(value: &'a Tree) -> Self {
        EntityRef::Tree(value)
    }
}

impl<'a> From<&'a TreeNode> for EntityRef<'a> {
    fn from(value: &'a TreeNode) -> Self {
        EntityRef::Node(value)
    }
}
