use crate::domain::{NodeBranch, NodeVisitor, TreeNode};

/// One-line plain text label per node.
#[derive(Debug, Default)]
pub struct OutlineRenderer;

impl NodeVisitor for OutlineRenderer {
    fn visit_simple(&mut self, node: &TreeNode) -> String {
        format!("{}{}", node.name(), id_suffix(node))
    }

    fn visit_button(&mut self, node: &TreeNode, button_text: &str, button_action: &str) -> String {
        format!(
            "{} [{} -> {}]{}",
            node.name(),
            button_text,
            button_action,
            id_suffix(node)
        )
    }
}

fn id_suffix(node: &TreeNode) -> String {
    node.id().map(|id| format!(" #{id}")).unwrap_or_default()
}

/// Indented lines for a forest, pre-order, two spaces per level.
pub fn outline(roots: &[NodeBranch], visitor: &mut dyn NodeVisitor) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut stack: Vec<(usize, &NodeBranch)> = roots.iter().rev().map(|b| (0, b)).collect();
    while let Some((depth, branch)) = stack.pop() {
        lines.push((depth, branch.node.accept(visitor)));
        stack.extend(branch.children().iter().rev().map(|child| (depth + 1, child)));
    }
    lines
}

pub fn outline_text(roots: &[NodeBranch]) -> String {
    outline(roots, &mut OutlineRenderer)
        .into_iter()
        .map(|(depth, label)| format!("{}{}", "  ".repeat(depth), label))
        .collect::<Vec<_>>()
        .join("\n")
}
