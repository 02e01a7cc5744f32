//! Flat node lists to parented forests and back. No I/O.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::domain::{NodeBranch, TreeNode};

/// Assembles a forest from nodes of one tree, in any order.
///
/// Roots keep their relative input order. A node whose parent id does not
/// resolve is an orphan and is dropped together with anything below it.
pub fn build(nodes: Vec<TreeNode>) -> Vec<NodeBranch> {
    let known_ids: HashSet<i64> = nodes.iter().filter_map(TreeNode::id).collect();
    let mut roots = Vec::new();
    let mut children_by_parent: HashMap<i64, Vec<TreeNode>> = HashMap::new();
    let mut orphaned = 0usize;

    for node in nodes {
        match node.parent_id() {
            None => roots.push(node),
            Some(parent_id) if known_ids.contains(&parent_id) => {
                children_by_parent.entry(parent_id).or_default().push(node);
            }
            Some(_) => orphaned += 1,
        }
    }

    let forest: Vec<NodeBranch> = roots
        .into_iter()
        .map(|root| attach(root, &mut children_by_parent))
        .collect();

    let unreachable: usize = children_by_parent.values().map(Vec::len).sum();
    if orphaned + unreachable > 0 {
        debug!(orphaned, unreachable, "dropped nodes without a reachable parent");
    }
    forest
}

type Frame = (NodeBranch, std::vec::IntoIter<TreeNode>);

fn open(node: TreeNode, children_by_parent: &mut HashMap<i64, Vec<TreeNode>>) -> Frame {
    let children = node
        .id()
        .and_then(|id| children_by_parent.remove(&id))
        .unwrap_or_default();
    (NodeBranch::new(node), children.into_iter())
}

/// Depth-first assembly with an explicit stack of open branches.
fn attach(root: TreeNode, children_by_parent: &mut HashMap<i64, Vec<TreeNode>>) -> NodeBranch {
    let (mut root_branch, mut root_pending) = open(root, children_by_parent);
    let mut stack: Vec<Frame> = Vec::new();
    loop {
        let pending = match stack.last_mut() {
            Some((_, pending)) => pending,
            None => &mut root_pending,
        };
        match pending.next() {
            Some(child) => stack.push(open(child, children_by_parent)),
            None => match stack.pop() {
                Some((finished, _)) => match stack.last_mut() {
                    Some((parent, _)) => parent.add_child(finished),
                    None => root_branch.add_child(finished),
                },
                None => return root_branch,
            },
        }
    }
}

/// Pre-order walk back to a flat list.
pub fn flatten(roots: &[NodeBranch]) -> Vec<TreeNode> {
    let mut out = Vec::new();
    let mut stack: Vec<&NodeBranch> = roots.iter().rev().collect();
    while let Some(branch) = stack.pop() {
        out.push(branch.node.clone());
        stack.extend(branch.children().iter().rev());
    }
    out
}

pub fn find_by_id(roots: &[NodeBranch], id: i64) -> Option<&NodeBranch> {
    let mut stack: Vec<&NodeBranch> = roots.iter().rev().collect();
    while let Some(branch) = stack.pop() {
        if branch.node.id() == Some(id) {
            return Some(branch);
        }
        stack.extend(branch.children().iter().rev());
    }
    None
}

/// Orders siblings by `sort_order` at every level. Ties keep input order.
pub fn sort(roots: &mut [NodeBranch]) {
    let mut levels: Vec<&mut [NodeBranch]> = vec![roots];
    while let Some(level) = levels.pop() {
        level.sort_by_key(|branch| branch.node.sort_order());
        for branch in level {
            levels.push(branch.children_mut().as_mut_slice());
        }
    }
}

pub fn count(roots: &[NodeBranch]) -> usize {
    let mut total = 0;
    let mut stack: Vec<&NodeBranch> = roots.iter().collect();
    while let Some(branch) = stack.pop() {
        total += 1;
        stack.extend(branch.children());
    }
    total
}

/// Number of levels in the forest; zero when empty.
pub fn depth(roots: &[NodeBranch]) -> usize {
    let mut deepest = 0;
    let mut stack: Vec<(usize, &NodeBranch)> = roots.iter().map(|branch| (1, branch)).collect();
    while let Some((level, branch)) = stack.pop() {
        deepest = deepest.max(level);
        stack.extend(branch.children().iter().map(|child| (level + 1, child)));
    }
    deepest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NodeKind;

    fn node(id: i64, parent: Option<i64>, sort_order: i64) -> TreeNode {
        TreeNode::from_parts(
            Some(id),
            1,
            parent,
            format!("n{id}"),
            sort_order,
            NodeKind::Simple,
        )
    }

    fn ids(nodes: &[TreeNode]) -> Vec<i64> {
        nodes.iter().filter_map(TreeNode::id).collect()
    }

    #[test]
    fn empty_input_builds_empty_forest() {
        assert!(build(Vec::new()).is_empty());
    }

    #[test]
    fn orphan_is_dropped_not_promoted() {
        let roots = build(vec![node(1, None, 0), node(2, Some(1), 0), node(3, Some(99), 0)]);
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].node.id(), Some(1));
        assert_eq!(roots[0].children().len(), 1);
        assert_eq!(roots[0].children()[0].node.id(), Some(2));
        assert!(find_by_id(&roots, 3).is_none());
    }

    #[test]
    fn single_unresolvable_node_yields_no_roots() {
        assert!(build(vec![node(5, Some(4), 0)]).is_empty());
    }

    #[test]
    fn children_may_precede_their_parent_in_input() {
        let roots = build(vec![node(3, Some(2), 0), node(2, Some(1), 0), node(1, None, 0)]);
        assert_eq!(depth(&roots), 3);
        assert_eq!(ids(&flatten(&roots)), vec![1, 2, 3]);
    }

    #[test]
    fn descendants_of_orphans_are_dropped_too() {
        let roots = build(vec![
            node(1, None, 0),
            node(10, Some(77), 0),
            node(11, Some(10), 0),
        ]);
        assert_eq!(ids(&flatten(&roots)), vec![1]);
    }

    #[test]
    fn cycles_without_a_root_are_unreachable() {
        let roots = build(vec![node(1, Some(2), 0), node(2, Some(1), 0), node(3, None, 0)]);
        assert_eq!(ids(&flatten(&roots)), vec![3]);
    }

    #[test]
    fn flatten_preserves_non_orphaned_identities() {
        let input = vec![
            node(1, None, 0),
            node(2, Some(1), 0),
            node(3, Some(1), 1),
            node(4, Some(3), 0),
            node(5, None, 1),
            node(6, Some(42), 0),
        ];
        let roots = build(input);
        let mut flat = ids(&flatten(&roots));
        flat.sort_unstable();
        assert_eq!(flat, vec![1, 2, 3, 4, 5]);
        assert_eq!(count(&roots), 5);
    }

    #[test]
    fn flatten_is_pre_order() {
        let roots = build(vec![
            node(1, None, 0),
            node(2, Some(1), 0),
            node(3, Some(2), 0),
            node(4, Some(1), 1),
            node(5, None, 1),
        ]);
        assert_eq!(ids(&flatten(&roots)), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn sort_orders_every_level() {
        let mut roots = build(vec![
            node(1, None, 2),
            node(2, None, 1),
            node(3, Some(2), 5),
            node(4, Some(2), 3),
        ]);
        sort(&mut roots);
        assert_eq!(roots[0].node.id(), Some(2));
        assert_eq!(roots[1].node.id(), Some(1));
        let children: Vec<_> = roots[0]
            .children()
            .iter()
            .filter_map(|branch| branch.node.id())
            .collect();
        assert_eq!(children, vec![4, 3]);
    }

    #[test]
    fn long_parent_chain_builds_without_recursion() {
        const LEN: i64 = 50_000;
        let chain: Vec<TreeNode> = (1..=LEN)
            .rev()
            .map(|id| node(id, (id > 1).then_some(id - 1), 0))
            .collect();
        let mut roots = build(chain);
        sort(&mut roots);

        assert_eq!(roots.len(), 1);
        assert_eq!(depth(&roots), LEN as usize);
        assert_eq!(count(&roots), LEN as usize);
        assert_eq!(ids(&flatten(&roots)), (1..=LEN).collect::<Vec<_>>());
        let deepest = find_by_id(&roots, LEN).expect("last link should be found");
        assert_eq!(deepest.node.parent_id(), Some(LEN - 1));
    }

    #[test]
    fn find_by_id_searches_depth_first() {
        let roots = build(vec![node(1, None, 0), node(2, Some(1), 0), node(3, Some(2), 0)]);
        let found = find_by_id(&roots, 3).expect("deep node should be found");
        assert_eq!(found.node.parent_id(), Some(2));
        assert!(find_by_id(&roots, 8).is_none());
    }
}
