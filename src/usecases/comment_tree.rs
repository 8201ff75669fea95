use std::collections::{HashMap, VecDeque};

use uuid::Uuid;

use crate::models::comments::{Comment, CommentNode};

/// Indentation stops growing past this depth; replies below it still render.
pub const DEFAULT_DEPTH_CAP: usize = 5;

/// Builds the reply forest with the default display cap.
pub fn build_tree(comments: &[Comment]) -> Vec<CommentNode> {
    build_tree_with_cap(comments, DEFAULT_DEPTH_CAP)
}

/// Nests comments under their parents, keeping input order for roots and
/// for every reply list. Duplicate ids keep their first occurrence. A
/// comment whose parent is absent from the input becomes a root. Each parent
/// cycle gets one member promoted to root, found by climbing parents from the
/// earliest comment left unplaced, so every distinct id appears exactly once.
pub fn build_tree_with_cap(comments: &[Comment], depth_cap: usize) -> Vec<CommentNode> {
    let mut index: HashMap<Uuid, usize> = HashMap::with_capacity(comments.len());
    let mut unique: Vec<&Comment> = Vec::with_capacity(comments.len());
    for comment in comments {
        if !index.contains_key(&comment.id) {
            index.insert(comment.id, unique.len());
            unique.push(comment);
        }
    }

    let count = unique.len();
    let mut parent_of: Vec<Option<usize>> = unique
        .iter()
        .enumerate()
        .map(|(position, comment)| {
            comment
                .parent_id
                .and_then(|parent_id| index.get(&parent_id).copied())
                .filter(|parent| *parent != position)
        })
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut roots = Vec::new();
    for (position, parent) in parent_of.iter().enumerate() {
        match parent {
            Some(parent) => children[*parent].push(position),
            None => roots.push(position),
        }
    }

    let mut depth = vec![0usize; count];
    let mut visited = vec![false; count];
    let mut order = Vec::with_capacity(count);

    for &root in &roots {
        walk(root, &children, &parent_of, &mut depth, &mut visited, &mut order);
    }

    // Anything unreached hangs off a parent cycle. Climb to a cycle member
    // and promote it so its descendants keep their nesting.
    let mut climbed_from: Vec<Option<usize>> = vec![None; count];
    for position in 0..count {
        if visited[position] {
            continue;
        }
        let member = cycle_member(position, &parent_of, &mut climbed_from);
        parent_of[member] = None;
        depth[member] = 0;
        roots.push(member);
        walk(member, &children, &parent_of, &mut depth, &mut visited, &mut order);
    }
    roots.sort_unstable();

    let mut built: Vec<Option<CommentNode>> = vec![None; count];
    for &position in order.iter().rev() {
        let replies = children[position]
            .iter()
            .filter(|child| parent_of[**child] == Some(position))
            .filter_map(|child| built[*child].take())
            .collect();
        built[position] = Some(CommentNode {
            comment: unique[position].clone(),
            depth: depth[position],
            indent: depth[position].min(depth_cap),
            replies,
        });
    }

    roots
        .into_iter()
        .filter_map(|root| built[root].take())
        .collect()
}

fn walk(
    root: usize,
    children: &[Vec<usize>],
    parent_of: &[Option<usize>],
    depth: &mut [usize],
    visited: &mut [bool],
    order: &mut Vec<usize>,
) {
    let mut queue = VecDeque::from([root]);
    visited[root] = true;
    while let Some(current) = queue.pop_front() {
        order.push(current);
        for &child in &children[current] {
            if visited[child] || parent_of[child] != Some(current) {
                continue;
            }
            visited[child] = true;
            depth[child] = depth[current] + 1;
            queue.push_back(child);
        }
    }
}

/// First position revisited while following parents up from `start`.
fn cycle_member(
    start: usize,
    parent_of: &[Option<usize>],
    climbed_from: &mut [Option<usize>],
) -> usize {
    let mut current = start;
    loop {
        if climbed_from[current] == Some(start) {
            return current;
        }
        climbed_from[current] = Some(start);
        match parent_of[current] {
            Some(parent) => current = parent,
            None => return current,
        }
    }
}

/// Total number of comments in a forest.
pub fn count_nodes(forest: &[CommentNode]) -> usize {
    forest.iter().map(CommentNode::len).sum()
}
