//! Module hierarchy planning.
//!
//! Everything here is pure: handlers load an author's modules as flat [`ModuleNode`]s,
//! ask this module for the new layout, and hand the changed rows to the repository for
//! a single transactional write.

use std::collections::{HashMap, HashSet};

use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Module, ModuleTree};

/// The slice of a `modules` row the layout pass needs.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ModuleNode {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub sort_order: i32,
    pub module_number: String,
    pub title: String,
}

/// The persisted position of one module after a layout pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleLayout {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub sort_order: i32,
    pub module_number: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("module {0} does not exist")]
    UnknownModule(Uuid),
    #[error("module {0} cannot be placed beneath itself or one of its descendants")]
    Cycle(Uuid),
    #[error("ordered_ids must list exactly the current children, each once")]
    ReorderMismatch,
    #[error("module {0} appears more than once")]
    DuplicateId(Uuid),
}

/// Anything with a position in a module forest.
trait TreeItem {
    fn id(&self) -> Uuid;
    fn parent_id(&self) -> Option<Uuid>;
    fn sort_order(&self) -> i32;
    fn title(&self) -> &str;
}

impl TreeItem for ModuleNode {
    fn id(&self) -> Uuid {
        self.id
    }
    fn parent_id(&self) -> Option<Uuid> {
        self.parent_id
    }
    fn sort_order(&self) -> i32 {
        self.sort_order
    }
    fn title(&self) -> &str {
        &self.title
    }
}

impl TreeItem for Module {
    fn id(&self) -> Uuid {
        self.id
    }
    fn parent_id(&self) -> Option<Uuid> {
        self.parent_module_id
    }
    fn sort_order(&self) -> i32 {
        self.sort_order
    }
    fn title(&self) -> &str {
        &self.title
    }
}

/// Sibling groups of a forest, each sorted by (sort_order, title, id).
///
/// A node whose parent is absent from the set is a root.
struct SiblingIndex<'a, T> {
    roots: Vec<&'a T>,
    children: HashMap<Uuid, Vec<&'a T>>,
}

impl<'a, T: TreeItem> SiblingIndex<'a, T> {
    fn new(items: &'a [T]) -> Self {
        let ids: HashSet<Uuid> = items.iter().map(TreeItem::id).collect();
        let mut roots = Vec::new();
        let mut children: HashMap<Uuid, Vec<&'a T>> = HashMap::new();

        for item in items {
            match item.parent_id() {
                Some(parent) if ids.contains(&parent) => {
                    children.entry(parent).or_default().push(item)
                }
                _ => roots.push(item),
            }
        }

        sort_group(&mut roots);
        for group in children.values_mut() {
            sort_group(group);
        }

        Self { roots, children }
    }

    fn group(&self, parent: Option<Uuid>) -> &[&'a T] {
        match parent {
            None => &self.roots,
            Some(id) => self.children.get(&id).map(Vec::as_slice).unwrap_or(&[]),
        }
    }
}

fn sort_group<T: TreeItem>(group: &mut [&T]) {
    group.sort_by(|a, b| {
        a.sort_order()
            .cmp(&b.sort_order())
            .then_with(|| a.title().cmp(b.title()))
            .then_with(|| a.id().cmp(&b.id()))
    });
}

/// renumber
///
/// Walks the forest once and assigns every node a contiguous `sort_order` (0..n-1 per
/// sibling group) and a dotted `module_number`. Nodes caught in a parent cycle are
/// unreachable from any root; they are detached and numbered as extra roots.
pub fn renumber(nodes: &[ModuleNode]) -> Vec<ModuleLayout> {
    let index = SiblingIndex::new(nodes);
    let mut visited = HashSet::with_capacity(nodes.len());
    let mut layout = Vec::with_capacity(nodes.len());

    let mut next_root = number_group(&index, index.group(None), "", 0, &mut visited, &mut layout);

    let mut stranded: Vec<&ModuleNode> = nodes.iter().filter(|n| !visited.contains(&n.id)).collect();
    sort_group(&mut stranded);
    for node in stranded {
        if visited.contains(&node.id) {
            continue;
        }
        let start = layout.len();
        next_root = number_group(&index, &[node], "", next_root, &mut visited, &mut layout);
        layout[start].parent_id = None;
    }

    layout
}

fn number_group(
    index: &SiblingIndex<'_, ModuleNode>,
    group: &[&ModuleNode],
    prefix: &str,
    first: usize,
    visited: &mut HashSet<Uuid>,
    layout: &mut Vec<ModuleLayout>,
) -> usize {
    let mut position = first;
    for node in group {
        if !visited.insert(node.id) {
            continue;
        }
        let number = if prefix.is_empty() {
            (position + 1).to_string()
        } else {
            format!("{}.{}", prefix, position + 1)
        };
        layout.push(ModuleLayout {
            id: node.id,
            parent_id: node.parent_id,
            sort_order: position as i32,
            module_number: number.clone(),
        });
        position += 1;

        let children = index.group(Some(node.id));
        if !children.is_empty() {
            number_group(index, children, &number, 0, visited, layout);
        }
    }
    position
}

/// changed_layouts
///
/// Filters a layout down to the rows whose parent, sort order or number differ from
/// `before`, so the repository only rewrites what moved.
pub fn changed_layouts(before: &[ModuleNode], layout: Vec<ModuleLayout>) -> Vec<ModuleLayout> {
    let previous: HashMap<Uuid, &ModuleNode> = before.iter().map(|n| (n.id, n)).collect();
    layout
        .into_iter()
        .filter(|l| match previous.get(&l.id) {
            Some(node) => {
                node.parent_id != l.parent_id
                    || node.sort_order != l.sort_order
                    || node.module_number != l.module_number
            }
            None => true,
        })
        .collect()
}

/// reorder
///
/// Applies a client-supplied order to the children of `parent`. `ordered_ids` must be a
/// permutation of the current children.
pub fn reorder(
    nodes: &[ModuleNode],
    parent: Option<Uuid>,
    ordered_ids: &[Uuid],
) -> Result<Vec<ModuleNode>, TreeError> {
    let known: HashSet<Uuid> = nodes.iter().map(|n| n.id).collect();
    if let Some(parent) = parent {
        if !known.contains(&parent) {
            return Err(TreeError::UnknownModule(parent));
        }
    }

    let index = SiblingIndex::new(nodes);
    let current: HashSet<Uuid> = index.group(parent).iter().map(|n| n.id).collect();

    let mut seen = HashSet::with_capacity(ordered_ids.len());
    for id in ordered_ids {
        if !seen.insert(*id) {
            return Err(TreeError::DuplicateId(*id));
        }
        if !known.contains(id) {
            return Err(TreeError::UnknownModule(*id));
        }
        if !current.contains(id) {
            return Err(TreeError::ReorderMismatch);
        }
    }
    if seen.len() != current.len() {
        return Err(TreeError::ReorderMismatch);
    }

    let positions: HashMap<Uuid, i32> = ordered_ids
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, i as i32))
        .collect();

    Ok(nodes
        .iter()
        .cloned()
        .map(|mut node| {
            if let Some(position) = positions.get(&node.id) {
                node.sort_order = *position;
            }
            node
        })
        .collect())
}

/// move_node
///
/// Re-parents `id` under `new_parent` at `position` among its new siblings (clamped,
/// default last). Old siblings are left with a gap that [`renumber`] closes.
pub fn move_node(
    nodes: &[ModuleNode],
    id: Uuid,
    new_parent: Option<Uuid>,
    position: Option<usize>,
) -> Result<Vec<ModuleNode>, TreeError> {
    if !nodes.iter().any(|n| n.id == id) {
        return Err(TreeError::UnknownModule(id));
    }
    if let Some(parent) = new_parent {
        if !nodes.iter().any(|n| n.id == parent) {
            return Err(TreeError::UnknownModule(parent));
        }
        if parent == id || descendants(nodes, id).contains(&parent) {
            return Err(TreeError::Cycle(id));
        }
    }

    let index = SiblingIndex::new(nodes);
    let mut siblings: Vec<Uuid> = index
        .group(new_parent)
        .iter()
        .map(|n| n.id)
        .filter(|sibling| *sibling != id)
        .collect();
    let slot = position.unwrap_or(siblings.len()).min(siblings.len());
    siblings.insert(slot, id);

    let positions: HashMap<Uuid, i32> = siblings
        .iter()
        .enumerate()
        .map(|(i, sibling)| (*sibling, i as i32))
        .collect();

    Ok(nodes
        .iter()
        .cloned()
        .map(|mut node| {
            if node.id == id {
                node.parent_id = new_parent;
            }
            if let Some(position) = positions.get(&node.id) {
                node.sort_order = *position;
            }
            node
        })
        .collect())
}

/// descendants
///
/// Every module below `id`, breadth first. `id` itself is not included.
pub fn descendants(nodes: &[ModuleNode], id: Uuid) -> Vec<Uuid> {
    let index = SiblingIndex::new(nodes);
    let mut found = Vec::new();
    let mut seen = HashSet::from([id]);
    let mut frontier = vec![id];

    while let Some(current) = frontier.pop() {
        for child in index.group(Some(current)) {
            if seen.insert(child.id) {
                found.push(child.id);
                frontier.push(child.id);
            }
        }
    }
    found
}

/// build_forest
///
/// Nests a flat module list for tables of contents. Modules whose parent is not in the
/// list (for example an unpublished parent) surface as roots.
pub fn build_forest(modules: &[Module]) -> Vec<ModuleTree> {
    let index = SiblingIndex::new(modules);
    let mut visited = HashSet::with_capacity(modules.len());
    nest(&index, index.group(None), &mut visited)
}

fn nest(
    index: &SiblingIndex<'_, Module>,
    group: &[&Module],
    visited: &mut HashSet<Uuid>,
) -> Vec<ModuleTree> {
    let mut trees = Vec::with_capacity(group.len());
    for module in group {
        if !visited.insert(module.id) {
            continue;
        }
        trees.push(ModuleTree {
            id: module.id,
            title: module.title.clone(),
            slug: module.slug.clone(),
            module_number: module.module_number.clone(),
            status: module.status,
            sort_order: module.sort_order,
            children: nest(index, index.group(Some(module.id)), visited),
        });
    }
    trees
}
