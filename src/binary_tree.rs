//! Unbalanced binary tree substrate.
//!
//! A [`BinaryTree`] owns its nodes through `Option<Box<Node<T>>>` links and
//! places nothing on its own: callers say where a payload goes by naming a
//! target node with a path of [`Side`]s from the root, or `None` for the root
//! slot itself. Removal, destroy and drop walk the tree with an explicit stack,
//! so a degenerate chain built through this API cannot exhaust the call stack.

use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::config::TreeConfig;
use crate::diagnostics::{diag, DiagnosticSink, Level, Subsystem, TracingSink};

const SUBSYSTEM: Subsystem = Subsystem::BinaryTree;

/// Callback that takes ownership of a payload when its node is removed or the
/// payload is overwritten.
pub type DestroyFn<T> = Rc<dyn Fn(T)>;

pub(crate) type Link<T> = Option<Box<Node<T>>>;

/// Which child of a node an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

/// Errors triggered by structural insertion.
///
/// Every variant hands the rejected payload back to the caller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BinaryTreeError<T> {
    /// A root insert was requested on a tree that already has nodes.
    #[error("cannot insert at the root of a non-empty tree")]
    InvalidState(T),
    /// The target node already has a child on the requested side.
    #[error("target child slot is already occupied")]
    SlotOccupied(T),
    /// The path does not lead to an existing node.
    #[error("no node at the end of the target path")]
    UnreachableNode(T),
    /// The tree's node budget does not allow another node.
    #[error("node budget of {limit} exhausted")]
    AllocationFailure { limit: usize, payload: T },
}

impl<T> BinaryTreeError<T> {
    /// Recovers the payload that could not be inserted.
    pub fn into_payload(self) -> T {
        match self {
            BinaryTreeError::InvalidState(payload)
            | BinaryTreeError::SlotOccupied(payload)
            | BinaryTreeError::UnreachableNode(payload)
            | BinaryTreeError::AllocationFailure { payload, .. } => payload,
        }
    }
}

pub struct Node<T> {
    pub(crate) payload: T,
    pub(crate) left: Link<T>,
    pub(crate) right: Link<T>,
}

impl<T> Node<T> {
    pub(crate) fn new(payload: T) -> Self {
        Node {
            payload,
            left: None,
            right: None,
        }
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    pub fn left(&self) -> Option<&Node<T>> {
        self.left.as_deref()
    }

    pub fn right(&self) -> Option<&Node<T>> {
        self.right.as_deref()
    }

    pub fn child(&self, side: Side) -> Option<&Node<T>> {
        match side {
            Side::Left => self.left(),
            Side::Right => self.right(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    pub(crate) fn child_mut(&mut self, side: Side) -> &mut Link<T> {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

pub struct BinaryTree<T> {
    root: Link<T>,
    size: usize,
    destroy: Option<DestroyFn<T>>,
    config: TreeConfig,
    sink: Rc<dyn DiagnosticSink>,
}

impl<T> BinaryTree<T> {
    pub fn new() -> Self {
        let tree = BinaryTree {
            root: None,
            size: 0,
            destroy: None,
            config: TreeConfig::default(),
            sink: Rc::new(TracingSink),
        };
        diag!(tree.sink, SUBSYSTEM, Level::TRACE, "binary tree initialised");
        tree
    }

    /// Creates an empty tree whose payloads are handed to `destroy` when
    /// their nodes are removed.
    pub fn with_destroy(destroy: impl Fn(T) + 'static) -> Self {
        let mut tree = Self::new();
        tree.destroy = Some(Rc::new(destroy));
        tree
    }

    pub(crate) fn with_destroy_fn(mut self, destroy: Option<DestroyFn<T>>) -> Self {
        self.destroy = destroy;
        self
    }

    pub fn with_config(mut self, config: TreeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_sink(mut self, sink: Rc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn root(&self) -> Option<&Node<T>> {
        self.root.as_deref()
    }

    /// Follows `path` from the root. The empty path names the root itself.
    pub fn node(&self, path: &[Side]) -> Option<&Node<T>> {
        let mut node = self.root.as_deref()?;
        for &side in path {
            node = node.child(side)?;
        }
        Some(node)
    }

    /// Installs `data` as the left child of the node at `at`, or as the root
    /// when `at` is `None`.
    pub fn insert_left(&mut self, at: Option<&[Side]>, data: T) -> Result<(), BinaryTreeError<T>> {
        self.insert_child(at, Side::Left, data)
    }

    /// Installs `data` as the right child of the node at `at`, or as the root
    /// when `at` is `None`.
    pub fn insert_right(&mut self, at: Option<&[Side]>, data: T) -> Result<(), BinaryTreeError<T>> {
        self.insert_child(at, Side::Right, data)
    }

    pub fn remove_left(&mut self, at: Option<&[Side]>) -> usize {
        self.remove_subtree(at, Side::Left)
    }

    pub fn remove_right(&mut self, at: Option<&[Side]>) -> usize {
        self.remove_subtree(at, Side::Right)
    }

    /// Removes the `side` subtree of the node at `at` in post-order, handing
    /// each payload to the destructor. With `at == None` the whole tree goes.
    /// Returns the number of nodes removed; an empty slot or a path that leads
    /// nowhere removes nothing.
    pub fn remove_subtree(&mut self, at: Option<&[Side]>, side: Side) -> usize {
        let detached = match at {
            None => self.root.take(),
            Some(path) => match Self::locate(&mut self.root, path) {
                Some(node) => node.child_mut(side).take(),
                None => {
                    diag!(self.sink, SUBSYSTEM, Level::WARN, "remove: no node at path {:?}", path);
                    return 0;
                }
            },
        };
        let removed = self.reap(detached);
        diag!(self.sink, SUBSYSTEM, Level::TRACE, "removed {} {} node(s)", removed, side);
        removed
    }

    /// Removes every node, invoking the destructor once per payload.
    pub fn clear(&mut self) {
        let root = self.root.take();
        self.reap(root);
    }

    /// Builds a new tree rooted at `data` whose left and right subtrees are
    /// the former contents of `left` and `right`.
    ///
    /// Both inputs are left empty. The merged tree inherits `left`'s
    /// destructor, configuration and sink. When the node budget refuses the
    /// new root, neither input is touched and `data` is returned in the error.
    pub fn merge(left: &mut Self, right: &mut Self, data: T) -> Result<Self, BinaryTreeError<T>> {
        let adopted = left.size.saturating_add(right.size);
        if let Some(limit) = left.config.exceeded_by(adopted, 1) {
            diag!(left.sink, SUBSYSTEM, Level::WARN, "merge refused: node budget of {} exhausted", limit);
            return Err(BinaryTreeError::AllocationFailure { limit, payload: data });
        }

        let mut root = Box::new(Node::new(data));
        root.left = left.root.take();
        root.right = right.root.take();
        left.size = 0;
        right.size = 0;

        let merged = BinaryTree {
            root: Some(root),
            size: adopted + 1,
            destroy: left.destroy.clone(),
            config: left.config,
            sink: Rc::clone(&left.sink),
        };
        diag!(merged.sink, SUBSYSTEM, Level::DEBUG, "merged trees into {} node(s)", merged.size);
        Ok(merged)
    }

    pub fn height(&self) -> usize {
        let mut deepest = 0;
        let mut stack: Vec<(&Node<T>, usize)> = self.root.as_deref().map(|n| (n, 1)).into_iter().collect();
        while let Some((node, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            stack.extend(node.left.as_deref().map(|child| (child, depth + 1)));
            stack.extend(node.right.as_deref().map(|child| (child, depth + 1)));
        }
        deepest
    }

    pub fn in_order(&self) -> Vec<&T> {
        let mut result = Vec::with_capacity(self.size);
        let mut stack = Vec::new();
        let mut current = self.root.as_deref();
        loop {
            while let Some(node) = current {
                stack.push(node);
                current = node.left.as_deref();
            }
            match stack.pop() {
                Some(node) => {
                    result.push(&node.payload);
                    current = node.right.as_deref();
                }
                None => break,
            }
        }
        result
    }

    pub fn pre_order(&self) -> Vec<&T> {
        let mut result = Vec::with_capacity(self.size);
        let mut stack: Vec<&Node<T>> = self.root.as_deref().into_iter().collect();
        while let Some(node) = stack.pop() {
            result.push(&node.payload);
            stack.extend(node.right.as_deref());
            stack.extend(node.left.as_deref());
        }
        result
    }

    pub fn post_order(&self) -> Vec<&T> {
        // Node-right-left pre-order, reversed.
        let mut result = Vec::with_capacity(self.size);
        let mut stack: Vec<&Node<T>> = self.root.as_deref().into_iter().collect();
        while let Some(node) = stack.pop() {
            result.push(&node.payload);
            stack.extend(node.left.as_deref());
            stack.extend(node.right.as_deref());
        }
        result.reverse();
        result
    }

    /// Hands the root link to a caller that rebuilds the tree shape in place.
    /// The caller must give it back through [`BinaryTree::restore_root`].
    pub(crate) fn detach_root(&mut self) -> Link<T> {
        self.root.take()
    }

    pub(crate) fn restore_root(&mut self, root: Link<T>) {
        debug_assert!(self.root.is_none());
        self.root = root;
    }

    pub(crate) fn root_link_mut(&mut self) -> &mut Link<T> {
        &mut self.root
    }

    /// Allocates a leaf for `data` in `slot`, which must not belong to this
    /// tree's own root link (see [`BinaryTree::detach_root`]).
    pub(crate) fn attach(&mut self, slot: &mut Link<T>, data: T) -> Result<(), BinaryTreeError<T>> {
        let attached = Self::grow(slot, data, &mut self.size, &self.config);
        match &attached {
            Ok(()) => diag!(self.sink, SUBSYSTEM, Level::TRACE, "attached leaf, {} node(s)", self.size),
            Err(err) => diag!(self.sink, SUBSYSTEM, Level::ERROR, "attach failed: {}", err),
        }
        attached
    }

    /// Passes a payload that is leaving the tree to the destructor.
    pub(crate) fn dispose(&self, payload: T) {
        match &self.destroy {
            Some(destroy) => destroy(payload),
            None => drop(payload),
        }
    }

    fn insert_child(&mut self, at: Option<&[Side]>, side: Side, data: T) -> Result<(), BinaryTreeError<T>> {
        let slot = match at {
            None => {
                if self.size > 0 {
                    diag!(self.sink, SUBSYSTEM, Level::ERROR, "root insert into a tree of {} node(s)", self.size);
                    return Err(BinaryTreeError::InvalidState(data));
                }
                &mut self.root
            }
            Some(path) => match Self::locate(&mut self.root, path) {
                Some(node) => node.child_mut(side),
                None => return Err(BinaryTreeError::UnreachableNode(data)),
            },
        };
        match Self::grow(slot, data, &mut self.size, &self.config) {
            Ok(()) => {
                diag!(self.sink, SUBSYSTEM, Level::TRACE, "inserted into {} branch", side);
                Ok(())
            }
            Err(err) => {
                diag!(self.sink, SUBSYSTEM, Level::ERROR, "{} insert failed: {}", side, err);
                Err(err)
            }
        }
    }

    fn grow(slot: &mut Link<T>, data: T, size: &mut usize, config: &TreeConfig) -> Result<(), BinaryTreeError<T>> {
        if slot.is_some() {
            return Err(BinaryTreeError::SlotOccupied(data));
        }
        if let Some(limit) = config.exceeded_by(*size, 1) {
            return Err(BinaryTreeError::AllocationFailure { limit, payload: data });
        }
        *slot = Some(Box::new(Node::new(data)));
        *size += 1;
        Ok(())
    }

    fn locate<'a>(root: &'a mut Link<T>, path: &[Side]) -> Option<&'a mut Node<T>> {
        let mut node = root.as_deref_mut()?;
        for &side in path {
            node = node.child_mut(side).as_deref_mut()?;
        }
        Some(node)
    }

    /// Post-order teardown of a detached subtree without recursion: a node is
    /// pushed back under its first remaining child and only disposed of once
    /// both children are gone.
    fn reap(&mut self, subtree: Link<T>) -> usize {
        let mut stack: Vec<Box<Node<T>>> = subtree.into_iter().collect();
        let mut removed = 0;
        while let Some(mut node) = stack.pop() {
            if let Some(left) = node.left.take() {
                stack.push(node);
                stack.push(left);
            } else if let Some(right) = node.right.take() {
                stack.push(node);
                stack.push(right);
            } else {
                self.dispose(node.payload);
                self.size -= 1;
                removed += 1;
            }
        }
        removed
    }
}

impl<T> Default for BinaryTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for BinaryTree<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

// Shows only whether each child exists; following the links here would
// recurse once per level.
impl<T: fmt::Debug> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("payload", &self.payload)
            .field("left", &self.left.is_some())
            .field("right", &self.right.is_some())
            .finish()
    }
}

impl<T: fmt::Debug> fmt::Debug for BinaryTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryTree")
            .field("pre_order", &self.pre_order())
            .field("size", &self.size)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
