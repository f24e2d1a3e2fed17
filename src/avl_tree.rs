//! AVL tree with soft delete, layered on [`BinaryTree`].
//!
//! Every substrate node carries an [`AvlNode`]: the caller's data, a hidden
//! flag and a balance factor. Balance factors are maintained incrementally by
//! the insert path; nothing recomputes heights. Removal only hides a node, and
//! re-inserting a hidden key revives the node in place.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::binary_tree::{BinaryTree, BinaryTreeError, DestroyFn, Link, Node};
use crate::config::TreeConfig;
use crate::diagnostics::{diag, DiagnosticSink, Level, Subsystem, TracingSink};

const SUBSYSTEM: Subsystem = Subsystem::AvlTree;

/// Total order over payloads, consistent for the lifetime of a tree.
pub type CompareFn<T> = Rc<dyn Fn(&T, &T) -> Ordering>;

type AvlLink<T> = Link<AvlNode<T>>;
type AvlBox<T> = Box<Node<AvlNode<T>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Factor {
    LeftHeavy,
    Balanced,
    RightHeavy,
}

/// Payload stored in every node of an [`AvlTree`].
#[derive(Debug)]
pub struct AvlNode<T> {
    data: T,
    hidden: bool,
    factor: Factor,
}

impl<T> AvlNode<T> {
    fn new(data: T) -> Self {
        AvlNode {
            data,
            hidden: false,
            factor: Factor::Balanced,
        }
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn factor(&self) -> Factor {
        self.factor
    }
}

/// How a successful [`AvlTree::insert`] placed its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// A new node was allocated.
    Inserted,
    /// A hidden node with an equal key was revived with the new data.
    Undeleted,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AvlError<T> {
    /// A visible node with an equal key exists; the data is handed back.
    #[error("an entry with an equal key already exists")]
    Duplicate(T),
    #[error("node budget of {limit} exhausted")]
    AllocationFailure { limit: usize, data: T },
    #[error("invalid insertion target")]
    InvalidArgument(T),
    #[error("key not found")]
    NotFound,
}

impl<T> AvlError<T> {
    /// Recovers the data a failed insert did not keep.
    pub fn into_data(self) -> Option<T> {
        match self {
            AvlError::Duplicate(data)
            | AvlError::AllocationFailure { data, .. }
            | AvlError::InvalidArgument(data) => Some(data),
            AvlError::NotFound => None,
        }
    }
}

impl<T> From<BinaryTreeError<AvlNode<T>>> for AvlError<T> {
    fn from(err: BinaryTreeError<AvlNode<T>>) -> Self {
        match err {
            BinaryTreeError::AllocationFailure { limit, payload } => AvlError::AllocationFailure {
                limit,
                data: payload.data,
            },
            other => AvlError::InvalidArgument(other.into_payload().data),
        }
    }
}

pub struct AvlTree<T> {
    tree: BinaryTree<AvlNode<T>>,
    compare: CompareFn<T>,
    sink: Rc<dyn DiagnosticSink>,
}

impl<T: Ord> AvlTree<T> {
    /// Creates an empty tree ordered by `T`'s own `Ord`.
    pub fn new() -> Self {
        Self::with_comparator(|a: &T, b: &T| a.cmp(b))
    }
}

impl<T: Ord> Default for AvlTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> AvlTree<T> {
    /// Creates an empty tree ordered by `compare`.
    pub fn with_comparator(compare: impl Fn(&T, &T) -> Ordering + 'static) -> Self {
        let tree = AvlTree {
            tree: BinaryTree::new(),
            compare: Rc::new(compare),
            sink: Rc::new(TracingSink),
        };
        diag!(tree.sink, SUBSYSTEM, Level::DEBUG, "initialised AVL tree");
        tree
    }

    /// Hands payloads to `destroy` when they leave the tree: on destroy, on
    /// drop, and when an undelete overwrites a hidden payload.
    pub fn with_destroy(mut self, destroy: impl Fn(T) + 'static) -> Self {
        let unwrap: DestroyFn<AvlNode<T>> = Rc::new(move |node: AvlNode<T>| destroy(node.data));
        self.tree = self.tree.with_destroy_fn(Some(unwrap));
        self
    }

    pub fn with_config(mut self, config: TreeConfig) -> Self {
        self.tree = self.tree.with_config(config);
        self
    }

    pub fn with_sink(mut self, sink: Rc<dyn DiagnosticSink>) -> Self {
        self.tree = self.tree.with_sink(Rc::clone(&sink));
        self.sink = sink;
        self
    }

    /// Number of nodes, hidden ones included.
    pub fn size(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn height(&self) -> usize {
        self.tree.height()
    }

    /// Read-only view of the underlying substrate.
    pub fn as_binary_tree(&self) -> &BinaryTree<AvlNode<T>> {
        &self.tree
    }

    /// Inserts `data`, rebalancing on the way back up.
    ///
    /// An equal key that is hidden gets `data` installed in place: the old
    /// payload goes to the destructor and the result is
    /// [`Insertion::Undeleted`]. An equal visible key refuses the insert with
    /// [`AvlError::Duplicate`], returning `data` untouched.
    pub fn insert(&mut self, data: T) -> Result<Insertion, AvlError<T>> {
        // The root is taken out so the recursion can reshape links while the
        // substrate still counts and disposes of payloads.
        let mut root = self.tree.detach_root();
        let mut grew = false;
        let outcome = Self::insert_node(&mut self.tree, &*self.compare, &mut root, data, &mut grew);
        self.tree.restore_root(root);

        match &outcome {
            Ok(insertion) => {
                diag!(self.sink, SUBSYSTEM, Level::DEBUG, "insert: {:?}, {} node(s)", insertion, self.tree.size())
            }
            Err(err) => diag!(self.sink, SUBSYSTEM, Level::WARN, "insert refused: {}", err),
        }
        outcome
    }

    /// Marks the entry equal to `key` as hidden. Hiding an already hidden
    /// entry succeeds again without further effect.
    pub fn hide(&mut self, key: &T) -> Result<(), AvlError<T>> {
        let compare = &*self.compare;
        let mut current = self.tree.root_link_mut().as_deref_mut();
        while let Some(node) = current {
            match compare(key, &node.payload.data) {
                Ordering::Less => current = node.left.as_deref_mut(),
                Ordering::Greater => current = node.right.as_deref_mut(),
                Ordering::Equal => {
                    node.payload.hidden = true;
                    diag!(self.sink, SUBSYSTEM, Level::DEBUG, "hid entry");
                    return Ok(());
                }
            }
        }
        diag!(self.sink, SUBSYSTEM, Level::DEBUG, "hide: key not found");
        Err(AvlError::NotFound)
    }

    /// Returns the visible payload equal to `key`.
    ///
    /// Hidden nodes still steer the descent, but a hidden match is reported
    /// as [`AvlError::NotFound`].
    pub fn lookup(&self, key: &T) -> Result<&T, AvlError<T>> {
        match self.find(key) {
            Some(entry) if !entry.hidden => Ok(&entry.data),
            Some(_) => {
                diag!(self.sink, SUBSYSTEM, Level::TRACE, "lookup: matched a hidden entry");
                Err(AvlError::NotFound)
            }
            None => Err(AvlError::NotFound),
        }
    }

    pub fn contains(&self, key: &T) -> bool {
        self.lookup(key).is_ok()
    }

    /// Removes every node, hidden or not, handing each payload to the
    /// destructor exactly once.
    pub fn destroy(&mut self) {
        let removed = self.tree.size();
        self.tree.clear();
        diag!(self.sink, SUBSYSTEM, Level::DEBUG, "destroyed {} node(s)", removed);
    }

    /// Visible payloads in comparator order.
    pub fn in_order(&self) -> Vec<&T> {
        self.tree
            .in_order()
            .into_iter()
            .filter(|entry| !entry.hidden)
            .map(|entry| &entry.data)
            .collect()
    }

    /// Checks every recorded balance factor against the real subtree heights.
    pub fn is_balanced(&self) -> bool {
        Self::checked_height(self.tree.root()).is_some()
    }

    fn find(&self, key: &T) -> Option<&AvlNode<T>> {
        let mut current = self.tree.root();
        while let Some(node) = current {
            match (self.compare)(key, &node.payload().data) {
                Ordering::Less => current = node.left(),
                Ordering::Greater => current = node.right(),
                Ordering::Equal => return Some(node.payload()),
            }
        }
        None
    }

    /// Recursive insert. `grew` is set when the subtree rooted at `link` ended
    /// up one level taller than before.
    fn insert_node(
        tree: &mut BinaryTree<AvlNode<T>>,
        compare: &dyn Fn(&T, &T) -> Ordering,
        link: &mut AvlLink<T>,
        data: T,
        grew: &mut bool,
    ) -> Result<Insertion, AvlError<T>> {
        let node = match link {
            Some(node) => node,
            None => {
                tree.attach(link, AvlNode::new(data))?;
                *grew = true;
                return Ok(Insertion::Inserted);
            }
        };

        match compare(&data, &node.payload.data) {
            Ordering::Less => {
                let insertion = Self::insert_node(tree, compare, &mut node.left, data, grew)?;
                if *grew {
                    let factor = node.payload.factor;
                    match factor {
                        Factor::LeftHeavy => {
                            *grew = false;
                            if let Some(root) = link.take() {
                                *link = Some(Self::rotate_left(root));
                            }
                        }
                        Factor::Balanced => node.payload.factor = Factor::LeftHeavy,
                        Factor::RightHeavy => {
                            node.payload.factor = Factor::Balanced;
                            *grew = false;
                        }
                    }
                }
                Ok(insertion)
            }
            Ordering::Greater => {
                let insertion = Self::insert_node(tree, compare, &mut node.right, data, grew)?;
                if *grew {
                    let factor = node.payload.factor;
                    match factor {
                        Factor::LeftHeavy => {
                            node.payload.factor = Factor::Balanced;
                            *grew = false;
                        }
                        Factor::Balanced => node.payload.factor = Factor::RightHeavy,
                        Factor::RightHeavy => {
                            *grew = false;
                            if let Some(root) = link.take() {
                                *link = Some(Self::rotate_right(root));
                            }
                        }
                    }
                }
                Ok(insertion)
            }
            Ordering::Equal => {
                if !node.payload.hidden {
                    return Err(AvlError::Duplicate(data));
                }
                let old = std::mem::replace(&mut node.payload.data, data);
                node.payload.hidden = false;
                tree.dispose(AvlNode::new(old));
                *grew = false;
                Ok(Insertion::Undeleted)
            }
        }
    }

    /// Restores a subtree whose left side has become two levels taller.
    fn rotate_left(mut root: AvlBox<T>) -> AvlBox<T> {
        let Some(mut left) = root.left.take() else {
            return root;
        };

        if left.payload.factor == Factor::LeftHeavy {
            root.left = left.right.take();
            root.payload.factor = Factor::Balanced;
            left.payload.factor = Factor::Balanced;
            left.right = Some(root);
            return left;
        }

        let Some(mut grandchild) = left.right.take() else {
            root.left = Some(left);
            return root;
        };
        left.right = grandchild.left.take();
        root.left = grandchild.right.take();
        let (root_factor, left_factor) = match grandchild.payload.factor {
            Factor::LeftHeavy => (Factor::RightHeavy, Factor::Balanced),
            Factor::Balanced => (Factor::Balanced, Factor::Balanced),
            Factor::RightHeavy => (Factor::Balanced, Factor::LeftHeavy),
        };
        root.payload.factor = root_factor;
        left.payload.factor = left_factor;
        grandchild.payload.factor = Factor::Balanced;
        grandchild.left = Some(left);
        grandchild.right = Some(root);
        grandchild
    }

    /// Mirror of [`AvlTree::rotate_left`] for a right side two levels taller.
    fn rotate_right(mut root: AvlBox<T>) -> AvlBox<T> {
        let Some(mut right) = root.right.take() else {
            return root;
        };

        if right.payload.factor == Factor::RightHeavy {
            root.right = right.left.take();
            root.payload.factor = Factor::Balanced;
            right.payload.factor = Factor::Balanced;
            right.left = Some(root);
            return right;
        }

        let Some(mut grandchild) = right.left.take() else {
            root.right = Some(right);
            return root;
        };
        right.left = grandchild.right.take();
        root.right = grandchild.left.take();
        let (root_factor, right_factor) = match grandchild.payload.factor {
            Factor::LeftHeavy => (Factor::Balanced, Factor::RightHeavy),
            Factor::Balanced => (Factor::Balanced, Factor::Balanced),
            Factor::RightHeavy => (Factor::LeftHeavy, Factor::Balanced),
        };
        root.payload.factor = root_factor;
        right.payload.factor = right_factor;
        grandchild.payload.factor = Factor::Balanced;
        grandchild.right = Some(right);
        grandchild.left = Some(root);
        grandchild
    }

    fn checked_height(node: Option<&Node<AvlNode<T>>>) -> Option<usize> {
        let Some(node) = node else {
            return Some(0);
        };
        let left = Self::checked_height(node.left())?;
        let right = Self::checked_height(node.right())?;
        let expected = if left == right + 1 {
            Factor::LeftHeavy
        } else if left == right {
            Factor::Balanced
        } else if right == left + 1 {
            Factor::RightHeavy
        } else {
            return None;
        };
        (node.payload().factor == expected).then(|| 1 + left.max(right))
    }
}

impl<T: fmt::Debug> fmt::Debug for AvlTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvlTree").field("tree", &self.tree).finish_non_exhaustive()
    }
}
