//! Scope-bound registration stacks
//!
//! Both the handler stack and the restart stack are persistent linked lists:
//! a snapshot is a pointer to a node, so saving and restoring a whole stack is
//! O(1) and a scan that holds a snapshot keeps seeing the same entries no
//! matter what is pushed or popped while it runs.

use rcond_types::FrameId;
use std::fmt;
use std::rc::Rc;

struct Node<T> {
    frame: FrameId,
    entry: Rc<T>,
    below: Option<Rc<Node<T>>>,
    depth: usize,
}

/// A saved stack state
pub struct StackSnapshot<T> {
    top: Option<Rc<Node<T>>>,
}

impl<T> Clone for StackSnapshot<T> {
    fn clone(&self) -> Self {
        Self {
            top: self.top.clone(),
        }
    }
}

impl<T> StackSnapshot<T> {
    /// The empty stack
    pub fn empty() -> Self {
        Self { top: None }
    }

    pub fn len(&self) -> usize {
        self.top.as_ref().map_or(0, |node| node.depth)
    }

    pub fn is_empty(&self) -> bool {
        self.top.is_none()
    }

    /// Frame of the topmost entry
    pub fn top_frame(&self) -> Option<FrameId> {
        self.top.as_ref().map(|node| node.frame)
    }

    /// Split into the topmost entry and the stack beneath it
    pub fn split(&self) -> Option<(FrameId, Rc<T>, StackSnapshot<T>)> {
        self.top.as_ref().map(|node| {
            (
                node.frame,
                Rc::clone(&node.entry),
                StackSnapshot {
                    top: node.below.clone(),
                },
            )
        })
    }

    /// Iterate entries from the top down
    pub fn iter(&self) -> StackIter<T> {
        StackIter {
            next: self.top.clone(),
        }
    }

    /// True if both snapshots denote the very same stack state
    pub fn same_as(&self, other: &StackSnapshot<T>) -> bool {
        match (&self.top, &other.top) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T> Drop for StackSnapshot<T> {
    // Unlink nodes one at a time; the default drop recurses once per node
    fn drop(&mut self) {
        let mut next = self.top.take();
        while let Some(node) = next {
            match Rc::try_unwrap(node) {
                Ok(mut node) => next = node.below.take(),
                // Still shared by another snapshot
                Err(_) => break,
            }
        }
    }
}

impl<T> fmt::Debug for StackSnapshot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackSnapshot")
            .field("len", &self.len())
            .field("top", &self.top_frame())
            .finish()
    }
}

/// Iterator over `(frame, entry)` pairs, top first
pub struct StackIter<T> {
    next: Option<Rc<Node<T>>>,
}

impl<T> Iterator for StackIter<T> {
    type Item = (FrameId, Rc<T>);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next.take()?;
        self.next = node.below.clone();
        Some((node.frame, Rc::clone(&node.entry)))
    }
}

/// A LIFO stack of registrations keyed by frame identity
pub struct ScopedStack<T> {
    kind: &'static str,
    current: StackSnapshot<T>,
}

impl<T> ScopedStack<T> {
    /// Create an empty stack; `kind` names it in logs and panics
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            current: StackSnapshot::empty(),
        }
    }

    pub fn push(&mut self, frame: FrameId, entry: T) {
        let depth = self.current.len() + 1;
        let node = Node {
            frame,
            entry: Rc::new(entry),
            below: self.current.top.take(),
            depth,
        };
        self.current.top = Some(Rc::new(node));
        tracing::trace!(stack = self.kind, %frame, depth, "push");
    }

    /// Pop the top registration, which must belong to `frame`
    ///
    /// # Panics
    ///
    /// Panics if `frame` is not the current top. That means the caller broke
    /// scope discipline and the stack can no longer be trusted.
    pub fn pop(&mut self, frame: FrameId) -> Rc<T> {
        let Some(node) = self.current.top.take() else {
            tracing::error!(stack = self.kind, %frame, "pop from empty stack");
            panic!("{} stack: pop of {} from an empty stack", self.kind, frame);
        };
        if node.frame != frame {
            let top = node.frame;
            self.current.top = Some(node);
            tracing::error!(stack = self.kind, %frame, %top, "pop of non-top frame");
            panic!(
                "{} stack: pop of {} but the top registration is {}",
                self.kind, frame, top
            );
        }
        tracing::trace!(stack = self.kind, %frame, depth = node.depth, "pop");
        self.current.top = node.below.clone();
        Rc::clone(&node.entry)
    }

    pub fn snapshot(&self) -> StackSnapshot<T> {
        self.current.clone()
    }

    /// Replace the whole stack with a saved state
    pub fn restore_to(&mut self, snapshot: StackSnapshot<T>) {
        tracing::trace!(
            stack = self.kind,
            from = self.current.len(),
            to = snapshot.len(),
            "restore"
        );
        self.current = snapshot;
    }

    pub fn clear(&mut self) {
        self.current = StackSnapshot::empty();
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    pub fn top_frame(&self) -> Option<FrameId> {
        self.current.top_frame()
    }

    /// Entry at 1-based `position` counted from the top
    pub fn get(&self, position: usize) -> Option<(FrameId, Rc<T>)> {
        if position == 0 {
            return None;
        }
        self.current.iter().nth(position - 1)
    }

    /// Entry registered under `frame`, if it is still on the stack
    pub fn find(&self, frame: FrameId) -> Option<Rc<T>> {
        self.current
            .iter()
            .find(|(f, _)| *f == frame)
            .map(|(_, entry)| entry)
    }

    pub fn iter(&self) -> StackIter<T> {
        self.current.iter()
    }
}

impl<T> fmt::Debug for ScopedStack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedStack")
            .field("kind", &self.kind)
            .field("len", &self.len())
            .finish()
    }
}
