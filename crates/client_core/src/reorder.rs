//! Drag-and-drop reordering for a single vertical list.
//!
//! The in-memory item sequence is the only source of truth for order: every
//! drag-over mutates it directly as a live preview, rendering is a projection
//! through [`ReorderableList::rows`], and drag-end reads the final order back
//! from the same sequence.

use std::{collections::HashMap, fmt, sync::Arc};

use shared::{order::build_order, protocol::OrderUpdate};
use tracing::debug;

/// A single entry in a [`ReorderableList`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderableItem<T> {
    pub key: String,
    pub data: T,
}

/// Where the dragged item lands relative to the row under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPosition {
    Before,
    After,
}

impl DropPosition {
    /// Maps the pointer's vertical position inside the target row
    /// (0.0 = top edge, 1.0 = bottom edge) to a drop position.
    ///
    /// Only the strictly lower half means `After`; the midpoint and NaN land before.
    pub fn from_pointer_fraction(fraction: f64) -> Self {
        if fraction > 0.5 {
            DropPosition::After
        } else {
            DropPosition::Before
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowState {
    pub dragging: bool,
}

/// Render projection of one item.
#[derive(Debug)]
pub struct ListRow<'a, T> {
    pub index: usize,
    pub key: &'a str,
    pub data: &'a T,
    pub state: RowState,
}

/// A move performed by [`ReorderableList::on_drag_over`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListReorder {
    pub key: String,
    pub from: usize,
    pub to: usize,
    pub position: DropPosition,
}

#[derive(Debug, Clone)]
struct DragSession {
    key: String,
}

type CommitCallback = Arc<dyn Fn(&OrderUpdate) + Send + Sync>;

/// State for a draggable, reorderable list.
pub struct ReorderableList<T> {
    items: Vec<OrderableItem<T>>,
    session: Option<DragSession>,
    on_commit: Option<CommitCallback>,
}

impl<T> Default for ReorderableList<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            session: None,
            on_commit: None,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ReorderableList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReorderableList")
            .field("items", &self.items)
            .field("session", &self.session)
            .field("has_commit_callback", &self.on_commit.is_some())
            .finish()
    }
}

impl<T> ReorderableList<T> {
    /// Builds a list from a persisted preferred order and the entries that
    /// currently exist. See [`build_order`] for the merge rules; a repeated
    /// entry key keeps its first payload.
    pub fn from_order<'a, S, I>(stored_order: S, entries: I) -> Self
    where
        S: IntoIterator<Item = &'a str>,
        I: IntoIterator<Item = (String, T)>,
    {
        let mut encounter = Vec::new();
        let mut payloads = HashMap::new();
        for (key, data) in entries {
            if !payloads.contains_key(&key) {
                encounter.push(key.clone());
                payloads.insert(key, data);
            }
        }

        let order = build_order(stored_order, encounter.iter().map(String::as_str));
        let items = order
            .into_iter()
            .filter_map(|key| {
                let data = payloads.remove(&key)?;
                Some(OrderableItem { key, data })
            })
            .collect();

        Self {
            items,
            session: None,
            on_commit: None,
        }
    }

    /// Registers the callback invoked with the full key order on every drag-end.
    pub fn on_commit(mut self, on_commit: impl Fn(&OrderUpdate) + Send + Sync + 'static) -> Self {
        self.on_commit = Some(Arc::new(on_commit));
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[OrderableItem<T>] {
        &self.items
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.items
            .iter()
            .find(|item| item.key == key)
            .map(|item| &item.data)
    }

    pub fn keys(&self) -> Vec<String> {
        self.items.iter().map(|item| item.key.clone()).collect()
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    pub fn dragged_key(&self) -> Option<&str> {
        self.session.as_ref().map(|session| session.key.as_str())
    }

    pub fn rows(&self) -> impl Iterator<Item = ListRow<'_, T>> + '_ {
        let dragged = self.dragged_key();
        self.items.iter().enumerate().map(move |(index, item)| ListRow {
            index,
            key: &item.key,
            data: &item.data,
            state: RowState {
                dragging: dragged == Some(item.key.as_str()),
            },
        })
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.items.iter().position(|item| item.key == key)
    }

    /// Starts a drag session for `key`, replacing any stale session.
    ///
    /// Returns `false` (and leaves no session) when the key is not in the list.
    pub fn on_drag_start(&mut self, key: &str) -> bool {
        if self.session.take().is_some() {
            debug!("discarding stale drag session");
        }
        if self.position(key).is_none() {
            return false;
        }
        debug!(key, "drag started");
        self.session = Some(DragSession {
            key: key.to_string(),
        });
        true
    }

    /// Moves the dragged item next to `target_key` as a live preview.
    ///
    /// Returns `None` when nothing moved: no active session, the target is the
    /// dragged item itself, the target is unknown, or the item already sits
    /// at the requested position.
    pub fn on_drag_over(&mut self, target_key: &str, pointer_y_fraction: f64) -> Option<ListReorder> {
        let dragged_key = self.session.as_ref()?.key.clone();
        if dragged_key == target_key {
            return None;
        }

        let from = self.position(&dragged_key)?;
        let target_ix = self.position(target_key)?;
        let position = DropPosition::from_pointer_fraction(pointer_y_fraction);

        let target_after_removal = if target_ix > from {
            target_ix - 1
        } else {
            target_ix
        };
        let to = match position {
            DropPosition::Before => target_after_removal,
            DropPosition::After => target_after_removal + 1,
        };
        if to == from {
            return None;
        }

        let item = self.items.remove(from);
        self.items.insert(to, item);
        debug!(key = %dragged_key, from, to, ?position, "drag preview moved");

        Some(ListReorder {
            key: dragged_key,
            from,
            to,
            position,
        })
    }

    /// Drop events never mutate the list; all movement already happened on drag-over.
    pub fn on_drop(&mut self) {}

    /// Ends the drag session and commits the current order.
    ///
    /// The commit callback fires once per completed gesture, whether or not
    /// the order changed. Without an active session nothing is emitted.
    pub fn on_drag_end(&mut self) -> Option<OrderUpdate> {
        let session = self.session.take()?;
        let update = OrderUpdate::new(self.keys());
        debug!(key = %session.key, order = ?update.order, "drag ended");
        if let Some(on_commit) = self.on_commit.as_ref() {
            on_commit(&update);
        }
        Some(update)
    }
}

#[cfg(test)]
#[path = "tests/reorder_tests.rs"]
mod tests;
