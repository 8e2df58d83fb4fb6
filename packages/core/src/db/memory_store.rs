//! MemoryStore - DocumentStore Implementation Held In Process
//!
//! A complete in-memory document store used by the dev simulator, the
//! benchmarks and the test suite. Beyond the plain contract it can reproduce
//! the host behaviors the consistency layer has to survive:
//!
//! - **Deferred binding teardown**: deleting a shape leaves bindings that
//!   reference it in place until [`MemoryStore::settle`] runs, the way a real
//!   canvas engine tears bindings down a tick later.
//! - **Injected failures**: [`MemoryStore::fail_next_deletes`] and
//!   [`MemoryStore::fail_next_creates`] make the next N calls fail,
//!   exercising the retry and error paths.
//! - **Binding corruption**: [`MemoryStore::remove_binding`] drops a single
//!   binding without touching either shape.
//!
//! Every mutation publishes a [`StoreChangeBatch`] on a broadcast channel.

use crate::db::document_store::DocumentStore;
use crate::db::events::StoreChangeBatch;
use crate::db::StoreError;
use crate::models::{Binding, BindingId, NewBinding, Shape, ShapeId, ShapeUpdate};
use parking_lot::Mutex;
use std::collections::HashSet;
use tokio::sync::broadcast;

/// Broadcast capacity for store change batches
const STORE_EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Default)]
struct MemoryState {
    /// Shapes in stacking order, back to front
    shapes: Vec<Shape>,
    bindings: Vec<Binding>,
    next_binding: u64,
    failing_deletes: usize,
    failing_creates: usize,
}

impl MemoryState {
    fn position(&self, id: &ShapeId) -> Option<usize> {
        self.shapes.iter().position(|shape| &shape.id == id)
    }

    fn get(&self, id: &ShapeId) -> Option<&Shape> {
        self.shapes.iter().find(|shape| &shape.id == id)
    }

    /// Remove bindings whose edge or target no longer exists.
    fn take_dangling_bindings(&mut self) -> Vec<Binding> {
        let live: HashSet<ShapeId> = self.shapes.iter().map(|s| s.id.clone()).collect();
        let (dangling, kept): (Vec<Binding>, Vec<Binding>) = self
            .bindings
            .drain(..)
            .partition(|b| !live.contains(&b.from_id) || !live.contains(&b.to_id));
        self.bindings = kept;
        dangling
    }

    /// Pull the listed shapes out of the stacking order, keeping their
    /// relative order.
    fn extract_in_order(&mut self, ids: &[ShapeId]) -> Vec<Shape> {
        let wanted: HashSet<&ShapeId> = ids.iter().collect();
        let (moved, rest): (Vec<Shape>, Vec<Shape>) = self
            .shapes
            .drain(..)
            .partition(|shape| wanted.contains(&shape.id));
        self.shapes = rest;
        moved
    }
}

/// In-memory document store
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    deferred_teardown: bool,
    event_tx: broadcast::Sender<StoreChangeBatch>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Store that tears bindings down in the same call as the shape deletion.
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(STORE_EVENT_CHANNEL_CAPACITY);
        Self {
            state: Mutex::new(MemoryState::default()),
            deferred_teardown: false,
            event_tx,
        }
    }

    /// Store that leaves bindings of deleted shapes dangling until
    /// [`MemoryStore::settle`] is called.
    pub fn with_deferred_teardown() -> Self {
        Self {
            deferred_teardown: true,
            ..Self::new()
        }
    }

    /// Tear down bindings that reference deleted shapes. Returns how many
    /// were removed.
    pub fn settle(&self) -> usize {
        let removed = self.state.lock().take_dangling_bindings();
        let count = removed.len();
        if count > 0 {
            self.emit(StoreChangeBatch {
                removed_bindings: removed,
                ..Default::default()
            });
        }
        count
    }

    /// Make the next `count` calls to `delete_shapes` fail.
    pub fn fail_next_deletes(&self, count: usize) {
        self.state.lock().failing_deletes = count;
    }

    /// Make the next `count` calls to `create_shape` fail.
    pub fn fail_next_creates(&self, count: usize) {
        self.state.lock().failing_creates = count;
    }

    /// Drop one binding without touching either shape.
    pub fn remove_binding(&self, id: &BindingId) -> Option<Binding> {
        let removed = {
            let mut state = self.state.lock();
            let pos = state.bindings.iter().position(|b| &b.id == id)?;
            state.bindings.remove(pos)
        };
        self.emit(StoreChangeBatch {
            removed_bindings: vec![removed.clone()],
            ..Default::default()
        });
        Some(removed)
    }

    /// Shape ids in stacking order, back to front.
    pub fn stacking_order(&self) -> Vec<ShapeId> {
        self.state.lock().shapes.iter().map(|s| s.id.clone()).collect()
    }

    pub fn binding_count(&self) -> usize {
        self.state.lock().bindings.len()
    }

    fn emit(&self, batch: StoreChangeBatch) {
        // No subscribers is fine (tests without a listener).
        let _ = self.event_tx.send(batch);
    }
}

impl DocumentStore for MemoryStore {
    fn shapes(&self) -> Vec<Shape> {
        self.state.lock().shapes.clone()
    }

    fn shape(&self, id: &ShapeId) -> Option<Shape> {
        self.state.lock().get(id).cloned()
    }

    fn create_shape(&self, shape: Shape) -> Result<(), StoreError> {
        let id = shape.id.clone();
        {
            let mut state = self.state.lock();
            if state.failing_creates > 0 {
                state.failing_creates -= 1;
                return Err(StoreError::rejected("create", "injected failure"));
            }
            if state.get(&id).is_some() {
                return Err(StoreError::DuplicateId { id });
            }
            state.shapes.push(shape);
        }
        self.emit(StoreChangeBatch {
            added: vec![id],
            ..Default::default()
        });
        Ok(())
    }

    fn update_shape(&self, id: &ShapeId, update: ShapeUpdate) -> Result<(), StoreError> {
        {
            let mut state = self.state.lock();
            let pos = state.position(id).ok_or_else(|| StoreError::not_found(id))?;
            let shape = &mut state.shapes[pos];
            if shape.is_locked {
                return Err(StoreError::locked(id));
            }
            update.apply(shape);
        }
        self.emit(StoreChangeBatch {
            updated: vec![id.clone()],
            ..Default::default()
        });
        Ok(())
    }

    fn set_locked(&self, ids: &[ShapeId], locked: bool) -> Result<(), StoreError> {
        let mut changed = Vec::new();
        {
            let mut state = self.state.lock();
            for shape in state.shapes.iter_mut() {
                if ids.contains(&shape.id) && shape.is_locked != locked {
                    shape.is_locked = locked;
                    changed.push(shape.id.clone());
                }
            }
        }
        if !changed.is_empty() {
            self.emit(StoreChangeBatch {
                updated: changed,
                ..Default::default()
            });
        }
        Ok(())
    }

    fn delete_shapes(&self, ids: &[ShapeId]) -> Result<(), StoreError> {
        let batch = {
            let mut state = self.state.lock();
            if state.failing_deletes > 0 {
                state.failing_deletes -= 1;
                return Err(StoreError::rejected("delete", "injected failure"));
            }
            if let Some(locked) = ids
                .iter()
                .filter_map(|id| state.get(id))
                .find(|shape| shape.is_locked)
            {
                return Err(StoreError::locked(&locked.id));
            }

            let removed_shapes = state.extract_in_order(ids);
            if removed_shapes.is_empty() {
                return Ok(());
            }
            let removed_bindings = if self.deferred_teardown {
                Vec::new()
            } else {
                state.take_dangling_bindings()
            };
            StoreChangeBatch {
                removed_shapes,
                removed_bindings,
                ..Default::default()
            }
        };
        self.emit(batch);
        Ok(())
    }

    fn bindings_from(&self, id: &ShapeId) -> Vec<Binding> {
        self.state
            .lock()
            .bindings
            .iter()
            .filter(|b| &b.from_id == id)
            .cloned()
            .collect()
    }

    fn create_binding(&self, binding: NewBinding) -> Result<BindingId, StoreError> {
        let mut state = self.state.lock();
        for id in [&binding.from_id, &binding.to_id] {
            if state.get(id).is_none() {
                return Err(StoreError::not_found(id));
            }
        }
        state.next_binding += 1;
        let id = BindingId::new(format!("binding:{}", state.next_binding));
        state.bindings.push(Binding {
            id: id.clone(),
            from_id: binding.from_id,
            to_id: binding.to_id,
            terminal: binding.terminal,
            anchor: binding.anchor,
        });
        Ok(id)
    }

    fn send_to_back(&self, ids: &[ShapeId]) -> Result<(), StoreError> {
        let moved_ids = {
            let mut state = self.state.lock();
            let mut moved = state.extract_in_order(ids);
            let moved_ids: Vec<ShapeId> = moved.iter().map(|s| s.id.clone()).collect();
            moved.append(&mut state.shapes);
            state.shapes = moved;
            moved_ids
        };
        if !moved_ids.is_empty() {
            self.emit(StoreChangeBatch {
                updated: moved_ids,
                ..Default::default()
            });
        }
        Ok(())
    }

    fn bring_to_front(&self, ids: &[ShapeId]) -> Result<(), StoreError> {
        let moved_ids = {
            let mut state = self.state.lock();
            let moved = state.extract_in_order(ids);
            let moved_ids: Vec<ShapeId> = moved.iter().map(|s| s.id.clone()).collect();
            state.shapes.extend(moved);
            moved_ids
        };
        if !moved_ids.is_empty() {
            self.emit(StoreChangeBatch {
                updated: moved_ids,
                ..Default::default()
            });
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChangeBatch> {
        self.event_tx.subscribe()
    }
}
