//! Change notification channel for store writes.
//!
//! Consumers call `subscribe()` and drain the returned receiver to learn
//! which records changed, instead of polling or sharing mutable state.
//! Dropped receivers are pruned on the next publish.

use crate::model::space::SpaceId;
use log::warn;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Space,
    Lead,
    Client,
    NpsRecord,
    Objective,
    ProgressEntry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeAction {
    Created,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub space_id: SpaceId,
    pub entity: EntityKind,
    pub id: String,
    pub action: ChangeAction,
}

impl ChangeEvent {
    pub fn new(
        space_id: impl Into<SpaceId>,
        entity: EntityKind,
        id: impl ToString,
        action: ChangeAction,
    ) -> Self {
        Self {
            space_id: space_id.into(),
            entity,
            id: id.to_string(),
            action,
        }
    }
}

/// Fan-out publisher. Clones share the same subscriber list.
#[derive(Debug, Clone, Default)]
pub struct ChangeNotifier {
    subscribers: Arc<Mutex<Vec<Sender<ChangeEvent>>>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Receiver<ChangeEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    pub fn publish(&self, event: ChangeEvent) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        if subscribers.len() < before {
            warn!(
                "event=change_subscriber_dropped module=repo status=ok dropped={}",
                before - subscribers.len()
            );
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
