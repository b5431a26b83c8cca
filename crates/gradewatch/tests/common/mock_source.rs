//! Scripted in-memory status source.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use gradewatch::{
    ActionOutcome, ActionParams, Collection, Entity, EntityKind, RawStatus, Result, StatusSource,
    TrackerError,
};

/// One scripted answer to a per-id fetch.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(RawStatus),
    /// Transient failure; polling retries.
    Fail(String),
    /// Permanent failure, such as a 404 for a deleted entity.
    Gone(String),
}

/// A `StatusSource` answering from scripts.
///
/// Each id answers from its own queue of replies; the last reply repeats
/// once the queue is down to one entry. Ids without a script fail.
pub struct MockSource {
    list: Mutex<std::result::Result<Vec<Entity>, String>>,
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    action_reply: Mutex<std::result::Result<ActionOutcome, String>>,
    fetches: Mutex<HashMap<String, usize>>,
    actions: Mutex<Vec<(String, ActionParams)>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            list: Mutex::new(Ok(Vec::new())),
            replies: Mutex::new(HashMap::new()),
            action_reply: Mutex::new(Ok(ActionOutcome {
                success: true,
                message: None,
            })),
            fetches: Mutex::new(HashMap::new()),
            actions: Mutex::new(Vec::new()),
        }
    }

    pub fn with_list(self, entities: Vec<Entity>) -> Self {
        *self.list.lock().unwrap() = Ok(entities);
        self
    }

    pub fn with_list_error(self, message: &str) -> Self {
        *self.list.lock().unwrap() = Err(message.to_string());
        self
    }

    /// Scripts the replies for one id, answered in order.
    pub fn with_replies(self, id: &str, replies: Vec<Reply>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(id.to_string(), replies.into());
        self
    }

    pub fn with_action_outcome(self, success: bool, message: Option<&str>) -> Self {
        *self.action_reply.lock().unwrap() = Ok(ActionOutcome {
            success,
            message: message.map(String::from),
        });
        self
    }

    pub fn with_action_error(self, message: &str) -> Self {
        *self.action_reply.lock().unwrap() = Err(message.to_string());
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Replaces the script of one id while the source is in use.
    pub fn script(&self, id: &str, replies: Vec<Reply>) {
        self.replies
            .lock()
            .unwrap()
            .insert(id.to_string(), replies.into());
    }

    /// Makes every later list fetch fail.
    pub fn fail_list(&self, message: &str) {
        *self.list.lock().unwrap() = Err(message.to_string());
    }

    pub fn fetch_count(&self, id: &str) -> usize {
        self.fetches.lock().unwrap().get(id).copied().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.fetches.lock().unwrap().values().sum()
    }

    pub fn actions(&self) -> Vec<(String, ActionParams)> {
        self.actions.lock().unwrap().clone()
    }
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatusSource for MockSource {
    async fn fetch_list(&self, collection: &Collection) -> Result<Vec<Entity>> {
        self.list
            .lock()
            .unwrap()
            .clone()
            .map_err(|message| TrackerError::Fetch {
                id: collection.to_string(),
                message,
            })
    }

    async fn fetch_one(&self, _kind: EntityKind, id: &str) -> Result<RawStatus> {
        *self.fetches.lock().unwrap().entry(id.to_string()).or_insert(0) += 1;

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            match replies.get_mut(id) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(Reply::Status(raw)) => Ok(raw),
            Some(Reply::Fail(message)) => Err(TrackerError::Fetch {
                id: id.to_string(),
                message,
            }),
            Some(Reply::Gone(message)) => Err(TrackerError::InvalidResponse(message)),
            None => Err(TrackerError::Fetch {
                id: id.to_string(),
                message: "no scripted reply".to_string(),
            }),
        }
    }

    async fn trigger_action(&self, id: &str, action: ActionParams) -> Result<ActionOutcome> {
        self.actions.lock().unwrap().push((id.to_string(), action));
        self.action_reply
            .lock()
            .unwrap()
            .clone()
            .map_err(|message| TrackerError::Fetch {
                id: id.to_string(),
                message,
            })
    }
}
