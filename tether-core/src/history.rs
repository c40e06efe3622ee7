//! Command execution history - newest-first, capped audit trail

use std::collections::VecDeque;
use std::time::SystemTime;

use serde::Serialize;
use tether_sdk::Route;

use crate::catalog::CommandId;
use crate::params::ParamInputs;
use crate::response::StructuredResponse;
use crate::TransportChoice;

/// Monotonically increasing per-history sequence number
pub type ExecutionId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum Outcome {
    Success(String),
    Failure(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Outcome::Success(m) | Outcome::Failure(m) => m,
        }
    }
}

/// Record of one command invocation
#[derive(Debug, Clone, Serialize)]
pub struct CommandExecution {
    pub id: ExecutionId,
    pub command: CommandId,
    /// Parameter text exactly as entered
    pub params: ParamInputs,
    /// Transport selection at invocation time
    pub transport: TransportChoice,
    /// Channel the command actually went out on, if it was routed
    pub route: Option<Route>,
    pub outcome: Outcome,
    pub response: StructuredResponse,
    pub recorded_at: SystemTime,
    pub expanded: bool,
}

impl CommandExecution {
    pub fn command_key(&self) -> &'static str {
        self.command.definition().key
    }
}

/// Everything `CommandHistory::record` needs about a finished invocation
#[derive(Debug, Clone)]
pub struct Invocation {
    pub command: CommandId,
    pub params: ParamInputs,
    pub transport: TransportChoice,
    pub route: Option<Route>,
    pub outcome: Outcome,
    pub response: StructuredResponse,
}

#[derive(Debug, Clone)]
pub struct CommandHistory {
    entries: VecDeque<CommandExecution>,
    capacity: usize,
    next_id: ExecutionId,
}

impl CommandHistory {
    pub const DEFAULT_CAPACITY: usize = 50;

    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert at the front and evict the oldest entries beyond capacity
    pub fn record(&mut self, invocation: Invocation) -> &CommandExecution {
        let id = self.next_id;
        self.next_id += 1;

        self.entries.push_front(CommandExecution {
            id,
            command: invocation.command,
            params: invocation.params,
            transport: invocation.transport,
            route: invocation.route,
            outcome: invocation.outcome,
            response: invocation.response,
            recorded_at: SystemTime::now(),
            expanded: false,
        });
        self.entries.truncate(self.capacity);

        log::debug!("recorded execution #{id} ({} in history)", self.entries.len());
        &self.entries[0]
    }

    /// Flip the expanded flag of one entry; false when the id is not present
    pub fn toggle_expanded(&mut self, id: ExecutionId) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.expanded = !entry.expanded;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn get(&self, id: ExecutionId) -> Option<&CommandExecution> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Entries, newest first
    pub fn iter(&self) -> impl Iterator<Item = &CommandExecution> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&CommandExecution> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        let entries: Vec<&CommandExecution> = self.entries.iter().collect();
        serde_json::to_string_pretty(&entries)
    }
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
