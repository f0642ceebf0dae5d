//! In-memory depot for exercising sync flows without a server.
//!
//! Replies are queued per command name and consumed in order; once a queue
//! is empty the command's fallback reply (if any) is used, otherwise an empty
//! info-level reply. Every command issued and every connection opened or
//! released is recorded for assertions.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use locsync_core::{
    CommandOutput, ConnectionSettings, DepotClient, DepotCommand, DepotConnector, DepotError,
    Record,
};

/// A canned reply. [`DepotError`] is not `Clone`, so faults are described
/// here and materialised on each use.
#[derive(Debug, Clone)]
pub enum Reply {
    Output(CommandOutput),
    ConnectionFault(String),
    CommandFault(Vec<String>),
}

impl Reply {
    pub fn info(lines: &[&str]) -> Self {
        Reply::Output(CommandOutput::info(to_lines(lines)))
    }

    pub fn warning(lines: &[&str]) -> Self {
        Reply::Output(CommandOutput::warning(to_lines(lines)))
    }

    pub fn records(records: Vec<Record>) -> Self {
        Reply::Output(CommandOutput::records(records))
    }

    pub fn connection_fault() -> Self {
        Reply::ConnectionFault("depot unreachable".to_string())
    }

    fn materialise(&self, command: &DepotCommand) -> Result<CommandOutput, DepotError> {
        match self {
            Reply::Output(output) => Ok(output.clone()),
            Reply::ConnectionFault(message) => Err(DepotError::Connection {
                message: message.clone(),
            }),
            Reply::CommandFault(messages) => Err(DepotError::Command {
                command: command.to_string(),
                messages: messages.clone(),
            }),
        }
    }
}

fn to_lines(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|l| l.to_string()).collect()
}

#[derive(Debug, Default)]
struct State {
    queued: HashMap<String, VecDeque<Reply>>,
    fallback: HashMap<String, Reply>,
    issued: Vec<DepotCommand>,
    refuse_connections: bool,
    opened: usize,
    released: usize,
}

/// Scripted depot; cloning shares the same script and history.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDepot {
    state: Rc<RefCell<State>>,
}

impl ScriptedDepot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `reply` for the next unanswered `command` (e.g. `"sync"`).
    pub fn push(&self, command: &str, reply: Reply) -> &Self {
        self.state
            .borrow_mut()
            .queued
            .entry(command.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    /// Answers `command` with `reply` whenever its queue is empty.
    pub fn always(&self, command: &str, reply: Reply) -> &Self {
        self.state
            .borrow_mut()
            .fallback
            .insert(command.to_string(), reply);
        self
    }

    /// Makes every subsequent `connect` fail.
    pub fn refuse_connections(&self) -> &Self {
        self.state.borrow_mut().refuse_connections = true;
        self
    }

    /// Every command issued so far, in order.
    pub fn issued(&self) -> Vec<DepotCommand> {
        self.state.borrow().issued.clone()
    }

    pub fn issued_named(&self, name: &str) -> Vec<DepotCommand> {
        self.issued().into_iter().filter(|c| c.name == name).collect()
    }

    pub fn connections_opened(&self) -> usize {
        self.state.borrow().opened
    }

    pub fn connections_released(&self) -> usize {
        self.state.borrow().released
    }

    /// A client bound to this script without going through `connect`.
    pub fn client(&self) -> ScriptedClient {
        self.state.borrow_mut().opened += 1;
        ScriptedClient {
            state: Rc::clone(&self.state),
        }
    }
}

impl DepotConnector for ScriptedDepot {
    type Client = ScriptedClient;

    fn connect(&self, _settings: &ConnectionSettings) -> Result<ScriptedClient, DepotError> {
        if self.state.borrow().refuse_connections {
            return Err(DepotError::Connection {
                message: "connection refused".to_string(),
            });
        }
        Ok(self.client())
    }
}

/// A connection handed out by [`ScriptedDepot`]; records its release on drop.
#[derive(Debug)]
pub struct ScriptedClient {
    state: Rc<RefCell<State>>,
}

impl DepotClient for ScriptedClient {
    fn run(&mut self, command: &DepotCommand) -> Result<CommandOutput, DepotError> {
        let mut state = self.state.borrow_mut();
        state.issued.push(command.clone());
        let queued = state
            .queued
            .get_mut(&command.name)
            .and_then(VecDeque::pop_front);
        let reply = match queued {
            Some(reply) => Some(reply),
            None => state.fallback.get(&command.name).cloned(),
        };
        match reply {
            Some(reply) => reply.materialise(command),
            None => Ok(CommandOutput::default()),
        }
    }
}

impl Drop for ScriptedClient {
    fn drop(&mut self) {
        self.state.borrow_mut().released += 1;
    }
}
