use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use workbench_terminal_protocol::{AgentStartFailure, ChannelResult, TerminalId};

/// How a `try_start` call concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// This caller's starter ran and succeeded.
    Started,
    /// The agent was already started (or another caller's in-flight start
    /// succeeded while we waited).
    AlreadyStarted,
    /// Not an agent-conversation terminal; the guard does not apply.
    NotEligible,
}

type PublishedResult = Option<Result<(), AgentStartFailure>>;

enum StartEntry {
    InFlight(watch::Receiver<PublishedResult>),
    Started,
}

/// Process-wide registry guaranteeing the agent-start sequence is issued at
/// most once per terminal id across widget remounts.
///
/// Injectable by design: the session-management layer owns one instance and
/// hands out clones, so tests never rely on ambient global state. The id is
/// registered *before* the starter runs, which closes the window where a
/// fast remount could race a second start in. Failures roll the
/// registration back so the user can retry after fixing the cause.
#[derive(Clone, Default)]
pub struct SessionStartGuard {
    entries: Arc<Mutex<HashMap<TerminalId, StartEntry>>>,
}

impl SessionStartGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_started(&self, id: &TerminalId) -> bool {
        matches!(self.lock().get(id), Some(StartEntry::Started))
    }

    /// Explicitly forget a terminal so a future `try_start` runs again.
    pub fn reset(&self, id: &TerminalId) {
        self.lock().remove(id);
    }

    /// Run `starter` at most once per terminal id. Concurrent callers during
    /// an in-flight start all observe the outcome of that one start.
    pub async fn try_start<F, Fut>(
        &self,
        id: &TerminalId,
        starter: F,
    ) -> Result<StartOutcome, AgentStartFailure>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ChannelResult<()>>,
    {
        if !id.is_top() {
            return Ok(StartOutcome::NotEligible);
        }

        enum Role {
            Leader(watch::Sender<PublishedResult>),
            Follower(watch::Receiver<PublishedResult>),
        }

        let role = {
            let mut entries = self.lock();
            match entries.get(id) {
                Some(StartEntry::Started) => return Ok(StartOutcome::AlreadyStarted),
                Some(StartEntry::InFlight(receiver)) => Role::Follower(receiver.clone()),
                None => {
                    let (sender, receiver) = watch::channel(None);
                    entries.insert(id.clone(), StartEntry::InFlight(receiver));
                    Role::Leader(sender)
                }
            }
        };

        match role {
            Role::Leader(sender) => {
                let result = match starter().await {
                    Ok(()) => {
                        self.lock().insert(id.clone(), StartEntry::Started);
                        Ok(())
                    }
                    Err(error) => {
                        self.lock().remove(id);
                        Err(AgentStartFailure::classify(&error.to_string()))
                    }
                };
                let _ = sender.send(Some(result.clone()));
                result.map(|()| StartOutcome::Started)
            }
            Role::Follower(mut receiver) => loop {
                if let Some(result) = receiver.borrow_and_update().clone() {
                    return result.map(|()| StartOutcome::AlreadyStarted);
                }
                if receiver.changed().await.is_err() {
                    // The leader went away without publishing. Drop the dead
                    // entry so a retry is possible.
                    let mut entries = self.lock();
                    if let Some(StartEntry::InFlight(stale)) = entries.get(id) {
                        if stale.has_changed().is_err() {
                            entries.remove(id);
                        }
                    }
                    return Err(AgentStartFailure::Other(
                        "agent start was interrupted".to_owned(),
                    ));
                }
            },
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TerminalId, StartEntry>> {
        self.entries
            .lock()
            .expect("session start registry lock poisoned")
    }
}
