//! Client liveness tracking.
//!
//! A [`ClientToken`] stands for the requesting client process. Sessions link
//! themselves to it and are notified exactly once when the process goes
//! away. [`watch_process`] backs a token with a real pid.

use crate::error::TokenError;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

/// Receives the one-shot notification that a client process died
pub trait DeathRecipient: Send + Sync {
    fn client_died(&self);
}

/// Handle for one death link, used to unlink it later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(u64);

struct TokenState {
    alive: bool,
    next_link: u64,
    recipients: Vec<(LinkId, Weak<dyn DeathRecipient>)>,
}

/// Opaque identity of a client process
pub struct ClientToken {
    pid: Option<u32>,
    state: Mutex<TokenState>,
}

impl ClientToken {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pid: None,
            state: Mutex::new(TokenState {
                alive: true,
                next_link: 1,
                recipients: Vec::new(),
            }),
        }
    }

    #[must_use]
    pub fn for_process(pid: u32) -> Self {
        Self {
            pid: Some(pid),
            ..Self::new()
        }
    }

    #[must_use]
    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.lock().alive
    }

    #[must_use]
    pub fn linked_count(&self) -> usize {
        self.lock().recipients.len()
    }

    /// Register `recipient` to be told when the client dies.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::AlreadyDead`] if the death was already delivered
    pub fn link_to_death(&self, recipient: Weak<dyn DeathRecipient>) -> Result<LinkId, TokenError> {
        let mut state = self.lock();
        if !state.alive {
            return Err(TokenError::AlreadyDead);
        }
        let link = LinkId(state.next_link);
        state.next_link += 1;
        state.recipients.push((link, recipient));
        Ok(link)
    }

    /// Remove a link created by [`Self::link_to_death`].
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::NotLinked`] if the link was already removed or
    /// consumed by a death notification
    pub fn unlink_to_death(&self, link: LinkId) -> Result<(), TokenError> {
        let mut state = self.lock();
        let before = state.recipients.len();
        state.recipients.retain(|(id, _)| *id != link);
        if state.recipients.len() == before {
            return Err(TokenError::NotLinked);
        }
        Ok(())
    }

    /// Mark the client dead and notify every linked recipient once.
    ///
    /// Returns how many recipients were notified; later calls notify nobody.
    pub fn notify_death(&self) -> usize {
        let recipients = {
            let mut state = self.lock();
            if !state.alive {
                return 0;
            }
            state.alive = false;
            std::mem::take(&mut state.recipients)
        };

        // Token lock is released here so recipients may unlink or inspect it
        let mut notified = 0;
        for (_, recipient) in recipients {
            if let Some(recipient) = recipient.upgrade() {
                recipient.client_died();
                notified += 1;
            }
        }
        notified
    }

    fn lock(&self) -> MutexGuard<'_, TokenState> {
        self.state.lock().unwrap_or_else(|poisoned| {
            log::warn!("Recovering poisoned client token lock");
            poisoned.into_inner()
        })
    }
}

impl Default for ClientToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ClientToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientToken")
            .field("pid", &self.pid)
            .field("alive", &self.is_alive())
            .finish_non_exhaustive()
    }
}

/// Poll `pid` until it exits, then deliver the token's death notification.
///
/// Returns early if the token was already notified by someone else.
pub async fn watch_process(token: Arc<ClientToken>, pid: u32, poll_interval: Duration) {
    let mut interval = tokio::time::interval(poll_interval);
    loop {
        interval.tick().await;
        if !token.is_alive() {
            log::debug!("Token for pid {pid} already dead, watcher exiting");
            return;
        }
        if !process_alive(pid) {
            log::info!("Client process {pid} exited, notifying death recipients");
            token.notify_death();
            return;
        }
    }
}

/// Whether `pid` names a live process. A process owned by another user
/// counts as alive.
#[cfg(unix)]
#[must_use]
pub fn process_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // SAFETY: signal 0 only performs the existence and permission checks.
    let rc = unsafe { libc::kill(pid, 0) };
    rc == 0 || std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
#[must_use]
pub fn process_alive(_pid: u32) -> bool {
    true
}
