use thiserror::Error;

/// Failure delivering an event to the requesting client
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ListenerError {
    #[error("listener channel closed")]
    ChannelClosed,
    #[error("listener delivery failed: {0}")]
    Delivery(String),
}

/// Death-link bookkeeping failures on a [`crate::ClientToken`]
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// The owning process already died; nothing can be linked anymore
    #[error("client process is already dead")]
    AlreadyDead,
    /// The link was already removed, either by a previous unlink or by the
    /// death notification consuming it
    #[error("death recipient is not linked")]
    NotLinked,
}
