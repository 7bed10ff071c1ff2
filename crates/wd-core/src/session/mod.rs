//! Pairing session domain model and state machine.

pub mod action;
pub mod event;
pub mod machine;
pub mod state;

pub use action::{SessionAction, TimerKind, REDIRECT_DELAY_SECS, REOPEN_DELAY_SECS};
pub use event::SessionEvent;
pub use machine::{PairingSession, ReopenPolicy, SessionStateMachine};
pub use state::SessionState;
