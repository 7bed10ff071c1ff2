//! Application services gluing the domain to the transport layer.

pub mod notify;
pub mod pairing;
pub mod session;
pub mod status;

pub use notify::NotificationSink;
pub use pairing::PairingService;
pub use session::{SessionController, SessionDomainEvent, SessionHandle};
pub use status::StatusService;
