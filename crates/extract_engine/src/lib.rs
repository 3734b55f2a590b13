//! Extraction engine: drives the core state machine against a remote page.
mod channel;
mod controller;
mod effects;
mod listener;
mod settings;

pub use channel::{ChannelError, RemoteChannel};
pub use controller::{SessionController, SessionHandle};
pub use listener::{MessageListener, Subscription};
pub use settings::EngineSettings;
