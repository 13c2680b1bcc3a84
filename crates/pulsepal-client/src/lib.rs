//! Device session, transports, and configuration for the Pulse Pal
//! stimulus generator.

pub mod config;
pub mod session;
pub mod transport;

pub use config::{ClientConfig, ConfigError};
pub use session::{PulsePal, SessionError};
pub use transport::Transport;
