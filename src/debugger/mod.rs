pub mod address;
pub mod decode;
pub mod error;
pub mod protocol;
pub mod register;
pub mod session;
pub mod transport;
pub mod watcher;

pub use address::{AddressWindow, Cursor, Direction, Magnitude, NavigationMove, ViewKind};
pub use error::{DecodeError, Error};
pub use session::{DebugSession, SessionOptions, SessionState, TargetState};
pub use transport::{StreamTransport, Transport};

/// Notifications about target events that happen outside of a request cycle.
pub trait EventHook: Send + Sync + 'static {
    /// Target transitions into stopped state. Called exactly once per transition.
    fn on_stop(&self);

    /// Background polling of the debug channel fails.
    fn on_error(&self, error: &Error);
}
