mod poll;
mod shutdown;

pub mod prelude {
    pub use crate::poll::{poll_until, PollError};
    pub use crate::shutdown::{DelegatedShutdownListener, ShutdownHandle, ShutdownSignalError};
}
