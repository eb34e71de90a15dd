pub mod error;
pub mod transport;
pub mod wake;

pub use error::BundlerError;
pub use transport::Transport;
pub use wake::WakeCoordinator;
