pub mod confirmations;
pub mod error;
pub mod lifecycle;
pub mod permissions;
pub mod platform;
pub mod resolve;
pub mod transcript;

#[cfg(test)]
mod testing;

pub use confirmations::{CloseKey, ConfirmationStore, MemoryConfirmations};
pub use error::{PlatformError, TicketError};
pub use lifecycle::{ClosedTicket, Controller, TicketSettings};
pub use platform::Platform;
