//! Direct messaging.

pub mod state;
pub mod sync;

pub use state::{ChatState, Ticket};
pub use sync::ChatSync;
