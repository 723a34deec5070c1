//! Conversation reconstruction and the session API.
//!
//! `assembler` turns protocol events into conversation mutations, `observers`
//! holds presentation callbacks, and `session` composes identity, history and
//! transport into the `SessionController` a front end consumes.

pub mod assembler;
pub mod observers;
pub mod session;

pub use assembler::{Applied, MessageAssembler};
pub use observers::{ObserverId, ToolActivity};
pub use session::SessionController;
