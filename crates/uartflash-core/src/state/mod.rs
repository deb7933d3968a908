//! State machine module.

pub mod handlers;
pub mod machine;

pub use handlers::{HandlerContext, enter_complete, handle_state};
pub use machine::ProtocolState;
