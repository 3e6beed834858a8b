//! Small async helpers shared by the agent loop and the model client.

pub mod retry;
pub mod timeout;
pub mod text;
