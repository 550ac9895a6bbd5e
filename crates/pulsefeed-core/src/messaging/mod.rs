//! Per-user message lifecycle: the chat transport port and the registry
//! that tracks everything currently displayed in a user's chat.

pub mod registry;
pub mod transport;

pub use registry::MessageRegistry;
pub use transport::ChatTransport;
