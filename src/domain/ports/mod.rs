//! Port definitions.

mod cabinet;
mod client_port;
mod gateway;

pub use cabinet::Cabinet;
#[cfg(test)]
pub use client_port::MockClientPort;
pub use client_port::{
    AllowedMentions, ClientPort, FileReader, OutgoingFile, SendMessageRequest,
};
pub use gateway::{Event, EventFilter};
