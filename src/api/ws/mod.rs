//! WebSocket adapter and channel hub

mod frame;
mod hub;
mod socket;

pub use frame::{InboundFrame, MessageType, OutboundFrame};
pub use hub::{ChannelHub, FrameSender};
pub use socket::{ws_handler, SocketClient};
