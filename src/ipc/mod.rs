//! IPC codec and wire protocol — MessagePack framing.

pub mod codec;
pub mod protocol;
