//! Asynchronous Minecraft protocol client core: VarInt framing, typed
//! packet IO, NBT decoding, state-gated dispatch and chunk decoding.
//! Rendering, assets and input live elsewhere and consume the decoded
//! state this crate exposes.

pub mod client;
pub mod error;
pub mod net;
pub mod protocol;
pub mod world;
