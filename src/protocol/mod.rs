pub mod nbt;
pub mod packet;
pub mod registry;
pub mod serverbound;
pub mod varint;

/// Protocol 761 (1.19.3); the clientbound id tables in [`registry`] match
/// this version.
pub const PROTOCOL_VERSION: i32 = 761;

/// Packets cannot be larger than 2^21 - 1 bytes, the maximum that fits in
/// a 3-byte VarInt length prefix.
pub const MAX_PACKET_LENGTH: usize = 2_097_151;
