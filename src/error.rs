use thiserror::Error;

use crate::protocol::registry::ConnectionState;

/// Errors raised while decoding inbound bytes. A VarInt-framed stream cannot
/// be resynchronized after any of these, so they always terminate the
/// connection.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("varint did not terminate within {max_bytes} bytes")]
    UnterminatedVarInt { max_bytes: usize },
    #[error("unexpected end of packet")]
    UnexpectedEnd,
    #[error("invalid boolean byte {0:#04x}")]
    InvalidBool(u8),
    #[error("got a string with a negative length ({0})")]
    NegativeStringLength(i32),
    #[error("string length {length} exceeds limit of {max_code_points} code points")]
    StringTooLong {
        length: usize,
        max_code_points: usize,
    },
    #[error("string is not valid UTF-8")]
    InvalidUtf8,
    #[error("invalid packet length {0}")]
    InvalidPacketLength(i32),
    #[error("trailing data in packet ({0} bytes left unread)")]
    TrailingData(usize),
    #[error("unknown NBT tag id {0}")]
    UnknownNbtTag(u8),
    #[error("NBT {0} tags are not implemented")]
    UnimplementedNbtTag(&'static str),
    #[error("unexpected TAG_End")]
    UnexpectedNbtEnd,
    #[error("invalid palette length {0}")]
    InvalidPaletteLength(i32),
    #[error("invalid palette bit width {0}")]
    InvalidBitsPerEntry(u8),
    #[error("packed data array too short: {got} words, need {need}")]
    ShortDataArray { got: usize, need: usize },
    #[error("invalid data array length {0}")]
    InvalidDataArrayLength(i32),
    #[error("palette index {index} out of range for palette of {palette_len}")]
    PaletteIndexOutOfRange { index: usize, palette_len: usize },
    #[error("invalid chunk data size {0}")]
    InvalidChunkDataSize(i32),
}

/// Errors raised while encoding outbound packets: the caller asked for
/// something the wire format cannot represent.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("string of {length} bytes exceeds limit of {max_code_points} code points")]
    StringTooLong {
        length: usize,
        max_code_points: usize,
    },
    #[error("packet body of {0} bytes exceeds the protocol maximum")]
    PacketTooLarge(usize),
}

/// Socket-level failures. EOF is its own variant so callers can tell a peer
/// hangup from a local IO fault.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection closed by peer")]
    Eof,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Top-level error for everything the protocol core can fail with.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// The server asked for a protocol feature this client does not
    /// implement yet (encryption, compression). Surfaced to the connection
    /// owner instead of aborting.
    #[error("unsupported protocol feature: {0}")]
    Unsupported(&'static str),
    /// Either the server sent garbage or the id belongs to a different
    /// connection state; id spaces are scoped per state.
    #[error("invalid packet id {id:#04x} in state {state:?}")]
    InvalidPacketId { state: ConnectionState, id: i32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_wraps_into_protocol_error() {
        let err: ProtocolError = DecodeError::TrailingData(3).into();
        assert!(matches!(err, ProtocolError::Decode(_)));
        assert_eq!(
            err.to_string(),
            "decode error: trailing data in packet (3 bytes left unread)"
        );
    }

    #[test]
    fn test_transport_eof_display() {
        let err = TransportError::Eof;
        assert_eq!(err.to_string(), "connection closed by peer");
    }
}
