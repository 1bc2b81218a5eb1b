//! Serverbound packet definitions. Each packet knows its state-scoped id
//! and how to encode its payload; framing and the length prefix are the
//! client's job.

use uuid::Uuid;

use crate::error::EncodeError;
use crate::protocol::packet::PacketWriter;
use crate::protocol::registry::ConnectionState;

/// An encodable outgoing packet.
pub trait ServerboundPacket {
    /// State this packet's id lives in.
    const STATE: ConnectionState;
    /// State-scoped packet id.
    const ID: i32;

    fn write(&self, writer: &mut PacketWriter) -> Result<(), EncodeError>;
}

/// Target state declared by the handshake intention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextState {
    Status = 1,
    Login = 2,
}

/// Handshake intention, the first packet on every connection.
#[derive(Debug)]
pub struct Intention {
    pub protocol_version: i32,
    pub server_address: String,
    pub server_port: u16,
    pub next_state: NextState,
}

impl ServerboundPacket for Intention {
    const STATE: ConnectionState = ConnectionState::Handshaking;
    const ID: i32 = 0x00;

    fn write(&self, writer: &mut PacketWriter) -> Result<(), EncodeError> {
        writer.write_varint(self.protocol_version);
        writer.write_string(&self.server_address, 255)?;
        writer.write_u16(self.server_port);
        writer.write_varint(self.next_state as i32);
        Ok(())
    }
}

#[derive(Debug)]
pub struct StatusRequest;

impl ServerboundPacket for StatusRequest {
    const STATE: ConnectionState = ConnectionState::Status;
    const ID: i32 = 0x00;

    fn write(&self, _writer: &mut PacketWriter) -> Result<(), EncodeError> {
        Ok(())
    }
}

#[derive(Debug)]
pub struct PingRequest {
    pub payload: i64,
}

impl ServerboundPacket for PingRequest {
    const STATE: ConnectionState = ConnectionState::Status;
    const ID: i32 = 0x01;

    fn write(&self, writer: &mut PacketWriter) -> Result<(), EncodeError> {
        writer.write_i64(self.payload);
        Ok(())
    }
}

/// Login start. Offline servers accept any name; the uuid is optional.
#[derive(Debug)]
pub struct Hello {
    pub name: String,
    pub uuid: Option<Uuid>,
}

impl ServerboundPacket for Hello {
    const STATE: ConnectionState = ConnectionState::Login;
    const ID: i32 = 0x00;

    fn write(&self, writer: &mut PacketWriter) -> Result<(), EncodeError> {
        writer.write_string(&self.name, 16)?;
        writer.write_bool(self.uuid.is_some());
        if let Some(uuid) = self.uuid {
            writer.write_uuid(uuid);
        }
        Ok(())
    }
}

/// Reply to a login plugin request. We never understand the channel, so
/// `understood` is always false and no data follows.
#[derive(Debug)]
pub struct CustomQueryAnswer {
    pub message_id: i32,
    pub understood: bool,
}

impl ServerboundPacket for CustomQueryAnswer {
    const STATE: ConnectionState = ConnectionState::Login;
    const ID: i32 = 0x02;

    fn write(&self, writer: &mut PacketWriter) -> Result<(), EncodeError> {
        writer.write_varint(self.message_id);
        writer.write_bool(self.understood);
        Ok(())
    }
}

#[derive(Debug)]
pub struct KeepAlive {
    pub keep_alive_id: i64,
}

impl ServerboundPacket for KeepAlive {
    const STATE: ConnectionState = ConnectionState::Play;
    const ID: i32 = 0x11;

    fn write(&self, writer: &mut PacketWriter) -> Result<(), EncodeError> {
        writer.write_i64(self.keep_alive_id);
        Ok(())
    }
}

/// Plugin message, e.g. the client brand on "minecraft:brand".
#[derive(Debug)]
pub struct CustomPayload {
    pub channel: String,
    pub data: Vec<u8>,
}

impl ServerboundPacket for CustomPayload {
    const STATE: ConnectionState = ConnectionState::Play;
    const ID: i32 = 0x0c;

    fn write(&self, writer: &mut PacketWriter) -> Result<(), EncodeError> {
        writer.write_identifier(&self.channel)?;
        writer.write_bytes(&self.data);
        Ok(())
    }
}

#[derive(Debug)]
pub struct ClientInformation {
    pub locale: String,
    pub view_distance: i8,
    pub chat_mode: i32,
    pub chat_colors: bool,
    pub displayed_skin_parts: u8,
    pub main_hand: i32,
    pub enable_text_filtering: bool,
    pub allow_server_listings: bool,
}

impl Default for ClientInformation {
    fn default() -> Self {
        Self {
            locale: "en_us".to_owned(),
            view_distance: 10,
            chat_mode: 0,
            chat_colors: true,
            displayed_skin_parts: 0x7f,
            main_hand: 1,
            enable_text_filtering: false,
            allow_server_listings: true,
        }
    }
}

impl ServerboundPacket for ClientInformation {
    const STATE: ConnectionState = ConnectionState::Play;
    const ID: i32 = 0x07;

    fn write(&self, writer: &mut PacketWriter) -> Result<(), EncodeError> {
        writer.write_string(&self.locale, 16)?;
        writer.write_i8(self.view_distance);
        writer.write_varint(self.chat_mode);
        writer.write_bool(self.chat_colors);
        writer.write_u8(self.displayed_skin_parts);
        writer.write_varint(self.main_hand);
        writer.write_bool(self.enable_text_filtering);
        writer.write_bool(self.allow_server_listings);
        Ok(())
    }
}
