//! Connection state machine and the per-connection receive loop. One
//! [`Client`] owns one socket; the caller drives it from a single task, so
//! packet handling never overlaps.

mod handlers;

use serde::Deserialize;
use tracing::trace;
use uuid::Uuid;

use crate::error::{DecodeError, EncodeError, ProtocolError};
use crate::net::transport::Transport;
use crate::protocol::packet::{PacketReader, PacketWriter, SliceSource};
use crate::protocol::registry::ConnectionState;
use crate::protocol::serverbound::{
    Hello, Intention, NextState, PingRequest, ServerboundPacket, StatusRequest,
};
use crate::protocol::{MAX_PACKET_LENGTH, PROTOCOL_VERSION};
use crate::world::World;

/// Status-response JSON model. Servers add vendor fields freely, so the
/// description is kept as a raw document.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerStatus {
    pub version: ServerVersion,
    #[serde(default)]
    pub players: Option<ServerPlayers>,
    #[serde(default)]
    pub description: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerVersion {
    pub name: String,
    pub protocol: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerPlayers {
    pub max: i32,
    pub online: i32,
    #[serde(default)]
    pub sample: Vec<PlayerSample>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerSample {
    pub name: String,
    pub id: String,
}

/// One entry of the game profile's property list (textures and the like).
#[derive(Debug, Clone)]
pub struct ProfileProperty {
    pub name: String,
    pub value: String,
    pub signature: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GameProfile {
    pub uuid: Uuid,
    pub name: String,
    pub properties: Vec<ProfileProperty>,
}

pub struct Client {
    transport: Transport,
    state: ConnectionState,
    server_address: String,
    server_port: u16,
    username: String,
    world: World,
    status_json: Option<String>,
    status: Option<ServerStatus>,
    last_pong: Option<i64>,
    profile: Option<GameProfile>,
    entity_id: Option<i32>,
    disconnect_reason: Option<String>,
}

impl Client {
    pub async fn connect(
        address: &str,
        port: u16,
        username: &str,
    ) -> Result<Self, ProtocolError> {
        let transport = Transport::connect(address, port).await?;
        Ok(Self::over(transport, address, port, username))
    }

    /// Wraps an already-connected transport; tests pair this with a
    /// scripted listener.
    pub fn over(transport: Transport, address: &str, port: u16, username: &str) -> Self {
        Self {
            transport,
            state: ConnectionState::Handshaking,
            server_address: address.to_owned(),
            server_port: port,
            username: username.to_owned(),
            world: World::default(),
            status_json: None,
            status: None,
            last_pong: None,
            profile: None,
            entity_id: None,
            disconnect_reason: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn status(&self) -> Option<&ServerStatus> {
        self.status.as_ref()
    }

    pub fn status_json(&self) -> Option<&str> {
        self.status_json.as_deref()
    }

    pub fn last_pong(&self) -> Option<i64> {
        self.last_pong
    }

    pub fn profile(&self) -> Option<&GameProfile> {
        self.profile.as_ref()
    }

    pub fn entity_id(&self) -> Option<i32> {
        self.entity_id
    }

    pub fn disconnect_reason(&self) -> Option<&str> {
        self.disconnect_reason.as_deref()
    }

    pub(crate) fn set_state(&mut self, state: ConnectionState) {
        trace!(from = %self.state, to = %state, "state transition");
        self.state = state;
    }

    pub(crate) fn set_status(&mut self, json: String, status: Option<ServerStatus>) {
        self.status_json = Some(json);
        self.status = status;
    }

    pub(crate) fn set_last_pong(&mut self, payload: i64) {
        self.last_pong = Some(payload);
    }

    pub(crate) fn set_profile(
        &mut self,
        uuid: Uuid,
        name: String,
        properties: Vec<ProfileProperty>,
    ) {
        self.profile = Some(GameProfile {
            uuid,
            name,
            properties,
        });
    }

    pub(crate) fn set_entity_id(&mut self, entity_id: i32) {
        self.entity_id = Some(entity_id);
    }

    pub(crate) fn set_disconnect_reason(&mut self, reason: String) {
        self.disconnect_reason = Some(reason);
    }

    /// Frames a packet into the outgoing buffer: VarInt(total length),
    /// VarInt(id), payload. Nothing touches the socket until a flush.
    pub(crate) fn queue_send<P: ServerboundPacket>(
        &mut self,
        packet: &P,
    ) -> Result<(), EncodeError> {
        debug_assert!(P::STATE == self.state);
        let mut body = PacketWriter::new();
        body.write_varint(P::ID);
        packet.write(&mut body)?;
        if body.len() > MAX_PACKET_LENGTH {
            return Err(EncodeError::PacketTooLarge(body.len()));
        }
        let mut frame = PacketWriter::new();
        frame.write_varint(body.len() as i32);
        self.transport.queue_bytes(frame.as_slice());
        self.transport.queue_bytes(body.as_slice());
        trace!(state = %self.state, id = P::ID, bytes = body.len(), "queued packet");
        Ok(())
    }

    pub async fn send<P: ServerboundPacket>(&mut self, packet: &P) -> Result<(), ProtocolError> {
        self.queue_send(packet)?;
        self.transport.flush().await?;
        Ok(())
    }

    /// Sends the handshake intention and flips the local state to match;
    /// this is the only client-initiated transition.
    pub async fn handshake(&mut self, next_state: NextState) -> Result<(), ProtocolError> {
        let intention = Intention {
            protocol_version: PROTOCOL_VERSION,
            server_address: self.server_address.clone(),
            server_port: self.server_port,
            next_state,
        };
        self.send(&intention).await?;
        self.set_state(match next_state {
            NextState::Status => ConnectionState::Status,
            NextState::Login => ConnectionState::Login,
        });
        Ok(())
    }

    pub async fn request_status(&mut self) -> Result<(), ProtocolError> {
        self.send(&StatusRequest).await
    }

    pub async fn ping(&mut self, payload: i64) -> Result<(), ProtocolError> {
        self.send(&PingRequest { payload }).await
    }

    /// Starts an offline login with the configured username and no
    /// declared uuid.
    pub async fn login(&mut self) -> Result<(), ProtocolError> {
        let hello = Hello {
            name: self.username.clone(),
            uuid: None,
        };
        self.send(&hello).await
    }

    /// Receives and dispatches exactly one packet, then flushes whatever
    /// the handler queued in response.
    pub async fn receive_packet(&mut self) -> Result<(), ProtocolError> {
        let length = self.read_frame_length().await?;
        if length <= 0 || length as usize > MAX_PACKET_LENGTH {
            return Err(DecodeError::InvalidPacketLength(length).into());
        }
        let length = length as usize;
        self.transport.recv_until(length).await?;

        // The body is drained out of the transport so handlers can borrow
        // the client mutably while reading it.
        let mut body = Vec::with_capacity(length);
        for _ in 0..length {
            body.push(self.transport.pop_byte()?);
        }
        let mut source = SliceSource::new(&body);
        let mut reader = PacketReader::new(&mut source, length);
        let id = reader.read_varint()?;
        handlers::dispatch(self, id, &mut reader)?;
        let left = reader.remaining();
        if left != 0 {
            return Err(DecodeError::TrailingData(left).into());
        }
        self.transport.flush().await?;
        Ok(())
    }

    /// Drives the receive loop until a failure; a clean server hangup
    /// surfaces as a transport EOF error.
    pub async fn run(&mut self) -> ProtocolError {
        loop {
            if let Err(err) = self.receive_packet().await {
                return err;
            }
        }
    }

    /// Frame length prefix, read byte-at-a-time because it arrives before
    /// the body length is known.
    async fn read_frame_length(&mut self) -> Result<i32, ProtocolError> {
        let mut bytes = [0u8; crate::protocol::varint::MAX_VARINT_BYTES];
        let mut filled = 0;
        loop {
            let byte = self.transport.next_byte().await?;
            bytes[filled] = byte;
            filled += 1;
            if byte & 0x80 == 0 || filled == bytes.len() {
                break;
            }
        }
        let mut iter = bytes[..filled].iter().copied();
        let length = crate::protocol::varint::read_varint(|| {
            iter.next().ok_or(DecodeError::UnterminatedVarInt {
                max_bytes: crate::protocol::varint::MAX_VARINT_BYTES,
            })
        })?;
        Ok(length)
    }
}
