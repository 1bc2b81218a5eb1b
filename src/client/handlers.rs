//! Clientbound packet handlers and the dispatch table. Each packet type
//! decodes itself from a budget-scoped reader and then runs against the
//! client; the table maps (state, id) to a monomorphized entry point so
//! dispatch itself stays a linear scan over a static slice.

use tracing::{debug, info, trace, warn};

use crate::client::{Client, ProfileProperty, ServerStatus};
use crate::error::{DecodeError, ProtocolError};
use crate::protocol::nbt::Tag;
use crate::protocol::packet::{PacketReader, PacketWriter, Position, SliceSource};
use crate::protocol::registry::{clientbound_name, ConnectionState};
use crate::protocol::serverbound;
use crate::world::{BlockRegistry, ChunkSection};

/// A decodable incoming packet. `decode` must consume exactly the payload;
/// the receive loop rejects the packet if anything is left over.
pub(crate) trait ClientboundPacket: Sized {
    const STATE: ConnectionState;
    const ID: i32;

    fn decode(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError>;
    fn handle(self, client: &mut Client) -> Result<(), ProtocolError>;
}

type HandlerFn = fn(&mut Client, &mut PacketReader<'_>) -> Result<(), ProtocolError>;

fn run<P: ClientboundPacket>(
    client: &mut Client,
    reader: &mut PacketReader<'_>,
) -> Result<(), ProtocolError> {
    P::decode(reader)?.handle(client)
}

struct Entry {
    state: ConnectionState,
    id: i32,
    run: HandlerFn,
}

const fn entry<P: ClientboundPacket>() -> Entry {
    Entry {
        state: P::STATE,
        id: P::ID,
        run: run::<P>,
    }
}

static HANDLERS: &[Entry] = &[
    entry::<StatusResponse>(),
    entry::<PongResponse>(),
    entry::<LoginDisconnect>(),
    entry::<EncryptionRequest>(),
    entry::<GameProfile>(),
    entry::<LoginCompression>(),
    entry::<CustomQuery>(),
    entry::<KeepAlive>(),
    entry::<PlayCustomPayload>(),
    entry::<PlayDisconnect>(),
    entry::<PlayLogin>(),
    entry::<LevelChunkWithLight>(),
];

/// High-frequency entity and movement play packets dropped without even a
/// trace line; logging these drowns everything else.
static SILENCED_PLAY_IDS: &[i32] = &[0, 25, 39, 40, 41, 58, 62, 78, 80, 90, 100, 102];

/// Routes one packet body. Unregistered (state, id) pairs are a protocol
/// error, which also catches ids that are only valid in another state.
/// Registered ids without a handler are logged and drained.
pub(crate) fn dispatch(
    client: &mut Client,
    id: i32,
    reader: &mut PacketReader<'_>,
) -> Result<(), ProtocolError> {
    let state = client.state();
    for handler in HANDLERS {
        if handler.state == state && handler.id == id {
            return (handler.run)(client, reader);
        }
    }
    let Some(name) = clientbound_name(state, id) else {
        return Err(ProtocolError::InvalidPacketId { state, id });
    };
    if !(state == ConnectionState::Play && SILENCED_PLAY_IDS.contains(&id)) {
        trace!(%state, id, name, "discarding unhandled packet");
    }
    reader.discard(reader.remaining())?;
    Ok(())
}

struct StatusResponse {
    json: String,
}

impl ClientboundPacket for StatusResponse {
    const STATE: ConnectionState = ConnectionState::Status;
    const ID: i32 = 0x00;

    fn decode(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            json: reader.read_string(crate::protocol::packet::MAX_STRING_CODE_POINTS)?,
        })
    }

    fn handle(self, client: &mut Client) -> Result<(), ProtocolError> {
        match serde_json::from_str::<ServerStatus>(&self.json) {
            Ok(status) => {
                info!(
                    version = %status.version.name,
                    protocol = status.version.protocol,
                    "received server status"
                );
                client.set_status(self.json, Some(status));
            }
            Err(err) => {
                // Keep the raw document even when the model does not fit;
                // the owner may still want to display it.
                warn!(%err, "status response json did not match the model");
                client.set_status(self.json, None);
            }
        }
        Ok(())
    }
}

struct PongResponse {
    payload: i64,
}

impl ClientboundPacket for PongResponse {
    const STATE: ConnectionState = ConnectionState::Status;
    const ID: i32 = 0x01;

    fn decode(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            payload: reader.read_i64()?,
        })
    }

    fn handle(self, client: &mut Client) -> Result<(), ProtocolError> {
        debug!(payload = self.payload, "pong");
        client.set_last_pong(self.payload);
        Ok(())
    }
}

struct LoginDisconnect {
    reason: String,
}

impl ClientboundPacket for LoginDisconnect {
    const STATE: ConnectionState = ConnectionState::Login;
    const ID: i32 = 0x00;

    fn decode(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            reason: reader.read_string(crate::protocol::packet::MAX_STRING_CODE_POINTS)?,
        })
    }

    fn handle(self, client: &mut Client) -> Result<(), ProtocolError> {
        warn!(reason = %self.reason, "disconnected during login");
        client.set_disconnect_reason(self.reason);
        Ok(())
    }
}

/// Online-mode servers open the login with this; we cannot answer it.
struct EncryptionRequest;

impl ClientboundPacket for EncryptionRequest {
    const STATE: ConnectionState = ConnectionState::Login;
    const ID: i32 = 0x01;

    fn decode(_reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self)
    }

    fn handle(self, _client: &mut Client) -> Result<(), ProtocolError> {
        Err(ProtocolError::Unsupported("encryption"))
    }
}

struct GameProfile {
    uuid: uuid::Uuid,
    name: String,
    properties: Vec<ProfileProperty>,
}

impl ClientboundPacket for GameProfile {
    const STATE: ConnectionState = ConnectionState::Login;
    const ID: i32 = 0x02;

    fn decode(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        let uuid = reader.read_uuid()?;
        let name = reader.read_string(16)?;
        let count = reader.read_varint()?;
        let mut properties = Vec::new();
        for _ in 0..count.max(0) {
            let name = reader.read_string(64)?;
            let value = reader.read_string(crate::protocol::packet::MAX_STRING_CODE_POINTS)?;
            let signature = if reader.read_bool()? {
                Some(reader.read_string(1024)?)
            } else {
                None
            };
            properties.push(ProfileProperty {
                name,
                value,
                signature,
            });
        }
        Ok(Self {
            uuid,
            name,
            properties,
        })
    }

    fn handle(self, client: &mut Client) -> Result<(), ProtocolError> {
        info!(uuid = %self.uuid, name = %self.name, "login succeeded");
        client.set_state(ConnectionState::Play);
        client.set_profile(self.uuid, self.name, self.properties);

        // First play-state packets: identify the brand, then settings.
        let mut brand = PacketWriter::new();
        brand.write_string("vanilla", 128)?;
        client.queue_send(&serverbound::CustomPayload {
            channel: "minecraft:brand".to_owned(),
            data: brand.into_inner(),
        })?;
        client.queue_send(&serverbound::ClientInformation::default())?;
        Ok(())
    }
}

/// Compression threshold announcement; the frame codec here has no
/// compressed path.
struct LoginCompression;

impl ClientboundPacket for LoginCompression {
    const STATE: ConnectionState = ConnectionState::Login;
    const ID: i32 = 0x03;

    fn decode(_reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self)
    }

    fn handle(self, _client: &mut Client) -> Result<(), ProtocolError> {
        Err(ProtocolError::Unsupported("compression"))
    }
}

struct CustomQuery {
    message_id: i32,
    channel: String,
}

impl ClientboundPacket for CustomQuery {
    const STATE: ConnectionState = ConnectionState::Login;
    const ID: i32 = 0x04;

    fn decode(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        let message_id = reader.read_varint()?;
        let channel = reader.read_identifier()?;
        reader.discard(reader.remaining())?;
        Ok(Self {
            message_id,
            channel,
        })
    }

    fn handle(self, client: &mut Client) -> Result<(), ProtocolError> {
        trace!(channel = %self.channel, "answering login plugin request as not understood");
        client.queue_send(&serverbound::CustomQueryAnswer {
            message_id: self.message_id,
            understood: false,
        })?;
        Ok(())
    }
}

struct KeepAlive {
    keep_alive_id: i64,
}

impl ClientboundPacket for KeepAlive {
    const STATE: ConnectionState = ConnectionState::Play;
    const ID: i32 = 31;

    fn decode(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            keep_alive_id: reader.read_i64()?,
        })
    }

    fn handle(self, client: &mut Client) -> Result<(), ProtocolError> {
        trace!(id = self.keep_alive_id, "keep alive");
        client.queue_send(&serverbound::KeepAlive {
            keep_alive_id: self.keep_alive_id,
        })?;
        Ok(())
    }
}

struct PlayCustomPayload {
    channel: String,
    data: Vec<u8>,
}

impl ClientboundPacket for PlayCustomPayload {
    const STATE: ConnectionState = ConnectionState::Play;
    const ID: i32 = 21;

    fn decode(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        let channel = reader.read_identifier()?;
        let data = reader.read_byte_array(reader.remaining())?;
        Ok(Self { channel, data })
    }

    fn handle(self, _client: &mut Client) -> Result<(), ProtocolError> {
        if self.channel == "minecraft:brand" {
            let mut source = SliceSource::new(&self.data);
            let mut reader = PacketReader::new(&mut source, self.data.len());
            let brand = reader.read_string(128)?;
            debug!(%brand, "server brand");
        } else {
            trace!(channel = %self.channel, bytes = self.data.len(), "plugin message");
        }
        Ok(())
    }
}

struct PlayDisconnect {
    reason: String,
}

impl ClientboundPacket for PlayDisconnect {
    const STATE: ConnectionState = ConnectionState::Play;
    const ID: i32 = 23;

    fn decode(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            reason: reader.read_string(crate::protocol::packet::MAX_STRING_CODE_POINTS)?,
        })
    }

    fn handle(self, client: &mut Client) -> Result<(), ProtocolError> {
        warn!(reason = %self.reason, "disconnected");
        client.set_disconnect_reason(self.reason);
        Ok(())
    }
}

/// Play-state login. Everything is parsed so the stream stays aligned;
/// only a few fields are kept.
struct PlayLogin {
    entity_id: i32,
    gamemode: u8,
    dimension_name: String,
    view_distance: i32,
    simulation_distance: i32,
}

impl ClientboundPacket for PlayLogin {
    const STATE: ConnectionState = ConnectionState::Play;
    const ID: i32 = 36;

    fn decode(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        let entity_id = reader.read_i32()?;
        let _hardcore = reader.read_bool()?;
        let gamemode = reader.read_u8()?;
        let _previous_gamemode = reader.read_i8()?;
        let dimension_count = reader.read_varint()?;
        for _ in 0..dimension_count.max(0) {
            let _ = reader.read_identifier()?;
        }
        let (_, _registry_codec) = Tag::read_root(reader)?;
        let _dimension_type = reader.read_identifier()?;
        let dimension_name = reader.read_identifier()?;
        let _hashed_seed = reader.read_i64()?;
        let _max_players = reader.read_varint()?;
        let view_distance = reader.read_varint()?;
        let simulation_distance = reader.read_varint()?;
        let _reduced_debug_info = reader.read_bool()?;
        let _show_respawn_screen = reader.read_bool()?;
        let _is_debug = reader.read_bool()?;
        let _is_flat = reader.read_bool()?;
        if reader.read_bool()? {
            let _death_dimension = reader.read_identifier()?;
            let _death_position: Position = reader.read_position()?;
        }
        Ok(Self {
            entity_id,
            gamemode,
            dimension_name,
            view_distance,
            simulation_distance,
        })
    }

    fn handle(self, client: &mut Client) -> Result<(), ProtocolError> {
        info!(
            entity_id = self.entity_id,
            gamemode = self.gamemode,
            dimension = %self.dimension_name,
            view_distance = self.view_distance,
            simulation_distance = self.simulation_distance,
            "joined world"
        );
        client.set_entity_id(self.entity_id);
        Ok(())
    }
}

struct LevelChunkWithLight {
    chunk_x: i32,
    chunk_z: i32,
    sections: Vec<ChunkSection>,
}

impl ClientboundPacket for LevelChunkWithLight {
    const STATE: ConnectionState = ConnectionState::Play;
    const ID: i32 = 32;

    fn decode(reader: &mut PacketReader<'_>) -> Result<Self, DecodeError> {
        let chunk_x = reader.read_i32()?;
        let chunk_z = reader.read_i32()?;
        let (_, _heightmaps) = Tag::read_root(reader)?;
        let size = reader.read_varint()?;
        if size < 0 {
            return Err(DecodeError::InvalidChunkDataSize(size));
        }
        // Sections come out of a sub-reader scoped to the declared byte
        // count, so a misaligned section decode cannot eat into the block
        // entities that follow.
        let registry = BlockRegistry;
        let mut sections = Vec::new();
        {
            let mut data = reader.sub_reader(size as usize);
            while data.remaining() > 0 {
                sections.push(ChunkSection::decode(&mut data, &registry)?);
            }
        }
        let block_entity_count = reader.read_varint()?;
        for _ in 0..block_entity_count.max(0) {
            let _packed_xz = reader.read_u8()?;
            let _y = reader.read_i16()?;
            let _kind = reader.read_varint()?;
            let _ = Tag::read_optional_root(reader)?;
        }
        // Light arrays are not consumed field by field.
        reader.discard(reader.remaining())?;
        Ok(Self {
            chunk_x,
            chunk_z,
            sections,
        })
    }

    fn handle(self, client: &mut Client) -> Result<(), ProtocolError> {
        trace!(
            x = self.chunk_x,
            z = self.chunk_z,
            sections = self.sections.len(),
            "decoded chunk column"
        );
        let column = client.world_mut().column_mut(self.chunk_x, self.chunk_z);
        for (index, section) in self.sections.into_iter().enumerate() {
            column.replace_section(index, section);
        }
        Ok(())
    }
}
