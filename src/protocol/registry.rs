//! Connection states and the clientbound packet id tables for protocol
//! 761. The tables are maintained offline from the protocol data dumps;
//! ids are only unique within a state, so every lookup is keyed by
//! (state, id).

use std::fmt;

/// Protocol-level mode that re-scopes the meaning of packet ids.
/// Handshaking is the initial, client-local state; the server never sends
/// packets in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Handshaking,
    Status,
    Login,
    Play,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Handshaking => write!(f, "handshaking"),
            ConnectionState::Status => write!(f, "status"),
            ConnectionState::Login => write!(f, "login"),
            ConnectionState::Play => write!(f, "play"),
        }
    }
}

/// Clientbound status ids, indexed by id.
pub static CLIENTBOUND_STATUS: &[&str] = &["status_response", "pong_response"];

/// Clientbound login ids, indexed by id.
pub static CLIENTBOUND_LOGIN: &[&str] = &[
    "login_disconnect",
    "hello",
    "game_profile",
    "login_compression",
    "custom_query",
];

/// Clientbound play ids, indexed by id.
pub static CLIENTBOUND_PLAY: &[&str] = &[
    "add_entity",
    "add_experience_orb",
    "add_player",
    "animate",
    "award_stats",
    "block_changed_ack",
    "block_destruction",
    "block_entity_data",
    "block_event",
    "block_update",
    "boss_event",
    "change_difficulty",
    "clear_titles",
    "command_suggestions",
    "commands",
    "container_close",
    "container_set_content",
    "container_set_data",
    "container_set_slot",
    "cooldown",
    "custom_chat_completions",
    "custom_payload",
    "delete_chat",
    "disconnect",
    "disguised_chat",
    "entity_event",
    "explode",
    "forget_level_chunk",
    "game_event",
    "horse_screen_open",
    "initialize_border",
    "keep_alive",
    "level_chunk_with_light",
    "level_event",
    "level_particles",
    "light_update",
    "login",
    "map_item_data",
    "merchant_offers",
    "pos",
    "pos_rot",
    "rot",
    "move_vehicle",
    "open_book",
    "open_screen",
    "open_sign_editor",
    "ping",
    "place_ghost_recipe",
    "player_abilities",
    "player_chat",
    "player_combat_end",
    "player_combat_enter",
    "player_combat_kill",
    "player_info_remove",
    "player_info_update",
    "player_look_at",
    "player_position",
    "recipe",
    "remove_entities",
    "remove_mob_effect",
    "resource_pack",
    "respawn",
    "rotate_head",
    "section_blocks_update",
    "select_advancements_tab",
    "server_data",
    "set_action_bar_text",
    "set_border_center",
    "set_border_lerp_size",
    "set_border_size",
    "set_border_warning_delay",
    "set_border_warning_distance",
    "set_camera",
    "set_carried_item",
    "set_chunk_cache_center",
    "set_chunk_cache_radius",
    "set_default_spawn_position",
    "set_display_objective",
    "set_entity_data",
    "set_entity_link",
    "set_entity_motion",
    "set_equipment",
    "set_experience",
    "set_health",
    "set_objective",
    "set_passengers",
    "set_player_team",
    "set_score",
    "set_simulation_distance",
    "set_subtitle_text",
    "set_time",
    "set_title_text",
    "set_titles_animation",
    "sound_entity",
    "sound",
    "stop_sound",
    "system_chat",
    "tab_list",
    "tag_query",
    "take_item_entity",
    "teleport_entity",
    "update_advancements",
    "update_attributes",
    "update_enabled_features",
    "update_mob_effect",
    "update_recipes",
    "update_tags",
];

/// Name of a registered clientbound packet, or None if the (state, id)
/// pair is not part of the protocol.
pub fn clientbound_name(state: ConnectionState, id: i32) -> Option<&'static str> {
    let table = match state {
        ConnectionState::Handshaking => return None,
        ConnectionState::Status => CLIENTBOUND_STATUS,
        ConnectionState::Login => CLIENTBOUND_LOGIN,
        ConnectionState::Play => CLIENTBOUND_PLAY,
    };
    if id < 0 {
        return None;
    }
    table.get(id as usize).copied()
}
