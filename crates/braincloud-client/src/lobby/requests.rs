//! Lobby request payloads
//!
//! Field names serialize exactly as the lobby service expects them.

use serde::Serialize;
use serde_json::Value;

use super::ping::PingData;

/// Parameters of `FIND_LOBBY`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FindLobbyRequest {
    /// Lobby type configured on the server
    pub lobby_type: String,
    /// Skill rating used for matching
    pub rating: i64,
    /// Number of widening steps before giving up
    pub max_steps: u32,
    /// Matching algorithm description
    pub algo: Value,
    /// Filter applied to candidate lobbies
    pub filter_json: Value,
    /// Connection ids of users joining together with the caller
    pub other_user_cx_ids: Vec<String>,
    /// Whether the caller is ready on arrival
    pub is_ready: bool,
    /// Free-form member data
    pub extra_json: Value,
    /// Preferred team, empty for any
    pub team_code: String,
}

/// Parameters of `CREATE_LOBBY`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLobbyRequest {
    /// Lobby type configured on the server
    pub lobby_type: String,
    /// Skill rating of the owner
    pub rating: i64,
    /// Connection ids of users joining together with the caller
    pub other_user_cx_ids: Vec<String>,
    /// Whether the caller is ready on arrival
    pub is_ready: bool,
    /// Free-form member data
    pub extra_json: Value,
    /// Team of the owner
    pub team_code: String,
    /// Lobby settings overriding the lobby type defaults
    pub settings: Value,
}

/// Parameters of `FIND_OR_CREATE_LOBBY`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FindOrCreateLobbyRequest {
    /// Lobby type configured on the server
    pub lobby_type: String,
    /// Skill rating used for matching
    pub rating: i64,
    /// Number of widening steps before a lobby is created
    pub max_steps: u32,
    /// Matching algorithm description
    pub algo: Value,
    /// Filter applied to candidate lobbies
    pub filter_json: Value,
    /// Connection ids of users joining together with the caller
    pub other_user_cx_ids: Vec<String>,
    /// Settings of the lobby if one has to be created
    pub settings: Value,
    /// Whether the caller is ready on arrival
    pub is_ready: bool,
    /// Free-form member data
    pub extra_json: Value,
    /// Preferred team, empty for any
    pub team_code: String,
}

/// Parameters of `JOIN_LOBBY`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinLobbyRequest {
    /// Lobby to join
    pub lobby_id: String,
    /// Whether the caller is ready on arrival
    pub is_ready: bool,
    /// Free-form member data
    pub extra_json: Value,
    /// Preferred team, empty for any
    pub team_code: String,
    /// Connection ids of users joining together with the caller
    pub other_user_cx_ids: Vec<String>,
}

/// Parameters of `GET_LOBBY_INSTANCES`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetLobbyInstancesRequest {
    /// Lobby type to list
    pub lobby_type: String,
    /// Filter applied to the listed lobbies
    pub criteria_json: Value,
}

/// A request with the caller's measured region latencies attached
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WithPingData<'a, T> {
    #[serde(flatten)]
    pub(crate) request: &'a T,
    pub(crate) ping_data: &'a PingData,
}
