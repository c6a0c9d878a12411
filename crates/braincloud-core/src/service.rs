//! Service and operation identifiers.
//!
//! Every request is tagged with a service name and an operation code. Both are
//! plain strings on the wire; the newtypes keep them from being mixed up and
//! expose the identifiers the SDK uses as associated constants.

use serde::{Serialize, Serializer};
use std::fmt;

/// Name of a backend service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceName(&'static str);

impl ServiceName {
    /// Authentication service
    pub const AUTHENTICATE: Self = Self("authenticationV2");
    /// Entity storage service
    pub const ENTITY: Self = Self("entity");
    /// Leaderboard service
    pub const LEADERBOARD: Self = Self("leaderboard");
    /// Lobby and matchmaking service
    pub const LOBBY: Self = Self("lobby");
    /// Messaging service
    pub const MESSAGING: Self = Self("messaging");
    /// Push notification service
    pub const PUSH_NOTIFICATION: Self = Self("pushNotification");
    /// Relay service
    pub const RELAY: Self = Self("relay");

    /// Create a service name for a service without a predefined constant
    pub const fn custom(name: &'static str) -> Self {
        Self(name)
    }

    /// Wire representation
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl Serialize for ServiceName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

/// Operation code within a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceOperation(&'static str);

// Lobby operations are named exactly as on the wire.
#[allow(missing_docs)]
impl ServiceOperation {
    pub const FIND_LOBBY: Self = Self("FIND_LOBBY");
    pub const FIND_LOBBY_WITH_PING_DATA: Self = Self("FIND_LOBBY_WITH_PING_DATA");
    pub const CREATE_LOBBY: Self = Self("CREATE_LOBBY");
    pub const CREATE_LOBBY_WITH_PING_DATA: Self = Self("CREATE_LOBBY_WITH_PING_DATA");
    pub const FIND_OR_CREATE_LOBBY: Self = Self("FIND_OR_CREATE_LOBBY");
    pub const FIND_OR_CREATE_LOBBY_WITH_PING_DATA: Self =
        Self("FIND_OR_CREATE_LOBBY_WITH_PING_DATA");
    pub const JOIN_LOBBY: Self = Self("JOIN_LOBBY");
    pub const JOIN_LOBBY_WITH_PING_DATA: Self = Self("JOIN_LOBBY_WITH_PING_DATA");
    pub const GET_LOBBY_DATA: Self = Self("GET_LOBBY_DATA");
    pub const LEAVE_LOBBY: Self = Self("LEAVE_LOBBY");
    pub const REMOVE_MEMBER: Self = Self("REMOVE_MEMBER");
    pub const SEND_SIGNAL: Self = Self("SEND_SIGNAL");
    pub const SWITCH_TEAM: Self = Self("SWITCH_TEAM");
    pub const UPDATE_READY: Self = Self("UPDATE_READY");
    pub const UPDATE_SETTINGS: Self = Self("UPDATE_SETTINGS");
    pub const CANCEL_FIND_REQUEST: Self = Self("CANCEL_FIND_REQUEST");
    pub const GET_LOBBY_INSTANCES: Self = Self("GET_LOBBY_INSTANCES");
    pub const GET_LOBBY_INSTANCES_WITH_PING_DATA: Self =
        Self("GET_LOBBY_INSTANCES_WITH_PING_DATA");
    pub const GET_REGIONS_FOR_LOBBIES: Self = Self("GET_REGIONS_FOR_LOBBIES");

    /// Client-side operation used to report region ping results and errors.
    /// Never sent to the server.
    pub const PING_REGIONS: Self = Self("PING_REGIONS");

    /// Create an operation code without a predefined constant
    pub const fn custom(operation: &'static str) -> Self {
        Self(operation)
    }

    /// Wire representation
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ServiceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl Serialize for ServiceOperation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}
