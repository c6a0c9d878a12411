//! Lobby service
//!
//! Matchmaking calls are thin: each builds a payload and queues it on the
//! [`RequestDispatch`]. The exception is region handling. The response to
//! [`LobbyService::get_regions_for_lobbies`] is intercepted to fill the
//! [`RegionRegistry`], [`LobbyService::ping_regions`] measures latency to those
//! regions, and the `*_with_ping_data` calls attach the measured latencies.
//!
//! Ping results and every error raised locally by this service are delivered
//! by [`LobbyService::run_ping_callbacks`], which the host must call regularly.

pub mod ping;
pub mod requests;

use std::fmt;
use std::sync::Arc;

use braincloud_core::{
    Error, ErrorExt, ErrorKind, RequestDispatch, ServerCall, ServerCallback, ServiceName,
    ServiceOperation, SharedCallback,
};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use self::ping::{ErrorEvent, PingCoordinator, PingData, RegionRegistry};
use self::requests::WithPingData;
pub use self::requests::{
    CreateLobbyRequest, FindLobbyRequest, FindOrCreateLobbyRequest, GetLobbyInstancesRequest,
    JoinLobbyRequest,
};

/// Wrapper for the `lobby` service
pub struct LobbyService {
    dispatch: Arc<dyn RequestDispatch>,
    ping: Arc<PingCoordinator>,
}

impl LobbyService {
    /// Create the service on top of `dispatch`, pinging through `ping`
    pub fn new(dispatch: Arc<dyn RequestDispatch>, ping: Arc<PingCoordinator>) -> Self {
        Self { dispatch, ping }
    }

    /// Ask the server which regions serve the given lobby types
    ///
    /// On success the probeable regions of the response replace the contents
    /// of the region registry before `callback` sees the response.
    pub fn get_regions_for_lobbies(&self, lobby_types: &[&str], callback: Option<SharedCallback>) {
        let interceptor = RegionsInterceptor {
            registry: Arc::clone(self.ping.registry()),
            inner: callback,
        };
        self.dispatch.add_to_queue(ServerCall::new(
            ServiceName::LOBBY,
            ServiceOperation::GET_REGIONS_FOR_LOBBIES,
            json!({ "lobbyTypes": lobby_types }),
            Some(Arc::new(interceptor)),
        ));
    }

    /// Measure latency to every registered region
    ///
    /// Results arrive through `callback` on a later
    /// [`run_ping_callbacks`](Self::run_ping_callbacks) as the `PING_REGIONS`
    /// operation. Failures arrive the same way.
    pub fn ping_regions(&self, callback: Option<SharedCallback>) {
        self.ping.start_ping(callback);
    }

    /// Deliver finished ping results and queued errors
    pub fn run_ping_callbacks(&self) {
        self.ping.run_callbacks();
    }

    /// Cancel a ping in progress
    pub fn stop_ping(&self) {
        self.ping.stop_ping();
    }

    /// Latencies delivered by the last completed ping
    pub fn ping_data(&self) -> Option<Arc<PingData>> {
        self.ping.ping_data()
    }

    /// Regions known from the last `GET_REGIONS_FOR_LOBBIES` response
    pub fn region_registry(&self) -> &Arc<RegionRegistry> {
        self.ping.registry()
    }

    /// Underlying ping coordinator
    pub fn ping_coordinator(&self) -> &Arc<PingCoordinator> {
        &self.ping
    }

    /// Find a lobby matching the request
    pub fn find_lobby(&self, request: &FindLobbyRequest, callback: Option<SharedCallback>) {
        self.send(ServiceOperation::FIND_LOBBY, request, callback);
    }

    /// Find a lobby, preferring regions with low measured latency
    pub fn find_lobby_with_ping_data(
        &self,
        request: &FindLobbyRequest,
        callback: Option<SharedCallback>,
    ) {
        self.send_with_ping_data(ServiceOperation::FIND_LOBBY_WITH_PING_DATA, request, callback);
    }

    /// Create a lobby owned by the caller
    pub fn create_lobby(&self, request: &CreateLobbyRequest, callback: Option<SharedCallback>) {
        self.send(ServiceOperation::CREATE_LOBBY, request, callback);
    }

    /// Create a lobby in a region chosen from measured latency
    pub fn create_lobby_with_ping_data(
        &self,
        request: &CreateLobbyRequest,
        callback: Option<SharedCallback>,
    ) {
        self.send_with_ping_data(
            ServiceOperation::CREATE_LOBBY_WITH_PING_DATA,
            request,
            callback,
        );
    }

    /// Find a lobby, creating one if none matches
    pub fn find_or_create_lobby(
        &self,
        request: &FindOrCreateLobbyRequest,
        callback: Option<SharedCallback>,
    ) {
        self.send(ServiceOperation::FIND_OR_CREATE_LOBBY, request, callback);
    }

    /// Find or create a lobby using measured latency
    pub fn find_or_create_lobby_with_ping_data(
        &self,
        request: &FindOrCreateLobbyRequest,
        callback: Option<SharedCallback>,
    ) {
        self.send_with_ping_data(
            ServiceOperation::FIND_OR_CREATE_LOBBY_WITH_PING_DATA,
            request,
            callback,
        );
    }

    /// Join a specific lobby
    pub fn join_lobby(&self, request: &JoinLobbyRequest, callback: Option<SharedCallback>) {
        self.send(ServiceOperation::JOIN_LOBBY, request, callback);
    }

    /// Join a specific lobby, reporting measured latency
    pub fn join_lobby_with_ping_data(
        &self,
        request: &JoinLobbyRequest,
        callback: Option<SharedCallback>,
    ) {
        self.send_with_ping_data(ServiceOperation::JOIN_LOBBY_WITH_PING_DATA, request, callback);
    }

    /// Fetch the current state of a lobby
    pub fn get_lobby_data(&self, lobby_id: &str, callback: Option<SharedCallback>) {
        self.send(
            ServiceOperation::GET_LOBBY_DATA,
            &json!({ "lobbyId": lobby_id }),
            callback,
        );
    }

    /// Leave a lobby
    pub fn leave_lobby(&self, lobby_id: &str, callback: Option<SharedCallback>) {
        self.send(
            ServiceOperation::LEAVE_LOBBY,
            &json!({ "lobbyId": lobby_id }),
            callback,
        );
    }

    /// Remove another member; only the lobby owner may do this
    pub fn remove_member(&self, lobby_id: &str, cx_id: &str, callback: Option<SharedCallback>) {
        self.send(
            ServiceOperation::REMOVE_MEMBER,
            &json!({ "lobbyId": lobby_id, "cxId": cx_id }),
            callback,
        );
    }

    /// Send a signal to every member of a lobby
    pub fn send_signal(&self, lobby_id: &str, signal_data: Value, callback: Option<SharedCallback>) {
        self.send(
            ServiceOperation::SEND_SIGNAL,
            &json!({ "lobbyId": lobby_id, "signalData": signal_data }),
            callback,
        );
    }

    /// Move the caller to another team
    pub fn switch_team(&self, lobby_id: &str, to_team_code: &str, callback: Option<SharedCallback>) {
        self.send(
            ServiceOperation::SWITCH_TEAM,
            &json!({ "lobbyId": lobby_id, "toTeamCode": to_team_code }),
            callback,
        );
    }

    /// Update the caller's ready flag and member data
    pub fn update_ready(
        &self,
        lobby_id: &str,
        is_ready: bool,
        extra_json: Value,
        callback: Option<SharedCallback>,
    ) {
        self.send(
            ServiceOperation::UPDATE_READY,
            &json!({ "lobbyId": lobby_id, "isReady": is_ready, "extraJson": extra_json }),
            callback,
        );
    }

    /// Change lobby settings; only the lobby owner may do this
    pub fn update_settings(&self, lobby_id: &str, settings: Value, callback: Option<SharedCallback>) {
        self.send(
            ServiceOperation::UPDATE_SETTINGS,
            &json!({ "lobbyId": lobby_id, "settings": settings }),
            callback,
        );
    }

    /// Cancel a pending find request
    pub fn cancel_find_request(
        &self,
        lobby_type: &str,
        entry_id: &str,
        callback: Option<SharedCallback>,
    ) {
        self.send(
            ServiceOperation::CANCEL_FIND_REQUEST,
            &json!({ "lobbyType": lobby_type, "entryId": entry_id }),
            callback,
        );
    }

    /// List running lobbies of a type
    pub fn get_lobby_instances(
        &self,
        request: &GetLobbyInstancesRequest,
        callback: Option<SharedCallback>,
    ) {
        self.send(ServiceOperation::GET_LOBBY_INSTANCES, request, callback);
    }

    /// List running lobbies of a type along with measured latency
    pub fn get_lobby_instances_with_ping_data(
        &self,
        request: &GetLobbyInstancesRequest,
        callback: Option<SharedCallback>,
    ) {
        self.send_with_ping_data(
            ServiceOperation::GET_LOBBY_INSTANCES_WITH_PING_DATA,
            request,
            callback,
        );
    }

    fn send<T: Serialize + ?Sized>(
        &self,
        operation: ServiceOperation,
        request: &T,
        callback: Option<SharedCallback>,
    ) {
        let data = serde_json::to_value(request).with_sdk_error(
            ErrorKind::Serialization,
            format!("Unable to serialize {operation} request"),
        );
        match data {
            Ok(data) => self.dispatch.add_to_queue(ServerCall::new(
                ServiceName::LOBBY,
                operation,
                data,
                callback,
            )),
            Err(err) => {
                warn!(%operation, error = %err, "failed to serialize lobby request");
                self.ping.queue_error(ErrorEvent::from_error(
                    ServiceName::LOBBY,
                    operation,
                    &err,
                    callback,
                ));
            }
        }
    }

    fn send_with_ping_data<T: Serialize>(
        &self,
        operation: ServiceOperation,
        request: &T,
        callback: Option<SharedCallback>,
    ) {
        let Some(ping_data) = self.ping.ping_data() else {
            debug!(%operation, "no ping data available");
            let err = Error::bad_request(
                "Required ping data is missing. Call get_regions_for_lobbies and ping_regions first",
            );
            self.ping.queue_error(ErrorEvent::from_error(
                ServiceName::LOBBY,
                operation,
                &err,
                callback,
            ));
            return;
        };

        let request = WithPingData {
            request,
            ping_data: &ping_data,
        };
        self.send(operation, &request, callback);
    }
}

impl fmt::Debug for LobbyService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LobbyService")
            .field("ping", &self.ping)
            .finish_non_exhaustive()
    }
}

/// Feeds `GET_REGIONS_FOR_LOBBIES` responses into the registry before the
/// caller's callback runs
struct RegionsInterceptor {
    registry: Arc<RegionRegistry>,
    inner: Option<SharedCallback>,
}

impl ServerCallback for RegionsInterceptor {
    fn server_callback(&self, service: ServiceName, operation: ServiceOperation, json_data: &Value) {
        let regions = self.registry.set_from_response(json_data);
        debug!(regions, "regions for lobbies received");
        if let Some(inner) = &self.inner {
            inner.server_callback(service, operation, json_data);
        }
    }

    fn server_error(
        &self,
        service: ServiceName,
        operation: ServiceOperation,
        status_code: i32,
        reason_code: i32,
        message: &str,
    ) {
        if let Some(inner) = &self.inner {
            inner.server_error(service, operation, status_code, reason_code, message);
        }
    }
}
