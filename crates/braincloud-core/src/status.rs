//! Status and reason codes reported to [`ServerCallback::server_error`].
//!
//! Status codes follow HTTP semantics for server-originated failures. Errors
//! detected on the client (network failures, misuse of the API) reuse the same
//! callback path so callers only ever handle one error shape.
//!
//! [`ServerCallback::server_error`]: crate::callback::ServerCallback::server_error

/// HTTP-style status codes
pub mod status_codes {
    /// Request succeeded
    pub const HTTP_OK: i32 = 200;

    /// Request was rejected because of missing or invalid input
    pub const HTTP_BAD_REQUEST: i32 = 400;

    /// Failure detected by the client before or instead of a server reply
    pub const CLIENT_NETWORK_ERROR: i32 = 900;
}

/// Fine-grained reason codes accompanying a status code
pub mod reason_codes {
    /// A required parameter (or prerequisite call) is missing
    pub const MISSING_REQUIRED_PARAMETER: i32 = 40_310;

    /// A request payload could not be encoded or decoded
    pub const JSON_PARSE_ERROR: i32 = 40_311;

    /// A region ping session is already in progress
    pub const PING_ALREADY_RUNNING: i32 = 40_312;

    /// Client-side configuration was rejected
    pub const INVALID_CONFIGURATION: i32 = 40_313;

    /// The client could not reach the endpoint
    pub const CLIENT_NETWORK_ERROR_UNREACHABLE: i32 = 90_002;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_codes_are_unique() {
        let codes = [
            reason_codes::MISSING_REQUIRED_PARAMETER,
            reason_codes::JSON_PARSE_ERROR,
            reason_codes::PING_ALREADY_RUNNING,
            reason_codes::INVALID_CONFIGURATION,
            reason_codes::CLIENT_NETWORK_ERROR_UNREACHABLE,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }

    #[test]
    fn test_client_status_outside_http_range() {
        const _: () = assert!(status_codes::CLIENT_NETWORK_ERROR > 599);
    }
}
