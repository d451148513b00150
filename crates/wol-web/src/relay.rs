//! Companion agent relay over reqwest's blocking client.

use reqwest::StatusCode;
use wol_core::relay::{HostRelay, RelayError, RelayRequest};

/// [`HostRelay`] issuing one GET per command.
///
/// A client is built per call so the timeout always matches the request
/// and no connection outlives it. Must not be called from an async context;
/// the device router runs it on the blocking pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpRelay;

impl HostRelay for HttpRelay {
    fn send(&mut self, request: &RelayRequest) -> Result<(), RelayError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(request.timeout)
            .connect_timeout(request.timeout)
            .build()
            .map_err(|e| RelayError::Client(e.to_string()))?;

        let response = client.get(&request.url).send().map_err(classify)?;
        match response.status() {
            StatusCode::OK => Ok(()),
            status => Err(RelayError::Status(status.as_u16())),
        }
    }
}

fn classify(err: reqwest::Error) -> RelayError {
    if err.is_timeout() {
        RelayError::Timeout
    } else if err.is_connect() {
        RelayError::Connect(err.to_string())
    } else {
        RelayError::Client(err.to_string())
    }
}
