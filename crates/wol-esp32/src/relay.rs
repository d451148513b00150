//! Relay client for the companion agent on ESP32.

use embedded_svc::http::client::Client;
use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
use esp_idf_svc::sys::{EspError, ESP_ERR_HTTP_EAGAIN};
use wol_core::relay::{HostRelay, RelayError, RelayRequest};

/// [`HostRelay`] over the ESP-IDF HTTP client. A fresh connection per command.
#[derive(Debug, Default, Clone, Copy)]
pub struct EspHttpRelay;

impl HostRelay for EspHttpRelay {
    fn send(&mut self, request: &RelayRequest) -> Result<(), RelayError> {
        let connection = EspHttpConnection::new(&Configuration {
            timeout: Some(request.timeout),
            ..Default::default()
        })
        .map_err(|e| RelayError::Client(e.to_string()))?;
        let mut client = Client::wrap(connection);

        let response = client
            .get(&request.url)
            .and_then(|req| req.submit())
            .map_err(classify)?;

        match response.status() {
            200 => Ok(()),
            status => Err(RelayError::Status(status)),
        }
    }
}

fn classify(e: EspError) -> RelayError {
    if e.code() == ESP_ERR_HTTP_EAGAIN as i32 {
        RelayError::Timeout
    } else {
        RelayError::Connect(e.to_string())
    }
}
