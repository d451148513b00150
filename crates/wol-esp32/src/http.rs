//! HTTP server for ESP32.
//!
//! Every request, whatever its method, goes to the core dispatcher, which does its own routing and
//! produces the 404 for unknown paths.

use anyhow::Result;
use embedded_svc::io::Write;
use esp_idf_svc::http::server::{Configuration, EspHttpServer};
use esp_idf_svc::http::Method;
use wol_core::{lock_device, CommandRequest, SharedDevice};

/// Start the server. It stops when the returned handle is dropped.
pub fn start_server(device: SharedDevice, port: u16) -> Result<EspHttpServer<'static>> {
    let mut server = EspHttpServer::new(&Configuration {
        http_port: port,
        uri_match_wildcard: true,
        ..Default::default()
    })?;

    for method in [Method::Get, Method::Post, Method::Put, Method::Delete, Method::Patch, Method::Head] {
        let device = device.clone();
        server.fn_handler("/*", method, move |req| -> Result<()> {
            let request = CommandRequest::from_uri(req.uri());
            let reply = lock_device(&device).dispatch(&request);

            let mut response = req.into_response(
                reply.status,
                None,
                &[("Content-Type", reply.content_type.as_str())],
            )?;
            response.write_all(reply.body.as_bytes())?;
            Ok(())
        })?;
    }

    log::info!("HTTP server listening on port {}", port);
    Ok(server)
}
