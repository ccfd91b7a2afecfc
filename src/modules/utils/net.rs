// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::error::code::ErrorCode;
use crate::modules::utils::tls::establish_tls_stream;
use crate::modules::{error::SpamWardenResult, imap::session::SessionStream};
use crate::raise_error;
use std::net::SocketAddr;
use std::pin::Pin;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_io_timeout::TimeoutStream;
use tracing::error;

pub(crate) const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
pub(crate) const IO_TIMEOUT: Duration = Duration::from_secs(60);

pub(crate) async fn establish_tcp_connection_with_timeout(
    address: SocketAddr,
) -> SpamWardenResult<Pin<Box<TimeoutStream<TcpStream>>>> {
    let tcp_stream = timeout(CONNECT_TIMEOUT, TcpStream::connect(address))
        .await
        .map_err(|_| {
            error!(
                "TCP connection to {} timed out after {}s",
                address,
                CONNECT_TIMEOUT.as_secs()
            );
            raise_error!(
                format!(
                    "TCP connection to {} timed out after {}s",
                    address,
                    CONNECT_TIMEOUT.as_secs()
                ),
                ErrorCode::ConnectionTimeout
            )
        })?
        .map_err(|e| raise_error!(e.to_string(), ErrorCode::NetworkError))?;

    tcp_stream
        .set_nodelay(true)
        .map_err(|e| raise_error!(e.to_string(), ErrorCode::NetworkError))?;

    let mut timeout_stream = TimeoutStream::new(tcp_stream);
    timeout_stream.set_write_timeout(Some(IO_TIMEOUT));
    timeout_stream.set_read_timeout(Some(IO_TIMEOUT));

    Ok(Box::pin(timeout_stream))
}

pub(crate) async fn establish_tls_connection(
    address: SocketAddr,
    server_hostname: &str,
    alpn_protocols: &[&str],
) -> SpamWardenResult<impl SessionStream> {
    let tcp_stream = establish_tcp_connection_with_timeout(address).await?;
    let tls_stream = establish_tls_stream(server_hostname, alpn_protocols, tcp_stream).await?;
    Ok(tls_stream)
}

/// Splits a configured `host[:port]` into its parts, defaulting to the implicit-TLS
/// IMAP port.
pub fn split_host_port(input: &str, default_port: u16) -> SpamWardenResult<(String, u16)> {
    let input = input.trim();
    if input.is_empty() {
        return Err(raise_error!(
            "IMAP host cannot be empty".into(),
            ErrorCode::InvalidParameter
        ));
    }

    // Bracketed IPv6 literal, e.g. [::1]:993
    if let Some(rest) = input.strip_prefix('[') {
        let (host, tail) = rest.split_once(']').ok_or_else(|| {
            raise_error!(
                format!("Invalid IPv6 host '{}'", input),
                ErrorCode::InvalidParameter
            )
        })?;
        let port = match tail.strip_prefix(':') {
            Some(port) => parse_port(port, input)?,
            None if tail.is_empty() => default_port,
            None => {
                return Err(raise_error!(
                    format!("Invalid host '{}'", input),
                    ErrorCode::InvalidParameter
                ))
            }
        };
        return Ok((host.to_string(), port));
    }

    match input.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') => {
            if host.is_empty() {
                return Err(raise_error!(
                    format!("Missing host name in '{}'", input),
                    ErrorCode::InvalidParameter
                ));
            }
            Ok((host.to_string(), parse_port(port, input)?))
        }
        _ => Ok((input.to_string(), default_port)),
    }
}

fn parse_port(port: &str, input: &str) -> SpamWardenResult<u16> {
    match port.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(raise_error!(
            format!("Invalid port in host '{}'", input),
            ErrorCode::InvalidParameter
        )),
    }
}

pub async fn resolve_to_socket_addr(domain: &str, port: u16) -> SpamWardenResult<SocketAddr> {
    let mut addrs = tokio::net::lookup_host((domain, port))
        .await
        .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::NetworkError))?;
    addrs.next().ok_or_else(|| {
        raise_error!(
            format!("Unable to resolve address {}:{}", domain, port),
            ErrorCode::NetworkError
        )
    })
}
