use crate::modules::error::code::ErrorCode;
use crate::modules::error::{imap_error, SpamWardenResult};
use crate::modules::imap::session::SessionStream;
use crate::modules::utils::net::{establish_tls_connection, resolve_to_socket_addr};
use crate::raise_error;
use async_imap::Client as ImapClient;
use async_imap::Session as ImapSession;
use std::net::SocketAddr;
use tokio::io::BufWriter;
use tracing::debug;

/// A TLS-connected IMAP client that has read the server greeting but not yet logged in.
#[derive(Debug)]
pub struct Client {
    inner: ImapClient<Box<dyn SessionStream>>,
}

fn alpn(port: u16) -> &'static [&'static str] {
    if port == 993 {
        &[]
    } else {
        &["imap"]
    }
}

impl Client {
    fn new(stream: Box<dyn SessionStream>) -> Self {
        Self {
            inner: ImapClient::new(stream),
        }
    }

    /// Single LOGIN attempt. A rejected login keeps `ImapAuthenticationFailed`, a dropped
    /// socket becomes `ImapConnectionLost`.
    pub async fn login(
        self,
        username: &str,
        password: &str,
    ) -> SpamWardenResult<ImapSession<Box<dyn SessionStream>>> {
        let Client { inner } = self;
        let session = inner
            .login(username, password)
            .await
            .map_err(|(e, _)| imap_error(e, ErrorCode::ImapAuthenticationFailed))?;
        Ok(session)
    }

    /// Dials `domain:port` over implicit TLS. Plain TCP and STARTTLS are not offered.
    pub async fn connection(domain: &str, port: u16) -> SpamWardenResult<Self> {
        let resolved_addr = resolve_to_socket_addr(domain, port).await?;
        debug!("Attempting IMAP connection to {domain} ({resolved_addr}).");
        Self::establish_secure_connection(resolved_addr, domain).await
    }

    async fn establish_secure_connection(
        address: SocketAddr,
        server_hostname: &str,
    ) -> SpamWardenResult<Self> {
        let tls_stream =
            establish_tls_connection(address, server_hostname, alpn(address.port())).await?;
        let buffered_stream = BufWriter::new(tls_stream);
        let session_stream: Box<dyn SessionStream> = Box::new(buffered_stream);
        let mut client = Client::new(session_stream);

        let _greeting = client
            .inner
            .read_response()
            .await
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::NetworkError))?
            .ok_or_else(|| {
                raise_error!(
                    "failed to read greeting".into(),
                    ErrorCode::NetworkError
                )
            })?;

        Ok(client)
    }
}
