//! Transport stream handling (plain TCP or TLS).

use std::sync::Arc;

use rustls::pki_types::ServerName;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};

use crate::error::{Error, Result};

/// Byte stream to the server.
#[derive(Debug)]
pub(crate) enum Stream {
    /// Plain TCP connection.
    Tcp(BufReader<TcpStream>),
    /// TLS-encrypted connection.
    Tls(Box<BufReader<tokio_rustls::client::TlsStream<TcpStream>>>),
    /// Scripted I/O for session tests.
    #[cfg(test)]
    Mock(BufReader<tokio_test::io::Mock>),
}

impl Stream {
    /// Opens a plain TCP connection.
    pub(crate) async fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        Ok(Self::Tcp(BufReader::new(stream)))
    }

    /// Opens a connection with implicit TLS (typically port 465).
    pub(crate) async fn connect_tls(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        let tls = handshake(host, stream).await?;
        Ok(Self::Tls(Box::new(BufReader::new(tls))))
    }

    /// Reads one line with the line terminator removed.
    ///
    /// Returns [`Error::ConnectionClosed`] at end of stream.
    pub(crate) async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = match self {
            Self::Tcp(reader) => reader.read_line(&mut line).await?,
            Self::Tls(reader) => reader.read_line(&mut line).await?,
            #[cfg(test)]
            Self::Mock(reader) => reader.read_line(&mut line).await?,
        };
        if read == 0 {
            return Err(Error::ConnectionClosed);
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Writes and flushes `data`.
    pub(crate) async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        match self {
            Self::Tcp(reader) => {
                reader.get_mut().write_all(data).await?;
                reader.get_mut().flush().await?;
            }
            Self::Tls(reader) => {
                reader.get_mut().write_all(data).await?;
                reader.get_mut().flush().await?;
            }
            #[cfg(test)]
            Self::Mock(reader) => {
                reader.get_mut().write_all(data).await?;
                reader.get_mut().flush().await?;
            }
        }
        Ok(())
    }

    /// Upgrades a plain connection to TLS after STARTTLS was accepted.
    pub(crate) async fn upgrade(self, host: &str) -> Result<Self> {
        match self {
            Self::Tcp(reader) => {
                let tls = handshake(host, reader.into_inner()).await?;
                Ok(Self::Tls(Box::new(BufReader::new(tls))))
            }
            Self::Tls(_) => Err(Error::Protocol("connection already uses TLS".into())),
            #[cfg(test)]
            Self::Mock(_) => Err(Error::NotSupported("TLS on scripted streams".into())),
        }
    }
}

async fn handshake(
    host: &str,
    stream: TcpStream,
) -> Result<tokio_rustls::client::TlsStream<TcpStream>> {
    let server_name = ServerName::try_from(host.to_string())
        .map_err(|_| Error::Protocol(format!("invalid hostname: {host}")))?;
    Ok(connector().connect(server_name, stream).await?)
}

/// TLS connector trusting the bundled web PKI roots.
fn connector() -> TlsConnector {
    let roots = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };
    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}
