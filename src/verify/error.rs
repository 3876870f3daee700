use thiserror::Error;

/// Failures inside a protocol session.
///
/// These never leave the coordinator: each one becomes a `false` flag and a
/// transcript line.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("connection to {host} failed: {source}")]
    Connect {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error: {source}")]
    Io {
        #[source]
        source: std::io::Error,
    },
    #[error("TLS handshake failed: {source}")]
    Tls {
        #[source]
        source: native_tls::Error,
    },
    #[error("TLS connector initialization failed: {source}")]
    TlsInit {
        #[source]
        source: native_tls::Error,
    },
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("session is not connected")]
    NotConnected,
}

impl VerifyError {
    pub(crate) fn connect(host: impl Into<String>, source: std::io::Error) -> Self {
        Self::Connect {
            host: host.into(),
            source,
        }
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}

impl From<std::io::Error> for VerifyError {
    fn from(source: std::io::Error) -> Self {
        Self::Io { source }
    }
}
