use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use native_tls::{HandshakeError, TlsConnector, TlsStream};

use super::error::VerifyError;
use super::options::VerifyOptions;

/// Ouvre les flux vers les serveurs et les passe en TLS.
///
/// Chaque appel reçoit l'échéance de la session : aucune étape bloquante ne
/// doit la dépasser.
pub trait Connector {
    type Stream: Read + Write;

    /// Se connecte à `host:port`, en TLS direct si `tls` est vrai.
    fn connect(
        &self,
        host: &str,
        port: u16,
        tls: bool,
        deadline: Instant,
    ) -> Result<Self::Stream, VerifyError>;

    /// Négociation TLS cliente sur un flux en clair déjà établi.
    fn upgrade(
        &self,
        host: &str,
        stream: Self::Stream,
        deadline: Instant,
    ) -> Result<Self::Stream, VerifyError>;

    /// Borne la prochaine lecture ou écriture sur `stream`.
    fn set_timeout(&self, stream: &Self::Stream, timeout: Duration) -> Result<(), VerifyError>;
}

impl<C: Connector + ?Sized> Connector for &C {
    type Stream = C::Stream;

    fn connect(
        &self,
        host: &str,
        port: u16,
        tls: bool,
        deadline: Instant,
    ) -> Result<Self::Stream, VerifyError> {
        (**self).connect(host, port, tls, deadline)
    }

    fn upgrade(
        &self,
        host: &str,
        stream: Self::Stream,
        deadline: Instant,
    ) -> Result<Self::Stream, VerifyError> {
        (**self).upgrade(host, stream, deadline)
    }

    fn set_timeout(&self, stream: &Self::Stream, timeout: Duration) -> Result<(), VerifyError> {
        (**self).set_timeout(stream, timeout)
    }
}

/// Temps restant avant `deadline`, `None` une fois l'échéance passée.
pub(crate) fn remaining(deadline: Instant) -> Option<Duration> {
    deadline
        .checked_duration_since(Instant::now())
        .filter(|left| !left.is_zero())
}

fn timed_out(host: &str, what: &str) -> VerifyError {
    VerifyError::connect(host, io::Error::new(io::ErrorKind::TimedOut, what.to_string()))
}

#[derive(Debug)]
pub enum MailStream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl Read for MailStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Plain(stream) => stream.read(buf),
            Self::Tls(stream) => stream.read(buf),
        }
    }
}

impl MailStream {
    fn tcp(&self) -> &TcpStream {
        match self {
            Self::Plain(stream) => stream,
            Self::Tls(stream) => stream.get_ref(),
        }
    }
}

impl Write for MailStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(stream) => stream.write(buf),
            Self::Tls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(stream) => stream.flush(),
            Self::Tls(stream) => stream.flush(),
        }
    }
}

/// Connecteur TCP + `native-tls` respectant les délais de connexion et de lecture.
pub struct NativeConnector {
    tls: TlsConnector,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
}

impl NativeConnector {
    pub fn new(options: &VerifyOptions) -> Result<Self, VerifyError> {
        let tls = TlsConnector::new().map_err(|source| VerifyError::TlsInit { source })?;
        Ok(Self::with_tls(tls, options))
    }

    /// Connecteur fourni par l'appelant (par exemple une CA privée).
    pub fn with_tls(tls: TlsConnector, options: &VerifyOptions) -> Self {
        Self {
            tls,
            connect_timeout: options.connect_timeout(),
            read_timeout: options.read_timeout(),
        }
    }

    /// Délai d'une opération bloquante : le délai d'inactivité, jamais
    /// au-delà de ce qui reste avant l'échéance.
    fn bounded(&self, left: Duration) -> Duration {
        self.read_timeout.map_or(left, |idle| idle.min(left))
    }

    fn open_tcp(&self, host: &str, port: u16, deadline: Instant) -> Result<TcpStream, VerifyError> {
        let target = format!("{host}:{port}");
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|err| VerifyError::connect(&target, err))?
            .collect();

        let mut last_err = None;
        for addr in &addrs {
            let Some(left) = remaining(deadline) else {
                return Err(timed_out(&target, "connect deadline reached"));
            };
            let timeout = self.connect_timeout.map_or(left, |limit| limit.min(left));
            match TcpStream::connect_timeout(addr, timeout) {
                Ok(stream) => {
                    let io_timeout = Some(self.bounded(left));
                    stream.set_read_timeout(io_timeout)?;
                    stream.set_write_timeout(io_timeout)?;
                    tracing::debug!(%target, %addr, "connected");
                    return Ok(stream);
                }
                Err(err) => {
                    tracing::debug!(%target, %addr, error = %err, "connect attempt failed");
                    last_err = Some(err);
                }
            }
        }
        let err = last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "no socket address available",
            )
        });
        Err(VerifyError::connect(target, err))
    }

    /// Termine la négociation TLS avant `deadline`. Avec un délai de lecture,
    /// un pair muet fait revenir `WouldBlock` indéfiniment : chaque reprise
    /// vérifie donc l'échéance.
    fn complete_handshake(
        &self,
        domain: &str,
        stream: TcpStream,
        deadline: Instant,
    ) -> Result<TlsStream<TcpStream>, VerifyError> {
        let left = remaining(deadline).ok_or_else(|| timed_out(domain, "TLS handshake timed out"))?;
        stream.set_read_timeout(Some(self.bounded(left)))?;
        match self.tls.connect(domain, stream) {
            Ok(tls) => Ok(tls),
            Err(HandshakeError::Failure(err)) => Err(VerifyError::Tls { source: err }),
            Err(HandshakeError::WouldBlock(mut mid)) => loop {
                let Some(left) = remaining(deadline) else {
                    break Err(timed_out(domain, "TLS handshake timed out"));
                };
                mid.get_ref().set_read_timeout(Some(self.bounded(left)))?;
                match mid.handshake() {
                    Ok(tls) => break Ok(tls),
                    Err(HandshakeError::Failure(err)) => {
                        break Err(VerifyError::Tls { source: err });
                    }
                    Err(HandshakeError::WouldBlock(next)) => mid = next,
                }
            },
        }
    }
}

impl Connector for NativeConnector {
    type Stream = MailStream;

    fn connect(
        &self,
        host: &str,
        port: u16,
        tls: bool,
        deadline: Instant,
    ) -> Result<MailStream, VerifyError> {
        let stream = self.open_tcp(host, port, deadline)?;
        if tls {
            let tls = self.complete_handshake(host, stream, deadline)?;
            Ok(MailStream::Tls(Box::new(tls)))
        } else {
            Ok(MailStream::Plain(stream))
        }
    }

    fn upgrade(
        &self,
        host: &str,
        stream: MailStream,
        deadline: Instant,
    ) -> Result<MailStream, VerifyError> {
        match stream {
            MailStream::Plain(plain) => {
                let tls = self.complete_handshake(host, plain, deadline)?;
                Ok(MailStream::Tls(Box::new(tls)))
            }
            tls @ MailStream::Tls(_) => Ok(tls),
        }
    }

    fn set_timeout(&self, stream: &MailStream, timeout: Duration) -> Result<(), VerifyError> {
        let tcp = stream.tcp();
        tcp.set_read_timeout(Some(timeout))?;
        tcp.set_write_timeout(Some(timeout))?;
        Ok(())
    }
}
