use std::io::{self, Read, Write};
use std::time::Instant;

use crate::account::{Encryption, ServerConfig};

use super::error::VerifyError;
use super::options::VerifyOptions;
use super::stream::{Connector, remaining};

/// Nombre de lignes formant une réponse serveur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Framing {
    /// Multi-ligne tant que le 4e caractère est `-`.
    Smtp,
    /// Exactement une ligne de statut.
    SingleLine,
    /// La première ligne non étiquetée.
    ImapGreeting,
    /// Tout jusqu'à la ligne étiquetée `1 ` incluse.
    ImapTagged,
}

impl Framing {
    fn is_complete(self, line: &str) -> bool {
        match self {
            Self::Smtp => line.len() < 4 || line.as_bytes().get(3) != Some(&b'-'),
            Self::SingleLine | Self::ImapGreeting => true,
            Self::ImapTagged => line.starts_with("1 "),
        }
    }
}

/// `+OK` en tête de réponse.
pub(crate) fn pop3_ok(response: &str) -> bool {
    response.starts_with("+OK")
}

/// Salutation IMAP : `OK` à l'offset 2 de la ligne non étiquetée (`* OK`).
pub(crate) fn imap_ok(response: &str) -> bool {
    let line = last_line(response);
    line.starts_with("* ") && line.get(2..4) == Some("OK")
}

/// Réponse étiquetée : la dernière ligne doit porter le tag, sinon la
/// réponse est tronquée et compte comme un échec.
pub(crate) fn imap_tagged_ok(response: &str, tag: &str) -> bool {
    last_line(response)
        .strip_prefix(tag)
        .and_then(|rest| rest.strip_prefix(' '))
        .is_some_and(|status| status.starts_with("OK"))
}

/// Le code en tête de la dernière ligne vaut `code`.
pub(crate) fn smtp_code(response: &str, code: u16) -> bool {
    last_line(response)
        .get(..3)
        .and_then(|digits| digits.parse::<u16>().ok())
        == Some(code)
}

fn last_line(response: &str) -> &str {
    response.lines().last().unwrap_or("")
}

/// Une connexion vers un serveur et la transcription de l'échange.
/// Le flux est détenu en `Option` et libéré une seule fois.
pub(crate) struct Session<'a, C: Connector> {
    connector: &'a C,
    host: String,
    port: u16,
    encryption: Encryption,
    options: &'a VerifyOptions,
    stream: Option<C::Stream>,
    buffer: Vec<u8>,
    deadline: Option<Instant>,
    transcript: Vec<String>,
}

impl<'a, C: Connector> Session<'a, C> {
    pub(crate) fn new(connector: &'a C, server: &ServerConfig, options: &'a VerifyOptions) -> Self {
        Self {
            connector,
            host: server.host().to_string(),
            port: server.port(),
            encryption: server.encryption(),
            options,
            stream: None,
            buffer: Vec::new(),
            deadline: None,
            transcript: Vec::new(),
        }
    }

    pub(crate) fn options(&self) -> &VerifyOptions {
        self.options
    }

    pub(crate) fn wants_starttls(&self) -> bool {
        self.encryption == Encryption::Starttls
    }

    pub(crate) fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    pub(crate) fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// Se connecte (TLS d'emblée si `ssl`) et lit la salutation.
    pub(crate) fn open(&mut self, greeting: Framing) -> Result<String, VerifyError> {
        self.close();
        let tls = self.encryption == Encryption::Ssl;
        self.record(
            "*",
            &format!(
                "connecting to {}:{}{}",
                self.host,
                self.port,
                if tls { " (tls)" } else { "" }
            ),
        );
        let deadline = Instant::now() + self.options.session_timeout();
        self.deadline = Some(deadline);
        let stream = self.connector.connect(&self.host, self.port, tls, deadline)?;
        self.stream = Some(stream);
        self.buffer.clear();
        self.read_response(greeting)
    }

    pub(crate) fn command(&mut self, command: &str, framing: Framing) -> Result<String, VerifyError> {
        self.record("C", command);
        self.send_line(command)?;
        self.read_response(framing)
    }

    /// Envoie `command` mais inscrit `shown` dans la transcription.
    pub(crate) fn command_redacted(
        &mut self,
        command: &str,
        shown: &str,
        framing: Framing,
    ) -> Result<String, VerifyError> {
        self.record("C", shown);
        self.send_line(command)?;
        self.read_response(framing)
    }

    /// Remplace le flux par sa version TLS ; les octets en clair déjà
    /// bufferisés sont jetés.
    pub(crate) fn upgrade(&mut self) -> Result<(), VerifyError> {
        let deadline = self.deadline.ok_or(VerifyError::NotConnected)?;
        let stream = self.stream.take().ok_or(VerifyError::NotConnected)?;
        self.buffer.clear();
        let upgraded = self.connector.upgrade(&self.host, stream, deadline)?;
        self.stream = Some(upgraded);
        self.record("*", "TLS negotiated");
        tracing::debug!(host = %self.host, "STARTTLS upgrade complete");
        Ok(())
    }

    pub(crate) fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            self.buffer.clear();
            self.record("*", "connection closed");
        }
    }

    pub(crate) fn note_failure(&mut self, err: &VerifyError) {
        tracing::debug!(host = %self.host, port = self.port, error = %err, "session step failed");
        self.record("!", &err.to_string());
    }

    pub(crate) fn record(&mut self, direction: &str, message: &str) {
        self.transcript
            .push(format!("[{}] {direction}: {message}", self.host));
    }

    fn send_line(&mut self, command: &str) -> Result<(), VerifyError> {
        let stream = self.stream.as_mut().ok_or(VerifyError::NotConnected)?;
        let mut data = command.as_bytes().to_vec();
        data.extend_from_slice(b"\r\n");
        stream.write_all(&data)?;
        stream.flush()?;
        Ok(())
    }

    /// Lit jusqu'à ce que le cadrage soit satisfait. Inactivité, EOF ou
    /// échéance de session terminent la lecture avec ce qui est arrivé.
    fn read_response(&mut self, framing: Framing) -> Result<String, VerifyError> {
        let mut lines = Vec::new();
        while let Some(line) = self.read_line()? {
            self.record("S", &line);
            let done = framing.is_complete(&line);
            lines.push(line);
            if done {
                break;
            }
        }
        Ok(lines.join("\n"))
    }

    fn read_line(&mut self) -> Result<Option<String>, VerifyError> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|byte| *byte == b'\n') {
                let line: Vec<u8> = self.buffer.drain(..=pos).collect();
                return Ok(Some(decode_line(&line)));
            }
            let Some(left) = self.deadline.and_then(remaining) else {
                self.record("*", "session time limit reached");
                return Ok(self.drain_partial());
            };
            let timeout = self.options.read_timeout().map_or(left, |idle| idle.min(left));

            let connector = self.connector;
            let stream = self.stream.as_mut().ok_or(VerifyError::NotConnected)?;
            connector.set_timeout(stream, timeout)?;
            let mut buf = [0u8; 512];
            match stream.read(&mut buf) {
                Ok(0) => return Ok(self.drain_partial()),
                Ok(read) => self.buffer.extend_from_slice(&buf[..read]),
                Err(err) if is_timeout(&err) => return Ok(self.drain_partial()),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn drain_partial(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            None
        } else {
            let line: Vec<u8> = self.buffer.drain(..).collect();
            Some(decode_line(&line))
        }
    }
}

fn decode_line(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    text.trim_end_matches(['\r', '\n']).to_string()
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smtp_framing_follows_continuation_marker() {
        assert!(!Framing::Smtp.is_complete("250-mail.example.com"));
        assert!(Framing::Smtp.is_complete("250 SIZE 1000"));
        assert!(Framing::Smtp.is_complete("250"));
    }

    #[test]
    fn truncated_tagged_reply_is_not_ok() {
        assert!(!imap_tagged_ok("* OK ready\n* OK [ALERT] checking credentials", "1"));
        assert!(!imap_tagged_ok("", "1"));
        assert!(!imap_tagged_ok("10 OK other tag", "1"));
    }

    #[test]
    fn imap_tagged_framing_waits_for_tag() {
        assert!(!Framing::ImapTagged.is_complete("* CAPABILITY IMAP4rev1"));
        assert!(Framing::ImapTagged.is_complete("1 OK done"));
    }

    #[test]
    fn predicates() {
        assert!(pop3_ok("+OK POP3 ready"));
        assert!(!pop3_ok("-ERR nope"));
        assert!(imap_ok("* OK IMAP ready"));
        assert!(!imap_ok("* BYE go away"));
        assert!(imap_tagged_ok("* CAPABILITY IMAP4rev1\n1 OK LOGIN completed", "1"));
        assert!(!imap_tagged_ok("1 NO bad credentials", "1"));
        assert!(smtp_code("250-first\n250 last", 250));
        assert!(!smtp_code("220 ready", 250));
        assert!(!smtp_code("", 220));
    }
}
