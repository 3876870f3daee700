use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::rc::Rc;
use std::time::{Duration, Instant};

use super::{
    Connector, ImapProbe, Pop3Probe, ProtocolProbe, VerifyError, VerifyOptions,
    verify_account_with,
};
use crate::account::{AuthMode, Encryption, MailAccountConfig, Role, ServerConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Connected { host: String, tls: bool },
    Sent(String),
    Upgraded,
    Closed,
}

type Log = Rc<RefCell<Vec<Event>>>;

/// In-memory server: the greeting is readable at once and every
/// CRLF-terminated command releases the next canned reply. With nothing
/// left to say, reads behave like an idle timeout.
struct ScriptedStream {
    replies: VecDeque<&'static str>,
    readable: VecDeque<u8>,
    pending: Vec<u8>,
    log: Log,
}

impl ScriptedStream {
    fn release_next(&mut self) {
        if let Some(reply) = self.replies.pop_front() {
            self.readable.extend(reply.as_bytes());
        }
    }
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.readable.is_empty() {
            return Err(io::Error::new(io::ErrorKind::WouldBlock, "idle"));
        }
        let mut count = 0;
        while count < buf.len() {
            match self.readable.pop_front() {
                Some(byte) => {
                    buf[count] = byte;
                    count += 1;
                }
                None => break,
            }
        }
        Ok(count)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        while let Some(pos) = self.pending.windows(2).position(|pair| pair == b"\r\n") {
            let line: Vec<u8> = self.pending.drain(..pos + 2).collect();
            let text = String::from_utf8_lossy(&line[..pos]).into_owned();
            self.log.borrow_mut().push(Event::Sent(text));
            self.release_next();
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ScriptedStream {
    fn drop(&mut self) {
        self.log.borrow_mut().push(Event::Closed);
    }
}

/// Hands out one scripted stream per connection, in order.
#[derive(Default)]
struct ScriptedConnector {
    scripts: RefCell<VecDeque<Vec<&'static str>>>,
    log: Log,
    fail_upgrade: bool,
    deadlines: RefCell<Vec<Instant>>,
    timeouts: RefCell<Vec<Duration>>,
}

impl ScriptedConnector {
    fn new<I>(scripts: I) -> Self
    where
        I: IntoIterator<Item = Vec<&'static str>>,
    {
        Self {
            scripts: RefCell::new(scripts.into_iter().collect()),
            ..Self::default()
        }
    }

    fn events(&self) -> Vec<Event> {
        self.log.borrow().clone()
    }

    fn count(&self, wanted: &Event) -> usize {
        self.log.borrow().iter().filter(|event| *event == wanted).count()
    }

    fn connections(&self) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|event| matches!(event, Event::Connected { .. }))
            .count()
    }
}

impl Connector for ScriptedConnector {
    type Stream = ScriptedStream;

    fn connect(
        &self,
        host: &str,
        _port: u16,
        tls: bool,
        deadline: Instant,
    ) -> Result<ScriptedStream, VerifyError> {
        self.deadlines.borrow_mut().push(deadline);
        let script = self.scripts.borrow_mut().pop_front().ok_or_else(|| {
            VerifyError::connect(
                host,
                io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
            )
        })?;
        self.log.borrow_mut().push(Event::Connected {
            host: host.to_string(),
            tls,
        });
        let mut stream = ScriptedStream {
            replies: script.into_iter().collect(),
            readable: VecDeque::new(),
            pending: Vec::new(),
            log: Rc::clone(&self.log),
        };
        stream.release_next();
        Ok(stream)
    }

    fn upgrade(
        &self,
        _host: &str,
        stream: ScriptedStream,
        deadline: Instant,
    ) -> Result<ScriptedStream, VerifyError> {
        self.deadlines.borrow_mut().push(deadline);
        if self.fail_upgrade {
            return Err(VerifyError::protocol("handshake failed"));
        }
        self.log.borrow_mut().push(Event::Upgraded);
        Ok(stream)
    }

    fn set_timeout(&self, _stream: &ScriptedStream, timeout: Duration) -> Result<(), VerifyError> {
        self.timeouts.borrow_mut().push(timeout);
        Ok(())
    }
}

fn server(role: Role, host: &str, encryption: Encryption) -> ServerConfig {
    ServerConfig::new(
        role,
        host,
        if role == Role::Smtp { 587 } else { 993 },
        encryption,
        AuthMode::Plaintext,
        "jane@example.com",
    )
    .expect("valid server")
}

fn incoming_only(role: Role, encryption: Encryption) -> MailAccountConfig {
    MailAccountConfig::new(None, Some(server(role, "in.example.com", encryption)), None)
        .expect("valid config")
}

fn outgoing_only(encryption: Encryption) -> MailAccountConfig {
    MailAccountConfig::new(None, None, Some(server(Role::Smtp, "out.example.com", encryption)))
        .expect("valid config")
}

fn sent(command: &str) -> Event {
    Event::Sent(command.to_string())
}

#[test]
fn pop3_stls_upgrades_before_login() {
    let connector = ScriptedConnector::new([vec![
        "+OK POP3 ready\r\n",
        "+OK begin TLS\r\n",
        "+OK send PASS\r\n",
        "+OK logged in\r\n",
    ]]);
    let mut config = incoming_only(Role::Pop3, Encryption::Starttls);

    let report = verify_account_with(
        &mut config,
        Some("secret"),
        &connector,
        &VerifyOptions::default(),
    );

    assert_eq!(
        connector.events(),
        vec![
            Event::Connected {
                host: "in.example.com".into(),
                tls: false
            },
            sent("STLS"),
            Event::Upgraded,
            sent("USER jane@example.com"),
            sent("PASS secret"),
            Event::Closed,
        ]
    );
    let incoming = report.incoming.expect("incoming report");
    assert!(incoming.reachable);
    assert_eq!(incoming.login, Some(true));
    assert!(incoming.transcript.iter().any(|line| line.ends_with("C: PASS ****")));
    assert!(!incoming.transcript.iter().any(|line| line.contains("secret")));
    assert_eq!(config.incoming().and_then(ServerConfig::login_valid), Some(true));
}

#[test]
fn pop3_stls_refusal_fails_without_upgrade() {
    let connector = ScriptedConnector::new([vec![
        "+OK POP3 ready\r\n",
        "-ERR TLS not available\r\n",
    ]]);
    let mut config = incoming_only(Role::Pop3, Encryption::Starttls);

    let report = verify_account_with(
        &mut config,
        Some("secret"),
        &connector,
        &VerifyOptions::default(),
    );

    assert_eq!(connector.count(&Event::Upgraded), 0);
    assert_eq!(connector.count(&Event::Closed), 1);
    let incoming = report.incoming.expect("incoming report");
    assert!(!incoming.reachable);
    assert_eq!(incoming.login, None);
    assert_eq!(config.incoming().and_then(ServerConfig::server_reachable), Some(false));
    assert_eq!(config.incoming().and_then(ServerConfig::login_valid), None);
}

#[test]
fn failed_upgrade_releases_the_socket() {
    let connector = ScriptedConnector {
        fail_upgrade: true,
        ..ScriptedConnector::new([vec!["+OK ready\r\n", "+OK go\r\n"]])
    };
    let mut config = incoming_only(Role::Pop3, Encryption::Starttls);

    let report = verify_account_with(&mut config, None, &connector, &VerifyOptions::default());

    assert!(!report.all_passed());
    assert_eq!(connector.count(&Event::Closed), 1);
    let transcript = report.incoming.expect("incoming").transcript;
    assert!(transcript.iter().any(|line| line.contains("handshake failed")));
}

#[test]
fn imap_ssl_login_masks_password() {
    let connector = ScriptedConnector::new([vec![
        "* OK IMAP4rev1 ready\r\n",
        "* CAPABILITY IMAP4rev1 IDLE\r\n1 OK LOGIN completed\r\n",
    ]]);
    let mut config = incoming_only(Role::Imap, Encryption::Ssl);

    let report = verify_account_with(
        &mut config,
        Some("secret"),
        &connector,
        &VerifyOptions::default(),
    );

    assert_eq!(
        connector.events(),
        vec![
            Event::Connected {
                host: "in.example.com".into(),
                tls: true
            },
            sent("1 LOGIN jane@example.com secret"),
            Event::Closed,
        ]
    );
    let incoming = report.incoming.expect("incoming report");
    assert_eq!(incoming.login, Some(true));
    assert!(
        incoming
            .transcript
            .iter()
            .any(|line| line.ends_with("C: 1 LOGIN jane@example.com ****"))
    );
}

#[test]
fn imap_rejected_login_is_recorded() {
    let connector = ScriptedConnector::new([vec![
        "* OK ready\r\n",
        "1 NO [AUTHENTICATIONFAILED] invalid credentials\r\n",
    ]]);
    let mut config = incoming_only(Role::Imap, Encryption::None);

    let report = verify_account_with(
        &mut config,
        Some("wrong"),
        &connector,
        &VerifyOptions::default(),
    );

    let incoming = report.incoming.expect("incoming report");
    assert!(incoming.reachable);
    assert_eq!(incoming.login, Some(false));
    assert!(!incoming.passed());
    assert_eq!(connector.count(&Event::Closed), 1);
    let server = config.incoming().expect("incoming");
    assert_eq!(server.server_reachable(), Some(true));
    assert_eq!(server.login_valid(), Some(false));
}

#[test]
fn imap_starttls_uses_tagged_command() {
    let connector = ScriptedConnector::new([vec![
        "* OK ready\r\n",
        "1 OK Begin TLS negotiation now\r\n",
    ]]);
    let mut config = incoming_only(Role::Imap, Encryption::Starttls);

    verify_account_with(&mut config, None, &connector, &VerifyOptions::default());

    assert_eq!(
        &connector.events()[1..],
        &[sent("1 STARTTLS"), Event::Upgraded, Event::Closed]
    );
}

#[test]
fn smtp_starttls_repeats_ehlo_then_auth_login() {
    let connector = ScriptedConnector::new([vec![
        "220-smtp.example.com ESMTP\r\n220 ready\r\n",
        "250-smtp.example.com\r\n250-PIPELINING\r\n250 STARTTLS\r\n",
        "220 2.0.0 go ahead\r\n",
        "250-smtp.example.com\r\n250 AUTH LOGIN PLAIN\r\n",
        "334 VXNlcm5hbWU6\r\n",
        "334 UGFzc3dvcmQ6\r\n",
        "235 2.7.0 accepted\r\n",
    ]]);
    let mut config = outgoing_only(Encryption::Starttls);
    let options = VerifyOptions::default().with_helo_domain("client.example.org");

    let report = verify_account_with(&mut config, Some("secret"), &connector, &options);

    assert_eq!(
        &connector.events()[1..],
        &[
            sent("EHLO client.example.org"),
            sent("STARTTLS"),
            Event::Upgraded,
            sent("EHLO client.example.org"),
            sent("AUTH LOGIN"),
            sent("amFuZUBleGFtcGxlLmNvbQ=="),
            sent("c2VjcmV0"),
            Event::Closed,
        ]
    );
    let outgoing = report.outgoing.expect("outgoing report");
    assert!(outgoing.reachable);
    assert_eq!(outgoing.login, Some(true));
    assert!(!outgoing.transcript.iter().any(|line| line.contains("c2VjcmV0")));
}

#[test]
fn smtp_rejected_greeting_is_unreachable() {
    let connector = ScriptedConnector::new([vec!["554 no service\r\n"]]);
    let mut config = outgoing_only(Encryption::None);

    let report = verify_account_with(
        &mut config,
        Some("secret"),
        &connector,
        &VerifyOptions::default(),
    );

    let outgoing = report.outgoing.expect("outgoing report");
    assert!(!outgoing.reachable);
    assert_eq!(outgoing.login, None);
    assert_eq!(connector.count(&sent("AUTH LOGIN")), 0);
    assert_eq!(connector.count(&Event::Closed), 1);
}

#[test]
fn silent_server_times_out_as_failure() {
    let connector = ScriptedConnector::new([vec![""]]);
    let mut config = incoming_only(Role::Pop3, Encryption::None);

    let report = verify_account_with(&mut config, None, &connector, &VerifyOptions::default());

    assert!(!report.incoming.expect("incoming").reachable);
    assert_eq!(connector.count(&Event::Closed), 1);
}

#[test]
fn refused_connection_opens_nothing() {
    let connector = ScriptedConnector::new(Vec::<Vec<&'static str>>::new());
    let mut config = incoming_only(Role::Imap, Encryption::Ssl);

    let report = verify_account_with(
        &mut config,
        Some("secret"),
        &connector,
        &VerifyOptions::default(),
    );

    let incoming = report.incoming.expect("incoming report");
    assert!(!incoming.reachable);
    assert!(incoming.transcript.iter().any(|line| line.contains("refused")));
    assert_eq!(connector.connections(), 0);
    assert_eq!(connector.count(&Event::Closed), 0);
}

#[test]
fn incoming_is_checked_before_outgoing_and_each_socket_closes_once() {
    let connector = ScriptedConnector::new([
        vec!["* OK ready\r\n"],
        vec!["220 ready\r\n", "250 hello\r\n"],
    ]);
    let incoming = server(Role::Imap, "imap.example.com", Encryption::None);
    let outgoing = server(Role::Smtp, "smtp.example.com", Encryption::None);
    let mut config =
        MailAccountConfig::new(None, Some(incoming), Some(outgoing)).expect("valid config");

    let report = verify_account_with(&mut config, None, &connector, &VerifyOptions::default());

    assert!(report.all_passed());
    assert_eq!(
        connector.events(),
        vec![
            Event::Connected {
                host: "imap.example.com".into(),
                tls: false
            },
            Event::Closed,
            Event::Connected {
                host: "smtp.example.com".into(),
                tls: false
            },
            sent("EHLO localhost"),
            Event::Closed,
        ]
    );
}

#[test]
fn authenticate_without_check_reports_not_connected() {
    let connector = ScriptedConnector::new(Vec::<Vec<&'static str>>::new());
    let config = server(Role::Pop3, "pop.example.com", Encryption::None);
    let options = VerifyOptions::default();
    let mut probe = Pop3Probe::new(&connector, &config, &options);

    assert!(!probe.authenticate("jane", "secret"));
    assert!(probe.transcript().iter().any(|line| line.contains("not connected")));
}

#[test]
fn imap_check_can_be_driven_directly() {
    let connector = ScriptedConnector::new([vec!["* OK ready\r\n"]]);
    let config = server(Role::Imap, "imap.example.com", Encryption::None);
    let options = VerifyOptions::default();
    let mut probe = ImapProbe::new(&connector, &config, &options);

    assert_eq!(probe.role(), Role::Imap);
    assert!(probe.check());
    probe.close();
    probe.close();
    assert_eq!(connector.count(&Event::Closed), 1);
}

#[test]
fn verdicts_are_set_once() {
    let connector = ScriptedConnector::new([vec!["* OK ready\r\n"], vec!["* BYE go away\r\n"]]);
    let mut config = incoming_only(Role::Imap, Encryption::None);
    let options = VerifyOptions::default();

    verify_account_with(&mut config, None, &connector, &options);
    let second = verify_account_with(&mut config, None, &connector, &options);

    assert!(!second.incoming.expect("incoming").reachable);
    assert_eq!(config.incoming().and_then(ServerConfig::server_reachable), Some(true));
}

#[test]
fn imap_login_without_tagged_reply_fails() {
    let connector = ScriptedConnector::new([vec![
        "* OK ready\r\n",
        "* OK [ALERT] checking credentials\r\n",
    ]]);
    let mut config = incoming_only(Role::Imap, Encryption::None);

    let report = verify_account_with(
        &mut config,
        Some("wrong"),
        &connector,
        &VerifyOptions::default(),
    );

    let incoming = report.incoming.expect("incoming report");
    assert!(incoming.reachable);
    assert_eq!(incoming.login, Some(false));
    assert_eq!(config.incoming().and_then(ServerConfig::login_valid), Some(false));
}

#[test]
fn imap_starttls_without_tagged_reply_does_not_upgrade() {
    let connector = ScriptedConnector::new([vec!["* OK ready\r\n", "* OK still thinking\r\n"]]);
    let mut config = incoming_only(Role::Imap, Encryption::Starttls);

    let report = verify_account_with(&mut config, None, &connector, &VerifyOptions::default());

    assert!(!report.all_passed());
    assert_eq!(connector.count(&Event::Upgraded), 0);
}

#[test]
fn connect_and_upgrade_receive_the_session_deadline() {
    let connector = ScriptedConnector::new([vec![
        "+OK ready\r\n",
        "+OK begin TLS\r\n",
    ]]);
    let mut config = incoming_only(Role::Pop3, Encryption::Starttls);
    let options = VerifyOptions::default().with_session_timeout(Duration::from_secs(5));
    let before = Instant::now();

    verify_account_with(&mut config, None, &connector, &options);

    let deadlines = connector.deadlines.borrow();
    assert_eq!(deadlines.len(), 2);
    assert!(deadlines.iter().all(|deadline| *deadline <= Instant::now() + Duration::from_secs(5)));
    assert!(deadlines.iter().all(|deadline| *deadline >= before));
    assert_eq!(deadlines[0], deadlines[1]);
}

#[test]
fn reads_are_bounded_by_idle_timeout() {
    let connector = ScriptedConnector::new([vec!["* OK ready\r\n"]]);
    let mut config = incoming_only(Role::Imap, Encryption::None);

    verify_account_with(&mut config, None, &connector, &VerifyOptions::default());

    let timeouts = connector.timeouts.borrow();
    assert!(!timeouts.is_empty());
    assert!(timeouts.iter().all(|timeout| *timeout <= Duration::from_secs(2)));
}

#[test]
fn reads_without_idle_timeout_stay_under_session_ceiling() {
    let connector = ScriptedConnector::new([vec!["+OK ready\r\n"]]);
    let mut config = incoming_only(Role::Pop3, Encryption::None);
    let options = VerifyOptions::default()
        .with_read_timeout(Duration::ZERO)
        .with_session_timeout(Duration::from_secs(5));

    verify_account_with(&mut config, None, &connector, &options);

    let timeouts = connector.timeouts.borrow();
    assert!(!timeouts.is_empty());
    assert!(
        timeouts
            .iter()
            .all(|timeout| !timeout.is_zero() && *timeout <= Duration::from_secs(5))
    );
}
