use std::fmt;
use std::str::FromStr;

use super::AccountError;

/// Protocol spoken by a [`ServerConfig`].
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Imap,
    Pop3,
    Smtp,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Imap => "imap",
            Self::Pop3 => "pop3",
            Self::Smtp => "smtp",
        }
    }

    pub fn is_incoming(self) -> bool {
        matches!(self, Self::Imap | Self::Pop3)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AccountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "imap" => Ok(Self::Imap),
            "pop3" => Ok(Self::Pop3),
            "smtp" => Ok(Self::Smtp),
            other => Err(AccountError::UnknownRole(other.to_string())),
        }
    }
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encryption {
    None,
    Starttls,
    Ssl,
}

impl fmt::Display for Encryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Starttls => "starttls",
            Self::Ssl => "ssl",
        })
    }
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Plaintext,
    Encrypted,
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Plaintext => "plaintext",
            Self::Encrypted => "encrypted",
        })
    }
}

/// One protocol endpoint.
///
/// The role is fixed at construction. The verification flags start unset and
/// accept a single write each; later writes are ignored.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    role: Role,
    host: String,
    port: u16,
    encryption: Encryption,
    auth_mode: AuthMode,
    username: String,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    server_reachable: Option<bool>,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    login_valid: Option<bool>,
}

impl ServerConfig {
    pub fn new(
        role: Role,
        host: impl Into<String>,
        port: u16,
        encryption: Encryption,
        auth_mode: AuthMode,
        username: impl Into<String>,
    ) -> Result<Self, AccountError> {
        let host = host.into().trim().trim_end_matches('.').to_ascii_lowercase();
        if host.is_empty() {
            return Err(AccountError::invalid_server(role, "host is empty"));
        }
        if host.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(AccountError::invalid_server(
                role,
                format!("host '{host}' contains whitespace"),
            ));
        }
        if port == 0 {
            return Err(AccountError::invalid_server(role, "port 0 is not usable"));
        }
        Ok(Self {
            role,
            host,
            port,
            encryption,
            auth_mode,
            username: username.into(),
            server_reachable: None,
            login_valid: None,
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn encryption(&self) -> Encryption {
        self.encryption
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.auth_mode
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn server_reachable(&self) -> Option<bool> {
        self.server_reachable
    }

    pub fn login_valid(&self) -> Option<bool> {
        self.login_valid
    }

    /// Stores the reachability verdict. Returns `false` when a verdict was
    /// already recorded.
    pub fn record_reachable(&mut self, reachable: bool) -> bool {
        if self.server_reachable.is_some() {
            return false;
        }
        self.server_reachable = Some(reachable);
        true
    }

    /// Stores the login verdict. Returns `false` when a verdict was already
    /// recorded.
    pub fn record_login(&mut self, valid: bool) -> bool {
        if self.login_valid.is_some() {
            return false;
        }
        self.login_valid = Some(valid);
        true
    }

    pub(crate) fn fill_username(&mut self, fallback: &str) {
        if self.username.trim().is_empty() {
            self.username = fallback.to_string();
        }
    }
}

/// Canonical discovery result: at most one incoming and one outgoing endpoint.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailAccountConfig {
    display_name: Option<String>,
    incoming: Option<ServerConfig>,
    outgoing: Option<ServerConfig>,
}

impl MailAccountConfig {
    pub fn new(
        display_name: Option<String>,
        incoming: Option<ServerConfig>,
        outgoing: Option<ServerConfig>,
    ) -> Result<Self, AccountError> {
        if let Some(server) = &incoming {
            if !server.role().is_incoming() {
                return Err(AccountError::RoleMismatch {
                    slot: "incoming",
                    role: server.role(),
                });
            }
        }
        if let Some(server) = &outgoing {
            if server.role() != Role::Smtp {
                return Err(AccountError::RoleMismatch {
                    slot: "outgoing",
                    role: server.role(),
                });
            }
        }
        let display_name = display_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());
        Ok(Self {
            display_name,
            incoming,
            outgoing,
        })
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn incoming(&self) -> Option<&ServerConfig> {
        self.incoming.as_ref()
    }

    pub fn outgoing(&self) -> Option<&ServerConfig> {
        self.outgoing.as_ref()
    }

    pub fn incoming_mut(&mut self) -> Option<&mut ServerConfig> {
        self.incoming.as_mut()
    }

    pub fn outgoing_mut(&mut self) -> Option<&mut ServerConfig> {
        self.outgoing.as_mut()
    }

    pub fn is_empty(&self) -> bool {
        self.incoming.is_none() && self.outgoing.is_none()
    }

    pub(crate) fn fill_usernames(&mut self, email: &str) {
        if let Some(server) = self.incoming.as_mut() {
            server.fill_username(email);
        }
        if let Some(server) = self.outgoing.as_mut() {
            server.fill_username(email);
        }
    }
}
