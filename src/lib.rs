#![forbid(unsafe_code)]
//! maildiscovery_lib : découverte de configuration IMAP/POP3/SMTP et
//! vérification de connectivité.

pub mod account;
pub mod discovery;
pub mod validator;
pub mod verify;

pub use account::{AccountError, AuthMode, Encryption, MailAccountConfig, Role, ServerConfig};
pub use discovery::{
    Discovery, DiscoveryError, DiscoveryOptions, DiscoveryReport, DiscoverySource, discover,
    discover_with_options, guess_config,
};
pub use validator::{EmailAddress, EmailError, parse_address};
pub use verify::{
    EndpointReport, VerificationReport, VerifyError, VerifyOptions, verify_account,
    verify_account_with,
};
