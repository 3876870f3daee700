use std::time::Duration;

use anyhow::{Result, bail};
use clap::Parser;
use maildiscovery_lib::{DiscoveryOptions, Role, VerifyOptions};

#[derive(Parser)]
#[command(name = "mail-discover", version)]
#[command(about = "Découvre la configuration IMAP/POP3/SMTP d'une adresse e-mail")]
pub struct Cli {
    /// adresse e-mail à découvrir
    pub email: String,

    /// serveur entrant préféré: imap|pop3
    #[arg(long, default_value = "imap")]
    pub prefer: String,

    /// teste la connectivité des serveurs découverts
    #[arg(long)]
    pub verify: bool,

    /// mot de passe pour tester la connexion (exige --verify)
    #[arg(long, requires = "verify")]
    pub password: Option<String>,

    /// format: human|json
    #[arg(long, default_value = "human")]
    pub format: String,

    /// nom utilisé pour EHLO (par défaut localhost)
    #[arg(long)]
    pub helo: Option<String>,

    /// délai d'inactivité en lecture (ms)
    #[arg(long = "read-timeout-ms")]
    pub read_timeout_ms: Option<u64>,

    /// journalisation détaillée (debug)
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn output_format(&self) -> Result<OutputFormat> {
        match self.format.as_str() {
            "human" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            other => bail!("unknown --format '{other}', use: human|json"),
        }
    }

    pub fn preferred_role(&self) -> Result<Role> {
        let role: Role = self.prefer.parse()?;
        if !role.is_incoming() {
            bail!("--prefer must be imap or pop3, got '{}'", self.prefer);
        }
        Ok(role)
    }

    pub fn discovery_options(&self) -> Result<DiscoveryOptions> {
        Ok(DiscoveryOptions::new().with_preferred_role(self.preferred_role()?))
    }

    pub fn verify_options(&self) -> VerifyOptions {
        let mut options = VerifyOptions::new();
        if let Some(helo) = &self.helo {
            options = options.with_helo_domain(helo.as_str());
        }
        if let Some(ms) = self.read_timeout_ms {
            options = options.with_read_timeout(Duration::from_millis(ms));
        }
        options
    }
}
