use anyhow::Result;
use maildiscovery_lib::discovery::AttemptOutcome;
use maildiscovery_lib::{DiscoveryReport, EndpointReport, ServerConfig, VerificationReport};

use crate::args::OutputFormat;

#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
pub struct Output<'a> {
    pub discovery: &'a DiscoveryReport,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub verification: Option<&'a VerificationReport>,
}

pub fn render(format: OutputFormat, output: &Output<'_>) -> Result<()> {
    match format {
        OutputFormat::Human => {
            print_human(output);
            Ok(())
        }
        OutputFormat::Json => print_json(output),
    }
}

#[cfg(feature = "with-serde")]
fn print_json(output: &Output<'_>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(output)?);
    Ok(())
}

#[cfg(not(feature = "with-serde"))]
fn print_json(_output: &Output<'_>) -> Result<()> {
    anyhow::bail!("format=json nécessite la feature 'with-serde'")
}

fn print_human(output: &Output<'_>) {
    let report = output.discovery;
    println!("{} (source: {})", report.email, report.source);
    if let Some(name) = report.config.display_name() {
        println!("  provider: {name}");
    }
    if let Some(server) = report.config.incoming() {
        println!("  incoming: {}", describe(server));
    }
    if let Some(server) = report.config.outgoing() {
        println!("  outgoing: {}", describe(server));
    }
    for attempt in &report.attempts {
        let outcome = match &attempt.outcome {
            AttemptOutcome::Found => "found".to_string(),
            AttemptOutcome::NotFound => "nothing to try".to_string(),
            AttemptOutcome::Failed(reason) => format!("failed: {reason}"),
        };
        println!("  - {:<18} {outcome}", attempt.source.as_str());
    }

    if let Some(verification) = output.verification {
        for endpoint in verification.endpoints() {
            print_endpoint(endpoint);
        }
    }
}

fn describe(server: &ServerConfig) -> String {
    format!(
        "{} {}:{} encryption={} auth={} user={}",
        server.role(),
        server.host(),
        server.port(),
        server.encryption(),
        server.auth_mode(),
        server.username()
    )
}

fn print_endpoint(endpoint: &EndpointReport) {
    let status = if endpoint.passed() { "[OK]  " } else { "[FAIL]" };
    let login = match endpoint.login {
        Some(true) => " login=ok",
        Some(false) => " login=failed",
        None => "",
    };
    println!(
        "{status} {} {}:{} reachable={}{login}",
        endpoint.role, endpoint.host, endpoint.port, endpoint.reachable
    );
    for line in &endpoint.transcript {
        println!("        {line}");
    }
}
