mod args;
mod output;

use anyhow::{Context, Result};
use maildiscovery_lib::{discover_with_options, verify_account};
use tracing_subscriber::EnvFilter;

use args::Cli;
use output::Output;

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let format = cli.output_format()?;
    let options = cli.discovery_options()?;
    let mut report = discover_with_options(&cli.email, options)
        .with_context(|| format!("discovery failed for '{}'", cli.email))?;

    let verification = if cli.verify {
        Some(verify_account(
            &mut report.config,
            cli.password.as_deref(),
            &cli.verify_options(),
        ))
    } else {
        None
    };

    output::render(
        format,
        &Output {
            discovery: &report,
            verification: verification.as_ref(),
        },
    )?;

    // codes de sortie : 0 OK, 2 vérification en échec, 1 fatal
    if verification.is_some_and(|report| !report.all_passed()) {
        std::process::exit(2);
    }
    Ok(())
}
