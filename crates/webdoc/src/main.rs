//! webdoc CLI - static website compiler.
//!
//! Loads a site described in the webdoc XML vocabulary and writes one HTML
//! file per page:
//!
//! ```text
//! webdoc site.xml
//! webdoc --dump --output-dir public site.xml
//! ```

mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use commands::BuildArgs;
use output::Output;

/// Exit code for any configuration, parse or publish error.
const EXIT_FAILURE: i32 = -1;

/// webdoc - compile an XML site description into static HTML.
#[derive(Parser)]
#[command(name = "webdoc", version, about)]
struct Cli {
    #[command(flatten)]
    build: BuildArgs,
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.build.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = cli.build.execute(&output) {
        output.diagnostic(&err.to_string());
        std::process::exit(EXIT_FAILURE);
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_requires_entry_file() {
        assert!(Cli::try_parse_from(["webdoc"]).is_err());
    }

    #[test]
    fn test_parses_flags() {
        let cli =
            Cli::try_parse_from(["webdoc", "--dump", "-v", "-o", "public", "site.xml"]).unwrap();
        assert!(cli.build.verbose);
    }
}
