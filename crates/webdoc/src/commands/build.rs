//! Site build: load the entry file, publish every page.

use std::path::PathBuf;

use clap::Args;
use webdoc_config::{CliSettings, Config};
use webdoc_site::{BuildOptions, PublishOptions, Publisher};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for building a site.
#[derive(Args)]
pub(crate) struct BuildArgs {
    /// Entry XML file of the site.
    file: PathBuf,

    /// Directory to publish pages under (overrides config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Base URL for a <site> without url attribute (overrides config).
    #[arg(long)]
    base_url: Option<String>,

    /// Print the node tree before publishing.
    #[arg(long)]
    dump: bool,

    /// Enable verbose output (show sourced files and written pages).
    #[arg(short, long)]
    pub(crate) verbose: bool,

    /// Path to configuration file (default: auto-discover webdoc.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl BuildArgs {
    pub(crate) fn execute(self, output: &Output) -> Result<(), CliError> {
        let cli_settings = CliSettings {
            output_dir: self.output_dir,
            base_url: self.base_url,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        if let Some(path) = &config.config_path {
            tracing::debug!(path = %path.display(), "loaded configuration");
        }

        let build_options = BuildOptions {
            base_url: config.site.base_url.clone(),
            default_template: config.site.default_template.clone(),
        };
        let mut doc = webdoc_site::load(&self.file, &build_options)?;

        if self.dump {
            output.highlight("== Node Tree ==");
            output.info(doc.dump().trim_end());
            output.highlight("== Publish ==");
        }

        let output_dir = &config.output_resolved.dir;
        let publisher = Publisher::new(
            PublishOptions::default()
                .with_output_dir(output_dir)
                .with_max_expansion_depth(config.expand.max_depth),
        );
        let report = publisher.publish(&mut doc)?;

        if report.pages.is_empty() {
            output.warning(&format!("No pages found in {}", self.file.display()));
        } else {
            output.success(&format!(
                "Published {} page(s) to {}",
                report.pages.len(),
                output_dir.display()
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use webdoc_config::{ExpandConfig, SiteConfig};

    #[test]
    fn test_config_defaults_match_site_defaults() {
        let site = SiteConfig::default();
        assert_eq!(site.base_url, webdoc_site::DEFAULT_SITE_URL);
        assert_eq!(site.default_template, webdoc_site::DEFAULT_TEMPLATE);
        assert_eq!(ExpandConfig::default().max_depth, webdoc_site::DEFAULT_MAX_DEPTH);
    }
}
