//! Configuration commands.

use clap::{Args, Subcommand};
use kiosk_attendance::Config;

use crate::Cli;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Print the effective configuration
    Show,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let mut cfg = Config::load(cli.config.as_deref())?;

        match &self.command {
            ConfigSubcommand::Show => {
                println!("# {}", cfg.path().display());
                if let Some(generator) = cfg.generator.as_mut() {
                    generator.api_key = mask_api_key(&generator.api_key);
                }
                print!("{}", cfg.to_yaml()?);
            }
            ConfigSubcommand::Init { force } => {
                if cfg.path().exists() && !force {
                    anyhow::bail!(
                        "{} already exists, use --force to overwrite",
                        cfg.path().display()
                    );
                }
                let path = cfg.path().to_path_buf();
                cfg = Config::default();
                cfg.set_path(&path);
                cfg.save()?;
                println!("wrote {}", path.display());
            }
        }
        Ok(())
    }
}

/// Masks the API key for display. `$NAME` references are shown as is.
fn mask_api_key(key: &str) -> String {
    if key.starts_with('$') {
        key.to_string()
    } else if key.chars().count() <= 8 {
        "*".repeat(key.chars().count())
    } else {
        let chars: Vec<char> = key.chars().collect();
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}{}{tail}", "*".repeat(chars.len() - 8))
    }
}
