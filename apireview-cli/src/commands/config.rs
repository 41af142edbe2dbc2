//! Config command

use apireview_core::{Config, Secrets};
use apireview_github::GitHubClient;
use clap::Args;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Create an empty secrets file with owner-only permissions
    #[arg(long)]
    pub init_secrets: bool,

    /// Verify the GitHub token against the configured repositories
    #[arg(long)]
    pub check: bool,
}

impl ConfigArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        if self.init_secrets {
            let path = Secrets::create_template()?;
            println!("Created {}", path.display());
            return Ok(());
        }

        if self.check {
            let client = GitHubClient::from_secrets(&Secrets::load()?)?;
            for repo in config.github.repo_names()? {
                client.test_connection(&repo).await?;
                println!("  {}: ok", repo);
            }
            return Ok(());
        }

        println!("API Review Configuration");
        println!("========================");
        println!();
        print!("{}", config.to_toml()?);
        println!();

        if let Some(path) = Config::default_config_path() {
            println!("Config file: {}", path.display());
            if path.exists() {
                println!("  (exists)");
            } else {
                println!("  (not found - using defaults)");
            }
        }
        if let Some(path) = Secrets::default_secrets_path() {
            println!("Secrets file: {}", path.display());
            if path.exists() {
                println!("  (exists)");
            } else {
                println!("  (not found - run `apireview config --init-secrets`)");
            }
        }
        Ok(())
    }
}
