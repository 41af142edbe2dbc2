//! Webhook command

use std::io::Read;
use std::path::PathBuf;

use apireview_core::webhook::{is_relevant, WebhookPayload};
use clap::Args;

#[derive(Args, Debug)]
pub struct WebhookArgs {
    /// Payload file (reads stdin if omitted)
    pub payload: Option<PathBuf>,
}

impl WebhookArgs {
    pub fn execute(&self) -> anyhow::Result<()> {
        let json = match &self.payload {
            Some(path) => std::fs::read_to_string(path)?,
            None => {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                buf
            }
        };

        let payload = WebhookPayload::from_json(&json)?;
        if is_relevant(&payload) {
            println!("relevant");
        } else {
            println!("ignored");
        }
        Ok(())
    }
}
