//! Login and logout.
//!
//! The API token returned by sign-in is stored in the CLI config file; other
//! settings in that file are left as they are.

use std::io::Write;

use tracing::info;

use crate::cli::LoginArgs;
use crate::client::FleetClient;
use crate::config::{FileConfig, Settings};
use crate::error::{CliError, CliResult};
use crate::output::{Message, OutputFormat};

/// Auth command executor.
pub struct AuthCommand {
    settings: Settings,
}

impl AuthCommand {
    /// Create a new auth command.
    #[must_use]
    pub const fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Sign in and store the token.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are rejected or the config file
    /// cannot be written.
    pub async fn login<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        args: &LoginArgs,
    ) -> CliResult<()> {
        if args.email.trim().is_empty() {
            return Err(CliError::invalid("email cannot be empty"));
        }

        let client = FleetClient::new(&self.settings.api_url, None)?;
        let token = client.sign_in(&args.email, &args.password).await?;

        let path = &self.settings.config_path;
        let mut file = FileConfig::load(path)?;
        file.token = Some(token);
        file.save(path)?;
        info!(email = %args.email, path = %path.display(), "Token stored");

        format.write(writer, &Message::success(format!("Logged in as {}", args.email)))
    }

    /// Remove the stored token.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or written.
    pub fn logout<W: Write>(&self, writer: &mut W, format: &OutputFormat) -> CliResult<()> {
        let path = &self.settings.config_path;
        let mut file = FileConfig::load(path)?;
        if file.token.take().is_none() {
            return format.write(writer, &Message::info("Not logged in"));
        }
        file.save(path)?;
        info!(path = %path.display(), "Token removed");
        format.write(writer, &Message::success("Logged out"))
    }
}
