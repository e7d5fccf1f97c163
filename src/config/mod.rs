pub mod profile;

#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::validation::{validate_path, validate_url, Validate};
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "lineitem-sync")]
#[command(about = "Reconcile line-item prices and subtotals in a formset snapshot")]
pub struct CliConfig {
    /// Formset snapshot to load (flat JSON object of field values)
    #[arg(long)]
    pub input: String,

    /// Where the reconciled snapshot is written
    #[arg(long, default_value = "reconciled_form.json")]
    pub output: String,

    /// Base URL of the price lookup API (overrides the profile's)
    #[arg(long)]
    pub api_base: Option<String>,

    /// TOML form profile; defaults to the Django admin inline conventions
    #[arg(long)]
    pub profile: Option<String>,

    /// Replay a JSON event script instead of planning a reconcile pass
    #[arg(long)]
    pub events: Option<String>,

    /// Re-resolve prices even for rows that already have one
    #[arg(long)]
    pub force_refresh: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log process CPU/memory stats")]
    pub monitor: bool,
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_path("input", &self.input)?;
        validate_path("output", &self.output)?;

        if let Some(api_base) = &self.api_base {
            validate_url("api_base", api_base)?;
        }
        if let Some(profile) = &self.profile {
            validate_path("profile", profile)?;
        }
        if let Some(events) = &self.events {
            validate_path("events", events)?;
        }

        Ok(())
    }
}
