use std::path::PathBuf;
use std::time::Duration;

use folio_pdf::convert::DEFAULT_TIMEOUT;

use crate::prelude::*;

/// External tool configuration from environment variables
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Explicit LibreOffice binary; looked up on `PATH` when unset
    pub soffice: Option<PathBuf>,
    /// Explicit `pdftoppm` binary; looked up on `PATH` when unset
    pub pdftoppm: Option<PathBuf>,
    pub convert_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            soffice: None,
            pdftoppm: None,
            convert_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    /// Uses FOLIO_SOFFICE and FOLIO_PDFTOPPM for tool paths
    /// Uses FOLIO_CONVERT_TIMEOUT (seconds) with a 60 second default
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let convert_timeout = match lookup("FOLIO_CONVERT_TIMEOUT") {
            Some(raw) => Duration::from_secs(raw.trim().parse().map_err(|_| {
                eyre!(
                    "FOLIO_CONVERT_TIMEOUT must be a whole number of seconds, got {:?}",
                    raw
                )
            })?),
            None => DEFAULT_TIMEOUT,
        };

        Ok(Self {
            soffice: lookup("FOLIO_SOFFICE")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            pdftoppm: lookup("FOLIO_PDFTOPPM")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            convert_timeout,
        })
    }

    /// Apply CLI overrides to the configuration
    pub fn with_overrides(mut self, global: &crate::Global) -> Self {
        if let Some(path) = &global.soffice {
            self.soffice = Some(path.clone());
        }
        if let Some(path) = &global.pdftoppm {
            self.pdftoppm = Some(path.clone());
        }
        if let Some(secs) = global.convert_timeout {
            self.convert_timeout = Duration::from_secs(secs);
        }
        self
    }

    /// Environment configuration with the command line applied on top.
    pub fn load(global: &crate::Global) -> Result<Self> {
        Ok(Self::from_env()?.with_overrides(global))
    }
}
