mod types;

pub use types::{CountryDirectory, CountryEntry, SignedInUser, Trip};

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::error::SessionError;
use crate::geo::CountryCode;

/// State owned by the collaborators around the map: who is signed in,
/// which trips exist, and the country directory.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default)]
    pub signed_in_user: Option<SignedInUser>,
    #[serde(default)]
    pub trips: Vec<Trip>,
    #[serde(default)]
    pub countries: CountryDirectory,
}

impl SessionSnapshot {
    /// Load a snapshot file. A missing file means nobody is signed in.
    #[instrument]
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Session snapshot not found, continuing signed out");
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let snapshot: Self = serde_json::from_str(&json)?;
        info!(
            signed_in = snapshot.signed_in_user.is_some(),
            trips = snapshot.trips.len(),
            countries = snapshot.countries.len(),
            "Loaded session snapshot"
        );
        Ok(snapshot)
    }

    /// Default snapshot location under the user's config directory
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pinmap")
            .join("session.json")
    }

    /// Countries the signed-in user has posted trips about
    pub fn country_codes(&self) -> BTreeSet<CountryCode> {
        let Some(user) = &self.signed_in_user else {
            return BTreeSet::new();
        };

        user.trips
            .iter()
            .filter_map(|trip| {
                let code = self.countries.code_for_name(&trip.country_name);
                if code.is_none() {
                    debug!(country = %trip.country_name, "Trip country missing from directory");
                }
                code.cloned()
            })
            .collect()
    }
}
