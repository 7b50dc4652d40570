use std::fmt;

use tracing::warn;

use crate::geo::CountryCode;
use crate::session::{CountryDirectory, Trip};
use crate::sync::PinId;

/// The popup target
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Set when the popup belongs to a stored pin
    pub pin_id: Option<PinId>,
    pub longitude: f64,
    pub latitude: f64,
    pub country: Option<CountryCode>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SelectionState {
    #[default]
    Idle,
    Active(Selection),
}

/// Where the host application should go next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Trip submission form
    TripForm,
    /// Trip browser for one country
    SearchTrips(String),
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::TripForm => "/form".to_string(),
            Route::SearchTrips(country) => {
                format!("/search_trips/{}", urlencoding::encode(country))
            }
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// The country-trips link shown in the popup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Affordance {
    /// Nobody has posted about this country yet
    BeTheFirst { country_name: String },
    /// At least one trip exists for this country
    SeeTrips {
        country_name: String,
        trip_count: usize,
    },
}

impl Affordance {
    pub fn country_name(&self) -> &str {
        match self {
            Affordance::BeTheFirst { country_name } => country_name,
            Affordance::SeeTrips { country_name, .. } => country_name,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Affordance::BeTheFirst { country_name } => {
                format!("No trips posted for {}. You can be the first!", country_name)
            }
            Affordance::SeeTrips { country_name, .. } => format!("See trips for {}", country_name),
        }
    }

    pub fn route(&self) -> Route {
        match self {
            Affordance::BeTheFirst { .. } => Route::TripForm,
            Affordance::SeeTrips { country_name, .. } => Route::SearchTrips(country_name.clone()),
        }
    }
}

/// Idle ⇄ Active(selection)
#[derive(Debug, Default)]
pub struct SelectionController {
    state: SelectionState,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, selection: Selection) {
        self.state = SelectionState::Active(selection);
    }

    pub fn dismiss(&mut self) {
        self.state = SelectionState::Idle;
    }

    pub fn active(&self) -> Option<&Selection> {
        match &self.state {
            SelectionState::Active(selection) => Some(selection),
            SelectionState::Idle => None,
        }
    }

    /// Go idle if the active selection is this pin
    pub fn clear_pin(&mut self, id: PinId) -> bool {
        if self.active().is_some_and(|s| s.pin_id == Some(id)) {
            self.dismiss();
            true
        } else {
            false
        }
    }

    /// Cross-reference the selected country against the trip list.
    /// A country missing from the directory yields no affordance.
    pub fn affordance(&self, directory: &CountryDirectory, trips: &[Trip]) -> Option<Affordance> {
        let selection = self.active()?;
        let code = selection.country.as_ref()?;

        let Some(country_name) = directory.full_name(code) else {
            warn!(country = %code, "Country missing from directory, no popup link");
            return None;
        };

        let trip_count = trips
            .iter()
            .filter(|trip| trip.country_name == country_name)
            .count();

        let country_name = country_name.to_string();
        Some(if trip_count == 0 {
            Affordance::BeTheFirst { country_name }
        } else {
            Affordance::SeeTrips {
                country_name,
                trip_count,
            }
        })
    }
}
