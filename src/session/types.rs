use std::collections::HashMap;

use serde::Deserialize;

use crate::geo::CountryCode;
use crate::sync::Pin;

/// The signed-in user as handed over by the authentication layer
#[derive(Debug, Clone, Deserialize)]
pub struct SignedInUser {
    pub id: u64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub pinned_locations: Vec<Pin>,
    /// Trips this user has posted
    #[serde(default)]
    pub trips: Vec<Trip>,
}

/// A posted trip. Only the country is relevant to the map.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Trip {
    #[serde(alias = "countryName")]
    pub country_name: String,
}

#[cfg(test)]
impl Trip {
    pub fn new(country_name: impl Into<String>) -> Self {
        Self {
            country_name: country_name.into(),
        }
    }
}

/// Country directory entry (restcountries shape)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CountryEntry {
    #[serde(rename = "alpha3Code")]
    pub alpha3_code: CountryCode,
    #[serde(alias = "fullName")]
    pub name: String,
}

#[cfg(test)]
impl CountryEntry {
    pub fn new(code: &str, name: &str) -> Self {
        Self {
            alpha3_code: CountryCode::new(code),
            name: name.to_string(),
        }
    }
}

/// Read-only lookup between alpha-3 codes and full country names
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "Vec<CountryEntry>")]
pub struct CountryDirectory {
    entries: Vec<CountryEntry>,
    by_code: HashMap<CountryCode, usize>,
}

impl From<Vec<CountryEntry>> for CountryDirectory {
    fn from(entries: Vec<CountryEntry>) -> Self {
        let mut by_code = HashMap::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            // first entry wins on duplicate codes
            by_code.entry(entry.alpha3_code.clone()).or_insert(index);
        }
        Self { entries, by_code }
    }
}

impl CountryDirectory {
    pub fn full_name(&self, code: &CountryCode) -> Option<&str> {
        self.by_code
            .get(code)
            .map(|&index| self.entries[index].name.as_str())
    }

    pub fn code_for_name(&self, name: &str) -> Option<&CountryCode> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.alpha3_code)
    }

    /// Case-insensitive search: exact code, then name prefix, then substring
    pub fn search(&self, query: &str) -> Option<&CountryEntry> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return None;
        }

        self.entries
            .iter()
            .find(|e| e.alpha3_code.as_str().eq_ignore_ascii_case(&query))
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|e| e.name.to_lowercase().starts_with(&query))
            })
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|e| e.name.to_lowercase().contains(&query))
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
