use std::path::Path;

use geo::{Geometry, MultiPolygon};
use geojson::{Feature, GeoJson};
use tracing::{debug, info, instrument};

use crate::error::GeoError;

use super::types::*;

/// Coarse admin-0 boundaries compiled into the binary
const EMBEDDED_BOUNDARIES: &str = include_str!("../../data/countries.geojson");

/// Feature properties that may carry the alpha-3 code, in lookup order
const CODE_PROPERTIES: [&str; 4] = ["ADM0_A3_IS", "ADM0_A3", "ISO_A3", "iso_a3"];

/// Feature properties that may carry a display name
const NAME_PROPERTIES: [&str; 3] = ["NAME", "ADMIN", "name"];

/// Offline reverse geocoder over an admin-0 boundary dataset
#[derive(Debug, Clone)]
pub struct Geocoder {
    countries: Vec<Country>,
}

impl Geocoder {
    /// Geocoder backed by the compiled-in dataset
    pub fn embedded() -> Result<Self, GeoError> {
        Self::from_geojson(EMBEDDED_BOUNDARIES)
    }

    /// Load a GeoJSON FeatureCollection from disk
    #[instrument]
    pub fn from_path(path: &Path) -> Result<Self, GeoError> {
        let json = std::fs::read_to_string(path)?;
        let geocoder = Self::from_geojson(&json)?;
        info!(countries = geocoder.len(), "Loaded boundary dataset");
        Ok(geocoder)
    }

    pub fn from_geojson(json: &str) -> Result<Self, GeoError> {
        let GeoJson::FeatureCollection(collection) = json.parse::<GeoJson>()? else {
            return Err(GeoError::NotFeatureCollection);
        };

        let mut countries = Vec::with_capacity(collection.features.len());
        for (index, feature) in collection.features.into_iter().enumerate() {
            if let Some(country) = build_country(index, feature)? {
                countries.push(country);
            }
        }

        if countries.is_empty() {
            return Err(GeoError::Empty);
        }

        Ok(Self { countries })
    }

    /// Country containing the point, or `None` for open water and
    /// anything outside the dataset
    pub fn resolve_country(&self, longitude: f64, latitude: f64) -> Option<CountryCode> {
        self.countries
            .iter()
            .find(|c| c.contains(longitude, latitude))
            .map(|c| c.code.clone())
    }

    /// Extent of a country, for flying the viewport to it
    pub fn locate(&self, code: &CountryCode) -> Option<BoundingBox> {
        let mut found = self.countries.iter().filter(|c| &c.code == code).peekable();
        found.peek()?;

        let mut bbox = BoundingBox::empty();
        for country in found {
            bbox.extend(country.bbox.west, country.bbox.south);
            bbox.extend(country.bbox.east, country.bbox.north);
        }
        Some(bbox)
    }

    /// Display name the dataset gives a country
    pub fn name(&self, code: &CountryCode) -> Option<&str> {
        self.countries
            .iter()
            .find(|c| &c.code == code)
            .and_then(|c| c.name.as_deref())
    }

    pub fn countries(&self) -> &[Country] {
        &self.countries
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }
}

fn build_country(index: usize, feature: Feature) -> Result<Option<Country>, GeoError> {
    let property = |key: &str| feature.property(key).and_then(|v| v.as_str());

    let code = CODE_PROPERTIES
        .iter()
        .filter_map(|key| property(key))
        .find(|code| code.len() == 3 && *code != "-99");

    let Some(code) = code else {
        debug!(feature = index, "Skipping feature without country code");
        return Ok(None);
    };
    let code = CountryCode::new(code);
    let name = NAME_PROPERTIES
        .iter()
        .find_map(|key| property(key))
        .map(str::to_string);

    let Some(geometry) = feature.geometry else {
        debug!(feature = index, %code, "Skipping feature without geometry");
        return Ok(None);
    };

    let invalid = |reason: String| GeoError::InvalidGeometry {
        feature: index,
        reason,
    };

    let geometry: Geometry<f64> = geometry
        .value
        .try_into()
        .map_err(|e: geojson::Error| invalid(e.to_string()))?;
    let shape: MultiPolygon<f64> = match geometry {
        Geometry::Polygon(polygon) => polygon.into(),
        Geometry::MultiPolygon(multi) => multi,
        other => {
            debug!(feature = index, %code, kind = geometry_kind(&other), "Skipping non-areal geometry");
            return Ok(None);
        }
    };

    // a closed ring needs at least four positions
    for polygon in &shape {
        let positions = polygon.exterior().0.len();
        if positions < 4 {
            return Err(invalid(format!("ring with {} positions", positions)));
        }
    }

    Country::new(code, name, shape)
        .map(Some)
        .ok_or_else(|| invalid("polygon without positions".to_string()))
}

fn geometry_kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::Line(_) | Geometry::LineString(_) => "LineString",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        _ => "other",
    }
}
