mod geocoder;
mod types;

pub use geocoder::Geocoder;
pub use types::{BoundingBox, CountryCode};
