use crate::geo::BoundingBox;

/// Minimum zoom the map widget allows by default
pub const DEFAULT_MIN_ZOOM: f64 = 1.19;

/// Maximum zoom the map widget allows
pub const MAX_ZOOM: f64 = 12.0;

/// Terminal cells are roughly twice as tall as they are wide
const CELL_ASPECT: f64 = 2.0;

/// Latitude limit when panning
const MAX_CENTER_LAT: f64 = 85.0;

/// Camera state of the map view
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: f64,
    /// Map area width in cells
    pub width: u16,
    /// Map area height in cells
    pub height: u16,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            latitude: 44.5739,
            longitude: 7.7952,
            zoom: DEFAULT_MIN_ZOOM,
            width: 80,
            height: 24,
        }
    }
}

impl Viewport {
    /// Degrees of longitude visible across the map
    pub fn lon_span(&self) -> f64 {
        (360.0 / 2f64.powf(self.zoom - 1.0)).min(360.0)
    }

    /// Degrees of latitude visible down the map, keeping degrees square
    pub fn lat_span(&self) -> f64 {
        let width = f64::from(self.width.max(1));
        let height = f64::from(self.height.max(1));
        (self.lon_span() * CELL_ASPECT * height / width).min(180.0)
    }

    pub fn bounds(&self) -> BoundingBox {
        let half_lon = self.lon_span() / 2.0;
        let half_lat = self.lat_span() / 2.0;
        BoundingBox {
            west: self.longitude - half_lon,
            south: self.latitude - half_lat,
            east: self.longitude + half_lon,
            north: self.latitude + half_lat,
        }
    }

    /// Geographic position under the center of a map cell
    pub fn screen_to_geo(&self, col: u16, row: u16) -> (f64, f64) {
        let bounds = self.bounds();
        let width = f64::from(self.width.max(1));
        let height = f64::from(self.height.max(1));

        let longitude = bounds.west + (f64::from(col) + 0.5) / width * bounds.width();
        let latitude = bounds.north - (f64::from(row) + 0.5) / height * bounds.height();
        (wrap_longitude(longitude), latitude.clamp(-90.0, 90.0))
    }

    /// Map cell containing a geographic position, if visible
    pub fn geo_to_screen(&self, longitude: f64, latitude: f64) -> Option<(u16, u16)> {
        if !longitude.is_finite() || !latitude.is_finite() {
            return None;
        }

        let bounds = self.bounds();
        // same world copy as the view
        let longitude = (longitude - bounds.west).rem_euclid(360.0) + bounds.west;
        if !bounds.contains(longitude, latitude) {
            return None;
        }

        let col = ((longitude - bounds.west) / bounds.width() * f64::from(self.width)).floor();
        let row = ((bounds.north - latitude) / bounds.height() * f64::from(self.height)).floor();
        let col = (col as u16).min(self.width.saturating_sub(1));
        let row = (row as u16).min(self.height.saturating_sub(1));
        Some((col, row))
    }

    /// Move the camera by whole cells; positive `dx` is east, positive `dy` south
    pub fn panned(&self, dx: f64, dy: f64) -> Self {
        let lon_per_cell = self.lon_span() / f64::from(self.width.max(1));
        let lat_per_cell = self.lat_span() / f64::from(self.height.max(1));
        Self {
            longitude: wrap_longitude(self.longitude + dx * lon_per_cell),
            latitude: (self.latitude - dy * lat_per_cell).clamp(-MAX_CENTER_LAT, MAX_CENTER_LAT),
            ..*self
        }
    }

    pub fn zoomed(&self, delta: f64, min_zoom: f64) -> Self {
        Self {
            zoom: (self.zoom + delta).clamp(min_zoom, MAX_ZOOM),
            ..*self
        }
    }

    /// Fit a bounding box with some margin
    pub fn centered_on(&self, bbox: &BoundingBox, min_zoom: f64) -> Self {
        let (longitude, latitude) = bbox.center();
        let width = f64::from(self.width.max(1));
        let height = f64::from(self.height.max(1));

        let needed_lon = (bbox.width() * 1.5)
            .max(bbox.height() * 1.5 * width / (CELL_ASPECT * height))
            .max(f64::EPSILON);
        let zoom = 1.0 + (360.0 / needed_lon).log2();

        Self {
            longitude,
            latitude: latitude.clamp(-MAX_CENTER_LAT, MAX_CENTER_LAT),
            zoom: zoom.clamp(min_zoom, MAX_ZOOM),
            ..*self
        }
    }

    pub fn resized(&self, width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            ..*self
        }
    }

    /// Coordinate readout; the stored values keep full precision
    pub fn display(&self) -> String {
        format!(
            "Latitude: {:.4} // Longitude: {:.4} // Zoom: {:.2}",
            self.latitude, self.longitude, self.zoom
        )
    }
}

fn wrap_longitude(longitude: f64) -> f64 {
    let wrapped = (longitude + 180.0).rem_euclid(360.0) - 180.0;
    // keep the antimeridian as +180 rather than -180
    if wrapped == -180.0 && longitude > 0.0 {
        180.0
    } else {
        wrapped
    }
}

/// Pointer state the cursor style depends on
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HoverState {
    pub is_hovering: bool,
    pub is_dragging: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorStyle {
    Pointer,
    Default,
}

/// Owns the camera. The hosting widget enforces the zoom limits before
/// handing over a new viewport.
#[derive(Debug, Clone, Default)]
pub struct ViewportController {
    viewport: Viewport,
}

impl ViewportController {
    pub fn new(viewport: Viewport) -> Self {
        Self { viewport }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn on_viewport_change(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn cursor_style(&self, hover: HoverState) -> CursorStyle {
        if hover.is_hovering {
            CursorStyle::Pointer
        } else {
            CursorStyle::Default
        }
    }
}
