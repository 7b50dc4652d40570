use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::error::PinError;
use crate::geo::{CountryCode, Geocoder};
use crate::session::SessionSnapshot;
use crate::sync::{NewPin, PinBackend, PinId, RequestId, SyncAdapter, SyncEvent};

use super::highlight::HighlightLayer;
use super::pins::PinStore;
use super::selection::{Affordance, Route, Selection, SelectionController};
use super::viewport::{CursorStyle, HoverState, Viewport, ViewportController};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Blocking message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// The interactive map: camera, highlight layer, pins and popup, kept in
/// step with the persistence service through the sync adapter.
///
/// Everything here runs on the UI loop. Network results arrive as
/// [`SyncEvent`]s and are applied with [`MapView::apply_sync_event`].
pub struct MapView<B: PinBackend> {
    geocoder: Arc<Geocoder>,
    snapshot: SessionSnapshot,
    viewport: ViewportController,
    highlight: HighlightLayer,
    pins: PinStore,
    selection: SelectionController,
    sync: SyncAdapter<B>,
    notices: VecDeque<Notice>,
    min_zoom: f64,
}

impl<B: PinBackend> MapView<B> {
    pub fn new(
        geocoder: Arc<Geocoder>,
        snapshot: SessionSnapshot,
        sync: SyncAdapter<B>,
        viewport: Viewport,
        min_zoom: f64,
    ) -> Self {
        Self {
            geocoder,
            snapshot,
            viewport: ViewportController::new(viewport),
            highlight: HighlightLayer::new(),
            pins: PinStore::new(),
            selection: SelectionController::new(),
            sync,
            notices: VecDeque::new(),
            min_zoom,
        }
    }

    /// Base style is ready: install the highlight layer and show the
    /// signed-in user's pins. Both come from the same snapshot.
    pub fn on_style_loaded(&mut self) {
        self.highlight.on_style_loaded(&self.snapshot.country_codes());

        let seed = self
            .snapshot
            .signed_in_user
            .as_ref()
            .map(|user| user.pinned_locations.clone())
            .unwrap_or_default();
        self.pins.initialize(seed);

        info!(
            pins = self.pins.len(),
            highlighted = self.highlight.filter().map_or(0, |f| f.codes().len()),
            "Map ready"
        );
    }

    pub fn viewport(&self) -> &Viewport {
        self.viewport.viewport()
    }

    pub fn on_viewport_change(&mut self, viewport: Viewport) {
        self.viewport.on_viewport_change(viewport);
    }

    pub fn cursor_style(&self, hover: HoverState) -> CursorStyle {
        self.viewport.cursor_style(hover)
    }

    pub fn min_zoom(&self) -> f64 {
        self.min_zoom
    }

    /// Drop a pin at a map position. Ocean positions never reach the
    /// server. The pin shows up once the server has stored it.
    #[instrument(skip(self))]
    pub fn on_double_click(&mut self, longitude: f64, latitude: f64) -> Result<RequestId, PinError> {
        let result = self.start_create(longitude, latitude);
        if let Err(e) = &result {
            debug!(error = %e, "Pin rejected");
            self.notices.push_back(Notice::warning(e.to_string()));
        }
        result
    }

    fn start_create(&mut self, longitude: f64, latitude: f64) -> Result<RequestId, PinError> {
        let country = self
            .geocoder
            .resolve_country(longitude, latitude)
            .ok_or(PinError::RejectedOcean)?;

        let user = self
            .snapshot
            .signed_in_user
            .as_ref()
            .ok_or(PinError::NotSignedIn)?;

        let pin = NewPin {
            user_id: user.id,
            longitude,
            latitude,
            country,
        };
        let request = self.sync.create(pin.clone());
        self.pins.track_create(request, pin);
        Ok(request)
    }

    /// Pin drawn at a map cell; the most recently added wins
    pub fn marker_at(&self, col: u16, row: u16) -> Option<PinId> {
        let viewport = self.viewport();
        self.pins
            .pins()
            .iter()
            .rev()
            .find(|pin| viewport.geo_to_screen(pin.longitude, pin.latitude) == Some((col, row)))
            .map(|pin| pin.id)
    }

    /// Open the popup for a stored pin
    pub fn on_marker_click(&mut self, id: PinId) -> Result<(), PinError> {
        let pin = self.pins.get(id).ok_or(PinError::UnknownPin(id))?;
        let country = self
            .geocoder
            .resolve_country(pin.longitude, pin.latitude)
            .or_else(|| pin.country.clone());

        debug!(id, country = ?country, "Marker selected");
        self.selection.select(Selection {
            pin_id: Some(id),
            longitude: pin.longitude,
            latitude: pin.latitude,
            country,
        });
        Ok(())
    }

    /// Open the popup for an arbitrary map position
    pub fn select_location(&mut self, longitude: f64, latitude: f64) {
        let country = self.geocoder.resolve_country(longitude, latitude);
        self.selection.select(Selection {
            pin_id: None,
            longitude,
            latitude,
            country,
        });
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.active()
    }

    pub fn dismiss_popup(&mut self) {
        self.selection.dismiss();
    }

    pub fn affordance(&self) -> Option<Affordance> {
        self.selection
            .affordance(&self.snapshot.countries, &self.snapshot.trips)
    }

    /// Close the popup and hand back the route its link points to
    pub fn follow_affordance(&mut self) -> Option<Route> {
        let route = self.affordance()?.route();
        self.selection.dismiss();
        info!(route = %route, "Navigating away from map");
        Some(route)
    }

    /// Delete the pin under the popup. Selections without a pin id are
    /// matched to a stored pin by coordinates rounded to 4 decimals.
    pub fn delete_selected(&mut self) -> Result<PinId, PinError> {
        let selection = self.selection.active().ok_or(PinError::NoSelection)?;
        let id = selection
            .pin_id
            .or_else(|| {
                self.pins
                    .find_by_rounded(selection.longitude, selection.latitude)
            })
            .ok_or(PinError::NoSelection)?;

        self.delete_pin(id)?;
        self.selection.dismiss();
        Ok(id)
    }

    /// Remove a pin now and tell the server; restored if the server refuses
    #[instrument(skip(self))]
    pub fn delete_pin(&mut self, id: PinId) -> Result<(), PinError> {
        self.pins.remove(id)?;
        self.selection.clear_pin(id);
        self.sync.delete(id);
        Ok(())
    }

    /// Reconcile a finished request into the store
    pub fn apply_sync_event(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::Created { request, pin } => {
                info!(id = pin.id, country = ?pin.country, "Pin saved");
                self.pins.confirm_create(request, pin);
            }
            SyncEvent::CreateFailed {
                request,
                pin,
                error,
            } => {
                warn!(country = %pin.country, error = %error, "Pin not saved");
                self.pins.fail_create(request);
                self.notices
                    .push_back(Notice::error(format!("Could not save your pin: {}", error)));
            }
            SyncEvent::Deleted { id } => {
                debug!(id, "Delete acknowledged");
                self.pins.confirm_delete(id);
            }
            SyncEvent::DeleteFailed { id, error } => {
                if self.pins.rollback_delete(id).is_some() {
                    warn!(id, error = %error, "Delete refused, pin restored");
                    self.notices.push_back(Notice::error(format!(
                        "Could not delete pin, it has been restored: {}",
                        error
                    )));
                }
            }
        }
    }

    /// Swap in fresh collaborator state. The highlight set is recomputed;
    /// pins are reseeded only when a different user signed in.
    pub fn reload_snapshot(&mut self, snapshot: SessionSnapshot) {
        let previous_user = self.snapshot.signed_in_user.as_ref().map(|u| u.id);
        let next_user = snapshot.signed_in_user.as_ref().map(|u| u.id);
        self.snapshot = snapshot;

        if self.highlight.refresh(&self.snapshot.country_codes()) {
            self.notices
                .push_back(Notice::info("Highlighted countries updated"));
        }

        if previous_user != next_user {
            info!(?previous_user, ?next_user, "Signed-in user changed, reseeding pins");
            let seed = self
                .snapshot
                .signed_in_user
                .as_ref()
                .map(|user| user.pinned_locations.clone())
                .unwrap_or_default();
            self.pins.initialize(seed);
            self.selection.dismiss();
        }
    }

    /// Fly to a country by name or code
    pub fn search(&mut self, query: &str) -> Option<CountryCode> {
        let found = self
            .snapshot
            .countries
            .search(query)
            .map(|entry| entry.alpha3_code.clone())
            .and_then(|code| self.geocoder.locate(&code).map(|bbox| (code, bbox)));

        match found {
            Some((code, bbox)) => {
                let viewport = self.viewport().centered_on(&bbox, self.min_zoom);
                self.on_viewport_change(viewport);
                debug!(country = %code, "Centered on search result");
                Some(code)
            }
            None => {
                self.notices
                    .push_back(Notice::warning(format!("No country matches \"{}\"", query.trim())));
                None
            }
        }
    }

    pub fn push_notice(&mut self, notice: Notice) {
        self.notices.push_back(notice);
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notices.front()
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notices.pop_front()
    }

    pub fn pins(&self) -> &PinStore {
        &self.pins
    }

    pub fn highlight(&self) -> &HighlightLayer {
        &self.highlight
    }

    pub fn geocoder(&self) -> &Geocoder {
        &self.geocoder
    }

    pub fn username(&self) -> Option<&str> {
        self.snapshot
            .signed_in_user
            .as_ref()
            .and_then(|user| user.username.as_deref())
    }

    pub fn is_signed_in(&self) -> bool {
        self.snapshot.signed_in_user.is_some()
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use tokio::sync::mpsc;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::session::{CountryDirectory, CountryEntry, SignedInUser, Trip};
    use crate::sync::testing::{Call, RecordingBackend};
    use crate::sync::{Pin, RetryPolicy};

    fn directory() -> CountryDirectory {
        CountryDirectory::from(vec![
            CountryEntry::new("FRA", "France"),
            CountryEntry::new("ITA", "Italy"),
            CountryEntry::new("ESP", "Spain"),
        ])
    }

    fn pin(id: PinId, longitude: f64, latitude: f64) -> Pin {
        Pin {
            id,
            user_id: 1,
            latitude,
            longitude,
            country: None,
        }
    }

    fn snapshot(pins: Vec<Pin>, trips: Vec<Trip>) -> SessionSnapshot {
        SessionSnapshot {
            signed_in_user: Some(SignedInUser {
                id: 1,
                username: Some("traveler".into()),
                pinned_locations: pins,
                trips: vec![Trip::new("Spain")],
            }),
            trips,
            countries: directory(),
        }
    }

    fn view_with(
        backend: RecordingBackend,
        snapshot: SessionSnapshot,
    ) -> (MapView<RecordingBackend>, mpsc::Receiver<SyncEvent>) {
        let retry = RetryPolicy {
            max_retries: 0,
            ..RetryPolicy::default()
        };
        let (sync, events) = SyncAdapter::new(backend, retry);
        let geocoder = Arc::new(Geocoder::embedded().unwrap());
        let mut view = MapView::new(geocoder, snapshot, sync, Viewport::default(), 1.19);
        view.on_style_loaded();
        (view, events)
    }

    async fn settle(view: &mut MapView<RecordingBackend>, events: &mut mpsc::Receiver<SyncEvent>) {
        let event = events.recv().await.unwrap();
        view.apply_sync_event(event);
    }

    #[tokio::test]
    async fn test_style_load_seeds_pins_and_highlight() {
        let (view, _events) = view_with(
            RecordingBackend::new(),
            snapshot(vec![pin(1, 2.35, 48.85)], Vec::new()),
        );

        assert_eq!(view.pins().len(), 1);
        assert!(view.highlight().is_highlighted(&CountryCode::new("ESP")));
        assert!(!view.highlight().is_highlighted(&CountryCode::new("FRA")));
    }

    #[tokio::test]
    async fn test_ocean_pin_rejected_without_request() {
        let backend = RecordingBackend::new();
        let (mut view, mut events) = view_with(backend.clone(), snapshot(Vec::new(), Vec::new()));

        assert_eq!(view.on_double_click(-30.0, 0.0), Err(PinError::RejectedOcean));
        assert_eq!(view.pins().len(), 0);
        assert_eq!(view.pins().pending_requests(), 0);
        assert_eq!(view.notice().unwrap().message, "You can't pin the ocean");

        tokio::task::yield_now().await;
        assert!(backend.calls().is_empty());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_signed_out_cannot_pin() {
        let backend = RecordingBackend::new();
        let (mut view, _events) = view_with(backend.clone(), SessionSnapshot::default());

        assert_eq!(view.on_double_click(10.0, 45.0), Err(PinError::NotSignedIn));
        assert!(backend.calls().is_empty());
        assert_eq!(view.pins().len(), 0);
    }

    #[tokio::test]
    async fn test_create_appears_only_after_confirmation() {
        let backend = RecordingBackend::new();
        let (mut view, mut events) = view_with(backend.clone(), snapshot(Vec::new(), Vec::new()));

        assert_ok!(view.on_double_click(10.0, 45.0));
        assert_eq!(view.pins().len(), 0);
        assert_eq!(view.pins().pending_requests(), 1);

        settle(&mut view, &mut events).await;
        assert_eq!(view.pins().len(), 1);
        assert_eq!(view.pins().pins()[0].id, 100);
        assert_eq!(view.pins().pending_requests(), 0);
        assert_eq!(
            backend.calls(),
            vec![Call::Create(NewPin {
                user_id: 1,
                longitude: 10.0,
                latitude: 45.0,
                country: CountryCode::new("ITA"),
            })]
        );
    }

    #[tokio::test]
    async fn test_create_in_north_american_interior() {
        let backend = RecordingBackend::new();
        let (mut view, mut events) = view_with(backend.clone(), snapshot(Vec::new(), Vec::new()));

        assert_ok!(view.on_double_click(-98.0, 39.0));
        settle(&mut view, &mut events).await;
        assert_eq!(view.pins().len(), 1);
        assert_eq!(view.pins().pins()[0].country, Some(CountryCode::new("USA")));
        assert!(view.notice().is_none());
    }

    #[tokio::test]
    async fn test_create_failure_leaves_store_and_notifies() {
        let backend = RecordingBackend::new().failing_creates(StatusCode::UNPROCESSABLE_ENTITY);
        let (mut view, mut events) = view_with(backend, snapshot(Vec::new(), Vec::new()));

        assert_ok!(view.on_double_click(2.35, 48.85));
        settle(&mut view, &mut events).await;

        assert_eq!(view.pins().len(), 0);
        assert_eq!(view.pins().pending_requests(), 0);
        let notice = view.notice().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(notice.message.starts_with("Could not save your pin"));
    }

    #[tokio::test]
    async fn test_created_pin_popup_references_country_name() {
        let (mut view, mut events) =
            view_with(RecordingBackend::new(), snapshot(Vec::new(), Vec::new()));

        assert_ok!(view.on_double_click(10.0, 45.0));
        settle(&mut view, &mut events).await;
        let id = view.pins().pins()[0].id;

        assert_ok!(view.on_marker_click(id));
        assert_eq!(view.selection().unwrap().country, Some(CountryCode::new("ITA")));
        assert_eq!(view.affordance().unwrap().country_name(), "Italy");
    }

    #[tokio::test]
    async fn test_popup_scenarios() {
        // no trips: be the first
        let (mut view, _events) = view_with(
            RecordingBackend::new(),
            snapshot(vec![pin(1, 2.3522, 48.8566)], Vec::new()),
        );
        assert_ok!(view.on_marker_click(1));
        let affordance = view.affordance().unwrap();
        assert!(matches!(affordance, Affordance::BeTheFirst { .. }));
        assert_eq!(view.follow_affordance(), Some(Route::TripForm));
        assert!(view.selection().is_none());

        // one trip for France: see trips
        let (mut view, _events) = view_with(
            RecordingBackend::new(),
            snapshot(vec![pin(1, 2.3522, 48.8566)], vec![Trip::new("France")]),
        );
        assert_ok!(view.on_marker_click(1));
        assert_eq!(view.affordance().unwrap().label(), "See trips for France");
        assert_eq!(
            view.follow_affordance().map(|r| r.path()),
            Some("/search_trips/France".to_string())
        );
    }

    #[tokio::test]
    async fn test_marker_click_unknown_pin() {
        let (mut view, _events) =
            view_with(RecordingBackend::new(), snapshot(Vec::new(), Vec::new()));
        assert_err!(view.on_marker_click(5));
        assert!(view.selection().is_none());
    }

    #[tokio::test]
    async fn test_delete_selected_removes_and_acknowledges() {
        let backend = RecordingBackend::new();
        let (mut view, mut events) = view_with(
            backend.clone(),
            snapshot(vec![pin(1, 2.35, 48.85), pin(2, 10.0, 45.0)], Vec::new()),
        );

        assert_ok!(view.on_marker_click(2));
        assert_eq!(view.delete_selected(), Ok(2));
        assert_eq!(view.pins().len(), 1);
        assert!(view.pins().get(2).is_none());
        assert!(view.selection().is_none());

        settle(&mut view, &mut events).await;
        assert_eq!(view.pins().len(), 1);
        assert_eq!(view.pins().pending_requests(), 0);
        assert_eq!(backend.calls(), vec![Call::Delete(2)]);
    }

    #[tokio::test]
    async fn test_delete_by_rounded_coordinates() {
        let backend = RecordingBackend::new();
        let (mut view, _events) = view_with(
            backend.clone(),
            snapshot(
                vec![pin(1, 2.35, 48.85), pin(8, 12.345_67, 45.678_91)],
                Vec::new(),
            ),
        );

        view.select_location(12.345_749, 45.678_949);
        assert_eq!(view.delete_selected(), Ok(8));
        assert_eq!(view.pins().len(), 1);
        assert_eq!(view.pins().pins()[0].id, 1);
        assert!(view.selection().is_none());
    }

    #[tokio::test]
    async fn test_delete_without_selection() {
        let (mut view, _events) =
            view_with(RecordingBackend::new(), snapshot(vec![pin(1, 2.35, 48.85)], Vec::new()));
        assert_eq!(view.delete_selected(), Err(PinError::NoSelection));

        view.select_location(-30.0, 0.0);
        assert_eq!(view.delete_selected(), Err(PinError::NoSelection));
        assert_eq!(view.pins().len(), 1);
    }

    #[tokio::test]
    async fn test_refused_delete_restores_pin() {
        let backend = RecordingBackend::new().with_delete_failures(&[StatusCode::FORBIDDEN]);
        let (mut view, mut events) = view_with(
            backend,
            snapshot(vec![pin(1, 2.35, 48.85), pin(2, 10.0, 45.0)], Vec::new()),
        );

        assert_ok!(view.delete_pin(1));
        assert_eq!(view.pins().len(), 1);

        settle(&mut view, &mut events).await;
        let ids: Vec<_> = view.pins().pins().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(view.notice().unwrap().level, NoticeLevel::Error);

        assert!(view.take_notice().is_some());
        assert!(view.notice().is_none());
    }

    #[tokio::test]
    async fn test_reload_recomputes_highlight() {
        let (mut view, _events) =
            view_with(RecordingBackend::new(), snapshot(vec![pin(1, 2.35, 48.85)], Vec::new()));

        let mut next = snapshot(vec![pin(1, 2.35, 48.85)], Vec::new());
        if let Some(user) = next.signed_in_user.as_mut() {
            user.trips.push(Trip::new("Italy"));
        }
        view.reload_snapshot(next);

        assert!(view.highlight().is_highlighted(&CountryCode::new("ITA")));
        assert!(view.highlight().is_highlighted(&CountryCode::new("ESP")));
        assert_eq!(view.notice().unwrap().level, NoticeLevel::Info);
        assert_eq!(view.pins().len(), 1);
    }

    #[tokio::test]
    async fn test_reload_with_other_user_reseeds_pins() {
        let (mut view, _events) =
            view_with(RecordingBackend::new(), snapshot(vec![pin(1, 2.35, 48.85)], Vec::new()));
        assert_ok!(view.on_marker_click(1));

        view.reload_snapshot(SessionSnapshot::default());
        assert!(view.pins().is_empty());
        assert!(view.selection().is_none());
        assert!(!view.is_signed_in());
    }

    #[tokio::test]
    async fn test_create_answer_dropped_after_user_switch() {
        let (mut view, mut events) =
            view_with(RecordingBackend::new(), snapshot(Vec::new(), Vec::new()));
        assert_ok!(view.on_double_click(10.0, 45.0));

        let mut other = snapshot(Vec::new(), Vec::new());
        if let Some(user) = other.signed_in_user.as_mut() {
            user.id = 2;
        }
        view.reload_snapshot(other);

        settle(&mut view, &mut events).await;
        assert!(view.pins().is_empty());
        assert_eq!(view.pins().pending_requests(), 0);
    }

    #[tokio::test]
    async fn test_search_centers_viewport() {
        let (mut view, _events) =
            view_with(RecordingBackend::new(), snapshot(Vec::new(), Vec::new()));

        assert_eq!(view.search("spa"), Some(CountryCode::new("ESP")));
        let viewport = view.viewport();
        assert!(viewport.bounds().contains(-3.7, 40.4));
        assert!(viewport.zoom > 1.19);

        assert_eq!(view.search("atlantis"), None);
        assert_eq!(view.notice().unwrap().level, NoticeLevel::Warning);
    }

    #[tokio::test]
    async fn test_marker_at_finds_pin_cell() {
        let (view, _events) =
            view_with(RecordingBackend::new(), snapshot(vec![pin(4, 10.0, 45.0)], Vec::new()));

        let (col, row) = view.viewport().geo_to_screen(10.0, 45.0).unwrap();
        assert_eq!(view.marker_at(col, row), Some(4));
        assert_eq!(view.marker_at(col.wrapping_add(5), row), None);
    }
}
