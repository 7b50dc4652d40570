use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::PinError;
use crate::sync::{NewPin, Pin, PinId, RequestId};

/// Decimal places used when matching a location to a stored pin
const MATCH_DECIMALS: usize = 4;

/// A pin removed locally whose delete the server has not yet acknowledged
#[derive(Debug, Clone)]
struct PendingDelete {
    pin: Pin,
    index: usize,
}

/// Authoritative in-memory list of the signed-in user's pins.
///
/// Creates are not optimistic: a pin appears only once the server returns
/// it. Deletes are: the pin disappears immediately and is put back if the
/// server refuses.
#[derive(Debug, Default)]
pub struct PinStore {
    pins: Vec<Pin>,
    pending_creates: HashMap<RequestId, NewPin>,
    pending_deletes: HashMap<PinId, PendingDelete>,
}

impl PinStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with the user's persisted pins
    pub fn initialize(&mut self, seed: Vec<Pin>) {
        debug!(count = seed.len(), "Seeding pin store");
        self.pins = seed;
        self.pending_creates.clear();
        self.pending_deletes.clear();
    }

    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    pub fn get(&self, id: PinId) -> Option<&Pin> {
        self.pins.iter().find(|pin| pin.id == id)
    }

    /// Requests sent but not yet answered
    pub fn pending_requests(&self) -> usize {
        self.pending_creates.len() + self.pending_deletes.len()
    }

    pub fn track_create(&mut self, request: RequestId, pin: NewPin) {
        self.pending_creates.insert(request, pin);
    }

    /// Append the server's pin. Responses are appended in arrival order.
    ///
    /// Answers to requests the store no longer tracks are dropped; a reseed
    /// for another user clears the tracked requests.
    pub fn confirm_create(&mut self, request: RequestId, pin: Pin) -> bool {
        let Some(requested) = self.pending_creates.remove(&request) else {
            debug!(request, id = pin.id, "Dropping answer to untracked create");
            return false;
        };

        if requested.user_id != pin.user_id {
            warn!(
                request,
                id = pin.id,
                expected = requested.user_id,
                got = pin.user_id,
                "Server returned a pin for another user"
            );
            return false;
        }

        if self.get(pin.id).is_some() || self.pending_deletes.contains_key(&pin.id) {
            warn!(id = pin.id, "Server returned a pin id we already hold");
            return false;
        }

        debug!(id = pin.id, request, "Pin confirmed");
        self.pins.push(pin);
        true
    }

    /// Forget a failed create; the list is left as it was
    pub fn fail_create(&mut self, request: RequestId) -> Option<NewPin> {
        self.pending_creates.remove(&request)
    }

    /// Remove a pin locally and park it until the server answers
    pub fn remove(&mut self, id: PinId) -> Result<Pin, PinError> {
        let index = self
            .pins
            .iter()
            .position(|pin| pin.id == id)
            .ok_or(PinError::UnknownPin(id))?;

        let pin = self.pins.remove(index);
        self.pending_deletes.insert(
            id,
            PendingDelete {
                pin: pin.clone(),
                index,
            },
        );
        Ok(pin)
    }

    pub fn confirm_delete(&mut self, id: PinId) {
        if self.pending_deletes.remove(&id).is_none() {
            debug!(id, "Delete acknowledged for untracked pin");
        }
    }

    /// Put a pin back where it was after the server refused the delete
    pub fn rollback_delete(&mut self, id: PinId) -> Option<&Pin> {
        let PendingDelete { pin, index } = self.pending_deletes.remove(&id)?;
        let index = index.min(self.pins.len());
        self.pins.insert(index, pin);
        self.pins.get(index)
    }

    /// Find a pin whose coordinates print the same at 4 decimals
    pub fn find_by_rounded(&self, longitude: f64, latitude: f64) -> Option<PinId> {
        let target = (round_coord(longitude), round_coord(latitude));
        self.pins
            .iter()
            .find(|pin| (round_coord(pin.longitude), round_coord(pin.latitude)) == target)
            .map(|pin| pin.id)
    }
}

/// Rounded from the exact binary value, as decimal text
fn round_coord(value: f64) -> String {
    format!("{:.*}", MATCH_DECIMALS, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::CountryCode;

    fn pin(id: PinId, longitude: f64, latitude: f64) -> Pin {
        Pin {
            id,
            user_id: 1,
            latitude,
            longitude,
            country: None,
        }
    }

    fn new_pin() -> NewPin {
        NewPin {
            user_id: 1,
            longitude: 2.35,
            latitude: 48.85,
            country: CountryCode::new("FRA"),
        }
    }

    fn seeded() -> PinStore {
        let mut store = PinStore::new();
        store.initialize(vec![pin(1, 2.35, 48.85), pin(2, 10.0, 45.0), pin(3, -3.7, 40.4)]);
        store
    }

    #[test]
    fn test_confirm_create_appends_server_pin() {
        let mut store = seeded();
        store.track_create(7, new_pin());
        assert_eq!(store.pending_requests(), 1);
        assert_eq!(store.len(), 3);

        assert!(store.confirm_create(7, pin(40, 2.35, 48.85)));
        assert_eq!(store.len(), 4);
        assert_eq!(store.pins().last().unwrap().id, 40);
        assert_eq!(store.pending_requests(), 0);
    }

    #[test]
    fn test_confirm_create_skips_duplicate_id() {
        let mut store = seeded();
        store.track_create(1, new_pin());
        assert!(!store.confirm_create(1, pin(2, 0.0, 0.0)));
        assert_eq!(store.len(), 3);
        assert_eq!(store.pending_requests(), 0);
    }

    #[test]
    fn test_confirm_create_drops_untracked_request() {
        let mut store = seeded();
        assert!(!store.confirm_create(9, pin(40, 2.35, 48.85)));
        assert_eq!(store.len(), 3);
        assert!(store.get(40).is_none());
    }

    #[test]
    fn test_confirm_create_drops_pin_for_other_user() {
        let mut store = seeded();
        store.track_create(5, new_pin());

        let mut foreign = pin(41, 2.35, 48.85);
        foreign.user_id = 2;
        assert!(!store.confirm_create(5, foreign));
        assert_eq!(store.len(), 3);
        assert_eq!(store.pending_requests(), 0);
    }

    #[test]
    fn test_out_of_order_creates_append_in_arrival_order() {
        let mut store = PinStore::new();
        store.track_create(1, new_pin());
        store.track_create(2, new_pin());

        store.confirm_create(2, pin(20, 0.0, 0.0));
        store.confirm_create(1, pin(10, 0.0, 0.0));

        let ids: Vec<_> = store.pins().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![20, 10]);
    }

    #[test]
    fn test_failed_create_leaves_store_unchanged() {
        let mut store = seeded();
        store.track_create(3, new_pin());
        assert_eq!(store.fail_create(3), Some(new_pin()));
        assert_eq!(store.len(), 3);
        assert_eq!(store.pending_requests(), 0);
    }

    #[test]
    fn test_remove_is_immediate() {
        let mut store = seeded();
        let removed = store.remove(2).unwrap();

        assert_eq!(removed.id, 2);
        assert_eq!(store.len(), 2);
        assert!(store.get(2).is_none());
        assert_eq!(store.pending_requests(), 1);

        store.confirm_delete(2);
        assert_eq!(store.pending_requests(), 0);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_remove_unknown_pin() {
        let mut store = seeded();
        assert_eq!(store.remove(99), Err(PinError::UnknownPin(99)));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_rollback_restores_position() {
        let mut store = seeded();
        store.remove(2).unwrap();
        let restored = store.rollback_delete(2).unwrap();
        assert_eq!(restored.id, 2);

        let ids: Vec<_> = store.pins().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(store.rollback_delete(2).is_none());
    }

    #[test]
    fn test_rounded_match_ignores_digits_past_fourth() {
        let mut store = PinStore::new();
        store.initialize(vec![pin(1, 2.0, 2.0), pin(8, 12.345_67, 45.678_91)]);

        assert_eq!(store.find_by_rounded(12.345_749, 45.678_949), Some(8));
        assert_eq!(store.find_by_rounded(12.3458, 45.6789), None);
    }

    #[test]
    fn test_rounded_match_uses_exact_decimal_value() {
        // 2.00005 is stored just below the midpoint
        let mut store = PinStore::new();
        store.initialize(vec![pin(3, 2.00005, 45.0)]);

        assert_eq!(store.find_by_rounded(2.0, 45.0), Some(3));
        assert_eq!(store.find_by_rounded(2.0001, 45.0), None);
    }

    #[test]
    fn test_initialize_resets_pending_state() {
        let mut store = seeded();
        store.remove(1).unwrap();
        store.track_create(1, new_pin());
        store.initialize(Vec::new());
        assert!(store.is_empty());
        assert_eq!(store.pending_requests(), 0);
    }
}
