use std::collections::BTreeSet;

use serde_json::{json, Value};
use tracing::debug;

use crate::geo::CountryCode;

/// Feature property the filter matches country codes against
pub const FILTER_PROPERTY: &str = "ADM0_A3_IS";

/// Fill of highlighted countries
pub const HIGHLIGHT_FILL: (u8, u8, u8) = (205, 153, 61);

/// Outline between countries (#F2F2F2)
pub const HIGHLIGHT_OUTLINE: (u8, u8, u8) = (0xF2, 0xF2, 0xF2);

/// Which countries get the highlight fill
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HighlightFilter {
    codes: BTreeSet<CountryCode>,
}

impl HighlightFilter {
    pub fn matches(&self, code: &CountryCode) -> bool {
        self.codes.contains(code)
    }

    pub fn codes(&self) -> &BTreeSet<CountryCode> {
        &self.codes
    }

    /// Map-style filter expression: `["in", "ADM0_A3_IS", ...codes]`
    pub fn to_expression(&self) -> Value {
        let mut expression = vec![json!("in"), json!(FILTER_PROPERTY)];
        expression.extend(self.codes.iter().map(|code| json!(code.as_str())));
        Value::Array(expression)
    }
}

/// The "countries" fill layer. Has no filter until the base style is ready.
#[derive(Debug, Default)]
pub struct HighlightLayer {
    filter: Option<HighlightFilter>,
}

impl HighlightLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Base style finished loading: install the layer with its filter
    pub fn on_style_loaded(&mut self, codes: &BTreeSet<CountryCode>) {
        debug!(countries = codes.len(), "Style loaded, installing highlight layer");
        self.apply_highlight(codes);
    }

    /// Highlight exactly `codes`; every other country keeps default styling
    pub fn apply_highlight(&mut self, codes: &BTreeSet<CountryCode>) {
        let filter = HighlightFilter {
            codes: codes.clone(),
        };
        debug!(filter = %filter.to_expression(), "Highlight filter applied");
        self.filter = Some(filter);
    }

    /// Re-apply only if the set changed. Does nothing before the style loads.
    pub fn refresh(&mut self, codes: &BTreeSet<CountryCode>) -> bool {
        match &self.filter {
            Some(filter) if filter.codes != *codes => {
                debug!(countries = codes.len(), "Highlight set changed");
                self.apply_highlight(codes);
                true
            }
            _ => false,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.filter.is_some()
    }

    pub fn filter(&self) -> Option<&HighlightFilter> {
        self.filter.as_ref()
    }

    pub fn is_highlighted(&self, code: &CountryCode) -> bool {
        self.filter.as_ref().is_some_and(|f| f.matches(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(list: &[&str]) -> BTreeSet<CountryCode> {
        list.iter().map(|c| CountryCode::new(c)).collect()
    }

    #[test]
    fn test_highlights_exactly_the_set() {
        let mut layer = HighlightLayer::new();
        layer.on_style_loaded(&codes(&["FRA", "ITA"]));

        assert!(layer.is_highlighted(&CountryCode::new("FRA")));
        assert!(layer.is_highlighted(&CountryCode::new("ITA")));
        assert!(!layer.is_highlighted(&CountryCode::new("ESP")));
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut once = HighlightLayer::new();
        once.apply_highlight(&codes(&["DEU"]));

        let mut twice = HighlightLayer::new();
        twice.apply_highlight(&codes(&["DEU"]));
        twice.apply_highlight(&codes(&["DEU"]));

        assert_eq!(once.filter(), twice.filter());
    }

    #[test]
    fn test_nothing_highlighted_before_style_loads() {
        let mut layer = HighlightLayer::new();
        assert!(!layer.is_ready());
        assert!(!layer.refresh(&codes(&["FRA"])));
        assert!(!layer.is_highlighted(&CountryCode::new("FRA")));
    }

    #[test]
    fn test_refresh_only_on_change() {
        let mut layer = HighlightLayer::new();
        layer.on_style_loaded(&codes(&["FRA"]));

        assert!(!layer.refresh(&codes(&["FRA"])));
        assert!(layer.refresh(&codes(&["FRA", "PRT"])));
        assert!(layer.is_highlighted(&CountryCode::new("PRT")));
    }

    #[test]
    fn test_filter_expression() {
        let mut layer = HighlightLayer::new();
        layer.apply_highlight(&codes(&["ITA", "FRA"]));

        let expression = layer.filter().unwrap().to_expression();
        assert_eq!(expression, json!(["in", "ADM0_A3_IS", "FRA", "ITA"]));
    }

    #[test]
    fn test_empty_set_highlights_nothing() {
        let mut layer = HighlightLayer::new();
        layer.on_style_loaded(&BTreeSet::new());
        assert!(layer.is_ready());
        assert_eq!(layer.filter().unwrap().to_expression(), json!(["in", "ADM0_A3_IS"]));
    }
}
