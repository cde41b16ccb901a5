// Price derivation for bookings and trip estimates.
// Every function here is pure: same inputs, same outputs, no state.

use crate::draft::{parse_instant, Draft};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_FEE_RATE: f64 = 0.10;
pub const DEFAULT_NIGHTLY_RATE: f64 = 150.0;

/// Bounds of the adjustable service-fee calculator, in whole percent.
pub const MIN_FEE_PERCENT: u32 = 5;
pub const MAX_FEE_PERCENT: u32 = 20;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    #[error("Service fee of {0}% is outside 5-20%")]
    FeeOutOfRange(u32),
}

/// Rounds a monetary amount to cents.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Whole nights between two dates, rounded up. 0 when not computable.
pub fn nights(start: Option<&str>, end: Option<&str>) -> u32 {
    let (Some(start), Some(end)) = (start.and_then(parse_instant), end.and_then(parse_instant))
    else {
        return 0;
    };

    if end <= start {
        return 0;
    }

    let seconds = (end - start).num_seconds();
    ((seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY) as u32
}

pub fn base_price(nightly_rate: f64, nights: u32, guests: u32) -> f64 {
    nightly_rate * nights as f64 * guests as f64
}

pub fn service_fee(base: f64, fee_rate: f64) -> f64 {
    round_cents(base * fee_rate)
}

pub fn total(base: f64, fee: f64) -> f64 {
    round_cents(base + fee)
}

/// Converts the calculator's whole-percent setting into a rate.
pub fn fee_rate_from_percent(percent: u32) -> Result<f64, PricingError> {
    if !(MIN_FEE_PERCENT..=MAX_FEE_PERCENT).contains(&percent) {
        return Err(PricingError::FeeOutOfRange(percent));
    }
    Ok(percent as f64 / 100.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub nights: u32,
    pub guests: u32,
    pub nightly_rate: f64,
    pub base_price: f64,
    pub fee_rate: f64,
    pub service_fee: f64,
    pub total: f64,
}

impl PriceBreakdown {
    pub fn new(nightly_rate: f64, nights: u32, guests: u32, fee_rate: f64) -> Self {
        let base = base_price(nightly_rate, nights, guests);
        let fee = service_fee(base, fee_rate);
        Self {
            nights,
            guests,
            nightly_rate,
            base_price: base,
            fee_rate,
            service_fee: fee,
            total: total(base, fee),
        }
    }

    /// Prices a stay from the draft's `startDate`, `endDate` and `guests`.
    /// `None` while the stay length cannot be computed.
    pub fn quote(draft: &Draft, nightly_rate: f64, fee_rate: f64) -> Option<Self> {
        let nights = nights(
            draft.get("startDate").and_then(|v| v.as_text()),
            draft.get("endDate").and_then(|v| v.as_text()),
        );
        if nights == 0 {
            return None;
        }

        let guests = draft.number("guests").unwrap_or(1.0).max(0.0) as u32;
        Some(Self::new(nightly_rate, nights, guests, fee_rate))
    }
}

/// Longest trip the planner schedules and prices; longer answers are capped.
pub const MAX_TRIP_DAYS: u32 = 30;

/// Preference answers collected by the trip planner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripPreferences {
    pub dates: String,
    pub duration: String,
    pub people: String,
    pub interests: Vec<String>,
    pub budget: String,
    pub accommodation: String,
    pub activities: Vec<String>,
}

impl TripPreferences {
    pub fn from_draft(draft: &Draft) -> Self {
        Self {
            dates: draft.text("dates").to_string(),
            duration: draft.text("duration").to_string(),
            people: draft.text("people").to_string(),
            interests: draft.values("interests"),
            budget: draft.text("budget").to_string(),
            accommodation: draft.text("accommodation").to_string(),
            activities: draft.values("activities"),
        }
    }

    pub fn duration_days(&self) -> Option<u32> {
        leading_number(&self.duration).map(|days| days.min(MAX_TRIP_DAYS))
    }

    pub fn party_size(&self) -> Option<u32> {
        leading_number(&self.people)
    }

    pub fn has_interest(&self, interest: &str) -> bool {
        self.interests.iter().any(|i| i == interest)
    }

    pub fn has_activity(&self, activity: &str) -> bool {
        self.activities.iter().any(|a| a == activity)
    }
}

/// Leading integer of an option value: "4-5" is 4, "8+" is 8.
pub fn leading_number(value: &str) -> Option<u32> {
    let digits: String = value
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn accommodation_rate(kind: &str) -> f64 {
    match kind {
        "hotel" => 150.0,
        "guesthouse" => 100.0,
        "apartment" => 120.0,
        _ => 0.0,
    }
}

fn activity_rate(activity: &str) -> f64 {
    match activity {
        "wine_tour" => 50.0,
        "biking" => 30.0,
        "boat" => 40.0,
        _ => 0.0,
    }
}

const DINING_PER_PERSON_DAY: f64 = 50.0;

/// Planner estimate: lodging and dining per person-day plus per-person activities.
/// Unknown duration or group size contribute nothing.
pub fn estimate_trip_cost(prefs: &TripPreferences) -> f64 {
    let days = prefs.duration_days().unwrap_or(0) as f64;
    let people = prefs.party_size().unwrap_or(0) as f64;

    let lodging = accommodation_rate(&prefs.accommodation) * days * people;
    let activities: f64 = prefs
        .activities
        .iter()
        .map(|activity| activity_rate(activity) * people)
        .sum();
    let dining = DINING_PER_PERSON_DAY * days * people;

    lodging + activities + dining
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Some("2025-06-15"), Some("2025-06-20"), 5; "five nights")]
    #[test_case(Some("2025-06-20"), Some("2025-06-15"), 0; "end before start")]
    #[test_case(Some("2025-06-15"), Some("2025-06-15"), 0; "same day")]
    #[test_case(None, Some("2025-06-15"), 0; "missing start")]
    #[test_case(Some("2025-06-15"), None, 0; "missing end")]
    #[test_case(Some("2025-06-15T14:00"), Some("2025-06-16T10:00"), 1; "partial day rounds up")]
    #[test_case(Some("2025-06-15T10:00"), Some("2025-06-17T11:00"), 3; "just over two days")]
    #[test_case(Some("not a date"), Some("2025-06-17"), 0; "unparseable start")]
    fn test_nights(start: Option<&str>, end: Option<&str>, expected: u32) {
        assert_eq!(nights(start, end), expected);
    }

    #[test]
    fn test_fee_and_total() {
        assert_eq!(service_fee(1000.0, 0.10), 100.00);
        assert_eq!(total(1000.0, 100.0), 1100.00);
        assert_eq!(service_fee(333.33, 0.10), 33.33);
    }

    #[test]
    fn test_base_price() {
        assert_eq!(base_price(150.0, 5, 2), 1500.0);
        assert_eq!(base_price(150.0, 0, 2), 0.0);
    }

    #[test]
    fn test_quote_from_draft() {
        let draft = Draft::new()
            .with("startDate", "2025-06-15")
            .with("endDate", "2025-06-20")
            .with("guests", 2u32);

        let quote = PriceBreakdown::quote(&draft, 150.0, DEFAULT_FEE_RATE).unwrap();
        assert_eq!(quote.nights, 5);
        assert_eq!(quote.base_price, 1500.0);
        assert_eq!(quote.service_fee, 150.00);
        assert_eq!(quote.total, 1650.00);
    }

    #[test]
    fn test_quote_requires_nights() {
        let draft = Draft::new().with("startDate", "2025-06-15").with("guests", 2u32);
        assert!(PriceBreakdown::quote(&draft, 150.0, DEFAULT_FEE_RATE).is_none());
    }

    #[test_case(5, Ok(0.05); "lower bound")]
    #[test_case(20, Ok(0.20); "upper bound")]
    #[test_case(4, Err(PricingError::FeeOutOfRange(4)); "below range")]
    #[test_case(21, Err(PricingError::FeeOutOfRange(21)); "above range")]
    fn test_fee_rate_from_percent(percent: u32, expected: Result<f64, PricingError>) {
        assert_eq!(fee_rate_from_percent(percent), expected);
    }

    #[test_case("4-5", Some(4); "range")]
    #[test_case("8+", Some(8); "open ended")]
    #[test_case("2", Some(2); "plain")]
    #[test_case("", None; "empty")]
    #[test_case("many", None; "words")]
    fn test_leading_number(value: &str, expected: Option<u32>) {
        assert_eq!(leading_number(value), expected);
    }

    #[test]
    fn test_duration_is_capped() {
        let prefs = TripPreferences {
            duration: "4000000000".to_string(),
            people: "2".to_string(),
            accommodation: "hotel".to_string(),
            ..TripPreferences::default()
        };
        assert_eq!(prefs.duration_days(), Some(MAX_TRIP_DAYS));
        // 30 days * 2 people * (150 lodging + 50 dining)
        assert_eq!(estimate_trip_cost(&prefs), 12000.0);
    }

    #[test]
    fn test_estimate_trip_cost() {
        let prefs = TripPreferences {
            duration: "4-5".to_string(),
            people: "2".to_string(),
            accommodation: "hotel".to_string(),
            activities: vec!["wine_tour".to_string(), "boat".to_string()],
            ..Default::default()
        };

        // lodging 150*4*2 + activities (50+40)*2 + dining 50*4*2
        assert_eq!(estimate_trip_cost(&prefs), 1200.0 + 180.0 + 400.0);
    }

    #[test]
    fn test_estimate_without_answers_is_zero() {
        assert_eq!(estimate_trip_cost(&TripPreferences::default()), 0.0);
    }
}
