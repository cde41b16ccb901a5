// User-facing copy lives behind a key lookup so the core never hardcodes a language

use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("JSON parse error: {0}")]
    JsonParseError(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Resolves a text key to display copy.
pub trait TextProvider: Send + Sync {
    fn text(&self, key: &str) -> String;

    /// Resolves `key` and substitutes `{name}` placeholders.
    fn text_with(&self, key: &str, args: &[(&str, &str)]) -> String {
        let mut text = self.text(key);
        for (name, value) in args {
            text = text.replace(&format!("{{{}}}", name), value);
        }
        text
    }
}

/// Flat key/value catalog. Unknown keys resolve to themselves.
#[derive(Debug, Clone, Default)]
pub struct TextCatalog {
    entries: HashMap<String, String>,
}

impl TextCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn english() -> Self {
        let mut catalog = Self::default();
        for (key, value) in ENGLISH {
            catalog.insert(key, value);
        }
        catalog
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merges a JSON document into the catalog. Nested objects flatten to dotted keys,
    /// so `{"errors": {"required": "..."}}` defines `errors.required`.
    pub fn extend_from_json(&mut self, json: &str) -> Result<usize, CatalogError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| CatalogError::JsonParseError(e.to_string()))?;

        let Value::Object(map) = value else {
            return Err(CatalogError::InvalidFormat(
                "catalog root must be an object".to_string(),
            ));
        };

        let mut added = 0;
        for (key, value) in map {
            added += self.flatten_into(&key, value)?;
        }
        Ok(added)
    }

    fn flatten_into(&mut self, prefix: &str, value: Value) -> Result<usize, CatalogError> {
        match value {
            Value::String(text) => {
                self.insert(prefix, &text);
                Ok(1)
            }
            Value::Object(map) => {
                let mut added = 0;
                for (key, value) in map {
                    added += self.flatten_into(&format!("{}.{}", prefix, key), value)?;
                }
                Ok(added)
            }
            other => Err(CatalogError::InvalidFormat(format!(
                "value for {} must be a string, got {}",
                prefix, other
            ))),
        }
    }
}

impl TextProvider for TextCatalog {
    fn text(&self, key: &str) -> String {
        self.entries
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}

/// Two fractional digits behind a fixed currency symbol.
pub fn format_amount(amount: f64, currency_symbol: &str) -> String {
    format!("{}{:.2}", currency_symbol, amount)
}

const ENGLISH: &[(&str, &str)] = &[
    // Validation messages
    ("errors.startDateRequired", "Start date is required"),
    ("errors.endDateRequired", "End date is required"),
    ("errors.endDateAfterStart", "End date must be after start date"),
    ("errors.dateInvalid", "Please enter a valid date"),
    ("errors.guestsRequired", "Number of guests is required"),
    ("errors.nightlyRateInvalid", "Nightly rate must be a positive amount"),
    ("errors.amountInvalid", "Payment amount is not valid"),
    ("errors.firstNameRequired", "First name is required"),
    ("errors.lastNameRequired", "Last name is required"),
    ("errors.emailRequired", "Email is required"),
    ("errors.emailInvalid", "Email is invalid"),
    ("errors.phoneRequired", "Phone number is required"),
    ("errors.cardNumberRequired", "Card number is required"),
    ("errors.cardNumberInvalid", "Card number must be 16 digits"),
    ("errors.cardExpiryRequired", "Expiry date is required"),
    ("errors.cardExpiryInvalid", "Expiry date must be in MM/YY format"),
    ("errors.cardCvcRequired", "CVC is required"),
    ("errors.cardCvcInvalid", "CVC must be 3 or 4 digits"),
    ("errors.cardholderNameRequired", "Cardholder name is required"),
    ("errors.billingAddressRequired", "Billing address is required"),
    ("errors.billingCityRequired", "City is required"),
    ("errors.billingZipRequired", "ZIP/Postal code is required"),
    ("errors.billingCountryRequired", "Country is required"),
    ("errors.agreeToTermsRequired", "You must agree to the terms and conditions"),
    ("errors.agreeToRefundPolicyRequired", "You must agree to the refund policy"),
    ("errors.dateRequired", "Date is required"),
    ("errors.timeRequired", "Time is required"),
    ("errors.durationRequired", "Please choose how long you are staying"),
    ("errors.peopleRequired", "Please choose how many people are travelling"),
    ("errors.budgetRequired", "Please choose a budget level"),
    ("errors.accommodationRequired", "Please choose an accommodation type"),
    ("errors.submitFailed", "Booking failed. Please try again."),
    ("errors.paymentFailed", "Payment failed. Please try again."),
    // Step titles
    ("booking.steps.dates", "Dates and guests"),
    ("booking.steps.contact", "Your details"),
    ("booking.steps.payment", "Payment"),
    ("restaurant.steps.reservation", "Reservation"),
    ("payment.steps.details", "Payment details"),
    ("planner.steps.basics", "When and who"),
    ("planner.steps.interests", "Interests and budget"),
    ("planner.steps.stay", "Accommodation and activities"),
    // Assistant
    (
        "assistant.greeting",
        "Hello! I'm your vacation planning assistant for the Wachau, Krems, and Kamptal regions. How can I help you plan your perfect trip?",
    ),
    (
        "assistant.wine",
        "The Wachau, Krems, and Kamptal regions are famous for their wines, especially Grüner Veltliner and Riesling. I can recommend wine tastings at Domäne Wachau, FJ Gritsch, or one of the many Heurigen (wine taverns) in the area. Would you like me to include wine tastings in your itinerary?",
    ),
    (
        "assistant.biking",
        "Biking along the Danube in the Wachau Valley is a wonderful experience! The Danube Bike Path is flat and well-maintained, perfect for all skill levels. The total distance is about 25 kilometers (15 miles) from Krems to Melk. Would you like me to suggest a biking route and bike rental options for your trip?",
    ),
    (
        "assistant.accommodation",
        "There are several excellent accommodations in the region. Hotel Schloss Dürnstein offers historic ambience in a 400-year-old castle, while Steigenberger Hotel & Spa in Krems provides modern luxury with panoramic views. For a more artistic stay, arte Hotel Krems is located in the arts district. What type of accommodation are you looking for?",
    ),
    (
        "assistant.dining",
        "The region offers excellent dining options, from award-winning restaurants to traditional wine taverns. Restaurant Richard Löwenherz and Alter Klosterkeller in Dürnstein are highly recommended, as is Restaurant Loibnerhof-Knoll. Would you like me to make restaurant recommendations based on your preferences?",
    ),
    (
        "assistant.activities",
        "Besides wine tasting and biking, you can visit historic sites like Melk Abbey, Göttweig Abbey, and Dürnstein Castle ruins. The region also offers hiking on the Wachau World Heritage Trail, boat tours on the Danube, and cultural attractions like the Caricature Museum in Krems. What activities interest you most?",
    ),
    (
        "assistant.budget",
        "The cost of your vacation will depend on your preferences for accommodation, dining, and activities. A moderate budget would be around €150-200 per person per day, including accommodation, meals, and activities. Luxury options can exceed €300 per day, while budget-conscious travelers can manage with €100-120 per day. Would you like a detailed cost breakdown based on your preferences?",
    ),
    (
        "assistant.itinerary",
        "I'd be happy to suggest an itinerary for you. How many days are you planning to stay, and what are your main interests?",
    ),
    (
        "assistant.itineraryPersonal",
        "Based on your preferences, I'd recommend a {duration} itinerary focusing on {interests}. Would you like me to create a detailed day-by-day plan for you?",
    ),
    ("assistant.defaultDuration", "4-day"),
    ("assistant.defaultInterests", "wine and biking"),
    ("assistant.summaryIntro", "Based on our conversation, I understand you're interested in:"),
    ("assistant.summary.dates", "Traveling on: {value}"),
    ("assistant.summary.duration", "Staying for: {value}"),
    ("assistant.summary.people", "Group size: {value} people"),
    ("assistant.summary.interests", "Interests: {value}"),
    ("assistant.summary.budget", "Budget level: {value}"),
    ("assistant.summary.accommodation", "Preferred accommodation: {value}"),
    (
        "assistant.summaryOutro",
        "Is this correct? Would you like me to create a vacation plan based on these preferences?",
    ),
    (
        "assistant.default",
        "I can help you plan all aspects of your vacation in the Wachau, Krems, and Kamptal regions, including accommodations, dining, activities, and transportation. What specific aspects of your trip would you like assistance with?",
    ),
    // Itinerary entries
    ("itinerary.arrival", "Arrival and check-in at accommodation"),
    ("itinerary.lunchKrems", "Lunch at a local restaurant in Krems"),
    ("itinerary.orientationWalk", "Orientation walk through the historic center"),
    ("itinerary.welcomeDinner", "Welcome dinner at a traditional wine tavern"),
    ("itinerary.breakfast", "Breakfast at accommodation"),
    ("itinerary.finalExploration", "Final exploration or shopping"),
    ("itinerary.farewellLunch", "Farewell lunch"),
    ("itinerary.departure", "Check-out and departure"),
    ("itinerary.wineTasting", "Wine tasting tour at local vineyards"),
    ("itinerary.bikeTour", "Bike tour along the Danube Bike Path"),
    ("itinerary.hike", "Hiking on the Wachau World Heritage Trail"),
    ("itinerary.culture", "Visit to Melk Abbey and cultural sites"),
    ("itinerary.lunch", "Lunch at a recommended restaurant"),
    ("itinerary.relaxation", "Relaxation time at a spa or by the Danube"),
    ("itinerary.boatTour", "Scenic boat tour on the Danube"),
    ("itinerary.localAttraction", "Visit to a local attraction or museum"),
    ("itinerary.dinner", "Dinner at a recommended restaurant"),
    // Suggestion descriptions
    (
        "suggestions.schlossDuernstein",
        "Historic hotel in a 400-year-old castle with panoramic views of the Danube.",
    ),
    (
        "suggestions.steigenberger",
        "Modern luxury hotel with spa facilities and panoramic views of the Danube Valley.",
    ),
    (
        "suggestions.arteHotel",
        "Contemporary hotel in the arts district, close to museums and cultural attractions.",
    ),
    (
        "suggestions.gaestehausHofmann",
        "Charming family-run guesthouse with comfortable rooms and homemade breakfast.",
    ),
    (
        "suggestions.pensionAltePost",
        "Traditional guesthouse in a historic building with cozy rooms and garden.",
    ),
    (
        "suggestions.gaestehausWachau",
        "Comfortable guesthouse surrounded by vineyards with Danube views.",
    ),
    (
        "suggestions.wachauApartments",
        "Modern apartments with fully equipped kitchens and living areas.",
    ),
    (
        "suggestions.vineyardView",
        "Spacious apartments with balconies overlooking the vineyards.",
    ),
    (
        "suggestions.riverside",
        "Comfortable apartments close to the Danube with bicycle storage.",
    ),
    (
        "suggestions.loewenherz",
        "Fine dining restaurant with panoramic terrace overlooking the Danube.",
    ),
    (
        "suggestions.klosterkeller",
        "Historic restaurant in a medieval cellar serving traditional Austrian cuisine.",
    ),
    (
        "suggestions.loibnerhof",
        "Winery restaurant with excellent local cuisine and wine pairings.",
    ),
    (
        "suggestions.schwaighofer",
        "Traditional wine tavern serving homemade food and local wines.",
    ),
    (
        "suggestions.wineTour",
        "Guided tour of the region's best wineries with tastings of Grüner Veltliner and Riesling.",
    ),
    (
        "suggestions.domaeneWachau",
        "Visit to one of the region's most prestigious wineries with cellar tour and tasting.",
    ),
    (
        "suggestions.bikeTour",
        "Guided biking tour along the scenic Danube Bike Path through vineyards and historic villages.",
    ),
    (
        "suggestions.ebikeRental",
        "Rent an e-bike to explore the region at your own pace with route maps provided.",
    ),
    (
        "suggestions.heritageTrail",
        "Guided hike on the scenic trail with panoramic views of the Danube Valley.",
    ),
    (
        "suggestions.melkAbbey",
        "Guided tour of the magnificent Baroque abbey with its famous library and church.",
    ),
    (
        "suggestions.castleRuins",
        "Visit the historic ruins where Richard the Lionheart was imprisoned.",
    ),
    (
        "suggestions.kremsMuseums",
        "Visit to the Caricature Museum and Kunsthalle Krems for contemporary art.",
    ),
    (
        "suggestions.riverCruise",
        "Scenic boat tour on the Danube through the heart of the Wachau Valley.",
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_lookup() {
        let catalog = TextCatalog::english();
        assert_eq!(
            catalog.text("errors.cardNumberInvalid"),
            "Card number must be 16 digits"
        );
    }

    #[test]
    fn test_missing_key_echoes_key() {
        let catalog = TextCatalog::empty();
        assert_eq!(catalog.text("errors.unknown"), "errors.unknown");
    }

    #[test]
    fn test_placeholder_substitution() {
        let catalog = TextCatalog::english();
        let text = catalog.text_with(
            "assistant.itineraryPersonal",
            &[("duration", "4-day"), ("interests", "wine, biking")],
        );
        assert!(text.starts_with("Based on your preferences, I'd recommend a 4-day itinerary"));
        assert!(text.contains("focusing on wine, biking."));
    }

    #[test]
    fn test_extend_from_nested_json() {
        let mut catalog = TextCatalog::english();
        let added = catalog
            .extend_from_json(r#"{"errors": {"emailInvalid": "E-Mail ist ungültig"}, "brand": "Wachau Trips"}"#)
            .unwrap();

        assert_eq!(added, 2);
        assert_eq!(catalog.text("errors.emailInvalid"), "E-Mail ist ungültig");
        assert_eq!(catalog.text("brand"), "Wachau Trips");
    }

    #[test]
    fn test_extend_rejects_non_string_values() {
        let mut catalog = TextCatalog::empty();
        assert!(matches!(
            catalog.extend_from_json(r#"{"count": 3}"#),
            Err(CatalogError::InvalidFormat(_))
        ));
        assert!(matches!(
            catalog.extend_from_json("not json"),
            Err(CatalogError::JsonParseError(_))
        ));
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(1650.0, "€"), "€1650.00");
        assert_eq!(format_amount(33.333, "$"), "$33.33");
    }
}
