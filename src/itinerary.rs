// Vacation plan generation from the trip planner's answers

use crate::pricing::{estimate_trip_cost, round_cents, service_fee, TripPreferences};
use crate::validation::ValidationResult;
use crate::wizard::{Transition, WizardController};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

/// Itinerary length when the planner has no usable duration.
pub const DEFAULT_TRIP_DAYS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceUnit {
    PerNight,
    PerPerson,
    PerDay,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Price {
    pub from: f64,
    pub to: Option<f64>,
    pub unit: PriceUnit,
}

const fn range(from: f64, to: f64, unit: PriceUnit) -> Price {
    Price {
        from,
        to: Some(to),
        unit,
    }
}

const fn flat(amount: f64, unit: PriceUnit) -> Price {
    Price {
        from: amount,
        to: None,
        unit,
    }
}

/// Catalog entry. `id` also names the description text key `suggestions.<id>`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub id: &'static str,
    pub name: &'static str,
    pub location: &'static str,
    pub price: Option<Price>,
    pub rating: Option<f32>,
}

impl Suggestion {
    pub fn description_key(&self) -> String {
        format!("suggestions.{}", self.id)
    }
}

const SCHLOSS_DUERNSTEIN: Suggestion = Suggestion {
    id: "schlossDuernstein",
    name: "Hotel Schloss Dürnstein",
    location: "Dürnstein",
    price: Some(range(180.0, 250.0, PriceUnit::PerNight)),
    rating: Some(5.0),
};
const STEIGENBERGER: Suggestion = Suggestion {
    id: "steigenberger",
    name: "Steigenberger Hotel & Spa Krems",
    location: "Krems",
    price: Some(range(150.0, 220.0, PriceUnit::PerNight)),
    rating: Some(4.5),
};
const ARTE_HOTEL: Suggestion = Suggestion {
    id: "arteHotel",
    name: "arte Hotel Krems",
    location: "Krems",
    price: Some(range(120.0, 180.0, PriceUnit::PerNight)),
    rating: Some(4.0),
};
const GAESTEHAUS_HOFMANN: Suggestion = Suggestion {
    id: "gaestehausHofmann",
    name: "Gästehaus Hofmann",
    location: "Weissenkirchen",
    price: Some(range(80.0, 120.0, PriceUnit::PerNight)),
    rating: Some(4.5),
};
const PENSION_ALTE_POST: Suggestion = Suggestion {
    id: "pensionAltePost",
    name: "Pension Alte Post",
    location: "Spitz",
    price: Some(range(70.0, 100.0, PriceUnit::PerNight)),
    rating: Some(4.0),
};
const GAESTEHAUS_WACHAU: Suggestion = Suggestion {
    id: "gaestehausWachau",
    name: "Gästehaus Wachau",
    location: "Dürnstein",
    price: Some(range(75.0, 110.0, PriceUnit::PerNight)),
    rating: Some(4.2),
};
const WACHAU_APARTMENTS: Suggestion = Suggestion {
    id: "wachauApartments",
    name: "Wachau Apartments",
    location: "Krems",
    price: Some(range(90.0, 140.0, PriceUnit::PerNight)),
    rating: Some(4.3),
};
const VINEYARD_VIEW: Suggestion = Suggestion {
    id: "vineyardView",
    name: "Vineyard View Apartments",
    location: "Weissenkirchen",
    price: Some(range(100.0, 150.0, PriceUnit::PerNight)),
    rating: Some(4.4),
};
const RIVERSIDE: Suggestion = Suggestion {
    id: "riverside",
    name: "Riverside Apartments",
    location: "Melk",
    price: Some(range(85.0, 130.0, PriceUnit::PerNight)),
    rating: Some(4.1),
};

pub const DINING: &[Suggestion] = &[
    Suggestion {
        id: "loewenherz",
        name: "Restaurant Richard Löwenherz",
        location: "Dürnstein",
        price: None,
        rating: None,
    },
    Suggestion {
        id: "klosterkeller",
        name: "Alter Klosterkeller",
        location: "Dürnstein",
        price: None,
        rating: None,
    },
    Suggestion {
        id: "loibnerhof",
        name: "Restaurant Loibnerhof-Knoll",
        location: "Unterloiben",
        price: None,
        rating: None,
    },
    Suggestion {
        id: "schwaighofer",
        name: "Heurigen Schwaighofer",
        location: "Weissenkirchen",
        price: None,
        rating: None,
    },
];

const WINE_TOUR: Suggestion = Suggestion {
    id: "wineTour",
    name: "Wachau Valley Wine Tour",
    location: "Wachau Valley",
    price: Some(flat(50.0, PriceUnit::PerPerson)),
    rating: None,
};
const DOMAENE_WACHAU: Suggestion = Suggestion {
    id: "domaeneWachau",
    name: "Domäne Wachau Wine Tasting",
    location: "Dürnstein",
    price: Some(flat(20.0, PriceUnit::PerPerson)),
    rating: None,
};
const BIKE_TOUR: Suggestion = Suggestion {
    id: "bikeTour",
    name: "Danube Bike Path Tour",
    location: "Krems to Melk",
    price: Some(flat(30.0, PriceUnit::PerPerson)),
    rating: None,
};
const EBIKE_RENTAL: Suggestion = Suggestion {
    id: "ebikeRental",
    name: "E-Bike Rental",
    location: "Krems",
    price: Some(flat(35.0, PriceUnit::PerDay)),
    rating: None,
};
const HERITAGE_TRAIL: Suggestion = Suggestion {
    id: "heritageTrail",
    name: "Wachau World Heritage Trail Hike",
    location: "Wachau Valley",
    price: Some(flat(25.0, PriceUnit::PerPerson)),
    rating: None,
};
const MELK_ABBEY: Suggestion = Suggestion {
    id: "melkAbbey",
    name: "Melk Abbey Tour",
    location: "Melk",
    price: Some(flat(15.0, PriceUnit::PerPerson)),
    rating: None,
};
const CASTLE_RUINS: Suggestion = Suggestion {
    id: "castleRuins",
    name: "Dürnstein Castle Ruins",
    location: "Dürnstein",
    price: None,
    rating: None,
};
const KREMS_MUSEUMS: Suggestion = Suggestion {
    id: "kremsMuseums",
    name: "Krems Museums Tour",
    location: "Krems",
    price: Some(flat(12.0, PriceUnit::PerPerson)),
    rating: None,
};
const RIVER_CRUISE: Suggestion = Suggestion {
    id: "riverCruise",
    name: "Danube River Cruise",
    location: "Krems to Melk",
    price: Some(flat(40.0, PriceUnit::PerPerson)),
    rating: None,
};

pub fn accommodation_suggestions(kind: &str) -> Vec<Suggestion> {
    match kind {
        "hotel" => vec![SCHLOSS_DUERNSTEIN, STEIGENBERGER, ARTE_HOTEL],
        "guesthouse" => vec![GAESTEHAUS_HOFMANN, PENSION_ALTE_POST, GAESTEHAUS_WACHAU],
        "apartment" => vec![WACHAU_APARTMENTS, VINEYARD_VIEW, RIVERSIDE],
        _ => vec![SCHLOSS_DUERNSTEIN, GAESTEHAUS_HOFMANN, WACHAU_APARTMENTS],
    }
}

/// Activities matching the chosen interests, or a popular mix when none match.
pub fn activity_suggestions(prefs: &TripPreferences) -> Vec<Suggestion> {
    let mut activities = Vec::new();

    if prefs.has_interest("wine") || prefs.has_activity("wine_tour") {
        activities.extend([WINE_TOUR, DOMAENE_WACHAU]);
    }
    if prefs.has_interest("biking") || prefs.has_activity("biking") {
        activities.extend([BIKE_TOUR, EBIKE_RENTAL]);
    }
    if prefs.has_interest("hiking") {
        activities.push(HERITAGE_TRAIL);
    }
    if prefs.has_interest("culture") || prefs.has_activity("culture") {
        activities.extend([MELK_ABBEY, CASTLE_RUINS, KREMS_MUSEUMS]);
    }
    if prefs.has_activity("boat") {
        activities.push(RIVER_CRUISE);
    }

    if activities.is_empty() {
        activities = vec![WINE_TOUR, BIKE_TOUR, MELK_ABBEY, RIVER_CRUISE];
    }
    activities
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledItem {
    pub time: &'static str,
    /// Text key of the description.
    pub key: &'static str,
}

const fn at(time: &'static str, key: &'static str) -> ScheduledItem {
    ScheduledItem { time, key }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayPlan {
    pub day: u32,
    pub items: Vec<ScheduledItem>,
}

fn middle_day(prefs: &TripPreferences) -> Vec<ScheduledItem> {
    let mut items = vec![at("09:00", "itinerary.breakfast")];

    let morning = if prefs.has_interest("wine") || prefs.has_activity("wine_tour") {
        Some("itinerary.wineTasting")
    } else if prefs.has_interest("biking") || prefs.has_activity("biking") {
        Some("itinerary.bikeTour")
    } else if prefs.has_interest("hiking") {
        Some("itinerary.hike")
    } else if prefs.has_interest("culture") {
        Some("itinerary.culture")
    } else {
        None
    };
    if let Some(key) = morning {
        items.push(at("10:30", key));
    }

    items.push(at("13:30", "itinerary.lunch"));

    let afternoon = if prefs.has_interest("relaxation") {
        "itinerary.relaxation"
    } else if prefs.has_activity("boat") {
        "itinerary.boatTour"
    } else {
        "itinerary.localAttraction"
    };
    items.push(at("15:30", afternoon));
    items.push(at("19:00", "itinerary.dinner"));
    items
}

/// Day-by-day schedule: arrival day, interest-driven middle days, departure day.
pub fn build_itinerary(prefs: &TripPreferences) -> Vec<DayPlan> {
    let days = match prefs.duration_days() {
        Some(days) if days > 0 => days,
        _ => DEFAULT_TRIP_DAYS,
    };

    (1..=days)
        .map(|day| {
            let items = if day == 1 {
                vec![
                    at("10:00", "itinerary.arrival"),
                    at("13:00", "itinerary.lunchKrems"),
                    at("15:00", "itinerary.orientationWalk"),
                    at("19:00", "itinerary.welcomeDinner"),
                ]
            } else if day == days {
                vec![
                    at("09:00", "itinerary.breakfast"),
                    at("10:00", "itinerary.finalExploration"),
                    at("12:00", "itinerary.farewellLunch"),
                    at("14:00", "itinerary.departure"),
                ]
            } else {
                middle_day(prefs)
            };
            DayPlan { day, items }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanSummary {
    pub dates: String,
    pub duration: String,
    pub people: String,
    pub estimated_cost: f64,
    pub service_fee: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VacationPlan {
    pub summary: PlanSummary,
    pub itinerary: Vec<DayPlan>,
    pub accommodations: Vec<Suggestion>,
    pub dining: Vec<Suggestion>,
    pub activities: Vec<Suggestion>,
}

pub fn generate_plan(prefs: &TripPreferences, fee_rate: f64) -> VacationPlan {
    let estimated_cost = round_cents(estimate_trip_cost(prefs));

    let plan = VacationPlan {
        summary: PlanSummary {
            dates: prefs.dates.clone(),
            duration: prefs.duration.clone(),
            people: prefs.people.clone(),
            estimated_cost,
            service_fee: service_fee(estimated_cost, fee_rate),
        },
        itinerary: build_itinerary(prefs),
        accommodations: accommodation_suggestions(&prefs.accommodation),
        dining: DINING.to_vec(),
        activities: activity_suggestions(prefs),
    };

    debug!(
        days = plan.itinerary.len(),
        activities = plan.activities.len(),
        "vacation plan generated"
    );
    plan
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlannerError {
    #[error("Planner is on step {step} of {total}")]
    Incomplete { step: usize, total: usize },

    #[error("Planner answers are incomplete ({} field(s))", .0.len())]
    Validation(ValidationResult),
}

/// The three-step trip planner wizard and the plan it produces.
pub struct TripPlanner {
    wizard: WizardController,
    fee_rate: f64,
    plan: Option<VacationPlan>,
}

impl TripPlanner {
    pub fn new(fee_rate: f64) -> Self {
        Self {
            wizard: WizardController::trip_planner(),
            fee_rate,
            plan: None,
        }
    }

    pub fn wizard(&self) -> &WizardController {
        &self.wizard
    }

    pub fn wizard_mut(&mut self) -> &mut WizardController {
        &mut self.wizard
    }

    pub fn plan(&self) -> Option<&VacationPlan> {
        self.plan.as_ref()
    }

    /// Validates the last step and builds the plan from the collected answers.
    pub fn generate(&mut self) -> Result<&VacationPlan, PlannerError> {
        if !self.wizard.is_last_step() {
            return Err(PlannerError::Incomplete {
                step: self.wizard.current_step(),
                total: self.wizard.step_count(),
            });
        }

        match self.wizard.next() {
            Transition::Blocked(errors) => Err(PlannerError::Validation(errors)),
            Transition::Advanced { .. } | Transition::ReadyToSubmit => {
                let prefs = TripPreferences::from_draft(self.wizard.draft());
                let plan = generate_plan(&prefs, self.fee_rate);
                info!(
                    days = plan.itinerary.len(),
                    estimated_cost = plan.summary.estimated_cost,
                    "trip plan ready"
                );
                Ok(&*self.plan.insert(plan))
            }
        }
    }

    pub fn reset(&mut self) {
        self.wizard.reset();
        self.plan = None;
    }
}
