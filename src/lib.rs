// Booking core of the vacation storefront: form wizards, pricing,
// confirmation backends, the chat assistant and trip plans

pub mod assistant;
pub mod checkout;
pub mod config;
pub mod confirmation;
pub mod draft;
pub mod forms;
pub mod http_backend;
pub mod itinerary;
pub mod locale;
pub mod pricing;
pub mod validation;
pub mod wizard;

// Re-export key types for convenience
pub use assistant::{ChatAssistant, Classifier, KeywordClassifier, Topic};
pub use checkout::{CheckoutError, CheckoutFlow, CheckoutStage};
pub use config::{ConfigError, StorefrontConfig};
pub use confirmation::{
    BookingKind, BookingRecord, BookingRequest, BookingStatus, ConfirmationService,
    MockConfirmationService, PaymentMethod, PaymentRecord, PaymentRequest, PaymentStatus,
    SubmissionError,
};
pub use draft::{Draft, FieldValue};
pub use http_backend::HttpConfirmationService;
pub use itinerary::{generate_plan, TripPlanner, VacationPlan};
pub use locale::{TextCatalog, TextProvider};
pub use pricing::{PriceBreakdown, PricingError};
pub use validation::{
    FieldValidationError, RuleSet, StepValidationError, StepValidator, ValidationResult,
};
pub use wizard::{Step, Transition, WizardController, WizardError};
