// Multi-step form state machine.
//
// A wizard owns one draft and walks a fixed sequence of steps. Moving forward is
// gated by the current step's validator only; moving back is always allowed.
// On the last step `next` reports that the draft is ready and `submit` hands it
// to a confirmation service.

use crate::confirmation::{
    new_idempotency_key, BookingKind, BookingRecord, BookingRequest, ConfirmationService,
    SubmissionError,
};
use crate::draft::{Draft, FieldValue};
use crate::forms;
use crate::validation::{RuleSet, StepValidationError, StepValidator, ValidationResult};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Error key under which failed submissions are reported.
pub const SUBMIT_FIELD: &str = "submit";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WizardError {
    #[error("A wizard needs at least one step")]
    NoSteps,

    #[error("Step {step} is outside 1..={total}")]
    StepOutOfRange { step: usize, total: usize },
}

pub struct Step {
    title_key: &'static str,
    fields: Vec<&'static str>,
    validator: Box<dyn StepValidator>,
}

impl Step {
    /// A step validated by a rule table; the table's fields are the ones it collects.
    pub fn new(title_key: &'static str, rules: RuleSet) -> Self {
        let fields = rules.fields();
        Self {
            title_key,
            fields,
            validator: Box::new(rules),
        }
    }

    pub fn with_validator(
        title_key: &'static str,
        fields: &[&'static str],
        validator: impl StepValidator + 'static,
    ) -> Self {
        Self {
            title_key,
            fields: fields.to_vec(),
            validator: Box::new(validator),
        }
    }

    /// Overrides the collected fields, e.g. to include optional ones.
    pub fn collecting(mut self, fields: &[&'static str]) -> Self {
        self.fields = fields.to_vec();
        self
    }

    pub fn title_key(&self) -> &'static str {
        self.title_key
    }

    pub fn fields(&self) -> &[&'static str] {
        &self.fields
    }

    pub fn validate(&self, draft: &Draft) -> ValidationResult {
        self.validator.validate(draft)
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("title_key", &self.title_key)
            .field("fields", &self.fields)
            .finish()
    }
}

/// Result of a `next()` call.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Advanced { from: usize, to: usize },
    Blocked(ValidationResult),
    /// The last step is valid; the draft can be submitted.
    ReadyToSubmit,
}

pub struct WizardController {
    steps: Vec<Step>,
    kind: Option<BookingKind>,
    draft: Draft,
    current: usize,
    errors: ValidationResult,
    record: Option<BookingRecord>,
    idempotency_key: String,
}

impl WizardController {
    pub fn new(steps: Vec<Step>) -> Result<Self, WizardError> {
        Self::with_draft(steps, Draft::new())
    }

    /// Starts on step 1 with a prefilled draft.
    pub fn with_draft(steps: Vec<Step>, draft: Draft) -> Result<Self, WizardError> {
        if steps.is_empty() {
            return Err(WizardError::NoSteps);
        }
        Ok(Self::build(steps, None, draft))
    }

    /// Makes the final step submit a booking of this kind.
    pub fn for_booking(mut self, kind: BookingKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn accommodation_booking() -> Self {
        Self::build(
            forms::accommodation_booking_steps(),
            Some(BookingKind::Accommodation),
            Draft::new(),
        )
    }

    pub fn restaurant_booking() -> Self {
        Self::build(
            forms::restaurant_booking_steps(),
            Some(BookingKind::Restaurant),
            Draft::new(),
        )
    }

    pub fn payment_details() -> Self {
        Self::build(forms::payment_steps(), None, Draft::new())
    }

    pub fn trip_planner() -> Self {
        Self::build(forms::planner_steps(), None, Draft::new())
    }

    // Storefront step tables are never empty
    fn build(steps: Vec<Step>, kind: Option<BookingKind>, draft: Draft) -> Self {
        Self {
            steps,
            kind,
            draft,
            current: 1,
            errors: ValidationResult::new(),
            record: None,
            idempotency_key: new_idempotency_key(),
        }
    }

    pub fn current_step(&self) -> usize {
        self.current
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn is_last_step(&self) -> bool {
        self.current == self.steps.len()
    }

    pub fn step(&self) -> &Step {
        &self.steps[self.current - 1]
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn kind(&self) -> Option<BookingKind> {
        self.kind
    }

    /// Errors to display next to the fields.
    pub fn errors(&self) -> &ValidationResult {
        &self.errors
    }

    pub fn record(&self) -> Option<&BookingRecord> {
        self.record.as_ref()
    }

    pub fn is_finalized(&self) -> bool {
        self.record.is_some()
    }

    pub fn idempotency_key(&self) -> &str {
        &self.idempotency_key
    }

    pub fn set_field(&mut self, name: &str, value: impl Into<FieldValue>) {
        self.draft.set(name, value);
        self.errors.remove(name);
    }

    pub fn toggle_field(&mut self, name: &str, value: &str, checked: bool) {
        self.draft.toggle(name, value, checked);
        self.errors.remove(name);
    }

    pub fn validate_step(&self, step: usize) -> Result<ValidationResult, WizardError> {
        if step == 0 || step > self.steps.len() {
            return Err(WizardError::StepOutOfRange {
                step,
                total: self.steps.len(),
            });
        }
        Ok(self.steps[step - 1].validate(&self.draft))
    }

    /// Re-checks every step in order and reports the first one that no longer
    /// validates. `next` never does this; callers use it to catch stale answers.
    pub fn validate_all(&self) -> Result<(), StepValidationError> {
        for (index, step) in self.steps.iter().enumerate() {
            step.validate(&self.draft).into_step_result(index + 1)?;
        }
        Ok(())
    }

    pub fn next(&mut self) -> Transition {
        let result = self.step().validate(&self.draft);

        if !result.is_valid() {
            debug!(step = self.current, fields = result.len(), "step blocked by validation");
            self.errors = result.clone();
            return Transition::Blocked(result);
        }

        self.errors = ValidationResult::new();
        if self.is_last_step() {
            debug!(step = self.current, "final step valid, ready to submit");
            return Transition::ReadyToSubmit;
        }

        let from = self.current;
        self.current += 1;
        debug!(from, to = self.current, "advanced");
        Transition::Advanced {
            from,
            to: self.current,
        }
    }

    /// Goes one step back without validating. Returns the new step.
    pub fn back(&mut self) -> usize {
        if self.current > 1 {
            self.current -= 1;
        }
        self.current
    }

    pub fn reset(&mut self) {
        self.draft.clear();
        self.current = 1;
        self.errors = ValidationResult::new();
        self.record = None;
        self.idempotency_key = new_idempotency_key();
    }

    /// Validates the final step and submits the draft. The wizard keeps its
    /// state on failure so the user can correct fields and resubmit.
    pub async fn submit<C>(&mut self, service: &C) -> Result<BookingRecord, SubmissionError>
    where
        C: ConfirmationService + ?Sized,
    {
        if let Some(record) = &self.record {
            return Ok(record.clone());
        }

        let Some(kind) = self.kind else {
            return Err(SubmissionError::NotABookingForm);
        };

        if !self.is_last_step() {
            return Err(SubmissionError::NotOnFinalStep {
                step: self.current,
                total: self.steps.len(),
            });
        }

        if let Transition::Blocked(errors) = self.next() {
            return Err(SubmissionError::Validation(errors));
        }

        let request = BookingRequest::new(kind, self.draft.clone())
            .with_idempotency_key(self.idempotency_key.clone());

        match service.submit_booking(request).await {
            Ok(record) => {
                info!(reference = %record.reference, ?kind, "wizard finalized");
                self.record = Some(record.clone());
                Ok(record)
            }
            Err(err) => {
                warn!(error = %err, "submission failed");
                self.report_failure(&err, "errors.submitFailed");
                Err(err)
            }
        }
    }

    /// Shows a backend failure on the form: field errors next to their fields,
    /// anything else under the `submit` key.
    pub fn report_failure(&mut self, err: &SubmissionError, message: &str) {
        match err {
            SubmissionError::Validation(fields) => self.errors.merge(fields),
            _ => self.errors.insert(SUBMIT_FIELD, message),
        }
    }
}

impl std::fmt::Debug for WizardController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WizardController")
            .field("kind", &self.kind)
            .field("current", &self.current)
            .field("steps", &self.steps.len())
            .field("errors", &self.errors)
            .field("finalized", &self.record.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfirmationConfig, PricingConfig};
    use crate::confirmation::{BookingStatus, MockConfirmationService};
    use crate::validation::Rule;
    use async_trait::async_trait;
    use regex::Regex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use test_case::test_case;

    fn two_step_wizard() -> WizardController {
        WizardController::new(vec![
            Step::new("one", RuleSet::new().rule("a", Rule::Required, "a.required")),
            Step::new("two", RuleSet::new().rule("b", Rule::Required, "b.required")),
        ])
        .unwrap()
    }

    fn fill_accommodation(wizard: &mut WizardController) {
        wizard.set_field("startDate", "2025-06-15");
        wizard.set_field("endDate", "2025-06-20");
        wizard.set_field("guests", 2u32);
        assert_eq!(wizard.next(), Transition::Advanced { from: 1, to: 2 });

        wizard.set_field("firstName", "Anna");
        wizard.set_field("lastName", "Berger");
        wizard.set_field("email", "anna@example.at");
        wizard.set_field("phone", "+43 2732 123");
        assert_eq!(wizard.next(), Transition::Advanced { from: 2, to: 3 });

        wizard.set_field("paymentMethod", "credit_card");
        wizard.set_field("cardNumber", "4111 1111 1111 1111");
        wizard.set_field("cardExpiry", "12/27");
        wizard.set_field("cardCvc", "123");
        wizard.set_field("agreeToTerms", true);
    }

    fn instant_service() -> MockConfirmationService {
        MockConfirmationService::new(PricingConfig::default(), ConfirmationConfig::instant())
    }

    #[test]
    fn test_empty_step_list_rejected() {
        let result = WizardController::new(vec![]);
        assert_eq!(result.unwrap_err(), WizardError::NoSteps);
    }

    #[test]
    fn test_invalid_step_blocks_next() {
        let mut wizard = two_step_wizard();
        let transition = wizard.next();

        match transition {
            Transition::Blocked(errors) => assert_eq!(errors.get("a"), Some("a.required")),
            other => panic!("expected blocked, got {:?}", other),
        }
        assert_eq!(wizard.current_step(), 1);
        assert!(wizard.errors().contains("a"));
    }

    #[test]
    fn test_valid_step_advances_by_one() {
        let mut wizard = two_step_wizard();
        wizard.set_field("a", "x");
        assert_eq!(wizard.next(), Transition::Advanced { from: 1, to: 2 });
        assert_eq!(wizard.current_step(), 2);
    }

    #[test]
    fn test_last_step_reports_ready_instead_of_advancing() {
        let mut wizard = two_step_wizard();
        wizard.set_field("a", "x");
        wizard.next();
        wizard.set_field("b", "y");

        assert_eq!(wizard.next(), Transition::ReadyToSubmit);
        assert_eq!(wizard.current_step(), 2);
        assert!(!wizard.is_finalized());
    }

    #[test]
    fn test_only_current_step_is_checked() {
        let mut wizard = two_step_wizard();
        wizard.set_field("a", "x");
        wizard.next();

        // Step 1 became invalid after it was passed; step 2 does not re-check it
        wizard.set_field("a", "");
        wizard.set_field("b", "y");
        assert_eq!(wizard.next(), Transition::ReadyToSubmit);
        assert!(!wizard.validate_step(1).unwrap().is_valid());
    }

    #[test]
    fn test_back_is_floored_at_first_step() {
        let mut wizard = two_step_wizard();
        assert_eq!(wizard.back(), 1);

        wizard.set_field("a", "x");
        wizard.next();
        assert_eq!(wizard.back(), 1);
        assert_eq!(wizard.back(), 1);
    }

    #[test]
    fn test_back_never_validates() {
        let mut wizard = two_step_wizard();
        wizard.set_field("a", "x");
        wizard.next();
        wizard.set_field("a", "");
        assert_eq!(wizard.back(), 1);
        assert!(wizard.errors().is_empty());
    }

    #[test]
    fn test_set_field_clears_only_its_error() {
        let mut wizard = WizardController::new(vec![Step::new(
            "one",
            RuleSet::new()
                .rule("a", Rule::Required, "a.required")
                .rule("b", Rule::Required, "b.required"),
        )])
        .unwrap();

        wizard.next();
        assert_eq!(wizard.errors().len(), 2);

        wizard.set_field("a", "filled");
        assert!(!wizard.errors().contains("a"));
        assert!(wizard.errors().contains("b"));
    }

    #[test]
    fn test_validate_step_is_pure_and_range_checked() {
        let wizard = two_step_wizard();
        let result = wizard.validate_step(2).unwrap();
        assert!(result.contains("b"));
        assert!(wizard.errors().is_empty());
        assert_eq!(wizard.current_step(), 1);

        assert_eq!(
            wizard.validate_step(0),
            Err(WizardError::StepOutOfRange { step: 0, total: 2 })
        );
        assert_eq!(
            wizard.validate_step(3),
            Err(WizardError::StepOutOfRange { step: 3, total: 2 })
        );
    }

    #[test]
    fn test_validate_all_finds_stale_step() {
        let mut wizard = two_step_wizard();
        wizard.set_field("a", "x");
        wizard.next();
        wizard.set_field("b", "y");
        assert!(wizard.validate_all().is_ok());

        wizard.set_field("a", "");
        let err = wizard.validate_all().unwrap_err();
        assert_eq!(err.step, 1);
        assert_eq!(err.errors[0].field, "a");
        assert_eq!(err.errors[0].message, "a.required");
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut wizard = two_step_wizard();
        let key = wizard.idempotency_key().to_string();
        wizard.set_field("a", "x");
        wizard.next();
        wizard.next();

        wizard.reset();
        assert_eq!(wizard.current_step(), 1);
        assert!(wizard.draft().is_empty());
        assert!(wizard.errors().is_empty());
        assert_ne!(wizard.idempotency_key(), key);
    }

    #[test]
    fn test_closure_validated_step() {
        let step = Step::with_validator("custom", &["code"], |draft: &Draft| {
            let mut result = ValidationResult::new();
            if draft.text("code").len() != 4 {
                result.insert("code", "code.length");
            }
            result
        });
        let mut wizard = WizardController::new(vec![step]).unwrap();

        assert!(matches!(wizard.next(), Transition::Blocked(_)));
        wizard.set_field("code", "1234");
        assert_eq!(wizard.next(), Transition::ReadyToSubmit);
        assert_eq!(wizard.step().fields(), &["code"]);
    }

    #[test]
    fn test_accommodation_steps_in_order() {
        let mut wizard = WizardController::accommodation_booking();
        assert_eq!(wizard.step_count(), 3);
        assert_eq!(wizard.step().title_key(), "booking.steps.dates");

        fill_accommodation(&mut wizard);
        assert_eq!(wizard.step().title_key(), "booking.steps.payment");
        assert_eq!(wizard.next(), Transition::ReadyToSubmit);
    }

    #[tokio::test]
    async fn test_submit_produces_confirmed_record() {
        let mut wizard = WizardController::accommodation_booking();
        fill_accommodation(&mut wizard);

        let record = wizard.submit(&instant_service()).await.unwrap();

        assert!(Regex::new(r"^BK\d{6}$").unwrap().is_match(&record.reference));
        assert_eq!(record.status, BookingStatus::Confirmed);
        assert_eq!(record.total_price, 1650.0);
        assert!(wizard.is_finalized());
        assert_eq!(wizard.record(), Some(&record));
    }

    #[tokio::test]
    async fn test_submit_requires_final_step() {
        let mut wizard = WizardController::accommodation_booking();
        let err = wizard.submit(&instant_service()).await.unwrap_err();
        assert_eq!(err, SubmissionError::NotOnFinalStep { step: 1, total: 3 });
    }

    #[tokio::test]
    async fn test_submit_blocked_by_final_step_validation() {
        let mut wizard = WizardController::accommodation_booking();
        fill_accommodation(&mut wizard);
        wizard.set_field("cardNumber", "123");

        let err = wizard.submit(&instant_service()).await.unwrap_err();
        let errors = err.validation_errors().unwrap();
        assert_eq!(errors.get("cardNumber"), Some("errors.cardNumberInvalid"));
        assert_eq!(wizard.errors().get("cardNumber"), Some("errors.cardNumberInvalid"));
        assert!(!wizard.is_finalized());
    }

    #[tokio::test]
    async fn test_service_validation_errors_surface_on_fields() {
        let mut wizard = WizardController::accommodation_booking();
        fill_accommodation(&mut wizard);
        // Passed step 1 earlier; the backend still checks the whole booking
        wizard.set_field("startDate", "");

        let err = wizard.submit(&instant_service()).await.unwrap_err();
        assert!(err.validation_errors().is_some());
        assert_eq!(
            wizard.errors().get("startDate"),
            Some("errors.startDateRequired")
        );
    }

    #[tokio::test]
    async fn test_negative_nightly_rate_is_not_booked() {
        let mut wizard = WizardController::accommodation_booking();
        fill_accommodation(&mut wizard);
        wizard.set_field("nightlyRate", -150.0);

        let err = wizard.submit(&instant_service()).await.unwrap_err();
        assert!(err.validation_errors().is_some());
        assert_eq!(
            wizard.errors().get("nightlyRate"),
            Some("errors.nightlyRateInvalid")
        );
        assert!(wizard.record().is_none());
    }

    #[test_case("inf"; "infinity")]
    #[test_case("2.5"; "fractional")]
    #[test_case("0"; "zero")]
    fn test_unusable_guest_count_blocks_first_step(guests: &str) {
        let mut wizard = WizardController::accommodation_booking();
        wizard.set_field("startDate", "2025-06-15");
        wizard.set_field("endDate", "2025-06-20");
        wizard.set_field("guests", guests);

        match wizard.next() {
            Transition::Blocked(errors) => {
                assert_eq!(errors.get("guests"), Some("errors.guestsRequired"))
            }
            other => panic!("expected blocked, got {:?}", other),
        }
        assert_eq!(wizard.current_step(), 1);
    }

    struct FlakyService {
        calls: AtomicUsize,
        inner: MockConfirmationService,
    }

    #[async_trait]
    impl ConfirmationService for FlakyService {
        async fn submit_booking(
            &self,
            request: BookingRequest,
        ) -> Result<BookingRecord, SubmissionError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(SubmissionError::Network("connection reset".to_string()));
            }
            self.inner.submit_booking(request).await
        }

        async fn submit_payment(
            &self,
            request: crate::confirmation::PaymentRequest,
        ) -> Result<crate::confirmation::PaymentRecord, SubmissionError> {
            self.inner.submit_payment(request).await
        }
    }

    #[tokio::test]
    async fn test_failed_submission_keeps_wizard_interactive() {
        let service = FlakyService {
            calls: AtomicUsize::new(0),
            inner: instant_service(),
        };
        let mut wizard = WizardController::accommodation_booking();
        fill_accommodation(&mut wizard);

        let err = wizard.submit(&service).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(wizard.errors().get(SUBMIT_FIELD), Some("errors.submitFailed"));
        assert_eq!(wizard.current_step(), 3);

        let record = wizard.submit(&service).await.unwrap();
        assert!(record.reference.starts_with("BK"));
        assert!(wizard.errors().is_empty());
    }

    #[tokio::test]
    async fn test_resubmit_after_finalize_returns_same_record() {
        let service = instant_service();
        let mut wizard = WizardController::accommodation_booking();
        fill_accommodation(&mut wizard);

        let first = wizard.submit(&service).await.unwrap();
        let second = wizard.submit(&service).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(service.issued_count(), 1);
    }

    #[tokio::test]
    async fn test_restaurant_wizard_is_single_step() {
        let mut wizard = WizardController::restaurant_booking();
        assert!(wizard.is_last_step());

        for (field, value) in [
            ("date", "2025-06-18"),
            ("time", "19:30"),
            ("firstName", "Anna"),
            ("lastName", "Berger"),
            ("email", "anna@example.at"),
            ("phone", "+43 2732 123"),
        ] {
            wizard.set_field(field, value);
        }
        wizard.set_field("guests", 2u32);
        wizard.set_field("agreeToTerms", true);

        let record = wizard.submit(&instant_service()).await.unwrap();
        assert!(Regex::new(r"^RB\d{6}$").unwrap().is_match(&record.reference));
    }

    #[tokio::test]
    async fn test_planner_wizard_does_not_submit() {
        let mut wizard = WizardController::trip_planner();
        assert_eq!(wizard.kind(), None);
        assert_eq!(wizard.step_count(), 3);
        assert_eq!(
            wizard.submit(&instant_service()).await.unwrap_err(),
            SubmissionError::NotABookingForm
        );
    }

    #[tokio::test]
    async fn test_generic_wizard_can_target_bookings() {
        let steps = crate::forms::restaurant_booking_steps();
        let draft = Draft::new()
            .with("date", "2025-06-18")
            .with("time", "12:30")
            .with("guests", 3u32)
            .with("firstName", "Anna")
            .with("lastName", "Berger")
            .with("email", "anna@example.at")
            .with("phone", "+43 2732 123")
            .with("agreeToTerms", true);
        let mut wizard = WizardController::with_draft(steps, draft)
            .unwrap()
            .for_booking(BookingKind::Restaurant);

        let record = wizard.submit(&instant_service()).await.unwrap();
        assert_eq!(record.kind, BookingKind::Restaurant);
        assert_eq!(record.details.text("time"), "12:30");
    }

    #[test]
    fn test_submission_with_dyn_service() {
        let service: Box<dyn ConfirmationService> = Box::new(instant_service());
        let mut wizard = WizardController::accommodation_booking();
        fill_accommodation(&mut wizard);

        let record = tokio_test::block_on(wizard.submit(service.as_ref())).unwrap();
        assert_eq!(record.nights, 5);
    }
}
