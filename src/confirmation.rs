// Confirmation backend boundary: booking and payment records, the service trait,
// reference generation and the in-process mock used by the storefront.

use crate::config::{ConfirmationConfig, PricingConfig, StorefrontConfig};
use crate::draft::Draft;
use crate::forms::{self, CREDIT_CARD, PAYPAL};
use crate::pricing::PriceBreakdown;
use crate::validation::{RuleSet, StepValidator, ValidationResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const BOOKING_PREFIX: &str = "BK";
pub const RESTAURANT_PREFIX: &str = "RB";
pub const PAYMENT_PREFIX: &str = "PAY";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubmissionError {
    #[error("Validation failed for {} field(s)", .0.len())]
    Validation(ValidationResult),

    #[error("Submission {0} is already in flight")]
    InFlight(String),

    #[error("Idempotency key {0} was already used for a different request")]
    KeyReused(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Backend error: {status} - {message}")]
    Backend {
        status: u16,
        message: String,
        retryable: bool,
    },

    #[error("Could not allocate a unique {0} reference")]
    ReferenceExhausted(String),

    #[error("Submission is only possible from the final step (on step {step} of {total})")]
    NotOnFinalStep { step: usize, total: usize },

    #[error("This form does not create bookings")]
    NotABookingForm,
}

impl SubmissionError {
    /// Transient causes only. Validation problems need the user, not a retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            SubmissionError::Network(_) | SubmissionError::Timeout(_) => true,
            SubmissionError::Backend { retryable, .. } => *retryable,
            _ => false,
        }
    }

    pub fn validation_errors(&self) -> Option<&ValidationResult> {
        match self {
            SubmissionError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingKind {
    Accommodation,
    Restaurant,
}

impl BookingKind {
    pub fn reference_prefix(&self) -> &'static str {
        match self {
            BookingKind::Accommodation => BOOKING_PREFIX,
            BookingKind::Restaurant => RESTAURANT_PREFIX,
        }
    }

    // Fields a backend needs regardless of how the form was split into steps
    fn required_rules(&self) -> RuleSet {
        match self {
            BookingKind::Accommodation => forms::stay_rules().and(forms::contact_details_rules()),
            BookingKind::Restaurant => forms::reservation_rules(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Paypal,
}

impl PaymentMethod {
    /// Maps the payment form's option value.
    pub fn from_form_value(value: &str) -> Option<Self> {
        match value {
            CREDIT_CARD => Some(PaymentMethod::Card),
            PAYPAL => Some(PaymentMethod::Paypal),
            _ => None,
        }
    }

    pub fn form_value(&self) -> &'static str {
        match self {
            PaymentMethod::Card => CREDIT_CARD,
            PaymentMethod::Paypal => PAYPAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub kind: BookingKind,
    pub draft: Draft,
    pub idempotency_key: Option<String>,
}

impl BookingRequest {
    pub fn new(kind: BookingKind, draft: Draft) -> Self {
        Self {
            kind,
            draft,
            idempotency_key: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub reference: String,
    pub kind: BookingKind,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub details: Draft,
    pub nights: u32,
    pub base_price: f64,
    pub service_fee: f64,
    pub total_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub amount: f64,
    pub service_fee: f64,
    pub method: PaymentMethod,
    pub billing: Draft,
    pub idempotency_key: Option<String>,
}

impl PaymentRequest {
    pub fn new(amount: f64, method: PaymentMethod, billing: Draft) -> Self {
        Self {
            amount,
            service_fee: 0.0,
            method,
            billing,
            idempotency_key: None,
        }
    }

    pub fn with_service_fee(mut self, fee: f64) -> Self {
        self.service_fee = fee;
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Payment outcome. Card details are reduced to the last four digits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub reference: String,
    pub method: PaymentMethod,
    pub amount: f64,
    pub service_fee: f64,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub last_four: Option<String>,
}

/// Backend that turns valid drafts into booking and payment records.
/// The mock and the HTTP client are interchangeable behind this trait.
#[async_trait]
pub trait ConfirmationService: Send + Sync {
    async fn submit_booking(&self, request: BookingRequest)
        -> Result<BookingRecord, SubmissionError>;

    async fn submit_payment(&self, request: PaymentRequest)
        -> Result<PaymentRecord, SubmissionError>;
}

/// Source of reference codes such as `BK123456`.
pub trait IdGenerator: Send + Sync {
    fn next_reference(&self, prefix: &str) -> String;
}

/// Prefix plus a random six-digit number.
#[derive(Debug, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn next_reference(&self, prefix: &str) -> String {
        let number: u32 = rand::thread_rng().gen_range(100000..=999999);
        format!("{}{}", prefix, number)
    }
}

/// Deterministic six-digit counter, wrapping back to 100000 after 999999.
#[derive(Debug)]
pub struct SequentialIdGenerator {
    next: Mutex<u32>,
}

impl SequentialIdGenerator {
    pub fn starting_at(start: u32) -> Self {
        Self {
            next: Mutex::new(start.clamp(100000, 999999)),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::starting_at(100000)
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_reference(&self, prefix: &str) -> String {
        let mut next = self.next.lock();
        let number = *next;
        *next = if number >= 999999 { 100000 } else { number + 1 };
        format!("{}{}", prefix, number)
    }
}

/// Fresh per-session key attached to submissions.
pub fn new_idempotency_key() -> String {
    format!("{:016x}", rand::random::<u64>())
}

#[derive(Debug, Clone)]
enum Slot {
    Pending,
    Booking(Box<BookingRecord>),
    Payment(Box<PaymentRecord>),
}

// Releases a pending idempotency slot if the submission never completed
struct PendingSlot<'a> {
    slots: &'a DashMap<String, Slot>,
    key: Option<String>,
}

impl PendingSlot<'_> {
    fn complete(mut self, slot: Slot) {
        if let Some(key) = self.key.take() {
            self.slots.insert(key, slot);
        }
    }
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.slots
                .remove_if(&key, |_, slot| matches!(slot, Slot::Pending));
        }
    }
}

/// In-process stand-in for the booking/payment backend.
/// Always succeeds for valid input after the configured delay.
pub struct MockConfirmationService {
    pricing: PricingConfig,
    config: ConfirmationConfig,
    ids: Arc<dyn IdGenerator>,
    issued: DashSet<String>,
    slots: DashMap<String, Slot>,
}

impl MockConfirmationService {
    pub fn new(pricing: PricingConfig, config: ConfirmationConfig) -> Self {
        Self {
            pricing,
            config,
            ids: Arc::new(RandomIdGenerator),
            issued: DashSet::new(),
            slots: DashMap::new(),
        }
    }

    /// Mock driven by a loaded storefront configuration.
    pub fn from_config(config: &StorefrontConfig) -> Self {
        Self::new(config.pricing.clone(), config.confirmation.clone())
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Number of distinct references handed out so far.
    pub fn issued_count(&self) -> usize {
        self.issued.len()
    }

    fn allocate_reference(&self, prefix: &str) -> Result<String, SubmissionError> {
        for _ in 0..self.config.max_reference_attempts.max(1) {
            let reference = self.ids.next_reference(prefix);
            if self.issued.insert(reference.clone()) {
                return Ok(reference);
            }
            debug!(reference = %reference, "reference collision, drawing again");
        }
        warn!(prefix, "no unique reference after {} attempts", self.config.max_reference_attempts);
        Err(SubmissionError::ReferenceExhausted(prefix.to_string()))
    }

    // Looks up or claims an idempotency key; Ok(Some) is a replay of a finished submission
    fn claim(&self, key: Option<&String>) -> Result<Option<Slot>, SubmissionError> {
        let Some(key) = key else {
            return Ok(None);
        };

        match self.slots.entry(key.clone()) {
            Entry::Occupied(entry) => match entry.get() {
                Slot::Pending => Err(SubmissionError::InFlight(key.clone())),
                finished => Ok(Some(finished.clone())),
            },
            Entry::Vacant(entry) => {
                entry.insert(Slot::Pending);
                Ok(None)
            }
        }
    }

    /// Rate a draft asks for; the configured rate when it names none.
    fn nightly_rate(&self, draft: &Draft) -> Result<f64, SubmissionError> {
        let Some(value) = draft.get("nightlyRate") else {
            return Ok(self.pricing.nightly_rate);
        };
        match value.as_number() {
            Some(rate) if rate > 0.0 => Ok(rate),
            _ => Err(single_field_error("nightlyRate", "errors.nightlyRateInvalid")),
        }
    }

    async fn simulate_latency(delay_ms: u64) {
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
    }
}

fn single_field_error(field: &str, message: &str) -> SubmissionError {
    let mut errors = ValidationResult::new();
    errors.insert(field, message);
    SubmissionError::Validation(errors)
}

impl Default for MockConfirmationService {
    fn default() -> Self {
        Self::new(PricingConfig::default(), ConfirmationConfig::default())
    }
}

#[async_trait]
impl ConfirmationService for MockConfirmationService {
    async fn submit_booking(
        &self,
        request: BookingRequest,
    ) -> Result<BookingRecord, SubmissionError> {
        let errors = request.kind.required_rules().validate(&request.draft);
        if !errors.is_valid() {
            debug!(kind = ?request.kind, fields = errors.len(), "booking rejected");
            return Err(SubmissionError::Validation(errors));
        }
        let nightly_rate = self.nightly_rate(&request.draft)?;

        match self.claim(request.idempotency_key.as_ref())? {
            Some(Slot::Booking(record)) => {
                debug!(reference = %record.reference, "replaying booking for idempotency key");
                return Ok(*record);
            }
            Some(_) => {
                return Err(SubmissionError::KeyReused(
                    request.idempotency_key.unwrap_or_default(),
                ))
            }
            None => {}
        }
        let pending = PendingSlot {
            slots: &self.slots,
            key: request.idempotency_key.clone(),
        };

        Self::simulate_latency(self.config.booking_delay_ms).await;

        let reference = self.allocate_reference(request.kind.reference_prefix())?;

        let price = match request.kind {
            BookingKind::Accommodation => {
                PriceBreakdown::quote(&request.draft, nightly_rate, self.pricing.fee_rate)
            }
            BookingKind::Restaurant => None,
        };

        let record = BookingRecord {
            reference,
            kind: request.kind,
            status: BookingStatus::Confirmed,
            created_at: Utc::now(),
            nights: price.as_ref().map_or(0, |p| p.nights),
            base_price: price.as_ref().map_or(0.0, |p| p.base_price),
            service_fee: price.as_ref().map_or(0.0, |p| p.service_fee),
            total_price: price.as_ref().map_or(0.0, |p| p.total),
            details: request.draft,
        };

        info!(
            reference = %record.reference,
            kind = ?record.kind,
            total = record.total_price,
            "booking confirmed"
        );
        pending.complete(Slot::Booking(Box::new(record.clone())));
        Ok(record)
    }

    async fn submit_payment(
        &self,
        request: PaymentRequest,
    ) -> Result<PaymentRecord, SubmissionError> {
        // The method argument decides which card rules apply, not a stale form value
        let billing = request
            .billing
            .clone()
            .with("paymentMethod", request.method.form_value());

        let errors = forms::payment_rules().validate(&billing);
        if !errors.is_valid() {
            debug!(method = ?request.method, fields = errors.len(), "payment rejected");
            return Err(SubmissionError::Validation(errors));
        }
        if !(request.amount.is_finite() && request.amount >= 0.0) {
            warn!(amount = request.amount, "payment amount rejected");
            return Err(single_field_error("amount", "errors.amountInvalid"));
        }
        if !(request.service_fee.is_finite() && request.service_fee >= 0.0) {
            warn!(fee = request.service_fee, "payment service fee rejected");
            return Err(single_field_error("serviceFee", "errors.amountInvalid"));
        }

        match self.claim(request.idempotency_key.as_ref())? {
            Some(Slot::Payment(record)) => {
                debug!(reference = %record.reference, "replaying payment for idempotency key");
                return Ok(*record);
            }
            Some(_) => {
                return Err(SubmissionError::KeyReused(
                    request.idempotency_key.unwrap_or_default(),
                ))
            }
            None => {}
        }
        let pending = PendingSlot {
            slots: &self.slots,
            key: request.idempotency_key.clone(),
        };

        Self::simulate_latency(self.config.payment_delay_ms).await;

        let reference = self.allocate_reference(PAYMENT_PREFIX)?;

        let last_four = match request.method {
            PaymentMethod::Card => {
                let digits: String = billing
                    .text("cardNumber")
                    .chars()
                    .filter(|c| c.is_ascii_digit())
                    .collect();
                Some(digits[digits.len().saturating_sub(4)..].to_string())
            }
            PaymentMethod::Paypal => None,
        };

        let record = PaymentRecord {
            reference,
            method: request.method,
            amount: request.amount,
            service_fee: request.service_fee,
            status: PaymentStatus::Completed,
            created_at: Utc::now(),
            last_four,
        };

        info!(
            reference = %record.reference,
            method = ?record.method,
            amount = record.amount,
            "payment completed"
        );
        pending.complete(Slot::Payment(Box::new(record.clone())));
        Ok(record)
    }
}
