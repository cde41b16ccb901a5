// Checkout: booking form, then payment for the booked total, then confirmation.

use crate::confirmation::{
    BookingRecord, ConfirmationService, PaymentMethod, PaymentRecord, PaymentRequest,
    SubmissionError,
};
use crate::draft::FieldValue;
use crate::forms;
use crate::wizard::{Transition, WizardController};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStage {
    Booking,
    Payment,
    Confirmation,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CheckoutError {
    #[error("Checkout is at {actual:?}, expected {expected:?}")]
    WrongStage {
        expected: CheckoutStage,
        actual: CheckoutStage,
    },

    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

pub struct CheckoutFlow {
    stage: CheckoutStage,
    booking: WizardController,
    payment: WizardController,
    payment_record: Option<PaymentRecord>,
}

impl CheckoutFlow {
    pub fn new(booking: WizardController) -> Self {
        Self {
            stage: CheckoutStage::Booking,
            booking,
            payment: Self::payment_details(),
            payment_record: None,
        }
    }

    pub fn accommodation() -> Self {
        Self::new(WizardController::accommodation_booking())
    }

    // Card is preselected on the payment form
    fn payment_details() -> WizardController {
        let mut form = WizardController::payment_details();
        form.set_field("paymentMethod", forms::CREDIT_CARD);
        form
    }

    pub fn stage(&self) -> CheckoutStage {
        self.stage
    }

    pub fn booking_form(&self) -> &WizardController {
        &self.booking
    }

    pub fn booking_form_mut(&mut self) -> &mut WizardController {
        &mut self.booking
    }

    pub fn payment_form(&self) -> &WizardController {
        &self.payment
    }

    pub fn set_payment_field(&mut self, name: &str, value: impl Into<FieldValue>) {
        self.payment.set_field(name, value);
    }

    pub fn booking_record(&self) -> Option<&BookingRecord> {
        self.booking.record()
    }

    pub fn payment_record(&self) -> Option<&PaymentRecord> {
        self.payment_record.as_ref()
    }

    /// Amount due, once a booking exists.
    pub fn amount_due(&self) -> Option<f64> {
        self.booking.record().map(|record| record.total_price)
    }

    fn expect_stage(&self, expected: CheckoutStage) -> Result<(), CheckoutError> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(CheckoutError::WrongStage {
                expected,
                actual: self.stage,
            })
        }
    }

    /// Submits the booking form. On success checkout moves on to payment.
    pub async fn submit_booking<C>(&mut self, service: &C) -> Result<BookingRecord, CheckoutError>
    where
        C: ConfirmationService + ?Sized,
    {
        self.expect_stage(CheckoutStage::Booking)?;

        let record = self.booking.submit(service).await?;
        debug!(reference = %record.reference, total = record.total_price, "checkout moving to payment");
        self.stage = CheckoutStage::Payment;
        Ok(record)
    }

    /// Pays the booked total with the given method. On success checkout is confirmed.
    pub async fn submit_payment<C>(
        &mut self,
        service: &C,
        method: PaymentMethod,
    ) -> Result<PaymentRecord, CheckoutError>
    where
        C: ConfirmationService + ?Sized,
    {
        self.expect_stage(CheckoutStage::Payment)?;

        let (amount, fee) = match self.booking.record() {
            Some(record) => (record.total_price, record.service_fee),
            None => {
                return Err(CheckoutError::WrongStage {
                    expected: CheckoutStage::Booking,
                    actual: self.stage,
                })
            }
        };

        self.payment.set_field("paymentMethod", method.form_value());
        if let Transition::Blocked(errors) = self.payment.next() {
            return Err(SubmissionError::Validation(errors).into());
        }

        let request = PaymentRequest::new(amount, method, self.payment.draft().clone())
            .with_service_fee(fee)
            .with_idempotency_key(self.payment.idempotency_key());

        match service.submit_payment(request).await {
            Ok(record) => {
                info!(reference = %record.reference, amount, "checkout confirmed");
                self.stage = CheckoutStage::Confirmation;
                self.payment_record = Some(record.clone());
                Ok(record)
            }
            Err(err) => {
                warn!(error = %err, "payment failed");
                self.payment.report_failure(&err, "errors.paymentFailed");
                Err(err.into())
            }
        }
    }

    /// Leaves the payment step; the booking and its record are kept.
    pub fn cancel_payment(&mut self) -> Result<(), CheckoutError> {
        self.expect_stage(CheckoutStage::Payment)?;
        self.stage = CheckoutStage::Booking;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.booking.reset();
        self.payment = Self::payment_details();
        self.payment_record = None;
        self.stage = CheckoutStage::Booking;
    }
}
