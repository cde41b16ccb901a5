// Step definitions for the storefront's forms: accommodation and restaurant
// booking, payment details and the trip planner.

use crate::validation::{Condition, Rule, RuleSet};
use crate::wizard::Step;

pub const CREDIT_CARD: &str = "credit_card";
pub const PAYPAL: &str = "paypal";

fn contact_rules(rules: RuleSet) -> RuleSet {
    rules
        .rule("firstName", Rule::Required, "errors.firstNameRequired")
        .rule("lastName", Rule::Required, "errors.lastNameRequired")
        .rule("email", Rule::Required, "errors.emailRequired")
        .rule("email", Rule::Email, "errors.emailInvalid")
        .rule("phone", Rule::Required, "errors.phoneRequired")
}

fn card_rules(rules: RuleSet, method_field: &'static str) -> RuleSet {
    let card = || Condition::Equals(method_field, CREDIT_CARD);
    rules
        .rule_when(card(), "cardNumber", Rule::Required, "errors.cardNumberRequired")
        .rule_when(card(), "cardNumber", Rule::CardNumber, "errors.cardNumberInvalid")
        .rule_when(card(), "cardExpiry", Rule::Required, "errors.cardExpiryRequired")
        .rule_when(card(), "cardExpiry", Rule::CardExpiry, "errors.cardExpiryInvalid")
        .rule_when(card(), "cardCvc", Rule::Required, "errors.cardCvcRequired")
        .rule_when(card(), "cardCvc", Rule::CardCvc, "errors.cardCvcInvalid")
}

pub fn stay_rules() -> RuleSet {
    RuleSet::new()
        .rule("startDate", Rule::Required, "errors.startDateRequired")
        .rule("startDate", Rule::Date, "errors.dateInvalid")
        .rule("endDate", Rule::Required, "errors.endDateRequired")
        .rule("endDate", Rule::Date, "errors.dateInvalid")
        .rule("endDate", Rule::DateAfter("startDate"), "errors.endDateAfterStart")
        .rule("guests", Rule::Count(1), "errors.guestsRequired")
}

pub fn contact_details_rules() -> RuleSet {
    contact_rules(RuleSet::new())
}

pub fn booking_payment_rules() -> RuleSet {
    card_rules(RuleSet::new(), "paymentMethod").rule(
        "agreeToTerms",
        Rule::Required,
        "errors.agreeToTermsRequired",
    )
}

/// Three steps: dates and guests, contact details, payment and terms.
pub fn accommodation_booking_steps() -> Vec<Step> {
    vec![
        Step::new("booking.steps.dates", stay_rules()),
        Step::new("booking.steps.contact", contact_details_rules()),
        Step::new("booking.steps.payment", booking_payment_rules()),
    ]
}

pub fn reservation_rules() -> RuleSet {
    let rules = RuleSet::new()
        .rule("date", Rule::Required, "errors.dateRequired")
        .rule("date", Rule::Date, "errors.dateInvalid")
        .rule("time", Rule::Required, "errors.timeRequired")
        .rule("guests", Rule::Count(1), "errors.guestsRequired");

    contact_rules(rules).rule("agreeToTerms", Rule::Required, "errors.agreeToTermsRequired")
}

/// Restaurant booking is a single step.
pub fn restaurant_booking_steps() -> Vec<Step> {
    vec![Step::new("restaurant.steps.reservation", reservation_rules())]
}

/// Time slots offered by the restaurant form.
pub const RESTAURANT_TIME_SLOTS: &[&str] = &[
    "12:00", "12:30", "13:00", "13:30", "14:00", "14:30", "18:00", "18:30", "19:00", "19:30",
    "20:00", "20:30", "21:00",
];

/// Payment details checked before a payment is submitted.
pub fn payment_rules() -> RuleSet {
    card_rules(RuleSet::new(), "paymentMethod")
        .rule_when(
            Condition::Equals("paymentMethod", CREDIT_CARD),
            "cardholderName",
            Rule::Required,
            "errors.cardholderNameRequired",
        )
        .rule("billingAddress", Rule::Required, "errors.billingAddressRequired")
        .rule("billingCity", Rule::Required, "errors.billingCityRequired")
        .rule("billingZip", Rule::Required, "errors.billingZipRequired")
        .rule("billingCountry", Rule::Required, "errors.billingCountryRequired")
        .rule("agreeToTerms", Rule::Required, "errors.agreeToTermsRequired")
        .rule(
            "agreeToRefundPolicy",
            Rule::Required,
            "errors.agreeToRefundPolicyRequired",
        )
}

pub fn payment_steps() -> Vec<Step> {
    vec![Step::new("payment.steps.details", payment_rules())]
}

/// Trip planner: when/who, interests/budget, accommodation/activities.
pub fn planner_steps() -> Vec<Step> {
    vec![
        Step::new(
            "planner.steps.basics",
            RuleSet::new()
                .rule("duration", Rule::Required, "errors.durationRequired")
                .rule("people", Rule::Required, "errors.peopleRequired"),
        )
        .collecting(&["dates", "duration", "people"]),
        Step::new(
            "planner.steps.interests",
            RuleSet::new().rule("budget", Rule::Required, "errors.budgetRequired"),
        )
        .collecting(&["interests", "budget"]),
        Step::new(
            "planner.steps.stay",
            RuleSet::new().rule(
                "accommodation",
                Rule::Required,
                "errors.accommodationRequired",
            ),
        )
        .collecting(&["accommodation", "activities"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::Draft;
    use crate::validation::StepValidator;

    fn valid_payment_draft() -> Draft {
        Draft::new()
            .with("paymentMethod", CREDIT_CARD)
            .with("cardNumber", "4111 1111 1111 1111")
            .with("cardExpiry", "12/27")
            .with("cardCvc", "123")
            .with("cardholderName", "Anna Berger")
            .with("billingAddress", "Landstrasse 1")
            .with("billingCity", "Krems")
            .with("billingZip", "3500")
            .with("billingCountry", "AT")
            .with("agreeToTerms", true)
            .with("agreeToRefundPolicy", true)
    }

    #[test]
    fn test_stay_rules_messages() {
        let result = stay_rules().validate(&Draft::new());
        assert_eq!(result.get("startDate"), Some("errors.startDateRequired"));
        assert_eq!(result.get("endDate"), Some("errors.endDateRequired"));
        assert_eq!(result.get("guests"), Some("errors.guestsRequired"));

        let reversed = Draft::new()
            .with("startDate", "2025-06-20")
            .with("endDate", "2025-06-15")
            .with("guests", 2u32);
        let result = stay_rules().validate(&reversed);
        assert_eq!(result.get("endDate"), Some("errors.endDateAfterStart"));
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_contact_rules_email_shape() {
        let draft = Draft::new()
            .with("firstName", "Anna")
            .with("lastName", "Berger")
            .with("email", "anna-at-example")
            .with("phone", "+43 1 234");
        let result = contact_details_rules().validate(&draft);
        assert_eq!(result.get("email"), Some("errors.emailInvalid"));
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_booking_payment_skips_card_for_paypal() {
        let draft = Draft::new()
            .with("paymentMethod", PAYPAL)
            .with("agreeToTerms", true);
        assert!(booking_payment_rules().validate(&draft).is_valid());

        let card = Draft::new()
            .with("paymentMethod", CREDIT_CARD)
            .with("agreeToTerms", true)
            .with("cardNumber", "123");
        let result = booking_payment_rules().validate(&card);
        assert_eq!(result.get("cardNumber"), Some("errors.cardNumberInvalid"));
        assert!(result.contains("cardExpiry"));
        assert!(result.contains("cardCvc"));
    }

    #[test]
    fn test_payment_rules_accept_complete_details() {
        assert!(payment_rules().validate(&valid_payment_draft()).is_valid());
    }

    #[test]
    fn test_payment_rules_require_billing_and_consents() {
        let mut draft = valid_payment_draft();
        draft.remove("billingCity");
        draft.set("agreeToRefundPolicy", false);

        let result = payment_rules().validate(&draft);
        assert_eq!(result.get("billingCity"), Some("errors.billingCityRequired"));
        assert_eq!(
            result.get("agreeToRefundPolicy"),
            Some("errors.agreeToRefundPolicyRequired")
        );
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_paypal_payment_needs_no_cardholder() {
        let mut draft = valid_payment_draft();
        draft.set("paymentMethod", PAYPAL);
        draft.remove("cardholderName");
        draft.remove("cardNumber");
        assert!(payment_rules().validate(&draft).is_valid());
    }

    #[test]
    fn test_reservation_rules() {
        let draft = Draft::new()
            .with("date", "2025-06-18")
            .with("time", RESTAURANT_TIME_SLOTS[0])
            .with("guests", 2u32)
            .with("firstName", "Anna")
            .with("lastName", "Berger")
            .with("email", "anna@example.at")
            .with("phone", "+43 1 234");

        let result = reservation_rules().validate(&draft);
        assert_eq!(result.fields().collect::<Vec<_>>(), vec!["agreeToTerms"]);
    }

    #[test]
    fn test_step_counts() {
        assert_eq!(accommodation_booking_steps().len(), 3);
        assert_eq!(restaurant_booking_steps().len(), 1);
        assert_eq!(payment_steps().len(), 1);
        assert_eq!(planner_steps().len(), 3);
    }

    #[test]
    fn test_planner_steps_collect_optional_fields() {
        let steps = planner_steps();
        assert_eq!(steps[0].fields(), &["dates", "duration", "people"]);
        assert_eq!(steps[1].fields(), &["interests", "budget"]);
    }
}
