//! Signed payment requests for the hosted checkout.
//!
//! [`PaymentRequestBuilder`] turns a plan selection into an [`Order`] plus the
//! form fields the gateway expects. Building is pure; persisting the order is
//! the caller's job.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::foundation::{Timestamp, UserId, ValidationError};

use super::errors::BillingError;
use super::order::{Order, OrderReference};
use super::plan::{PlanCatalog, PlanDefinition};
use super::return_origin::ReturnOriginPolicy;
use super::signature::SigningKey;

/// Quantity of the single product line.
const PRODUCT_COUNT: u32 = 1;

/// Merchant identity and endpoints announced to the gateway.
#[derive(Debug, Clone)]
pub struct MerchantProfile {
    pub account: String,
    pub domain: String,
    /// Callback endpoint the gateway posts outcomes to.
    pub service_url: String,
    /// Return page the buyer is sent to; receives `rd=<origin>`.
    pub return_url: Url,
    pub language: String,
}

impl MerchantProfile {
    pub fn validate(&self) -> Result<(), BillingError> {
        if self.account.trim().is_empty() {
            return Err(BillingError::Configuration(
                "merchant account is not set".to_string(),
            ));
        }
        if self.domain.trim().is_empty() {
            return Err(BillingError::Configuration(
                "merchant domain is not set".to_string(),
            ));
        }
        Ok(())
    }
}

/// What the buyer asked for.
#[derive(Debug, Clone)]
pub struct PlanSelection {
    pub plan_id: String,
    pub user_id: String,
    pub user_email: String,
    pub return_domain: Option<String>,
}

/// Gateway form fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub merchant_account: String,
    pub merchant_domain_name: String,
    pub merchant_signature: String,
    pub order_reference: String,
    pub order_date: i64,
    pub amount: u32,
    pub currency: String,
    pub product_name: Vec<String>,
    pub product_price: Vec<u32>,
    pub product_count: Vec<u32>,
    pub client_email: String,
    pub return_url: String,
    pub service_url: String,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub regular_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub regular_amount: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub date_next: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub regular_count: Option<u32>,
}

impl PaymentRequest {
    /// Fields covered by `merchantSignature`, in gateway order.
    pub fn signature_fields(&self) -> Vec<String> {
        let mut fields = vec![
            self.merchant_account.clone(),
            self.merchant_domain_name.clone(),
            self.order_reference.clone(),
            self.order_date.to_string(),
            self.amount.to_string(),
            self.currency.clone(),
        ];
        fields.extend(self.product_name.iter().cloned());
        fields.extend(self.product_count.iter().map(u32::to_string));
        fields.extend(self.product_price.iter().map(u32::to_string));
        fields
    }

    pub fn is_recurring(&self) -> bool {
        self.regular_mode.is_some()
    }
}

/// An order together with the request that pays for it.
#[derive(Debug, Clone)]
pub struct BuiltPayment {
    pub order: Order,
    pub request: PaymentRequest,
}

/// Builds signed payment requests from plan selections.
#[derive(Debug, Clone)]
pub struct PaymentRequestBuilder {
    merchant: MerchantProfile,
    signing_key: SigningKey,
    catalog: Arc<PlanCatalog>,
    return_policy: ReturnOriginPolicy,
}

impl PaymentRequestBuilder {
    pub fn new(
        merchant: MerchantProfile,
        signing_key: SigningKey,
        catalog: Arc<PlanCatalog>,
        return_policy: ReturnOriginPolicy,
    ) -> Result<Self, BillingError> {
        merchant.validate()?;
        Ok(Self {
            merchant,
            signing_key,
            catalog,
            return_policy,
        })
    }

    pub fn build(
        &self,
        selection: &PlanSelection,
        now: Timestamp,
    ) -> Result<BuiltPayment, BillingError> {
        let plan = self.catalog.lookup(selection.plan_id.trim())?;
        let user_id = UserId::new(selection.user_id.trim())?;
        let email = validate_email(&selection.user_email)?;

        let reference = OrderReference::generate(&user_id, plan.id, now)?;
        let origin = self.return_policy.resolve(selection.return_domain.as_deref());

        let mut request = PaymentRequest {
            merchant_account: self.merchant.account.clone(),
            merchant_domain_name: self.merchant.domain.clone(),
            merchant_signature: String::new(),
            order_reference: reference.to_string(),
            order_date: now.as_unix_secs(),
            amount: plan.price,
            currency: self.catalog.currency().to_string(),
            product_name: vec![plan.product_name.clone()],
            product_price: vec![plan.price],
            product_count: vec![PRODUCT_COUNT],
            client_email: email,
            return_url: self.return_url_for(&origin),
            service_url: self.merchant.service_url.clone(),
            language: self.merchant.language.clone(),
            regular_mode: None,
            regular_amount: None,
            date_next: None,
            regular_count: None,
        };
        apply_recurrence(&mut request, plan, now);
        request.merchant_signature = self.signing_key.sign(&request.signature_fields());

        let order = Order::new(
            reference,
            user_id,
            plan.id,
            plan.price,
            self.catalog.currency(),
            now,
        );

        Ok(BuiltPayment { order, request })
    }

    fn return_url_for(&self, origin: &str) -> String {
        let mut url = self.merchant.return_url.clone();
        url.query_pairs_mut().append_pair("rd", origin);
        url.to_string()
    }
}

fn apply_recurrence(request: &mut PaymentRequest, plan: &PlanDefinition, now: Timestamp) {
    if let Some(recurrence) = &plan.recurrence {
        request.regular_mode = Some(recurrence.frequency.as_gateway_mode().to_string());
        request.regular_amount = Some(plan.price);
        request.date_next = Some(
            now.add_days(i64::from(plan.duration_days))
                .to_day_month_year(),
        );
        request.regular_count = Some(recurrence.occurrences);
    }
}

fn validate_email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim();
    if email.is_empty() {
        return Err(ValidationError::empty_field("user_email"));
    }
    if !email.contains('@') {
        return Err(ValidationError::invalid_format("user_email", "missing @ symbol"));
    }
    Ok(email.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::order::OrderStatus;
    use crate::domain::billing::plan::PlanId;
    use proptest::prelude::*;

    const SECRET: &str = "merchant-secret";

    fn key() -> SigningKey {
        SigningKey::new(SECRET).unwrap()
    }

    fn builder() -> PaymentRequestBuilder {
        let merchant = MerchantProfile {
            account: "gotohome_com_ua".to_string(),
            domain: "gotohome.com.ua".to_string(),
            service_url: "https://api.gotohome.com.ua/api/payments/callback".to_string(),
            return_url: Url::parse("https://api.gotohome.com.ua/api/payments/return").unwrap(),
            language: "UA".to_string(),
        };
        let policy = ReturnOriginPolicy::new(
            vec!["www.gotohome.com.ua".to_string(), "gotohome.com.ua".to_string()],
            vec![".lovable.app".to_string()],
            "https://www.gotohome.com.ua",
        )
        .unwrap();
        let catalog = Arc::new(PlanCatalog::bundled().unwrap());
        PaymentRequestBuilder::new(merchant, key(), catalog, policy).unwrap()
    }

    fn selection(plan_id: &str) -> PlanSelection {
        PlanSelection {
            plan_id: plan_id.to_string(),
            user_id: "u123".to_string(),
            user_email: "buyer@example.com".to_string(),
            return_domain: None,
        }
    }

    fn now() -> Timestamp {
        Timestamp::from_unix_secs(1_700_000_000).unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // One-off plan
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn builds_signed_request_for_short_plan() {
        let built = builder().build(&selection("10days"), now()).unwrap();
        let req = &built.request;

        assert_eq!(req.order_reference, "order_u123_10days_1700000000000");
        assert_eq!(req.order_date, 1_700_000_000);
        assert_eq!(req.amount, 199);
        assert_eq!(req.currency, "UAH");
        assert_eq!(req.product_name, vec!["GoToHome Smart - 10 днів"]);
        assert_eq!(req.product_count, vec![1]);
        assert_eq!(req.product_price, vec![199]);
        assert!(!req.is_recurring());
        assert!(key().verify(&req.signature_fields(), &req.merchant_signature));
    }

    #[test]
    fn signature_covers_fields_in_gateway_order() {
        let built = builder().build(&selection("10days"), now()).unwrap();
        assert_eq!(
            built.request.signature_fields(),
            vec![
                "gotohome_com_ua",
                "gotohome.com.ua",
                "order_u123_10days_1700000000000",
                "1700000000",
                "199",
                "UAH",
                "GoToHome Smart - 10 днів",
                "1",
                "199",
            ]
        );
    }

    #[test]
    fn order_is_created_alongside_request() {
        let built = builder().build(&selection("10days"), now()).unwrap();
        assert_eq!(built.order.status, OrderStatus::Created);
        assert_eq!(built.order.plan_id, PlanId::TenDays);
        assert_eq!(built.order.amount, 199);
        assert_eq!(built.order.reference.as_str(), built.request.order_reference);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Recurring plan
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn long_plan_carries_recurrence_directives() {
        let built = builder().build(&selection("30days"), now()).unwrap();
        let req = &built.request;

        assert!(req.is_recurring());
        assert_eq!(req.regular_mode.as_deref(), Some("monthly"));
        assert_eq!(req.regular_amount, Some(299));
        // 14.11.2023 + 30 days
        assert_eq!(req.date_next.as_deref(), Some("14.12.2023"));
        assert_eq!(req.regular_count, Some(12));
    }

    #[test]
    fn recurrence_fields_are_omitted_for_one_off_plan() {
        let built = builder().build(&selection("10days"), now()).unwrap();
        let json = serde_json::to_value(&built.request).unwrap();
        assert!(json.get("regularMode").is_none());
        assert!(json.get("dateNext").is_none());
        assert_eq!(json["merchantDomainName"], "gotohome.com.ua");
        assert_eq!(json["productName"][0], "GoToHome Smart - 10 днів");
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Return URL
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn return_url_carries_allowed_origin() {
        let mut sel = selection("10days");
        sel.return_domain = Some("https://preview.lovable.app/subscription".to_string());
        let built = builder().build(&sel, now()).unwrap();
        assert_eq!(
            built.request.return_url,
            "https://api.gotohome.com.ua/api/payments/return?rd=https%3A%2F%2Fpreview.lovable.app"
        );
    }

    #[test]
    fn foreign_return_domain_is_replaced_by_fallback() {
        let mut sel = selection("10days");
        sel.return_domain = Some("https://phish.example".to_string());
        let built = builder().build(&sel, now()).unwrap();
        assert!(built
            .request
            .return_url
            .ends_with("rd=https%3A%2F%2Fwww.gotohome.com.ua"));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Validation
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn unknown_plan_is_malformed() {
        assert!(matches!(
            builder().build(&selection("1day"), now()),
            Err(BillingError::MalformedRequest(_))
        ));
    }

    #[test]
    fn user_id_with_delimiter_is_malformed() {
        let mut sel = selection("10days");
        sel.user_id = "u_1".to_string();
        assert!(builder().build(&sel, now()).is_err());
    }

    #[test]
    fn email_without_at_is_malformed() {
        let mut sel = selection("10days");
        sel.user_email = "buyer.example.com".to_string();
        assert!(builder().build(&sel, now()).is_err());
        sel.user_email = String::new();
        assert!(builder().build(&sel, now()).is_err());
    }

    #[test]
    fn empty_merchant_domain_is_configuration_error() {
        let merchant = MerchantProfile {
            account: "acct".to_string(),
            domain: " ".to_string(),
            service_url: String::new(),
            return_url: Url::parse("https://x.example/return").unwrap(),
            language: "UA".to_string(),
        };
        let policy = ReturnOriginPolicy::new(vec![], vec![], "https://x.example").unwrap();
        let catalog = Arc::new(PlanCatalog::bundled().unwrap());
        assert!(matches!(
            PaymentRequestBuilder::new(merchant, key(), catalog, policy),
            Err(BillingError::Configuration(_))
        ));
    }

    proptest! {
        #[test]
        fn built_requests_verify_and_reject_tampering(
            user in "[a-z0-9-]{1,20}",
            secs in 1_600_000_000i64..1_900_000_000i64,
            long in any::<bool>(),
        ) {
            let sel = PlanSelection {
                plan_id: if long { "30days" } else { "10days" }.to_string(),
                user_id: user,
                user_email: "buyer@example.com".to_string(),
                return_domain: None,
            };
            let at = Timestamp::from_unix_secs(secs).unwrap();
            let built = builder().build(&sel, at).unwrap();
            let req = built.request;
            prop_assert!(key().verify(&req.signature_fields(), &req.merchant_signature));

            let mut tampered = req.clone();
            tampered.amount += 1;
            prop_assert!(!key().verify(&tampered.signature_fields(), &req.merchant_signature));
        }
    }
}
