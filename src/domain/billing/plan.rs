//! Subscription plans and the fixed plan catalog.
//!
//! Two vocabularies exist for a plan:
//! - [`PlanId`] is the wire id the client selects and that is embedded in the
//!   order reference (`10days`, `30days`).
//! - [`Plan`] is what the entitlement store records (`free`, `plan_10_days`,
//!   `plan_30_days`).
//!
//! [`PlanCatalog`] maps the first onto the second together with price,
//! duration and recurrence. It is loaded once from `config/plans.yaml`, which
//! is compiled into the binary, and shared read-only afterwards.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::ValidationError;

/// Catalog compiled into the binary.
const BUNDLED_CATALOG: &str = include_str!("../../../config/plans.yaml");

/// Number of listings a free user may browse.
pub const FREE_LISTING_LIMIT: usize = 10;

/// Stored entitlement level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Plan {
    #[serde(rename = "free")]
    Free,
    /// 10-day one-off access.
    #[serde(rename = "plan_10_days")]
    TierShort,
    /// 30-day access, renewed monthly by the gateway.
    #[serde(rename = "plan_30_days")]
    TierLong,
}

impl Plan {
    /// Returns the name persisted in the entitlement store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::TierShort => "plan_10_days",
            Plan::TierLong => "plan_30_days",
        }
    }

    pub fn is_paid(&self) -> bool {
        !matches!(self, Plan::Free)
    }

    /// Maximum number of listings visible, `None` when unlimited.
    pub fn listing_limit(&self) -> Option<usize> {
        match self {
            Plan::Free => Some(FREE_LISTING_LIMIT),
            Plan::TierShort | Plan::TierLong => None,
        }
    }

    pub fn can_save_listings(&self) -> bool {
        self.is_paid()
    }

    pub fn has_bot_access(&self) -> bool {
        self.is_paid()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Plan {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Plan::Free),
            "plan_10_days" => Ok(Plan::TierShort),
            "plan_30_days" => Ok(Plan::TierLong),
            other => Err(ValidationError::unknown_value("plan", other)),
        }
    }
}

/// Purchasable plan identifier as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlanId {
    #[serde(rename = "10days")]
    TenDays,
    #[serde(rename = "30days")]
    ThirtyDays,
}

impl PlanId {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanId::TenDays => "10days",
            PlanId::ThirtyDays => "30days",
        }
    }

    pub fn all() -> [PlanId; 2] {
        [PlanId::TenDays, PlanId::ThirtyDays]
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PlanId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "10days" => Ok(PlanId::TenDays),
            "30days" => Ok(PlanId::ThirtyDays),
            other => Err(ValidationError::unknown_value("plan_id", other)),
        }
    }
}

/// How often a recurring plan is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceFrequency {
    Monthly,
}

impl RecurrenceFrequency {
    /// Value of the gateway's `regularMode` field.
    pub fn as_gateway_mode(&self) -> &'static str {
        match self {
            RecurrenceFrequency::Monthly => "monthly",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    pub frequency: RecurrenceFrequency,
    /// Total number of charges the gateway performs.
    pub occurrences: u32,
}

/// One row of the plan table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDefinition {
    pub id: PlanId,
    pub plan: Plan,
    pub product_name: String,
    /// Price in whole currency units.
    pub price: u32,
    pub duration_days: u32,
    #[serde(default)]
    pub recurrence: Option<Recurrence>,
}

impl PlanDefinition {
    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    version: u32,
    currency: String,
    plans: Vec<PlanDefinition>,
}

/// Immutable, validated plan table.
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    version: u32,
    currency: String,
    plans: Vec<PlanDefinition>,
}

impl PlanCatalog {
    /// Loads the catalog compiled into the binary.
    pub fn bundled() -> Result<Self, ValidationError> {
        Self::from_yaml(BUNDLED_CATALOG)
    }

    /// Parses and validates a catalog document.
    pub fn from_yaml(source: &str) -> Result<Self, ValidationError> {
        let file: CatalogFile = serde_yaml::from_str(source)
            .map_err(|e| ValidationError::invalid_format("plan_catalog", e.to_string()))?;
        Self::new(file.version, file.currency, file.plans)
    }

    pub fn new(
        version: u32,
        currency: impl Into<String>,
        plans: Vec<PlanDefinition>,
    ) -> Result<Self, ValidationError> {
        let currency = currency.into();
        if currency.trim().is_empty() {
            return Err(ValidationError::empty_field("currency"));
        }

        let mut seen = HashSet::new();
        for def in &plans {
            if !seen.insert(def.id) {
                return Err(ValidationError::invalid_format(
                    "plans",
                    format!("duplicate plan id {}", def.id),
                ));
            }
            if !def.plan.is_paid() {
                return Err(ValidationError::invalid_format(
                    "plans",
                    format!("plan {} must grant a paid plan", def.id),
                ));
            }
            if def.price == 0 || def.duration_days == 0 {
                return Err(ValidationError::invalid_format(
                    "plans",
                    format!("plan {} needs a positive price and duration", def.id),
                ));
            }
            if def.product_name.trim().is_empty() {
                return Err(ValidationError::empty_field("product_name"));
            }
            if matches!(&def.recurrence, Some(r) if r.occurrences == 0) {
                return Err(ValidationError::invalid_format(
                    "plans",
                    format!("plan {} recurs zero times", def.id),
                ));
            }
        }

        if let Some(missing) = PlanId::all().into_iter().find(|id| !seen.contains(id)) {
            return Err(ValidationError::invalid_format(
                "plans",
                format!("plan {} is not defined", missing),
            ));
        }

        Ok(Self {
            version,
            currency,
            plans,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn get(&self, id: PlanId) -> Option<&PlanDefinition> {
        self.plans.iter().find(|def| def.id == id)
    }

    /// Resolves a raw wire id, as found in requests and order references.
    pub fn lookup(&self, raw_id: &str) -> Result<&PlanDefinition, ValidationError> {
        let id: PlanId = raw_id.parse()?;
        self.get(id)
            .ok_or_else(|| ValidationError::unknown_value("plan_id", raw_id))
    }

    pub fn plans(&self) -> &[PlanDefinition] {
        &self.plans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ════════════════════════════════════════════════════════════════════════════
    // Plan
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn plan_round_trips_through_stored_name() {
        for plan in [Plan::Free, Plan::TierShort, Plan::TierLong] {
            assert_eq!(plan.as_str().parse::<Plan>().unwrap(), plan);
        }
    }

    #[test]
    fn plan_serializes_as_stored_name() {
        let json = serde_json::to_string(&Plan::TierLong).unwrap();
        assert_eq!(json, "\"plan_30_days\"");
    }

    #[test]
    fn free_plan_is_limited() {
        assert_eq!(Plan::Free.listing_limit(), Some(FREE_LISTING_LIMIT));
        assert!(!Plan::Free.can_save_listings());
        assert!(!Plan::Free.has_bot_access());
    }

    #[test]
    fn paid_plans_are_unlimited() {
        for plan in [Plan::TierShort, Plan::TierLong] {
            assert_eq!(plan.listing_limit(), None);
            assert!(plan.can_save_listings());
            assert!(plan.has_bot_access());
        }
    }

    #[test]
    fn unknown_plan_id_is_rejected() {
        assert!("7days".parse::<PlanId>().is_err());
        assert!("".parse::<PlanId>().is_err());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Catalog
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn bundled_catalog_matches_published_prices() {
        let catalog = PlanCatalog::bundled().unwrap();
        assert_eq!(catalog.currency(), "UAH");

        let short = catalog.get(PlanId::TenDays).unwrap();
        assert_eq!(short.plan, Plan::TierShort);
        assert_eq!(short.price, 199);
        assert_eq!(short.duration_days, 10);
        assert_eq!(short.product_name, "GoToHome Smart - 10 днів");
        assert!(!short.is_recurring());

        let long = catalog.get(PlanId::ThirtyDays).unwrap();
        assert_eq!(long.plan, Plan::TierLong);
        assert_eq!(long.price, 299);
        assert_eq!(long.duration_days, 30);
        assert_eq!(long.product_name, "GoToHome Pro - 30 днів");
        let recurrence = long.recurrence.as_ref().unwrap();
        assert_eq!(recurrence.frequency, RecurrenceFrequency::Monthly);
        assert_eq!(recurrence.occurrences, 12);
    }

    #[test]
    fn lookup_resolves_wire_ids() {
        let catalog = PlanCatalog::bundled().unwrap();
        assert_eq!(catalog.lookup("30days").unwrap().plan, Plan::TierLong);
        assert!(catalog.lookup("90days").is_err());
    }

    #[test]
    fn catalog_rejects_missing_plan() {
        let yaml = r#"
version: 1
currency: UAH
plans:
  - id: 10days
    plan: plan_10_days
    product_name: "Short"
    price: 199
    duration_days: 10
"#;
        assert!(PlanCatalog::from_yaml(yaml).is_err());
    }

    #[test]
    fn catalog_rejects_free_grant() {
        let yaml = r#"
version: 1
currency: UAH
plans:
  - id: 10days
    plan: free
    product_name: "Short"
    price: 199
    duration_days: 10
  - id: 30days
    plan: plan_30_days
    product_name: "Long"
    price: 299
    duration_days: 30
"#;
        assert!(PlanCatalog::from_yaml(yaml).is_err());
    }

    #[test]
    fn catalog_rejects_duplicate_ids() {
        let def = PlanDefinition {
            id: PlanId::TenDays,
            plan: Plan::TierShort,
            product_name: "Short".to_string(),
            price: 199,
            duration_days: 10,
            recurrence: None,
        };
        let result = PlanCatalog::new(1, "UAH", vec![def.clone(), def]);
        assert!(result.is_err());
    }
}
