//! Deal input normalization and a first-pass rental analysis.
//!
//! The front-end submits camelCase fields (`purchasePrice`, `downPaymentPct`,
//! ...) while server-to-server callers use snake_case. Both shapes normalize
//! to [`DealInput`]; the camelCase spelling is taken first when a payload
//! carries both.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use uuid::Uuid;

use dealflow_core::{DomainResult, Validator, time::iso_timestamp, validation::as_object};

use crate::resource::Row;

/// (camelCase, snake_case) field pairs.
const FIELD_MAP: [(&str, &str); 8] = [
    ("address", "address"),
    ("purchasePrice", "purchase_price"),
    ("downPaymentPct", "down_payment"),
    ("interestRatePct", "interest_rate"),
    ("amortYears", "term_years"),
    ("grossRentsMonthly", "rent_monthly"),
    ("vacancyPct", "vacancy_pct"),
    ("opExMonthly", "op_ex_monthly"),
];

/// Validated, snake_case deal input.
///
/// `down_payment`, `interest_rate` and `vacancy_pct` are fractions in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub purchase_price: f64,
    pub down_payment: f64,
    pub interest_rate: f64,
    pub term_years: u32,
    pub rent_monthly: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vacancy_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub op_ex_monthly: Option<f64>,
}

/// Accept camelCase or snake_case input and validate it as snake_case.
pub fn normalize_deal_input(payload: &Value) -> DomainResult<DealInput> {
    let fields = as_object(payload)?;

    let mut snake = Row::new();
    for (camel, snake_name) in FIELD_MAP {
        let value = fields
            .get(camel)
            .filter(|v| !v.is_null())
            .or_else(|| fields.get(snake_name));
        if let Some(value) = value {
            snake.insert(snake_name.to_string(), value.clone());
        }
    }

    validate(&snake)
}

fn as_f64(n: &Number) -> f64 {
    n.as_f64().unwrap_or_default()
}

fn fraction(v: &mut Validator<'_>, n: Option<&Number>, message: &str) {
    if let Some(n) = n {
        if !(0.0..=1.0).contains(&as_f64(n)) {
            v.reject(message);
        }
    }
}

fn validate(fields: &Row) -> DomainResult<DealInput> {
    let mut v = Validator::new(fields);

    let address = v.optional_string("address");
    let purchase_price = v.required_number(
        "purchase_price",
        "purchase_price must be a number",
        Some((0.0, "purchase_price must be non-negative")),
    );

    let has_down = v.has("down_payment");
    let down_payment = v.required_number("down_payment", "down_payment must be a number", None);
    let fraction_msg = "down_payment must be a fraction between 0 and 1";
    fraction(&mut v, has_down.then_some(&down_payment), fraction_msg);

    let has_rate = v.has("interest_rate");
    let interest_rate = v.required_number("interest_rate", "interest_rate must be a number", None);
    let fraction_msg = "interest_rate must be a fraction between 0 and 1";
    fraction(&mut v, has_rate.then_some(&interest_rate), fraction_msg);

    let term_years = v.required_number("term_years", "term_years must be a number", None);
    let term = term_years.as_u64().filter(|t| *t >= 1).and_then(|t| u32::try_from(t).ok());
    if term_years.is_f64() || (term.is_none() && v.has("term_years")) {
        v.reject("term_years must be a whole number of at least 1");
    }

    let rent_monthly = v.required_number(
        "rent_monthly",
        "rent_monthly must be a number",
        Some((0.0, "rent_monthly must be non-negative")),
    );
    let vacancy_pct = v.optional_number("vacancy_pct", "vacancy_pct must be a number", None);
    fraction(&mut v, vacancy_pct.as_ref(), "vacancy_pct must be a fraction between 0 and 1");
    let op_ex_monthly = v.optional_number(
        "op_ex_monthly",
        "op_ex_monthly must be a number",
        Some((0.0, "op_ex_monthly must be non-negative")),
    );

    v.finish()?;

    Ok(DealInput {
        address,
        purchase_price: as_f64(&purchase_price),
        down_payment: as_f64(&down_payment),
        interest_rate: as_f64(&interest_rate),
        term_years: term.unwrap_or(1),
        rent_monthly: as_f64(&rent_monthly),
        vacancy_pct: vacancy_pct.as_ref().map(as_f64),
        op_ex_monthly: op_ex_monthly.as_ref().map(as_f64),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskCategory {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealMetrics {
    pub loan_amount: f64,
    pub monthly_payment: f64,
    pub noi_annual: f64,
    pub cash_flow_annual: f64,
    pub cap_rate: f64,
    pub cash_on_cash: f64,
    /// Debt service coverage; `None` for an all-cash purchase.
    pub dscr: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealRisk {
    pub score: f64,
    pub category: RiskCategory,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mitigations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealAnalysis {
    pub id: Uuid,
    pub input: DealInput,
    pub metrics: DealMetrics,
    pub risk: DealRisk,
    pub created_at: String,
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 { 0.0 } else { num / den }
}

/// Standard amortized monthly payment.
fn monthly_payment(principal: f64, annual_rate: f64, years: u32) -> f64 {
    let n = f64::from(years) * 12.0;
    let r = annual_rate / 12.0;
    if r == 0.0 {
        principal / n
    } else {
        principal * r / (1.0 - (1.0 + r).powf(-n))
    }
}

/// Compute cash-flow metrics and a coverage-based risk rating.
pub fn analyze(input: DealInput, at: DateTime<Utc>) -> DealAnalysis {
    let loan_amount = input.purchase_price * (1.0 - input.down_payment);
    let payment = monthly_payment(loan_amount, input.interest_rate, input.term_years);
    let debt_service = payment * 12.0;

    let gross = input.rent_monthly * 12.0;
    let effective = gross * (1.0 - input.vacancy_pct.unwrap_or(0.0));
    let noi = effective - input.op_ex_monthly.unwrap_or(0.0) * 12.0;
    let cash_flow = noi - debt_service;
    let cash_invested = input.purchase_price * input.down_payment;

    let dscr = (debt_service > 0.0).then(|| noi / debt_service);
    let (category, score) = match dscr {
        None => (RiskCategory::Low, 0.0),
        Some(d) => {
            let score = (1.5 - d).clamp(0.0, 1.0);
            let category = if d >= 1.25 {
                RiskCategory::Low
            } else if d >= 1.0 {
                RiskCategory::Medium
            } else {
                RiskCategory::High
            };
            (category, score)
        }
    };

    let mut mitigations = Vec::new();
    if category != RiskCategory::Low {
        mitigations.push("Increase down payment".to_string());
        mitigations.push("Negotiate a lower purchase price".to_string());
    }
    if input.vacancy_pct.unwrap_or(0.0) > 0.1 {
        mitigations.push("Reduce vacancy assumptions with pre-leasing".to_string());
    }

    DealAnalysis {
        id: Uuid::now_v7(),
        metrics: DealMetrics {
            loan_amount: round2(loan_amount),
            monthly_payment: round2(payment),
            noi_annual: round2(noi),
            cash_flow_annual: round2(cash_flow),
            cap_rate: round4(ratio(noi, input.purchase_price)),
            cash_on_cash: round4(ratio(cash_flow, cash_invested)),
            dscr: dscr.map(round4),
        },
        risk: DealRisk {
            score: round4(score),
            category,
            mitigations,
        },
        input,
        created_at: iso_timestamp(at),
    }
}
