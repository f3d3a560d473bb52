//! Lead model, payload sanitization, and per-variant validation.
//!
//! Incoming submissions arrive as loose JSON. Everything here converts that
//! JSON into a strict [`Lead`] value (or a specific rejection message) before
//! any delivery channel sees it, so the rest of the crate never handles a
//! half-valid lead.

use serde::Serialize;
use serde_json::{Map, Value};

/// Upper bound on the raw request body, in bytes.
pub const MAX_BODY_BYTES: usize = 200_000;

/// A validated lead, discriminated by submission type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Lead {
    /// A plain contact-form message.
    Contact {
        name: String,
        business_name: String,
        email: String,
        message: String,
    },
    /// A request to purchase/deploy a system.
    SystemRequest {
        full_name: String,
        business_name: String,
        business_email: String,
        phone: String,
        industry: String,
        mode: String,
        devices_count: u32,
        branches_count: u32,
        modules: Vec<String>,
        timeline: String,
        budget_range: Option<String>,
    },
    /// An early-access waitlist signup.
    Waitlist {
        email: String,
        product_interest: String,
        full_name: Option<String>,
        phone: Option<String>,
        business_name: Option<String>,
        notes: Option<String>,
    },
}

impl Lead {
    /// The wire-level type tag for this variant.
    pub fn type_name(&self) -> &'static str {
        match self {
            Lead::Contact { .. } => "contact",
            Lead::SystemRequest { .. } => "system_request",
            Lead::Waitlist { .. } => "waitlist",
        }
    }
}

/// Ambient metadata attached to every submission.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionContext {
    pub page_url: String,
    pub referrer: Option<String>,
    pub user_agent: String,
    pub attribution: Option<Map<String, Value>>,
    pub ip: String,
}

/// Trim and cap a string field; non-string values collapse to empty.
pub(crate) fn clean_value(value: Option<&Value>, max_len: usize) -> String {
    match value.and_then(Value::as_str) {
        Some(text) => clean_text(text, max_len),
        None => String::new(),
    }
}

pub(crate) fn clean_text(value: &str, max_len: usize) -> String {
    value.trim().chars().take(max_len).collect()
}

/// Cap a string field, mapping empty to `None`.
fn clean_optional(value: Option<&Value>, max_len: usize) -> Option<String> {
    let cleaned = clean_value(value, max_len);
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Sanitize a string list: per-item trim/cap, drop empties, cap item count.
pub(crate) fn clean_list(value: Option<&Value>, max_items: usize, item_max_len: usize) -> Vec<String> {
    match value.and_then(Value::as_array) {
        Some(items) => items
            .iter()
            .filter_map(|item| item.as_str())
            .map(|item| clean_text(item, item_max_len))
            .filter(|item| !item.is_empty())
            .take(max_items)
            .collect(),
        None => Vec::new(),
    }
}

/// Leniently parse a count field: JSON numbers or numeric strings.
/// Fractional input truncates toward zero on both paths, so `3.7` and
/// `"3.7"` read the same.
pub(crate) fn parse_count(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed.parse::<i64>().ok().or_else(|| {
                trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        _ => None,
    }
}

/// Basic `local@domain.tld` shape check, mirroring the frontend's pattern.
pub(crate) fn is_valid_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((head, tail)) => !head.is_empty() && !tail.is_empty(),
        None => false,
    }
}

/// Validate a raw JSON payload into a [`Lead`].
///
/// Errors are user-facing messages naming the failing rule; they become the
/// `error` field of a 400 response verbatim.
pub fn validate_lead(payload: &Value) -> Result<Lead, String> {
    let lead_type = clean_value(payload.get("type"), 40);
    match lead_type.as_str() {
        "contact" => validate_contact(payload),
        "system_request" => validate_system_request(payload),
        "waitlist" => validate_waitlist(payload),
        _ => Err("Invalid lead type.".to_string()),
    }
}

fn validate_contact(payload: &Value) -> Result<Lead, String> {
    let name = clean_value(payload.get("name"), 120);
    let business_name = clean_value(payload.get("businessName"), 160);
    let email = clean_value(payload.get("email"), 160).to_lowercase();
    let message = clean_value(payload.get("message"), 2500);

    if name.is_empty() || business_name.is_empty() || email.is_empty() || message.is_empty() {
        return Err("Missing required contact fields.".to_string());
    }
    if !is_valid_email(&email) {
        return Err("Invalid contact email format.".to_string());
    }

    Ok(Lead::Contact {
        name,
        business_name,
        email,
        message,
    })
}

fn validate_system_request(payload: &Value) -> Result<Lead, String> {
    let full_name = clean_value(payload.get("fullName"), 120);
    let business_name = clean_value(payload.get("businessName"), 160);
    let business_email = clean_value(payload.get("businessEmail"), 160).to_lowercase();
    let phone = clean_value(payload.get("phone"), 60);
    let industry = clean_value(payload.get("industry"), 120);
    let mode = clean_value(payload.get("mode"), 120);
    let timeline = clean_value(payload.get("timeline"), 120);
    let budget_range = clean_optional(payload.get("budgetRange"), 200);
    let modules = clean_list(payload.get("modules"), 20, 100);

    if full_name.is_empty()
        || business_name.is_empty()
        || business_email.is_empty()
        || phone.is_empty()
        || industry.is_empty()
        || mode.is_empty()
        || timeline.is_empty()
        || modules.is_empty()
    {
        return Err("Missing required system request fields.".to_string());
    }
    if !is_valid_email(&business_email) {
        return Err("Invalid business email format.".to_string());
    }

    // `try_from` keeps out-of-range values (negative or past u32::MAX) from
    // silently wrapping into a plausible-looking count.
    let devices_count = parse_count(payload.get("devicesCount"))
        .filter(|count| *count >= 1)
        .and_then(|count| u32::try_from(count).ok())
        .ok_or_else(|| "Devices/computers count must be a number >= 1.".to_string())?;
    let branches_count = parse_count(payload.get("branchesCount"))
        .filter(|count| *count >= 1)
        .and_then(|count| u32::try_from(count).ok())
        .ok_or_else(|| "Branches count must be a number >= 1.".to_string())?;

    Ok(Lead::SystemRequest {
        full_name,
        business_name,
        business_email,
        phone,
        industry,
        mode,
        devices_count,
        branches_count,
        modules,
        timeline,
        budget_range,
    })
}

fn validate_waitlist(payload: &Value) -> Result<Lead, String> {
    let email = clean_value(payload.get("email"), 160).to_lowercase();
    let product_interest = clean_value(payload.get("productInterest"), 120);

    if email.is_empty() || product_interest.is_empty() {
        return Err("Missing required waitlist fields.".to_string());
    }
    if !is_valid_email(&email) {
        return Err("Invalid waitlist email format.".to_string());
    }

    Ok(Lead::Waitlist {
        email,
        product_interest,
        full_name: clean_optional(payload.get("fullName"), 120),
        phone: clean_optional(payload.get("phone"), 60),
        business_name: clean_optional(payload.get("businessName"), 160),
        notes: clean_optional(payload.get("notes"), 2000),
    })
}

/// Build the [`SubmissionContext`] from the raw payload plus request metadata.
pub fn build_context(payload: &Value, user_agent: String, ip: String) -> SubmissionContext {
    SubmissionContext {
        page_url: clean_value(payload.get("pageUrl"), 400),
        referrer: {
            let referrer = clean_value(payload.get("referrer"), 400);
            (!referrer.is_empty()).then_some(referrer)
        },
        user_agent,
        attribution: payload.get("attribution").and_then(Value::as_object).cloned(),
        ip,
    }
}
