//! Row storage via a Supabase-style REST interface.
//!
//! One quirk lives here: older deployments run a leads table that predates
//! some optional columns. When the store rejects an insert naming a missing
//! column, the row is retried once with that column removed. The detection
//! parses the column name out of the error text because the REST interface
//! exposes no structured error code for it.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::{truncate_chars, ChannelResult, DeliveryChannel};
use crate::config::IntakeConfig;
use crate::lead::{Lead, SubmissionContext};

/// Storage delivery channel. Skipped when the URL or service key is unset.
pub struct StorageChannel {
    client: reqwest::Client,
    base_url: Option<String>,
    service_key: Option<String>,
    table: String,
}

impl StorageChannel {
    pub fn new(
        client: reqwest::Client,
        base_url: Option<String>,
        service_key: Option<String>,
        table: String,
    ) -> Self {
        Self {
            client,
            base_url: base_url.map(|url| url.trim_end_matches('/').to_string()),
            service_key,
            table,
        }
    }

    pub fn from_config(config: &IntakeConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: config
                .supabase_url
                .as_ref()
                .map(|url| url.trim_end_matches('/').to_string()),
            service_key: config.supabase_service_role_key.clone(),
            table: config.supabase_leads_table.clone(),
        }
    }

    async fn insert(&self, endpoint: &str, key: &str, row: &Map<String, Value>) -> InsertOutcome {
        let response = self
            .client
            .post(endpoint)
            .header("apikey", key)
            .bearer_auth(key)
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(err) => return InsertOutcome::Failed(format!("Supabase request failed: {err}")),
        };

        if response.status().is_success() {
            return InsertOutcome::Inserted;
        }

        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();
        InsertOutcome::Rejected { status, text }
    }
}

enum InsertOutcome {
    Inserted,
    Rejected { status: u16, text: String },
    Failed(String),
}

#[async_trait]
impl DeliveryChannel for StorageChannel {
    fn name(&self) -> &'static str {
        "storage"
    }

    async fn deliver(&self, lead: &Lead, ctx: &SubmissionContext) -> ChannelResult {
        let (Some(base_url), Some(key)) = (self.base_url.as_deref(), self.service_key.as_deref())
        else {
            return ChannelResult::skipped("Missing Supabase configuration.");
        };

        let endpoint = format!("{base_url}/rest/v1/{}", self.table);
        let mut row = build_row(lead, ctx);

        match self.insert(&endpoint, key, &row).await {
            InsertOutcome::Inserted => ChannelResult::success(),
            InsertOutcome::Failed(reason) => ChannelResult::failed(reason),
            InsertOutcome::Rejected { status, text } => {
                // Schema-compatibility shim: drop the one column the store
                // does not know and retry once, synchronously.
                if let Some(column) = missing_column(&text) {
                    if row.remove(&column).is_some() {
                        tracing::warn!(
                            column,
                            "Leads table rejected an unknown column, retrying without it"
                        );
                        match self.insert(&endpoint, key, &row).await {
                            InsertOutcome::Inserted => return ChannelResult::success(),
                            InsertOutcome::Failed(reason) => return ChannelResult::failed(reason),
                            InsertOutcome::Rejected { status, text } => {
                                return ChannelResult::failed(format!(
                                    "Supabase error ({status}): {}",
                                    truncate_chars(&text, 300)
                                ));
                            }
                        }
                    }
                }
                ChannelResult::failed(format!(
                    "Supabase error ({status}): {}",
                    truncate_chars(&text, 300)
                ))
            }
        }
    }
}

/// Extract the column name from a schema-mismatch error body.
///
/// PostgREST reports unknown columns as text like
/// `Could not find the 'extra' column of 'lead_requests' in the schema cache`;
/// the first quoted identifier is the offending column. Only errors that
/// mention a column at all qualify.
pub(crate) fn missing_column(error_text: &str) -> Option<String> {
    if !error_text.to_ascii_lowercase().contains("column") {
        return None;
    }
    let start = error_text.find('\'')?;
    let rest = &error_text[start + 1..];
    let end = rest.find('\'')?;
    let column = &rest[..end];
    (!column.is_empty()).then(|| column.to_string())
}

/// Map a lead and its context onto the leads-table row.
///
/// Columns that do not apply to the variant are explicit nulls so every row
/// has the same shape.
pub(crate) fn build_row(lead: &Lead, ctx: &SubmissionContext) -> Map<String, Value> {
    let mut row = Map::new();
    row.insert("lead_type".into(), json!(lead.type_name()));

    let null = Value::Null;
    let (
        full_name,
        business_name,
        business_email,
        phone,
        message,
        industry,
        mode,
        devices_count,
        branches_count,
        modules,
        timeline,
        budget_range,
        product_interest,
        notes,
    ) = match lead {
        Lead::Contact {
            name,
            business_name,
            email,
            message,
        } => (
            json!(name),
            json!(business_name),
            json!(email),
            null.clone(),
            json!(message),
            null.clone(),
            null.clone(),
            null.clone(),
            null.clone(),
            null.clone(),
            null.clone(),
            null.clone(),
            null.clone(),
            null.clone(),
        ),
        Lead::SystemRequest {
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
        } => (
            json!(full_name),
            json!(business_name),
            json!(business_email),
            json!(phone),
            null.clone(),
            json!(industry),
            json!(mode),
            json!(devices_count),
            json!(branches_count),
            json!(modules),
            json!(timeline),
            json!(budget_range),
            null.clone(),
            null.clone(),
        ),
        Lead::Waitlist {
            email,
            product_interest,
            full_name,
            phone,
            business_name,
            notes,
        } => (
            json!(full_name),
            json!(business_name),
            json!(email),
            json!(phone),
            null.clone(),
            null.clone(),
            null.clone(),
            null.clone(),
            null.clone(),
            null.clone(),
            null.clone(),
            null.clone(),
            json!(product_interest),
            json!(notes),
        ),
    };

    row.insert("full_name".into(), full_name);
    row.insert("business_name".into(), business_name);
    row.insert("business_email".into(), business_email);
    row.insert("phone".into(), phone);
    row.insert("message".into(), message);
    row.insert("industry".into(), industry);
    row.insert("mode".into(), mode);
    row.insert("devices_count".into(), devices_count);
    row.insert("branches_count".into(), branches_count);
    row.insert("modules".into(), modules);
    row.insert("timeline".into(), timeline);
    row.insert("budget_range".into(), budget_range);
    row.insert("product_interest".into(), product_interest);
    row.insert("notes".into(), notes);

    row.insert("page_url".into(), json!(ctx.page_url));
    row.insert("referrer".into(), json!(ctx.referrer));
    row.insert(
        "attribution".into(),
        ctx.attribution
            .as_ref()
            .map(|map| Value::Object(map.clone()))
            .unwrap_or(Value::Null),
    );
    row.insert("ip_address".into(), json!(ctx.ip));
    row.insert("user_agent".into(), json!(ctx.user_agent));

    row
}
