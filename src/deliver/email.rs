//! Email delivery via a Resend-style HTTPS API.
//!
//! Composition is deliberately plain string assembly: the notification is an
//! operator-facing text block, not a templated customer email.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{truncate_chars, ChannelResult, DeliveryChannel};
use crate::config::IntakeConfig;
use crate::lead::{Lead, SubmissionContext};

/// Email delivery channel. Skipped when the API key or sender is unset.
pub struct EmailChannel {
    client: reqwest::Client,
    api_key: Option<String>,
    from: Option<String>,
    to: String,
    api_base: String,
}

impl EmailChannel {
    pub fn from_config(config: &IntakeConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            api_key: config.resend_api_key.clone(),
            from: config.resend_from_email.clone(),
            to: config.lead_receiver_email.clone(),
            api_base: config.resend_api_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl DeliveryChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn deliver(&self, lead: &Lead, ctx: &SubmissionContext) -> ChannelResult {
        let (Some(api_key), Some(from)) = (self.api_key.as_deref(), self.from.as_deref()) else {
            return ChannelResult::skipped("Missing Resend configuration.");
        };

        let body = json!({
            "from": from,
            "to": [self.to],
            "subject": build_subject(lead),
            "text": build_email_text(lead, ctx),
        });

        let response = self
            .client
            .post(format!("{}/emails", self.api_base))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(err) => return ChannelResult::failed(format!("Resend request failed: {err}")),
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return ChannelResult::failed(format!(
                "Resend error ({status}): {}",
                truncate_chars(&text, 300)
            ));
        }

        ChannelResult::success()
    }
}

/// Subject line varies by lead type.
pub(crate) fn build_subject(lead: &Lead) -> String {
    match lead {
        Lead::Contact { business_name, .. } => format!("New Contact Lead - {business_name}"),
        Lead::SystemRequest { business_name, .. } => {
            format!("New System Request - {business_name}")
        }
        Lead::Waitlist {
            product_interest, ..
        } => format!("New Waitlist Signup - {product_interest}"),
    }
}

fn or_not_provided(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("Not provided")
}

/// Human-readable notification body.
pub(crate) fn build_email_text(lead: &Lead, ctx: &SubmissionContext) -> String {
    let mut lines = vec![
        format!("Lead Type: {}", lead.type_name()),
        format!("Received At: {}", chrono::Utc::now().to_rfc3339()),
        format!("IP: {}", ctx.ip),
        String::new(),
    ];

    match lead {
        Lead::Contact {
            name,
            business_name,
            email,
            message,
        } => {
            lines.extend([
                "Contact".to_string(),
                format!("Name: {name}"),
                format!("Business Name: {business_name}"),
                format!("Email: {email}"),
                String::new(),
                "Message:".to_string(),
                message.clone(),
            ]);
        }
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
        } => {
            lines.extend([
                "System Request".to_string(),
                format!("Full Name: {full_name}"),
                format!("Business Name: {business_name}"),
                format!("Business Email: {business_email}"),
                format!("Phone: {phone}"),
                format!("Industry: {industry}"),
                format!("Mode: {mode}"),
                format!("Devices/Computers Count: {devices_count}"),
                format!("Branches Count: {branches_count}"),
                format!("Modules: {}", modules.join(", ")),
                format!("Timeline: {timeline}"),
                format!("Budget Range: {}", or_not_provided(budget_range)),
            ]);
        }
        Lead::Waitlist {
            email,
            product_interest,
            full_name,
            phone,
            business_name,
            notes,
        } => {
            lines.extend([
                "Waitlist".to_string(),
                format!("Email: {email}"),
                format!("Product Interest: {product_interest}"),
                format!("Full Name: {}", or_not_provided(full_name)),
                format!("Phone: {}", or_not_provided(phone)),
                format!("Business Name: {}", or_not_provided(business_name)),
                format!("Notes: {}", or_not_provided(notes)),
            ]);
        }
    }

    let attribution = ctx
        .attribution
        .as_ref()
        .map(|map| Value::Object(map.clone()))
        .unwrap_or_else(|| json!({}));

    lines.extend([
        String::new(),
        "Context".to_string(),
        format!(
            "Page URL: {}",
            if ctx.page_url.is_empty() {
                "unknown"
            } else {
                &ctx.page_url
            }
        ),
        format!("Referrer: {}", ctx.referrer.as_deref().unwrap_or("none")),
        format!(
            "User Agent: {}",
            if ctx.user_agent.is_empty() {
                "unknown"
            } else {
                &ctx.user_agent
            }
        ),
        String::new(),
        "Attribution".to_string(),
        serde_json::to_string_pretty(&attribution).unwrap_or_else(|_| "{}".to_string()),
    ]);

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn ctx() -> SubmissionContext {
        let mut attribution = Map::new();
        attribution.insert("utm_source".to_string(), json!("newsletter"));
        SubmissionContext {
            page_url: "https://example.com/request".into(),
            referrer: Some("https://google.com".into()),
            user_agent: "Mozilla/5.0".into(),
            attribution: Some(attribution),
            ip: "203.0.113.9".into(),
        }
    }

    #[test]
    fn subject_varies_by_lead_type() {
        let contact = Lead::Contact {
            name: "Jane".into(),
            business_name: "Acme".into(),
            email: "jane@acme.com".into(),
            message: "Hi".into(),
        };
        assert_eq!(build_subject(&contact), "New Contact Lead - Acme");

        let waitlist = Lead::Waitlist {
            email: "a@b.co".into(),
            product_interest: "pos".into(),
            full_name: None,
            phone: None,
            business_name: None,
            notes: None,
        };
        assert_eq!(build_subject(&waitlist), "New Waitlist Signup - pos");
    }

    #[test]
    fn body_names_type_specific_fields_and_context() {
        let lead = Lead::SystemRequest {
            full_name: "Jane Doe".into(),
            business_name: "Acme".into(),
            business_email: "jane@acme.com".into(),
            phone: "+1234".into(),
            industry: "Retail".into(),
            mode: "offline".into(),
            devices_count: 3,
            branches_count: 2,
            modules: vec!["inventory".into(), "billing".into()],
            timeline: "1-3 months".into(),
            budget_range: None,
        };

        let text = build_email_text(&lead, &ctx());
        assert!(text.contains("Lead Type: system_request"));
        assert!(text.contains("Devices/Computers Count: 3"));
        assert!(text.contains("Modules: inventory, billing"));
        assert!(text.contains("Budget Range: Not provided"));
        assert!(text.contains("IP: 203.0.113.9"));
        assert!(text.contains("Page URL: https://example.com/request"));
        assert!(text.contains("utm_source"));
    }

    #[test]
    fn missing_context_fields_fall_back_to_placeholders() {
        let lead = Lead::Contact {
            name: "Jane".into(),
            business_name: "Acme".into(),
            email: "jane@acme.com".into(),
            message: "Hello".into(),
        };
        let ctx = SubmissionContext {
            page_url: String::new(),
            referrer: None,
            user_agent: String::new(),
            attribution: None,
            ip: "unknown".into(),
        };

        let text = build_email_text(&lead, &ctx);
        assert!(text.contains("Page URL: unknown"));
        assert!(text.contains("Referrer: none"));
        assert!(text.contains("User Agent: unknown"));
    }
}
