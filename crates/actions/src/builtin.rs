//! Built-in stub handlers.
//!
//! These stand in for the real integrations (mail provider, CRM, billing)
//! and only describe what they would have done. Embedders replace them by
//! registering their own handlers for the same [`ActionKind`].

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use crate::{ActionContext, ActionError, ActionHandler, ActionKind, ActionRegistry};

/// Install every built-in handler into `registry`.
pub fn register_all(registry: &mut ActionRegistry) {
    registry.register(ActionKind::SendWelcomeEmail, Arc::new(EmailAction::new("welcome")));
    registry.register(ActionKind::SendFollowUpEmail, Arc::new(EmailAction::new("follow_up")));
    registry.register(ActionKind::AddToCrm, Arc::new(CrmAction));
    registry.register(
        ActionKind::AssignToSales,
        Arc::new(StaticAction::new("Lead assigned to sales team")),
    );
    registry.register(
        ActionKind::SendNurtureContent,
        Arc::new(StaticAction::new("Nurture content sent")),
    );
    registry.register(ActionKind::GenerateInvoice, Arc::new(InvoiceAction));
    registry.register(
        ActionKind::SendPaymentReminder,
        Arc::new(StaticAction::new("Payment reminder sent")),
    );
    registry.register(ActionKind::AnalyzeCustomerHealth, Arc::new(CustomerHealthAction));
    registry.register(ActionKind::CreateSocialPosts, Arc::new(SocialPostsAction));
}

fn str_field<'a>(payload: &'a Value, key: &str) -> Option<&'a str> {
    payload.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Sends a templated email to `payload.email`.
pub struct EmailAction {
    template: &'static str,
}

impl EmailAction {
    pub fn new(template: &'static str) -> Self {
        Self { template }
    }
}

#[async_trait]
impl ActionHandler for EmailAction {
    async fn execute(&self, payload: &Value, ctx: &ActionContext) -> Result<Value, ActionError> {
        let recipient = str_field(payload, "email").unwrap_or("recipient");
        debug!(execution_id = %ctx.execution_id, template = self.template, recipient, "sending email");
        Ok(json!({
            "message": format!("Email {} sent to {}", self.template, recipient),
            "template": self.template,
            "recipient": recipient,
        }))
    }
}

/// Upserts the contact described by the payload.
pub struct CrmAction;

#[async_trait]
impl ActionHandler for CrmAction {
    async fn execute(&self, payload: &Value, _ctx: &ActionContext) -> Result<Value, ActionError> {
        let contact = str_field(payload, "name")
            .or_else(|| str_field(payload, "email"))
            .ok_or_else(|| ActionError::Fatal("payload has neither 'name' nor 'email'".into()))?;
        Ok(json!({ "message": format!("Contact added to CRM: {contact}") }))
    }
}

/// Issues an invoice numbered after the current timestamp.
pub struct InvoiceAction;

#[async_trait]
impl ActionHandler for InvoiceAction {
    async fn execute(&self, _payload: &Value, _ctx: &ActionContext) -> Result<Value, ActionError> {
        let number = format!("INV-{}", Utc::now().timestamp_millis());
        Ok(json!({
            "message": format!("Invoice generated: {number}"),
            "invoice_number": number,
        }))
    }
}

/// Reports the health score carried by the payload, if any.
pub struct CustomerHealthAction;

#[async_trait]
impl ActionHandler for CustomerHealthAction {
    async fn execute(&self, payload: &Value, _ctx: &ActionContext) -> Result<Value, ActionError> {
        let score = payload.get("health_score").and_then(Value::as_f64);
        let message = match score {
            Some(score) => format!("Customer health analyzed: {score}/100"),
            None => "Customer health analyzed: no score available".to_owned(),
        };
        Ok(json!({ "message": message, "health_score": score }))
    }
}

/// Drafts posts for `payload.platform` (or every platform).
pub struct SocialPostsAction;

#[async_trait]
impl ActionHandler for SocialPostsAction {
    async fn execute(&self, payload: &Value, _ctx: &ActionContext) -> Result<Value, ActionError> {
        let platform = str_field(payload, "platform").unwrap_or("all platforms");
        Ok(json!({ "message": format!("Social posts created for {platform}") }))
    }
}

/// Succeeds with a fixed message.
pub struct StaticAction {
    message: &'static str,
}

impl StaticAction {
    pub fn new(message: &'static str) -> Self {
        Self { message }
    }
}

#[async_trait]
impl ActionHandler for StaticAction {
    async fn execute(&self, _payload: &Value, _ctx: &ActionContext) -> Result<Value, ActionError> {
        Ok(json!({ "message": self.message }))
    }
}
