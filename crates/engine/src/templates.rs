//! Built-in workflow templates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{StepSpec, WorkflowOverrides, WorkflowSpec};

const HOUR: u64 = 60;
const DAY: u64 = 24 * HOUR;

/// A reusable workflow blueprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    pub name: String,
    pub description: String,
    pub triggers: Vec<String>,
    pub steps: Vec<StepSpec>,
}

impl WorkflowTemplate {
    /// Merge `overrides` over this template's defaults.
    pub fn instantiate(&self, overrides: WorkflowOverrides) -> WorkflowSpec {
        WorkflowSpec {
            name: overrides.name.unwrap_or_else(|| self.name.clone()),
            description: overrides
                .description
                .unwrap_or_else(|| self.description.clone()),
            triggers: overrides.triggers.unwrap_or_else(|| self.triggers.clone()),
            steps: Some(overrides.steps.unwrap_or_else(|| self.steps.clone())),
        }
    }
}

/// Named templates, keyed by e.g. `lead_nurturing`.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: BTreeMap<String, WorkflowTemplate>,
}

impl TemplateCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The five stock business templates.
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();

        catalog.insert(
            "lead_nurturing",
            template(
                "Lead Nurturing Sequence",
                "Automatically nurture new leads into customers",
                &["new_lead_created", "lead_score_updated"],
                vec![
                    StepSpec::new("send_welcome_email"),
                    StepSpec::new("add_to_crm"),
                    StepSpec::new("send_follow_up_email").with_delay(3 * DAY),
                    StepSpec::new("assign_to_sales")
                        .with_delay(7 * DAY)
                        .with_condition("lead_score > 70"),
                    StepSpec::new("send_nurture_content")
                        .with_delay(14 * DAY)
                        .with_condition("lead_score < 70"),
                ],
            ),
        );

        catalog.insert(
            "customer_onboarding",
            template(
                "Customer Onboarding",
                "Guide new customers through the product",
                &["new_customer_signup", "payment_completed"],
                vec![
                    StepSpec::new("send_welcome_package"),
                    StepSpec::new("create_onboarding_tasks"),
                    StepSpec::new("schedule_demo_call").with_delay(DAY),
                    StepSpec::new("send_tutorial_series").with_delay(2 * DAY),
                    StepSpec::new("check_product_usage").with_delay(7 * DAY),
                    StepSpec::new("send_feedback_survey").with_delay(30 * DAY),
                ],
            ),
        );

        catalog.insert(
            "invoice_management",
            template(
                "Invoice Management",
                "Automate invoicing and payment follow-up",
                &["order_completed", "subscription_renewed"],
                vec![
                    StepSpec::new("generate_invoice"),
                    StepSpec::new("send_invoice_email"),
                    StepSpec::new("send_payment_reminder")
                        .with_delay(7 * DAY)
                        .with_condition("payment_status = pending"),
                    StepSpec::new("send_overdue_notice")
                        .with_delay(14 * DAY)
                        .with_condition("payment_status = overdue"),
                    StepSpec::new("suspend_service")
                        .with_delay(30 * DAY)
                        .with_condition("payment_status = overdue"),
                ],
            ),
        );

        catalog.insert(
            "customer_retention",
            template(
                "Customer Retention",
                "Win back customers at risk of churning",
                &["low_engagement_detected", "support_ticket_created"],
                vec![
                    StepSpec::new("analyze_customer_health"),
                    StepSpec::new("send_check_in_email").with_condition("health_score < 50"),
                    StepSpec::new("offer_discount")
                        .with_delay(DAY)
                        .with_condition("churn_risk = high"),
                    StepSpec::new("schedule_success_call")
                        .with_delay(2 * DAY)
                        .with_condition("churn_risk = high"),
                    StepSpec::new("send_win_back_campaign")
                        .with_delay(7 * DAY)
                        .with_condition("responded = false"),
                ],
            ),
        );

        catalog.insert(
            "social_media_automation",
            template(
                "Social Media Automation",
                "Publish and follow up on social media posts",
                &["new_blog_post", "product_launch", "scheduled_time"],
                vec![
                    StepSpec::new("create_social_posts"),
                    StepSpec::new("schedule_posts"),
                    StepSpec::new("monitor_engagement").with_delay(HOUR),
                    StepSpec::new("respond_to_comments").with_delay(2 * HOUR),
                    StepSpec::new("analyze_performance").with_delay(DAY),
                ],
            ),
        );

        catalog
    }

    /// Add or replace a template.
    pub fn insert(&mut self, key: impl Into<String>, template: WorkflowTemplate) {
        self.templates.insert(key.into(), template);
    }

    pub fn get(&self, key: &str) -> Option<&WorkflowTemplate> {
        self.templates.get(key)
    }

    /// Template keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &WorkflowTemplate)> {
        self.templates.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

fn template(name: &str, description: &str, triggers: &[&str], steps: Vec<StepSpec>) -> WorkflowTemplate {
    WorkflowTemplate {
        name: name.to_owned(),
        description: description.to_owned(),
        triggers: triggers.iter().map(|t| (*t).to_owned()).collect(),
        steps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Workflow;

    #[test]
    fn every_builtin_template_compiles() {
        let catalog = TemplateCatalog::builtin();
        assert_eq!(catalog.len(), 5);
        for (key, template) in catalog.iter() {
            let spec = template.instantiate(WorkflowOverrides::default());
            let wf = Workflow::compile(spec).unwrap_or_else(|e| panic!("{key}: {e}"));
            assert_eq!(wf.steps.len(), template.steps.len());
        }
    }

    #[test]
    fn overrides_replace_only_the_given_fields() {
        let catalog = TemplateCatalog::builtin();
        let template = catalog.get("lead_nurturing").unwrap();

        let spec = template.instantiate(WorkflowOverrides::named("X"));
        assert_eq!(spec.name, "X");
        assert_eq!(spec.description, template.description);
        assert_eq!(spec.triggers, template.triggers);
        assert_eq!(spec.steps.as_ref(), Some(&template.steps));

        let spec = template.instantiate(WorkflowOverrides {
            triggers: Some(vec!["manual".into()]),
            steps: Some(vec![StepSpec::new("add_to_crm")]),
            ..WorkflowOverrides::default()
        });
        assert_eq!(spec.name, template.name);
        assert_eq!(spec.triggers, vec!["manual"]);
        assert_eq!(spec.steps.map(|s| s.len()), Some(1));
    }

    #[test]
    fn lead_nurturing_delays_are_in_minutes() {
        let catalog = TemplateCatalog::builtin();
        let steps = &catalog.get("lead_nurturing").unwrap().steps;
        assert_eq!(steps[2].delay, 4320);
        assert_eq!(steps[3].condition.as_deref(), Some("lead_score > 70"));
    }
}
