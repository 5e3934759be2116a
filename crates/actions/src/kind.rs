//! The closed set of actions a workflow step may name.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! action_kinds {
    ($( $(#[$doc:meta])* $variant:ident => $name:literal, )+) => {
        /// Identifier of a business action.
        ///
        /// Workflow definitions refer to actions by their snake_case name;
        /// names outside this set are rejected when the workflow is defined.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum ActionKind {
            $( $(#[$doc])* $variant, )+
        }

        impl ActionKind {
            /// Every action, in declaration order.
            pub const ALL: &'static [ActionKind] = &[ $( ActionKind::$variant, )+ ];

            /// The wire name used in workflow definitions.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( ActionKind::$variant => $name, )+
                }
            }
        }

        impl FromStr for ActionKind {
            type Err = UnknownAction;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $( $name => Ok(ActionKind::$variant), )+
                    other => Err(UnknownAction(other.to_owned())),
                }
            }
        }
    };
}

action_kinds! {
    // lead nurturing
    SendWelcomeEmail => "send_welcome_email",
    AddToCrm => "add_to_crm",
    SendFollowUpEmail => "send_follow_up_email",
    AssignToSales => "assign_to_sales",
    SendNurtureContent => "send_nurture_content",
    // onboarding
    SendWelcomePackage => "send_welcome_package",
    CreateOnboardingTasks => "create_onboarding_tasks",
    ScheduleDemoCall => "schedule_demo_call",
    SendTutorialSeries => "send_tutorial_series",
    CheckProductUsage => "check_product_usage",
    SendFeedbackSurvey => "send_feedback_survey",
    // invoicing
    GenerateInvoice => "generate_invoice",
    SendInvoiceEmail => "send_invoice_email",
    SendPaymentReminder => "send_payment_reminder",
    SendOverdueNotice => "send_overdue_notice",
    SuspendService => "suspend_service",
    // retention
    AnalyzeCustomerHealth => "analyze_customer_health",
    SendCheckInEmail => "send_check_in_email",
    OfferDiscount => "offer_discount",
    ScheduleSuccessCall => "schedule_success_call",
    SendWinBackCampaign => "send_win_back_campaign",
    // social media
    CreateSocialPosts => "create_social_posts",
    SchedulePosts => "schedule_posts",
    MonitorEngagement => "monitor_engagement",
    RespondToComments => "respond_to_comments",
    AnalyzePerformance => "analyze_performance",
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned by [`ActionKind::from_str`] for a name outside the action set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action '{0}'")]
pub struct UnknownAction(pub String);
