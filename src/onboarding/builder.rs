//! Builds a user's current onboarding status message.

use super::model::OnboardingMessage;

/// Overlay, in priority order, the welcome template, `channel = user`, and
/// the user's saved message (if any).
pub fn build_status(
    template: &OnboardingMessage,
    user: &str,
    saved: Option<&OnboardingMessage>,
) -> OnboardingMessage {
    let mut message = template.clone();
    message.channel = Some(user.to_string());
    if let Some(saved) = saved {
        message.overlay(saved);
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::model::Step;

    fn template() -> OnboardingMessage {
        OnboardingMessage {
            text: Some("Welcome".into()),
            attachments: vec![Step::new("Pin", "pin_added"), Step::new("Star", "star_added")],
            ..Default::default()
        }
    }

    #[test]
    fn new_user_gets_template_addressed_to_them() {
        let message = build_status(&template(), "U1", None);

        assert_eq!(message.channel.as_deref(), Some("U1"));
        assert_eq!(message.text.as_deref(), Some("Welcome"));
        assert_eq!(message.attachments, template().attachments);
        assert!(message.ts.is_none());
    }

    #[test]
    fn saved_message_wins() {
        let mut steps = template().attachments;
        steps[0].mark_completed();
        let saved = OnboardingMessage {
            channel: Some("D99".into()),
            ts: Some("1700000000.000100".into()),
            attachments: steps.clone(),
            ..template()
        };

        let message = build_status(&template(), "U1", Some(&saved));

        assert_eq!(message.channel.as_deref(), Some("D99"));
        assert_eq!(message.ts.as_deref(), Some("1700000000.000100"));
        assert_eq!(message.attachments, steps);
    }

    #[test]
    fn template_is_not_mutated() {
        let original = template();
        let mut message = build_status(&original, "U1", None);
        message.attachments[0].mark_completed();
        assert!(!original.attachments[0].completed);
    }
}
