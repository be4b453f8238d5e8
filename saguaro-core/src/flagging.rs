//! Review-flag heuristic over model replies.
//!
//! A cheap proxy for "the model expressed uncertainty": case-insensitive
//! substring match against a small phrase set. False positives and false
//! negatives are expected and acceptable; flagged interactions go to a
//! human bookkeeper, nothing is blocked.

/// Default trigger phrases. The rules engine instructs the model to say
/// it is flagging, or to ask which property, whenever it is unsure.
pub const TRIGGER_PHRASES: &[&str] = &[
    "flag",
    "not sure",
    "need more information",
    "which property",
];

/// Reason string attached to every heuristic flag.
pub const FLAG_REASON: &str = "Needs clarification or review";

/// True when `reply` contains any of `phrases`, ignoring case.
pub fn matches_any(reply: &str, phrases: &[&str]) -> bool {
    let lower = reply.to_lowercase();
    phrases.iter().any(|p| lower.contains(&p.to_lowercase()))
}

/// Apply the default phrase set: `Some(FLAG_REASON)` when the reply
/// needs human review, `None` otherwise.
pub fn review_reason(reply: &str) -> Option<&'static str> {
    matches_any(reply, TRIGGER_PHRASES).then_some(FLAG_REASON)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_sure_flags_any_case() {
        assert_eq!(review_reason("I'm Not Sure which account fits."), Some(FLAG_REASON));
        assert_eq!(review_reason("NOT SURE."), Some(FLAG_REASON));
    }

    #[test]
    fn test_each_default_phrase_triggers() {
        for phrase in TRIGGER_PHRASES {
            let reply = format!("Reply mentioning {} somewhere.", phrase);
            assert!(
                review_reason(&reply).is_some(),
                "phrase {:?} should trigger",
                phrase
            );
        }
    }

    #[test]
    fn test_clean_reply_not_flagged() {
        let reply = "Materials Expense (5036). Allocate to the Sunnyvale project.";
        assert_eq!(review_reason(reply), None);
    }

    #[test]
    fn test_flag_matches_inside_words() {
        // Substring match is intentionally coarse: "flagged" contains "flag".
        assert!(review_reason("I have flagged this for review.").is_some());
    }

    #[test]
    fn test_custom_phrase_set() {
        assert!(matches_any("Please double-check this one", &["double-check"]));
        assert!(!matches_any("Routine categorization", &["double-check"]));
    }
}
