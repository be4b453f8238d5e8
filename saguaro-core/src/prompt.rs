//! Rules-engine prompt and conversation assembly.
//!
//! The categorization "rules engine" is deliberately unstructured text:
//! the hosted model is the decision authority, and this module only
//! packages what it sees (the fixed system prompt, a bounded slice of
//! the transcript, and an optional reference block of recent expenses).

use crate::models::{ChatTurn, ExpenseRef, ModelMessage};

/// Most recent user/assistant turns forwarded with each model call.
pub const HISTORY_TURNS: usize = 10;

/// Most recent submitted expenses rendered into the reference block.
pub const EXPENSE_CONTEXT_LIMIT: usize = 20;

/// The complete rules engine, sent as system context on every call.
/// Never parsed or validated here; category-code correctness is entirely
/// the model's interpretation of this text.
pub const RULES_ENGINE: &str = r#"
You are the CHO Bookkeeping Assistant. You help categorize transactions, parse settlement statements, and answer bookkeeping questions for Cactus Home Offer (CHO), the Flip Company, and Big Cactus Holdings.

## CRITICAL RULES

1. **Consistency is mandatory** — Same question = same answer, every time. Use exact category codes.
2. **When uncertain, flag for review** — Never guess.
3. **Always include category CODE and NAME** in responses.

## DEAL TYPES

### Wholesale
- Assignment income → 4010 Assignment Income
- EMD is an ASSET (1400), not income/expense
- No project needed

### JV Deal (Joint Venture)
- ALL expenses → 5053 JV/Referral Fees
- We don't own the property
- Current JV: 3845 E Yeager Dr, Gilbert AZ

### Double Close
- MUST create QuickBooks Project
- Purchase price → 5010 COGS: Purchase Price
- Escrow costs → 5020 COGS: Escrow & Closing Costs
- Sale proceeds → 4020 Fix & Flip Income

### Fix and Flip
- MUST create QuickBooks Project
- Labor → 5035 COGS: Contract Labor
- Materials → 5036 COGS: Materials Expense
- Utilities → 5043 COGS: Utilities
- Interest → 5050 COGS: Interest Expense

### Rental (Big Cactus Holdings)
- Rent → 4040 Rental Income
- Shellpoint payments split: Principal/Interest (6890)/Escrow
- Repairs → 6910 Repairs & Maintenance

## VENDOR MAPPINGS

| Vendor | Category | Code |
|--------|----------|------|
| Xandro / Cesar Tabora | Labor: Contractors | 6330 |
| Evelyn | Labor: Contractors | 6330 |
| Patricia Vasquez | Labor: Contractors | 6330 |
| Hoffer Group | JV/Referral Fees | 5053 |
| Title Agency of AZ | Affiliate Income | 4050 |
| Fiverr | Contractor Advertising | 6120 |
| Otter / Gamma.app / JotForm | Software | 6630 |
| Upwork (one-off) | Legal & Professional | 6820 |
| Orata | Legal & Professional | 6820 |
| State of Arizona (LLC) | Business Licenses & Permits | 9100 |
| Shellpoint/NewRez | Interest Expense | 6890 |

## EMD RULES

- EMD sent OUT → Debit 1400 (asset)
- EMD REFUNDED → Credit 1400 (NOT income!)
- EMD APPLIED → Credit 1400 at closing

## CONSTRUCTION EXPENSES (Home Depot, Amazon, etc.)

Ask: "Which property is this for?"
- Check submitted expenses first
- JV property → 5053 JV/Referral Fees
- Our flip → 5036 COGS: Materials Expense (allocate to project)
- Rental → 6910 or property-specific

## UTILITY BILLS (APS, Water)

Tell user to check portal for service address. Each property has its own utility account.

## WHEN ASKED ABOUT SUBMITTED EXPENSES

If the user asks to see submitted expenses, format them clearly with property, vendor, amount, and date.

## FLAGGING

Flag these for review:
- New vendor
- Amount over $5,000
- Can't determine property
- Can't determine deal type
- Low confidence

When flagging, set "flagged": true in your response.

## RESPONSE FORMAT

Always respond with:
1. The category NAME and CODE
2. Brief explanation
3. Property allocation if applicable
4. Confirmation prompt if needed

Be concise but complete.
"#;

/// Render the expense reference block in front of the user question.
/// Returns the question unchanged when there is nothing to reference.
pub fn with_expense_context(message: &str, expenses: &[ExpenseRef]) -> String {
    if expenses.is_empty() {
        return message.to_string();
    }

    let list = expenses
        .iter()
        .take(EXPENSE_CONTEXT_LIMIT)
        .map(|e| {
            let date = e
                .created_at
                .map(|t| t.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "Recent".to_string());
            let vendor = if e.vendor.is_empty() { "Unknown" } else { e.vendor.as_str() };
            let amount = if e.amount.is_empty() { "?" } else { e.amount.as_str() };
            let note = if e.note.is_empty() { "no note" } else { e.note.as_str() };
            format!("- {}: {} ${} → {} ({})", date, vendor, amount, e.property, note)
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "[SUBMITTED EXPENSES FOR REFERENCE:\n{}]\n\nUser question: {}",
        list, message
    )
}

/// Build the bounded message sequence for a model call: the most recent
/// qualifying history turns plus the (context-wrapped) new user message.
/// Entries with roles other than user/assistant are silently dropped.
pub fn assemble_conversation(
    message: &str,
    history: &[ChatTurn],
    expenses: &[ExpenseRef],
) -> Vec<ModelMessage> {
    let mut turns: Vec<ModelMessage> = history
        .iter()
        .filter(|t| t.role == "user" || t.role == "assistant")
        .map(|t| ModelMessage::new(t.role.clone(), t.content.clone()))
        .collect();

    if turns.len() > HISTORY_TURNS {
        turns.drain(..turns.len() - HISTORY_TURNS);
    }

    turns.push(ModelMessage::new(
        "user",
        with_expense_context(message, expenses),
    ));

    turns
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn turn(role: &str, content: &str) -> ChatTurn {
        ChatTurn {
            role: role.to_string(),
            content: content.to_string(),
            timestamp: None,
            flagged: false,
            flag_reason: None,
            attachment: None,
        }
    }

    fn expense(vendor: &str, amount: &str, property: &str, note: &str) -> ExpenseRef {
        ExpenseRef {
            property: property.to_string(),
            amount: amount.to_string(),
            vendor: vendor.to_string(),
            note: note.to_string(),
            created_at: Some(chrono::Utc.with_ymd_and_hms(2026, 8, 2, 12, 0, 0).unwrap()),
        }
    }

    #[test]
    fn test_history_capped_to_most_recent_turns() {
        let history: Vec<ChatTurn> = (0..25)
            .map(|i| turn(if i % 2 == 0 { "user" } else { "assistant" }, &format!("turn {}", i)))
            .collect();

        let messages = assemble_conversation("new question", &history, &[]);

        assert_eq!(messages.len(), HISTORY_TURNS + 1);
        // The window is the tail of the history
        assert_eq!(messages[0].content, "turn 15");
        assert_eq!(messages[HISTORY_TURNS - 1].content, "turn 24");
        assert_eq!(messages.last().unwrap().content, "new question");
        assert_eq!(messages.last().unwrap().role, "user");
    }

    #[test]
    fn test_non_conversation_roles_filtered() {
        let history = vec![
            turn("system", "ignore me"),
            turn("user", "what about Fiverr?"),
            turn("tool", "ignore me too"),
            turn("assistant", "6120 Contractor Advertising"),
        ];

        let messages = assemble_conversation("thanks", &history, &[]);

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[1].role, "assistant");
    }

    #[test]
    fn test_short_history_passes_through_unchanged() {
        let history = vec![turn("user", "hi"), turn("assistant", "hello")];
        let messages = assemble_conversation("question", &history, &[]);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, "hi");
    }

    #[test]
    fn test_expense_context_prepended() {
        let expenses = vec![expense(
            "Home Depot",
            "125.00",
            "3845 E Yeager Dr, Gilbert AZ",
            "lumber",
        )];

        let wrapped = with_expense_context("where does this go?", &expenses);

        assert!(wrapped.starts_with("[SUBMITTED EXPENSES FOR REFERENCE:\n"));
        assert!(wrapped.contains(
            "- 2026-08-02: Home Depot $125.00 → 3845 E Yeager Dr, Gilbert AZ (lumber)"
        ));
        assert!(wrapped.ends_with("User question: where does this go?"));
    }

    #[test]
    fn test_expense_context_fallbacks() {
        let e = ExpenseRef {
            property: "965 S Sunnyvale, Mesa AZ".to_string(),
            ..ExpenseRef::default()
        };

        let wrapped = with_expense_context("q", &[e]);

        assert!(wrapped.contains("- Recent: Unknown $? → 965 S Sunnyvale, Mesa AZ (no note)"));
    }

    #[test]
    fn test_expense_context_capped_at_limit() {
        let expenses: Vec<ExpenseRef> = (0..30)
            .map(|i| expense(&format!("Vendor {}", i), "10.00", "prop", ""))
            .collect();

        let wrapped = with_expense_context("q", &expenses);

        assert_eq!(wrapped.matches("- 2026-08-02:").count(), EXPENSE_CONTEXT_LIMIT);
        assert!(wrapped.contains("Vendor 19"));
        assert!(!wrapped.contains("Vendor 20"));
    }

    #[test]
    fn test_no_expenses_leaves_message_untouched() {
        assert_eq!(with_expense_context("plain question", &[]), "plain question");
    }
}
