// src/prompt.rs
use crate::error::{AppError, Result};
use crate::models::UserProfile;

/// Section headings the model is asked to organise its answer under.
pub const SECTIONS: [&str; 5] = [
    "In-Depth Summary of Current Financial Situation",
    "Personalized Budgeting Recommendations (e.g., what % to save, spend, invest)",
    "Suggestions for Adjustments (what to change about their income, spending, saving, or investment habits)",
    "Action Plan (3 practical next steps they should take)",
    "Local or Free Resources (based on location)",
];

impl UserProfile {
    /// Names of the fields that are empty after trimming, in form order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        self.fields()
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::MissingFields(missing))
        }
    }
}

/// Builds the advisor instruction for a complete profile.
///
/// Field values are embedded exactly as entered. Nothing is escaped, so a
/// field can carry instructions of its own to the model.
pub fn build_prompt(profile: &UserProfile) -> Result<String> {
    profile.validate()?;

    let sections = SECTIONS
        .iter()
        .enumerate()
        .map(|(i, title)| format!("{}. {}", i + 1, title))
        .collect::<Vec<_>>()
        .join("\n");

    Ok(format!(
        "Act as a certified financial advisor. Use the information below to give a \
tailored, professional budgeting analysis.\n\
\n\
User Details:\n\
- Age: {}\n\
- Monthly Income: ${}\n\
- Monthly Expenses: ${}\n\
- Current Savings: ${}\n\
- Current Investments: {}\n\
- Debt: {}\n\
- Financial Goal: {}\n\
- Risk Tolerance: {}\n\
- Location: {}\n\
- Major Upcoming Expenses: {}\n\
\n\
Organize your response into these sections:\n\
{}\n\
\n\
Give clear, concise, and practical advice. If important information is missing, ask for it.\n",
        profile.age,
        profile.income,
        profile.expenses,
        profile.savings,
        profile.investments,
        profile.debt,
        profile.goal,
        profile.risk,
        profile.location,
        profile.upcoming,
        sections
    ))
}
