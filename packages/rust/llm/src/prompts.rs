//! Prompt templates for the per-tender assistant actions.

use std::fmt;
use std::str::FromStr;

use tenderpilot_shared::{ProfileConfig, Result, Tender, TenderPilotError};

/// Description characters sent to the model.
const MAX_DESCRIPTION_CHARS: usize = 6_000;

/// What the assistant is asked to produce for a tender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssistTask {
    /// Bid/no-bid assessment and a plan to win.
    WinningStrategy,
    /// Draft email to the contracting authority.
    OutreachEmail,
}

impl AssistTask {
    /// Cache key for the task.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WinningStrategy => "winning_strategy",
            Self::OutreachEmail => "outreach_email",
        }
    }

    /// Human label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::WinningStrategy => "Winning strategy",
            Self::OutreachEmail => "Outreach email",
        }
    }
}

impl fmt::Display for AssistTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AssistTask {
    type Err = TenderPilotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strategy" | "winning_strategy" => Ok(Self::WinningStrategy),
            "email" | "outreach_email" => Ok(Self::OutreachEmail),
            other => Err(TenderPilotError::validation(format!(
                "unknown assist task '{other}': expected 'strategy' or 'email'"
            ))),
        }
    }
}

/// A system + user message pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Render the prompt for `task` about `tender` on behalf of `profile`.
pub fn build_prompt(task: AssistTask, tender: &Tender, profile: &ProfileConfig) -> Prompt {
    let system = match task {
        AssistTask::WinningStrategy => {
            "You are an experienced Canadian public-sector bid consultant. \
             Assess government tender notices for a supplier and give concrete, \
             practical advice. Be specific to the notice; do not invent facts \
             that are not in it."
        }
        AssistTask::OutreachEmail => {
            "You write concise, professional business emails to Canadian \
             government contracting officers. Respect procurement rules: ask \
             clarifying questions through the official contact only and never \
             attempt to influence the evaluation."
        }
    };

    let mut user = String::new();
    user.push_str(&tender_brief(tender));
    user.push('\n');
    user.push_str(&profile_brief(profile));
    user.push('\n');

    match task {
        AssistTask::WinningStrategy => user.push_str(
            "Write a winning strategy for this tender:\n\
             1. Bid / no-bid recommendation with one-line rationale.\n\
             2. What the buyer most likely values.\n\
             3. Key risks and how to mitigate them.\n\
             4. Three differentiators to emphasize.\n\
             5. Next steps before the closing date.",
        ),
        AssistTask::OutreachEmail => {
            user.push_str(
                "Draft a short outreach email to the contracting authority's contact \
                 expressing interest and asking up to three clarifying questions. \
                 Include a subject line.",
            );
            if !profile.contact_name.trim().is_empty() {
                user.push_str(&format!(" Sign it as {}.", profile.contact_name.trim()));
            }
        }
    }

    Prompt {
        system: system.to_string(),
        user,
    }
}

fn tender_brief(tender: &Tender) -> String {
    let mut lines = vec![
        "Tender notice:".to_string(),
        format!("- Title: {}", tender.title),
        format!("- Contracting authority: {}", tender.authority),
        format!("- Category: {}", tender.category),
        format!("- Status: {}", tender.status),
        format!("- Closing date: {}", tender.closing_date_raw),
    ];
    if let Some(reference) = &tender.reference {
        lines.push(format!("- Reference: {reference}"));
    }
    if let Some(gsin) = &tender.gsin {
        lines.push(format!("- GSIN: {gsin}"));
    }
    if let Some(region) = &tender.region {
        lines.push(format!("- Region of delivery: {region}"));
    }
    if let Some(email) = &tender.contact_email {
        lines.push(format!("- Contact email: {email}"));
    }
    lines.push(format!(
        "- Description: {}",
        truncate_chars(&tender.description, MAX_DESCRIPTION_CHARS)
    ));
    lines.join("\n") + "\n"
}

fn profile_brief(profile: &ProfileConfig) -> String {
    let mut out = format!("Supplier: {}\n", profile.company_name.trim());
    if !profile.capabilities.trim().is_empty() {
        out.push_str(&format!("Capabilities: {}\n", profile.capabilities.trim()));
    }
    out
}

/// Truncate to at most `max_chars` characters, on a char boundary.
pub fn truncate_chars(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        None => content.to_string(),
        Some((cut, _)) => format!("{}\n[... description truncated ...]", &content[..cut]),
    }
}
