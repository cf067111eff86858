//! Prompt templates for message analysis and reply generation.
//!
//! Templates use `{key}` placeholders filled by [`render_template`]; literal
//! braces in the JSON contract are doubled.

use std::fmt::Write as _;

use animus_core::BehaviorContext;
use animus_core::frustration::FrustrationLevel;

use crate::types::{AnalysisRequest, ResponseRequest};

/// System prompt for structured message analysis.
pub const ANALYSIS_SYSTEM: &str = r"You analyse chat messages sent to a simulated character.
You estimate how the message changes the character's needs and feelings.
Needs: rest, communication, attention, acceptance, self_realization, freedom, knowledge, security.
Positive need deltas mean the need grows more pressing, negative deltas mean it is being satisfied.

RULES:
- Deltas range from -30 to 30. Omit needs the message does not touch.
- emotional_intensity and urgency range from 0 to 1.
- user_mood is one of: positive, neutral, negative, hostile.
- Your response must be a single valid JSON object and nothing else.";

/// User prompt for structured message analysis.
pub const ANALYSIS_USER: &str = r#"Character: {character_name}
Sender: {user_id}
Message: "{message}"

Return JSON:
{{"needs_impact": {{"<need>": <float>}}, "emotional_analysis": {{"user_mood": "<mood>", "emotional_intensity": <float>, "trigger_emotions": ["<emotion>", ...], "expected_emotional_response": "<short note>"}}, "urgency": <float>}}"#;

/// System prompt for in-character replies.
pub const RESPONSE_SYSTEM: &str = r"You are {character_name}. {persona}
You currently feel: {emotional_state}.

RULES:
- Stay in character. Never mention needs, scores or that you are simulated.
- Let your feelings and what you want right now colour the reply without naming them.
- Keep the reply under 4 sentences.";

/// User prompt for in-character replies.
pub const RESPONSE_USER: &str = r"What is on your mind:
{behavior_context}
{additional_context}
The other person says: {message}

Reply as {character_name} would.";

/// Replace every `{key}` with its value.
#[must_use]
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{key}}}"), value);
    }
    result.replace("{{", "{").replace("}}", "}")
}

/// System and user prompts for analysing `req`.
#[must_use]
pub fn analysis_prompt(character_name: &str, req: &AnalysisRequest) -> (String, String) {
    let vars = [
        ("character_name", character_name),
        ("user_id", req.user_id.as_str()),
        ("message", req.message.as_str()),
    ];
    (
        render_template(ANALYSIS_SYSTEM, &vars),
        render_template(ANALYSIS_USER, &vars),
    )
}

/// System and user prompts for answering `req`.
#[must_use]
pub fn response_prompt(req: &ResponseRequest) -> (String, String) {
    let state = &req.emotional_state;
    let emotional_state = if state.description.is_empty() {
        state.primary.to_string()
    } else {
        state.description.clone()
    };
    let context = describe_context(&req.behavior_context);
    let additional = req
        .additional_context
        .as_deref()
        .map(|c| format!("Also: {c}\n"))
        .unwrap_or_default();
    let vars = [
        ("character_name", req.profile.name.as_str()),
        ("persona", req.profile.persona.as_str()),
        ("emotional_state", emotional_state.as_str()),
        ("behavior_context", context.as_str()),
        ("additional_context", additional.as_str()),
        ("message", req.message.as_str()),
    ];
    (
        render_template(RESPONSE_SYSTEM, &vars),
        render_template(RESPONSE_USER, &vars),
    )
}

/// Bullet list of whatever the context holds. Empty fields are skipped.
#[must_use]
pub fn describe_context(ctx: &BehaviorContext) -> String {
    let mut out = String::new();
    if let Some(m) = ctx.motivations.first() {
        let _ = writeln!(out, "- You want to do something about your {} need.", m.need_type);
    }
    for need in ctx.top_needs.iter().filter(|n| n.value >= n.threshold) {
        let _ = writeln!(out, "- Your {} need is pressing.", need.need);
    }
    if let Some(level) = ctx.frustration_level.filter(|l| *l != FrustrationLevel::None) {
        let _ = writeln!(out, "- Your frustration is {}.", format!("{level:?}").to_lowercase());
    }
    if let Some(b) = ctx.behavior_modifiers {
        if b.withdrawal > 0.5 {
            let _ = writeln!(out, "- You feel like withdrawing from the conversation.");
        }
        if b.aggression > 0.5 {
            let _ = writeln!(out, "- You are short-tempered.");
        }
    }
    if let Some(action) = ctx.action_in_progress {
        let _ = writeln!(out, "- You are busy: {action}.");
    }
    if out.is_empty() {
        out.push_str("- Nothing in particular.\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_replaces_keys_and_unescapes_braces() {
        let out = render_template("{a} says {{\"x\": 1}}", &[("a", "Mira")]);
        assert_eq!(out, "Mira says {\"x\": 1}");
    }

    #[test]
    fn empty_context_still_describes_something() {
        let text = describe_context(&BehaviorContext::default());
        assert_eq!(text, "- Nothing in particular.\n");
    }
}
