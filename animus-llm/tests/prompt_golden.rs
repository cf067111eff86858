//! Golden checks for rendered prompts.
//!
//! Each case renders a prompt from realistic state and checks that the
//! inputs made it in and no placeholder was left behind.

use animus_core::character::{BehaviorContext, NeedSummary};
use animus_core::emotion::EmotionalState;
use animus_core::frustration::FrustrationLevel;
use animus_core::motivation::ActionType;
use animus_core::needs::NeedState;
use animus_core::{CharacterId, CharacterProfile, Emotion, NeedType};
use animus_llm::prompt;
use animus_llm::{AnalysisRequest, ResponseRequest};

struct GoldenCase {
    name: &'static str,
    system: String,
    user: String,
    must_contain: Vec<&'static str>,
    must_not_contain: Vec<&'static str>,
}

fn lonely_context() -> BehaviorContext {
    BehaviorContext {
        emotional_state: Some(EmotionalState::new(Emotion::Loneliness, Some(Emotion::Sadness), 6)),
        top_needs: vec![NeedSummary {
            need: NeedType::Communication,
            value: 82.0,
            threshold: 60.0,
            dynamic_priority: 12.7,
            state: NeedState::Active,
        }],
        motivations: Vec::new(),
        frustration_level: Some(FrustrationLevel::Moderate),
        behavior_modifiers: None,
        emotional_modifiers: None,
        debuffs: None,
        action_in_progress: Some(ActionType::PursueHobby),
    }
}

fn golden_cases() -> Vec<GoldenCase> {
    let analysis = AnalysisRequest {
        character: CharacterId::new(),
        user_id: "traveller-42".into(),
        message: "I have not talked to you in weeks, sorry!".into(),
    };
    let (a_sys, a_user) = prompt::analysis_prompt("Mira", &analysis);

    let reply = ResponseRequest {
        profile: CharacterProfile::new("Mira", "A soft-spoken archivist who loves old maps."),
        message: "Did you miss me?".into(),
        emotional_state: EmotionalState::new(Emotion::Loneliness, None, 6),
        behavior_context: lonely_context(),
        additional_context: Some("It is raining outside.".into()),
    };
    let (r_sys, r_user) = prompt::response_prompt(&reply);

    let bare = ResponseRequest {
        profile: CharacterProfile::new("Oto", "A ferryman."),
        message: "Hello.".into(),
        emotional_state: EmotionalState::neutral(),
        behavior_context: BehaviorContext::default(),
        additional_context: None,
    };
    let (b_sys, b_user) = prompt::response_prompt(&bare);

    vec![
        GoldenCase {
            name: "analysis_of_an_apology",
            system: a_sys,
            user: a_user,
            must_contain: vec!["traveller-42", "in weeks", "\"needs_impact\"", "user_mood"],
            must_not_contain: vec!["{message}", "{user_id}", "{{"],
        },
        GoldenCase {
            name: "lonely_archivist_reply",
            system: r_sys,
            user: r_user,
            must_contain: vec![
                "Mira",
                "old maps",
                "communication need is pressing",
                "frustration is moderate",
                "pursue_hobby",
                "raining",
                "Did you miss me?",
            ],
            must_not_contain: vec!["{behavior_context}", "{persona}", "{additional_context}"],
        },
        GoldenCase {
            name: "reply_with_empty_context",
            system: b_sys,
            user: b_user,
            must_contain: vec!["Oto", "Nothing in particular", "Hello."],
            must_not_contain: vec!["{behavior_context}", "Also:"],
        },
    ]
}

#[test]
fn golden_prompts_render_cleanly() {
    for case in golden_cases() {
        let full = format!("{}\n{}", case.system, case.user);
        for needle in &case.must_contain {
            assert!(full.contains(needle), "{}: missing {needle:?}", case.name);
        }
        for needle in &case.must_not_contain {
            assert!(!full.contains(needle), "{}: unexpected {needle:?}", case.name);
        }
    }
}
