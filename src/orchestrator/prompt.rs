//! Prompt assembly for generative answers

use crate::analysis::ParsedFileContext;
use crate::classifier::{BioQueryType, ClassificationResult, Intent};
use crate::providers::{Prompt, PromptRole};
use crate::session::{Turn, TurnRole};

const PERSONA: &str = "You are BioMind, an assistant for molecular biology and bioinformatics. \
Answer accurately and say so when you are unsure.";

fn intent_guidance(intent: Intent) -> &'static str {
    match intent {
        Intent::Greeting => "The user is greeting you. Reply briefly and offer help.",
        Intent::Farewell => "The user is leaving. Close the conversation politely.",
        Intent::GeneralTrending => {
            "The user wants recent developments. Prefer the supplied search results and cite their sources."
        }
        Intent::TechnicalQuestion => "Explain the mechanism step by step.",
        Intent::AssistanceRequest => "Give concrete, actionable steps.",
        Intent::GeneralQuery => "Answer the question directly.",
    }
}

fn topic_guidance(bio: BioQueryType) -> Option<&'static str> {
    match bio {
        BioQueryType::Crispr => Some("Topic: CRISPR guide design and genome editing."),
        BioQueryType::Pcr => Some("Topic: PCR and primer design."),
        BioQueryType::CodonOptimization => Some("Topic: codon usage and expression optimization."),
        BioQueryType::SequenceAnalysis => Some("Topic: nucleotide or protein sequence analysis."),
        BioQueryType::General => None,
    }
}

/// Builds the prompt: system instructions shaped by the classification, the
/// search text verbatim, the attached-file summary, then the recent turns in
/// order. Error turns are left out.
pub fn build_prompt(
    classification: &ClassificationResult,
    recent_turns: &[Turn],
    search_text: Option<&str>,
    attached_file: Option<&ParsedFileContext>,
) -> Prompt {
    let mut system = vec![
        PERSONA,
        intent_guidance(classification.intent),
        classification.tone.style_hint(),
    ];
    if let Some(topic) = topic_guidance(classification.bio_query_type) {
        system.push(topic);
    }

    let mut prompt = Prompt::default();
    prompt.push(PromptRole::System, system.join("\n"));

    if let Some(search_text) = search_text {
        prompt.push(PromptRole::System, search_text);
    }
    if let Some(file) = attached_file {
        prompt.push(PromptRole::System, file.summary());
    }

    for turn in recent_turns {
        let role = match turn.role {
            TurnRole::User => PromptRole::User,
            TurnRole::Assistant => PromptRole::Assistant,
            TurnRole::Error => continue,
        };
        prompt.push(role, turn.content.clone());
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SequenceType;
    use crate::classifier::classify;

    #[test]
    fn test_prompt_layout() {
        let classification = classify("what's the latest in base editing?");
        let turns = vec![
            Turn::user("hi"),
            Turn::assistant("hello"),
            Turn::error("quota"),
            Turn::user("what's the latest in base editing?"),
        ];
        let file = ParsedFileContext::from_sequence(SequenceType::Dna, "ACGT");

        let prompt = build_prompt(&classification, &turns, Some("RESULTS VERBATIM"), Some(&file));
        let roles: Vec<_> = prompt.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                PromptRole::System,
                PromptRole::System,
                PromptRole::System,
                PromptRole::User,
                PromptRole::Assistant,
                PromptRole::User,
            ]
        );
        assert!(prompt.messages[0].content.contains("recent developments"));
        assert_eq!(prompt.messages[1].content, "RESULTS VERBATIM");
        assert!(prompt.messages[2].content.contains("dna"));
        assert_eq!(
            prompt.last_user_message(),
            Some("what's the latest in base editing?")
        );
    }

    #[test]
    fn test_prompt_without_extras() {
        let prompt = build_prompt(&ClassificationResult::default(), &[], None, None);
        assert_eq!(prompt.messages.len(), 1);
        assert!(prompt.messages[0].content.contains("professional"));
    }
}
