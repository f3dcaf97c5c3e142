//! Query orchestration
//!
//! [`QueryOrchestrator::handle`] runs one query through a fixed sequence:
//!
//! 1. classify the text
//! 2. record the user turn
//! 3. check the access gate; a denial ends the request with an error turn
//! 4. a bio query with an attached file is answered by the sequence analyzer,
//!    without contacting any backend
//! 5. anything else becomes a prompt routed through the tier's providers
//! 6. the answer (or a user-safe failure) is recorded as the final turn
//!
//! Each call is independent. The conversation store is the only shared state.

pub mod format;
pub mod prompt;
pub mod types;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::access::{AccessDecision, AccessGate, FeatureFlag, Operation, UsageLedger};
use crate::analysis::{GUIDE_LENGTH, Organism, SequenceAnalyzer, extract_sequences};
use crate::classifier::{BioQueryType, ClassificationResult, classify};
use crate::providers::{ProviderRouter, RouterError};
use crate::search::SearchAugmenter;
use crate::session::{ConversationStore, Turn, TurnRole};

pub use types::{AnalysisOutcome, Query, QueryResponse, ReasonCode, RequestContext, ResponseSource};

/// Default number of recent turns included in a prompt
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

/// Shortest nucleotide run in query text treated as a primer
pub const MIN_PRIMER_IN_TEXT: usize = 15;

/// Analysis feature a bio query type needs on the deterministic path
pub fn required_feature(bio: BioQueryType) -> Option<FeatureFlag> {
    match bio {
        BioQueryType::Crispr => Some(FeatureFlag::CrisprDesign),
        BioQueryType::Pcr => Some(FeatureFlag::PcrAnalysis),
        BioQueryType::CodonOptimization => Some(FeatureFlag::CodonOptimization),
        BioQueryType::SequenceAnalysis => Some(FeatureFlag::SequenceAnalysis),
        BioQueryType::General => None,
    }
}

pub struct QueryOrchestrator {
    analyzer: SequenceAnalyzer,
    gate: AccessGate,
    router: ProviderRouter,
    store: Arc<ConversationStore>,
    usage: Arc<dyn UsageLedger>,
    search: Option<Arc<dyn SearchAugmenter>>,
    history_window: usize,
}

impl QueryOrchestrator {
    pub fn new(
        router: ProviderRouter,
        store: Arc<ConversationStore>,
        usage: Arc<dyn UsageLedger>,
    ) -> Self {
        Self {
            analyzer: SequenceAnalyzer::default(),
            gate: AccessGate::new(),
            router,
            store,
            usage,
            search: None,
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }

    pub fn with_analyzer(mut self, analyzer: SequenceAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    pub fn with_gate(mut self, gate: AccessGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_search(mut self, search: Arc<dyn SearchAugmenter>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    pub async fn handle(
        &self,
        query: &Query,
        ctx: &RequestContext,
        cancel: &CancellationToken,
    ) -> QueryResponse {
        let classification = classify(&query.raw_text);
        debug!(
            session_key = %ctx.session_key,
            intent = %classification.intent,
            bio_query_type = %classification.bio_query_type,
            has_file = query.attached_file.is_some(),
            "Handling query"
        );

        if cancel.is_cancelled() {
            return cancelled_response(String::new(), classification);
        }

        let user_turn = Turn::new_at(TurnRole::User, query.raw_text.clone(), query.requested_at)
            .with_classification(classification);
        let session_id = self.store.append(&ctx.session_key, user_turn).await;

        let deterministic =
            !classification.bio_query_type.is_general() && query.attached_file.is_some();
        let feature = if deterministic {
            required_feature(classification.bio_query_type)
        } else {
            None
        };
        let op = match &query.attached_file {
            Some(file) => Operation::FileUpload {
                size_bytes: file.size_bytes,
                feature,
            },
            None => Operation::Query { feature },
        };

        let usage = self.usage.current_usage(&ctx.caller_id).await;
        match self.gate.check(&ctx.caller_id, &ctx.tier, usage, &op) {
            AccessDecision::Allow => {}
            AccessDecision::ResetAndAllow => self.usage.reset(&ctx.caller_id).await,
            AccessDecision::Deny { reason, limits } => {
                info!(
                    caller_id = %ctx.caller_id,
                    tier = %limits.name,
                    reason = %reason,
                    "Query denied"
                );
                let turn = Turn::error(reason.user_message());
                self.store.append(&ctx.session_key, turn.clone()).await;
                return QueryResponse {
                    session_id,
                    turn,
                    classification,
                    source: ResponseSource::AccessDenied,
                    reason_code: Some(reason.into()),
                    limits: Some(limits),
                    analysis: None,
                };
            }
        }

        if deterministic {
            let (text, analysis) = self.run_analysis(&classification, query);
            let turn = Turn::assistant(text).with_classification(classification);
            self.store.append(&ctx.session_key, turn.clone()).await;
            // Asking for missing input is not an answer
            if analysis.is_some() {
                self.usage.consume(&ctx.caller_id).await;
            }
            return QueryResponse {
                session_id,
                turn,
                classification,
                source: ResponseSource::Analysis,
                reason_code: None,
                limits: None,
                analysis,
            };
        }

        let search_text = self.augment(&query.raw_text).await;
        let recent = self
            .store
            .recent_turns(&ctx.session_key, self.history_window)
            .await;
        let prompt = prompt::build_prompt(
            &classification,
            &recent,
            search_text.as_deref(),
            query.attached_file.as_ref(),
        );

        match self
            .router
            .route(&prompt, &ctx.providers, &ctx.tier.allowed_providers, cancel)
            .await
        {
            Ok(generated) => {
                let turn = Turn::assistant(generated.text).with_classification(classification);
                self.store.append(&ctx.session_key, turn.clone()).await;
                self.usage.consume(&ctx.caller_id).await;
                QueryResponse {
                    session_id,
                    turn,
                    classification,
                    source: ResponseSource::Provider {
                        id: generated.provider,
                        attempts: generated.attempts,
                    },
                    reason_code: None,
                    limits: None,
                    analysis: None,
                }
            }
            Err(RouterError::Cancelled) => {
                info!(session_key = %ctx.session_key, "Query cancelled during routing");
                cancelled_response(session_id, classification)
            }
            Err(err) => {
                warn!(
                    session_key = %ctx.session_key,
                    reason = err.reason_code(),
                    error = %err,
                    "Routing failed"
                );
                let turn = Turn::error(format::routing_failure_message(&err));
                self.store.append(&ctx.session_key, turn.clone()).await;
                QueryResponse {
                    session_id,
                    turn,
                    classification,
                    source: ResponseSource::RoutingFailed,
                    reason_code: Some(ReasonCode::from(&err)),
                    limits: None,
                    analysis: None,
                }
            }
        }
    }

    async fn augment(&self, text: &str) -> Option<String> {
        let search = self.search.as_ref()?;
        match search.augment(text).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "Search augmentation failed, continuing without it");
                None
            }
        }
    }

    /// Deterministic answer for a bio query with an attached file.
    fn run_analysis(
        &self,
        classification: &ClassificationResult,
        query: &Query,
    ) -> (String, Option<AnalysisOutcome>) {
        let file = query.attached_file.as_ref();
        let file_sequence = file
            .filter(|f| f.sequence_type.is_nucleotide() && f.has_sequence())
            .map(|f| f.sequence.clone());

        match classification.bio_query_type {
            BioQueryType::Crispr => {
                let Some(target) = file_sequence.or_else(|| {
                    extract_sequences(&query.raw_text, GUIDE_LENGTH).into_iter().next()
                }) else {
                    return (no_sequence_message("guide design"), None);
                };
                let pam = self.analyzer.pam().to_string();
                let candidates = self.analyzer.scan_guide_candidates(&target);
                (
                    format::format_guides(&pam, &candidates),
                    Some(AnalysisOutcome::Guides { pam, candidates }),
                )
            }
            BioQueryType::Pcr => {
                let primers = extract_sequences(&query.raw_text, MIN_PRIMER_IN_TEXT);
                let (Some(forward), Some(reverse), Some(template)) =
                    (primers.first(), primers.get(1), file_sequence.as_ref())
                else {
                    return (
                        format!(
                            "To check a PCR, include a forward and a reverse primer (at least {MIN_PRIMER_IN_TEXT} nt each) \
                             in your question and attach the template sequence."
                        ),
                        None,
                    );
                };
                let report = self.analyzer.pcr_feasibility(forward, reverse, template);
                (
                    format::format_pcr(&report),
                    Some(AnalysisOutcome::Pcr {
                        forward: forward.clone(),
                        reverse: reverse.clone(),
                        report,
                    }),
                )
            }
            BioQueryType::CodonOptimization => {
                let Some(coding) = file_sequence.or_else(|| {
                    extract_sequences(&query.raw_text, 3).into_iter().next()
                }) else {
                    return (no_sequence_message("codon optimization"), None);
                };
                let organism = Organism::detect(&query.raw_text)
                    .unwrap_or_else(|| self.analyzer.default_organism());
                let result = self.analyzer.optimize_codons(&coding, Some(organism));
                (
                    format::format_codons(organism.as_str(), &result),
                    Some(AnalysisOutcome::Codons {
                        organism: organism.as_str().to_string(),
                        result,
                    }),
                )
            }
            BioQueryType::SequenceAnalysis | BioQueryType::General => match file {
                Some(file) => (
                    format::format_sequence_stats(file),
                    Some(AnalysisOutcome::Sequence {
                        sequence_type: file.sequence_type,
                        length: file.sequence.len(),
                        gc_content: file.gc_content,
                        composition: file.composition.clone(),
                    }),
                ),
                None => (no_sequence_message("sequence analysis"), None),
            },
        }
    }
}

fn no_sequence_message(task: &str) -> String {
    format!("No nucleotide sequence found for {task}. Attach a FASTA file or include the sequence in your question.")
}

fn cancelled_response(session_id: String, classification: ClassificationResult) -> QueryResponse {
    QueryResponse {
        session_id,
        turn: Turn::error(format::routing_failure_message(&RouterError::Cancelled)),
        classification,
        source: ResponseSource::Cancelled,
        reason_code: Some(ReasonCode::Cancelled),
        limits: None,
        analysis: None,
    }
}
