use std::collections::HashSet;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::Instrument;
use viewforge_schema::{SchemaError, SchemaGraph, SchemaSampler, SchemaWording};

use crate::extract::{view_code, view_names};
use crate::{
    CampaignConfig, CampaignError, ConfigError, ConversationSession, Participants,
    ReflectionSummarizer, SessionError, Transcript,
};

/// What each session gets to see of the schema.
#[derive(Clone)]
pub enum SchemaScope {
    /// The same schema text for every session.
    Full(String),
    /// A fresh connected sample of tables per session, rendered by `wording`.
    Subsampled {
        graph: Arc<SchemaGraph>,
        wording: Arc<dyn SchemaWording>,
    },
}

impl SchemaScope {
    pub fn is_subsampled(&self) -> bool {
        matches!(self, SchemaScope::Subsampled { .. })
    }

    async fn schema_text(&self, sample_size: usize, rng: &mut StdRng) -> Result<String, SchemaError> {
        match self {
            SchemaScope::Full(text) => Ok(text.clone()),
            SchemaScope::Subsampled { graph, wording } => {
                let sample = SchemaSampler::sample(graph, sample_size, rng)?;
                tracing::info!(tables = ?sample.tables, "sampled sub-schema");
                wording.schema_wording(Some(sample.tables.as_slice())).await
            }
        }
    }
}

impl std::fmt::Debug for SchemaScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaScope::Full(text) => f.debug_tuple("Full").field(&text.len()).finish(),
            SchemaScope::Subsampled { graph, .. } => f
                .debug_struct("Subsampled")
                .field("tables", &graph.node_count())
                .finish_non_exhaustive(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct CampaignOutput {
    /// One transcript per completed session, in order.
    pub transcripts: Vec<Transcript>,
    /// View-related code blocks, in the order they appeared.
    pub view_code: Vec<String>,
    pub summaries: Vec<String>,
    /// Views defined so far, deduplicated, first-seen order.
    pub view_names: Vec<String>,
    /// Why the campaign ended before `n_chats` sessions, if it did.
    pub stopped_early: Option<String>,
}

impl CampaignOutput {
    pub fn completed_sessions(&self) -> usize {
        self.transcripts.len()
    }

    fn absorb(&mut self, session: CompletedSession) {
        let mut seen: HashSet<String> = self.view_names.iter().cloned().collect();
        for name in session.view_names {
            if seen.insert(name.clone()) {
                self.view_names.push(name);
            }
        }
        self.view_code.extend(session.view_code);
        self.summaries.push(session.summary);
        self.transcripts.push(session.transcript);
    }
}

struct CompletedSession {
    transcript: Transcript,
    summary: String,
    view_code: Vec<String>,
    view_names: Vec<String>,
}

/// Builds the message that opens session `index` (0-based).
pub fn opening_message(
    index: usize,
    schema: &str,
    summaries: &[String],
    defined_views: &[String],
) -> String {
    let mut message =
        format!("Critic, I have the following database schema.\n\nBEGIN SCHEMA\n\n{schema}\nEND SCHEMA\n\n");
    if index > 0 {
        message.push_str(&format!(
            "From our previous discussion(s) I have taken the following notes: \n\n{}\n\n",
            numbered(summaries)
        ));
        message.push_str(&format!(
            "Here are some database views we defined in previous discussion(s): \n\n{}\n\n",
            numbered(defined_views)
        ));
        message.push_str(
            "Let's try something different this time. We need to explore more aspects of the data and define new views.\n\n",
        );
    }
    message.push_str("First, please suggest an analysis task for me to work on.");
    message
}

fn numbered(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| format!("{}. {item}", index + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A sequence of sessions that share only their summaries and the names of
/// the views defined so far.
#[derive(Debug)]
pub struct RefinementCampaign {
    config: CampaignConfig,
    scope: SchemaScope,
    session: ConversationSession,
    summarizer: ReflectionSummarizer,
}

impl RefinementCampaign {
    /// Checks every precondition up front: configuration, participants, and
    /// a sample size that fits the schema graph.
    pub fn new(
        config: CampaignConfig,
        scope: SchemaScope,
        participants: Participants,
        summarizer: ReflectionSummarizer,
    ) -> Result<Self, CampaignError> {
        config.validate()?;
        if config.subsample != scope.is_subsampled() {
            return Err(ConfigError::Invalid(format!(
                "subsample is {} but the schema scope is {:?}",
                config.subsample, scope
            ))
            .into());
        }
        if let SchemaScope::Subsampled { graph, .. } = &scope {
            if config.sample_size > graph.node_count() {
                return Err(SchemaError::InvalidSampleSize {
                    requested: config.sample_size,
                    available: graph.node_count(),
                }
                .into());
            }
        }
        let session = ConversationSession::new(config.session.clone(), participants)?;
        Ok(Self {
            config,
            scope,
            session,
            summarizer,
        })
    }

    pub fn config(&self) -> &CampaignConfig {
        &self.config
    }

    /// Runs up to `n_chats` sessions. A failing session ends the campaign;
    /// everything completed before it is returned.
    pub async fn run(&self) -> CampaignOutput {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut output = CampaignOutput::default();
        let n_chats = self.config.n_chats;

        for index in 0..n_chats {
            let span = tracing::info_span!("chat", chat = index + 1, of = n_chats);
            match self.run_session(index, &mut rng, &output).instrument(span).await {
                Ok(session) => output.absorb(session),
                Err(error) => {
                    tracing::warn!(
                        chat = index + 1,
                        of = n_chats,
                        error = %error,
                        "session failed; ending campaign early"
                    );
                    output.stopped_early =
                        Some(format!("Error in chat {} / {n_chats}: {error}", index + 1));
                    break;
                }
            }
        }
        output
    }

    async fn run_session(
        &self,
        index: usize,
        rng: &mut StdRng,
        progress: &CampaignOutput,
    ) -> Result<CompletedSession, SessionError> {
        let schema = self.scope.schema_text(self.config.sample_size, rng).await?;
        let opening = opening_message(index, &schema, &progress.summaries, &progress.view_names);

        let outcome = self.session.run(&opening).await?;
        let summary = self.summarizer.summarize(&outcome.transcript).await?;
        let view_code = view_code(&outcome.transcript);
        let view_names = view_names(view_code.iter().map(String::as_str));
        tracing::info!(
            turns = outcome.transcript.len(),
            code_blocks = view_code.len(),
            views = view_names.len(),
            "chat completed"
        );

        Ok(CompletedSession {
            transcript: outcome.transcript,
            summary,
            view_code,
            view_names,
        })
    }
}
