use serde::{Deserialize, Serialize};
use tracing::Instrument;

use crate::{
    contains_termination_token, AgentRole, ConfigError, ConversationPhase, Participants,
    PhaseMachine, SessionConfig, SessionError, Transcript,
};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct SessionOutcome {
    pub transcript: Transcript,
    /// Phase after each step, starting with `Refinement` and ending with
    /// `Terminated`.
    pub phases: Vec<ConversationPhase>,
}

/// One bounded dialog between the participants.
#[derive(Clone, Debug)]
pub struct ConversationSession {
    config: SessionConfig,
    participants: Participants,
}

impl ConversationSession {
    pub fn new(config: SessionConfig, participants: Participants) -> Result<Self, ConfigError> {
        config.validate()?;
        if config.verify {
            for role in [AgentRole::Coder, AgentRole::Verifier] {
                if participants.get(role).is_none() {
                    return Err(ConfigError::Invalid(format!(
                        "verification is enabled but no {role} is configured"
                    )));
                }
            }
        }
        Ok(Self {
            config,
            participants,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Records `opening_message` as the Analyst's first turn, then lets the
    /// phase machine pick speakers until it terminates.
    pub async fn run(&self, opening_message: &str) -> Result<SessionOutcome, SessionError> {
        let budget = self.config.budget();
        let span = tracing::info_span!(
            "session",
            n_rounds = budget.n_rounds,
            verify = budget.verify
        );
        async move {
            let token = self.config.termination_token.as_str();
            let mut machine = PhaseMachine::new(budget);
            let mut transcript = Transcript::default();

            transcript.push(
                AgentRole::Analyst,
                machine.phase(),
                opening_message,
                Vec::new(),
                Vec::new(),
            );
            let mut transition = machine.advance(
                Some(AgentRole::Analyst),
                transcript.len(),
                contains_termination_token(opening_message, token),
            );

            while let Some(speaker) = transition.next_speaker {
                if transcript.len() >= budget.turn_cap() {
                    tracing::debug!(turns = transcript.len(), "turn cap reached");
                    machine.terminate();
                    break;
                }

                let participant = self
                    .participants
                    .get(speaker)
                    .ok_or(SessionError::MissingParticipant(speaker))?;
                let reply = participant.respond(&transcript).await?;
                let terminated = contains_termination_token(&reply.content, token);

                let turn = transcript.push(
                    speaker,
                    machine.phase(),
                    reply.content,
                    reply.tool_calls,
                    reply.tool_responses,
                );
                tracing::debug!(
                    turn = turn.ordinal,
                    speaker = %speaker,
                    phase = ?turn.phase,
                    tool_calls = turn.tool_calls.len(),
                    "turn recorded"
                );

                transition = machine.advance(Some(speaker), transcript.len(), terminated);
            }

            tracing::info!(turns = transcript.len(), "session finished");
            Ok(SessionOutcome {
                transcript,
                phases: machine.trace().to_vec(),
            })
        }
        .instrument(span)
        .await
    }
}
