//! Phase state machine for one conversation session.
//!
//! [`next_turn`] is the whole transition table as a pure function of the
//! current phase, the last speaker, the turn count and the termination flag.
//! [`PhaseMachine`] applies it turn by turn and never lets the phase move
//! backwards.

use serde::{Deserialize, Serialize};

use crate::AgentRole;

/// Ordered: a session only ever moves forward through these.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConversationPhase {
    Refinement,
    Verification,
    Terminated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseBudget {
    /// Turns allowed in refinement, the opening message included.
    pub n_rounds: usize,
    /// Additional turns allowed once verification starts.
    pub n_verification_rounds: usize,
    pub verify: bool,
}

impl PhaseBudget {
    /// Hard upper bound on the number of turns in a session.
    pub fn turn_cap(&self) -> usize {
        if self.verify {
            self.n_rounds + self.n_verification_rounds
        } else {
            self.n_rounds
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub phase: ConversationPhase,
    /// `None` exactly when the session is over.
    pub next_speaker: Option<AgentRole>,
}

impl Transition {
    fn to(phase: ConversationPhase, speaker: AgentRole) -> Self {
        Self {
            phase,
            next_speaker: Some(speaker),
        }
    }

    fn terminated() -> Self {
        Self {
            phase: ConversationPhase::Terminated,
            next_speaker: None,
        }
    }
}

/// Decides the phase and speaker after a turn.
///
/// Rules, first match wins:
/// 1. Refinement with the budget spent or the termination token seen: a
///    Critic turn hands over to the Coder when verification is enabled,
///    anything else ends the session.
/// 2. Verification with the combined budget spent ends the session.
/// 3. Otherwise the active pair alternates. An unexpected speaker hands the
///    turn to the Analyst (refinement) or the Coder (verification).
///
/// The termination token only matters during refinement.
pub fn next_turn(
    phase: ConversationPhase,
    last_role: Option<AgentRole>,
    turn_count: usize,
    terminated: bool,
    budget: &PhaseBudget,
) -> Transition {
    match phase {
        ConversationPhase::Terminated => Transition::terminated(),
        ConversationPhase::Refinement => {
            if turn_count >= budget.n_rounds || terminated {
                if last_role == Some(AgentRole::Critic) && budget.verify {
                    Transition::to(ConversationPhase::Verification, AgentRole::Coder)
                } else {
                    Transition::terminated()
                }
            } else {
                let next = match last_role {
                    Some(AgentRole::Analyst) => AgentRole::Critic,
                    _ => AgentRole::Analyst,
                };
                Transition::to(ConversationPhase::Refinement, next)
            }
        }
        ConversationPhase::Verification => {
            if turn_count >= budget.n_rounds + budget.n_verification_rounds {
                Transition::terminated()
            } else {
                let next = match last_role {
                    Some(AgentRole::Coder) => AgentRole::Verifier,
                    _ => AgentRole::Coder,
                };
                Transition::to(ConversationPhase::Verification, next)
            }
        }
    }
}

/// Case-insensitive substring check. An empty token never matches.
pub fn contains_termination_token(message: &str, token: &str) -> bool {
    let token = token.trim();
    !token.is_empty() && message.to_lowercase().contains(&token.to_lowercase())
}

#[derive(Clone, Debug)]
pub struct PhaseMachine {
    budget: PhaseBudget,
    phase: ConversationPhase,
    trace: Vec<ConversationPhase>,
}

impl PhaseMachine {
    pub fn new(budget: PhaseBudget) -> Self {
        Self {
            budget,
            phase: ConversationPhase::Refinement,
            trace: vec![ConversationPhase::Refinement],
        }
    }

    pub fn budget(&self) -> &PhaseBudget {
        &self.budget
    }

    pub fn phase(&self) -> ConversationPhase {
        self.phase
    }

    /// Every phase the machine has been in after each step, starting with
    /// the initial one.
    pub fn trace(&self) -> &[ConversationPhase] {
        &self.trace
    }

    pub fn advance(
        &mut self,
        last_role: Option<AgentRole>,
        turn_count: usize,
        terminated: bool,
    ) -> Transition {
        let mut transition = next_turn(self.phase, last_role, turn_count, terminated, &self.budget);
        if transition.phase < self.phase {
            tracing::error!(
                from = ?self.phase,
                to = ?transition.phase,
                "phase transition would regress; terminating"
            );
            transition = Transition::terminated();
        }
        self.record(transition.phase);
        transition
    }

    /// Ends the session regardless of the table, e.g. when the turn cap hits.
    pub fn terminate(&mut self) {
        if self.phase != ConversationPhase::Terminated {
            self.record(ConversationPhase::Terminated);
        }
    }

    fn record(&mut self, phase: ConversationPhase) {
        self.phase = phase;
        self.trace.push(phase);
    }
}
