//! Orchestrator: drives rounds of expand, local search, propagate and prune
//! until the subject's bracket closes.
//!
//! ```text
//! INIT ──> { EXPAND -> LOCAL_SEARCH -> PROPAGATE -> PRUNE }* ──> DONE
//!                                  └── round cap ──> INCONCLUSIVE
//! ```
//!
//! INIT runs `initial_expansions` expansion passes, applies the optional
//! root-level cut, then one local-search, propagate, prune sequence. Each
//! later round first checks whether the subject is attained.

use std::collections::BTreeSet;

use certmin_kernel::choice::Choice;
use tracing::{info, warn};

use crate::arena::{Bracket, ChildSlot, NodeArena, NodeIndex, UNBOUNDED};
use crate::contract::AvailabilityOracle;
use crate::error::SearchError;
use crate::expand::ExpansionReport;
use crate::graph::{ProofLogMetadata, ProofLogV1, RoundEventV1, RoundKindV1, TerminationReasonV1};
use crate::local_search::LocalSearchReport;
use crate::policy::ProverPolicyV1;
use crate::propagate::{group_aggregates, GroupAggregate, PropagationReport};
use crate::prune::PruneReport;
use crate::strategy::ProofStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofStatus {
    /// [`Prover::initialize`] has not run.
    Uninitialized,
    InProgress,
    /// The subject is attained at `value`.
    Done { value: u64 },
    /// The round cap was reached without closing the subject's bracket.
    Inconclusive,
}

/// Certified exact value of the subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    pub subject: NodeIndex,
    pub cut: Option<Choice>,
    pub value: u64,
    /// `1 + sum of child brackets` for every legal group of the subject.
    pub breakdown: Vec<GroupAggregate>,
    /// Round events recorded, initialization included.
    pub rounds: usize,
    pub arena_len: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofOutcome {
    Certified(Certificate),
    Inconclusive {
        rounds: usize,
        subject_bracket: Bracket,
    },
}

/// Branch-and-bound prover over one oracle and one strategy.
pub struct Prover<'a, O: AvailabilityOracle, S: ?Sized> {
    oracle: &'a O,
    strategy: &'a S,
    policy: ProverPolicyV1,
    arena: NodeArena<O::Payload>,
    subject: NodeIndex,
    cut: Option<Choice>,
    rounds: Vec<RoundEventV1>,
}

impl<'a, O, S> Prover<'a, O, S>
where
    O: AvailabilityOracle,
    S: ProofStrategy<O::Payload> + ?Sized,
{
    /// Validate `policy` and create the root from `root`.
    ///
    /// # Errors
    ///
    /// [`SearchError::InvalidPolicy`], or an oracle violation if the root has
    /// no usable mask.
    pub fn new(
        oracle: &'a O,
        strategy: &'a S,
        root: O::Payload,
        policy: ProverPolicyV1,
    ) -> Result<Self, SearchError> {
        policy.validate()?;
        let mut masks = oracle.availability(&[&root]);
        let mask = match (masks.pop(), masks.is_empty()) {
            (Some(mask), true) => mask,
            _ => {
                return Err(SearchError::OracleContractViolation {
                    detail: "availability must return exactly one mask for the root".into(),
                })
            }
        };
        let arena = NodeArena::with_root(oracle.space(), policy.arena_capacity, root, mask)?;
        Ok(Self {
            oracle,
            strategy,
            policy,
            arena,
            subject: NodeIndex::ROOT,
            cut: None,
            rounds: Vec::new(),
        })
    }

    /// Run the INIT round, optionally cutting play down to the root child
    /// reached by `cut`.
    ///
    /// # Errors
    ///
    /// [`SearchError::InvalidCut`] if `cut` is not a legal root choice or
    /// leads to an impossible extension; any fatal error of the phases.
    pub fn initialize(&mut self, cut: Option<Choice>) -> Result<(), SearchError> {
        if !self.rounds.is_empty() {
            return Err(SearchError::InvariantViolation {
                detail: "prover is already initialized".into(),
            });
        }
        info!(
            oracle = self.oracle.oracle_id(),
            strategy = self.strategy.strategy_id(),
            cut = ?cut,
            "initializing proof"
        );
        let mut expansions = Vec::with_capacity(self.policy.initial_expansions);
        for _ in 0..self.policy.initial_expansions {
            expansions.push(self.expand()?);
        }
        let cut_retired = match cut {
            Some(choice) => self.apply_cut(choice)?,
            None => 0,
        };
        self.cut = cut;
        let local_search = self.local_search()?;
        let propagation = self.propagate()?;
        let prune = self.prune();
        self.record(
            RoundKindV1::Init { cut, cut_retired },
            expansions,
            local_search,
            propagation,
            prune,
        );
        Ok(())
    }

    fn apply_cut(&mut self, choice: Choice) -> Result<u64, SearchError> {
        let root = &self.arena[NodeIndex::ROOT];
        if !root.mask().is_legal(choice) {
            return Err(SearchError::InvalidCut {
                choice,
                detail: "not a legal choice at the root".into(),
            });
        }
        match root.child(choice) {
            ChildSlot::Child(keep) => Ok(self.restrict_to(keep)?.len() as u64),
            ChildSlot::Terminal => Err(SearchError::InvalidCut {
                choice,
                detail: "the extension is impossible".into(),
            }),
            ChildSlot::Unexpanded => Err(SearchError::InvalidCut {
                choice,
                detail: "the root has not been expanded".into(),
            }),
        }
    }

    /// One orchestrator round. A no-op unless the status is
    /// [`ProofStatus::InProgress`].
    ///
    /// # Errors
    ///
    /// [`SearchError::InvariantViolation`] before initialization; any fatal
    /// error of the phases.
    pub fn step(&mut self) -> Result<ProofStatus, SearchError> {
        match self.status()? {
            ProofStatus::InProgress => {}
            ProofStatus::Uninitialized => {
                return Err(SearchError::InvariantViolation {
                    detail: "step before initialize".into(),
                })
            }
            settled => return Ok(settled),
        }
        let expansion = self.expand()?;
        let local_search = self.local_search()?;
        let propagation = self.propagate()?;
        let prune = self.prune();
        self.record(
            RoundKindV1::Step,
            vec![expansion],
            local_search,
            propagation,
            prune,
        );
        self.status()
    }

    /// Step until the subject is certified or the round cap is reached.
    ///
    /// # Errors
    ///
    /// As [`Prover::step`].
    pub fn run(&mut self) -> Result<ProofOutcome, SearchError> {
        loop {
            match self.status()? {
                ProofStatus::Done { value } => {
                    info!(value, rounds = self.rounds.len(), "subject certified");
                    return Ok(ProofOutcome::Certified(self.build_certificate(value)));
                }
                ProofStatus::Inconclusive => {
                    let subject_bracket = self.arena[self.subject].bracket();
                    let upper =
                        (subject_bracket.upper != UNBOUNDED).then_some(subject_bracket.upper);
                    warn!(
                        rounds = self.rounds.len(),
                        lower = subject_bracket.lower,
                        upper,
                        "round cap reached without certification"
                    );
                    return Ok(ProofOutcome::Inconclusive {
                        rounds: self.rounds.len(),
                        subject_bracket,
                    });
                }
                ProofStatus::InProgress | ProofStatus::Uninitialized => {
                    self.step()?;
                }
            }
        }
    }

    /// Current status.
    ///
    /// # Errors
    ///
    /// [`SearchError::InvariantViolation`] if the subject is attained while a
    /// node outside its subtree and strict ancestors is still in play.
    pub fn status(&self) -> Result<ProofStatus, SearchError> {
        if self.rounds.is_empty() {
            return Ok(ProofStatus::Uninitialized);
        }
        if let Some(value) = self.check_done()? {
            return Ok(ProofStatus::Done { value });
        }
        if self.step_rounds() >= self.policy.max_rounds {
            return Ok(ProofStatus::Inconclusive);
        }
        Ok(ProofStatus::InProgress)
    }

    fn check_done(&self) -> Result<Option<u64>, SearchError> {
        let bracket = self.arena[self.subject].bracket();
        if !bracket.is_attained() {
            return Ok(None);
        }
        let ancestors: BTreeSet<NodeIndex> = self.arena.ancestors(self.subject).collect();
        let stray = self.arena.iter().find(|(i, n)| {
            n.is_inplay() && !ancestors.contains(i) && !self.arena.in_subtree(*i, self.subject)
        });
        if let Some((index, _)) = stray {
            return Err(SearchError::InvariantViolation {
                detail: format!(
                    "node {index} is still in play after subject {} attained",
                    self.subject
                ),
            });
        }
        Ok(Some(bracket.lower))
    }

    fn step_rounds(&self) -> usize {
        self.rounds.len().saturating_sub(1)
    }

    /// The certificate, once the status is [`ProofStatus::Done`].
    ///
    /// # Errors
    ///
    /// As [`Prover::status`].
    pub fn certificate(&self) -> Result<Option<Certificate>, SearchError> {
        Ok(match self.status()? {
            ProofStatus::Done { value } => Some(self.build_certificate(value)),
            _ => None,
        })
    }

    fn build_certificate(&self, value: u64) -> Certificate {
        Certificate {
            subject: self.subject,
            cut: self.cut,
            value,
            breakdown: self.breakdown(),
            rounds: self.rounds.len(),
            arena_len: self.arena.len(),
        }
    }

    /// Per-group aggregates of the subject's children.
    #[must_use]
    pub fn breakdown(&self) -> Vec<GroupAggregate> {
        group_aggregates(&self.arena, self.subject)
    }

    /// Audit log of the rounds so far.
    ///
    /// # Errors
    ///
    /// As [`Prover::status`].
    pub fn proof_log(&self) -> Result<ProofLogV1, SearchError> {
        let termination = match self.status()? {
            ProofStatus::Done { value } => Some(TerminationReasonV1::Certified { value }),
            ProofStatus::Inconclusive => Some(TerminationReasonV1::RoundBudgetExceeded {
                rounds: self.step_rounds() as u64,
            }),
            ProofStatus::Uninitialized | ProofStatus::InProgress => None,
        };
        Ok(ProofLogV1 {
            rounds: self.rounds.clone(),
            metadata: ProofLogMetadata {
                oracle_id: self.oracle.oracle_id().to_owned(),
                strategy_id: self.strategy.strategy_id().to_owned(),
                space: self.arena.space(),
                policy: self.policy.clone(),
                cut: self.cut,
                subject: self.subject,
                arena_len: self.arena.len() as u64,
                termination,
            },
        })
    }

    // Manual phase control.

    /// Split the whole frontier.
    ///
    /// # Errors
    ///
    /// See [`crate::expand::expand_frontier`].
    pub fn expand(&mut self) -> Result<ExpansionReport, SearchError> {
        crate::expand::expand_frontier(
            &mut self.arena,
            self.oracle,
            self.policy.expansion_chunk_size,
        )
    }

    /// Run guided local search over the frontier.
    ///
    /// # Errors
    ///
    /// See [`crate::local_search::local_search`].
    pub fn local_search(&mut self) -> Result<LocalSearchReport, SearchError> {
        crate::local_search::local_search(
            &mut self.arena,
            self.oracle,
            self.strategy,
            self.policy.local_search_limits(),
        )
    }

    /// Propagate bounds to a fixpoint or the iteration cap.
    ///
    /// # Errors
    ///
    /// See [`crate::propagate::recursive_bound`].
    pub fn propagate(&mut self) -> Result<PropagationReport, SearchError> {
        crate::propagate::recursive_bound(&mut self.arena, self.policy.max_bound_iterations)
    }

    /// Retire attained and dominated nodes around the current subject.
    pub fn prune(&mut self) -> PruneReport {
        crate::prune::prune(&mut self.arena, self.subject)
    }

    /// Keep only `keep`'s subtree and path in play; `keep` becomes the subject.
    ///
    /// # Errors
    ///
    /// See [`crate::prune::restrict_to`].
    pub fn restrict_to(&mut self, keep: NodeIndex) -> Result<Vec<NodeIndex>, SearchError> {
        let retired = crate::prune::restrict_to(&mut self.arena, keep)?;
        self.subject = keep;
        Ok(retired)
    }

    fn record(
        &mut self,
        kind: RoundKindV1,
        expansions: Vec<ExpansionReport>,
        local_search: LocalSearchReport,
        propagation: PropagationReport,
        prune: PruneReport,
    ) {
        let subject_bracket = self.arena[self.subject].bracket();
        let event = RoundEventV1 {
            round: self.rounds.len() as u64,
            kind,
            expansions,
            local_search,
            propagation,
            prune,
            subject: self.subject,
            subject_bracket,
            arena_len: self.arena.len() as u64,
            inplay_count: self.arena.inplay_count() as u64,
        };
        info!(
            round = event.round,
            lower = subject_bracket.lower,
            upper = (subject_bracket.upper != UNBOUNDED).then_some(subject_bracket.upper),
            arena_len = event.arena_len,
            inplay = event.inplay_count,
            "round complete"
        );
        self.rounds.push(event);
    }

    #[must_use]
    pub fn arena(&self) -> &NodeArena<O::Payload> {
        &self.arena
    }

    #[must_use]
    pub fn subject(&self) -> NodeIndex {
        self.subject
    }

    #[must_use]
    pub fn cut(&self) -> Option<Choice> {
        self.cut
    }

    #[must_use]
    pub fn policy(&self) -> &ProverPolicyV1 {
        &self.policy
    }

    #[must_use]
    pub fn rounds(&self) -> &[RoundEventV1] {
        &self.rounds
    }
}

/// Create, initialize and run a prover in one call.
///
/// # Errors
///
/// Any error of [`Prover::new`], [`Prover::initialize`] or [`Prover::run`].
pub fn prove<O, S>(
    oracle: &O,
    strategy: &S,
    root: O::Payload,
    cut: Option<Choice>,
    policy: ProverPolicyV1,
) -> Result<(ProofOutcome, ProofLogV1), SearchError>
where
    O: AvailabilityOracle,
    S: ProofStrategy<O::Payload> + ?Sized,
{
    let mut prover = Prover::new(oracle, strategy, root, policy)?;
    prover.initialize(cut)?;
    let outcome = prover.run()?;
    Ok((outcome, prover.proof_log()?))
}
