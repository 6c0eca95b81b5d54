//! Stage 5: the quality gate.
//!
//! A draft is scored once. A failing draft gets exactly one revision request
//! built from the scorer's feedback; the revision replaces the draft only if
//! it scores strictly higher. A draft that still fails is published anyway
//! and reported as [`Verdict::FailedPublished`].
//!
//! The flow is an explicit state machine. `Revised` can only move to
//! `Final`, so a second revision is unreachable.

use tracing::{info, instrument, warn};

use newsroom_markdown::{clean_draft, take_chars};
use newsroom_provider::GenerationRequest;
use newsroom_quality::{Score, improvement_prompt, score};

use crate::pipeline::RunContext;

/// How an article left the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The original draft passed.
    Passed,
    /// The original failed and the revision passed.
    RevisedPassed,
    /// Still below threshold after the one allowed revision. Published with a warning.
    FailedPublished,
}

impl Verdict {
    pub fn passed(self) -> bool {
        !matches!(self, Verdict::FailedPublished)
    }
}

#[derive(Debug, Clone)]
pub struct GateOutcome {
    pub verdict: Verdict,
    /// The body to publish.
    pub body: String,
    /// Total of the original draft.
    pub original_total: u32,
    /// Total of the published body.
    pub final_total: u32,
    /// Whether a revision request was sent.
    pub revision_requested: bool,
}

enum GateState {
    Draft(String),
    Scored {
        body: String,
        score: Score,
    },
    Revised {
        original: String,
        score: Score,
        revision: Option<String>,
    },
    Final(GateOutcome),
}

pub fn revision_prompt(improvement: &str, body: &str, context_chars: usize) -> String {
    format!(
        "以下の記事を改善してください。\n\n\
         【改善指示】\n{improvement}\n\n\
         【元の記事】\n{original}\n\n\
         改善した記事全文をMarkdown形式で出力してください。",
        original = take_chars(body, context_chars),
    )
}

/// One revision attempt. `None` on a dry run, on failure, or when there is
/// nothing to fix.
async fn request_revision(ctx: &RunContext<'_>, body: &str, score: &Score) -> Option<String> {
    let service = ctx.service?;
    let improvement = improvement_prompt(score.feedback())?;

    let prompt = revision_prompt(&improvement, body, ctx.settings.revision_context_chars);
    let request =
        GenerationRequest::text(prompt).with_max_output_tokens(ctx.settings.draft_max_tokens);

    match service.generate(&request).await {
        Ok(generated) => Some(clean_draft(&generated.text)).filter(|b| !b.is_empty()),
        Err(e) => {
            warn!(error = %e, "revision request failed");
            None
        }
    }
}

/// Score `body` under `title`, revising at most once.
#[instrument(skip_all)]
pub async fn quality_gate(ctx: &RunContext<'_>, title: &str, body: String) -> GateOutcome {
    let mut state = GateState::Draft(body);
    let mut revision_requested = false;

    loop {
        state = match state {
            GateState::Draft(body) => {
                let score = score(title, &body);
                info!(total = score.total(), passed = score.passed(), "draft scored");
                GateState::Scored { body, score }
            }
            GateState::Scored { body, score } if score.passed() => GateState::Final(GateOutcome {
                verdict: Verdict::Passed,
                body,
                original_total: score.total(),
                final_total: score.total(),
                revision_requested,
            }),
            GateState::Scored { body, score } => {
                revision_requested = ctx.service.is_some();
                let revision = request_revision(ctx, &body, &score).await;
                GateState::Revised {
                    original: body,
                    score,
                    revision,
                }
            }
            GateState::Revised {
                original,
                score: before,
                revision,
            } => {
                let rescored = revision.map(|r| {
                    let after = score(title, &r);
                    info!(total = after.total(), passed = after.passed(), "revision scored");
                    (r, after)
                });
                let outcome = match rescored {
                    Some((body, after)) if after.total() > before.total() => GateOutcome {
                        verdict: if after.passed() {
                            Verdict::RevisedPassed
                        } else {
                            Verdict::FailedPublished
                        },
                        body,
                        original_total: before.total(),
                        final_total: after.total(),
                        revision_requested,
                    },
                    _ => GateOutcome {
                        verdict: Verdict::FailedPublished,
                        body: original,
                        original_total: before.total(),
                        final_total: before.total(),
                        revision_requested,
                    },
                };
                GateState::Final(outcome)
            }
            GateState::Final(outcome) => {
                if !outcome.verdict.passed() {
                    warn!(total = outcome.final_total, "below quality threshold, publishing anyway");
                }
                return outcome;
            }
        };
    }
}
