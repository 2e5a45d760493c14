// WHY: Greedy merge/skip/report engine over a normalized token stream
// Window priority: token alone, all three fused, previous+current, current+next; unresolved tokens pass through

use serde::{Deserialize, Serialize};

use crate::dictionary::{has_digit, Lexicon};

/// Lookback/lookahead view of one scan position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window<'a> {
    pub previous: &'a str,
    pub current: &'a str,
    pub next: &'a str,
}

/// Outcome of evaluating a [`Window`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeDecision {
    /// Previous token was absorbed into `resolved_text`
    pub consume_prev: bool,
    pub resolved_text: String,
    /// Next token is already part of `resolved_text` and must be skipped
    pub consume_next: bool,
}

/// Which decision rule produced a [`MergeDecision`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeRule {
    Known,
    FuseBoth,
    FusePrevious,
    FuseNext,
    Unresolved,
}

/// A token that exhausted every merge attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub word: String,
    pub before: String,
    pub after: String,
}

/// Result of resegmenting one token sequence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resegmented {
    pub text: String,
    pub reports: Vec<ReportEntry>,
}

impl MergeDecision {
    fn standalone(current: &str) -> Self {
        Self {
            consume_prev: false,
            resolved_text: current.to_owned(),
            consume_next: false,
        }
    }
}

/// Evaluate a window against the lexicon.
///
/// Returns the decision, the rule that fired, and a report entry when the
/// current token is unresolved and digit-free.
pub fn decide<L: Lexicon + ?Sized>(
    window: Window<'_>,
    lexicon: &L,
) -> (MergeDecision, MergeRule, Option<ReportEntry>) {
    let Window { previous, current, next } = window;

    // Any candidate containing a digit is unknown; skip the lookups entirely
    if has_digit(current) {
        return (MergeDecision::standalone(current), MergeRule::Unresolved, None);
    }

    if lexicon.contains(current) {
        return (MergeDecision::standalone(current), MergeRule::Known, None);
    }

    let all_three = [previous, current, next].concat();
    if lexicon.contains(&all_three) {
        let decision = MergeDecision {
            consume_prev: true,
            resolved_text: all_three,
            consume_next: true,
        };
        return (decision, MergeRule::FuseBoth, None);
    }

    let with_previous = [previous, current].concat();
    if lexicon.contains(&with_previous) {
        let decision = MergeDecision {
            consume_prev: true,
            resolved_text: with_previous,
            consume_next: false,
        };
        return (decision, MergeRule::FusePrevious, None);
    }

    let with_next = [current, next].concat();
    if lexicon.contains(&with_next) {
        let decision = MergeDecision {
            consume_prev: false,
            resolved_text: with_next,
            consume_next: true,
        };
        return (decision, MergeRule::FuseNext, None);
    }

    let report = ReportEntry {
        word: current.to_owned(),
        before: previous.to_owned(),
        after: next.to_owned(),
    };
    (MergeDecision::standalone(current), MergeRule::Unresolved, Some(report))
}

/// Scan state threaded from one position to the next
#[derive(Debug, Default)]
struct ScanState {
    /// Resolved word awaiting its emit-or-absorb verdict
    pending: String,
    skip_next: bool,
    emitted: Vec<String>,
    reports: Vec<ReportEntry>,
}

impl ScanState {
    fn emit(&mut self, word: String) {
        // The stream-start placeholder is empty and never emitted
        if !word.is_empty() {
            self.emitted.push(word);
        }
    }

    fn step<L: Lexicon + ?Sized>(mut self, current: &str, next: &str, lexicon: &L) -> Self {
        if self.skip_next {
            self.skip_next = false;
            return self;
        }

        let window = Window {
            previous: &self.pending,
            current,
            next,
        };
        let (decision, _rule, report) = decide(window, lexicon);
        self.reports.extend(report);

        let previous = std::mem::replace(&mut self.pending, decision.resolved_text);
        if !decision.consume_prev {
            self.emit(previous);
        }
        self.skip_next = decision.consume_next;
        self
    }

    fn finish(mut self) -> Resegmented {
        let last = std::mem::take(&mut self.pending);
        self.emit(last);
        Resegmented {
            text: self.emitted.join(" "),
            reports: self.reports,
        }
    }
}

/// Resegment a token sequence into cleaned text plus report entries.
///
/// Every input token ends up in the output, either verbatim or as part of a
/// fused word; nothing is dropped and nothing is left pending.
pub fn resegment<S, L>(tokens: &[S], lexicon: &L) -> Resegmented
where
    S: AsRef<str>,
    L: Lexicon + ?Sized,
{
    tokens
        .iter()
        .enumerate()
        .fold(ScanState::default(), |state, (i, token)| {
            let next = tokens.get(i + 1).map(|t| t.as_ref()).unwrap_or("");
            state.step(token.as_ref(), next, lexicon)
        })
        .finish()
}
