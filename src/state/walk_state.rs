/// Walk state definitions for the page walker
///
/// The walker moves through these states once per listing page and records
/// every transition; an illegal transition is a bug and aborts the walk.
use std::fmt;

/// Position of the walker inside one page cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalkState {
    /// Constructed, nothing fetched yet
    Init,

    /// Fetching the listing page at the current cursor
    FetchListing,

    /// Reading article links and the "load more" affordance
    ExtractLinks,

    /// Fetching every article of the page
    FetchArticles,

    /// Batching records, flushing and checkpointing
    FlushBatch,

    /// Moving to the next cursor
    Advance,

    /// Finished; no further transitions
    Terminate,
}

impl WalkState {
    /// Returns true if the walker may move from `self` to `next`
    ///
    /// Any non-terminal state may terminate. Otherwise the cycle is
    /// `Init → FetchListing → ExtractLinks → FetchArticles → FlushBatch → Advance → FetchListing`.
    pub fn can_transition_to(&self, next: WalkState) -> bool {
        use WalkState::*;

        match (self, next) {
            (Terminate, _) => false,
            (_, Terminate) => true,
            (Init, FetchListing) => true,
            (FetchListing, ExtractLinks) => true,
            (ExtractLinks, FetchArticles) => true,
            (FetchArticles, FlushBatch) => true,
            (FlushBatch, Advance) => true,
            (Advance, FetchListing) => true,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminate)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::FetchListing => "fetch_listing",
            Self::ExtractLinks => "extract_links",
            Self::FetchArticles => "fetch_articles",
            Self::FlushBatch => "flush_batch",
            Self::Advance => "advance",
            Self::Terminate => "terminate",
        }
    }
}

impl fmt::Display for WalkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a walk stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// The last listing page had no "load more" affordance
    Completed,

    /// A page-level or checkpoint-level error stopped the walk
    Failed(String),

    /// A shutdown was requested; the in-flight page was finished first
    Interrupted,

    /// The configured page limit was reached
    PageLimitReached,
}

impl TerminationReason {
    /// Returns true for every reason except `Failed`
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
            Self::Interrupted => f.write_str("interrupted"),
            Self::PageLimitReached => f.write_str("page limit reached"),
        }
    }
}
