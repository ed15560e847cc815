//! Eligibility selection for a single stage pass.
//!
//! Selection is a pure function over already-loaded rows so it can be
//! reasoned about and tested without a database.

use crate::topic::{Stage, Topic};

/// Picks the topics a pass may claim for `stage`, oldest first, capped at
/// `cap`. A topic qualifies when the stage itself is claimable (not started
/// or failed) and every earlier stage is done.
///
/// The input order is preserved; callers load rows ordered by `created_at`
/// and the gate never reorders them.
pub fn select_eligible<'a>(topics: &'a [Topic], stage: Stage, cap: usize) -> Vec<&'a Topic> {
    topics
        .iter()
        .filter(|topic| topic.is_eligible(stage))
        .take(cap)
        .collect()
}
