//! Duplicate account resolution.
//!
//! A run detects live leaf accounts sharing a normalized code, ranks each
//! group by usage, folds the duplicates into the top-ranked account and
//! finally installs the code guard. Groups are independent: one failing
//! group is rolled back without touching the others.

pub mod detect;
pub mod plan;
pub mod rank;

pub use detect::{Detection, DuplicateGroup, detect_duplicates};
pub use plan::{GroupOutcome, MergePlan, MergeSummary, ResolutionReport, plan_merge};
pub use rank::{RankedCandidate, ReferenceCounter, UsageTally, rank_candidates};
