//! Step planner.
//!
//! Maps a task description to an ordered checklist via case-insensitive
//! keyword matching. Deterministic and pure; no external calls.

use super::task::Step;

const NFT_STEPS: &[&str] = &[
    "Initialize NFT module structure",
    "Implement metadata handling",
    "Add minting functionality",
    "Implement royalty fee mechanism",
    "Add transfer restrictions",
    "Set up ownership tracking",
    "Write unit tests",
    "Deploy and verify",
];

const SWAP_STEPS: &[&str] = &[
    "Set up token swap module",
    "Implement price calculation",
    "Add slippage protection",
    "Implement swap execution",
    "Add error handling",
    "Write unit tests",
    "Deploy and verify",
];

const GENERIC_STEPS: &[&str] = &[
    "Analyze requirements",
    "Design solution",
    "Implement core functionality",
    "Add error handling",
    "Write tests",
    "Deploy and verify",
];

/// Expand a task description into its step checklist.
///
/// Descriptions mentioning "nft" get the NFT checklist, "swap" the swap
/// checklist, anything else (including an empty description) the generic
/// one. All steps start pending with no result.
pub fn plan_steps(description: &str) -> Vec<Step> {
    let lowered = description.to_lowercase();

    let checklist = if lowered.contains("nft") {
        NFT_STEPS
    } else if lowered.contains("swap") {
        SWAP_STEPS
    } else {
        GENERIC_STEPS
    };

    checklist.iter().map(|s| Step::pending(*s)).collect()
}
