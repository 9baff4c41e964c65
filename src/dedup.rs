// src/dedup.rs
//! Exact-match dedup on `(project, amount_raised)`. First occurrence wins.
//! No normalization: "Acme"/"ACME" or "5M"/"$5,000,000" stay distinct.

use metrics::counter;
use std::collections::HashSet;

use crate::extract::types::Announcement;

/// Returns `(kept, dropped_count)`; kept preserves first-occurrence order.
pub fn dedup_announcements(announcements: Vec<Announcement>) -> (Vec<Announcement>, usize) {
    let mut seen: HashSet<(String, String)> = HashSet::with_capacity(announcements.len());
    let mut keep = Vec::with_capacity(announcements.len());
    let mut dropped = 0usize;

    for a in announcements {
        let (project, amount) = a.identity_key();
        if !seen.insert((project.to_string(), amount.to_string())) {
            tracing::debug!(project = %a.project, amount = %a.amount_raised, link = %a.link, "duplicate announcement dropped");
            dropped += 1;
            continue;
        }
        keep.push(a);
    }

    counter!("funding_dedup_dropped_total").increment(dropped as u64);
    (keep, dropped)
}

/// Convenience wrapper when the drop count is not needed.
pub fn dedup(announcements: Vec<Announcement>) -> Vec<Announcement> {
    dedup_announcements(announcements).0
}
