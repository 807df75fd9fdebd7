//! Post-generation filters applied to raw calculator output (spec §4.7):
//! correlation pruning, diversity capping, tag-based exclusion, and the
//! persisted dismissed-filter list.

use std::collections::{HashMap, HashSet};

use crate::domain::ids::Isin;
use crate::domain::opportunity::ActionCandidate;
use crate::domain::security::Security;

/// Drops candidates whose ISIN appears in the dismissed-filter set for its
/// originating calculator (spec §4.7).
pub fn exclude_dismissed(candidates: Vec<ActionCandidate>, dismissed: &HashSet<(Isin, String)>) -> Vec<ActionCandidate> {
    candidates
        .into_iter()
        .filter(|c| !dismissed.contains(&(c.isin.clone(), format!("{:?}", c.category))))
        .collect()
}

/// Drops candidates for securities carrying any tag in `excluded_tags`
/// (spec §4.7 "tag-based filter").
pub fn exclude_by_tag(
    candidates: Vec<ActionCandidate>,
    securities: &HashMap<String, Security>,
    excluded_tags: &HashSet<String>,
) -> Vec<ActionCandidate> {
    candidates
        .into_iter()
        .filter(|c| {
            securities
                .get(c.isin.as_str())
                .map(|s| s.tags.is_disjoint(excluded_tags))
                .unwrap_or(true)
        })
        .collect()
}

/// Caps how many candidates from the same industry/country group survive,
/// keeping the highest-priority ones (spec §4.7 "correlation pruning" /
/// "diversity filter" collapsed into one pass since both bound group
/// concentration).
pub fn cap_per_group(
    mut candidates: Vec<ActionCandidate>,
    securities: &HashMap<String, Security>,
    group_of: impl Fn(&Security) -> Option<String>,
    max_per_group: usize,
) -> Vec<ActionCandidate> {
    candidates.sort_by(|a, b| b.priority.partial_cmp(&a.priority).unwrap_or(std::cmp::Ordering::Equal));
    let mut seen_per_group: HashMap<String, usize> = HashMap::new();
    candidates
        .into_iter()
        .filter(|c| {
            let Some(security) = securities.get(c.isin.as_str()) else {
                return true;
            };
            let Some(group) = group_of(security) else {
                return true;
            };
            let count = seen_per_group.entry(group).or_insert(0);
            *count += 1;
            *count <= max_per_group
        })
        .collect()
}
