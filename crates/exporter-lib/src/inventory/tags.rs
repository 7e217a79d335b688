//! Tag filters derived from one inventory pass

use crate::models::{
    StorageClaim, Workload, NAMESPACE_NAME_TAG, POD_NAME_TAG, RESOURCE_ID_TAG,
};
use std::collections::{BTreeMap, HashSet};

/// Alternation separator understood by Hawkular tag queries
pub const TAG_SEPARATOR: &str = "||";

/// Prefix of volume resource ids in Hawkular
pub const VOLUME_MARKER: &str = "Volume:";

/// An immutable set of tag constraints for a descriptor query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    tags: BTreeMap<String, String>,
}

impl TagFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Render as the `tags` query parameter: `k1:v1,k2:v2`
    pub fn to_query(&self) -> String {
        self.tags
            .iter()
            .map(|(k, v)| format!("{}:{}", k, v))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// True when a selector tag is empty, so no series can match
    pub fn is_unsatisfiable(&self) -> bool {
        [POD_NAME_TAG, RESOURCE_ID_TAG]
            .iter()
            .any(|key| matches!(self.get(key), Some("")))
    }
}

/// Join workload names with the tag separator
///
/// Yields an empty string when there are no workloads.
pub fn build_pods_tag(workloads: &[Workload]) -> String {
    workloads
        .iter()
        .map(|w| w.name.as_str())
        .collect::<Vec<_>>()
        .join(TAG_SEPARATOR)
}

/// Join `Volume:<name>` for every attachment whose claim exists
pub fn build_vol_tag(workloads: &[Workload], claims: &[StorageClaim]) -> String {
    let claim_names: HashSet<&str> = claims.iter().map(|c| c.name.as_str()).collect();

    workloads
        .iter()
        .flat_map(|w| w.attachments.iter())
        .filter(|a| claim_names.contains(a.claim_name.as_str()))
        .map(|a| format!("{}{}", VOLUME_MARKER, a.name))
        .collect::<Vec<_>>()
        .join(TAG_SEPARATOR)
}

/// The two descriptor filters of a scrape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeFilters {
    /// Pod and container series of the listed workloads
    pub workload: TagFilter,
    /// Volume series of the listed workloads
    pub storage: TagFilter,
}

impl ScrapeFilters {
    pub fn build(namespace: &str, workloads: &[Workload], claims: &[StorageClaim]) -> Self {
        let pods_tag = build_pods_tag(workloads);
        let vol_tag = build_vol_tag(workloads, claims);

        let workload = TagFilter::new()
            .with(NAMESPACE_NAME_TAG, namespace)
            .with(POD_NAME_TAG, pods_tag)
            .with("type", "pod");
        let storage = workload.clone().with(RESOURCE_ID_TAG, vol_tag);

        Self { workload, storage }
    }
}
