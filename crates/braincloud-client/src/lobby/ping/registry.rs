//! Region registry
//!
//! Holds the probeable regions from the most recent `GET_REGIONS_FOR_LOBBIES`
//! response. Every update replaces the whole set; readers get an immutable
//! snapshot, so a ping session that already started keeps working from the
//! regions it was started with.

use arc_swap::ArcSwap;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Region descriptor type that marks an entry as probeable
pub const PING_REGION_TYPE: &str = "PING";

/// A probeable server region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionDescriptor {
    /// Region identifier
    pub name: String,
    /// HTTP endpoint timed by the probes
    pub target_url: String,
}

/// Snapshot of registered regions, in server response order
pub type RegionSnapshot = Arc<Vec<RegionDescriptor>>;

/// Latest set of probeable regions
#[derive(Debug)]
pub struct RegionRegistry {
    regions: ArcSwap<Vec<RegionDescriptor>>,
}

impl RegionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            regions: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Replace the registered regions with the `PING` entries of `raw`
    ///
    /// `raw` is the `regionPingData` object mapping region names to
    /// `{"type": ..., "target": ...}` descriptors. Entries of any other type
    /// and malformed entries are skipped. Returns the number of regions kept.
    pub fn set_regions(&self, raw: &Value) -> usize {
        let regions: Vec<RegionDescriptor> = match raw.as_object() {
            Some(map) => map
                .iter()
                .filter_map(|(name, entry)| parse_descriptor(name, entry))
                .collect(),
            None => {
                debug!("region ping data is not an object, clearing registry");
                Vec::new()
            }
        };

        let count = regions.len();
        self.regions.store(Arc::new(regions));
        debug!(regions = count, "region registry updated");
        count
    }

    /// Populate from a full `GET_REGIONS_FOR_LOBBIES` response
    pub fn set_from_response(&self, response: &Value) -> usize {
        let raw = response
            .pointer("/data/regionPingData")
            .unwrap_or(&Value::Null);
        self.set_regions(raw)
    }

    /// Current snapshot
    pub fn regions(&self) -> RegionSnapshot {
        self.regions.load_full()
    }

    /// Whether no probeable region is registered
    pub fn is_empty(&self) -> bool {
        self.regions.load().is_empty()
    }

    /// Number of probeable regions
    pub fn len(&self) -> usize {
        self.regions.load().len()
    }
}

impl Default for RegionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_descriptor(name: &str, entry: &Value) -> Option<RegionDescriptor> {
    let region_type = entry.get("type").and_then(Value::as_str);
    if region_type != Some(PING_REGION_TYPE) {
        debug!(region = name, ?region_type, "skipping non-ping region");
        return None;
    }

    let Some(target) = entry.get("target").and_then(Value::as_str) else {
        debug!(region = name, "skipping region without target");
        return None;
    };

    let Some(target_url) = normalize_target(target) else {
        debug!(region = name, target, "skipping region with invalid target");
        return None;
    };

    Some(RegionDescriptor {
        name: name.to_string(),
        target_url,
    })
}

/// Turn a descriptor target into an absolute http(s) URL.
/// Bare hosts are probed over plain http.
fn normalize_target(target: &str) -> Option<String> {
    let target = target.trim();
    if target.is_empty() {
        return None;
    }

    let parsed = if target.contains("://") {
        Url::parse(target).ok()?
    } else {
        Url::parse(&format!("http://{target}")).ok()?
    };

    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Some(parsed.to_string()),
        _ => None,
    }
}
