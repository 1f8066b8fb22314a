/// Facility registry for the GB gas storage chart.
///
/// Defines the storage and LNG sites published by the National Gas data
/// portal, the category each belongs to, and the publication object IDs
/// requested for each metric. This is the single source of truth for the
/// label → short-name display mapping; other modules should look facilities
/// up here rather than hardcoding names.

use crate::model::{FacilityLabel, Metric, StorageCategory};

// ---------------------------------------------------------------------------
// Publication object IDs
// ---------------------------------------------------------------------------

/// Object IDs for the "Opening Stock" series of every facility.
pub const OPENING_STOCK_IDS: &[&str] = &[
    "PUBOBJ2367", "PUBOBJ2372", "PUBOBJ2365", "PUBOBJ2369", "PUBOBJ2366", "PUBOBJ2368",
    "PUBOBJ2362", "PUBOBJ2361", "PUBOBJ2363", "PUBOBJ2364", "PUBOBJ2371", "PUBOBJ2370",
];

/// Object IDs for the "Available Capacity" series of every facility.
pub const AVAILABLE_CAPACITY_IDS: &[&str] = &[
    "PUBOBJ2431", "PUBOBJ2436", "PUBOBJ2429", "PUBOBJ2433", "PUBOBJ2430", "PUBOBJ2432",
    "PUBOBJ2426", "PUBOBJ2425", "PUBOBJ2427", "PUBOBJ2428", "PUBOBJ2435", "PUBOBJ2434",
];

/// The object IDs requested for a metric download.
pub fn publication_ids(metric: Metric) -> &'static [&'static str] {
    match metric {
        Metric::OpeningStock => OPENING_STOCK_IDS,
        Metric::AvailableCapacity => AVAILABLE_CAPACITY_IDS,
    }
}

// ---------------------------------------------------------------------------
// Facility metadata
// ---------------------------------------------------------------------------

/// A storage or LNG importation site.
pub struct Facility {
    /// Name exactly as it appears in API labels.
    pub name: &'static str,
    /// Short name shown in the chart hover label.
    pub short_name: &'static str,
    pub category: StorageCategory,
}

/// All facilities published by the portal, alphabetical.
pub static FACILITY_REGISTRY: &[Facility] = &[
    Facility { name: "Aldbrough", short_name: "Aldbrough", category: StorageCategory::MediumRange },
    Facility { name: "Dragon", short_name: "Dragon", category: StorageCategory::LngImportation },
    Facility { name: "Hatfield Moor", short_name: "Hatfield Moor", category: StorageCategory::MediumRange },
    Facility { name: "Hill Top", short_name: "Hill Top", category: StorageCategory::MediumRange },
    Facility { name: "Holehouse Farm", short_name: "Holehouse Farm", category: StorageCategory::MediumRange },
    Facility { name: "Holford", short_name: "Holford", category: StorageCategory::MediumRange },
    Facility { name: "Hornsea", short_name: "Hornsea", category: StorageCategory::MediumRange },
    Facility { name: "Humbly Grove", short_name: "Humbly Grove", category: StorageCategory::MediumRange },
    Facility { name: "Isle Of Grain", short_name: "Isle Of Grain", category: StorageCategory::LngImportation },
    Facility { name: "Rough", short_name: "Rough", category: StorageCategory::LongRange },
    Facility { name: "South Hook", short_name: "South Hook", category: StorageCategory::LngImportation },
    Facility { name: "Stublach", short_name: "Stublach", category: StorageCategory::MediumRange },
];

/// Looks up a facility by its API name. Returns `None` if not registered.
pub fn find_facility(name: &str) -> Option<&'static Facility> {
    FACILITY_REGISTRY.iter().find(|f| f.name == name)
}

/// Every full API label the registry expects for a metric, in registry
/// order.
pub fn expected_labels(metric: Metric) -> Vec<String> {
    FACILITY_REGISTRY
        .iter()
        .map(|f| {
            FacilityLabel {
                metric,
                facility: f.name.to_string(),
                category: f.category,
            }
            .data_item()
        })
        .collect()
}

/// Display name for a parsed label. Unregistered facilities fall back to
/// the name parsed from the label.
pub fn short_name(label: &FacilityLabel) -> String {
    find_facility(&label.facility)
        .map(|f| f.short_name.to_string())
        .unwrap_or_else(|| label.facility.clone())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
