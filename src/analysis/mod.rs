/// Data preparation for the storage chart.
///
/// Submodules:
/// - `cleaning`: parses dates and labels, drops duplicates and unused columns.
/// - `groupings`: regroups per-metric tables into per-category tables.
/// - `window`: date-window and staleness checks on cleaned data.

pub mod cleaning;
pub mod groupings;
pub mod window;
