//! GB gas storage reporting: downloads the National Gas opening stock and
//! available capacity series, cleans them, splits them by storage category
//! and builds a three-panel stacked bar chart.

pub mod analysis;
pub mod chart;
pub mod config;
pub mod dev_mode;
pub mod facilities;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod verify;
