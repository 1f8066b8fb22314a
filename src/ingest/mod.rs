/// Data source clients.
///
/// Submodules:
/// - `national_gas`: CSV downloads from the National Gas data portal.

pub mod national_gas;
