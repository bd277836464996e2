pub mod harvest_error;

pub use harvest_error::HarvestError;
