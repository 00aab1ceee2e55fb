pub mod build_number;
pub mod ide_version;

pub use build_number::{is_wildcard_or_snapshot, BuildNumber, Marker};
pub use ide_version::IdeVersionSpec;
