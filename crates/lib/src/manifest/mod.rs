//! Profile manifests: the declarative contents of one generation.

mod transaction;
mod types;

pub use transaction::ManifestTransaction;
pub use types::{MANIFEST_FILENAME, MANIFEST_VERSION, Manifest, ManifestEntry, ManifestError, ManifestPattern, StorePath};
