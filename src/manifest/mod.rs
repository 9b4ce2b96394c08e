//! Synthesized manifests: envelopes, the `ClientSideApply` document and
//! discovery into locality-ordered bundles.

mod bundle;
mod component;
mod types;

pub use bundle::{Manifest, ManifestBundle, bundle_directory, discover, is_manifest_file};
pub use component::ClientSideApply;
pub use types::{
    Action, ClientSideApplyManifest, ClientSideApplySpec, Envelope, LOCAL_API_VERSION, LOCAL_KIND,
    ManifestMetadata, OnFailure,
};
