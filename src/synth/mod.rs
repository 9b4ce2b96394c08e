//! Manifest synthesis.
//!
//! Components declare charts and resources; a [`SynthesisEngine`] holds the
//! resulting construct tree and serializes it to a manifest directory. The
//! engine is owned by a single worker reached through a [`SynthesisHandle`],
//! so every mutation of the tree goes through one request queue.

mod chart;
mod engine;
mod resolver;
mod worker;

pub use chart::Chart;
pub use engine::{SynthesisEngine, YamlSynthesizer};
pub use resolver::{
    ImagePullSecrets, ManifestResolver, NameResolver, PRIORITY_DEFAULT, PRIORITY_HIGH,
    PRIORITY_LOW, sort_resolvers,
};
pub use worker::SynthesisHandle;
