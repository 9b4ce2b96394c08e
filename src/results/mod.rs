//! Applied-unit records and their lookup index.
//!
//! Every plan component yields a [`Unit`]: the construct it attached to the
//! synthesis tree plus an optional typed payload. The [`ResultIndex`] keeps
//! units in insertion order and indexes them by resource name and by the
//! parent derived from their construct path.

mod index;
mod node;

pub use index::{ResultIndex, ResultNode};
pub use node::{ConstructNode, Unit};
