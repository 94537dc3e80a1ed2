//! Probe request fingerprinting.
//!
//! Decodes the information elements of 802.11 Probe Requests into a canonical
//! [`Fingerprint`] and measures how identifying each fingerprint is within the
//! population seen in a capture.
//!
//! ```
//! use probemark::{Aggregator, FrameWalker, TagRegistry};
//!
//! let registry = TagRegistry::new();
//! let walker = FrameWalker::new(&registry);
//! let mut aggregator = Aggregator::new();
//!
//! // SSID (wildcard) + Supported Rates
//! let body = [0x00, 0x00, 0x01, 0x03, 0x82, 0x84, 0x0C];
//! let walk = walker.walk(&body);
//! assert!(walk.is_clean());
//! assert!(aggregator.add_fingerprint(walk.fingerprint));
//! assert_eq!(aggregator.entropy().population_size(), 1);
//! ```

pub mod aggregator;
pub mod elements;
pub mod entropy;
pub mod error;
pub mod fingerprint;
pub mod tags;
pub mod walker;

pub use aggregator::{Aggregator, Distinctive, SharedAggregator};
pub use entropy::{EntropyEngine, Field, FieldValue};
pub use error::{DecodeError, EntropyError, RegistryMiss};
pub use fingerprint::Fingerprint;
pub use tags::{TagId, TagRegistry};
pub use walker::{FrameWalker, Walk};
