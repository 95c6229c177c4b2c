//! # Staging Map
//!
//! A bounded, blocking key → tuple store for handing records between
//! producer and consumer threads.
//!
//! ## Core idea
//! Every key maps to a tuple with a fixed number of slots. Producers may
//! fill a key's slots across several puts; the tuple only becomes visible
//! once the last slot lands. Consumers block until the key they want (or
//! any key) is visible. Producers block when the map holds too many entries
//! or too many bytes, so a fast producer cannot run away from a slow
//! consumer.
//!
//! Note that [`StagingMap::get`] removes the entry it returns, just like
//! [`StagingMap::pop`].
//!
//! ```
//! use staging_map::StagingMap;
//!
//! let map: StagingMap<&str, String> = StagingMap::new(2, 0, 0);
//! map.put("a", &[1], vec!["x".into()]).unwrap();
//! assert_eq!(map.incomplete_size(), 1);
//!
//! map.put("a", &[0], vec!["y".into()]).unwrap();
//! assert_eq!(map.size(), 1);
//!
//! assert_eq!(map.get(&"a"), vec!["y".to_string(), "x".to_string()]);
//! assert_eq!(map.size(), 0);
//! ```

pub mod error;
pub mod layout;
pub mod options;
pub mod registry;
pub mod staging;
pub mod types;

// Public re-exports for the top-level API
pub use error::{Error, Result};
pub use layout::{Layout, Ordered, Unordered};
pub use options::Options;
pub use registry::Registry;
pub use staging::{StagingMap, Stats};
pub use types::{ByteSize, Tuple};
