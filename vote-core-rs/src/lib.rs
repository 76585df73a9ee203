//! Vote Core Library
//!
//! Multi-voter priority arbitration for shared power parameters (charger
//! current limits, rail voltages, display/power state).
//!
//! Many independent producers ("voters") each assert a desired value for one
//! parameter. A [`Vote`] resolves the single effective value and notifies its
//! consumer exactly when that value changes.
//!
//! ```text
//!  thermal ─┐
//!  usb ─────┼─► Vote "chg_current" (min) ──► callback(500) ──► charger
//!  jeita ───┘      │
//!                  ├─ init  (always active, lowest priority)
//!                  └─ force (diagnostic override, highest priority)
//! ```
//!
//! ## Usage
//!
//! ```
//! use vote_core::{CallbackResult, Policy, Registry, VoteBuilder};
//!
//! let registry = Registry::new();
//! let vote = VoteBuilder::ordered("chg_current", Policy::Min)
//!     .voters(["thermal", "usb"])
//!     .create(&registry, 2000i64, |ma: &i64| -> CallbackResult {
//!         println!("apply {} mA", ma);
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! vote.set(0, true, 1000).unwrap();
//! vote.set(1, true, 500).unwrap();
//! assert_eq!(vote.get_result().unwrap(), 500);
//! ```

pub mod types;
pub mod error;
pub mod pqueue;
pub mod vote;
pub mod registry;
pub mod diag;
pub mod config;

pub use types::*;
pub use error::{VoteError, VoteResult};
pub use pqueue::PriorityQueue;
pub use vote::{Vote, VoteBuilder};
pub use registry::{global, Registry};
pub use diag::{Diagnostics, VoteSnapshot, VoterSnapshot};
pub use config::{VoteConfig, VoterConfig};
