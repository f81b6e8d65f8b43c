//! # Infra Store
//!
//! Persistence interfaces used by the price feed engine.
//!
//! - [`PriceStore`]: append-only record of generated price samples, with
//!   latest-value lookup and time-range queries.
//! - [`ConfigStore`]: instrument definitions and one model configuration per
//!   model type per instrument.
//!
//! [`MemoryStore`] implements both traits over in-process maps. It backs the
//! server binary and every engine test; a database backend would implement
//! the same traits.

pub mod error;
pub mod memory;
pub mod records;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use records::{InstrumentRecord, PriceSample};
pub use traits::{ConfigStore, PriceStore};
