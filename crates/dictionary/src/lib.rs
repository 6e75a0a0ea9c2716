//! Character dictionary facets.
//!
//! This crate holds the pure, synchronous half of namedict:
//! - Fixed facet categories and their value ordering
//! - Records and the bundle they are loaded from
//! - The precomputed inverted facet index
//! - The faceted filter engine and latest-wins cancellation tokens

pub mod bundle;
pub mod cancel;
pub mod category;
pub mod error;
pub mod filter;
pub mod index;
pub mod record;

pub use bundle::Dictionary;
pub use cancel::{CancellationToken, VersionTracker};
pub use category::{sort_index_values, IndexCategory, ValueSort};
pub use error::{DictionaryError, Result};
pub use filter::{filter_ids, filter_ids_cancellable, Selection};
pub use index::{FacetIndex, IdSet, RawIndex};
pub use record::{DictEntry, Phonetics, RecordId, Structure};
