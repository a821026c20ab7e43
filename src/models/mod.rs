pub mod entry;

pub use entry::{CreateEntryRequest, EntryId, EntryIdGenerator, EntryQuery, Mood, WellnessEntry};
