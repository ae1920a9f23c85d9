mod journal;
mod records;

pub use journal::RecordEventStore;
pub use records::InMemoryRecordStore;
