//! Output layer: per-unit record sinks and the run archive.

pub mod archive;
pub mod record;
pub mod sink;

pub use archive::ArchiveBuilder;
pub use record::{text_from_bytes, Record};
pub use sink::RecordSink;
