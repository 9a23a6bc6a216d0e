//! Units that read state of the running system and cannot work on images.

pub mod netstat;
pub mod pslist;
