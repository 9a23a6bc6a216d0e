//! Utility functions shared by the identity resolvers and the units.
//!
//! ## Components
//!
//! - **Hashing**: SHA-256 calculation for file integrity
//! - **Stat**: file metadata in record form
//! - **Plist**: string lookups in property lists
//! - **Command**: capturing output of system tools
//! - **Summary**: run summary and reporting
//!
//! ### Generating File Hashes
//!
//! ```no_run
//! use mac_triage::utils::hash::calculate_sha256;
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! let file_path = Path::new("/evidence/suspicious.bin");
//!
//! match calculate_sha256(file_path, 10)? {
//!     Some(hash) => println!("SHA-256: {}", hash),
//!     None => println!("File empty or over the size limit"),
//! }
//! # Ok(())
//! # }
//! ```

/// Run summary generation and reporting
pub mod summary;

/// Cryptographic hash calculation utilities
pub mod hash;

/// File metadata formatting
pub mod stat;

/// Property list lookups
pub mod plist;

/// External command execution
pub mod command;
