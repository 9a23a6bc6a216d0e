// Re-export all items from the submodules
mod collection_options;

pub use collection_options::{
    CollectionOptions,
    DirListOptions,
    HashAlgorithm,
    OutputFormat,
    load_or_default,
};
