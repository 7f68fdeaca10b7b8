pub mod cas;
pub mod content;
pub mod data_type;
pub mod error;
pub mod expiry;
pub mod options;
pub mod result;
pub mod scan;
pub mod status;
pub mod store;

pub use cas::Cas;
pub use content::Content;
pub use data_type::DataType;
pub use error::{KvError, Operation};
pub use expiry::Expiry;
pub use options::{
    Durability, GetOptions, InsertOptions, RemoveOptions, ReplaceOptions, UpsertOptions,
};
pub use result::{GetResult, MutationResult, MutationToken};
pub use scan::{ScanTerm, ScanType};
pub use status::Status;
pub use store::DocumentStore;
