pub mod status;

pub use status::{CollectionResult, CollectorStatus, CredentialStatus, FactionError};
