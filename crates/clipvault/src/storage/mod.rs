pub mod filesystem;
pub mod hasher;
pub mod quota;

pub use filesystem::FileStorage;
pub use hasher::{hash_file, hash_reader, Fingerprint};
pub use quota::{QuotaEnforcer, ReclaimReport};
