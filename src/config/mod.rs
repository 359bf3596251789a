// Re-export all items from the submodules
mod profiles;
mod storage_config;
mod transfer_config;

// Re-export transfer tuning
pub use transfer_config::TransferConfig;
pub(crate) use transfer_config::validate_link_expiry;

// Re-export backend addressing and credentials
pub use storage_config::StorageConfig;

// Re-export profile persistence
pub use profiles::{default_profile_dir, Profile, ProfileStore};
