//! Configuration: vault options parsed at `init`, and tool settings
//! read from `propvault.toml`.

pub mod options;
pub mod settings;

pub use options::VaultConfiguration;
pub use settings::Settings;
