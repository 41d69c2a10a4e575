mod config;
mod ids;
mod meta;
mod resolve;
mod sign;

pub use config::cmd_config;
pub use ids::cmd_ids;
pub use meta::cmd_meta;
pub use resolve::cmd_resolve;
pub use sign::cmd_sign;
