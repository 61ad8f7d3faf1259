pub mod campaign;
pub mod config;
pub mod digest;
pub mod engine;
pub mod events;
pub mod export;
pub mod report;
pub mod requests;
pub mod store;
pub mod target;
pub mod tools;

pub mod prelude {
    pub use crate::campaign::{Campaign, CampaignError};
    pub use crate::config::CampaignConfig;
    pub use crate::digest::{HashDigest, PasswordLength};
    pub use crate::events::{EventLog, EventSink};
    pub use crate::tools::{ProcessRunner, ToolRunner};
}
