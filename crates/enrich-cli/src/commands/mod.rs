//! CLI command implementations.

pub mod approve;
pub mod attributes;
pub mod enqueue;
pub mod entity;
pub mod history;
pub mod jobs;
pub mod reject;
pub mod rerun;
pub mod show;
pub mod values;
pub mod work;

use std::sync::Arc;

use colored::{ColoredString, Colorize};
use tracing::debug;

use enrich::{
    AttributeRegistry, EnrichConfig, JobStatus, ModerationController, SqliteStore, ValueCodec,
};

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Store, codec and controller opened from one configuration.
pub struct Context {
    pub store: Arc<SqliteStore>,
    pub codec: ValueCodec,
    pub controller: ModerationController,
}

impl Context {
    pub async fn open(config: &EnrichConfig) -> Result<Self, Box<dyn std::error::Error>> {
        config.validate()?;
        let store = Arc::new(SqliteStore::connect(&config.database_url).await?);
        debug!(database_url = %config.database_url, "Opened store");
        let codec = ValueCodec::new(Arc::new(AttributeRegistry::builtin()))
            .with_rating_policy(config.rating_policy);
        let controller = ModerationController::from_config(store.clone(), codec.clone(), config);
        Ok(Self {
            store,
            codec,
            controller,
        })
    }
}

/// Status label colored by outcome.
pub fn status_colored(status: JobStatus) -> ColoredString {
    match status {
        JobStatus::Pending => status.as_str().white(),
        JobStatus::Processing => status.as_str().cyan(),
        JobStatus::AwaitingReview => status.as_str().yellow(),
        JobStatus::Approved => status.as_str().green(),
        JobStatus::Rejected => status.as_str().magenta(),
        JobStatus::Failed => status.as_str().red(),
    }
}
