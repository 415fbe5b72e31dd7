//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use uuid::Uuid;

use enrich::{RatingPolicy, Tier};

/// Enrich: moderated AI enrichment for venue attributes
#[derive(Parser)]
#[command(name = "enrich")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// SQLite database URL
    #[arg(
        long,
        global = true,
        env = "ENRICH_DATABASE_URL",
        default_value = "sqlite://enrich.db"
    )]
    pub database_url: String,

    /// How out-of-range ratings are handled (reject, clamp, unchecked)
    #[arg(long, global = true, default_value = "reject")]
    pub rating_policy: RatingPolicyChoice,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create or update an entity, optionally setting attribute values
    Entity {
        /// Entity ID
        id: String,

        /// Display name
        name: String,

        /// Current description
        #[arg(short, long)]
        description: Option<String>,

        /// Attribute value as CODE=JSON (repeatable), e.g. wifi=true
        #[arg(long = "set", value_name = "CODE=JSON")]
        values: Vec<String>,
    },

    /// Queue an enrichment job for an entity
    Enqueue {
        /// Entity ID
        entity_id: String,

        /// Job type (description, attributes, full_enrichment, faq, schema, insight)
        #[arg(default_value = "full_enrichment")]
        job_type: String,

        /// Caller input as JSON
        #[arg(long)]
        input: Option<String>,
    },

    /// Process pending jobs with the built-in stub generator
    Work {
        /// Jobs pulled per batch
        #[arg(long, env = "ENRICH_BATCH_LIMIT", default_value = "5")]
        batch_limit: usize,

        /// Jobs processed concurrently
        #[arg(long, env = "ENRICH_WORKERS", default_value = "4")]
        workers: usize,

        /// Keep pulling batches until the queue is empty
        #[arg(long)]
        until_idle: bool,
    },

    /// List jobs, newest first
    Jobs {
        /// Filter by status (pending, processing, awaiting_review, approved, rejected, failed)
        #[arg(short, long)]
        status: Option<String>,

        /// Filter by entity ID
        #[arg(short, long)]
        entity: Option<String>,

        /// Filter by job type
        #[arg(short = 't', long = "type")]
        job_type: Option<String>,

        /// Maximum number of jobs
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a job and the changes approving it would apply
    Show {
        /// Job ID
        job_id: Uuid,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Approve a job and apply its changes
    Approve {
        /// Job ID
        job_id: Uuid,

        /// Moderator recorded on the job and in history
        #[arg(short, long, env = "ENRICH_MODERATOR")]
        moderator: String,
    },

    /// Reject a job without touching the entity
    Reject {
        /// Job ID
        job_id: Uuid,

        /// Moderator making the decision
        #[arg(short, long, env = "ENRICH_MODERATOR")]
        moderator: String,

        /// Reason stored on the job
        #[arg(short, long)]
        reason: Option<String>,
    },

    /// Reset a finished job to pending
    Rerun {
        /// Job ID
        job_id: Uuid,
    },

    /// Print the change history of an entity
    History {
        /// Entity ID
        entity_id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print stored attribute values with their source and verification time
    Values {
        /// Entity ID
        entity_id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List registered attributes
    Attributes {
        /// Only show one tier (1, 2 or 3)
        #[arg(long)]
        tier: Option<TierChoice>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Rating policy choice
#[derive(Clone, Copy, Debug, Default)]
pub struct RatingPolicyChoice(pub RatingPolicy);

impl std::str::FromStr for RatingPolicyChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reject" => Ok(RatingPolicyChoice(RatingPolicy::Reject)),
            "clamp" => Ok(RatingPolicyChoice(RatingPolicy::Clamp)),
            "unchecked" => Ok(RatingPolicyChoice(RatingPolicy::Unchecked)),
            _ => Err(format!(
                "Unknown rating policy: {}. Use reject, clamp, or unchecked.",
                s
            )),
        }
    }
}

/// Attribute tier choice
#[derive(Clone, Copy, Debug)]
pub struct TierChoice(pub Tier);

impl std::str::FromStr for TierChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().trim_start_matches("tier") {
            "1" => Ok(TierChoice(Tier::Tier1)),
            "2" => Ok(TierChoice(Tier::Tier2)),
            "3" => Ok(TierChoice(Tier::Tier3)),
            _ => Err(format!("Unknown tier: {}. Use 1, 2, or 3.", s)),
        }
    }
}
