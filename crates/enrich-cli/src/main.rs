//! Enrich CLI - moderation driver for AI enrichment jobs.

mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use enrich::EnrichConfig;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let config = EnrichConfig::new()
        .with_database_url(cli.database_url.clone())
        .with_rating_policy(cli.rating_policy.0);

    let result = match cli.command {
        Commands::Entity {
            id,
            name,
            description,
            values,
        } => commands::entity::run(&config, id, name, description, values).await,

        Commands::Enqueue {
            entity_id,
            job_type,
            input,
        } => commands::enqueue::run(&config, entity_id, job_type, input).await,

        Commands::Work {
            batch_limit,
            workers,
            until_idle,
        } => {
            let config = config
                .with_batch_limit(batch_limit)
                .with_worker_concurrency(workers);
            commands::work::run(&config, until_idle).await
        }

        Commands::Jobs {
            status,
            entity,
            job_type,
            limit,
            json,
        } => commands::jobs::run(&config, status, entity, job_type, limit, json).await,

        Commands::Show { job_id, json } => commands::show::run(&config, job_id, json).await,

        Commands::Approve { job_id, moderator } => {
            commands::approve::run(&config, job_id, moderator).await
        }

        Commands::Reject {
            job_id,
            moderator,
            reason,
        } => commands::reject::run(&config, job_id, moderator, reason).await,

        Commands::Rerun { job_id } => commands::rerun::run(&config, job_id).await,

        Commands::History { entity_id, json } => {
            commands::history::run(&config, entity_id, json).await
        }

        Commands::Values { entity_id, json } => {
            commands::values::run(&config, entity_id, json).await
        }

        Commands::Attributes { tier, json } => {
            commands::attributes::run(tier.map(|t| t.0), json, cli.verbose)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool, json: bool) {
    let level = if verbose { "enrich=debug" } else { "enrich=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
