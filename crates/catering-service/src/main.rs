//! Main entry point for the catering orchestrator service.
//!
//! This binary loads the configuration, builds the orchestration engine
//! with the HTTP provider adapters it describes and runs the engine next
//! to the API server until interrupted. The API server carries both the
//! customer-facing order endpoints and the provider-facing webhook
//! endpoint.

use catering_config::Config;
use catering_core::OrchestratorBuilder;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

mod server;

/// Command-line arguments for the orchestrator service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started orchestrator");

	let config_path = args
		.config
		.to_str()
		.ok_or("configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.orchestrator.id);

	let engine = Arc::new(OrchestratorBuilder::new(config.clone()).build()?);

	let api_enabled = config.api.as_ref().is_some_and(|api| api.enabled);
	if api_enabled {
		let api_config = config
			.api
			.clone()
			.ok_or("api section vanished after the enabled check")?;
		let api_engine = Arc::clone(&engine);

		tokio::select! {
			_ = engine.run() => {
				tracing::info!("Engine finished");
			}
			result = server::start_server(api_config, api_engine) => {
				tracing::info!("API server finished");
				result?;
			}
			_ = tokio::signal::ctrl_c() => {
				tracing::info!("Interrupt received, shutting down");
				engine.shutdown();
			}
		}
	} else {
		tracing::info!("Starting engine only");
		tokio::select! {
			_ = engine.run() => {}
			_ = tokio::signal::ctrl_c() => {
				tracing::info!("Interrupt received, shutting down");
				engine.shutdown();
			}
		}
	}

	tracing::info!("Stopped orchestrator");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn args_default_values() {
		let args = Args {
			config: PathBuf::from("config.toml"),
			log_level: "info".to_string(),
		};

		assert_eq!(args.config, PathBuf::from("config.toml"));
		assert_eq!(args.log_level, "info");
	}

	#[test]
	fn args_parse_custom_values() {
		let args =
			Args::parse_from(["catering", "--config", "custom.toml", "--log-level", "debug"]);

		assert_eq!(args.config, PathBuf::from("custom.toml"));
		assert_eq!(args.log_level, "debug");
	}
}
