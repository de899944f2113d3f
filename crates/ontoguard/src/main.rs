use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;

use ontoguard::{open_validator, parse_context, resolve_config_path, OntoGuardConfig, RootError};

/// OntoGuard: ontology-backed policy validation
///
/// Answers "may role R perform action A on entity E?" against a policy
/// ontology, with explainable allow/deny decisions.
#[derive(Parser, Debug)]
#[command(name = "ontoguard", version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the policy ontology (overrides the configured path)
    #[arg(short, long, global = true)]
    ontology: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Ontology path to record in the configuration
        #[arg(long)]
        ontology_path: Option<PathBuf>,
    },

    /// Validate an action against the policy ontology
    Validate {
        /// Action name, any surface form (e.g. "delete user" or "DeleteUser")
        action: String,

        /// Entity class the action targets (e.g. "User")
        entity: String,

        /// Identifier of the specific entity instance
        #[arg(long, default_value = "")]
        entity_id: String,

        /// Role performing the action
        #[arg(short, long)]
        role: Option<String>,

        /// Context attributes as key=value pairs (numbers and booleans
        /// are detected by shape)
        #[arg(long = "ctx")]
        context: Vec<String>,
    },

    /// List actions the role may perform on an entity class
    Allowed {
        /// Entity class to list actions for
        entity: String,

        /// Role performing the actions
        #[arg(short, long)]
        role: Option<String>,

        /// Context attributes as key=value pairs
        #[arg(long = "ctx")]
        context: Vec<String>,
    },

    /// Check the role gate for an action, ignoring constraints
    Check {
        /// Action name
        action: String,

        /// Entity class the action targets
        entity: String,

        /// Role to check
        #[arg(short, long)]
        role: Option<String>,
    },

    /// Explain the rule behind an action
    Explain {
        /// Action name
        action: String,
    },
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("ontoguard=debug,ontoguard_policy=debug,ontoguard_ontology=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ontoguard=info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<OntoGuardConfig, RootError> {
    let path = resolve_config_path(cli.config.as_ref());
    let mut config = OntoGuardConfig::load(&path)?;
    if let Some(ontology) = &cli.ontology {
        config.ontology_path = ontology.clone();
    }
    Ok(config)
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), RootError> {
    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Init { ontology_path } => {
            let mut config = config;
            if let Some(path) = ontology_path {
                config.ontology_path = path.clone();
            }
            let save_path = cli
                .config
                .clone()
                .unwrap_or_else(OntoGuardConfig::default_config_path);
            config.save(&save_path)?;
            println!("OntoGuard initialized.");
            println!("  Ontology: {}", config.ontology_path.display());
            println!("  Config:   {}", save_path.display());
            Ok(())
        }

        Commands::Validate {
            action,
            entity,
            entity_id,
            role,
            context,
        } => {
            let validator = open_validator(&config)?;
            let ctx = parse_context(role.as_deref(), context)?;
            let result = validator.validate(action, entity, entity_id, &ctx);
            print_json(&result)
        }

        Commands::Allowed {
            entity,
            role,
            context,
        } => {
            let validator = open_validator(&config)?;
            let ctx = parse_context(role.as_deref(), context)?;
            let result = validator.allowed_actions(entity, &ctx);
            print_json(&result)
        }

        Commands::Check {
            action,
            entity,
            role,
        } => {
            let validator = open_validator(&config)?;
            let result = validator.check_permissions(action, entity, role.as_deref());
            print_json(&result)
        }

        Commands::Explain { action } => {
            let validator = open_validator(&config)?;
            let result = validator.explain_rule(action);
            print_json(&result)
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), RootError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
