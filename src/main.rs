use antigravity::cli::commands::{CliArgs, Commands};
use antigravity::cli::handlers::{
    handle_diff, handle_generate, handle_profiles, handle_providers, handle_validate, EXIT_FAILED,
};
use antigravity::util::logging::{init_logging, parse_level, LoggingConfig};
use antigravity::{GeneratorConfig, VERSION};

use clap::Parser;
use std::env;
use tracing::{debug, Level};

fn main() {
    let args = CliArgs::parse();

    let config = match GeneratorConfig::from_env().and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(EXIT_FAILED);
        }
    };
    init_logging_from_args(&args, &config);

    debug!("antigravity v{} starting", VERSION);
    debug!("Arguments: {:?}", args);
    debug!("{}", config);

    let exit_code = match &args.command {
        Commands::Generate(generate_args) => handle_generate(generate_args, &config),
        Commands::Validate(validate_args) => handle_validate(validate_args, &config),
        Commands::Providers(providers_args) => handle_providers(providers_args),
        Commands::Profiles(profiles_args) => handle_profiles(profiles_args, &config),
        Commands::Diff(diff_args) => handle_diff(diff_args, &config),
    };

    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs, config: &GeneratorConfig) {
    let level = if let Some(level_str) = &args.log_level {
        parse_level(level_str)
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        parse_level(&config.log_level)
    };

    let use_json = env::var("ANTIGRAVITY_LOG_JSON")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    init_logging(LoggingConfig {
        level,
        use_json,
        ..LoggingConfig::default()
    });
}
