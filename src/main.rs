mod app;

use app::cli::CliConfig;
use app::config::TomlConfig;
use app::engine::RunEngine;
use app::logger;
use app::pipeline::FilterPipeline;
use app::validation::Validate;
use clap::Parser;

fn main() {
    let cli = CliConfig::parse();

    logger::init_cli_logger(cli.verbose, cli.json_logs);

    tracing::info!("🚀 Starting filterpy {}", filterpy::VERSION);
    tracing::info!("📁 Loading configuration from: {}", cli.config);
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let mut config = match TomlConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Failed to load config file '{}': {}", cli.config, e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    config.apply_overrides(&cli);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!(
        run = %config.run.name,
        filter = config.filter.kind(),
        "✅ Configuration loaded and validated"
    );

    let engine = RunEngine::new(FilterPipeline::new(config));

    match engine.run() {
        Ok(output_path) => {
            tracing::info!("✅ Filter run completed successfully!");
            println!("✅ Filter run completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Filter run failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = e.severity().exit_code();
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }
}
