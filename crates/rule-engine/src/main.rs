//! krule 命令行入口
//!
//! 加载分层配置，初始化日志，然后分派子命令。

use std::io;
use std::process::ExitCode;

use clap::Parser;
use krule::cli::{engine_options, Cli, CommandRunner, Commands};
use krule::RuleEngine;
use krule_shared::config::AppConfig;
use krule_shared::observability;
use tracing::debug;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = AppConfig::load("krule").unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });

    // 命令行指定的日志级别覆盖配置文件
    if let Some(level) = &cli.log_level {
        config.observability.log_level = level.clone();
    }
    observability::init(&config.observability)?;

    debug!(
        service = %config.service_name,
        environment = %config.environment,
        "配置加载完成"
    );

    let options = engine_options(&config.engine)?;
    let runner = CommandRunner::new(RuleEngine::with_options(options));

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let success = match &cli.command {
        Commands::Validate { rules } => runner.run_validate(rules, &mut out)?,
        Commands::Execute {
            rules,
            context,
            trace,
        } => {
            runner.run_execute(rules, context, *trace, &mut out)?;
            true
        }
        Commands::Test { rules, scenarios } => runner.run_test(rules, scenarios, &mut out)?,
        Commands::Explain { rules } => {
            runner.run_explain(rules, &mut out)?;
            true
        }
    };

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
