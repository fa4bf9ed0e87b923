//! CLI 命令定义
//!
//! 使用 clap derive 宏定义命令行接口结构。

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// 规则引擎命令行工具
#[derive(Parser, Debug)]
#[command(name = "krule")]
#[command(version, about = "业务规则决策引擎")]
#[command(propagate_version = true)]
pub struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)，覆盖配置文件
    #[arg(short, long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// 子命令枚举
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 校验规则文件（单条规则对象或规则数组）
    Validate {
        /// 规则 JSON 文件
        rules: PathBuf,
    },

    /// 对上下文执行规则集并输出结果表
    Execute {
        /// 规则 JSON 文件
        rules: PathBuf,

        /// 上下文 JSON 文件
        context: PathBuf,

        /// 输出评估轨迹
        #[arg(long)]
        trace: bool,
    },

    /// 运行测试场景
    ///
    /// 场景文件为数组，每项包含 name、data，以及可选的 shouldTrigger / expected。
    Test {
        /// 规则 JSON 文件
        rules: PathBuf,

        /// 场景 JSON 文件
        scenarios: PathBuf,
    },

    /// 以可读形式输出规则
    Explain {
        /// 规则 JSON 文件
        rules: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_execute() {
        let cli = Cli::try_parse_from([
            "krule", "-l", "debug", "execute", "r.json", "c.json", "--trace",
        ])
        .unwrap();

        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Commands::Execute { rules, context, trace } => {
                assert_eq!(rules, PathBuf::from("r.json"));
                assert_eq!(context, PathBuf::from("c.json"));
                assert!(trace);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
