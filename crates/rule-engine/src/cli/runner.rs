//! 命令执行器
//!
//! 负责执行各 CLI 子命令的具体逻辑。输出写入调用方提供的 writer，
//! 返回值表示命令是否成功（校验全部通过、场景全部通过）。

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::info;

use krule_shared::config::EngineConfig;

use crate::comparator::ValueComparator;
use crate::engine::{EngineOptions, RuleEngine};
use crate::executor::ErrorPolicy;
use crate::models::{EvaluationContext, Rule};
use crate::scenario::TestScenario;
use crate::RuleError;

/// 将配置文件中的引擎配置转换为引擎选项
pub fn engine_options(config: &EngineConfig) -> Result<EngineOptions> {
    let error_policy = match config.error_policy.to_ascii_lowercase().as_str() {
        "abort" => ErrorPolicy::Abort,
        "skip" => ErrorPolicy::Skip,
        other => bail!("未知的错误策略: {} (可选 abort, skip)", other),
    };

    if config.max_depth == 0 {
        bail!("engine.max_depth 必须大于 0");
    }

    Ok(EngineOptions {
        max_depth: config.max_depth,
        error_policy,
        trace: config.trace,
    })
}

/// 命令执行器
pub struct CommandRunner {
    engine: RuleEngine,
}

impl CommandRunner {
    pub fn new(engine: RuleEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &RuleEngine {
        &self.engine
    }

    /// 执行 validate 命令
    pub fn run_validate(&self, rules_path: &Path, out: &mut impl Write) -> Result<bool> {
        let candidates = read_rule_candidates(rules_path)?;
        let mut rejected = 0;

        for (i, candidate) in candidates.iter().enumerate() {
            match self.engine.validate(candidate) {
                Ok(rule) => writeln!(out, "✓ [{}] {}", i, rule.label())?,
                Err(errors) => {
                    rejected += 1;
                    writeln!(out, "✗ [{}] 规则被拒绝，共 {} 个问题", i, errors.len())?;
                    for error in errors {
                        writeln!(out, "    - {}", error)?;
                    }
                }
            }
        }

        info!(total = candidates.len(), rejected, "规则校验完成");
        Ok(rejected == 0)
    }

    /// 执行 execute 命令
    pub fn run_execute(
        &self,
        rules_path: &Path,
        context_path: &Path,
        trace: bool,
        out: &mut impl Write,
    ) -> Result<()> {
        let rules = self.load_rules(rules_path)?;
        let context = match read_json(context_path)? {
            Value::Object(data) => EvaluationContext::new(data),
            other => bail!(
                "上下文文件必须是 JSON 对象: {} (实际为 {})",
                context_path.display(),
                ValueComparator::type_name(&other)
            ),
        };

        let report = if trace && !self.engine.options().trace {
            self.engine
                .executor()
                .clone()
                .with_trace()
                .execute_with_report(&rules, &context)
        } else {
            self.engine.execute_with_report(&rules, &context)
        }
        .context("规则集执行失败")?;

        writeln!(out, "{}", serde_json::to_string_pretty(&report.results)?)?;

        if trace {
            for line in &report.evaluation_trace {
                writeln!(out, "# {}", line)?;
            }
        }
        for skipped in &report.skipped_rules {
            writeln!(out, "# skipped {}: {}", skipped.rule, skipped.error)?;
        }

        info!(
            matched = report.matched_rules.len(),
            targets = report.results.len(),
            elapsed_ms = report.evaluation_time_ms,
            "规则集执行完成"
        );
        Ok(())
    }

    /// 执行 test 命令
    pub fn run_test(
        &self,
        rules_path: &Path,
        scenarios_path: &Path,
        out: &mut impl Write,
    ) -> Result<bool> {
        let rules = self.load_rules(rules_path)?;
        let scenarios: Vec<TestScenario> = serde_json::from_value(read_json(scenarios_path)?)
            .with_context(|| format!("场景文件格式错误: {}", scenarios_path.display()))?;

        let report = self.engine.run_scenarios(&rules, &scenarios);

        for outcome in &report.outcomes {
            if outcome.passed {
                writeln!(out, "PASS {}", outcome.name)?;
            } else {
                writeln!(out, "FAIL {}", outcome.name)?;
                for failure in &outcome.failures {
                    writeln!(out, "    - {}", failure)?;
                }
            }
        }
        writeln!(out, "{} passed, {} failed", report.passed, report.failed)?;

        Ok(report.all_passed())
    }

    /// 执行 explain 命令
    pub fn run_explain(&self, rules_path: &Path, out: &mut impl Write) -> Result<()> {
        for rule in self.load_rules(rules_path)? {
            writeln!(out, "{}", rule)?;
        }
        Ok(())
    }

    /// 读取并校验规则文件，任一规则不合法时返回包含全部问题的错误
    fn load_rules(&self, rules_path: &Path) -> Result<Vec<Rule>> {
        let candidates = read_rule_candidates(rules_path)?;

        self.engine.load_rules(&candidates).map_err(|e| match e {
            RuleError::Validation(errors) => {
                let details: Vec<String> = errors.iter().map(|e| format!("  - {}", e)).collect();
                anyhow::anyhow!(
                    "规则文件 {} 校验失败，共 {} 个问题:\n{}",
                    rules_path.display(),
                    errors.len(),
                    details.join("\n")
                )
            }
            other => anyhow::Error::new(other),
        })
    }
}

/// 读取 JSON 文件
fn read_json(path: &Path) -> Result<Value> {
    let content =
        fs::read_to_string(path).with_context(|| format!("无法读取文件: {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("JSON 解析失败: {}", path.display()))
}

/// 规则文件可以是单条规则对象，也可以是规则数组
fn read_rule_candidates(path: &Path) -> Result<Vec<Value>> {
    Ok(match read_json(path)? {
        Value::Array(items) => items,
        single => vec![single],
    })
}
