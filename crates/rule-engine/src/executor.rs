//! 规则执行器
//!
//! 按优先级降序（稳定排序）逐条评估规则，命中的规则把动作写入结果表。
//! 同一 target 后写覆盖先写，因此多条命中规则竞争同一 target 时，优先级最低的规则生效；
//! 优先级相同时，输入顺序靠后的规则生效。

use crate::error::{Result, RuleError};
use crate::evaluator::ConditionEvaluator;
use crate::models::{ActionMap, ActionOutcome, EvaluationContext, Rule};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// 单条规则评估失败时的处理策略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// 中止整次执行并返回错误
    #[default]
    Abort,
    /// 跳过出错的规则，记录到报告中后继续
    Skip,
}

/// 被跳过的规则
#[derive(Debug, Clone, Serialize)]
pub struct SkippedRule {
    pub rule: String,
    pub error: String,
}

/// 执行报告
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionReport {
    pub results: ActionMap,
    /// 命中的规则（按评估顺序）
    pub matched_rules: Vec<String>,
    pub skipped_rules: Vec<SkippedRule>,
    pub evaluation_trace: Vec<String>,
    pub evaluation_time_ms: i64,
}

/// 规则执行器
#[derive(Debug, Clone)]
pub struct RuleExecutor {
    evaluator: ConditionEvaluator,
    error_policy: ErrorPolicy,
    /// 是否记录详细评估追踪
    trace_enabled: bool,
}

impl RuleExecutor {
    pub fn new(evaluator: ConditionEvaluator) -> Self {
        Self {
            evaluator,
            error_policy: ErrorPolicy::default(),
            trace_enabled: false,
        }
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// 启用评估追踪
    pub fn with_trace(mut self) -> Self {
        self.trace_enabled = true;
        self
    }

    pub fn evaluator(&self) -> &ConditionEvaluator {
        &self.evaluator
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        self.error_policy
    }

    /// 执行规则集，返回 target -> 动作 的结果表
    pub fn execute(&self, rules: &[Rule], context: &EvaluationContext) -> Result<ActionMap> {
        self.execute_with_report(rules, context)
            .map(|report| report.results)
    }

    /// 执行规则集并返回完整报告
    #[instrument(skip(self, rules, context), fields(rules = rules.len()))]
    pub fn execute_with_report(
        &self,
        rules: &[Rule],
        context: &EvaluationContext,
    ) -> Result<ExecutionReport> {
        let start = Instant::now();
        let mut report = ExecutionReport::default();

        for rule in Self::sort_by_priority(rules) {
            let label = rule.label();

            let outcome = if self.trace_enabled {
                report.evaluation_trace.push(format!("rule {}:", label));
                self.evaluator.evaluate_group_traced(
                    &rule.condition,
                    context,
                    &mut report.evaluation_trace,
                )
            } else {
                self.evaluator.evaluate_group(&rule.condition, context)
            };

            let matched = match outcome {
                Ok(matched) => matched,
                Err(e) => self.handle_failure(&label, e, &mut report)?,
            };

            debug!(rule = %label, priority = rule.priority, matched, "规则评估完成");

            if !matched {
                continue;
            }

            for action in &rule.actions {
                report
                    .results
                    .insert(action.target.clone(), ActionOutcome::from(action));
            }
            report.matched_rules.push(label);
        }

        report.evaluation_time_ms =
            i64::try_from(start.elapsed().as_millis()).unwrap_or(i64::MAX);
        debug!(
            matched = report.matched_rules.len(),
            targets = report.results.len(),
            skipped = report.skipped_rules.len(),
            "规则集执行完成"
        );

        Ok(report)
    }

    /// 按优先级降序排列，相同优先级保持输入顺序
    pub fn sort_by_priority(rules: &[Rule]) -> Vec<&Rule> {
        let mut sorted: Vec<&Rule> = rules.iter().collect();
        sorted.sort_by(|a, b| sort_key(b.priority).total_cmp(&sort_key(a.priority)));
        sorted
    }

    /// 按策略处理评估失败：Abort 返回错误，Skip 记录后视为未命中
    fn handle_failure(
        &self,
        label: &str,
        error: RuleError,
        report: &mut ExecutionReport,
    ) -> Result<bool> {
        match self.error_policy {
            ErrorPolicy::Abort => {
                warn!(rule = %label, error = %error, "规则评估失败，中止执行");
                Err(error)
            }
            ErrorPolicy::Skip => {
                warn!(rule = %label, error = %error, "规则评估失败，已跳过");
                report.skipped_rules.push(SkippedRule {
                    rule: label.to_string(),
                    error: error.to_string(),
                });
                Ok(false)
            }
        }
    }
}

impl Default for RuleExecutor {
    fn default() -> Self {
        Self::new(ConditionEvaluator::default())
    }
}

/// -0.0 与 0.0 数值相等，排序时视为同一优先级
fn sort_key(priority: f64) -> f64 {
    if priority == 0.0 { 0.0 } else { priority }
}
