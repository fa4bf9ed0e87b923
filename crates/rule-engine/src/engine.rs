//! 规则引擎入口
//!
//! 将一个操作符注册表、一个校验器和一个执行器组装在一起。同一引擎内三者共享注册表，
//! 不同引擎实例之间互不影响。

use crate::error::{Result, RuleError};
use crate::evaluator::{ConditionEvaluator, DEFAULT_MAX_DEPTH};
use crate::executor::{ErrorPolicy, ExecutionReport, RuleExecutor};
use crate::models::{ActionMap, EvaluationContext, Rule};
use crate::registry::OperatorRegistry;
use crate::scenario::{self, ScenarioReport, TestScenario};
use crate::validator::{RuleValidator, ShapeError, ValidationResult};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

/// 引擎选项
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// 条件树最大嵌套深度
    pub max_depth: usize,
    pub error_policy: ErrorPolicy,
    /// 是否在执行报告中记录评估轨迹
    pub trace: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            error_policy: ErrorPolicy::Abort,
            trace: false,
        }
    }
}

/// 规则引擎
#[derive(Debug, Clone)]
pub struct RuleEngine {
    registry: OperatorRegistry,
    validator: RuleValidator,
    executor: RuleExecutor,
    options: EngineOptions,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self::with_options(EngineOptions::default())
    }

    pub fn with_options(options: EngineOptions) -> Self {
        Self::with_registry(OperatorRegistry::new(), options)
    }

    /// 使用已有的注册表创建引擎
    pub fn with_registry(registry: OperatorRegistry, options: EngineOptions) -> Self {
        let validator = RuleValidator::new()
            .with_registry(registry.clone())
            .with_max_depth(options.max_depth);

        let evaluator =
            ConditionEvaluator::new(registry.clone()).with_max_depth(options.max_depth);
        let mut executor = RuleExecutor::new(evaluator).with_error_policy(options.error_policy);
        if options.trace {
            executor = executor.with_trace();
        }

        info!(
            max_depth = options.max_depth,
            error_policy = ?options.error_policy,
            trace = options.trace,
            "规则引擎已初始化"
        );

        Self {
            registry,
            validator,
            executor,
            options,
        }
    }

    pub fn registry(&self) -> &OperatorRegistry {
        &self.registry
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn executor(&self) -> &RuleExecutor {
        &self.executor
    }

    /// 注册自定义逻辑操作符
    pub fn register_operator<F>(&self, name: impl Into<String>, combine: F) -> Result<()>
    where
        F: Fn(&[bool]) -> bool + Send + Sync + 'static,
    {
        self.registry.register(name, combine)
    }

    /// 校验未类型化的规则
    pub fn validate(&self, candidate: &Value) -> ValidationResult {
        self.validator.validate(candidate)
    }

    pub fn validate_json(&self, json: &str) -> ValidationResult {
        self.validator.validate_json(json)
    }

    /// 对上下文执行已校验的规则集
    pub fn execute(&self, rules: &[Rule], context: &EvaluationContext) -> Result<ActionMap> {
        self.executor.execute(rules, context)
    }

    pub fn execute_with_report(
        &self,
        rules: &[Rule],
        context: &EvaluationContext,
    ) -> Result<ExecutionReport> {
        self.executor.execute_with_report(rules, context)
    }

    /// 校验一组未类型化的规则，全部通过时返回类型化的规则
    ///
    /// 错误路径以规则下标为前缀，如 `[1].condition.operator`。
    pub fn load_rules(&self, candidates: &[Value]) -> Result<Vec<Rule>> {
        let mut rules = Vec::with_capacity(candidates.len());
        let mut errors = Vec::new();

        for (i, outcome) in self.validator.validate_batch(candidates).into_iter().enumerate() {
            match outcome {
                Ok(rule) => rules.push(rule),
                Err(shape_errors) => errors.extend(shape_errors.into_iter().map(|e| {
                    let path = if e.path == "$" {
                        format!("[{}]", i)
                    } else {
                        format!("[{}].{}", i, e.path)
                    };
                    ShapeError::new(path, e.message)
                })),
            }
        }

        if errors.is_empty() {
            Ok(rules)
        } else {
            Err(RuleError::Validation(errors))
        }
    }

    /// 先校验再执行
    pub fn validate_and_execute(
        &self,
        candidates: &[Value],
        context: &EvaluationContext,
    ) -> Result<ActionMap> {
        let rules = self.load_rules(candidates)?;
        self.execute(&rules, context)
    }

    /// 运行测试场景
    pub fn run_scenarios(&self, rules: &[Rule], scenarios: &[TestScenario]) -> ScenarioReport {
        scenario::run_scenarios(&self.executor, rules, scenarios)
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn majority_rule() -> Value {
        json!({
            "id": "majority",
            "condition": {
                "operator": "MAJORITY",
                "conditions": [
                    { "field": "a", "operator": "==", "value": true },
                    { "field": "b", "operator": "==", "value": true },
                    { "field": "c", "operator": "==", "value": true }
                ]
            },
            "actions": [{ "type": "flag", "target": "review" }]
        })
    }

    #[test]
    fn test_custom_operator_end_to_end() {
        let engine = RuleEngine::new();
        assert!(engine.validate(&majority_rule()).is_err());

        engine
            .register_operator("MAJORITY", |r| r.iter().filter(|x| **x).count() * 2 > r.len())
            .unwrap();
        let rule = engine.validate(&majority_rule()).unwrap();

        let ctx = EvaluationContext::from_value(json!({"a": true, "b": false, "c": true}));
        let results = engine.execute(&[rule], &ctx).unwrap();
        assert_eq!(results["review"].action_type, "flag");
    }

    #[test]
    fn test_engines_do_not_share_operators() {
        let first = RuleEngine::new();
        let second = RuleEngine::new();
        first.register_operator("MAJORITY", |_| true).unwrap();

        assert!(first.validate(&majority_rule()).is_ok());
        assert!(second.validate(&majority_rule()).is_err());
    }

    #[test]
    fn test_register_builtin_collision() {
        let engine = RuleEngine::new();
        assert!(matches!(
            engine.register_operator("AND", |_| false),
            Err(RuleError::OperatorNameCollision(_))
        ));
    }

    #[test]
    fn test_load_rules_prefixes_paths() {
        let engine = RuleEngine::new();
        let err = engine
            .load_rules(&[majority_rule(), json!("nope")])
            .unwrap_err();

        let errors = err.shape_errors().unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].path, "[0].condition.operator");
        assert_eq!(errors[1].path, "[1]");
    }

    #[test]
    fn test_validate_and_execute() {
        let engine = RuleEngine::new();
        let rule = json!({
            "priority": 10,
            "condition": {
                "operator": "AND",
                "conditions": [
                    { "field": "tier", "operator": "==", "value": "VIP" },
                    { "field": "total", "operator": ">=", "value": 100 }
                ]
            },
            "actions": [{ "type": "discount", "target": "cart", "payload": { "pct": 20 } }]
        });

        let ctx = EvaluationContext::from_value(json!({"tier": "VIP", "total": 150}));
        let results = engine.validate_and_execute(&[rule], &ctx).unwrap();
        assert_eq!(results["cart"].payload, Some(json!({"pct": 20})));
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: EngineOptions = serde_json::from_str(r#"{"error_policy": "skip"}"#).unwrap();
        assert_eq!(options.error_policy, ErrorPolicy::Skip);
        assert_eq!(options.max_depth, DEFAULT_MAX_DEPTH);
        assert!(!options.trace);

        let engine = RuleEngine::with_options(options);
        assert_eq!(engine.executor().error_policy(), ErrorPolicy::Skip);
    }

    #[test]
    fn test_engine_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RuleEngine>();
    }
}
