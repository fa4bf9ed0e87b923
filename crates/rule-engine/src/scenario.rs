//! 测试场景
//!
//! 用一组命名的上下文数据验证规则集的行为：是否触发，以及可选的期望结果表。

use crate::comparator::ValueComparator;
use crate::executor::RuleExecutor;
use crate::models::{ActionMap, ActionOutcome, EvaluationContext, Rule};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

/// 测试场景
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestScenario {
    pub name: String,
    pub data: Value,
    /// 期望是否至少有一条规则命中
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub should_trigger: Option<bool>,
    /// 期望的完整结果表
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<ActionMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TestScenario {
    pub fn new(name: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            data,
            should_trigger: None,
            expected: None,
            description: None,
        }
    }

    pub fn should_trigger(mut self, trigger: bool) -> Self {
        self.should_trigger = Some(trigger);
        self
    }

    pub fn expect(mut self, expected: ActionMap) -> Self {
        self.expected = Some(expected);
        self
    }
}

/// 单个场景的运行结果
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioOutcome {
    pub name: String,
    pub passed: bool,
    pub triggered: bool,
    pub results: ActionMap,
    pub failures: Vec<String>,
}

/// 场景运行汇总
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScenarioReport {
    pub outcomes: Vec<ScenarioOutcome>,
    pub passed: usize,
    pub failed: usize,
}

impl ScenarioReport {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// 依次运行场景；单个场景的评估错误记为失败，不影响其余场景
#[instrument(skip_all, fields(rules = rules.len(), scenarios = scenarios.len()))]
pub fn run_scenarios(
    executor: &RuleExecutor,
    rules: &[Rule],
    scenarios: &[TestScenario],
) -> ScenarioReport {
    let mut report = ScenarioReport::default();

    for scenario in scenarios {
        let outcome = run_scenario(executor, rules, scenario);
        if outcome.passed {
            report.passed += 1;
        } else {
            report.failed += 1;
        }
        report.outcomes.push(outcome);
    }

    info!(passed = report.passed, failed = report.failed, "场景运行完成");
    report
}

fn run_scenario(
    executor: &RuleExecutor,
    rules: &[Rule],
    scenario: &TestScenario,
) -> ScenarioOutcome {
    let context = EvaluationContext::from_value(scenario.data.clone());
    let mut failures = Vec::new();

    if !scenario.data.is_object() {
        failures.push("场景数据必须是 JSON 对象".to_string());
    }

    let (triggered, results) = match executor.execute_with_report(rules, &context) {
        Ok(report) => (!report.matched_rules.is_empty(), report.results),
        Err(e) => {
            failures.push(format!("执行失败: {}", e));
            (false, ActionMap::new())
        }
    };

    if let Some(expected) = scenario.should_trigger {
        if expected != triggered {
            failures.push(format!("期望触发={}, 实际触发={}", expected, triggered));
        }
    }

    if let Some(expected) = &scenario.expected {
        if !results_match(expected, &results) {
            failures.push(format!(
                "结果不符: 期望 {}, 实际 {}",
                serde_json::to_string(expected).unwrap_or_default(),
                serde_json::to_string(&results).unwrap_or_default()
            ));
        }
    }

    ScenarioOutcome {
        name: scenario.name.clone(),
        passed: failures.is_empty(),
        triggered,
        results,
        failures,
    }
}

/// 比较期望与实际结果表，payload 按引擎的严格相等比较（20 与 20.0 相等）
fn results_match(expected: &ActionMap, actual: &ActionMap) -> bool {
    expected.len() == actual.len()
        && expected.iter().all(|(target, want)| {
            actual
                .get(target)
                .is_some_and(|got| outcome_matches(want, got))
        })
}

fn outcome_matches(want: &ActionOutcome, got: &ActionOutcome) -> bool {
    want.action_type == got.action_type
        && match (&want.payload, &got.payload) {
            (None, None) => true,
            (Some(a), Some(b)) => ValueComparator::strict_eq(a, b),
            _ => false,
        }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Action, ActionOutcome, Condition, ConditionGroup};
    use crate::operators::Operator;
    use serde_json::json;

    fn rules() -> Vec<Rule> {
        vec![
            Rule::new(
                "vip_discount",
                ConditionGroup::and(vec![
                    Condition::new("tier", Operator::Eq, "VIP").into(),
                    Condition::new("total", Operator::Gte, 100).into(),
                ]),
            )
            .with_priority(10)
            .with_action(Action::new("discount", "cart").with_payload(json!({"pct": 20}))),
        ]
    }

    #[test]
    fn test_trigger_expectations() {
        let scenarios = vec![
            TestScenario::new("vip big order", json!({"tier": "VIP", "total": 150}))
                .should_trigger(true),
            TestScenario::new("vip small order", json!({"tier": "VIP", "total": 50}))
                .should_trigger(false),
            TestScenario::new("wrong expectation", json!({"tier": "REGULAR", "total": 500}))
                .should_trigger(true),
        ];

        let report = run_scenarios(&RuleExecutor::default(), &rules(), &scenarios);

        assert_eq!(report.passed, 2);
        assert_eq!(report.failed, 1);
        assert!(!report.all_passed());
        assert_eq!(report.outcomes[2].name, "wrong expectation");
        assert!(report.outcomes[2].failures[0].contains("期望触发=true"));
    }

    #[test]
    fn test_expected_results() {
        let mut expected = ActionMap::new();
        expected.insert(
            "cart".to_string(),
            ActionOutcome {
                action_type: "discount".to_string(),
                payload: Some(json!({"pct": 20})),
            },
        );

        let scenarios = vec![
            TestScenario::new("exact", json!({"tier": "VIP", "total": 100})).expect(expected),
            TestScenario::new("empty", json!({"tier": "VIP", "total": 99}))
                .expect(ActionMap::new()),
        ];

        let report = run_scenarios(&RuleExecutor::default(), &rules(), &scenarios);
        assert!(report.all_passed());
        assert!(report.outcomes[0].triggered);
    }

    #[test]
    fn test_expected_payload_uses_numeric_equality() {
        let scenarios: Vec<TestScenario> = serde_json::from_value(json!([
            {
                "name": "float expectation",
                "data": { "tier": "VIP", "total": 150 },
                "expected": { "cart": { "type": "discount", "payload": { "pct": 20.0 } } }
            },
            {
                "name": "wrong type",
                "data": { "tier": "VIP", "total": 150 },
                "expected": { "cart": { "type": "coupon", "payload": { "pct": 20 } } }
            },
            {
                "name": "missing payload",
                "data": { "tier": "VIP", "total": 150 },
                "expected": { "cart": { "type": "discount" } }
            }
        ]))
        .unwrap();

        let report = run_scenarios(&RuleExecutor::default(), &rules(), &scenarios);
        assert!(report.outcomes[0].passed, "{:?}", report.outcomes[0].failures);
        assert!(!report.outcomes[1].passed);
        assert!(!report.outcomes[2].passed);
    }

    #[test]
    fn test_execution_error_is_failure() {
        let scenarios = vec![
            TestScenario::new("bad total", json!({"tier": "VIP", "total": "lots"})),
            TestScenario::new("fine", json!({"tier": "VIP", "total": 120})),
        ];

        let report = run_scenarios(&RuleExecutor::default(), &rules(), &scenarios);
        assert_eq!(report.failed, 1);
        assert!(report.outcomes[0].failures[0].starts_with("执行失败"));
        assert!(report.outcomes[1].passed);
    }

    #[test]
    fn test_scenario_deserialization() {
        let scenario: TestScenario = serde_json::from_str(
            r#"{"name": "edge", "data": {"total": 100}, "shouldTrigger": true, "description": "boundary"}"#,
        )
        .unwrap();

        assert_eq!(scenario.should_trigger, Some(true));
        assert_eq!(scenario.description.as_deref(), Some("boundary"));
        assert!(scenario.expected.is_none());
    }
}
