// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Loam Contributors

use super::*;
use crate::condition::Operator;
use serde_json::json;

fn rule_with(conditions: Value, actions: Value) -> AutomationRule {
    AutomationRule {
        id: "auto-1".to_string(),
        name: "test rule".to_string(),
        trigger: Trigger::DealStageChanged,
        is_active: true,
        conditions,
        actions,
        created_by: None,
        run_count: 0,
        last_run_at: None,
    }
}

#[test]
fn conditions_decode_from_versioned_envelope() {
    let rule = rule_with(
        json!({"version": 1, "data": [
            {"field": "value", "operator": "gt", "value": 1000}
        ]}),
        json!([]),
    );
    let conditions = rule.conditions().unwrap();
    assert_eq!(conditions.len(), 1);
    assert_eq!(conditions[0].field, "value");
    assert_eq!(conditions[0].operator, Operator::Gt);
}

#[test]
fn conditions_reject_unknown_version() {
    let rule = rule_with(json!({"version": 9, "data": []}), json!([]));
    assert!(matches!(rule.conditions(), Err(PayloadError::Version(9))));
}

#[test]
fn actions_drop_unknown_kinds() {
    let rule = rule_with(
        json!([]),
        json!([
            {"kind": "create_task", "config": {"title": "Follow up"}},
            {"kind": "teleport", "config": {}},
        ]),
    );
    let actions = rule.actions().unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].name(), "create_task");
}

#[test]
fn rule_deserializes_with_defaults() {
    let rule: AutomationRule = serde_json::from_value(json!({
        "id": "auto-2",
        "name": "minimal",
        "trigger": "DEAL_CREATED",
        "is_active": true
    }))
    .unwrap();
    assert!(rule.conditions().unwrap().is_empty());
    assert!(rule.actions().unwrap().is_empty());
    assert!(rule.created_by.is_none());
    assert_eq!(rule.run_count, 0);
}
