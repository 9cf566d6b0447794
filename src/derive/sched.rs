//! Scheduled triggers: one event rule and one invoke grant per schedule
//! expression, keyed by a short fingerprint of the expression text.

use serde_json::json;
use std::rc::Rc;

use crate::error::DeriveError;
use crate::naming::{logical_id, prefix};
use crate::resource::{Resource, ResourceKind};

use super::{flag, ResourceConfig};

impl ResourceConfig {
    pub fn schedule_rule_logic_id(&self, expression: &str) -> String {
        logical_id(
            prefix::EVENT_RULE,
            self.rel_path(),
            self.op_name(),
            Some(expression),
        )
    }

    pub fn schedule_permission_logic_id(&self, expression: &str) -> String {
        logical_id(
            prefix::RULE_PERMISSION,
            self.rel_path(),
            self.op_name(),
            Some(expression),
        )
    }

    /// The event rules firing this operation's function, one per
    /// schedule expression, in authored order.
    pub fn schedule_rules(&self) -> Result<Option<Vec<Rc<Resource>>>, DeriveError> {
        if let Some(cached) = self.schedule_rules.get() {
            return Ok(Some(cached.clone()));
        }
        if !flag(&self.conf.schedule_enabled) {
            return Ok(None);
        }
        self.schedule_pre_check()?;
        let rules = self.build_schedule_rules()?;
        let _ = self.schedule_rules.set(rules.clone());
        Ok(Some(rules))
    }

    /// Structural eligibility for scheduled triggers.
    pub fn schedule_pre_check(&self) -> Result<(), DeriveError> {
        if self.op_name.is_none() {
            return Err(DeriveError::precondition(
                "a scheduled trigger requires a backing operation",
            ));
        }
        Ok(())
    }

    fn build_schedule_rules(&self) -> Result<Vec<Rc<Resource>>, DeriveError> {
        let function = self.backing_function()?;
        let expressions = self.conf.schedule_expressions.require("schedule_expressions")?;

        expressions
            .iter()
            .map(|expression| {
                let props = json!({
                    "ScheduleExpression": expression,
                    "State": "ENABLED",
                    "Targets": [{
                        "Arn": { "Fn::GetAtt": [function.logical_id, "Arn"] },
                        "Id": function.logical_id,
                    }],
                });
                Ok(Rc::new(Resource::new(
                    self.schedule_rule_logic_id(expression),
                    ResourceKind::ScheduledRule,
                    vec![function.logical_id.clone()],
                    props,
                )))
            })
            .collect()
    }

    /// The invoke grants pairing each rule with the function it fires.
    pub fn schedule_permissions(&self) -> Result<Option<Vec<Rc<Resource>>>, DeriveError> {
        if let Some(cached) = self.schedule_permissions.get() {
            return Ok(Some(cached.clone()));
        }
        if !flag(&self.conf.schedule_enabled) {
            return Ok(None);
        }
        self.schedule_pre_check()?;
        let permissions = self.build_schedule_permissions()?;
        let _ = self.schedule_permissions.set(permissions.clone());
        Ok(Some(permissions))
    }

    fn build_schedule_permissions(&self) -> Result<Vec<Rc<Resource>>, DeriveError> {
        let function = self.backing_function()?;
        let rules = self.schedule_rules()?.ok_or_else(|| {
            DeriveError::precondition("scheduled trigger is not enabled")
        })?;
        let expressions = self.conf.schedule_expressions.require("schedule_expressions")?;

        expressions
            .iter()
            .zip(rules.iter())
            .map(|(expression, rule)| {
                let props = json!({
                    "Action": "lambda:InvokeFunction",
                    "FunctionName": { "Fn::GetAtt": [function.logical_id, "Arn"] },
                    "Principal": "events.amazonaws.com",
                    "SourceArn": { "Fn::GetAtt": [rule.logical_id, "Arn"] },
                });
                Ok(Rc::new(Resource::new(
                    self.schedule_permission_logic_id(expression),
                    ResourceKind::Permission,
                    vec![rule.logical_id.clone(), function.logical_id.clone()],
                    props,
                )))
            })
            .collect()
    }
}
