use serde::Serialize;
use sinkplan_error::{Result, ResultExt};

use super::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::execution::executable::ExecutablePlan;
use crate::plan::operator::PlanRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplainFormat {
    Text,
    Json,
}

/// Formats a plan into explain output.
pub fn format_plan(plan: &PlanRef, format: ExplainFormat, verbose: bool) -> Result<String> {
    let conf = ExplainConfig { verbose };
    ExplainNode::walk_plan(plan, conf).format(format)
}

/// Formats an executable plan into explain output.
pub fn format_executable(
    plan: &ExecutablePlan,
    format: ExplainFormat,
    verbose: bool,
) -> Result<String> {
    let conf = ExplainConfig { verbose };
    ExplainNode::walk_executable(plan, conf).format(format)
}

#[derive(Debug, Serialize)]
struct ExplainNode {
    entry: ExplainEntry,
    children: Vec<ExplainNode>,
}

impl ExplainNode {
    fn walk_plan(plan: &PlanRef, conf: ExplainConfig) -> ExplainNode {
        ExplainNode {
            entry: plan.explain_entry(conf),
            children: plan
                .children()
                .iter()
                .map(|c| Self::walk_plan(c, conf))
                .collect(),
        }
    }

    fn walk_executable(plan: &ExecutablePlan, conf: ExplainConfig) -> ExplainNode {
        ExplainNode {
            entry: plan.operator().explain_entry(conf),
            children: plan
                .children()
                .iter()
                .map(|c| Self::walk_executable(c, conf))
                .collect(),
        }
    }

    fn format(&self, format: ExplainFormat) -> Result<String> {
        match format {
            ExplainFormat::Text => self.format_text(0, String::new()),
            ExplainFormat::Json => {
                serde_json::to_string_pretty(self).context("failed to serialize explain output")
            }
        }
    }

    fn format_text(&self, indent: usize, mut buf: String) -> Result<String> {
        use std::fmt::Write as _;
        writeln!(buf, "{}{}", " ".repeat(indent), self.entry)
            .context("failed to write to explain buffer")?;

        for child in &self.children {
            buf = child.format_text(indent + 2, buf)?;
        }

        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::WriteOperation;
    use crate::plan::builder::PlanBuilder;
    use crate::plan::node_modify::LogicalModify;
    use crate::testutil::{address_schema, address_values, people_ref};

    fn plan() -> PlanRef {
        PlanBuilder::values(address_values())
            .project_columns([0, 1])
            .unwrap()
            .modify(
                LogicalModify::try_new(
                    people_ref(),
                    address_schema(),
                    WriteOperation::Insert,
                    Vec::new(),
                    Vec::new(),
                )
                .unwrap(),
            )
            .unwrap()
            .build()
    }

    #[test]
    fn format_text() {
        let out = format_plan(&plan(), ExplainFormat::Text, false).unwrap();
        let expected = [
            "Modify (operation = INSERT, table = memory.main.people)",
            "  Project (projections = [name#0, address#1])",
            "    Values (num_rows = 2)",
            "",
        ]
        .join("\n");
        assert_eq!(expected, out);
    }

    #[test]
    fn format_json() {
        let out = format_plan(&plan(), ExplainFormat::Json, false).unwrap();
        let val: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!("Modify", val["entry"]["name"]);
        assert_eq!("Project", val["children"][0]["entry"]["name"]);
    }
}
