use crate::explain::explain;
use crate::model::{CommandPlan, Operation, PlanId, PlanState};
use crate::security::display_safe;
use serde::Serialize;
use std::fmt;

/// Human- and machine-readable rendering of a plan before it runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Preview {
    pub plan_id: PlanId,
    pub operation: Operation,
    /// `PreviewOnly`, or `AwaitingConfirmation` for destructive plans.
    pub state: PlanState,
    pub program: String,
    pub args: Vec<String>,
    pub overwrite: bool,
    pub destructive: bool,
    pub inputs: Vec<String>,
    pub output: String,
    pub explanation: Vec<String>,
}

impl Preview {
    pub(crate) fn of(plan: &CommandPlan) -> Self {
        let args: Vec<String> = plan.args().into_iter().map(str::to_string).collect();
        let state = if plan.destructive() {
            PlanState::AwaitingConfirmation
        } else {
            PlanState::PreviewOnly
        };
        Self {
            plan_id: plan.id(),
            operation: plan.operation(),
            state,
            program: plan.program().display().to_string(),
            explanation: explain(&args).lines(),
            args,
            overwrite: plan.overwrite(),
            destructive: plan.destructive(),
            inputs: plan
                .inputs()
                .iter()
                .map(|path| path.display().to_string())
                .collect(),
            output: plan.output().display().to_string(),
        }
    }
}

impl fmt::Display for Preview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Plan {} ({})", self.plan_id, self.operation)?;
        writeln!(f, "Program: {}", display_safe(&self.program))?;
        writeln!(f, "Arguments:")?;
        for (number, arg) in self.args.iter().enumerate() {
            writeln!(f, "  {:>3}. {}", number + 1, display_safe(arg))?;
        }
        writeln!(f, "Overwrite: {}", if self.overwrite { "yes" } else { "no" })?;
        if self.destructive {
            writeln!(
                f,
                "Destructive: yes, {} will be replaced",
                display_safe(&self.output)
            )?;
        } else {
            writeln!(f, "Destructive: no")?;
        }
        writeln!(f, "What this does:")?;
        for line in &self.explanation {
            writeln!(f, "  - {line}")?;
        }
        Ok(())
    }
}
