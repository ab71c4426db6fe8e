//! Command Builder: a pure mapping from [`ActionDescriptor`] to [`CommandPlan`].
//!
//! Each operation has a fixed argument template (see [`templates`]). Holes are
//! filled from the descriptor's parameters, the resolved paths and the
//! configured [`Defaults`]. Every token is minted by the [`Validator`]; nothing
//! here formats a raw argument. No clock, randomness or I/O influences the
//! result, so building twice yields the same plan and plan id.

mod templates;

use crate::error::{AiclipError, AiclipResult};
use crate::model::{
    ActionDescriptor, ActionKind, CommandPlan, Config, Defaults, Output, ParamKey, ParamValue,
    Params, ResolvedPath,
};
use crate::security::{Flag, SafeToken, Validator};
use std::path::{Path, PathBuf};

/// Builds command plans for one configured tool.
#[derive(Clone, Debug)]
pub struct CommandBuilder {
    program: PathBuf,
    defaults: Defaults,
    validator: Validator,
}

impl CommandBuilder {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            program: config.tool.program.clone(),
            defaults: config.defaults.clone(),
            validator: Validator::from_config(config),
        }
    }

    /// Build the plan for a single-kind descriptor.
    pub fn build_plan(&self, descriptor: &ActionDescriptor) -> AiclipResult<CommandPlan> {
        let (ActionKind::Single(_), Output::File(output)) = (descriptor.kind(), descriptor.output())
        else {
            return Err(AiclipError::unbuildable(
                "batch descriptors expand to several plans",
                serde_json::json!({ "fix": "Use build_batch for batch descriptors" }),
            ));
        };
        let input = descriptor.inputs().first().ok_or_else(|| {
            AiclipError::unbuildable("action requires an input file", None)
        })?;
        self.build_one(descriptor, input, output)
    }

    /// Build one plan per input. Items fail independently.
    ///
    /// A single-kind descriptor yields a one-item batch.
    pub fn build_batch(&self, descriptor: &ActionDescriptor) -> BatchBuild {
        let items = match descriptor.output() {
            Output::File(output) => descriptor
                .inputs()
                .iter()
                .map(|input| self.build_one(descriptor, input, output))
                .collect(),
            Output::PerInput(outputs) => descriptor
                .inputs()
                .iter()
                .zip(outputs)
                .map(|(input, output)| self.build_one(descriptor, input, output))
                .collect(),
        };
        let build = BatchBuild { items };
        tracing::debug!(
            operation = %descriptor.operation(),
            built = build.plans().count(),
            failed = build.failures().len(),
            "built batch"
        );
        build
    }

    fn build_one(
        &self,
        descriptor: &ActionDescriptor,
        input: &ResolvedPath,
        output: &ResolvedPath,
    ) -> AiclipResult<CommandPlan> {
        let op = descriptor.operation();
        let params = descriptor.params();
        let overwrite = output.existed();
        let clobbers_source = input.path() == output.path()
            || source(params).is_some_and(|src| src.path() == output.path());
        let destructive = overwrite || clobbers_source;

        let mut argv = Argv::new(&self.validator);
        argv.flag(Flag::HideBanner);
        argv.flag(Flag::NoStdin);
        argv.flag(if overwrite {
            Flag::Overwrite
        } else {
            Flag::NoOverwrite
        });
        templates::fill(op, &mut argv, input, params, &self.defaults)?;
        argv.path(output.path())?;

        let plan = CommandPlan::new(
            op,
            self.program.clone(),
            argv.finish(),
            overwrite,
            destructive,
            vec![input.path().to_path_buf()],
            output.path().to_path_buf(),
        );
        tracing::debug!(
            plan_id = %plan.id(),
            operation = %op,
            tokens = plan.argv().len(),
            destructive,
            "built command plan"
        );
        Ok(plan)
    }
}

/// Result of expanding a descriptor into per-input plans.
#[derive(Debug)]
pub struct BatchBuild {
    /// One entry per input, in input order.
    pub items: Vec<AiclipResult<CommandPlan>>,
}

impl BatchBuild {
    /// Successfully built plans, in input order.
    pub fn plans(&self) -> impl Iterator<Item = &CommandPlan> {
        self.items.iter().filter_map(|item| item.as_ref().ok())
    }

    /// Failed items with their input index.
    #[must_use]
    pub fn failures(&self) -> Vec<(usize, &AiclipError)> {
        self.items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| item.as_ref().err().map(|err| (index, err)))
            .collect()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.items.iter().all(Result::is_ok)
    }

    /// All plans, or an error when any item failed to build.
    pub fn into_plans(self) -> AiclipResult<Vec<CommandPlan>> {
        let total = self.items.len();
        let mut plans = Vec::with_capacity(total);
        let mut failed = Vec::new();
        for (index, item) in self.items.into_iter().enumerate() {
            match item {
                Ok(plan) => plans.push(plan),
                Err(err) => failed.push((index, err)),
            }
        }
        let Some((first_index, first)) = failed.first() else {
            return Ok(plans);
        };
        Err(AiclipError::new(
            first.code,
            format!(
                "{} of {total} batch items failed to build; item {first_index}: {}",
                failed.len(),
                first.message
            ),
            serde_json::json!({
                "failed": failed
                    .iter()
                    .map(|(index, err)| serde_json::json!({
                        "index": index,
                        "error": err.to_error_info(),
                    }))
                    .collect::<Vec<_>>(),
            }),
        ))
    }
}

/// Accumulates validated tokens for one plan.
pub(crate) struct Argv<'v> {
    validator: &'v Validator,
    tokens: Vec<SafeToken>,
}

impl<'v> Argv<'v> {
    fn new(validator: &'v Validator) -> Self {
        Self {
            validator,
            tokens: Vec::new(),
        }
    }

    pub(crate) fn validator(&self) -> &'v Validator {
        self.validator
    }

    pub(crate) fn flag(&mut self, flag: Flag) {
        self.tokens.push(flag.token());
    }

    pub(crate) fn push(&mut self, token: SafeToken) {
        self.tokens.push(token);
    }

    pub(crate) fn option(&mut self, flag: Flag, value: SafeToken) {
        self.flag(flag);
        self.push(value);
    }

    pub(crate) fn path(&mut self, path: &Path) -> AiclipResult<()> {
        let token = self.validator.path_token(path)?;
        self.push(token);
        Ok(())
    }

    fn finish(self) -> Vec<SafeToken> {
        self.tokens
    }
}

fn source(params: &Params) -> Option<&ResolvedPath> {
    match params.get(&ParamKey::Overlay) {
        Some(ParamValue::Source(src)) => Some(src),
        _ => None,
    }
}
