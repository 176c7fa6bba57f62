//! The pass-runner contract: a `Pass` trait, a nestable `PassRunner` that
//! exposes the shared `PassOptions` (carrying `func_effects` and feature
//! flags), and a small by-name registry for the passes this crate ships
//! (`lower-gc`, `generate-func-effects`, `discard-func-effects`) plus the
//! preconditions `lower-gc` schedules (`name-types`, `dce`).

use crate::func_effects::EffectSummary;
use indexmap::IndexMap;

/// Feature flags consulted by the effect analyzer to seed the worst-case
/// effects appropriate to the module's configuration, e.g.
/// exceptions-may-throw.
#[derive(Copy, Clone, Debug, Default)]
pub struct FeatureFlags {
    pub exceptions: bool,
    pub gc: bool,
}

/// Shared, whole-run pass-driver state: a shared options object that
/// carries `func_effects` and feature flags.
#[derive(Default)]
pub struct PassOptions {
    pub func_effects: IndexMap<String, EffectSummary>,
    pub features: FeatureFlags,
}

/// A pass-runner handle, nestable via `sub_runner` so a pass can sequence
/// other passes as its own preconditions (`lower-gc` uses this to run
/// `name-types` and `dce` first).
pub struct PassRunner<'a> {
    pub options: &'a mut PassOptions,
    is_nested: bool,
}

impl<'a> PassRunner<'a> {
    pub fn new(options: &'a mut PassOptions) -> Self {
        PassRunner { options, is_nested: false }
    }

    pub fn is_nested(&self) -> bool {
        self.is_nested
    }

    /// A sub-runner sharing this runner's options, for sequencing
    /// preconditions before the main body of a pass runs.
    pub fn sub_runner(&mut self) -> PassRunner<'_> {
        PassRunner { options: self.options, is_nested: true }
    }

    /// Run a pass by its registered name.
    pub fn run_named(&mut self, module: &mut crate::ir::Module, name: &str) -> anyhow::Result<()> {
        let pass = create_pass(name)
            .ok_or_else(|| anyhow::anyhow!("no pass registered under the name {name:?}"))?;
        tracing::debug!(pass = name, "running pass");
        pass.run(module, self)
    }
}

/// A whole-module transformation, addressed by a stable name.
pub trait Pass {
    fn name(&self) -> &'static str;

    fn run(&self, module: &mut crate::ir::Module, runner: &mut PassRunner) -> anyhow::Result<()>;

    /// Whether the bulk of this pass's work may be scheduled
    /// function-parallel. Only `lower-gc`'s body-rewriting sub-phase
    /// answers `true`; `generate-func-effects` is whole-module and
    /// single-threaded, since it propagates over the whole call graph at
    /// once.
    fn is_function_parallel(&self) -> bool {
        false
    }
}

/// Assigns a canonical name to any heap type lacking one. A real
/// implementation would derive names from debug info or source-level
/// declarations; `name-types` is scheduled here only as a precondition
/// `lower-gc` needs, so this assigns a stable `type$<index>` placeholder
/// instead.
pub struct NameTypes;

impl Pass for NameTypes {
    fn name(&self) -> &'static str {
        "name-types"
    }

    fn run(&self, module: &mut crate::ir::Module, _runner: &mut PassRunner) -> anyhow::Result<()> {
        let ids: Vec<_> = module.heap_types.keys().collect();
        for id in ids {
            if module.heap_type_name(id).is_none() {
                module.heap_type_names[id] = Some(format!("type${}", id.index()));
            }
        }
        Ok(())
    }
}

/// Dead-code elimination. Out of scope here; this is a deliberate no-op
/// placeholder satisfying the pass-runner contract. A real `dce` would
/// drop unreachable heap types so `lower-gc` does not synthesize helpers
/// for them.
pub struct Dce;

impl Pass for Dce {
    fn name(&self) -> &'static str {
        "dce"
    }

    fn run(&self, _module: &mut crate::ir::Module, _runner: &mut PassRunner) -> anyhow::Result<()> {
        tracing::trace!("dce: out of scope placeholder, no-op");
        Ok(())
    }
}

pub fn create_pass(name: &str) -> Option<Box<dyn Pass>> {
    match name {
        "lower-gc" => Some(Box::new(crate::lower_gc::LowerGc)),
        "generate-func-effects" => Some(Box::new(crate::func_effects::GenerateFuncEffects)),
        "discard-func-effects" => Some(Box::new(crate::func_effects::DiscardFuncEffects)),
        "name-types" => Some(Box::new(NameTypes)),
        "dce" => Some(Box::new(Dce)),
        _ => None,
    }
}

use cranelift_entity::EntityRef;
