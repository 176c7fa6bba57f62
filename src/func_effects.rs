//! The Function-Effects Summary pass: computes, and can discard, each
//! defined function's side-effect summary over the static call graph.

use std::rc::Rc;

use crate::callgraph::CallGraph;
use crate::effect_analyzer::{self, EffectSet};
use crate::ir::Module;
use crate::pass::{Pass, PassRunner};

/// A function's published side-effect summary. Shared ownership so the
/// `anything` value is a flyweight: every function that bottoms out at the
/// worst case points at the same allocation instead of each holding its own
/// copy of the same bits.
#[derive(Clone)]
pub struct EffectSummary(Rc<EffectSet>);

impl EffectSummary {
    pub fn new(effects: EffectSet) -> Self {
        EffectSummary(Rc::new(effects))
    }

    pub fn effects(&self) -> EffectSet {
        *self.0
    }

    /// Fast path: are `self` and `other` the exact same flyweight instance?
    /// Pointer identity stands in for a separate top-of-lattice flag, since
    /// both answer "no need to compare the underlying bits".
    pub fn is_same_flyweight(&self, other: &EffectSummary) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for EffectSummary {
    fn eq(&self, other: &Self) -> bool {
        *self.0 == *other.0
    }
}

/// `generate-func-effects`: computes a summary per defined function by
/// propagating effects backwards over the static call graph.
pub struct GenerateFuncEffects;

impl Pass for GenerateFuncEffects {
    fn name(&self) -> &'static str {
        "generate-func-effects"
    }

    fn run(&self, module: &mut Module, runner: &mut PassRunner) -> anyhow::Result<()> {
        // First, clear any previous function effects; we don't want to
        // notice them when we compute effects here.
        runner.options.func_effects.clear();
        let features = runner.options.features;

        // A single summary to represent "anything": seeded by running the
        // analyzer on a synthetic call, so feature-flag-dependent effects
        // (e.g. exceptions-may-throw) are captured the same way real calls
        // are.
        let anything = EffectSummary::new(effect_analyzer::synthetic_call_effects(features));

        let mut infos: indexmap::IndexMap<crate::ir::FuncId, EffectSummary> = indexmap::IndexMap::new();
        for (id, func) in module.functions.iter() {
            let summary = if func.is_imported() {
                anything.clone()
            } else {
                let body = func
                    .body
                    .as_ref()
                    .expect("non-imported function must have a body");
                let mut effects = effect_analyzer::analyze(body, features);

                // Normalize:
                // - discard "contains calls": calls are about to be
                //   propagated explicitly.
                effects.remove(EffectSet::CALLS);
                // - discard effects on locals: not observable to the caller.
                effects.remove(EffectSet::LOCALS_READ | EffectSet::LOCALS_WRITTEN);
                // - discard "branches out": returning from a function isn't
                //   caller-visible as a branch effect.
                effects.remove(EffectSet::BRANCHES_OUT);

                EffectSummary::new(effects)
            };
            infos.insert(id, summary);
        }

        let graph = CallGraph::build(module);
        crate::callgraph::propagate_back(
            &graph,
            &mut infos,
            |id| {
                module
                    .functions
                    .get(id)
                    .map(|f| f.has_unanalyzable_call)
                    .unwrap_or(false)
            },
            |info| *info = anything.clone(),
            |callee, caller| {
                if caller.is_same_flyweight(&anything) {
                    // Already worst case, stop.
                    return false;
                }
                let merged = caller.effects() | callee.effects();
                if merged == caller.effects() {
                    return false;
                }
                *caller = EffectSummary::new(merged);
                true
            },
        );

        for (id, summary) in infos {
            let name = module
                .functions
                .get(id)
                .map(|f| f.name.clone())
                .unwrap_or_default();
            runner.options.func_effects.insert(name, summary);
        }
        Ok(())
    }
}

/// `discard-func-effects`: a trivial pass that clears the summary map,
/// used after transformations that invalidate it.
pub struct DiscardFuncEffects;

impl Pass for DiscardFuncEffects {
    fn name(&self) -> &'static str {
        "discard-func-effects"
    }

    fn run(&self, _module: &mut Module, runner: &mut PassRunner) -> anyhow::Result<()> {
        runner.options.func_effects.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Expr, FuncSig, Function, Literal, ValType};
    use crate::pass::{FeatureFlags, PassOptions};

    fn leaf_writing_memory() -> Function {
        Function {
            name: "c".into(),
            sig: FuncSig::default(),
            locals: vec![],
            body: Some(Expr::Store {
                offset: 0,
                addr: Box::new(Expr::Const { value: Literal::I32(0), ty: ValType::i32() }),
                value: Box::new(Expr::Const { value: Literal::I32(1), ty: ValType::i32() }),
            }),
            direct_callees: vec![],
            has_unanalyzable_call: false,
        }
    }

    #[test]
    fn linear_chain_propagates_writes_memory() {
        let mut module = Module::new();
        let c = module.functions.push(leaf_writing_memory());
        let b = module.functions.push(Function {
            name: "b".into(),
            sig: FuncSig::default(),
            locals: vec![],
            body: Some(Expr::Call { func: c, args: vec![], ty: ValType::none() }),
            direct_callees: vec![c],
            has_unanalyzable_call: false,
        });
        module.functions.push(Function {
            name: "a".into(),
            sig: FuncSig::default(),
            locals: vec![],
            body: Some(Expr::Call { func: b, args: vec![], ty: ValType::none() }),
            direct_callees: vec![b],
            has_unanalyzable_call: false,
        });

        let mut options = PassOptions { features: FeatureFlags::default(), ..Default::default() };
        let mut runner = PassRunner::new(&mut options);
        runner.run_named(&mut module, "generate-func-effects").unwrap();

        for name in ["a", "b", "c"] {
            let summary = &runner.options.func_effects[name];
            assert!(
                summary.effects().contains(EffectSet::WRITES_MEMORY),
                "{name} should include writes-memory"
            );
        }
    }

    #[test]
    fn unanalyzable_call_forces_anything() {
        let mut module = Module::new();
        let c = module.functions.push(leaf_writing_memory());
        let b = module.functions.push(Function {
            name: "b".into(),
            sig: FuncSig::default(),
            locals: vec![],
            body: Some(Expr::CallIndirect {
                sig: FuncSig::default(),
                target: Box::new(Expr::Const { value: Literal::I32(0), ty: ValType::i32() }),
                args: vec![],
                ty: ValType::none(),
            }),
            direct_callees: vec![],
            has_unanalyzable_call: true,
        });
        module.functions.push(Function {
            name: "a".into(),
            sig: FuncSig::default(),
            locals: vec![],
            body: Some(Expr::Call { func: b, args: vec![], ty: ValType::none() }),
            direct_callees: vec![b],
            has_unanalyzable_call: false,
        });
        let _ = c;

        let mut options = PassOptions { features: FeatureFlags::default(), ..Default::default() };
        let mut runner = PassRunner::new(&mut options);
        runner.run_named(&mut module, "generate-func-effects").unwrap();

        let anything = EffectSummary::new(effect_analyzer::synthetic_call_effects(FeatureFlags::default()));
        assert_eq!(runner.options.func_effects["b"].effects(), anything.effects());
        assert_eq!(runner.options.func_effects["a"].effects(), anything.effects());
        // `c` is unreachable from the analyzed call graph via `b`'s
        // indirect call, so its own summary stays precise.
        assert!(runner.options.func_effects["c"].effects().contains(EffectSet::WRITES_MEMORY));
    }

    #[test]
    fn discard_empties_the_map() {
        let mut module = Module::new();
        module.functions.push(leaf_writing_memory());
        let mut options = PassOptions { features: FeatureFlags::default(), ..Default::default() };
        let mut runner = PassRunner::new(&mut options);
        runner.run_named(&mut module, "generate-func-effects").unwrap();
        assert!(!runner.options.func_effects.is_empty());
        runner.run_named(&mut module, "discard-func-effects").unwrap();
        assert!(runner.options.func_effects.is_empty());
    }
}
