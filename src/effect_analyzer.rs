//! A minimal single-expression effect analyzer: a single post-order walk
//! over one `Expr` that accumulates an `EffectSet`. `func_effects` is the
//! only consumer; it treats this as an opaque oracle, calling it once per
//! function body and once on a synthetic call to seed `anything`.

use crate::ir::Expr;
use crate::pass::FeatureFlags;
use bitflags::bitflags;

bitflags! {
    /// The boolean effect lattice. Every bit is independently monotone;
    /// the full set (see `anything`) is the top element.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
    pub struct EffectSet: u32 {
        const READS_MEMORY      = 1 << 0;
        const WRITES_MEMORY     = 1 << 1;
        const READS_GLOBAL      = 1 << 2;
        const WRITES_GLOBAL     = 1 << 3;
        const READS_TABLE       = 1 << 4;
        const WRITES_TABLE      = 1 << 5;
        const CALLS             = 1 << 6;
        const MAY_TRAP          = 1 << 7;
        const MAY_THROW         = 1 << 8;
        const BRANCHES_OUT      = 1 << 9;
        const LOCALS_READ       = 1 << 10;
        const LOCALS_WRITTEN    = 1 << 11;
        const ACCESSES_EXTERNAL = 1 << 12;
    }
}

impl EffectSet {
    /// The top element: may do anything analyzable.
    pub fn anything(features: FeatureFlags) -> EffectSet {
        let mut e = EffectSet::READS_MEMORY
            | EffectSet::WRITES_MEMORY
            | EffectSet::READS_GLOBAL
            | EffectSet::WRITES_GLOBAL
            | EffectSet::READS_TABLE
            | EffectSet::WRITES_TABLE
            | EffectSet::CALLS
            | EffectSet::MAY_TRAP
            | EffectSet::ACCESSES_EXTERNAL;
        if features.exceptions {
            e |= EffectSet::MAY_THROW;
        }
        e
    }
}

/// Walk `expr` post-order, accumulating its immediate effect set.
pub fn analyze(expr: &Expr, features: FeatureFlags) -> EffectSet {
    let mut effects = EffectSet::empty();
    analyze_into(expr, features, &mut effects);
    effects
}

fn analyze_into(expr: &Expr, features: FeatureFlags, out: &mut EffectSet) {
    match expr {
        Expr::Load { .. } => *out |= EffectSet::READS_MEMORY | EffectSet::MAY_TRAP,
        Expr::Store { .. } => *out |= EffectSet::WRITES_MEMORY | EffectSet::MAY_TRAP,
        Expr::GlobalGet { .. } => *out |= EffectSet::READS_GLOBAL,
        Expr::GlobalSet { .. } => *out |= EffectSet::WRITES_GLOBAL,
        Expr::LocalGet { .. } => *out |= EffectSet::LOCALS_READ,
        Expr::LocalSet { .. } | Expr::LocalTee { .. } => *out |= EffectSet::LOCALS_WRITTEN,
        Expr::Call { .. } => {
            *out |= EffectSet::CALLS;
            if features.exceptions {
                *out |= EffectSet::MAY_THROW;
            }
        }
        // A call with no statically resolvable target: used both for the
        // synthetic call that seeds `anything` and for real
        // `call_indirect`-like unanalyzable calls. Conservatively
        // worst-case, seeding the effects appropriate to the module's
        // configured feature flags.
        Expr::CallByName { .. } | Expr::CallIndirect { .. } => {
            *out |= EffectSet::anything(features);
        }
        Expr::Unreachable => *out |= EffectSet::MAY_TRAP,
        Expr::Br { .. } | Expr::BrIf { .. } | Expr::Return { .. } => *out |= EffectSet::BRANCHES_OUT,
        _ => {}
    }
    for child in expr.children() {
        analyze_into(child, features, out);
    }
}

/// A synthetic call expression, used to seed the `anything` summary by
/// running the real effect-analyzer code on a fake call: this picks up
/// feature-dependent effects, like possibly throwing when exceptions are
/// enabled, the same way a real call would.
pub fn synthetic_call_effects(features: FeatureFlags) -> EffectSet {
    let fake_call = Expr::CallByName { name: "<synthetic>".into(), args: Vec::new(), ty: crate::ir::ValType::none() };
    analyze(&fake_call, features)
}

#[cfg(all(test, feature = "enable-serde"))]
mod serde_tests {
    use super::*;

    #[test]
    fn effect_set_round_trips_through_json() {
        let effects = EffectSet::READS_MEMORY | EffectSet::CALLS;
        let json = serde_json::to_string(&effects).unwrap();
        let back: EffectSet = serde_json::from_str(&json).unwrap();
        assert_eq!(effects, back);
    }
}
