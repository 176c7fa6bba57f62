//! Static call-graph construction and backward fixed-point propagation,
//! shared by the Function-Effects Summary pass.

use crate::ir::{FuncId, Module};
use indexmap::{IndexMap, IndexSet};

/// Direct-call edges, both directions, built once per run.
pub struct CallGraph {
    pub callees: IndexMap<FuncId, IndexSet<FuncId>>,
    pub callers: IndexMap<FuncId, IndexSet<FuncId>>,
}

impl CallGraph {
    pub fn build(module: &Module) -> CallGraph {
        let mut callees = IndexMap::new();
        let mut callers = IndexMap::new();
        for (id, func) in module.functions.iter() {
            let mut set = IndexSet::new();
            for &callee in &func.direct_callees {
                set.insert(callee);
                callers.entry(callee).or_insert_with(IndexSet::new).insert(id);
            }
            callees.insert(id, set);
        }
        CallGraph { callees, callers }
    }
}

/// Backward-propagate `merge` over the call graph to a fixed point:
/// repeatedly, for each edge `caller -> callee`, fold the callee's info
/// into the caller's, until a full sweep makes no change. Worklist-based
/// so cyclic call graphs converge without rescanning every function on
/// every round.
///
/// `merge(callee_info, caller_info) -> bool` mutates `caller_info` in
/// place and returns whether it changed. `force_top(info)` is applied to
/// functions flagged as making an unanalyzable call, unconditionally,
/// before propagation begins.
pub fn propagate_back<T: Clone>(
    graph: &CallGraph,
    infos: &mut IndexMap<FuncId, T>,
    unanalyzable: impl Fn(FuncId) -> bool,
    mut force_top: impl FnMut(&mut T),
    mut merge: impl FnMut(&T, &mut T) -> bool,
) {
    let ids: Vec<FuncId> = infos.keys().copied().collect();
    for id in ids {
        if unanalyzable(id) {
            if let Some(info) = infos.get_mut(&id) {
                force_top(info);
            }
        }
    }

    // Worklist-based backward propagation: when a callee's info changes,
    // re-examine every one of its callers.
    let mut worklist: Vec<FuncId> = infos.keys().copied().collect();
    let mut in_worklist: IndexSet<FuncId> = worklist.iter().copied().collect();

    while let Some(callee) = worklist.pop() {
        in_worklist.shift_remove(&callee);
        let Some(callers) = graph.callers.get(&callee) else {
            continue;
        };
        let Some(callee_snapshot) = infos.get(&callee).cloned() else {
            continue;
        };
        for &caller in callers {
            let Some(caller_info) = infos.get_mut(&caller) else {
                continue;
            };
            let changed = merge(&callee_snapshot, caller_info);
            if changed && in_worklist.insert(caller) {
                log::trace!("propagate_back: {:?} changed by callee {:?}, requeued", caller, callee);
                worklist.push(caller);
            }
        }
    }
}
