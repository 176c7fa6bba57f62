//! End-to-end lowering scenarios. Since this crate has no Wasm execution
//! engine, these check the *shape* of the module after `lower-gc` runs:
//! that the right helpers exist, with the right signatures, and that
//! rewritten bodies call them in the documented order, rather than
//! actually interpreting the result.

use wasm_gc_lower::ir::{
    Expr, FieldType, FuncSig, Function, HeapType, IndexType, Literal, Memory, Module, ValType,
};
use wasm_gc_lower::pass::{FeatureFlags, PassOptions, PassRunner};
use cranelift_entity::EntityRef;

fn base_module() -> Module {
    let mut module = Module::new();
    module.memory = Some(Memory { index_type: IndexType::I32, min_pages: 1, max_pages: Some(1) });
    module
}

fn run_lower_gc(module: &mut Module) {
    let mut options = PassOptions { features: FeatureFlags::default(), ..Default::default() };
    let mut runner = PassRunner::new(&mut options);
    runner.run_named(module, "lower-gc").expect("lower-gc should succeed on a well-formed module");
}

fn find_func<'a>(module: &'a Module, name: &str) -> &'a Function {
    module
        .functions
        .iter()
        .find(|(_, f)| f.name == name)
        .map(|(_, f)| f)
        .unwrap_or_else(|| panic!("no function named {name}"))
}

/// First `Call` node found (pre-order) in `expr`, resolved to its
/// callee's name via `module`.
fn first_call_name<'a>(expr: &Expr, module: &'a Module) -> Option<(&'a str, Vec<Expr>)> {
    if let Expr::Call { func, args, .. } = expr {
        let name = module.functions[*func].name.as_str();
        return Some((name, args.clone()));
    }
    for child in expr.children() {
        if let Some(found) = first_call_name(child, module) {
            return Some(found);
        }
    }
    None
}

fn all_call_names<'a>(expr: &Expr, module: &'a Module, out: &mut Vec<&'a str>) {
    if let Expr::Call { func, .. } = expr {
        out.push(module.functions[*func].name.as_str());
    }
    for child in expr.children() {
        all_call_names(child, module, out);
    }
}

fn const_i32_args(expr: &Expr, out: &mut Vec<i32>) {
    if let Expr::Const { value: Literal::I32(v), .. } = expr {
        out.push(*v);
    }
    for child in expr.children() {
        const_i32_args(child, out);
    }
}

/// Scenario 1: empty struct, `f() -> ref T` returning `struct.new_default`.
#[test]
fn empty_struct_default_new_allocates_header_only() {
    let mut module = base_module();
    let t = module.heap_types.push(HeapType::Struct { fields: Default::default() });

    module.functions.push(Function {
        name: "f".into(),
        sig: FuncSig { params: vec![], results: vec![ValType::Ref(t)] },
        locals: vec![],
        body: Some(Expr::StructNew {
            heap_type: t,
            operands: vec![],
            rtt: Box::new(Expr::RttCanon { ty: ValType::Rtt(t) }),
            with_default: true,
            ty: ValType::Ref(t),
        }),
        direct_callees: vec![],
        has_unanalyzable_call: false,
    });

    run_lower_gc(&mut module);

    let f = find_func(&module, "f");
    assert_eq!(f.sig.results, vec![ValType::i32()], "f's result must be lowered to a pointer");

    let (callee, args) = first_call_name(f.body.as_ref().unwrap(), &module).expect("f's body must call a helper");
    assert_eq!(callee, "StructNewWithDefault$type$0");
    assert_eq!(args.len(), 1, "StructNewWithDefault$T(rtt) takes only the rtt operand");

    let helper = find_func(&module, "StructNewWithDefault$type$0");
    let (malloc_callee, malloc_args) =
        first_call_name(helper.body.as_ref().unwrap(), &module).expect("must call malloc");
    assert_eq!(malloc_callee, "malloc");
    let Expr::Const { value: Literal::I32(size), .. } = &malloc_args[0] else { panic!("malloc's arg must be a const") };
    assert_eq!(*size, 4, "an empty struct's instance is header-only: pointerSize bytes");
}

/// Scenario 2: two-field struct set-then-get round trip, checked
/// structurally (the rewritten body must call Set then Get in order).
#[test]
fn two_field_struct_set_then_get_calls_helpers_in_order() {
    let mut module = base_module();
    let p = module.heap_types.push(HeapType::Struct {
        fields: vec![
            FieldType { ty: ValType::i32(), mutable: true },
            FieldType { ty: ValType::i32(), mutable: true },
        ]
        .into(),
    });

    let param = wasm_gc_lower::ir::LocalId::new(0);
    module.functions.push(Function {
        name: "roundtrip".into(),
        sig: FuncSig { params: vec![ValType::Ref(p)], results: vec![ValType::i32()] },
        locals: vec![],
        body: Some(Expr::Block {
            label: "body".into(),
            body: vec![
                Expr::StructSet {
                    field: 0,
                    reference: Box::new(Expr::LocalGet { local: param, ty: ValType::Ref(p) }),
                    value: Box::new(Expr::Const { value: Literal::I32(42), ty: ValType::i32() }),
                },
                Expr::StructGet {
                    field: 0,
                    reference: Box::new(Expr::LocalGet { local: param, ty: ValType::Ref(p) }),
                    ty: ValType::i32(),
                },
            ],
            ty: ValType::i32(),
        }),
        direct_callees: vec![],
        has_unanalyzable_call: false,
    });

    run_lower_gc(&mut module);

    let f = find_func(&module, "roundtrip");
    assert_eq!(f.sig.params, vec![ValType::i32()]);

    let mut names = Vec::new();
    all_call_names(f.body.as_ref().unwrap(), &module, &mut names);
    assert_eq!(names, vec!["StructSet$type$0$0", "StructGet$type$0$0"]);

    let getter = find_func(&module, "StructGet$type$0$0");
    assert_eq!(getter.sig.params, vec![ValType::i32()]);
    assert_eq!(getter.sig.results, vec![ValType::i32()]);

    let setter = find_func(&module, "StructSet$type$0$0");
    assert_eq!(setter.sig.params, vec![ValType::i32(), ValType::i32()]);
}

/// Scenario 3: array of length 3, default-initialized. Checked by the
/// address arithmetic the helpers embed, since there's no engine to run
/// the allocation and read memory back.
#[test]
fn array_default_new_addresses_three_elements_past_the_header() {
    let mut module = base_module();
    let arr = module.heap_types.push(HeapType::Array { element: FieldType { ty: ValType::i32(), mutable: true } });

    module.functions.push(Function {
        name: "make".into(),
        sig: FuncSig { params: vec![], results: vec![ValType::Ref(arr)] },
        locals: vec![],
        body: Some(Expr::ArrayNew {
            heap_type: arr,
            init: None,
            size: Box::new(Expr::Const { value: Literal::I32(3), ty: ValType::i32() }),
            rtt: Box::new(Expr::RttCanon { ty: ValType::Rtt(arr) }),
            with_default: true,
            ty: ValType::Ref(arr),
        }),
        direct_callees: vec![],
        has_unanalyzable_call: false,
    });

    run_lower_gc(&mut module);

    let set_helper = find_func(&module, "ArraySet$type$0");
    let mut consts = Vec::new();
    const_i32_args(set_helper.body.as_ref().unwrap(), &mut consts);
    // ptr + 2*pointerSize + index*elemSize: the folded header constant
    // must be 2*pointerSize = 8, not a bare literal 8 by coincidence
    // (see DESIGN.md).
    assert!(consts.contains(&8), "array element address must fold in a 2*pointerSize=8 header constant");
    assert!(consts.contains(&4), "element size (4 bytes for i32) must appear in the address arithmetic");

    let new_default = find_func(&module, "ArrayNewWithDefault$type$0");
    let Expr::Block { body, .. } = new_default.body.as_ref().unwrap() else { panic!("expected block") };
    // rtt at offset 0, length at offset pointerSize(4).
    assert!(matches!(&body[1], Expr::Store { offset: 0, .. }), "rtt must be stored at offset 0");
    assert!(matches!(&body[2], Expr::Store { offset: 4, .. }), "length must be stored at offset pointerSize");
}

/// Scenario 6: `ref.null` lowers to `i32.const 0`.
#[test]
fn ref_null_lowers_to_zero_constant() {
    let mut module = base_module();
    let t = module.heap_types.push(HeapType::Struct { fields: Default::default() });
    module.functions.push(Function {
        name: "g".into(),
        sig: FuncSig { params: vec![], results: vec![ValType::Ref(t)] },
        locals: vec![],
        body: Some(Expr::RefNull { ty: ValType::Ref(t) }),
        direct_callees: vec![],
        has_unanalyzable_call: false,
    });

    run_lower_gc(&mut module);

    let g = find_func(&module, "g");
    match g.body.as_ref().unwrap() {
        Expr::Const { value: Literal::I32(0), ty } => assert_eq!(*ty, ValType::i32()),
        other => panic!("expected a zero i32 constant, got {other:?}"),
    }
}
