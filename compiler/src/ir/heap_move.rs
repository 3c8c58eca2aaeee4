//! Heap-escape rewriting
//!
//! When escape analysis decides a variable's address outlives the function,
//! the variable's storage moves to the heap: the variable becomes
//! heap-indirect, reached through a fresh stack-resident pointer slot named
//! `&x`. Parameters additionally keep an on-stack shadow copy used at
//! function entry and return. The liveness analyzer then tracks the pointer
//! slot, never the moved storage.

use super::func::{Func, FuncId, Module};
use super::types::IrType;
use super::vars::{Escape, VarId, VarKind, Variable, BAD_OFFSET};
use diagnostics::gc::GcDiagnostics;
use diagnostics::Diagnostics;

/// Record that `vid`'s address escapes, moving storage to the heap as
/// needed. Closure upvalues forward to their defining variable in the
/// enclosing function; the move then happens in that function's frame.
pub fn addr_escapes(module: &mut Module, fid: FuncId, vid: VarId, diags: &mut Diagnostics) {
    let var = module.func(fid).var(vid);

    // Compiler temporaries are created non-escaping; leave them alone.
    if var.kind == VarKind::Local && var.escape == Escape::Never {
        return;
    }

    if let Some((outer_fid, outer_vid)) = var.closure_defn {
        addr_escapes(module, outer_fid, outer_vid, diags);
        return;
    }

    match var.kind {
        VarKind::ParamIn | VarKind::ParamOut | VarKind::Local => {
            move_to_heap(module, fid, vid, diags);
        }
        VarKind::HeapIndirect => {}
    }
}

/// Rewrite the parameter or local `vid` as moved to the heap.
pub fn move_to_heap(module: &mut Module, fid: FuncId, vid: VarId, diags: &mut Diagnostics) {
    if module.compiling_runtime {
        let var = module.func(fid).var(vid);
        diags.push(GcDiagnostics::heap_escape_forbidden(
            var.loc.to_span(),
            &var.name,
        ));
    }

    let func = module.func_mut(fid);
    if func.var(vid).kind == VarKind::HeapIndirect {
        panic!("double move to heap: {}", func.var(vid).name);
    }

    // Allocate a local stack slot to hold the pointer to the heap copy, and
    // clear auto_temp so the `&x` name survives to liveness analysis.
    let pointee = func.var(vid).ty.clone();
    let heap_addr = temp(func, IrType::ptr(pointee));
    let name = func.var(vid).name.clone();
    {
        let ha = func.var_mut(heap_addr);
        ha.name = format!("&{}", name);
        ha.auto_temp = false;
    }

    // Parameters keep a stack copy used at function start and end in
    // addition to the heap copy that may outlive the function.
    let kind = func.var(vid).kind;
    if kind == VarKind::ParamIn || kind == VarKind::ParamOut {
        if func.var(vid).frame_offset == BAD_OFFSET {
            panic!("addr_escapes before param assignment: {}", name);
        }

        let mut stack_copy = Variable::new(name.clone(), func.var(vid).ty.clone(), kind);
        stack_copy.frame_offset = func.var(vid).frame_offset;
        stack_copy.addr_taken = func.var(vid).addr_taken;
        stack_copy.curfn = func.var(vid).curfn;
        stack_copy.loc = func.var(vid).loc;
        stack_copy.heap_addr = Some(heap_addr);
        let sc_id = VarId(func.vars.len() as u32);
        func.vars.push(stack_copy);

        if kind == VarKind::ParamOut {
            // The pointer to the heap copy must stay live for the whole
            // function: a recovering defer needs it to copy the result back
            // to the stack after a panic.
            func.var_mut(heap_addr).is_output_param_heap_addr = true;
        }
        func.var_mut(vid).stack_copy = Some(sc_id);

        // Substitute the stack copy into the declaration list so analyses of
        // the on-stack slot see it, and append the heap variable at the end.
        let mut found = false;
        for slot in func.decls.iter_mut() {
            if *slot == vid {
                *slot = sc_id;
                found = true;
                break;
            }
            // Parameters precede locals, so the search can stop early.
            if func.vars[slot.index()].kind == VarKind::Local {
                break;
            }
        }
        if !found {
            panic!("cannot find {} in local variable list", name);
        }
        func.decls.push(vid);
    }

    // Modify the variable in place: uses of it now mean indirection through
    // heap_addr.
    let var = func.var_mut(vid);
    var.kind = VarKind::HeapIndirect;
    var.frame_offset = 0;
    var.heap_addr = Some(heap_addr);
    var.escape = Escape::Heap;

    log::debug!("{}: moved to heap: {}", func.name, name);
}

/// Allocate a fresh compiler temporary in `func`'s frame.
fn temp(func: &mut Func, ty: IrType) -> VarId {
    let id = VarId(func.vars.len() as u32);
    let mut var = Variable::new(format!(".autotmp_{}", func.decls.len()), ty, VarKind::Local);
    var.escape = Escape::Never;
    var.auto_temp = true;
    var.used = true;
    var.curfn = Some(func.id);
    func.vars.push(var);
    func.decls.push(id);
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FuncBuilder, VarKind};

    fn module_with(f: crate::ir::Func) -> (Module, FuncId) {
        let mut m = Module::new("test");
        let fid = m.add_func(f);
        (m, fid)
    }

    #[test]
    fn test_move_local_to_heap() {
        let mut b = FuncBuilder::new("f");
        let x = b.local("x", IrType::Int64);
        b.mark_addr_taken(x);
        let (mut m, fid) = module_with(b.finish());
        let mut diags = Diagnostics::new();

        addr_escapes(&mut m, fid, x, &mut diags);

        let f = m.func(fid);
        let var = f.var(x);
        assert_eq!(var.kind, VarKind::HeapIndirect);
        assert_eq!(var.frame_offset, 0);
        assert_eq!(var.escape, Escape::Heap);
        let ha = f.var(var.heap_addr.unwrap());
        assert_eq!(ha.name, "&x");
        assert_eq!(ha.ty, IrType::ptr(IrType::Int64));
        assert!(!ha.auto_temp);
        assert!(ha.should_track());
        assert!(diags.is_empty());
    }

    #[test]
    fn test_move_output_param_pins_heap_addr() {
        let mut b = FuncBuilder::new("g");
        let r = b.param_out("r", IrType::ptr(IrType::Int64));
        b.mark_addr_taken(r);
        let (mut m, fid) = module_with(b.finish());
        let mut diags = Diagnostics::new();

        addr_escapes(&mut m, fid, r, &mut diags);

        let f = m.func(fid);
        let var = f.var(r);
        assert_eq!(var.kind, VarKind::HeapIndirect);
        let sc = f.var(var.stack_copy.unwrap());
        assert_eq!(sc.kind, VarKind::ParamOut);
        assert_eq!(sc.name, "r");
        assert_eq!(sc.heap_addr, var.heap_addr);
        assert!(f.var(var.heap_addr.unwrap()).is_output_param_heap_addr);

        // Declaration list: stack copy replaced r in place, r moved to the end.
        assert_eq!(f.decls[0], var.stack_copy.unwrap());
        assert_eq!(*f.decls.last().unwrap(), r);
    }

    #[test]
    fn test_closure_upvalue_moves_outer_variable() {
        let mut outer = FuncBuilder::new("outer");
        let x = outer.local("x", IrType::Int64);
        outer.mark_addr_taken(x);
        let mut inner = FuncBuilder::new("outer.func1");
        let ux = inner.local("x", IrType::Int64);

        let mut m = Module::new("test");
        let outer_id = m.add_func(outer.finish());
        let inner_id = m.add_func(inner.finish());
        m.func_mut(inner_id).var_mut(ux).closure_defn = Some((outer_id, x));

        let mut diags = Diagnostics::new();
        addr_escapes(&mut m, inner_id, ux, &mut diags);

        assert_eq!(m.func(outer_id).var(x).kind, VarKind::HeapIndirect);
        assert_eq!(m.func(inner_id).var(ux).kind, VarKind::Local);
    }

    #[test]
    #[should_panic(expected = "double move to heap")]
    fn test_double_move_panics() {
        let mut b = FuncBuilder::new("f");
        let x = b.local("x", IrType::Int64);
        b.mark_addr_taken(x);
        let (mut m, fid) = module_with(b.finish());
        let mut diags = Diagnostics::new();
        move_to_heap(&mut m, fid, x, &mut diags);
        move_to_heap(&mut m, fid, x, &mut diags);
    }

    #[test]
    #[should_panic(expected = "addr_escapes before param assignment")]
    fn test_unassigned_param_offset_panics() {
        // Bypass the builder's finish() so the parameter has no offset.
        let mut b = FuncBuilder::new("f");
        b.param_in("x", IrType::Int64);
        let mut f = b.finish();
        f.var_mut(VarId(0)).frame_offset = BAD_OFFSET;
        let (mut m, fid) = module_with(f);
        let mut diags = Diagnostics::new();
        move_to_heap(&mut m, fid, VarId(0), &mut diags);
    }

    #[test]
    fn test_runtime_escape_reports_error() {
        let mut b = FuncBuilder::new("memequal");
        let x = b.local("x", IrType::Int64);
        b.mark_addr_taken(x);
        let (mut m, fid) = module_with(b.finish());
        m.compiling_runtime = true;
        let mut diags = Diagnostics::new();

        addr_escapes(&mut m, fid, x, &mut diags);

        assert!(diags.has_errors());
        let err = diags.errors().next().unwrap();
        assert!(err.message.contains("escapes to heap"));
        // Analysis continues best-effort: the rewrite still happened.
        assert_eq!(m.func(fid).var(x).kind, VarKind::HeapIndirect);
    }

    #[test]
    fn test_never_escaping_temp_is_left_alone() {
        let mut b = FuncBuilder::new("f");
        let t = b.local(".autotmp_0", IrType::Int64);
        let (mut m, fid) = module_with(b.finish());
        m.func_mut(fid).var_mut(t).escape = Escape::Never;
        let mut diags = Diagnostics::new();

        addr_escapes(&mut m, fid, t, &mut diags);
        assert_eq!(m.func(fid).var(t).kind, VarKind::Local);
    }
}
