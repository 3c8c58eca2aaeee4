//! Function builder — programmatic construction of backend IR
//!
//! Provides a builder API for constructing `Func` bodies without going
//! through the frontend, used by the driver for runtime stubs and heavily by
//! the analysis tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use compiler::ir::{BlockKind, FuncBuilder, IrType};
//!
//! let mut b = FuncBuilder::new("grow");
//! let p = b.local("p", IrType::ptr(IrType::Int64));
//! b.var_def(p);
//! b.store(p);
//! b.call("alloc");
//! b.load(p);
//! let ret = b.new_block(BlockKind::Return);
//! b.edge_from_current(ret);
//! let func = b.finish();
//! ```

use super::blocks::{Block, BlockId, BlockKind};
use super::func::Func;
use super::types::IrType;
use super::values::{Aux, Op, Value, ValueId};
use super::vars::{VarId, VarKind, Variable};
use super::IrSourceLocation;

/// Builder for a single function.
pub struct FuncBuilder {
    func: Func,
    cur: BlockId,
}

impl FuncBuilder {
    /// Create a builder with an empty entry block.
    pub fn new(name: impl Into<String>) -> Self {
        let mut func = Func::new(name);
        let entry = BlockId(0);
        func.blocks.push(Block::new(entry, BlockKind::Normal));
        func.entry = entry;
        Self { func, cur: entry }
    }

    /// Continue building an existing function, e.g. after the escape
    /// rewriter has reshaped its variables. Insertion resumes at the entry
    /// block; `finish` re-lays the frame.
    pub fn reopen(func: Func) -> Self {
        let cur = func.entry;
        Self { func, cur }
    }

    fn add_var(&mut self, name: &str, ty: IrType, kind: VarKind) -> VarId {
        let id = VarId(self.func.vars.len() as u32);
        let mut var = Variable::new(name, ty, kind);
        var.curfn = Some(self.func.id);
        self.func.vars.push(var);
        self.func.decls.push(id);
        id
    }

    /// Declare an incoming parameter. Parameters must be declared before
    /// locals so the declaration list keeps its params-then-locals shape.
    pub fn param_in(&mut self, name: &str, ty: IrType) -> VarId {
        self.add_var(name, ty, VarKind::ParamIn)
    }

    /// Declare a result parameter.
    pub fn param_out(&mut self, name: &str, ty: IrType) -> VarId {
        self.add_var(name, ty, VarKind::ParamOut)
    }

    /// Declare a local.
    pub fn local(&mut self, name: &str, ty: IrType) -> VarId {
        self.add_var(name, ty, VarKind::Local)
    }

    pub fn mark_addr_taken(&mut self, v: VarId) {
        self.func.var_mut(v).addr_taken = true;
    }

    /// Simulate frame allocation pruning the slot.
    pub fn mark_unused(&mut self, v: VarId) {
        self.func.var_mut(v).used = false;
    }

    pub fn set_has_defer(&mut self) {
        self.func.has_defer = true;
    }

    pub fn set_location(&mut self, loc: IrSourceLocation) {
        self.func.loc = loc;
    }

    /// Create a new block; does not switch to it.
    pub fn new_block(&mut self, kind: BlockKind) -> BlockId {
        let id = BlockId(self.func.blocks.len() as u32);
        self.func.blocks.push(Block::new(id, kind));
        id
    }

    /// Switch the insertion point.
    pub fn set_block(&mut self, b: BlockId) {
        self.cur = b;
    }

    pub fn current_block(&self) -> BlockId {
        self.cur
    }

    /// Add a CFG edge, maintaining both edge lists.
    pub fn edge(&mut self, from: BlockId, to: BlockId) {
        self.func.blocks[from.index()].succs.push(to);
        self.func.blocks[to.index()].preds.push(from);
    }

    /// Add an edge from the current block.
    pub fn edge_from_current(&mut self, to: BlockId) {
        self.edge(self.cur, to);
    }

    /// Append a value to the current block.
    pub fn value(&mut self, op: Op, aux: Aux, args: Vec<ValueId>) -> ValueId {
        self.value_at(op, aux, args, IrSourceLocation::unknown())
    }

    pub fn value_at(
        &mut self,
        op: Op,
        aux: Aux,
        args: Vec<ValueId>,
        loc: IrSourceLocation,
    ) -> ValueId {
        let id = ValueId(self.func.values.len() as u32);
        let mut v = Value::new(op, aux, args);
        v.loc = loc;
        self.func.values.push(v);
        self.func.blocks[self.cur.index()].values.push(id);
        id
    }

    fn aux_for(&self, v: VarId) -> Aux {
        if self.func.var(v).is_param() {
            Aux::Arg(v)
        } else {
            Aux::Auto(v)
        }
    }

    pub fn var_def(&mut self, v: VarId) -> ValueId {
        let aux = self.aux_for(v);
        self.value(Op::VarDef, aux, vec![])
    }

    pub fn var_kill(&mut self, v: VarId) -> ValueId {
        let aux = self.aux_for(v);
        self.value(Op::VarKill, aux, vec![])
    }

    pub fn var_live(&mut self, v: VarId) -> ValueId {
        let aux = self.aux_for(v);
        self.value(Op::VarLive, aux, vec![])
    }

    pub fn load(&mut self, v: VarId) -> ValueId {
        let aux = self.aux_for(v);
        self.value(Op::Load, aux, vec![])
    }

    pub fn store(&mut self, v: VarId) -> ValueId {
        let aux = self.aux_for(v);
        self.value(Op::Store, aux, vec![])
    }

    pub fn addr_of(&mut self, v: VarId) -> ValueId {
        let aux = self.aux_for(v);
        self.value(Op::Addr, aux, vec![])
    }

    pub fn zero_slot(&mut self, v: VarId) -> ValueId {
        let aux = self.aux_for(v);
        self.value(Op::Zero, aux, vec![])
    }

    /// Spill to the variable's backing slot; returns the slot value for use
    /// as the argument of `load_reg`/`keep_alive`.
    pub fn store_reg(&mut self, v: VarId) -> ValueId {
        let aux = self.aux_for(v);
        self.value(Op::StoreReg, aux, vec![])
    }

    pub fn load_reg(&mut self, slot: ValueId) -> ValueId {
        self.value(Op::LoadReg, Aux::None, vec![slot])
    }

    pub fn keep_alive(&mut self, slot: ValueId) -> ValueId {
        self.value(Op::KeepAlive, Aux::None, vec![slot])
    }

    pub fn call(&mut self, target: &str) -> ValueId {
        self.value(Op::StaticCall, Aux::Extern(target.to_string()), vec![])
    }

    pub fn call_at(&mut self, target: &str, loc: IrSourceLocation) -> ValueId {
        self.value_at(Op::StaticCall, Aux::Extern(target.to_string()), vec![], loc)
    }

    pub fn call_indirect(&mut self) -> ValueId {
        self.value(Op::InterCall, Aux::None, vec![])
    }

    pub fn suspend(&mut self) -> ValueId {
        self.value(Op::Suspend, Aux::None, vec![])
    }

    /// Seal the function: assign frame offsets and region sizes via
    /// [`Func::layout_frame`].
    pub fn finish(mut self) -> Func {
        self.func.layout_frame();
        self.func
    }
}
