//! In-memory reference backend.
//!
//! `IrModule` keeps types, values, blocks and instructions in flat
//! arenas behind the opaque handles of the [`Backend`] trait. It is
//! the backend the test suites run against: structurally verifiable,
//! printable, and executable by the evaluator.

use crate::{
    Backend, BinOp, BlockRef, CastKind, FCmpKind, FuncRef, ICmpKind, Linkage, TypeRef, ValueRef,
};
use rustc_hash::FxHashMap;

/// Backend type representation.
#[derive(Clone, Debug, PartialEq)]
pub enum IrType {
    Void,
    /// `bits == 1` is bool
    Int(u32),
    Float(u32),
    Ptr(TypeRef),
    Array(TypeRef, u64),
    Struct {
        name: Option<String>,
        fields: Vec<TypeRef>,
        packed: bool,
        opaque: bool,
    },
    Func {
        ret: TypeRef,
        params: Vec<TypeRef>,
        vararg: bool,
    },
}

/// Backend value representation.
#[derive(Clone, Debug)]
pub enum IrValue {
    ConstInt { ty: TypeRef, value: i64 },
    ConstFloat { ty: TypeRef, value: f64 },
    ConstNull { ty: TypeRef },
    /// pointer to entry `index` of the module string table
    ConstStr { index: usize },
    ConstAgg { ty: TypeRef, elems: Vec<ValueRef> },
    ConstZero { ty: TypeRef },
    /// address of global `index`
    Global { index: usize },
    Param { func: FuncRef, index: usize },
    /// result of an instruction
    Inst { block: BlockRef, index: usize },
}

/// A single instruction.
#[derive(Clone, Debug)]
pub enum Inst {
    Alloca {
        ty: TypeRef,
        name: String,
    },
    Load {
        ty: TypeRef,
        ptr: ValueRef,
        name: String,
    },
    Store {
        value: ValueRef,
        ptr: ValueRef,
    },
    Gep {
        pointee: TypeRef,
        ptr: ValueRef,
        indices: Vec<ValueRef>,
        name: String,
    },
    ExtractValue {
        agg: ValueRef,
        index: u32,
        name: String,
    },
    Memset {
        ptr: ValueRef,
        byte: u8,
        len: u64,
        align: u32,
    },
    Memcpy {
        dst: ValueRef,
        src: ValueRef,
        len: u64,
        align: u32,
    },
    Bin {
        op: BinOp,
        lhs: ValueRef,
        rhs: ValueRef,
        name: String,
    },
    ICmp {
        kind: ICmpKind,
        lhs: ValueRef,
        rhs: ValueRef,
        name: String,
    },
    FCmp {
        kind: FCmpKind,
        lhs: ValueRef,
        rhs: ValueRef,
        name: String,
    },
    Neg {
        value: ValueRef,
        name: String,
    },
    FNeg {
        value: ValueRef,
        name: String,
    },
    Not {
        value: ValueRef,
        name: String,
    },
    Cast {
        kind: CastKind,
        value: ValueRef,
        to: TypeRef,
        name: String,
    },
    Call {
        func: FuncRef,
        args: Vec<ValueRef>,
        name: String,
    },
    Phi {
        ty: TypeRef,
        incomings: Vec<(ValueRef, BlockRef)>,
        name: String,
    },
    Br {
        dest: BlockRef,
    },
    CondBr {
        cond: ValueRef,
        then_block: BlockRef,
        else_block: BlockRef,
    },
    Ret {
        value: Option<ValueRef>,
    },
}

impl Inst {
    #[must_use]
    pub fn is_terminator(&self) -> bool {
        matches!(self, Inst::Br { .. } | Inst::CondBr { .. } | Inst::Ret { .. })
    }

    /// Whether this instruction produces a result value.
    #[must_use]
    pub fn has_result(&self) -> bool {
        !matches!(
            self,
            Inst::Store { .. }
                | Inst::Memset { .. }
                | Inst::Memcpy { .. }
                | Inst::Br { .. }
                | Inst::CondBr { .. }
                | Inst::Ret { .. }
        )
    }
}

#[derive(Clone, Debug)]
pub struct Block {
    pub name: String,
    pub func: FuncRef,
    /// result value handle (when the instruction has one) + instruction
    pub insts: Vec<(Option<ValueRef>, Inst)>,
}

#[derive(Clone, Debug)]
pub struct Function {
    pub name: String,
    pub ty: TypeRef,
    pub linkage: Linkage,
    pub param_names: Vec<String>,
    pub blocks: Vec<BlockRef>,
}

#[derive(Clone, Debug)]
pub struct Global {
    pub name: String,
    pub ty: TypeRef,
    pub init: Option<ValueRef>,
    pub constant: bool,
}

/// The reference IR module.
#[derive(Default, Debug)]
pub struct IrModule {
    pub(crate) types: Vec<IrType>,
    type_lookup: FxHashMap<String, TypeRef>,
    pub(crate) values: Vec<IrValue>,
    pub(crate) blocks: Vec<Block>,
    pub(crate) functions: Vec<Function>,
    func_lookup: FxHashMap<String, FuncRef>,
    pub(crate) globals: Vec<Global>,
    pub(crate) strings: Vec<Vec<u8>>,
    insert_point: Option<BlockRef>,
    next_name: u32,
}

impl IrModule {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn type_of(&self, ty: TypeRef) -> &IrType {
        &self.types[ty.0 as usize]
    }

    #[must_use]
    pub fn value_of(&self, value: ValueRef) -> &IrValue {
        &self.values[value.0 as usize]
    }

    #[must_use]
    pub fn block(&self, block: BlockRef) -> &Block {
        &self.blocks[block.0 as usize]
    }

    #[must_use]
    pub fn function(&self, func: FuncRef) -> &Function {
        &self.functions[func.0 as usize]
    }

    #[must_use]
    pub fn string(&self, index: usize) -> &[u8] {
        &self.strings[index]
    }

    /// Natural size in bytes; pointers are 8 bytes wide.
    #[must_use]
    pub fn type_size(&self, ty: TypeRef) -> u64 {
        match self.type_of(ty) {
            IrType::Void => 0,
            IrType::Int(1) => 1,
            IrType::Int(bits) | IrType::Float(bits) => u64::from(*bits) / 8,
            IrType::Ptr(_) => 8,
            IrType::Array(elem, len) => self.type_size(*elem) * len,
            IrType::Struct { fields, .. } => fields.iter().map(|f| self.type_size(*f)).sum(),
            IrType::Func { .. } => 8,
        }
    }

    fn intern_type(&mut self, key: String, ty: IrType) -> TypeRef {
        if let Some(&r) = self.type_lookup.get(&key) {
            return r;
        }
        let r = TypeRef(self.types.len() as u32);
        self.types.push(ty);
        self.type_lookup.insert(key, r);
        r
    }

    fn push_type(&mut self, ty: IrType) -> TypeRef {
        let r = TypeRef(self.types.len() as u32);
        self.types.push(ty);
        r
    }

    fn push_value(&mut self, value: IrValue) -> ValueRef {
        let r = ValueRef(self.values.len() as u32);
        self.values.push(value);
        r
    }

    fn fresh_name(&mut self, base: &str) -> String {
        self.next_name += 1;
        format!("{base}{}", self.next_name)
    }

    /// Append `inst` at the insert point, returning its result handle
    /// when it produces one.
    fn push_inst(&mut self, inst: Inst) -> Option<ValueRef> {
        let block = self.insert_point.expect("no insert point set");
        let result = if inst.has_result() {
            let index = self.blocks[block.0 as usize].insts.len();
            Some(self.push_value(IrValue::Inst { block, index }))
        } else {
            None
        };
        self.blocks[block.0 as usize].insts.push((result, inst));
        result
    }

    /// Iterate the functions of the module.
    pub fn functions_iter(&self) -> impl Iterator<Item = (FuncRef, &Function)> {
        self.functions
            .iter()
            .enumerate()
            .map(|(i, f)| (FuncRef(i as u32), f))
    }

    /// Verify every function with at least one block.
    pub fn verify(&self) -> Result<(), String> {
        for (fref, f) in self.functions_iter() {
            if !f.blocks.is_empty() {
                self.verify_func_inner(fref)?;
            }
        }
        Ok(())
    }

    fn verify_func_inner(&self, func: FuncRef) -> Result<(), String> {
        let f = self.function(func);
        for &bref in &f.blocks {
            let block = self.block(bref);
            if block.func != func {
                return Err(format!(
                    "function `{}`: block `{}` belongs to another function",
                    f.name, block.name
                ));
            }
            let Some((_, last)) = block.insts.last() else {
                return Err(format!(
                    "function `{}`: block `{}` is empty",
                    f.name, block.name
                ));
            };
            if !last.is_terminator() {
                return Err(format!(
                    "function `{}`: block `{}` does not end with a terminator",
                    f.name, block.name
                ));
            }
            for (i, (_, inst)) in block.insts.iter().enumerate() {
                if inst.is_terminator() && i + 1 != block.insts.len() {
                    return Err(format!(
                        "function `{}`: block `{}` has a terminator before its end",
                        f.name, block.name
                    ));
                }
            }
        }
        Ok(())
    }
}

impl Backend for IrModule {
    fn type_void(&mut self) -> TypeRef {
        self.intern_type("void".into(), IrType::Void)
    }

    fn type_int(&mut self, bits: u32) -> TypeRef {
        self.intern_type(format!("i{bits}"), IrType::Int(bits))
    }

    fn type_float(&mut self, bits: u32) -> TypeRef {
        self.intern_type(format!("f{bits}"), IrType::Float(bits))
    }

    fn type_ptr(&mut self, pointee: TypeRef) -> TypeRef {
        self.intern_type(format!("p{}", pointee.0), IrType::Ptr(pointee))
    }

    fn type_array(&mut self, elem: TypeRef, len: u64) -> TypeRef {
        self.intern_type(format!("a{};{len}", elem.0), IrType::Array(elem, len))
    }

    fn type_struct(&mut self, fields: &[TypeRef], packed: bool) -> TypeRef {
        let key = format!(
            "s{packed}:{}",
            fields
                .iter()
                .map(|f| f.0.to_string())
                .collect::<Vec<_>>()
                .join(",")
        );
        self.intern_type(
            key,
            IrType::Struct {
                name: None,
                fields: fields.to_vec(),
                packed,
                opaque: false,
            },
        )
    }

    fn type_named_struct(&mut self, name: &str) -> TypeRef {
        // named structs are nominal: one entry per name
        let key = format!("n:{name}");
        if let Some(&r) = self.type_lookup.get(&key) {
            return r;
        }
        let r = self.push_type(IrType::Struct {
            name: Some(name.to_string()),
            fields: Vec::new(),
            packed: false,
            opaque: true,
        });
        self.type_lookup.insert(key, r);
        r
    }

    fn set_struct_body(&mut self, ty: TypeRef, fields: &[TypeRef], packed: bool) {
        if let IrType::Struct {
            fields: slot,
            packed: p,
            opaque,
            ..
        } = &mut self.types[ty.0 as usize]
        {
            *slot = fields.to_vec();
            *p = packed;
            *opaque = false;
        }
    }

    fn type_func(&mut self, ret: TypeRef, params: &[TypeRef], vararg: bool) -> TypeRef {
        let key = format!(
            "f{}:{vararg}:{}",
            ret.0,
            params
                .iter()
                .map(|p| p.0.to_string())
                .collect::<Vec<_>>()
                .join(",")
        );
        self.intern_type(
            key,
            IrType::Func {
                ret,
                params: params.to_vec(),
                vararg,
            },
        )
    }

    fn const_int(&mut self, ty: TypeRef, value: i64) -> ValueRef {
        self.push_value(IrValue::ConstInt { ty, value })
    }

    fn const_float(&mut self, ty: TypeRef, value: f64) -> ValueRef {
        self.push_value(IrValue::ConstFloat { ty, value })
    }

    fn const_bool(&mut self, value: bool) -> ValueRef {
        let ty = self.type_int(1);
        self.push_value(IrValue::ConstInt {
            ty,
            value: i64::from(value),
        })
    }

    fn const_null_ptr(&mut self, ty: TypeRef) -> ValueRef {
        self.push_value(IrValue::ConstNull { ty })
    }

    fn const_global_string(&mut self, bytes: &[u8]) -> ValueRef {
        let mut data = bytes.to_vec();
        data.push(0);
        let index = self.strings.len();
        self.strings.push(data);
        self.push_value(IrValue::ConstStr { index })
    }

    fn const_aggregate(&mut self, ty: TypeRef, elems: &[ValueRef]) -> ValueRef {
        self.push_value(IrValue::ConstAgg {
            ty,
            elems: elems.to_vec(),
        })
    }

    fn const_zero(&mut self, ty: TypeRef) -> ValueRef {
        self.push_value(IrValue::ConstZero { ty })
    }

    fn declare_func(
        &mut self,
        name: &str,
        fnty: TypeRef,
        linkage: Linkage,
        param_names: &[&str],
    ) -> FuncRef {
        if let Some(&f) = self.func_lookup.get(name) {
            return f;
        }
        let f = FuncRef(self.functions.len() as u32);
        self.functions.push(Function {
            name: name.to_string(),
            ty: fnty,
            linkage,
            param_names: param_names.iter().map(|s| s.to_string()).collect(),
            blocks: Vec::new(),
        });
        self.func_lookup.insert(name.to_string(), f);
        f
    }

    fn get_func(&self, name: &str) -> Option<FuncRef> {
        self.func_lookup.get(name).copied()
    }

    fn func_param(&mut self, func: FuncRef, index: usize) -> ValueRef {
        // params are interned lazily per (func, index); a linear scan
        // is fine, functions have few params
        for (i, v) in self.values.iter().enumerate() {
            if let IrValue::Param { func: f, index: idx } = v
                && *f == func
                && *idx == index
            {
                return ValueRef(i as u32);
            }
        }
        self.push_value(IrValue::Param { func, index })
    }

    fn append_block(&mut self, func: FuncRef, name: &str) -> BlockRef {
        let name = self.fresh_name(name);
        let b = BlockRef(self.blocks.len() as u32);
        self.blocks.push(Block {
            name,
            func,
            insts: Vec::new(),
        });
        self.functions[func.0 as usize].blocks.push(b);
        b
    }

    fn set_insert_point(&mut self, block: BlockRef) {
        self.insert_point = Some(block);
    }

    fn current_block(&self) -> Option<BlockRef> {
        self.insert_point
    }

    fn verify_func(&self, func: FuncRef) -> Result<(), String> {
        self.verify_func_inner(func)
    }

    fn entry_block_alloca(&mut self, func: FuncRef, ty: TypeRef, name: &str) -> ValueRef {
        let entry = self.functions[func.0 as usize]
            .blocks
            .first()
            .copied()
            .expect("function has no entry block");
        let name = name.to_string();
        // insert after any leading allocas so slot order stays stable
        let insert_at = self.blocks[entry.0 as usize]
            .insts
            .iter()
            .take_while(|(_, i)| matches!(i, Inst::Alloca { .. }))
            .count();
        // shift the recorded indices of any later instruction results
        for value in &mut self.values {
            if let IrValue::Inst { block, index } = value
                && *block == entry
                && *index >= insert_at
            {
                *index += 1;
            }
        }
        let result = self.push_value(IrValue::Inst {
            block: entry,
            index: insert_at,
        });
        self.blocks[entry.0 as usize]
            .insts
            .insert(insert_at, (Some(result), Inst::Alloca { ty, name }));
        result
    }

    fn global_var(&mut self, ty: TypeRef, name: &str, init: Option<ValueRef>) -> ValueRef {
        let index = self.globals.len();
        self.globals.push(Global {
            name: name.to_string(),
            ty,
            init,
            constant: false,
        });
        self.push_value(IrValue::Global { index })
    }

    fn global_const(&mut self, ty: TypeRef, name: &str, init: ValueRef) -> ValueRef {
        let index = self.globals.len();
        self.globals.push(Global {
            name: name.to_string(),
            ty,
            init: Some(init),
            constant: true,
        });
        self.push_value(IrValue::Global { index })
    }

    fn load(&mut self, ty: TypeRef, ptr: ValueRef, name: &str) -> ValueRef {
        let name = name.to_string();
        self.push_inst(Inst::Load { ty, ptr, name }).expect("load result")
    }

    fn store(&mut self, value: ValueRef, ptr: ValueRef) {
        self.push_inst(Inst::Store { value, ptr });
    }

    fn gep(
        &mut self,
        pointee: TypeRef,
        ptr: ValueRef,
        indices: &[ValueRef],
        name: &str,
    ) -> ValueRef {
        let name = name.to_string();
        self.push_inst(Inst::Gep {
            pointee,
            ptr,
            indices: indices.to_vec(),
            name,
        })
        .expect("gep result")
    }

    fn extract_value(&mut self, agg: ValueRef, index: u32, name: &str) -> ValueRef {
        let name = name.to_string();
        self.push_inst(Inst::ExtractValue { agg, index, name })
            .expect("extractvalue result")
    }

    fn memset(&mut self, ptr: ValueRef, byte: u8, len: u64, align: u32) {
        self.push_inst(Inst::Memset {
            ptr,
            byte,
            len,
            align,
        });
    }

    fn memcpy(&mut self, dst: ValueRef, src: ValueRef, len: u64, align: u32) {
        self.push_inst(Inst::Memcpy {
            dst,
            src,
            len,
            align,
        });
    }

    fn binop(&mut self, op: BinOp, lhs: ValueRef, rhs: ValueRef, name: &str) -> ValueRef {
        let name = name.to_string();
        self.push_inst(Inst::Bin { op, lhs, rhs, name })
            .expect("binop result")
    }

    fn icmp(&mut self, kind: ICmpKind, lhs: ValueRef, rhs: ValueRef, name: &str) -> ValueRef {
        let name = name.to_string();
        self.push_inst(Inst::ICmp {
            kind,
            lhs,
            rhs,
            name,
        })
        .expect("icmp result")
    }

    fn fcmp(&mut self, kind: FCmpKind, lhs: ValueRef, rhs: ValueRef, name: &str) -> ValueRef {
        let name = name.to_string();
        self.push_inst(Inst::FCmp {
            kind,
            lhs,
            rhs,
            name,
        })
        .expect("fcmp result")
    }

    fn neg(&mut self, value: ValueRef, name: &str) -> ValueRef {
        let name = name.to_string();
        self.push_inst(Inst::Neg { value, name }).expect("neg result")
    }

    fn fneg(&mut self, value: ValueRef, name: &str) -> ValueRef {
        let name = name.to_string();
        self.push_inst(Inst::FNeg { value, name }).expect("fneg result")
    }

    fn not(&mut self, value: ValueRef, name: &str) -> ValueRef {
        let name = name.to_string();
        self.push_inst(Inst::Not { value, name }).expect("not result")
    }

    fn cast(&mut self, kind: CastKind, value: ValueRef, to: TypeRef, name: &str) -> ValueRef {
        let name = name.to_string();
        self.push_inst(Inst::Cast {
            kind,
            value,
            to,
            name,
        })
        .expect("cast result")
    }

    fn br(&mut self, dest: BlockRef) {
        self.push_inst(Inst::Br { dest });
    }

    fn cond_br(&mut self, cond: ValueRef, then_block: BlockRef, else_block: BlockRef) {
        self.push_inst(Inst::CondBr {
            cond,
            then_block,
            else_block,
        });
    }

    fn ret(&mut self, value: Option<ValueRef>) {
        self.push_inst(Inst::Ret { value });
    }

    fn call(&mut self, func: FuncRef, args: &[ValueRef], name: &str) -> ValueRef {
        let name = name.to_string();
        self.push_inst(Inst::Call {
            func,
            args: args.to_vec(),
            name,
        })
        .expect("call result")
    }

    fn phi(&mut self, ty: TypeRef, incomings: &[(ValueRef, BlockRef)], name: &str) -> ValueRef {
        let name = name.to_string();
        self.push_inst(Inst::Phi {
            ty,
            incomings: incomings.to_vec(),
            name,
        })
        .expect("phi result")
    }

    fn block_terminated(&self, block: BlockRef) -> bool {
        self.block(block)
            .insts
            .last()
            .is_some_and(|(_, inst)| inst.is_terminator())
    }
}

