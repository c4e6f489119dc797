//! Evaluator for the reference IR.
//!
//! Executes a verified module starting from an entry function,
//! capturing `printf` output. This is what the end-to-end tests run
//! instead of a JIT: same IR, observable behavior.
//!
//! The machine model is object-based rather than byte-based: every
//! alloca/global/heap cell is an object holding a (possibly aggregate)
//! runtime value, and pointers are object-plus-path references. GEP
//! arithmetic therefore only moves within arrays and aggregates, which
//! is exactly what the lowering driver emits.

use crate::ir::{Inst, IrModule, IrType, IrValue};
use crate::{BinOp, Backend, BlockRef, CastKind, FCmpKind, FuncRef, ICmpKind, TypeRef, ValueRef};
use rustc_hash::FxHashMap;

const STEP_LIMIT: u64 = 50_000_000;

/// A runtime value.
#[derive(Clone, Debug)]
pub enum RtVal {
    Int(i64),
    Float(f64),
    Ptr(RtPtr),
    Agg(Vec<RtVal>),
    Uninit,
}

/// A runtime pointer: an object reference plus an access path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RtPtr {
    Null,
    Obj { obj: usize, path: Vec<usize> },
    /// pointer into the module string table
    Str(usize),
}

struct RtObj {
    ty: Option<TypeRef>,
    val: RtVal,
    freed: bool,
}

/// The evaluator over one module.
pub struct Evaluator<'m> {
    module: &'m IrModule,
    objects: Vec<RtObj>,
    global_objs: Vec<usize>,
    param_values: FxHashMap<(u32, usize), ValueRef>,
    output: String,
    steps: u64,
}

type EvalResult<T> = Result<T, String>;

impl<'m> Evaluator<'m> {
    #[must_use]
    pub fn new(module: &'m IrModule) -> Self {
        let mut param_values = FxHashMap::default();
        for (i, v) in module.values.iter().enumerate() {
            if let IrValue::Param { func, index } = v {
                param_values.insert((func.0, *index), ValueRef(i as u32));
            }
        }
        Evaluator {
            module,
            objects: Vec::new(),
            global_objs: Vec::new(),
            param_values,
            output: String::new(),
            steps: 0,
        }
    }

    /// Run `entry` with no arguments; returns its result and the
    /// captured `printf` output.
    pub fn run(mut self, entry: &str) -> EvalResult<(RtVal, String)> {
        // materialize globals
        for g in &self.module.globals {
            let val = match g.init {
                Some(init) => self.eval_const(init)?,
                None => self.zero_of(g.ty),
            };
            let obj = self.objects.len();
            self.objects.push(RtObj {
                ty: Some(g.ty),
                val,
                freed: false,
            });
            self.global_objs.push(obj);
        }
        let func = self
            .module
            .get_func(entry)
            .ok_or_else(|| format!("no function named `{entry}`"))?;
        let ret = self.call(func, Vec::new())?;
        Ok((ret, self.output))
    }

    fn zero_of(&self, ty: TypeRef) -> RtVal {
        match self.module.type_of(ty) {
            IrType::Void => RtVal::Uninit,
            IrType::Int(_) => RtVal::Int(0),
            IrType::Float(_) => RtVal::Float(0.0),
            IrType::Ptr(_) => RtVal::Ptr(RtPtr::Null),
            IrType::Array(elem, len) => {
                RtVal::Agg(vec![self.zero_of(*elem); *len as usize])
            }
            IrType::Struct { fields, .. } => {
                RtVal::Agg(fields.iter().map(|f| self.zero_of(*f)).collect())
            }
            IrType::Func { .. } => RtVal::Ptr(RtPtr::Null),
        }
    }

    fn eval_const(&mut self, value: ValueRef) -> EvalResult<RtVal> {
        match self.module.value_of(value) {
            IrValue::ConstInt { value, .. } => Ok(RtVal::Int(*value)),
            IrValue::ConstFloat { value, .. } => Ok(RtVal::Float(*value)),
            IrValue::ConstNull { .. } => Ok(RtVal::Ptr(RtPtr::Null)),
            IrValue::ConstStr { index } => Ok(RtVal::Ptr(RtPtr::Str(*index))),
            IrValue::ConstZero { ty } => Ok(self.zero_of(*ty)),
            IrValue::ConstAgg { elems, .. } => {
                let mut vals = Vec::with_capacity(elems.len());
                for &e in elems {
                    vals.push(self.eval_const(e)?);
                }
                Ok(RtVal::Agg(vals))
            }
            other => Err(format!("not a constant: {other:?}")),
        }
    }

    fn call(&mut self, func: FuncRef, args: Vec<RtVal>) -> EvalResult<RtVal> {
        let f = self.module.function(func);
        if f.blocks.is_empty() {
            return self.call_intrinsic(&f.name.clone(), args);
        }

        let mut frame: FxHashMap<u32, RtVal> = FxHashMap::default();
        for (i, arg) in args.into_iter().enumerate() {
            if let Some(&pv) = self.param_values.get(&(func.0, i)) {
                frame.insert(pv.0, arg);
            }
        }

        let module = self.module;
        let mut block = f.blocks[0];
        let mut prev_block: Option<BlockRef> = None;
        'blocks: loop {
            let insts = &module.block(block).insts;
            for (result, inst) in insts {
                self.steps += 1;
                if self.steps > STEP_LIMIT {
                    return Err("step limit exceeded (runaway loop?)".to_string());
                }
                match inst {
                    Inst::Br { dest } => {
                        prev_block = Some(block);
                        block = *dest;
                        continue 'blocks;
                    }
                    Inst::CondBr {
                        cond,
                        then_block,
                        else_block,
                    } => {
                        let c = self.eval(&frame, *cond)?.as_int()?;
                        prev_block = Some(block);
                        block = if c != 0 { *then_block } else { *else_block };
                        continue 'blocks;
                    }
                    Inst::Ret { value } => {
                        return match value {
                            Some(v) => self.eval(&frame, *v),
                            None => Ok(RtVal::Uninit),
                        };
                    }
                    _ => {
                        let out = self.exec(&mut frame, inst, prev_block)?;
                        if let Some(r) = result {
                            frame.insert(r.0, out);
                        }
                    }
                }
            }
            return Err(format!(
                "block `{}` fell through without terminator",
                self.module.block(block).name
            ));
        }
    }

    fn eval(&mut self, frame: &FxHashMap<u32, RtVal>, value: ValueRef) -> EvalResult<RtVal> {
        match self.module.value_of(value) {
            IrValue::Global { index } => Ok(RtVal::Ptr(RtPtr::Obj {
                obj: self.global_objs[*index],
                path: Vec::new(),
            })),
            IrValue::Param { .. } | IrValue::Inst { .. } => frame
                .get(&value.0)
                .cloned()
                .ok_or_else(|| format!("use of undefined value {value:?}")),
            _ => self.eval_const(value),
        }
    }

    /// Static type of a value, where recoverable; used for width-aware
    /// integer semantics.
    fn value_type(&self, value: ValueRef) -> Option<TypeRef> {
        match self.module.value_of(value) {
            IrValue::ConstInt { ty, .. }
            | IrValue::ConstFloat { ty, .. }
            | IrValue::ConstNull { ty }
            | IrValue::ConstZero { ty }
            | IrValue::ConstAgg { ty, .. } => Some(*ty),
            IrValue::Global { .. } | IrValue::ConstStr { .. } | IrValue::Param { .. } => None,
            IrValue::Inst { block, index } => {
                let (_, inst) = &self.module.block(*block).insts[*index];
                match inst {
                    Inst::Load { ty, .. } | Inst::Phi { ty, .. } | Inst::Cast { to: ty, .. } => {
                        Some(*ty)
                    }
                    Inst::Bin { lhs, .. } => self.value_type(*lhs),
                    Inst::ICmp { .. } | Inst::FCmp { .. } | Inst::Not { .. } => None,
                    _ => None,
                }
            }
        }
    }

    fn int_width(&self, value: ValueRef) -> u32 {
        self.value_type(value)
            .and_then(|ty| match self.module.type_of(ty) {
                IrType::Int(bits) => Some(*bits),
                _ => None,
            })
            .unwrap_or(64)
    }

    fn exec(
        &mut self,
        frame: &mut FxHashMap<u32, RtVal>,
        inst: &Inst,
        prev_block: Option<BlockRef>,
    ) -> EvalResult<RtVal> {
        match inst {
            Inst::Alloca { ty, .. } => {
                let obj = self.objects.len();
                self.objects.push(RtObj {
                    ty: Some(*ty),
                    val: RtVal::Uninit,
                    freed: false,
                });
                Ok(RtVal::Ptr(RtPtr::Obj {
                    obj,
                    path: Vec::new(),
                }))
            }
            Inst::Load { ptr, .. } => {
                let p = self.eval(frame, *ptr)?.as_ptr()?;
                self.read_ptr(&p)
            }
            Inst::Store { value, ptr } => {
                let v = self.eval(frame, *value)?;
                let p = self.eval(frame, *ptr)?.as_ptr()?;
                self.write_ptr(&p, v)?;
                Ok(RtVal::Uninit)
            }
            Inst::Gep { ptr, indices, .. } => {
                let base = self.eval(frame, *ptr)?.as_ptr()?;
                let RtPtr::Obj { obj, mut path } = base else {
                    return Err("gep over a non-object pointer".to_string());
                };
                let mut idx_vals = Vec::with_capacity(indices.len());
                for &i in indices {
                    idx_vals.push(self.eval(frame, i)?.as_int()?);
                }
                // the first index steps over the pointer itself
                if let Some(&first) = idx_vals.first()
                    && first != 0
                {
                    match path.last_mut() {
                        Some(last) => {
                            let next = (*last as i64) + first;
                            if next < 0 {
                                return Err("gep moved before the object".to_string());
                            }
                            *last = next as usize;
                        }
                        None => return Err("pointer arithmetic over a whole object".to_string()),
                    }
                }
                for &i in idx_vals.iter().skip(1) {
                    if i < 0 {
                        return Err("negative gep index".to_string());
                    }
                    path.push(i as usize);
                }
                Ok(RtVal::Ptr(RtPtr::Obj { obj, path }))
            }
            Inst::ExtractValue { agg, index, .. } => {
                let v = self.eval(frame, *agg)?;
                match v {
                    RtVal::Agg(elems) => elems
                        .get(*index as usize)
                        .cloned()
                        .ok_or_else(|| "extractvalue out of range".to_string()),
                    other => Err(format!("extractvalue on non-aggregate {other:?}")),
                }
            }
            Inst::Memset { ptr, byte, .. } => {
                let p = self.eval(frame, *ptr)?.as_ptr()?;
                if *byte != 0 {
                    return Err("only zero memset is modeled".to_string());
                }
                let RtPtr::Obj { obj, path } = &p else {
                    return Err("memset over non-object pointer".to_string());
                };
                if path.is_empty() {
                    let zero = self
                        .objects[*obj]
                        .ty
                        .map(|t| self.zero_of(t))
                        .unwrap_or(RtVal::Uninit);
                    self.objects[*obj].val = zero;
                } else {
                    // zero a sub-object: overwrite with a zero of its
                    // current shape
                    let cur = self.read_ptr(&p)?;
                    self.write_ptr(&p, zero_like(&cur))?;
                }
                Ok(RtVal::Uninit)
            }
            Inst::Memcpy { dst, src, .. } => {
                let d = self.eval(frame, *dst)?.as_ptr()?;
                let s = self.eval(frame, *src)?.as_ptr()?;
                let v = self.read_ptr(&s)?;
                self.write_ptr(&d, v)?;
                Ok(RtVal::Uninit)
            }
            Inst::Bin { op, lhs, rhs, .. } => {
                let a = self.eval(frame, *lhs)?;
                let b = self.eval(frame, *rhs)?;
                self.binop(*op, a, b, self.int_width(*lhs))
            }
            Inst::ICmp { kind, lhs, rhs, .. } => {
                let a = self.eval(frame, *lhs)?.as_int()?;
                let b = self.eval(frame, *rhs)?.as_int()?;
                let width = self.int_width(*lhs);
                let (ua, ub) = (to_unsigned(a, width), to_unsigned(b, width));
                let r = match kind {
                    ICmpKind::Eq => a == b,
                    ICmpKind::Ne => a != b,
                    ICmpKind::Slt => a < b,
                    ICmpKind::Sle => a <= b,
                    ICmpKind::Sgt => a > b,
                    ICmpKind::Sge => a >= b,
                    ICmpKind::Ult => ua < ub,
                    ICmpKind::Ule => ua <= ub,
                    ICmpKind::Ugt => ua > ub,
                    ICmpKind::Uge => ua >= ub,
                };
                Ok(RtVal::Int(i64::from(r)))
            }
            Inst::FCmp { kind, lhs, rhs, .. } => {
                let a = self.eval(frame, *lhs)?.as_float()?;
                let b = self.eval(frame, *rhs)?.as_float()?;
                let r = match kind {
                    FCmpKind::Oeq => a == b,
                    FCmpKind::One => a != b,
                    FCmpKind::Olt => a < b,
                    FCmpKind::Ole => a <= b,
                    FCmpKind::Ogt => a > b,
                    FCmpKind::Oge => a >= b,
                };
                Ok(RtVal::Int(i64::from(r)))
            }
            Inst::Neg { value, .. } => {
                let v = self.eval(frame, *value)?.as_int()?;
                Ok(RtVal::Int(v.wrapping_neg()))
            }
            Inst::FNeg { value, .. } => {
                let v = self.eval(frame, *value)?.as_float()?;
                Ok(RtVal::Float(-v))
            }
            Inst::Not { value, .. } => {
                let v = self.eval(frame, *value)?;
                match v {
                    // bool not when operand is i1, bitwise otherwise
                    RtVal::Int(i) => {
                        let width = self.int_width(*value);
                        if width == 1 {
                            Ok(RtVal::Int(i64::from(i == 0)))
                        } else {
                            Ok(RtVal::Int(!i))
                        }
                    }
                    other => Err(format!("not on non-integer {other:?}")),
                }
            }
            Inst::Cast { kind, value, to, .. } => {
                let v = self.eval(frame, *value)?;
                self.cast(*kind, v, *value, *to)
            }
            Inst::Call { func, args, .. } => {
                let mut vals = Vec::with_capacity(args.len());
                for &a in args {
                    vals.push(self.eval(frame, a)?);
                }
                self.call(*func, vals)
            }
            Inst::Phi { incomings, .. } => {
                let pred =
                    prev_block.ok_or_else(|| "phi in entry block".to_string())?;
                for (v, b) in incomings {
                    if *b == pred {
                        return self.eval(frame, *v);
                    }
                }
                Err("phi has no incoming for predecessor".to_string())
            }
            Inst::Br { .. } | Inst::CondBr { .. } | Inst::Ret { .. } => {
                unreachable!("terminators handled by the block loop")
            }
        }
    }

    fn binop(&self, op: BinOp, a: RtVal, b: RtVal, width: u32) -> EvalResult<RtVal> {
        use BinOp::*;
        // pointer arithmetic went through gep; binops are numeric
        match op {
            FAdd | FSub | FMul | FDiv | FRem => {
                let (x, y) = (a.as_float()?, b.as_float()?);
                let r = match op {
                    FAdd => x + y,
                    FSub => x - y,
                    FMul => x * y,
                    FDiv => x / y,
                    _ => x % y,
                };
                Ok(RtVal::Float(r))
            }
            _ => {
                let (x, y) = (a.as_int()?, b.as_int()?);
                let r = match op {
                    Add => x.wrapping_add(y),
                    Sub => x.wrapping_sub(y),
                    Mul => x.wrapping_mul(y),
                    SDiv => {
                        if y == 0 {
                            return Err("integer division by zero".to_string());
                        }
                        x.wrapping_div(y)
                    }
                    UDiv => {
                        if y == 0 {
                            return Err("integer division by zero".to_string());
                        }
                        (to_unsigned(x, width) / to_unsigned(y, width)) as i64
                    }
                    SRem => {
                        if y == 0 {
                            return Err("integer remainder by zero".to_string());
                        }
                        x.wrapping_rem(y)
                    }
                    URem => {
                        if y == 0 {
                            return Err("integer remainder by zero".to_string());
                        }
                        (to_unsigned(x, width) % to_unsigned(y, width)) as i64
                    }
                    And => x & y,
                    Or => x | y,
                    Xor => x ^ y,
                    Shl => x.wrapping_shl(y as u32),
                    LShr => (to_unsigned(x, width) >> (y as u32)) as i64,
                    AShr => x.wrapping_shr(y as u32),
                    _ => unreachable!(),
                };
                Ok(RtVal::Int(sign_extend(r, width)))
            }
        }
    }

    fn cast(&self, kind: CastKind, v: RtVal, src: ValueRef, to: TypeRef) -> EvalResult<RtVal> {
        let to_bits = match self.module.type_of(to) {
            IrType::Int(b) => *b,
            IrType::Float(b) => *b,
            _ => 64,
        };
        match kind {
            CastKind::Trunc => {
                let x = v.as_int()?;
                Ok(RtVal::Int(sign_extend(x, to_bits)))
            }
            CastKind::ZExt => {
                let x = v.as_int()?;
                let from = self.int_width(src);
                Ok(RtVal::Int(to_unsigned(x, from) as i64))
            }
            CastKind::SExt => Ok(RtVal::Int(v.as_int()?)),
            CastKind::FpToSi => Ok(RtVal::Int(sign_extend(v.as_float()? as i64, to_bits))),
            CastKind::FpToUi => Ok(RtVal::Int(v.as_float()? as u64 as i64)),
            CastKind::SiToFp => Ok(RtVal::Float(v.as_int()? as f64)),
            CastKind::UiToFp => {
                let from = self.int_width(src);
                Ok(RtVal::Float(to_unsigned(v.as_int()?, from) as f64))
            }
            CastKind::FpTrunc => Ok(RtVal::Float(f64::from(v.as_float()? as f32))),
            CastKind::FpExt => Ok(RtVal::Float(v.as_float()?)),
            CastKind::PtrToInt => match v {
                RtVal::Ptr(RtPtr::Null) => Ok(RtVal::Int(0)),
                RtVal::Ptr(_) => Err("ptrtoint of a live pointer is not modeled".to_string()),
                other => Err(format!("ptrtoint on {other:?}")),
            },
            CastKind::IntToPtr => {
                let x = v.as_int()?;
                if x == 0 {
                    Ok(RtVal::Ptr(RtPtr::Null))
                } else {
                    Err("inttoptr of a non-zero value is not modeled".to_string())
                }
            }
            CastKind::BitCast => Ok(v),
        }
    }

    fn read_ptr(&self, ptr: &RtPtr) -> EvalResult<RtVal> {
        match ptr {
            RtPtr::Null => Err("load through null pointer".to_string()),
            RtPtr::Str(index) => Ok(RtVal::Ptr(RtPtr::Str(*index))),
            RtPtr::Obj { obj, path } => {
                let o = &self.objects[*obj];
                if o.freed {
                    return Err("load through freed pointer".to_string());
                }
                let mut cur = &o.val;
                for &i in path {
                    match cur {
                        RtVal::Agg(elems) => {
                            cur = elems
                                .get(i)
                                .ok_or_else(|| "path out of range".to_string())?;
                        }
                        RtVal::Uninit => return Err("read of uninitialized memory".to_string()),
                        other => {
                            return Err(format!("path step into scalar {other:?}"));
                        }
                    }
                }
                match cur {
                    RtVal::Uninit => Err("read of uninitialized memory".to_string()),
                    v => Ok(v.clone()),
                }
            }
        }
    }

    fn write_ptr(&mut self, ptr: &RtPtr, value: RtVal) -> EvalResult<()> {
        match ptr {
            RtPtr::Null => Err("store through null pointer".to_string()),
            RtPtr::Str(_) => Err("store into constant string".to_string()),
            RtPtr::Obj { obj, path } => {
                if self.objects[*obj].freed {
                    return Err("store through freed pointer".to_string());
                }
                // materialize aggregate shells along the path so a
                // store into a fresh alloca works
                let mut cur = &mut self.objects[*obj].val;
                for &i in path {
                    if matches!(cur, RtVal::Uninit) {
                        *cur = RtVal::Agg(Vec::new());
                    }
                    match cur {
                        RtVal::Agg(elems) => {
                            if elems.len() <= i {
                                elems.resize(i + 1, RtVal::Uninit);
                            }
                            cur = &mut elems[i];
                        }
                        other => {
                            return Err(format!("path step into scalar {other:?}"));
                        }
                    }
                }
                *cur = value;
                Ok(())
            }
        }
    }

    fn call_intrinsic(&mut self, name: &str, args: Vec<RtVal>) -> EvalResult<RtVal> {
        match name {
            "printf" => self.intrinsic_printf(args),
            "GC_malloc" => {
                let obj = self.objects.len();
                self.objects.push(RtObj {
                    ty: None,
                    val: RtVal::Uninit,
                    freed: false,
                });
                Ok(RtVal::Ptr(RtPtr::Obj {
                    obj,
                    path: Vec::new(),
                }))
            }
            "GC_free" => {
                match args.first() {
                    Some(RtVal::Ptr(RtPtr::Obj { obj, .. })) => {
                        self.objects[*obj].freed = true;
                    }
                    Some(RtVal::Ptr(RtPtr::Null)) => {}
                    other => return Err(format!("GC_free on {other:?}")),
                }
                Ok(RtVal::Uninit)
            }
            other => Err(format!("call to undefined external function `{other}`")),
        }
    }

    fn intrinsic_printf(&mut self, args: Vec<RtVal>) -> EvalResult<RtVal> {
        let Some(RtVal::Ptr(RtPtr::Str(index))) = args.first() else {
            return Err("printf format must be a constant string".to_string());
        };
        let fmt = self.module.string(*index);
        let fmt = std::str::from_utf8(fmt.strip_suffix(&[0]).unwrap_or(fmt))
            .map_err(|_| "printf format is not UTF-8".to_string())?
            .to_string();
        let mut rest = args.into_iter().skip(1);
        let mut out = String::new();
        let mut chars = fmt.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            // collect the specifier; `l` and width digits are
            // prefixes, the conversion character ends it
            let mut spec = String::new();
            while let Some(&n) = chars.peek() {
                spec.push(n);
                chars.next();
                if matches!(n, 'd' | 'u' | 'c' | 'f' | 's' | 'p' | '%') {
                    break;
                }
            }
            match spec.as_str() {
                "%" => out.push('%'),
                "d" | "ld" | "1d" => out.push_str(&next_int(&mut rest)?.to_string()),
                "u" | "lu" => {
                    out.push_str(&(next_int(&mut rest)? as u64).to_string());
                }
                "c" => {
                    let v = next_int(&mut rest)? as u8;
                    out.push(v as char);
                }
                "f" | "lf" => {
                    out.push_str(&format!("{:.6}", next_float(&mut rest)?));
                }
                "p" => match rest.next() {
                    Some(RtVal::Ptr(RtPtr::Null)) => out.push_str("(nil)"),
                    Some(RtVal::Ptr(RtPtr::Obj { obj, .. })) => {
                        out.push_str(&format!("0x{obj:x}"));
                    }
                    Some(RtVal::Ptr(RtPtr::Str(s))) => out.push_str(&format!("0s{s:x}")),
                    other => return Err(format!("%p on {other:?}")),
                },
                "s" => match rest.next() {
                    Some(RtVal::Ptr(RtPtr::Str(s))) => {
                        let bytes = self.module.string(s);
                        let bytes = bytes.strip_suffix(&[0]).unwrap_or(bytes);
                        out.push_str(&String::from_utf8_lossy(bytes));
                    }
                    other => return Err(format!("%s on {other:?}")),
                },
                other => return Err(format!("unsupported printf specifier %{other}")),
            }
        }
        let written = out.len() as i64;
        self.output.push_str(&out);
        Ok(RtVal::Int(written))
    }
}

fn next_int(args: &mut impl Iterator<Item = RtVal>) -> EvalResult<i64> {
    args.next()
        .ok_or_else(|| "printf missing argument".to_string())?
        .as_int()
}

fn next_float(args: &mut impl Iterator<Item = RtVal>) -> EvalResult<f64> {
    args.next()
        .ok_or_else(|| "printf missing argument".to_string())?
        .as_float()
}

fn zero_like(v: &RtVal) -> RtVal {
    match v {
        RtVal::Int(_) => RtVal::Int(0),
        RtVal::Float(_) => RtVal::Float(0.0),
        RtVal::Ptr(_) => RtVal::Ptr(RtPtr::Null),
        RtVal::Agg(elems) => RtVal::Agg(elems.iter().map(zero_like).collect()),
        RtVal::Uninit => RtVal::Uninit,
    }
}

fn sign_extend(v: i64, bits: u32) -> i64 {
    if bits == 0 || bits >= 64 {
        return v;
    }
    if bits == 1 {
        return v & 1;
    }
    let shift = 64 - bits;
    (v << shift) >> shift
}

fn to_unsigned(v: i64, bits: u32) -> u64 {
    if bits == 0 || bits >= 64 {
        return v as u64;
    }
    (v as u64) & ((1u64 << bits) - 1)
}

impl RtVal {
    fn as_int(&self) -> EvalResult<i64> {
        match self {
            RtVal::Int(v) => Ok(*v),
            other => Err(format!("expected integer value, found {other:?}")),
        }
    }

    fn as_float(&self) -> EvalResult<f64> {
        match self {
            RtVal::Float(v) => Ok(*v),
            other => Err(format!("expected float value, found {other:?}")),
        }
    }

    fn as_ptr(&self) -> EvalResult<RtPtr> {
        match self {
            RtVal::Ptr(p) => Ok(p.clone()),
            other => Err(format!("expected pointer value, found {other:?}")),
        }
    }

    /// Integer result of a program run, for test assertions.
    #[must_use]
    pub fn int_or(&self, default: i64) -> i64 {
        match self {
            RtVal::Int(v) => *v,
            _ => default,
        }
    }
}
