//! Textual rendering of the reference IR.
//!
//! The format is LLVM-flavored but deliberately simple: it exists for
//! `-ll`-style output and for readable test failures, not for
//! round-tripping.

use crate::ir::{Inst, IrModule, IrType, IrValue};
use crate::{BinOp, CastKind, FCmpKind, ICmpKind, Linkage, TypeRef, ValueRef};
use std::fmt;

impl IrModule {
    fn fmt_type(&self, ty: TypeRef, out: &mut String) {
        match self.type_of(ty) {
            IrType::Void => out.push_str("void"),
            IrType::Int(bits) => out.push_str(&format!("i{bits}")),
            IrType::Float(32) => out.push_str("float"),
            IrType::Float(_) => out.push_str("double"),
            IrType::Ptr(inner) => {
                self.fmt_type(*inner, out);
                out.push('*');
            }
            IrType::Array(elem, len) => {
                out.push('[');
                out.push_str(&format!("{len} x "));
                self.fmt_type(*elem, out);
                out.push(']');
            }
            IrType::Struct { name: Some(n), .. } => {
                out.push_str(&format!("%{n}"));
            }
            IrType::Struct { fields, .. } => {
                out.push_str("{ ");
                for (i, f) in fields.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.fmt_type(*f, out);
                }
                out.push_str(" }");
            }
            IrType::Func { ret, params, vararg } => {
                self.fmt_type(*ret, out);
                out.push('(');
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.fmt_type(*p, out);
                }
                if *vararg {
                    out.push_str(", ...");
                }
                out.push(')');
            }
        }
    }

    fn fmt_value(&self, value: ValueRef, out: &mut String) {
        match self.value_of(value) {
            IrValue::ConstInt { value, .. } => out.push_str(&value.to_string()),
            IrValue::ConstFloat { value, .. } => out.push_str(&format!("{value:e}")),
            IrValue::ConstNull { .. } => out.push_str("null"),
            IrValue::ConstStr { index } => out.push_str(&format!("@.str.{index}")),
            IrValue::ConstZero { .. } => out.push_str("zeroinitializer"),
            IrValue::ConstAgg { elems, .. } => {
                out.push('[');
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.fmt_value(*e, out);
                }
                out.push(']');
            }
            IrValue::Global { index } => {
                out.push_str(&format!("@{}", self.globals[*index].name));
            }
            IrValue::Param { func, index } => {
                let f = self.function(*func);
                let name = f
                    .param_names
                    .get(*index)
                    .map_or("arg", |s| s.as_str());
                out.push_str(&format!("%{name}"));
            }
            IrValue::Inst { block, index } => {
                let (_, inst) = &self.block(*block).insts[*index];
                out.push_str(&format!("%{}", inst_name(inst)));
            }
        }
    }
}

fn inst_name(inst: &Inst) -> &str {
    match inst {
        Inst::Alloca { name, .. }
        | Inst::Load { name, .. }
        | Inst::Gep { name, .. }
        | Inst::ExtractValue { name, .. }
        | Inst::Bin { name, .. }
        | Inst::ICmp { name, .. }
        | Inst::FCmp { name, .. }
        | Inst::Neg { name, .. }
        | Inst::FNeg { name, .. }
        | Inst::Not { name, .. }
        | Inst::Cast { name, .. }
        | Inst::Call { name, .. }
        | Inst::Phi { name, .. } => name,
        _ => "",
    }
}

fn binop_name(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "add",
        BinOp::Sub => "sub",
        BinOp::Mul => "mul",
        BinOp::SDiv => "sdiv",
        BinOp::UDiv => "udiv",
        BinOp::SRem => "srem",
        BinOp::URem => "urem",
        BinOp::FAdd => "fadd",
        BinOp::FSub => "fsub",
        BinOp::FMul => "fmul",
        BinOp::FDiv => "fdiv",
        BinOp::FRem => "frem",
        BinOp::And => "and",
        BinOp::Or => "or",
        BinOp::Xor => "xor",
        BinOp::Shl => "shl",
        BinOp::LShr => "lshr",
        BinOp::AShr => "ashr",
    }
}

fn icmp_name(kind: ICmpKind) -> &'static str {
    match kind {
        ICmpKind::Eq => "eq",
        ICmpKind::Ne => "ne",
        ICmpKind::Slt => "slt",
        ICmpKind::Sle => "sle",
        ICmpKind::Sgt => "sgt",
        ICmpKind::Sge => "sge",
        ICmpKind::Ult => "ult",
        ICmpKind::Ule => "ule",
        ICmpKind::Ugt => "ugt",
        ICmpKind::Uge => "uge",
    }
}

fn fcmp_name(kind: FCmpKind) -> &'static str {
    match kind {
        FCmpKind::Oeq => "oeq",
        FCmpKind::One => "one",
        FCmpKind::Olt => "olt",
        FCmpKind::Ole => "ole",
        FCmpKind::Ogt => "ogt",
        FCmpKind::Oge => "oge",
    }
}

fn cast_name(kind: CastKind) -> &'static str {
    match kind {
        CastKind::Trunc => "trunc",
        CastKind::ZExt => "zext",
        CastKind::SExt => "sext",
        CastKind::FpToUi => "fptoui",
        CastKind::FpToSi => "fptosi",
        CastKind::UiToFp => "uitofp",
        CastKind::SiToFp => "sitofp",
        CastKind::FpTrunc => "fptrunc",
        CastKind::FpExt => "fpext",
        CastKind::PtrToInt => "ptrtoint",
        CastKind::IntToPtr => "inttoptr",
        CastKind::BitCast => "bitcast",
    }
}

impl fmt::Display for IrModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, s) in self.strings.iter().enumerate() {
            writeln!(f, "@.str.{i} = private constant [{} x i8] c{:?}", s.len(), s)?;
        }
        for g in &self.globals {
            let mut ty = String::new();
            self.fmt_type(g.ty, &mut ty);
            let kind = if g.constant { "constant" } else { "global" };
            match g.init {
                Some(init) => {
                    let mut v = String::new();
                    self.fmt_value(init, &mut v);
                    writeln!(f, "@{} = {kind} {ty} {v}", g.name)?;
                }
                None => writeln!(f, "@{} = {kind} {ty} zeroinitializer", g.name)?,
            }
        }
        for (_, func) in self.functions_iter() {
            let mut ty = String::new();
            self.fmt_type(func.ty, &mut ty);
            if func.blocks.is_empty() {
                writeln!(f, "\ndeclare {ty} @{}", func.name)?;
                continue;
            }
            let linkage = match func.linkage {
                Linkage::External => "",
                Linkage::Internal => "internal ",
            };
            writeln!(f, "\ndefine {linkage}{ty} @{} {{", func.name)?;
            for &bref in &func.blocks {
                let block = self.block(bref);
                writeln!(f, "{}:", block.name)?;
                for (result, inst) in &block.insts {
                    let mut line = String::from("  ");
                    if let Some(r) = result {
                        self.fmt_value(*r, &mut line);
                        line.push_str(" = ");
                    }
                    self.fmt_inst(inst, &mut line);
                    writeln!(f, "{line}")?;
                }
            }
            writeln!(f, "}}")?;
        }
        Ok(())
    }
}

impl IrModule {
    fn fmt_inst(&self, inst: &Inst, out: &mut String) {
        match inst {
            Inst::Alloca { ty, .. } => {
                out.push_str("alloca ");
                self.fmt_type(*ty, out);
            }
            Inst::Load { ty, ptr, .. } => {
                out.push_str("load ");
                self.fmt_type(*ty, out);
                out.push_str(", ");
                self.fmt_value(*ptr, out);
            }
            Inst::Store { value, ptr } => {
                out.push_str("store ");
                self.fmt_value(*value, out);
                out.push_str(", ");
                self.fmt_value(*ptr, out);
            }
            Inst::Gep {
                pointee,
                ptr,
                indices,
                ..
            } => {
                out.push_str("getelementptr ");
                self.fmt_type(*pointee, out);
                out.push_str(", ");
                self.fmt_value(*ptr, out);
                for idx in indices {
                    out.push_str(", ");
                    self.fmt_value(*idx, out);
                }
            }
            Inst::ExtractValue { agg, index, .. } => {
                out.push_str("extractvalue ");
                self.fmt_value(*agg, out);
                out.push_str(&format!(", {index}"));
            }
            Inst::Memset { ptr, byte, len, .. } => {
                out.push_str("memset ");
                self.fmt_value(*ptr, out);
                out.push_str(&format!(", {byte}, {len}"));
            }
            Inst::Memcpy { dst, src, len, .. } => {
                out.push_str("memcpy ");
                self.fmt_value(*dst, out);
                out.push_str(", ");
                self.fmt_value(*src, out);
                out.push_str(&format!(", {len}"));
            }
            Inst::Bin { op, lhs, rhs, .. } => {
                out.push_str(binop_name(*op));
                out.push(' ');
                self.fmt_value(*lhs, out);
                out.push_str(", ");
                self.fmt_value(*rhs, out);
            }
            Inst::ICmp { kind, lhs, rhs, .. } => {
                out.push_str("icmp ");
                out.push_str(icmp_name(*kind));
                out.push(' ');
                self.fmt_value(*lhs, out);
                out.push_str(", ");
                self.fmt_value(*rhs, out);
            }
            Inst::FCmp { kind, lhs, rhs, .. } => {
                out.push_str("fcmp ");
                out.push_str(fcmp_name(*kind));
                out.push(' ');
                self.fmt_value(*lhs, out);
                out.push_str(", ");
                self.fmt_value(*rhs, out);
            }
            Inst::Neg { value, .. } => {
                out.push_str("neg ");
                self.fmt_value(*value, out);
            }
            Inst::FNeg { value, .. } => {
                out.push_str("fneg ");
                self.fmt_value(*value, out);
            }
            Inst::Not { value, .. } => {
                out.push_str("not ");
                self.fmt_value(*value, out);
            }
            Inst::Cast { kind, value, to, .. } => {
                out.push_str(cast_name(*kind));
                out.push(' ');
                self.fmt_value(*value, out);
                out.push_str(" to ");
                self.fmt_type(*to, out);
            }
            Inst::Call { func, args, .. } => {
                out.push_str("call @");
                out.push_str(&self.function(*func).name);
                out.push('(');
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.fmt_value(*a, out);
                }
                out.push(')');
            }
            Inst::Phi { incomings, .. } => {
                out.push_str("phi ");
                for (i, (v, b)) in incomings.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push('[');
                    self.fmt_value(*v, out);
                    out.push_str(&format!(", %{}", self.block(*b).name));
                    out.push(']');
                }
            }
            Inst::Br { dest } => {
                out.push_str(&format!("br label %{}", self.block(*dest).name));
            }
            Inst::CondBr {
                cond,
                then_block,
                else_block,
            } => {
                out.push_str("br ");
                self.fmt_value(*cond, out);
                out.push_str(&format!(
                    ", label %{}, label %{}",
                    self.block(*then_block).name,
                    self.block(*else_block).name
                ));
            }
            Inst::Ret { value: Some(v) } => {
                out.push_str("ret ");
                self.fmt_value(*v, out);
            }
            Inst::Ret { value: None } => out.push_str("ret void"),
        }
    }
}
