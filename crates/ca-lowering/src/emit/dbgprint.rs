//! `print` / `printtype` emission: a structural recursive printer
//! over runtime values.

use super::Emitter;
use crate::infer;
use ca_ast::literal::LitKind;
use ca_ast::node::{NodeKind, RangeKind};
use ca_backend::{CastKind, ValueRef};
use ca_common::diagnostics::CaResult;
use ca_common::ids::{NodeId, TypeId};
use ca_common::interner::Atom;
use ca_types::{CaStructKind, CaTypePayload, TypeTok};

impl Emitter<'_> {
    fn printf_str(&mut self, text: &str) {
        let f = self.printf_fn();
        let fmt = self.be.const_global_string(text.as_bytes());
        self.be.call(f, &[fmt], "");
    }

    fn printf_fmt(&mut self, fmt: &str, args: &[ValueRef]) {
        let f = self.printf_fn();
        let fmt = self.be.const_global_string(fmt.as_bytes());
        let mut all = vec![fmt];
        all.extend_from_slice(args);
        self.be.call(f, &all, "");
    }

    /// The printf conversion for a primitive type token.
    fn printf_format(tok: TypeTok) -> &'static str {
        match tok {
            TypeTok::I16 | TypeTok::I32 => "%d",
            TypeTok::I64 => "%ld",
            TypeTok::U16 | TypeTok::U32 => "%u",
            TypeTok::U64 => "%lu",
            TypeTok::F32 => "%f",
            TypeTok::F64 => "%lf",
            TypeTok::I8 | TypeTok::U8 => "%c",
            TypeTok::Bool => "%1d",
            TypeTok::Pointer | TypeTok::CString => "%p",
            _ => "\n",
        }
    }

    fn print_primitive(&mut self, catype: TypeId, v: ValueRef) {
        let tok = self.ctx.types.get(catype).tok;
        // f32 promotes to double through the vararg boundary
        let v = if tok == TypeTok::F32 {
            let f64t = self.be.type_float(64);
            self.be.cast(CastKind::FpExt, v, f64t, "prom")
        } else {
            v
        };
        self.printf_fmt(Self::printf_format(tok), &[v]);
    }

    fn print_value(&mut self, catype: TypeId, v: ValueRef) -> CaResult<()> {
        match self.ctx.types.get(catype).payload.clone() {
            CaTypePayload::Array(a) => {
                self.printf_str("[");
                let len = a.dims[0];
                for i in 0..len {
                    let sub = self.be.extract_value(v, i as u32, "pelem");
                    self.print_value(a.elem, sub)?;
                    if i + 1 < len {
                        self.printf_str(", ");
                    }
                }
                self.printf_str("]");
                Ok(())
            }
            CaTypePayload::Struct(s) => {
                let name = if s.name.is_none() {
                    String::new()
                } else {
                    self.ctx.interner.get(s.name).to_owned()
                };
                let open = match s.kind {
                    CaStructKind::GeneralTuple => format!("{name}( "),
                    CaStructKind::NamedTuple => format!("{name} ( "),
                    CaStructKind::Slice => format!("{name} < "),
                    _ => format!("{name} {{ "),
                };
                self.printf_str(&open);
                let count = s.fields.len();
                for (i, field) in s.fields.iter().enumerate() {
                    if s.kind == CaStructKind::NamedStruct {
                        let fname = self.ctx.interner.get(field.name).to_owned();
                        self.printf_str(&format!("{fname}: "));
                    }
                    let sub = self.be.extract_value(v, i as u32, "pfield");
                    self.print_value(field.ty, sub)?;
                    if i + 1 < count {
                        self.printf_str(", ");
                    }
                }
                let close = match s.kind {
                    CaStructKind::Slice => " >",
                    CaStructKind::GeneralTuple | CaStructKind::NamedTuple => " )",
                    _ => " }",
                };
                self.printf_str(close);
                Ok(())
            }
            CaTypePayload::Range(r) => {
                let dots = if r.inclusive { "..=" } else { ".." };
                match r.kind {
                    RangeKind::Full => {
                        self.printf_str("..");
                        Ok(())
                    }
                    RangeKind::Inclusive | RangeKind::RightExclusive => {
                        let packaged = r.packaged.expect("two-ended range");
                        let (t0, t1) = match &self.ctx.types.get(packaged).payload {
                            CaTypePayload::Struct(s) => (s.fields[0].ty, s.fields[1].ty),
                            _ => (packaged, packaged),
                        };
                        let v0 = self.be.extract_value(v, 0, "rs");
                        self.print_value(t0, v0)?;
                        self.printf_str(dots);
                        let v1 = self.be.extract_value(v, 1, "re");
                        self.print_value(t1, v1)
                    }
                    RangeKind::InclusiveTo | RangeKind::RightExclusiveTo => {
                        self.printf_str(dots);
                        let elem = r.packaged.expect("bounded range");
                        self.print_value(elem, v)
                    }
                    RangeKind::From => {
                        let elem = r.packaged.expect("bounded range");
                        self.print_value(elem, v)?;
                        self.printf_str("..");
                        Ok(())
                    }
                }
            }
            _ => {
                self.print_primitive(catype, v);
                Ok(())
            }
        }
    }

    pub(crate) fn walk_dbgprint(&mut self, node: NodeId, expr: NodeId) -> CaResult<()> {
        infer::inference_expr_type(self.ctx, expr)?;
        let (v, catype) = self.walk_right_value(expr, true)?;
        let _ = node;

        // string literals print as text, not as a pointer
        let is_cstring = matches!(
            &self.ctx.nodes.get(expr).kind,
            NodeKind::Literal(lit) if lit.kind == LitKind::CString
        ) || self.ctx.types.get(catype).tok == TypeTok::CString;
        if is_cstring {
            self.printf_fmt("%s", &[v]);
            self.printf_str("\n");
            return Ok(());
        }

        self.print_value(catype, v)?;
        self.printf_str("\n");
        Ok(())
    }

    pub(crate) fn walk_dbgprinttype(&mut self, node: NodeId, typeid: Atom) -> CaResult<()> {
        let scope = self.ctx.nodes.get(node).scope;
        let span = self.ctx.span_of(node);
        let catype = self.ctx.get_type_at(scope, typeid, span.beg)?;
        let size = self.ctx.types.get(catype).size.max(0);
        let sig = self.ctx.sig_text(catype);
        self.printf_str(&format!("size = {size}, type: {sig}\n"));
        Ok(())
    }
}
