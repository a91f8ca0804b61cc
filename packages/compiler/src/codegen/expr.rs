//! Expression emission.

use crate::codegen::TsEmitter;
use crate::error::Result;
use crate::source::{ast, Expr, UnaryOp};
use crate::types::Type;

impl TsEmitter<'_> {
    /// Central expression dispatcher: translates an expression used as a
    /// value into TypeScript.
    pub(crate) fn write_value_expr(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Ident(e) => {
                self.write_ident(e, true);
                Ok(())
            }
            Expr::BasicLit(e) => {
                self.write_basic_lit(e);
                Ok(())
            }
            Expr::CompositeLit(e) => self.write_composite_lit(e),
            Expr::FuncLit(e) => self.write_func_lit(e),
            Expr::Paren(e) => {
                self.w.write_literally("(");
                self.write_value_expr(&e.x)?;
                self.w.write_literally(")");
                Ok(())
            }
            Expr::Selector(e) => self.write_selector_expr(e),
            Expr::Index(e) => self.write_index_expr(e),
            Expr::Slice(e) => self.write_slice_expr(e),
            Expr::TypeAssert(e) => self.write_type_assert_expr(e),
            Expr::Call(e) => self.write_call_expr(e),
            Expr::Star(e) => self.write_star_expr(e),
            Expr::Unary(e) => self.write_unary_expr(e),
            Expr::Binary(e) => self.write_binary_expr(e),
            Expr::KeyValue(e) => {
                self.write_value_expr(&e.key)?;
                self.w.write_literally(": ");
                self.write_value_expr(&e.value)
            }
            other => Err(self.err(
                "expression",
                format!("type expression in value position: {other:?}"),
            )),
        }
    }

    fn write_basic_lit(&mut self, lit: &ast::BasicLit) {
        match lit.kind {
            ast::LitKind::String => {
                // Raw (backquoted) literals become template literals with
                // their backslashes and interpolation markers escaped.
                if let Some(body) = lit
                    .raw
                    .strip_prefix('`')
                    .and_then(|r| r.strip_suffix('`'))
                {
                    let escaped = body
                        .replace('\\', "\\\\")
                        .replace('`', "\\`")
                        .replace("${", "\\${");
                    self.w.write_literally(&format!("`{escaped}`"));
                } else {
                    self.w.write_literally(&lit.raw);
                }
            }
            ast::LitKind::Char => {
                // Rune literals are numeric code points in the target.
                if let Some(value) = self
                    .pkg
                    .info
                    .const_of(lit.id)
                    .cloned()
                {
                    self.write_constant_value(&value);
                } else {
                    self.w.write_literally(&lit.raw);
                }
            }
            _ => self.w.write_literally(&lit.raw),
        }
    }

    fn write_unary_expr(&mut self, e: &ast::UnaryExpr) -> Result<()> {
        match e.op {
            UnaryOp::Addr => self.write_address_of(&e.x),
            UnaryOp::Recv => {
                self.w.write_literally("await $.chanRecv(");
                self.write_value_expr(&e.x)?;
                self.w.write_literally(")");
                Ok(())
            }
            UnaryOp::Not => {
                self.w.write_literally("!");
                self.write_value_expr(&e.x)
            }
            UnaryOp::Minus => {
                self.w.write_literally("-");
                self.write_value_expr(&e.x)
            }
            UnaryOp::Plus => {
                self.w.write_literally("+");
                self.write_value_expr(&e.x)
            }
            UnaryOp::Xor => {
                self.w.write_literally("~");
                self.write_value_expr(&e.x)
            }
        }
    }

    /// `&x`. A reified variable already is the reference cell, so the bare
    /// name is the pointer. Composite literals are fresh heap values.
    fn write_address_of(&mut self, operand: &Expr) -> Result<()> {
        match operand.unparen() {
            Expr::Ident(ident) => {
                if let Some(obj) = self.obj_of(ident) {
                    if self.analysis.needs_var_ref(obj) {
                        let name = self.sanitize(&ident.name);
                        self.w.write_literally(&name);
                        return Ok(());
                    }
                }
                // Address of a binding the analysis did not reify; the
                // value itself is the best available representation.
                self.write_value_expr(operand)
            }
            Expr::CompositeLit(lit) => self.write_composite_lit(lit),
            Expr::Selector(sel) => {
                // &x.F hands out the field's backing cell.
                self.write_selector_base(sel)?;
                let name = format!("_{}", sel.sel.name);
                self.w.write_literally(&name);
                Ok(())
            }
            Expr::Index(idx) => {
                // &a[i]: the runtime boxes element references.
                self.w.write_literally("$.elemRef(");
                self.write_value_expr(&idx.x)?;
                self.w.write_literally(", ");
                self.write_value_expr(&idx.index)?;
                self.w.write_literally(")");
                Ok(())
            }
            other => Err(self.err("address-of", format!("unhandled operand: {other:?}"))),
        }
    }

    /// Pointer dereference used as a value.
    pub(crate) fn write_star_expr(&mut self, e: &ast::StarExpr) -> Result<()> {
        self.write_value_expr(&e.x)?;
        self.write_deref_suffix(&e.x);
        Ok(())
    }

    /// The dereference suffix depends on what the pointer holds: struct
    /// pointers are the class instance itself, everything else is a
    /// reference cell read.
    pub(crate) fn write_deref_suffix(&mut self, pointer: &Expr) {
        if let Expr::Ident(ident) = pointer.unparen() {
            if let Some(obj) = self.obj_of(ident) {
                if self.analysis.is_var_ref_alias(obj) {
                    self.w.write_literally("!.value");
                    return;
                }
            }
        }
        if self.pointee_is_struct(pointer) {
            self.w.write_literally("!");
        } else {
            self.w.write_literally("!.value");
        }
    }

    pub(crate) fn pointee_is_struct(&self, pointer: &Expr) -> bool {
        let Some(t) = self.type_of(pointer) else {
            return false;
        };
        let Type::Pointer { elem } = self.program.underlying(t) else {
            return false;
        };
        self.program.underlying(*elem).is_struct()
    }

    fn write_binary_expr(&mut self, e: &ast::BinaryExpr) -> Result<()> {
        use crate::source::BinaryOp;
        if e.op == BinaryOp::AndNot {
            // x &^ y has no target operator; clear the masked bits.
            self.w.write_literally("(");
            self.write_value_expr(&e.x)?;
            self.w.write_literally(" & ~(");
            self.write_value_expr(&e.y)?;
            self.w.write_literally("))");
            return Ok(());
        }
        self.write_value_expr(&e.x)?;
        let op = e
            .op
            .to_ts()
            .ok_or_else(|| self.err("binary operator", format!("{:?}", e.op)))?;
        self.w.write_literally(&format!(" {op} "));
        self.write_value_expr(&e.y)
    }

    pub(crate) fn write_index_expr(&mut self, e: &ast::IndexExpr) -> Result<()> {
        if self.is_map(&e.x) {
            // Pure value read of a map entry; the two-value form is
            // handled by the assignment emitter.
            self.w.write_literally("$.mapGet(");
            self.write_value_expr(&e.x)?;
            self.w.write_literally(", ");
            self.write_value_expr(&e.index)?;
            self.w.write_literally(").value");
            return Ok(());
        }
        if matches!(self.underlying_of(&e.x), Some(Type::Basic { basic }) if basic.is_string()) {
            self.w.write_literally("$.indexString(");
            self.write_value_expr(&e.x)?;
            self.w.write_literally(", ");
            self.write_value_expr(&e.index)?;
            self.w.write_literally(")");
            return Ok(());
        }
        self.write_value_expr(&e.x)?;
        self.w.write_literally("![");
        self.write_value_expr(&e.index)?;
        self.w.write_literally("]");
        Ok(())
    }

    fn write_slice_expr(&mut self, e: &ast::SliceExpr) -> Result<()> {
        self.w.write_literally("$.goSlice(");
        self.write_value_expr(&e.x)?;
        self.w.write_literally(", ");
        match &e.low {
            Some(low) => self.write_value_expr(low)?,
            None => self.w.write_literally("undefined"),
        }
        self.w.write_literally(", ");
        match &e.high {
            Some(high) => self.write_value_expr(high)?,
            None => self.w.write_literally("undefined"),
        }
        if let Some(max) = &e.max {
            self.w.write_literally(", ");
            self.write_value_expr(max)?;
        }
        self.w.write_literally(")");
        Ok(())
    }

    /// Single-value type assertion `x.(T)`: panics (throws) on mismatch.
    pub(crate) fn write_type_assert_expr(&mut self, e: &ast::TypeAssertExpr) -> Result<()> {
        self.w.write_literally("$.mustTypeAssert<");
        self.write_type_expr(&e.typ)?;
        self.w.write_literally(">(");
        self.write_value_expr(&e.x)?;
        self.w.write_literally(", ");
        self.write_type_description(&e.typ)?;
        self.w.write_literally(")");
        Ok(())
    }

    pub(crate) fn write_composite_lit(&mut self, lit: &ast::CompositeLit) -> Result<()> {
        let type_id = lit
            .typ
            .as_deref()
            .and_then(|t| self.pkg.info.type_of(t.id()))
            .or_else(|| self.pkg.info.type_of(lit.id));

        let underlying = type_id.map(|t| self.program.underlying(t));

        match underlying {
            Some(Type::Struct { fields }) => {
                let fields = fields.clone();
                self.w.write_literally("new ");
                if let Some(typ) = lit.typ.as_deref() {
                    self.write_type_expr(typ)?;
                } else if let Some(t) = type_id {
                    let name = self.ts_type_name(t);
                    self.w.write_literally(&name);
                }
                self.w.write_literally("({");
                for (i, elt) in lit.elts.iter().enumerate() {
                    if i != 0 {
                        self.w.write_literally(", ");
                    }
                    match elt {
                        Expr::KeyValue(kv) => {
                            let Expr::Ident(field) = kv.key.as_ref() else {
                                return Err(
                                    self.err("composite literal", "non-identifier struct key")
                                );
                            };
                            let name = self.sanitize(&field.name);
                            self.w.write_literally(&name);
                            self.w.write_literally(": ");
                            self.write_value_expr(&kv.value)?;
                        }
                        positional => {
                            let Some(field) = fields.get(i) else {
                                return Err(self.err(
                                    "composite literal",
                                    "positional element without matching field",
                                ));
                            };
                            let name = self.sanitize(&field.name);
                            self.w.write_literally(&name);
                            self.w.write_literally(": ");
                            self.write_value_expr(positional)?;
                        }
                    }
                }
                self.w.write_literally("})");
                Ok(())
            }
            Some(Type::Map { .. }) => {
                self.w.write_literally("$.newMap([");
                for (i, elt) in lit.elts.iter().enumerate() {
                    if i != 0 {
                        self.w.write_literally(", ");
                    }
                    let Expr::KeyValue(kv) = elt else {
                        return Err(self.err("composite literal", "map element without key"));
                    };
                    self.w.write_literally("[");
                    self.write_value_expr(&kv.key)?;
                    self.w.write_literally(", ");
                    self.write_value_expr(&kv.value)?;
                    self.w.write_literally("]");
                }
                self.w.write_literally("])");
                Ok(())
            }
            Some(Type::Slice { .. }) | Some(Type::Array { .. }) | None => {
                self.w.write_literally("[");
                for (i, elt) in lit.elts.iter().enumerate() {
                    if i != 0 {
                        self.w.write_literally(", ");
                    }
                    if matches!(elt, Expr::KeyValue(_)) {
                        return Err(self.err("composite literal", "keyed array element"));
                    }
                    self.write_value_expr(elt)?;
                }
                self.w.write_literally("]");
                Ok(())
            }
            Some(other) => Err(self.err(
                "composite literal",
                format!("unhandled literal type: {other:?}"),
            )),
        }
    }
}
