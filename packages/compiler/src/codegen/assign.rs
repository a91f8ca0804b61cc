//! Assignment statement emission: destructuring, reference cells, map
//! writes, channel receives and struct value-copy semantics.

use crate::codegen::TsEmitter;
use crate::error::Result;
use crate::source::{ast, AssignOp, Expr, UnaryOp};

impl TsEmitter<'_> {
    pub(crate) fn write_stmt_assign(&mut self, stmt: &ast::AssignStmt) -> Result<()> {
        // A short declaration that re-binds a visible name gets its fresh
        // binding renamed to a deterministic temporary; the rename stays
        // active for the rest of the enclosing block.
        if let Some(renames) = self.analysis.rebinds(stmt.id).map(|r| r.to_vec()) {
            for (obj, temp) in renames {
                self.push_subst(obj, temp);
            }
        }

        self.write_assignment_core(&stmt.lhs, stmt.tok, &stmt.rhs)?;
        self.w.write_line("");
        Ok(())
    }

    /// Central assignment logic, shared with `if`/`switch` initializers.
    pub(crate) fn write_assignment_core(
        &mut self,
        lhs: &[Expr],
        tok: AssignOp,
        rhs: &[Expr],
    ) -> Result<()> {
        // v, ok := <-ch
        if lhs.len() == 2 && rhs.len() == 1 {
            if let Expr::Unary(unary) = rhs[0].unparen() {
                if unary.op == UnaryOp::Recv {
                    let chan = (*unary.x).clone();
                    return self.write_channel_recv_with_ok(lhs, tok, &chan);
                }
            }
            // v, ok := x.(T)
            if let Expr::TypeAssert(assert) = rhs[0].unparen() {
                let assert = assert.clone();
                return self.write_type_assert_with_ok(lhs, tok, &assert);
            }
            // v, ok := m[k]
            if let Expr::Index(index) = rhs[0].unparen() {
                if self.is_map(&index.x) {
                    let index = index.clone();
                    return self.write_map_read_with_ok(lhs, tok, &index);
                }
            }
        }

        // _ = expr evaluates for side effects only.
        if lhs.len() == 1 && rhs.len() == 1 && lhs[0].is_blank() {
            self.w.write_literally("/* _ = */ ");
            return self.write_value_expr(&rhs[0]);
        }

        // *p = v and *p op= v.
        if lhs.len() == 1 && rhs.len() == 1 {
            if let Expr::Star(star) = lhs[0].unparen() {
                let star = star.clone();
                return self.write_deref_assign(&star, tok, &rhs[0]);
            }
        }

        // m[k] = v (and compound forms) through the map helpers.
        if lhs.len() == 1 && rhs.len() == 1 && tok != AssignOp::Define {
            if let Expr::Index(index) = lhs[0].unparen() {
                if self.is_map(&index.x) {
                    let index = index.clone();
                    return self.write_map_set(&index, tok, &rhs[0]);
                }
            }
        }

        // Multi-value forms destructure.
        if lhs.len() > 1 {
            return self.write_destructuring(lhs, tok, rhs);
        }

        // Single definition.
        if tok == AssignOp::Define {
            let Expr::Ident(ident) = lhs[0].unparen() else {
                return Err(self.err("short declaration", "left side is not an identifier"));
            };
            let reified = self
                .obj_of(ident)
                .is_some_and(|o| self.analysis.needs_var_ref(o));
            self.w.write_literally("let ");
            let name = self.local_binding_name(ident);
            self.w.write_literally(&name);
            self.w.write_literally(" = ");
            if reified {
                self.w.write_literally("$.varRef(");
                self.write_single_rhs(&rhs[0])?;
                self.w.write_literally(")");
            } else {
                self.write_single_rhs(&rhs[0])?;
            }
            return Ok(());
        }

        // Single plain or compound assignment.
        match lhs[0].unparen() {
            Expr::Ident(ident) => {
                let reified = self
                    .obj_of(ident)
                    .is_some_and(|o| self.analysis.needs_var_ref(o));
                self.write_ident(&ident.clone(), reified);
            }
            _ => {
                self.write_value_expr(&lhs[0])?;
            }
        }
        self.write_assign_operator(tok)?;
        self.write_single_rhs(&rhs[0])?;
        if tok == AssignOp::AndNot {
            self.w.write_literally(")");
        }
        Ok(())
    }

    /// Writes ` op= ` including the `&^=` rewrite, leaving its closing
    /// parenthesis to the caller.
    fn write_assign_operator(&mut self, tok: AssignOp) -> Result<()> {
        if tok == AssignOp::AndNot {
            self.w.write_literally(" &= ~(");
            return Ok(());
        }
        let op = tok
            .to_ts()
            .ok_or_else(|| self.err("assignment operator", format!("{tok:?}")))?;
        self.w.write_literally(&format!(" {op} "));
        Ok(())
    }

    /// RHS of a single assignment, inserting the struct value-copy clone
    /// when the type requires it.
    pub(crate) fn write_single_rhs(&mut self, rhs: &Expr) -> Result<()> {
        if self.should_apply_clone(rhs) {
            self.w.write_literally("$.markAsStructValue(");
            self.write_value_expr(rhs)?;
            self.w.write_literally(".clone())");
            return Ok(());
        }
        self.write_value_expr(rhs)
    }

    /// `*p = v`: the pointer's cell is written through. A reified pointer
    /// needs the extra hop (`p!.value!.value = …`).
    fn write_deref_assign(&mut self, star: &ast::StarExpr, tok: AssignOp, rhs: &Expr) -> Result<()> {
        if let Expr::Ident(ident) = star.x.unparen() {
            let reified = self
                .obj_of(ident)
                .is_some_and(|o| self.analysis.needs_var_ref(o));
            self.write_ident(&ident.clone(), reified);
        } else {
            self.write_value_expr(&star.x)?;
        }
        self.w.write_literally("!.value");
        self.write_assign_operator(tok)?;
        self.write_single_rhs(rhs)?;
        if tok == AssignOp::AndNot {
            self.w.write_literally(")");
        }
        Ok(())
    }

    fn write_map_set(&mut self, index: &ast::IndexExpr, tok: AssignOp, rhs: &Expr) -> Result<()> {
        self.w.write_literally("$.mapSet(");
        self.write_value_expr(&index.x)?;
        self.w.write_literally(", ");
        self.write_value_expr(&index.index)?;
        self.w.write_literally(", ");
        if tok != AssignOp::Assign {
            // Compound map assignment reads, combines, writes back.
            self.w.write_literally("$.mapGet(");
            self.write_value_expr(&index.x)?;
            self.w.write_literally(", ");
            self.write_value_expr(&index.index)?;
            self.w.write_literally(").value");
            match tok {
                AssignOp::AndNot => self.w.write_literally(" & ~("),
                _ => {
                    let op = compound_binary_op(tok)
                        .ok_or_else(|| self.err("map assignment", format!("{tok:?}")))?;
                    self.w.write_literally(&format!(" {op} ("));
                }
            }
            self.write_value_expr(rhs)?;
            self.w.write_literally(")");
        } else {
            self.write_single_rhs(rhs)?;
        }
        self.w.write_literally(")");
        Ok(())
    }

    /// Multi-assignment via array destructuring. Blank identifiers leave
    /// empty slots; all-index swaps get non-null assertions; non-declaring
    /// forms take a leading semicolon so the pattern is not parsed as an
    /// index into the previous line.
    fn write_destructuring(&mut self, lhs: &[Expr], tok: AssignOp, rhs: &[Expr]) -> Result<()> {
        let all_index = lhs
            .iter()
            .chain(rhs.iter())
            .all(|e| matches!(e.unparen(), Expr::Index(_)));

        let mut declare = tok == AssignOp::Define;
        if declare {
            // A short declaration may re-bind existing names; those are
            // uses, not defs, and cannot be re-declared.
            let any_redecl = lhs.iter().any(|e| {
                matches!(e.unparen(), Expr::Ident(id)
                    if !id.is_blank() && !self.pkg.info.defs.contains_key(&id.id))
            });
            if any_redecl {
                // Pre-declare the genuinely new names, then assign all.
                for e in lhs {
                    if let Expr::Ident(ident) = e.unparen() {
                        if !ident.is_blank() && self.pkg.info.defs.contains_key(&ident.id) {
                            let name = self.sanitize(&ident.name);
                            self.w.write_line(&format!("let {name}"));
                        }
                    }
                }
                declare = false;
            }
        }

        if declare {
            self.w.write_literally("let [");
        } else {
            self.w.write_literally(";[");
        }

        for (i, l) in lhs.iter().enumerate() {
            if i != 0 {
                self.w.write_literally(", ");
            }
            if l.is_blank() {
                continue;
            }
            match l.unparen() {
                Expr::Index(index) if all_index => {
                    self.write_value_expr(&index.x)?;
                    self.w.write_literally("![");
                    self.write_value_expr(&index.index)?;
                    self.w.write_literally("]");
                }
                Expr::Ident(ident) => {
                    let reified = self
                        .obj_of(ident)
                        .is_some_and(|o| self.analysis.needs_var_ref(o));
                    if declare {
                        let name = self.local_binding_name(ident);
                        self.w.write_literally(&name);
                    } else {
                        self.write_ident(&ident.clone(), reified);
                    }
                }
                _ => self.write_value_expr(l)?,
            }
        }
        self.w.write_literally("] = ");

        if rhs.len() == 1 {
            // Tuple-returning call: destructure its result directly.
            self.write_value_expr(&rhs[0])?;
            return Ok(());
        }

        self.w.write_literally("[");
        for (i, r) in rhs.iter().enumerate() {
            if i != 0 {
                self.w.write_literally(", ");
            }
            match r.unparen() {
                Expr::Index(index) if all_index => {
                    self.write_value_expr(&index.x)?;
                    self.w.write_literally("![");
                    self.write_value_expr(&index.index)?;
                    self.w.write_literally("]");
                }
                _ => self.write_single_rhs(r)?,
            }
        }
        self.w.write_literally("]");
        Ok(())
    }

    /// `v, ok := <-ch` destructures the awaited receive helper.
    pub(crate) fn write_channel_recv_with_ok(
        &mut self,
        lhs: &[Expr],
        tok: AssignOp,
        chan: &Expr,
    ) -> Result<()> {
        if lhs.len() != 2 {
            return Err(self.err(
                "channel receive",
                format!("receive-with-ok needs 2 targets, got {}", lhs.len()),
            ));
        }
        let value_name = binding_name(self, &lhs[0])?;
        let ok_name = binding_name(self, &lhs[1])?;

        // Both blank: only the suspension matters.
        if value_name.is_none() && ok_name.is_none() {
            self.w.write_literally("await $.chanRecvWithOk(");
            self.write_value_expr(chan)?;
            self.w.write_literally(")");
            return Ok(());
        }

        let mut parts = Vec::new();
        if let Some(v) = &value_name {
            parts.push(format!("value: {v}"));
        }
        if let Some(ok) = &ok_name {
            parts.push(format!("ok: {ok}"));
        }
        let pattern = format!("{{ {} }}", parts.join(", "));

        if tok == AssignOp::Define {
            self.w.write_literally("const ");
            self.w.write_literally(&pattern);
            self.w.write_literally(" = await $.chanRecvWithOk(");
            self.write_value_expr(chan)?;
            self.w.write_literally(")");
        } else {
            self.w.write_literally(";(");
            self.w.write_literally(&pattern);
            self.w.write_literally(" = await $.chanRecvWithOk(");
            self.write_value_expr(chan)?;
            self.w.write_literally("))");
        }
        Ok(())
    }

    /// `v, ok := x.(T)` through the checked assertion helper.
    fn write_type_assert_with_ok(
        &mut self,
        lhs: &[Expr],
        tok: AssignOp,
        assert: &ast::TypeAssertExpr,
    ) -> Result<()> {
        let value_name = binding_name(self, &lhs[0])?;
        let ok_name = binding_name(self, &lhs[1])?;

        if value_name.is_none() && ok_name.is_none() {
            self.write_assert_call(assert)?;
            return Ok(());
        }

        let mut parts = Vec::new();
        if let Some(v) = &value_name {
            parts.push(format!("value: {v}"));
        }
        if let Some(ok) = &ok_name {
            parts.push(format!("ok: {ok}"));
        }
        let pattern = format!("{{ {} }}", parts.join(", "));

        if tok == AssignOp::Define {
            self.w.write_literally("let ");
            self.w.write_literally(&pattern);
            self.w.write_literally(" = ");
            self.write_assert_call(assert)?;
        } else {
            self.w.write_literally(";(");
            self.w.write_literally(&pattern);
            self.w.write_literally(" = ");
            self.write_assert_call(assert)?;
            self.w.write_literally(")");
        }
        Ok(())
    }

    fn write_assert_call(&mut self, assert: &ast::TypeAssertExpr) -> Result<()> {
        self.w.write_literally("$.typeAssert<");
        self.write_type_expr(&assert.typ)?;
        self.w.write_literally(">(");
        self.write_value_expr(&assert.x)?;
        self.w.write_literally(", ");
        self.write_type_description(&assert.typ)?;
        self.w.write_literally(")");
        Ok(())
    }

    /// `v, ok := m[k]` destructures the map read helper.
    fn write_map_read_with_ok(
        &mut self,
        lhs: &[Expr],
        tok: AssignOp,
        index: &ast::IndexExpr,
    ) -> Result<()> {
        let value_name = binding_name(self, &lhs[0])?;
        let ok_name = binding_name(self, &lhs[1])?;

        if value_name.is_none() && ok_name.is_none() {
            self.w.write_literally("$.mapGet(");
            self.write_value_expr(&index.x)?;
            self.w.write_literally(", ");
            self.write_value_expr(&index.index)?;
            self.w.write_literally(")");
            return Ok(());
        }

        let mut parts = Vec::new();
        if let Some(v) = &value_name {
            parts.push(format!("value: {v}"));
        }
        if let Some(ok) = &ok_name {
            parts.push(format!("ok: {ok}"));
        }
        let pattern = format!("{{ {} }}", parts.join(", "));

        if tok == AssignOp::Define {
            self.w.write_literally("const ");
        } else {
            self.w.write_literally(";(");
        }
        self.w.write_literally(&pattern);
        self.w.write_literally(" = $.mapGet(");
        self.write_value_expr(&index.x)?;
        self.w.write_literally(", ");
        self.write_value_expr(&index.index)?;
        self.w.write_literally(")");
        if tok != AssignOp::Define {
            self.w.write_literally(")");
        }
        Ok(())
    }
}

fn binding_name(emitter: &TsEmitter<'_>, expr: &Expr) -> Result<Option<String>> {
    match expr.unparen() {
        Expr::Ident(ident) if ident.is_blank() => Ok(None),
        Expr::Ident(ident) => Ok(Some(emitter.sanitize(&ident.name))),
        other => Err(emitter.err(
            "assignment",
            format!("destructuring target is not an identifier: {other:?}"),
        )),
    }
}

fn compound_binary_op(tok: AssignOp) -> Option<&'static str> {
    match tok {
        AssignOp::Add => Some("+"),
        AssignOp::Sub => Some("-"),
        AssignOp::Mul => Some("*"),
        AssignOp::Quo => Some("/"),
        AssignOp::Rem => Some("%"),
        AssignOp::And => Some("&"),
        AssignOp::Or => Some("|"),
        AssignOp::Xor => Some("^"),
        AssignOp::Shl => Some("<<"),
        AssignOp::Shr => Some(">>"),
        _ => None,
    }
}
