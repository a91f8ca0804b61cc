//! Statement emission.

use crate::codegen::TsEmitter;
use crate::error::Result;
use crate::source::{ast, AssignOp, BranchTok, Expr, Stmt, UnaryOp};
use crate::types::Type;
use crate::util::deterministic_id;

impl TsEmitter<'_> {
    /// Central statement dispatcher.
    pub(crate) fn write_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Block(s) => self.write_stmt_block(s, false),
            Stmt::Assign(s) => {
                // An assignment whose target starts with a parenthesis
                // needs a leading `;`, otherwise the target language
                // parses it as a call of the previous line.
                if s.lhs.len() == 1 {
                    if let Expr::Selector(sel) = &s.lhs[0] {
                        if matches!(sel.x.as_ref(), Expr::Paren(_)) {
                            self.w.write_literally(";");
                        }
                    }
                }
                self.write_stmt_assign(s)
            }
            Stmt::Return(s) => self.write_stmt_return(s),
            Stmt::Defer(s) => self.write_stmt_defer(s),
            Stmt::If(s) => self.write_stmt_if(s),
            Stmt::Expr(s) => self.write_stmt_expr(s),
            Stmt::Decl(s) => self.write_stmt_decl(s),
            Stmt::For(s) => self.write_stmt_for(s),
            Stmt::Range(s) => self.write_stmt_range(s),
            Stmt::Switch(s) => self.write_stmt_switch(s),
            Stmt::TypeSwitch(s) => self.write_stmt_type_switch(s),
            Stmt::IncDec(s) => self.write_stmt_inc_dec(s),
            Stmt::Send(s) => self.write_stmt_send(s),
            Stmt::Go(s) => self.write_stmt_go(s),
            Stmt::Select(s) => self.write_stmt_select(s),
            Stmt::Branch(s) => self.write_stmt_branch(s),
            Stmt::Labeled(s) => self.write_stmt_labeled(s),
            Stmt::Empty(_) => Ok(()),
        }
    }

    /// Block emission preserves the source's blank-line structure and
    /// floating comments, and opens the defer stack when the analysis says
    /// the block needs one.
    pub(crate) fn write_stmt_block(&mut self, block: &ast::BlockStmt, suppress_newline: bool) -> Result<()> {
        // Rebind renames registered by short declarations end with their
        // block.
        let subst_base = self.subst_depth();
        self.w.write_line("{");
        self.w.indent(1);

        if self.analysis.needs_defer_stack(block.id) {
            if self.analysis.in_async_context(block.id) || self.block_has_async_defer(block) {
                self.w
                    .write_line("await using __defer = new $.AsyncDisposableStack();");
            } else {
                self.w.write_line("using __defer = new $.DisposableStack();");
            }
        }

        let mut last_line = self.program.fset.line(block.pos).unwrap_or(0);
        for stmt in &block.stmts {
            last_line = self.flush_comments_before(stmt.pos(), last_line);
            let stmt_line = self.program.fset.line(stmt.pos()).unwrap_or(0);
            if last_line > 0 && stmt_line > last_line + 1 {
                self.w.write_line("");
            }
            self.write_stmt(stmt)?;
            last_line = self.approx_end_line(stmt).max(stmt_line);
        }
        if block.end_pos != 0 {
            self.flush_comments_before(block.end_pos, last_line);
        }

        self.w.indent(-1);
        if suppress_newline {
            self.w.write_literally("}");
        } else {
            self.w.write_line("}");
        }
        self.truncate_subst(subst_base);
        Ok(())
    }

    fn approx_end_line(&self, stmt: &Stmt) -> u32 {
        let pos = match stmt {
            Stmt::Block(b) => b.end_pos,
            Stmt::If(s) => {
                return s
                    .els
                    .as_deref()
                    .map(|e| self.approx_end_line(e))
                    .unwrap_or_else(|| {
                        self.program.fset.line(s.body.end_pos).unwrap_or(0)
                    });
            }
            Stmt::For(s) => s.body.end_pos,
            Stmt::Range(s) => s.body.end_pos,
            Stmt::Switch(s) => s.end_pos,
            Stmt::TypeSwitch(s) => s.end_pos,
            Stmt::Labeled(s) => return self.approx_end_line(&s.stmt),
            other => other.pos(),
        };
        self.program.fset.line(pos).unwrap_or(0)
    }

    /// True when any defer registered on this block's stack targets an
    /// async callee, forcing the asynchronous stack variant.
    pub(crate) fn block_has_async_defer(&self, block: &ast::BlockStmt) -> bool {
        block.stmts.iter().any(|s| self.stmt_has_async_defer(s))
    }

    fn stmt_has_async_defer(&self, stmt: &Stmt) -> bool {
        match stmt {
            Stmt::Defer(d) => self.deferred_call_is_async(&d.call),
            Stmt::Block(b) => self.block_has_async_defer(b),
            Stmt::If(s) => {
                self.block_has_async_defer(&s.body)
                    || s.els.as_deref().is_some_and(|e| self.stmt_has_async_defer(e))
            }
            Stmt::For(s) => self.block_has_async_defer(&s.body),
            Stmt::Range(s) => self.block_has_async_defer(&s.body),
            Stmt::Switch(s) => s
                .cases
                .iter()
                .any(|c| c.body.iter().any(|st| self.stmt_has_async_defer(st))),
            Stmt::TypeSwitch(s) => s
                .cases
                .iter()
                .any(|c| c.body.iter().any(|st| self.stmt_has_async_defer(st))),
            Stmt::Select(s) => s
                .cases
                .iter()
                .any(|c| c.body.iter().any(|st| self.stmt_has_async_defer(st))),
            Stmt::Labeled(s) => self.stmt_has_async_defer(&s.stmt),
            _ => false,
        }
    }

    pub(crate) fn deferred_call_is_async(&self, call: &Expr) -> bool {
        let Expr::Call(call) = call.unparen() else {
            return false;
        };
        match call.fun.unparen() {
            Expr::FuncLit(lit) => self.async_info.is_func_lit_async(lit.id),
            _ => self.is_call_async(call),
        }
    }

    fn write_stmt_return(&mut self, s: &ast::ReturnStmt) -> Result<()> {
        self.w.write_literally("return ");

        if let Some(names) = self.analysis.bare_return_names(s.id).map(|n| n.to_vec()) {
            if names.len() == 1 {
                let name = self.sanitize(&names[0]);
                self.w.write_literally(&name);
            } else {
                self.w.write_literally("[");
                for (i, name) in names.iter().enumerate() {
                    if i != 0 {
                        self.w.write_literally(", ");
                    }
                    let name = self.sanitize(name);
                    self.w.write_literally(&name);
                }
                self.w.write_literally("]");
            }
            self.w.write_line("");
            return Ok(());
        }

        if s.results.len() > 1 {
            self.w.write_literally("[");
        }
        for (i, res) in s.results.iter().enumerate() {
            if i != 0 {
                self.w.write_literally(", ");
            }
            // `nil` for a generic result needs an explicit widening.
            if res.as_ident().is_some_and(|id| id.name == "nil") {
                let generic = self
                    .result_types
                    .last()
                    .and_then(|r| r.get(i).copied().flatten())
                    .filter(|t| matches!(self.program.typ(*t), Type::TypeParam { .. }));
                if let Some(t) = generic {
                    let name = self.ts_type_name(t);
                    self.w
                        .write_literally(&format!("null as unknown as {name}"));
                    continue;
                }
            }
            self.write_single_rhs(res)?;
        }
        if s.results.len() > 1 {
            self.w.write_literally("]");
        }
        self.w.write_line("");
        Ok(())
    }

    fn write_stmt_expr(&mut self, s: &ast::ExprStmt) -> Result<()> {
        // A bare channel receive suspends and discards the value.
        if let Expr::Unary(unary) = s.x.unparen() {
            if unary.op == UnaryOp::Recv {
                self.w.write_literally("await $.chanRecv(");
                self.write_value_expr(&unary.x)?;
                self.w.write_literally(")");
                self.w.write_line("");
                return Ok(());
            }
        }
        self.write_value_expr(&s.x)?;
        self.write_trailing_comment(s.pos);
        self.w.write_line("");
        Ok(())
    }

    /// Appends a same-line trailing comment, if the source had one.
    fn write_trailing_comment(&mut self, pos: crate::source::Pos) {
        let Some(stmt_line) = self.program.fset.line(pos) else {
            return;
        };
        let found = self
            .file
            .comments
            .iter()
            .enumerate()
            .find(|(i, g)| {
                !self.consumed_comments[*i]
                    && g.pos > pos
                    && self.program.fset.line(g.pos) == Some(stmt_line)
            })
            .map(|(i, g)| (i, g.comments.clone()));
        if let Some((i, comments)) = found {
            self.consumed_comments[i] = true;
            if let Some(first) = comments.first() {
                let text = first.trim_start_matches("//").trim();
                self.w.write_literally(&format!(" // {text}"));
            }
        }
    }

    fn write_stmt_decl(&mut self, s: &ast::DeclStmt) -> Result<()> {
        for spec in &s.decl.specs {
            match spec {
                ast::Spec::Value(v) => self.write_value_spec(v, false)?,
                ast::Spec::Type(t) => self.write_type_spec(t)?,
                ast::Spec::Import(_) => {
                    return Err(self.err("declaration statement", "import inside a block"))
                }
            }
        }
        Ok(())
    }

    fn write_stmt_send(&mut self, s: &ast::SendStmt) -> Result<()> {
        self.w.write_literally("await $.chanSend(");
        self.write_value_expr(&s.chan)?;
        self.w.write_literally(", ");
        self.write_value_expr(&s.value)?;
        self.w.write_literally(")");
        self.w.write_line("");
        Ok(())
    }

    fn write_stmt_inc_dec(&mut self, s: &ast::IncDecStmt) -> Result<()> {
        // Increments of map entries go through the map helpers.
        if let Expr::Index(index) = s.x.unparen() {
            if self.is_map(&index.x) {
                let index = index.clone();
                self.w.write_literally("$.mapSet(");
                self.write_value_expr(&index.x)?;
                self.w.write_literally(", ");
                self.write_value_expr(&index.index)?;
                self.w.write_literally(", $.mapGet(");
                self.write_value_expr(&index.x)?;
                self.w.write_literally(", ");
                self.write_value_expr(&index.index)?;
                self.w
                    .write_literally(if s.inc { ").value + 1)" } else { ").value - 1)" });
                self.w.write_line("");
                return Ok(());
            }
        }
        self.write_value_expr(&s.x)?;
        self.w.write_literally(if s.inc { "++" } else { "--" });
        self.w.write_line("");
        Ok(())
    }

    fn write_stmt_branch(&mut self, s: &ast::BranchStmt) -> Result<()> {
        match s.tok {
            BranchTok::Break => match &s.label {
                Some(label) => self.w.write_line(&format!("break {}", label.name)),
                None => self.w.write_line("break"),
            },
            BranchTok::Continue => match &s.label {
                Some(label) => self.w.write_line(&format!("continue {}", label.name)),
                None => self.w.write_line("continue"),
            },
            BranchTok::Goto => {
                // Labeled-statement restructuring happens upstream; a
                // surviving goto cannot be represented.
                let label = s.label.as_ref().map(|l| l.name.as_str()).unwrap_or("?");
                self.w
                    .write_comment_line(&format!("goto {label} // goto statement skipped"));
            }
            BranchTok::Fallthrough => {
                // Consumed by the switch emitter; anywhere else it is a
                // no-op marker.
                self.w
                    .write_comment_line("fallthrough // fallthrough statement skipped");
            }
        }
        Ok(())
    }

    fn write_stmt_labeled(&mut self, s: &ast::LabeledStmt) -> Result<()> {
        // Labels cannot prefix declarations in the target language; wrap
        // the declaration in a labeled block instead.
        let needs_block = matches!(
            s.stmt.as_ref(),
            Stmt::Decl(_) | Stmt::Assign(ast::AssignStmt { tok: AssignOp::Define, .. })
        );
        if needs_block {
            self.w.write_literally(&s.label.name);
            self.w.write_line(": {");
            self.w.indent(1);
            self.write_stmt(&s.stmt)?;
            self.w.indent(-1);
            self.w.write_line("}");
        } else {
            self.w.write_literally(&s.label.name);
            self.w.write_literally(": ");
            self.write_stmt(&s.stmt)?;
        }
        Ok(())
    }

    /// Lifts the outer bindings a short-scope initializer shadows into
    /// temporaries, emitted before the scope opens. Returns how many
    /// substitutions were pushed.
    fn write_shadow_temps(&mut self, node: crate::source::NodeId) -> usize {
        let Some(info) = self.analysis.shadowing(node).cloned() else {
            return 0;
        };
        let mut pushed = 0;
        for (_n, var) in &info.entries {
            self.w.write_literally("const ");
            self.w.write_literally(&var.temp);
            self.w.write_literally(" = ");
            let outer = self.program.obj(var.outer);
            let is_builtin =
                outer.is_some_and(|o| matches!(o.kind, crate::types::ObjectKind::Builtin));
            let name = outer.map(|o| self.sanitize(&o.name)).unwrap_or_default();
            if is_builtin {
                self.w.write_literally("$.");
            }
            self.w.write_literally(&name);
            if self.analysis.needs_var_ref(var.outer) {
                self.w.write_literally("!.value");
            }
            self.w.write_line("");
            self.push_subst(var.outer, var.temp.clone());
            pushed += 1;
        }
        pushed
    }

    fn write_stmt_if(&mut self, s: &ast::IfStmt) -> Result<()> {
        if let Some(init) = &s.init {
            // Shadowed names in the initializer read through temporaries.
            let pushed = self.write_shadow_temps(s.id);

            self.w.write_line("{");
            self.w.indent(1);
            self.write_stmt(init)?;
            self.pop_subst(pushed);

            self.write_if_chain(s)?;
            self.w.write_line("");

            self.w.indent(-1);
            self.w.write_line("}");
            return Ok(());
        }

        self.write_if_chain(s)?;
        self.w.write_line("");
        Ok(())
    }

    /// `if (cond) { … } else …` without the init wrapper.
    fn write_if_chain(&mut self, s: &ast::IfStmt) -> Result<()> {
        self.w.write_literally("if (");
        self.write_value_expr(&s.cond)?;
        self.w.write_literally(") ");
        self.write_stmt_block(&s.body, true)?;
        if let Some(els) = &s.els {
            self.w.write_literally(" else ");
            match els.as_ref() {
                Stmt::If(elif) if elif.init.is_none() => {
                    self.write_if_chain(elif)?;
                }
                Stmt::Block(b) => {
                    self.write_stmt_block(b, true)?;
                }
                other => self.write_stmt(other)?,
            }
        }
        Ok(())
    }

    fn write_stmt_for(&mut self, s: &ast::ForStmt) -> Result<()> {
        match (&s.init, &s.cond, &s.post) {
            (None, Some(cond), None) => {
                self.w.write_literally("while (");
                self.write_value_expr(cond)?;
                self.w.write_literally(") ");
            }
            (None, None, None) => {
                self.w.write_literally("for (;;) ");
            }
            _ => {
                self.w.write_literally("for (");
                if let Some(init) = &s.init {
                    self.write_simple_stmt_inline(init)?;
                }
                self.w.write_literally("; ");
                if let Some(cond) = &s.cond {
                    self.write_value_expr(cond)?;
                }
                self.w.write_literally("; ");
                if let Some(post) = &s.post {
                    self.write_simple_stmt_inline(post)?;
                }
                self.w.write_literally(") ");
            }
        }
        self.write_stmt_block(&s.body, false)
    }

    /// Simple statement in a `for` header: no trailing newline.
    fn write_simple_stmt_inline(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Assign(a) => self.write_assignment_core(&a.lhs, a.tok, &a.rhs),
            Stmt::IncDec(s) => {
                self.write_value_expr(&s.x)?;
                self.w.write_literally(if s.inc { "++" } else { "--" });
                Ok(())
            }
            Stmt::Expr(e) => self.write_value_expr(&e.x),
            other => Err(self.err(
                "for header",
                format!("unhandled simple statement: {other:?}"),
            )),
        }
    }

    fn write_stmt_range(&mut self, s: &ast::RangeStmt) -> Result<()> {
        let key = s.key.as_ref().filter(|k| !k.is_blank());
        let value = s.value.as_ref().filter(|v| !v.is_blank());
        let key_name = match key.map(|k| k.unparen()) {
            Some(Expr::Ident(i)) => self.sanitize(&i.name),
            Some(other) => {
                return Err(self.err("range", format!("key target is not an identifier: {other:?}")))
            }
            None => format!("_i_{}", deterministic_id(&self.program.fset, &self.pkg.path, s.pos)),
        };
        let value_name = match value.map(|v| v.unparen()) {
            Some(Expr::Ident(i)) => Some(self.sanitize(&i.name)),
            Some(other) => {
                return Err(
                    self.err("range", format!("value target is not an identifier: {other:?}"))
                )
            }
            None => None,
        };

        match self.underlying_of(&s.x).cloned() {
            Some(Type::Chan { .. }) => {
                // Range over a channel binds the element in key position.
                let binding = if key.is_some() {
                    key_name.clone()
                } else {
                    value_name.clone().unwrap_or_else(|| "_".to_string())
                };
                self.w
                    .write_literally(&format!("for await (const {binding} of $.chanIter("));
                self.write_value_expr(&s.x)?;
                self.w.write_literally(")) ");
                self.write_stmt_block(&s.body, false)
            }
            Some(Type::Map { .. }) => {
                let v = value_name.unwrap_or_else(|| "_".to_string());
                if value.is_some() {
                    self.w
                        .write_literally(&format!("for (const [{key_name}, {v}] of $.mapEntries("));
                } else {
                    self.w
                        .write_literally(&format!("for (const [{key_name}] of $.mapEntries("));
                }
                self.write_value_expr(&s.x)?;
                self.w.write_literally(")) ");
                self.write_stmt_block(&s.body, false)
            }
            Some(Type::Basic { basic }) if basic.is_string() => {
                // Decoded code points with the byte index of each start.
                let v = value_name.unwrap_or_else(|| "_".to_string());
                self.w
                    .write_literally(&format!("for (const [{key_name}, {v}] of $.stringRunes("));
                self.write_value_expr(&s.x)?;
                self.w.write_literally(")) ");
                self.write_stmt_block(&s.body, false)
            }
            Some(Type::Basic { basic }) if basic.is_numeric() => {
                self.w
                    .write_literally(&format!("for (let {key_name} = 0; {key_name} < "));
                self.write_value_expr(&s.x)?;
                self.w.write_literally(&format!("; {key_name}++) "));
                self.write_stmt_block(&s.body, false)
            }
            Some(Type::Slice { .. }) | Some(Type::Array { .. }) => {
                self.w
                    .write_literally(&format!("for (let {key_name} = 0; {key_name} < $.len("));
                self.write_value_expr(&s.x)?;
                self.w.write_literally(&format!("); {key_name}++) "));
                // The element binding goes at the top of the body.
                self.w.write_line("{");
                self.w.indent(1);
                if let Some(v) = &value_name {
                    self.w.write_literally(&format!("const {v} = "));
                    self.write_value_expr(&s.x)?;
                    self.w.write_literally(&format!("![{key_name}]"));
                    self.w.write_line("");
                }
                for stmt in &s.body.stmts {
                    self.write_stmt(stmt)?;
                }
                self.w.indent(-1);
                self.w.write_line("}");
                Ok(())
            }
            other => Err(self.err("range", format!("cannot range over {other:?}"))),
        }
    }

    fn write_stmt_switch(&mut self, s: &ast::SwitchStmt) -> Result<()> {
        let has_init = s.init.is_some();
        if let Some(init) = &s.init {
            let pushed = self.write_shadow_temps(s.id);
            self.w.write_line("{");
            self.w.indent(1);
            self.write_stmt(init)?;
            self.pop_subst(pushed);
        }

        self.w.write_literally("switch (");
        match &s.tag {
            Some(tag) => self.write_value_expr(tag)?,
            None => self.w.write_literally("true"),
        }
        self.w.write_line(") {");
        self.w.indent(1);

        for case in &s.cases {
            self.write_case_clause(case)?;
        }

        self.w.indent(-1);
        self.w.write_line("}");

        if has_init {
            self.w.indent(-1);
            self.w.write_line("}");
        }
        Ok(())
    }

    /// One case clause: multiple match expressions become stacked case
    /// labels over a single body, closed by an explicit `break` unless the
    /// source falls through.
    fn write_case_clause(&mut self, case: &ast::CaseClause) -> Result<()> {
        if case.list.is_empty() {
            self.w.write_line("default:");
        } else {
            for expr in &case.list {
                self.w.write_literally("case ");
                self.write_value_expr(expr)?;
                self.w.write_line(":");
            }
        }

        self.w.indent(1);
        let mut falls_through = false;
        for (i, stmt) in case.body.iter().enumerate() {
            if i == case.body.len() - 1 {
                if let Stmt::Branch(b) = stmt {
                    if b.tok == BranchTok::Fallthrough {
                        falls_through = true;
                        continue;
                    }
                }
            }
            self.write_stmt(stmt)?;
        }
        if !falls_through {
            self.w.write_line("break");
        }
        self.w.indent(-1);
        Ok(())
    }

    /// Type switches lower to a chain of runtime descriptor checks, each
    /// arm opening a scope with the asserted binding.
    fn write_stmt_type_switch(&mut self, s: &ast::TypeSwitchStmt) -> Result<()> {
        let has_init = s.init.is_some();
        if let Some(init) = &s.init {
            let pushed = self.write_shadow_temps(s.id);
            self.w.write_line("{");
            self.w.indent(1);
            self.write_stmt(init)?;
            self.pop_subst(pushed);
        }

        let subject = format!(
            "_ts_{}",
            deterministic_id(&self.program.fset, &self.pkg.path, s.pos)
        );
        self.w.write_literally(&format!("const {subject} = "));
        self.write_value_expr(&s.subject)?;
        self.w.write_line("");

        let mut default_case: Option<&ast::CaseClause> = None;
        let mut first = true;
        for case in &s.cases {
            if case.list.is_empty() {
                default_case = Some(case);
                continue;
            }
            if !first {
                self.w.write_literally(" else ");
            }
            first = false;
            self.w.write_literally("if (");
            for (i, typ) in case.list.iter().enumerate() {
                if i != 0 {
                    self.w.write_literally(" || ");
                }
                if typ.as_ident().is_some_and(|id| id.name == "nil") {
                    self.w.write_literally(&format!("{subject} === null"));
                } else {
                    self.w.write_literally("$.typeAssert<");
                    self.write_type_expr(typ)?;
                    self.w.write_literally(&format!(">({subject}, "));
                    self.write_type_description(typ)?;
                    self.w.write_literally(").ok");
                }
            }
            self.w.write_line(") {");
            self.w.indent(1);
            // A single-type arm narrows the binding to that type.
            if let Some(bind) = &s.bind {
                if !bind.is_blank() {
                    let bind_name = self.sanitize(&bind.name);
                    self.w
                        .write_literally(&format!("const {bind_name} = {subject} as unknown as "));
                    if case.list.len() == 1
                        && !case.list[0]
                            .as_ident()
                            .is_some_and(|id| id.name == "nil")
                    {
                        self.write_type_expr(&case.list[0])?;
                    } else {
                        self.w.write_literally("any");
                    }
                    self.w.write_line("");
                }
            }
            for stmt in &case.body {
                self.write_stmt(stmt)?;
            }
            self.w.indent(-1);
            self.w.write_literally("}");
        }

        if let Some(case) = default_case {
            if !first {
                self.w.write_literally(" else ");
            }
            self.w.write_line("{");
            self.w.indent(1);
            if let Some(bind) = &s.bind {
                if !bind.is_blank() {
                    let bind_name = self.sanitize(&bind.name);
                    self.w.write_line(&format!("const {bind_name} = {subject}"));
                }
            }
            for stmt in &case.body {
                self.write_stmt(stmt)?;
            }
            self.w.indent(-1);
            self.w.write_literally("}");
        }
        self.w.write_line("");

        if has_init {
            self.w.indent(-1);
            self.w.write_line("}");
        }
        Ok(())
    }

    /// Defers register a callback on the block's disposable stack; an
    /// immediately-invoked function literal is inlined to avoid a nested
    /// arrow.
    fn write_stmt_defer(&mut self, s: &ast::DeferStmt) -> Result<()> {
        let Expr::Call(call) = s.call.unparen() else {
            return Err(self.err("defer", "deferred expression is not a call"));
        };
        let is_async = self.deferred_call_is_async(&s.call);
        let prefix = if is_async { "async " } else { "" };
        self.w.write_literally(&format!("__defer.defer({prefix}() => {{"));
        self.w.indent(1);
        self.w.write_line("");

        if let (Expr::FuncLit(lit), true) = (call.fun.unparen(), call.args.is_empty()) {
            let lit = lit.clone();
            for stmt in &lit.body.stmts {
                self.write_stmt(stmt)?;
            }
        } else {
            let call = call.clone();
            self.write_call_expr(&call)?;
            self.w.write_line("");
        }

        self.w.indent(-1);
        self.w.write_line("});");
        Ok(())
    }

    /// Goroutines become scheduled microtasks.
    fn write_stmt_go(&mut self, s: &ast::GoStmt) -> Result<()> {
        let Expr::Call(call) = s.call.unparen() else {
            return Err(self.err("go", "go target is not a call"));
        };
        let call = call.clone();

        match call.fun.unparen() {
            Expr::FuncLit(lit) => {
                let lit = lit.clone();
                if self.async_info.is_func_lit_async(lit.id) {
                    self.w.write_literally("queueMicrotask(async () => ");
                } else {
                    self.w.write_literally("queueMicrotask(() => ");
                }
                self.write_stmt_block(&lit.body, true)?;
                self.w.write_line(")");
                Ok(())
            }
            Expr::Ident(ident) => {
                let ident = ident.clone();
                let is_async = self
                    .obj_of(&ident)
                    .is_some_and(|o| self.async_info.is_async_func(self.program, o));
                self.write_microtask_header(is_async);
                if is_async {
                    self.w.write_literally("await ");
                }
                self.write_ident(&ident, true);
                self.write_call_args(&call)?;
                self.w.write_line("");
                self.write_microtask_footer();
                Ok(())
            }
            Expr::Selector(sel) => {
                let sel = sel.clone();
                let is_async = self.selector_is_async(&sel);
                self.write_microtask_header(is_async);
                if is_async {
                    self.w.write_literally("await ");
                }
                // A nil receiver panics at spawn time, matching in-line
                // method calls.
                self.write_value_expr(&sel.x)?;
                self.w.write_literally("!.");
                self.write_ident(&sel.sel, true);
                self.write_call_args(&call)?;
                self.w.write_line("");
                self.write_microtask_footer();
                Ok(())
            }
            Expr::TypeAssert(assert) => {
                let assert = assert.clone();
                self.write_microtask_header(false);
                self.write_type_assert_expr(&assert)?;
                self.w.write_literally("!");
                self.write_call_args(&call)?;
                self.w.write_line("");
                self.write_microtask_footer();
                Ok(())
            }
            other => Err(self.err("go", format!("unhandled goroutine target: {other:?}"))),
        }
    }

    fn write_microtask_header(&mut self, is_async: bool) {
        if is_async {
            self.w.write_literally("queueMicrotask(async () => {");
        } else {
            self.w.write_literally("queueMicrotask(() => {");
        }
        self.w.indent(1);
        self.w.write_line("");
    }

    fn write_microtask_footer(&mut self) {
        self.w.indent(-1);
        self.w.write_line("})");
    }

    /// Select lowers to the runtime's case-descriptor helper; each case
    /// carries its channel, the value for sends, and a continuation body.
    fn write_stmt_select(&mut self, s: &ast::SelectStmt) -> Result<()> {
        self.w.write_line("await $.chanSelect([");
        self.w.indent(1);

        for case in &s.cases {
            self.w.write_line("{");
            self.w.indent(1);
            match case.comm.as_deref() {
                None => {
                    self.w.write_line("isDefault: true,");
                    self.w.write_literally("onSelected: async () => {");
                    self.w.indent(1);
                    self.w.write_line("");
                    for stmt in &case.body {
                        self.write_stmt(stmt)?;
                    }
                    self.w.indent(-1);
                    self.w.write_line("},");
                }
                Some(Stmt::Send(send)) => {
                    let send = send.clone();
                    self.w.write_line("isSend: true,");
                    self.w.write_literally("channel: ");
                    self.write_value_expr(&send.chan)?;
                    self.w.write_line(",");
                    self.w.write_literally("value: ");
                    self.write_value_expr(&send.value)?;
                    self.w.write_line(",");
                    self.w.write_literally("onSelected: async () => {");
                    self.w.indent(1);
                    self.w.write_line("");
                    for stmt in &case.body {
                        self.write_stmt(stmt)?;
                    }
                    self.w.indent(-1);
                    self.w.write_line("},");
                }
                Some(comm) => {
                    let (chan, value_name, ok_name) = self.select_recv_parts(comm)?;
                    self.w.write_line("isSend: false,");
                    self.w.write_literally("channel: ");
                    self.write_value_expr(&chan)?;
                    self.w.write_line(",");
                    self.w.write_literally("onSelected: async (result) => {");
                    self.w.indent(1);
                    self.w.write_line("");
                    if let Some(v) = value_name {
                        self.w.write_line(&format!("const {v} = result.value"));
                    }
                    if let Some(ok) = ok_name {
                        self.w.write_line(&format!("const {ok} = result.ok"));
                    }
                    for stmt in &case.body {
                        self.write_stmt(stmt)?;
                    }
                    self.w.indent(-1);
                    self.w.write_line("},");
                }
            }
            self.w.indent(-1);
            self.w.write_line("},");
        }

        self.w.indent(-1);
        self.w.write_line("])");
        Ok(())
    }

    /// Decomposes a select receive clause: `<-c`, `v := <-c` or
    /// `v, ok := <-c`.
    fn select_recv_parts(&mut self, comm: &Stmt) -> Result<(Expr, Option<String>, Option<String>)> {
        match comm {
            Stmt::Expr(e) => {
                if let Expr::Unary(unary) = e.x.unparen() {
                    if unary.op == UnaryOp::Recv {
                        return Ok(((*unary.x).clone(), None, None));
                    }
                }
                Err(self.err("select", "receive clause is not a channel operation"))
            }
            Stmt::Assign(a) => {
                let Some(Expr::Unary(unary)) = a.rhs.first().map(|r| r.unparen()) else {
                    return Err(self.err("select", "assignment clause without receive"));
                };
                if unary.op != UnaryOp::Recv {
                    return Err(self.err("select", "assignment clause without receive"));
                }
                let chan = (*unary.x).clone();
                let name_of = |e: &Expr| -> Option<String> {
                    e.as_ident()
                        .filter(|i| !i.is_blank())
                        .map(|i| crate::util::sanitize_identifier(&i.name))
                };
                let value_name = a.lhs.first().and_then(&name_of);
                let ok_name = a.lhs.get(1).and_then(&name_of);
                Ok((chan, value_name, ok_name))
            }
            other => Err(self.err("select", format!("unhandled clause: {other:?}"))),
        }
    }
}
