//! Declaration emission: functions, methods, type specs, consts and vars.

use crate::codegen::TsEmitter;
use crate::error::Result;
use crate::source::{ast, Expr};
use crate::types::{Type, TypeId};

impl TsEmitter<'_> {
    /// Emits all top-level declarations of the file. Methods are emitted
    /// inside the class of their receiver type, so bare method decls are
    /// skipped here.
    pub(crate) fn write_decls(&mut self, decls: &[ast::Decl]) -> Result<()> {
        for decl in decls {
            match decl {
                ast::Decl::Func(f) => {
                    if f.recv.is_none() {
                        self.write_func_decl(f)?;
                        self.w.write_line("");
                    }
                }
                ast::Decl::Gen(g) => {
                    if let Some(doc) = &g.doc {
                        self.write_doc(&doc.clone());
                    }
                    for spec in &g.specs {
                        match spec {
                            ast::Spec::Import(_) => {}
                            ast::Spec::Value(v) => {
                                self.write_value_spec(v, true)?;
                                self.w.write_line("");
                            }
                            ast::Spec::Type(t) => {
                                self.write_type_spec(t)?;
                                self.w.write_line("");
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Top-level function. Everything is exported for cross-file
    /// visibility within the package; `main` is always async.
    pub(crate) fn write_func_decl(&mut self, decl: &ast::FuncDecl) -> Result<()> {
        if let Some(doc) = &decl.doc {
            self.write_doc(&doc.clone());
        }

        let is_main = decl.name.name == "main" && self.pkg.name == "main";
        let is_async = is_main
            || self
                .pkg
                .info
                .defs
                .get(&decl.name.id)
                .is_some_and(|o| self.async_info.is_async_func(self.program, *o));

        self.w.write_literally("export ");
        if is_async {
            self.w.write_literally("async ");
        }
        self.w.write_literally("function ");
        let name = self.sanitize(&decl.name.name);
        self.w.write_literally(&name);

        let prologue = self.write_signature(&decl.typ, is_async)?;
        self.w.write_literally(" ");

        let Some(body) = &decl.body else {
            self.w.write_line("{}");
            return Ok(());
        };

        let named = self.named_return_fields(&decl.typ);
        self.push_results(&decl.typ);
        if prologue.is_empty() && named.is_empty() {
            self.write_stmt_block(body, false)?;
        } else {
            self.w.write_line("{");
            self.w.indent(1);
            for line in &prologue {
                self.w.write_line(line);
            }
            self.write_named_return_declarations(&decl.typ)?;
            self.write_stmt_block(body, false)?;
            self.w.indent(-1);
            self.w.write_line("}");
        }
        self.pop_results();
        Ok(())
    }

    /// Signature `(params): R` with `Promise<…>` for async. Returns the
    /// prologue lines that rebind reified parameters into cells.
    fn write_signature(&mut self, typ: &ast::FuncTypeExpr, is_async: bool) -> Result<Vec<String>> {
        let mut prologue = Vec::new();
        self.w.write_literally("(");
        let mut wrote = false;
        for field in typ.params.list.clone() {
            for name in &field.names {
                if wrote {
                    self.w.write_literally(", ");
                }
                wrote = true;
                let reified = self
                    .pkg
                    .info
                    .defs
                    .get(&name.id)
                    .is_some_and(|o| self.analysis.needs_var_ref(*o));
                let clean = self.sanitize(&name.name);
                if reified {
                    // The cell takes the parameter's name; the raw
                    // argument arrives under a prefixed one.
                    self.w.write_literally(&format!("_{clean}"));
                    prologue.push(format!("let {clean} = $.varRef(_{clean})"));
                } else {
                    self.w.write_literally(&clean);
                }
                self.w.write_literally(": ");
                self.write_type_expr(&field.typ)?;
            }
            if field.names.is_empty() {
                if wrote {
                    self.w.write_literally(", ");
                }
                wrote = true;
                self.w.write_literally("_p: ");
                self.write_type_expr(&field.typ)?;
            }
        }
        self.w.write_literally("): ");
        self.write_result_annotation(typ.results.as_ref(), is_async)?;
        Ok(prologue)
    }

    fn named_return_fields(&self, typ: &ast::FuncTypeExpr) -> Vec<String> {
        let mut names = Vec::new();
        if let Some(results) = &typ.results {
            for field in &results.list {
                for name in &field.names {
                    names.push(name.name.clone());
                }
            }
        }
        names
    }

    /// Named results are declared at entry, initialized to zero values.
    fn write_named_return_declarations(&mut self, typ: &ast::FuncTypeExpr) -> Result<()> {
        let Some(results) = &typ.results else {
            return Ok(());
        };
        for field in results.list.clone() {
            for name in &field.names {
                let clean = self.sanitize(&name.name);
                self.w.write_literally(&format!("let {clean}: "));
                self.write_type_expr(&field.typ)?;
                self.w.write_literally(" = ");
                match self.pkg.info.type_of(field.typ.id()) {
                    Some(t) => self.write_zero_value(t)?,
                    None => self.w.write_literally("null"),
                }
                self.w.write_line("");
            }
        }
        Ok(())
    }

    fn push_results(&mut self, typ: &ast::FuncTypeExpr) {
        let mut types = Vec::new();
        if let Some(results) = &typ.results {
            for field in &results.list {
                let t = self.pkg.info.type_of(field.typ.id());
                let n = field.names.len().max(1);
                for _ in 0..n {
                    types.push(t);
                }
            }
        }
        self.result_types.push(types);
    }

    fn pop_results(&mut self) {
        self.result_types.pop();
    }

    /// Function literal as an arrow expression.
    pub(crate) fn write_func_lit(&mut self, lit: &ast::FuncLit) -> Result<()> {
        let is_async = self.async_info.is_func_lit_async(lit.id);
        if is_async {
            self.w.write_literally("async ");
        }
        let prologue = self.write_signature(&lit.typ, is_async)?;
        self.w.write_literally(" => ");

        let named = self.named_return_fields(&lit.typ);
        self.push_results(&lit.typ);
        if prologue.is_empty() && named.is_empty() {
            self.write_stmt_block(&lit.body, true)?;
        } else {
            self.w.write_line("{");
            self.w.indent(1);
            for line in &prologue {
                self.w.write_line(line);
            }
            self.write_named_return_declarations(&lit.typ)?;
            self.write_stmt_block(&lit.body, true)?;
            self.w.write_line("");
            self.w.indent(-1);
            self.w.write_literally("}");
        }
        self.pop_results();
        Ok(())
    }

    /// Const and var specs. Package-level bindings are exported for
    /// cross-file visibility.
    pub(crate) fn write_value_spec(&mut self, spec: &ast::ValueSpec, top_level: bool) -> Result<()> {
        if let Some(doc) = &spec.doc {
            self.write_doc(&doc.clone());
        }
        let export = if top_level { "export " } else { "" };

        // Multi-name, single tuple-returning initializer destructures.
        if spec.names.len() > 1 && spec.values.len() == 1 {
            self.w.write_literally(export);
            self.w.write_literally("let [");
            for (i, name) in spec.names.iter().enumerate() {
                if i != 0 {
                    self.w.write_literally(", ");
                }
                if !name.is_blank() {
                    let clean = self.sanitize(&name.name);
                    self.w.write_literally(&clean);
                }
            }
            self.w.write_literally("] = ");
            self.write_value_expr(&spec.values[0])?;
            self.w.write_line("");
            return Ok(());
        }

        for (i, name) in spec.names.iter().enumerate() {
            let value = spec.values.get(i);
            if name.is_blank() {
                if let Some(value) = value {
                    self.w.write_literally("/* _ = */ ");
                    self.write_value_expr(value)?;
                    self.w.write_line("");
                }
                continue;
            }

            let obj = self.pkg.info.defs.get(&name.id).copied();
            let clean = self.sanitize(&name.name);

            // Constants evaluate to literals.
            if let Some(value) = obj
                .and_then(|o| self.program.obj(o))
                .and_then(|o| o.const_value())
                .cloned()
            {
                self.w.write_literally(export);
                self.w.write_literally(&format!("const {clean} = "));
                self.write_constant_value(&value);
                self.w.write_line("");
                continue;
            }

            let reified = obj.is_some_and(|o| self.analysis.needs_var_ref(o));

            self.w.write_literally(export);
            self.w.write_literally(&format!("let {clean}"));

            if !reified {
                if let Some(typ) = &spec.typ {
                    self.w.write_literally(": ");
                    self.write_type_expr(&typ.clone())?;
                }
            }

            self.w.write_literally(" = ");
            if reified {
                self.w.write_literally("$.varRef(");
            }
            match value {
                Some(value) => self.write_single_rhs(value)?,
                None => {
                    let t = spec
                        .typ
                        .as_ref()
                        .and_then(|t| self.pkg.info.type_of(t.id()))
                        .or_else(|| obj.and_then(|o| self.program.obj(o)).map(|o| o.typ));
                    match t {
                        Some(t) => self.write_zero_value(t)?,
                        None => self.w.write_literally("null"),
                    }
                }
            }
            if reified {
                self.w.write_literally(")");
            }
            self.w.write_line("");
        }
        Ok(())
    }

    /// Type specs: structs become classes, interfaces become type aliases
    /// with a descriptor, named primitives become wrapper classes, aliases
    /// stay aliases.
    pub(crate) fn write_type_spec(&mut self, spec: &ast::TypeSpec) -> Result<()> {
        if let Some(doc) = &spec.doc {
            self.write_doc(&doc.clone());
        }
        let name = self.sanitize(&spec.name.name);

        if spec.alias {
            self.w.write_literally(&format!("export type {name} = "));
            self.write_type_expr(&spec.typ)?;
            self.w.write_line("");
            return Ok(());
        }

        let named_id = self.pkg.info.type_of(spec.name.id);

        match spec.typ.clone() {
            Expr::StructType(st) => self.write_struct_class(&name, &st, named_id),
            Expr::InterfaceType(iface) => {
                self.w.write_literally(&format!("export type {name} = "));
                self.write_type_expr(&Expr::InterfaceType(iface.clone()))?;
                self.w.write_line("");
                let mut methods = Vec::new();
                for field in &iface.methods.list {
                    if let Some(m) = field.names.first() {
                        methods.push(format!("'{}'", m.name));
                    }
                }
                self.w.write_line(&format!(
                    "$.registerInterfaceType('{}.{}', [{}])",
                    self.pkg.path,
                    spec.name.name,
                    methods.join(", ")
                ));
                Ok(())
            }
            other => {
                let is_primitive = self
                    .pkg
                    .info
                    .type_of(other.id())
                    .map(|t| matches!(self.program.underlying(t), Type::Basic { .. }))
                    .unwrap_or(false);
                if is_primitive {
                    self.write_primitive_wrapper(&name, &other, named_id)
                } else {
                    // Named types over slices, maps, funcs and channels
                    // stay type aliases; their methods become standalone
                    // `Type_Method` functions.
                    self.w.write_literally(&format!("export type {name} = "));
                    self.write_type_expr(&other)?;
                    self.w.write_line("");
                    self.write_standalone_methods(&spec.name.name, named_id)
                }
            }
        }
    }

    /// Struct type: a class with one accessor per field (reified fields
    /// ride on reference cells), a constructor over a partial init object,
    /// a `clone`, its methods and a runtime descriptor.
    fn write_struct_class(
        &mut self,
        name: &str,
        st: &ast::StructTypeExpr,
        named_id: Option<TypeId>,
    ) -> Result<()> {
        self.w.write_line(&format!("export class {name} {{"));
        self.w.indent(1);

        struct FieldPlan {
            name: String,
            reified: bool,
            is_struct: bool,
        }
        let mut plans: Vec<FieldPlan> = Vec::new();

        for field in st.fields.list.clone() {
            for fname in &field.names {
                let clean = self.sanitize(&fname.name);
                let reified = self
                    .pkg
                    .info
                    .defs
                    .get(&fname.id)
                    .is_some_and(|o| self.analysis.needs_var_ref(*o));
                let is_struct = self
                    .pkg
                    .info
                    .type_of(field.typ.id())
                    .is_some_and(|t| self.program.underlying(t).is_struct());
                plans.push(FieldPlan {
                    name: clean.clone(),
                    reified,
                    is_struct,
                });

                if reified {
                    // Cell-backed accessor so `&x.F` can hand the cell out.
                    self.w.write_literally(&format!("public _{clean}: $.VarRef<"));
                    self.write_type_expr(&field.typ)?;
                    self.w.write_literally("> = $.varRef(");
                    match self.pkg.info.type_of(field.typ.id()) {
                        Some(t) => self.write_zero_value(t)?,
                        None => self.w.write_literally("null"),
                    }
                    self.w.write_line(")");
                    self.w.write_literally(&format!("public get {clean}(): "));
                    self.write_type_expr(&field.typ)?;
                    self.w
                        .write_line(&format!(" {{ return this._{clean}.value }}"));
                    self.w.write_literally(&format!("public set {clean}(value: "));
                    self.write_type_expr(&field.typ)?;
                    self.w
                        .write_line(&format!(") {{ this._{clean}.value = value }}"));
                } else {
                    self.w.write_literally(&format!("public {clean}: "));
                    self.write_type_expr(&field.typ)?;
                    self.w.write_literally(" = ");
                    match self.pkg.info.type_of(field.typ.id()) {
                        Some(t) => self.write_zero_value(t)?,
                        None => self.w.write_literally("null"),
                    }
                    self.w.write_line("");
                }
            }
        }
        self.w.write_line("");

        // Constructor over a partial init object.
        self.w.write_literally("constructor(init?: Partial<{");
        for (i, plan) in plans.iter().enumerate() {
            if i != 0 {
                self.w.write_literally(", ");
            }
            self.w.write_literally(&format!("{}: unknown", plan.name));
        }
        self.w.write_line("}>) {");
        self.w.indent(1);
        for plan in &plans {
            self.w.write_line(&format!(
                "if (init?.{f} !== undefined) this.{f} = init.{f} as any",
                f = plan.name
            ));
        }
        self.w.indent(-1);
        self.w.write_line("}");
        self.w.write_line("");

        // Value-semantics copy.
        self.w.write_line(&format!("public clone(): {name} {{"));
        self.w.indent(1);
        self.w.write_literally(&format!("return $.markAsStructValue(new {name}({{"));
        for (i, plan) in plans.iter().enumerate() {
            if i != 0 {
                self.w.write_literally(", ");
            }
            if plan.is_struct {
                self.w
                    .write_literally(&format!("{f}: this.{f}.clone()", f = plan.name));
            } else {
                self.w.write_literally(&format!("{f}: this.{f}", f = plan.name));
            }
        }
        self.w.write_line("}))");
        self.w.indent(-1);
        self.w.write_line("}");

        // Methods declared on this type anywhere in the package.
        let methods = self.receiver_methods(named_id);
        let mut method_names = Vec::new();
        for method in &methods {
            self.w.write_line("");
            method_names.push(method.name.name.clone());
            self.write_method(method, "this")?;
        }

        self.w.indent(-1);
        self.w.write_line("}");

        let names = method_names
            .iter()
            .map(|m| format!("'{m}'"))
            .collect::<Vec<_>>()
            .join(", ");
        self.w.write_line(&format!(
            "$.registerStructType('{}.{}', {name}, [{names}])",
            self.pkg.path, name
        ));
        Ok(())
    }

    /// Named type over a primitive: a wrapper class exposing `_value`,
    /// with methods bound against the wrapped value.
    fn write_primitive_wrapper(
        &mut self,
        name: &str,
        underlying: &Expr,
        named_id: Option<TypeId>,
    ) -> Result<()> {
        self.w.write_line(&format!("export class {name} {{"));
        self.w.indent(1);

        self.w.write_literally("constructor(public _value: ");
        self.write_type_expr(underlying)?;
        self.w.write_line(") {}");
        self.w.write_line("");
        self.w.write_literally("valueOf(): ");
        self.write_type_expr(underlying)?;
        self.w.write_line(" { return this._value }");

        for method in self.receiver_methods(named_id) {
            self.w.write_line("");
            self.write_method(&method, "this._value")?;
        }

        self.w.indent(-1);
        self.w.write_line("}");
        Ok(())
    }

    /// Methods on named non-struct, non-primitive types are standalone
    /// functions taking the receiver first.
    fn write_standalone_methods(&mut self, type_name: &str, named_id: Option<TypeId>) -> Result<()> {
        for method in self.receiver_methods(named_id) {
            let Some(recv) = &method.recv else { continue };
            let is_async = self
                .pkg
                .info
                .defs
                .get(&method.name.id)
                .is_some_and(|o| self.async_info.is_async_func(self.program, *o));

            if let Some(doc) = &method.doc {
                self.write_doc(&doc.clone());
            }
            self.w.write_literally("export ");
            if is_async {
                self.w.write_literally("async ");
            }
            let fn_name = format!(
                "{}_{}",
                self.sanitize(type_name),
                self.sanitize(&method.name.name)
            );
            self.w.write_literally(&format!("function {fn_name}("));
            let recv_name = recv
                .names
                .first()
                .map(|n| self.sanitize(&n.name))
                .filter(|n| n != "_")
                .unwrap_or_else(|| "_recv".to_string());
            self.w.write_literally(&recv_name);
            self.w.write_literally(": ");
            self.write_type_expr(&recv.typ.clone())?;
            for field in method.typ.params.list.clone() {
                for pname in &field.names {
                    let clean = self.sanitize(&pname.name);
                    self.w.write_literally(&format!(", {clean}: "));
                    self.write_type_expr(&field.typ)?;
                }
            }
            self.w.write_literally("): ");
            self.write_result_annotation(method.typ.results.as_ref(), is_async)?;
            self.w.write_literally(" ");

            let Some(body) = &method.body else {
                self.w.write_line("{}");
                continue;
            };
            self.push_results(&method.typ);
            self.write_stmt_block(body, false)?;
            self.pop_results();
            self.w.write_line("");
        }
        Ok(())
    }

    /// All methods in the package whose receiver is the given named type.
    fn receiver_methods(&self, named_id: Option<TypeId>) -> Vec<ast::FuncDecl> {
        let Some(named_id) = named_id else {
            return Vec::new();
        };
        let target = self.program.underlying_id(named_id);
        let mut out = Vec::new();
        for file in &self.pkg.files {
            for decl in &file.ast.decls {
                let ast::Decl::Func(f) = decl else { continue };
                let Some(recv) = &f.recv else { continue };
                let Some(mut recv_t) = self.pkg.info.type_of(recv.typ.id()) else {
                    continue;
                };
                if let Type::Pointer { elem } = self.program.typ(recv_t) {
                    recv_t = *elem;
                }
                if recv_t == named_id || self.program.underlying_id(recv_t) == target {
                    out.push(f.clone());
                }
            }
        }
        out
    }

    /// One method inside a class body. The receiver name binds to the
    /// target (`this` or `this._value`) unless the analysis found it
    /// unused.
    fn write_method(&mut self, decl: &ast::FuncDecl, receiver_target: &str) -> Result<()> {
        if let Some(doc) = &decl.doc {
            self.write_doc(&doc.clone());
        }

        let obj = self.pkg.info.defs.get(&decl.name.id).copied();
        let is_async = obj.is_some_and(|o| self.async_info.is_async_func(self.program, o));

        self.w.write_literally("public ");
        if is_async {
            self.w.write_literally("async ");
        }
        let name = self.sanitize(&decl.name.name);
        self.w.write_literally(&name);
        let prologue = self.write_signature(&decl.typ, is_async)?;
        self.w.write_literally(" ");

        let Some(body) = &decl.body else {
            self.w.write_line("{}");
            return Ok(());
        };

        self.push_results(&decl.typ);
        self.w.write_line("{");
        self.w.indent(1);

        let receiver_bound = decl
            .recv
            .as_ref()
            .and_then(|r| r.names.first())
            .filter(|n| !n.is_blank())
            .filter(|_| obj.is_some_and(|o| self.analysis.is_receiver_used(o)))
            .map(|n| self.sanitize(&n.name));
        if let Some(recv_name) = receiver_bound {
            self.w
                .write_line(&format!("const {recv_name} = {receiver_target}"));
        }

        if self.analysis.needs_defer_stack(body.id) {
            if self.analysis.in_async_context(body.id) || self.block_has_async_defer(body) {
                self.w
                    .write_line("await using __defer = new $.AsyncDisposableStack();");
            } else {
                self.w.write_line("using __defer = new $.DisposableStack();");
            }
        }

        for line in &prologue {
            self.w.write_line(line);
        }
        self.write_named_return_declarations(&decl.typ)?;

        for stmt in &body.stmts {
            self.write_stmt(stmt)?;
        }

        self.w.indent(-1);
        self.w.write_line("}");
        self.pop_results();
        Ok(())
    }
}
