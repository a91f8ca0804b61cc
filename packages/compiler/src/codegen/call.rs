//! Call expression emission: builtins, conversions, function and method
//! calls with async awaiting.

use crate::codegen::TsEmitter;
use crate::error::Result;
use crate::source::{ast, Expr};
use crate::types::{BasicKind, ObjectKind, Type, TypeId};

impl TsEmitter<'_> {
    pub(crate) fn write_call_expr(&mut self, c: &ast::CallExpr) -> Result<()> {
        // Built-in functions lower to runtime helpers.
        if let Expr::Ident(ident) = c.fun.unparen() {
            let is_builtin = match self.obj_of(ident) {
                Some(obj) => self
                    .program
                    .obj(obj)
                    .is_some_and(|o| matches!(o.kind, ObjectKind::Builtin)),
                None => is_builtin_name(&ident.name),
            };
            if is_builtin {
                let name = ident.name.clone();
                return self.write_builtin_call(&name, c);
            }
        }

        // Type conversions: T(x).
        if let Some(target) = self.conversion_target(&c.fun) {
            return self.write_conversion(target, c);
        }

        // Methods on named non-struct, non-primitive types were emitted as
        // standalone `Type_Method` functions with the receiver first.
        if let Expr::Selector(sel) = c.fun.unparen() {
            if let Some(fn_name) = self.standalone_method_fn(sel) {
                let sel = sel.clone();
                if self.is_call_async(c) {
                    self.w.write_literally("await ");
                }
                self.w.write_literally(&fn_name);
                self.w.write_literally("(");
                self.write_value_expr(&sel.x)?;
                for arg in &c.args {
                    self.w.write_literally(", ");
                    self.write_value_expr(arg)?;
                }
                self.w.write_literally(")");
                return Ok(());
            }
        }

        if self.is_call_async(c) {
            self.w.write_literally("await ");
        }

        match c.fun.as_ref() {
            Expr::Ident(ident) => {
                self.write_ident(&ident.clone(), true);
                // A function-typed variable can be nil; calling it must
                // throw like the source language would panic.
                if let Some(obj) = self.obj_of(ident) {
                    if self.program.obj(obj).is_some_and(|o| o.is_var()) {
                        self.w.write_literally("!");
                    }
                }
            }
            Expr::Selector(sel) => {
                self.write_selector_expr(sel)?;
                if let Some(obj) = self.pkg.info.uses.get(&sel.sel.id).copied() {
                    if self.program.obj(obj).is_some_and(|o| o.is_var()) {
                        self.w.write_literally("!");
                    }
                }
            }
            Expr::FuncLit(lit) => {
                self.w.write_literally("(");
                self.write_func_lit(&lit.clone())?;
                self.w.write_literally(")");
            }
            Expr::TypeAssert(assert) => {
                self.write_type_assert_expr(&assert.clone())?;
                self.w.write_literally("!");
            }
            other => {
                self.write_value_expr(other)?;
                self.w.write_literally("!");
            }
        }

        self.write_call_args(c)
    }

    pub(crate) fn write_call_args(&mut self, c: &ast::CallExpr) -> Result<()> {
        self.w.write_literally("(");
        for (i, arg) in c.args.iter().enumerate() {
            if i != 0 {
                self.w.write_literally(", ");
            }
            if c.has_ellipsis && i == c.args.len() - 1 {
                self.w.write_literally("...(");
                self.write_value_expr(arg)?;
                self.w.write_literally(" ?? [])");
            } else {
                self.write_value_expr(arg)?;
            }
        }
        self.w.write_literally(")");
        Ok(())
    }

    /// Whether the call expression suspends and must be awaited.
    pub(crate) fn is_call_async(&self, c: &ast::CallExpr) -> bool {
        match c.fun.unparen() {
            Expr::Ident(ident) => self
                .obj_of(ident)
                .is_some_and(|obj| self.async_info.is_async_func(self.program, obj)),
            Expr::Selector(sel) => self.selector_is_async(sel),
            Expr::FuncLit(lit) => self.async_info.is_func_lit_async(lit.id),
            _ => false,
        }
    }

    fn write_builtin_call(&mut self, name: &str, c: &ast::CallExpr) -> Result<()> {
        match name {
            "len" | "cap" | "append" | "copy" | "close" | "panic" | "recover" | "print"
            | "println" | "real" | "imag" | "complex" | "delete" => {
                self.w.write_literally("$.");
                self.w.write_literally(name);
                self.write_call_args(c)
            }
            "make" => self.write_make_call(c),
            "new" => self.write_new_call(c),
            other => Err(self.err("builtin", format!("unhandled builtin: {other}"))),
        }
    }

    /// `make` for slices, maps and channels.
    fn write_make_call(&mut self, c: &ast::CallExpr) -> Result<()> {
        let Some(type_arg) = c.args.first() else {
            return Err(self.err("make", "missing type argument"));
        };
        let Some(made) = self.pkg.info.type_of(type_arg.id()) else {
            return Err(self.err("make", "unresolved make type"));
        };
        match self.program.underlying(made).clone() {
            Type::Chan { elem, .. } => {
                self.w.write_literally("$.makeChan<");
                self.write_go_type(elem)?;
                self.w.write_literally(">(");
                match c.args.get(1) {
                    Some(capacity) => self.write_value_expr(capacity)?,
                    None => self.w.write_literally("0"),
                }
                self.w.write_literally(", ");
                self.write_zero_value(elem)?;
                self.w.write_literally(")");
                Ok(())
            }
            Type::Map { key, value } => {
                self.w.write_literally("$.makeMap<");
                self.write_go_type(key)?;
                self.w.write_literally(", ");
                self.write_go_type(value)?;
                self.w.write_literally(">()");
                Ok(())
            }
            Type::Slice { elem } => {
                let is_byte = matches!(
                    self.program.underlying(elem),
                    Type::Basic {
                        basic: BasicKind::Uint8
                    }
                );
                let length = c.args.get(1).cloned();
                let capacity = c.args.get(2).cloned();
                if is_byte && capacity.is_none() {
                    // make([]byte, n) gets the compact typed-array form.
                    self.w.write_literally("new Uint8Array(");
                    match &length {
                        Some(l) => self.write_value_expr(l)?,
                        None => self.w.write_literally("0"),
                    }
                    self.w.write_literally(")");
                    return Ok(());
                }
                self.w.write_literally("$.makeSlice<");
                self.write_go_type(elem)?;
                self.w.write_literally(">(");
                match &length {
                    Some(l) => self.write_value_expr(l)?,
                    None => self.w.write_literally("0"),
                }
                if let Some(capacity) = &capacity {
                    self.w.write_literally(", ");
                    self.write_value_expr(capacity)?;
                }
                if let Some(hint) = self.slice_type_hint(elem) {
                    if capacity.is_none() {
                        self.w.write_literally(", undefined");
                    }
                    self.w.write_literally(&format!(", '{hint}'"));
                }
                self.w.write_literally(")");
                Ok(())
            }
            other => Err(self.err("make", format!("cannot make {other:?}"))),
        }
    }

    /// Zero-value initialization hint for slice elements that the runtime
    /// cannot infer from the element type parameter alone.
    fn slice_type_hint(&self, elem: TypeId) -> Option<&'static str> {
        match self.program.underlying(elem) {
            Type::Basic { basic } if basic.is_numeric() => Some("number"),
            Type::Basic { basic } if basic.is_string() => Some("string"),
            Type::Basic { basic } if basic.is_boolean() => Some("boolean"),
            _ => None,
        }
    }

    /// `new(T)`: structs allocate an instance, everything else a cell
    /// holding the zero value.
    fn write_new_call(&mut self, c: &ast::CallExpr) -> Result<()> {
        let Some(type_arg) = c.args.first() else {
            return Err(self.err("new", "missing type argument"));
        };
        let Some(t) = self.pkg.info.type_of(type_arg.id()) else {
            return Err(self.err("new", "unresolved new type"));
        };
        if self.program.underlying(t).is_struct() {
            self.w.write_literally("new ");
            self.write_type_expr(type_arg)?;
            self.w.write_literally("()");
        } else {
            self.w.write_literally("$.varRef(");
            self.write_zero_value(t)?;
            self.w.write_literally(")");
        }
        Ok(())
    }

    /// Resolves a selector call to the standalone function emitted for
    /// methods of named non-struct, non-primitive, non-interface types.
    fn standalone_method_fn(&self, sel: &ast::SelectorExpr) -> Option<String> {
        let obj_id = self.pkg.info.uses.get(&sel.sel.id).copied()?;
        let object = self.program.obj(obj_id)?;
        let ObjectKind::Func { recv: Some(recv) } = &object.kind else {
            return None;
        };
        let mut t = *recv;
        if let Type::Pointer { elem } = self.program.typ(t) {
            t = *elem;
        }
        let Type::Named {
            name,
            pkg,
            underlying,
            ..
        } = self.program.typ(t)
        else {
            return None;
        };
        match self.program.underlying(*underlying) {
            Type::Struct { .. } | Type::Interface { .. } | Type::Basic { .. } => return None,
            _ => {}
        }
        let fn_name = format!(
            "{}_{}",
            crate::util::sanitize_identifier(name),
            crate::util::sanitize_identifier(&object.name)
        );
        match pkg.as_deref() {
            Some(path) if path != self.pkg.path => {
                let display = self
                    .program
                    .package(path)
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| path.rsplit('/').next().unwrap_or(path).to_string());
                Some(format!(
                    "{}.{fn_name}",
                    crate::util::sanitize_identifier(&display)
                ))
            }
            _ => Some(fn_name),
        }
    }

    /// Detects conversions: the callee names a type rather than a value.
    fn conversion_target(&self, fun: &Expr) -> Option<TypeId> {
        let named_type = match fun.unparen() {
            Expr::Ident(ident) => {
                let obj = self.obj_of(ident)?;
                self.program
                    .obj(obj)
                    .filter(|o| matches!(o.kind, ObjectKind::TypeName))
                    .map(|o| o.typ)
            }
            Expr::Selector(sel) => {
                let obj = self.pkg.info.uses.get(&sel.sel.id).copied()?;
                self.program
                    .obj(obj)
                    .filter(|o| matches!(o.kind, ObjectKind::TypeName))
                    .map(|o| o.typ)
            }
            Expr::ArrayType(_) | Expr::MapType(_) | Expr::ChanType(_) | Expr::FuncType(_) => {
                self.pkg.info.type_of(fun.unparen().id())
            }
            _ => None,
        };
        named_type
    }

    fn write_conversion(&mut self, target: TypeId, c: &ast::CallExpr) -> Result<()> {
        let Some(arg) = c.args.first() else {
            return Err(self.err("conversion", "missing operand"));
        };
        let arg = arg.clone();
        let source = self.type_of(&arg);

        let target_under = self.program.underlying(target).clone();
        let source_under = source.map(|s| self.program.underlying(s).clone());

        match (&target_under, &source_under) {
            // string <-> byte/rune slices.
            (Type::Basic { basic }, Some(Type::Slice { elem })) if basic.is_string() => {
                let helper = match self.program.underlying(*elem) {
                    Type::Basic {
                        basic: BasicKind::Uint8,
                    } => "$.bytesToString",
                    _ => "$.runesToString",
                };
                self.w.write_literally(helper);
                self.w.write_literally("(");
                self.write_value_expr(&arg)?;
                self.w.write_literally(")");
                return Ok(());
            }
            (Type::Basic { basic }, Some(Type::Basic { basic: src })) if basic.is_string() => {
                if src.is_numeric() {
                    // int -> string converts a code point.
                    self.w.write_literally("$.runeToString(");
                    self.write_value_expr(&arg)?;
                    self.w.write_literally(")");
                    return Ok(());
                }
            }
            (Type::Slice { elem }, Some(Type::Basic { basic })) if basic.is_string() => {
                let helper = match self.program.underlying(*elem) {
                    Type::Basic {
                        basic: BasicKind::Uint8,
                    } => "$.stringToBytes",
                    _ => "$.stringToRunes",
                };
                self.w.write_literally(helper);
                self.w.write_literally("(");
                self.write_value_expr(&arg)?;
                self.w.write_literally(")");
                return Ok(());
            }
            _ => {}
        }

        // Float-to-integer conversions truncate toward zero.
        if let (Type::Basic { basic: target_b }, Some(Type::Basic { basic: source_b })) =
            (&target_under, &source_under)
        {
            let target_int = target_b.is_numeric()
                && !matches!(target_b, BasicKind::Float32 | BasicKind::Float64);
            let source_float = matches!(
                source_b,
                BasicKind::Float32 | BasicKind::Float64 | BasicKind::UntypedFloat
            );
            if target_int && source_float {
                self.w.write_literally("Math.trunc(");
                self.write_value_expr(&arg)?;
                self.w.write_literally(")");
                return Ok(());
            }
        }

        // Named wrapper types over primitives construct the wrapper.
        if let Type::Named { underlying, .. } = self.program.typ(target) {
            let under = self.program.underlying(*underlying);
            if matches!(under, Type::Basic { .. }) && !matches!(source_under, None) {
                let wraps_class = !matches!(
                    source_under,
                    Some(Type::Named { .. })
                );
                if wraps_class {
                    self.w.write_literally("new ");
                    self.write_type_expr(&c.fun)?;
                    self.w.write_literally("(");
                    self.write_value_expr(&arg)?;
                    self.w.write_literally(")");
                    return Ok(());
                }
            }
        }

        // Structural conversions are identity in the target language.
        self.write_value_expr(&arg)
    }
}

fn is_builtin_name(name: &str) -> bool {
    matches!(
        name,
        "len"
            | "cap"
            | "make"
            | "new"
            | "append"
            | "copy"
            | "delete"
            | "complex"
            | "real"
            | "imag"
            | "close"
            | "panic"
            | "recover"
            | "print"
            | "println"
    )
}
