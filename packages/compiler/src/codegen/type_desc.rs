//! Type translation: TypeScript type annotations, zero values and runtime
//! type descriptors.

use crate::codegen::TsEmitter;
use crate::error::Result;
use crate::source::{ast, Expr};
use crate::types::{BasicKind, Type, TypeId};

impl TsEmitter<'_> {
    /// TypeScript annotation for a type expression from the syntax tree.
    pub(crate) fn write_type_expr(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Ident(ident) => {
                let name = ts_name_for_predeclared(&ident.name)
                    .map(str::to_string)
                    .unwrap_or_else(|| self.sanitize(&ident.name));
                self.w.write_literally(&name);
                Ok(())
            }
            Expr::Selector(sel) => {
                if let Expr::Ident(pkg_ident) = sel.x.as_ref() {
                    let base = self.sanitize(&pkg_ident.name);
                    let name = self.sanitize(&sel.sel.name);
                    self.w.write_literally(&format!("{base}.{name}"));
                    Ok(())
                } else {
                    Err(self.err("type expression", "selector base is not a package"))
                }
            }
            Expr::Star(star) => {
                if self
                    .pkg
                    .info
                    .type_of(star.x.id())
                    .is_some_and(|t| self.program.underlying(t).is_struct())
                {
                    self.write_type_expr(&star.x)?;
                    self.w.write_literally(" | null");
                } else {
                    self.w.write_literally("$.VarRef<");
                    self.write_type_expr(&star.x)?;
                    self.w.write_literally("> | null");
                }
                Ok(())
            }
            Expr::ArrayType(arr) => {
                self.w.write_literally("$.Slice<");
                self.write_type_expr(&arr.elem)?;
                self.w.write_literally(">");
                Ok(())
            }
            Expr::MapType(map) => {
                self.w.write_literally("Map<");
                self.write_type_expr(&map.key)?;
                self.w.write_literally(", ");
                self.write_type_expr(&map.value)?;
                self.w.write_literally("> | null");
                Ok(())
            }
            Expr::ChanType(chan) => {
                self.w.write_literally("$.Channel<");
                self.write_type_expr(&chan.elem)?;
                self.w.write_literally("> | null");
                Ok(())
            }
            Expr::FuncType(func) => {
                self.w.write_literally("((");
                self.write_param_annotations(&func.params)?;
                self.w.write_literally(") => ");
                self.write_result_annotation(func.results.as_ref(), false)?;
                self.w.write_literally(") | null");
                Ok(())
            }
            Expr::InterfaceType(iface) => {
                if iface.methods.is_empty() {
                    self.w.write_literally("any");
                    return Ok(());
                }
                self.w.write_literally("{ ");
                for (i, field) in iface.methods.list.iter().enumerate() {
                    if i != 0 {
                        self.w.write_literally("; ");
                    }
                    let Some(name) = field.names.first() else {
                        return Err(self.err("interface type", "embedded interface element"));
                    };
                    let method = self.sanitize(&name.name);
                    self.w.write_literally(&method);
                    let Expr::FuncType(sig) = &field.typ else {
                        return Err(self.err("interface type", "method without signature"));
                    };
                    self.w.write_literally("(");
                    self.write_param_annotations(&sig.params)?;
                    self.w.write_literally("): ");
                    self.write_result_annotation(sig.results.as_ref(), false)?;
                }
                self.w.write_literally(" } | null");
                Ok(())
            }
            Expr::StructType(st) => {
                self.w.write_literally("{ ");
                for (i, field) in st.fields.list.iter().enumerate() {
                    if i != 0 {
                        self.w.write_literally("; ");
                    }
                    for (j, name) in field.names.iter().enumerate() {
                        if j != 0 {
                            self.w.write_literally("; ");
                        }
                        let n = self.sanitize(&name.name);
                        self.w.write_literally(&n);
                        self.w.write_literally(": ");
                        self.write_type_expr(&field.typ)?;
                    }
                }
                self.w.write_literally(" }");
                Ok(())
            }
            Expr::Paren(p) => self.write_type_expr(&p.x),
            other => Err(self.err(
                "type expression",
                format!("unhandled type expression: {other:?}"),
            )),
        }
    }

    pub(crate) fn write_param_annotations(&mut self, params: &ast::FieldList) -> Result<()> {
        let mut wrote = false;
        let mut unnamed = 0;
        for field in params.list.clone() {
            let names: Vec<String> = if field.names.is_empty() {
                unnamed += 1;
                vec![format!("_p{unnamed}")]
            } else {
                field.names.iter().map(|n| self.sanitize(&n.name)).collect()
            };
            for name in names {
                if wrote {
                    self.w.write_literally(", ");
                }
                wrote = true;
                self.w.write_literally(&name);
                self.w.write_literally(": ");
                self.write_type_expr(&field.typ)?;
            }
        }
        Ok(())
    }

    /// Result annotation for signatures: `void`, a single type, or a
    /// tuple, optionally wrapped in `Promise<…>`.
    pub(crate) fn write_result_annotation(
        &mut self,
        results: Option<&ast::FieldList>,
        is_async: bool,
    ) -> Result<()> {
        if is_async {
            self.w.write_literally("Promise<");
        }
        match results {
            None => self.w.write_literally("void"),
            Some(list) if list.is_empty() => self.w.write_literally("void"),
            Some(list) => {
                let mut types: Vec<&Expr> = Vec::new();
                for field in &list.list {
                    let n = field.names.len().max(1);
                    for _ in 0..n {
                        types.push(&field.typ);
                    }
                }
                if types.len() == 1 {
                    self.write_type_expr(types[0])?;
                } else {
                    self.w.write_literally("[");
                    for (i, t) in types.into_iter().enumerate() {
                        if i != 0 {
                            self.w.write_literally(", ");
                        }
                        self.write_type_expr(t)?;
                    }
                    self.w.write_literally("]");
                }
            }
        }
        if is_async {
            self.w.write_literally(">");
        }
        Ok(())
    }

    /// TypeScript annotation derived from a resolved type id, used where
    /// no syntax is available (generic helpers, zero values).
    pub(crate) fn write_go_type(&mut self, id: TypeId) -> Result<()> {
        let text = self.ts_type_name(id);
        self.w.write_literally(&text);
        Ok(())
    }

    pub(crate) fn ts_type_name(&self, id: TypeId) -> String {
        match self.program.typ(id) {
            Type::Basic { basic } => ts_basic_name(*basic).to_string(),
            Type::Named { name, pkg, .. } => {
                if name == "error" && pkg.is_none() {
                    return "$.GoError".to_string();
                }
                match pkg.as_deref() {
                    Some(path) if path != self.pkg.path => {
                        let display = self
                            .program
                            .package(path)
                            .map(|p| p.name.clone())
                            .unwrap_or_else(|| {
                                path.rsplit('/').next().unwrap_or(path).to_string()
                            });
                        format!(
                            "{}.{}",
                            crate::util::sanitize_identifier(&display),
                            crate::util::sanitize_identifier(name)
                        )
                    }
                    _ => crate::util::sanitize_identifier(name),
                }
            }
            Type::Pointer { elem } => {
                if self.program.underlying(*elem).is_struct() {
                    format!("{} | null", self.ts_type_name(*elem))
                } else {
                    format!("$.VarRef<{}> | null", self.ts_type_name(*elem))
                }
            }
            Type::Slice { elem } | Type::Array { elem, .. } => {
                format!("$.Slice<{}>", self.ts_type_name(*elem))
            }
            Type::Map { key, value } => format!(
                "Map<{}, {}> | null",
                self.ts_type_name(*key),
                self.ts_type_name(*value)
            ),
            Type::Chan { elem, .. } => format!("$.Channel<{}> | null", self.ts_type_name(*elem)),
            Type::Interface { methods } if methods.is_empty() => "any".to_string(),
            Type::Interface { .. } => "any".to_string(),
            Type::Signature {
                params, results, ..
            } => {
                let params: Vec<String> = params
                    .iter()
                    .enumerate()
                    .map(|(i, p)| format!("_p{}: {}", i, self.ts_type_name(*p)))
                    .collect();
                let result = match results.len() {
                    0 => "void".to_string(),
                    1 => self.ts_type_name(results[0]),
                    _ => format!(
                        "[{}]",
                        results
                            .iter()
                            .map(|r| self.ts_type_name(*r))
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                };
                format!("(({}) => {}) | null", params.join(", "), result)
            }
            Type::Tuple { types } => format!(
                "[{}]",
                types
                    .iter()
                    .map(|t| self.ts_type_name(*t))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Type::TypeParam { .. } => "any".to_string(),
            Type::Invalid => "any".to_string(),
        }
    }

    /// Zero value of a type, per the fixed table: numbers are `0`, strings
    /// empty, booleans `false`, structs a fresh instance, reference-like
    /// types `null`.
    pub(crate) fn write_zero_value(&mut self, id: TypeId) -> Result<()> {
        let text = match self.program.typ(id) {
            Type::Basic { basic } => {
                if basic.is_numeric() {
                    "0".to_string()
                } else if basic.is_string() {
                    "\"\"".to_string()
                } else if basic.is_boolean() {
                    "false".to_string()
                } else {
                    "null".to_string()
                }
            }
            Type::Named { underlying, .. } => {
                if self.program.underlying(*underlying).is_struct() {
                    format!("new {}()", self.ts_type_name(id))
                } else {
                    let under = *underlying;
                    return self.write_zero_value(under);
                }
            }
            Type::Struct { .. } => format!("new {}()", self.ts_type_name(id)),
            Type::Array { .. } => "[]".to_string(),
            _ => "null".to_string(),
        };
        self.w.write_literally(&text);
        Ok(())
    }

    /// Runtime type descriptor naming, consumed by `$.typeAssert` and
    /// friends. Named types are referenced by name; structural types get
    /// small object descriptors.
    pub(crate) fn write_type_description(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Ident(ident) => {
                let text = if is_predeclared_basic(&ident.name) {
                    format!("{{kind: $.TypeKind.Basic, name: '{}'}}", ident.name)
                } else {
                    format!("'{}'", ident.name)
                };
                self.w.write_literally(&text);
                Ok(())
            }
            Expr::Selector(sel) => {
                if let Expr::Ident(pkg_ident) = sel.x.as_ref() {
                    let text = format!("'{}.{}'", pkg_ident.name, sel.sel.name);
                    self.w.write_literally(&text);
                    Ok(())
                } else {
                    Err(self.err("type descriptor", "selector base is not a package"))
                }
            }
            Expr::Star(star) => {
                self.w.write_literally("{kind: $.TypeKind.Pointer, elemType: ");
                self.write_type_description(&star.x)?;
                self.w.write_literally("}");
                Ok(())
            }
            Expr::ArrayType(arr) => {
                self.w.write_literally("{kind: $.TypeKind.Slice, elemType: ");
                self.write_type_description(&arr.elem)?;
                self.w.write_literally("}");
                Ok(())
            }
            Expr::MapType(map) => {
                self.w.write_literally("{kind: $.TypeKind.Map, keyType: ");
                self.write_type_description(&map.key)?;
                self.w.write_literally(", elemType: ");
                self.write_type_description(&map.value)?;
                self.w.write_literally("}");
                Ok(())
            }
            Expr::ChanType(chan) => {
                self.w.write_literally("{kind: $.TypeKind.Channel, elemType: ");
                self.write_type_description(&chan.elem)?;
                self.w.write_literally("}");
                Ok(())
            }
            Expr::FuncType(_) => {
                self.w.write_literally("{kind: $.TypeKind.Function}");
                Ok(())
            }
            Expr::InterfaceType(iface) => {
                let mut names = Vec::new();
                for field in &iface.methods.list {
                    if let Some(name) = field.names.first() {
                        names.push(format!("'{}'", name.name));
                    }
                }
                let text = format!(
                    "{{kind: $.TypeKind.Interface, methods: [{}]}}",
                    names.join(", ")
                );
                self.w.write_literally(&text);
                Ok(())
            }
            Expr::StructType(_) => {
                self.w.write_literally("{kind: $.TypeKind.Struct}");
                Ok(())
            }
            Expr::Paren(p) => self.write_type_description(&p.x),
            other => Err(self.err(
                "type descriptor",
                format!("unhandled type expression: {other:?}"),
            )),
        }
    }
}

fn ts_basic_name(kind: BasicKind) -> &'static str {
    if kind.is_numeric() {
        "number"
    } else if kind.is_string() {
        "string"
    } else if kind.is_boolean() {
        "boolean"
    } else {
        "any"
    }
}

fn ts_name_for_predeclared(name: &str) -> Option<&'static str> {
    match name {
        "int" | "int8" | "int16" | "int32" | "int64" | "uint" | "uint8" | "uint16" | "uint32"
        | "uint64" | "uintptr" | "float32" | "float64" | "byte" | "rune" => Some("number"),
        "complex64" | "complex128" => Some("$.Complex"),
        "string" => Some("string"),
        "bool" => Some("boolean"),
        "error" => Some("$.GoError"),
        "any" => Some("any"),
        _ => None,
    }
}

fn is_predeclared_basic(name: &str) -> bool {
    matches!(
        name,
        "int"
            | "int8"
            | "int16"
            | "int32"
            | "int64"
            | "uint"
            | "uint8"
            | "uint16"
            | "uint32"
            | "uint64"
            | "uintptr"
            | "float32"
            | "float64"
            | "complex64"
            | "complex128"
            | "byte"
            | "rune"
            | "string"
            | "bool"
    )
}
