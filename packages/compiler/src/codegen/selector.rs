//! Selector expression emission.

use crate::codegen::TsEmitter;
use crate::error::Result;
use crate::source::{ast, Expr};

impl TsEmitter<'_> {
    /// Translates `x.F`, `pkg.X` and `(*p).F` forms. Pointer and interface
    /// bases get a non-null assertion before the dot to mirror the source
    /// language's nil-panic semantics.
    pub(crate) fn write_selector_expr(&mut self, e: &ast::SelectorExpr) -> Result<()> {
        self.write_selector_base(e)?;
        self.write_ident(&e.sel.clone(), false);
        Ok(())
    }

    /// Writes the base of a selector followed by the appropriate `.` or
    /// `!.` separator, leaving the selected name to the caller.
    pub(crate) fn write_selector_base(&mut self, e: &ast::SelectorExpr) -> Result<()> {
        // Package selector: pkg.X never asserts on the package name.
        if let Expr::Ident(pkg_ident) = e.x.as_ref() {
            if let Some(obj_id) = self.obj_of(pkg_ident) {
                if self.program.obj(obj_id).is_some_and(|o| o.is_pkg_name()) {
                    let name = self.sanitize(&pkg_ident.name);
                    self.w.write_literally(&name);
                    self.w.write_literally(".");
                    return Ok(());
                }
            }
        }

        // Explicit dereference base: (*p).F and deeper.
        let base = e.x.unparen();
        if let Expr::Star(star) = base {
            self.write_value_expr(&star.x)?;
            self.write_deref_suffix(&star.x);
            self.w.write_literally(".");
            return Ok(());
        }

        self.write_value_expr(&e.x)?;

        // An un-dereferenced pointer or interface base can be nil; calls
        // and field reads through it must throw, so assert non-null.
        let assert_non_null = self.is_pointer(&e.x)
            || self.is_interface_value(&e.x)
            || matches!(e.x.as_ref(), Expr::Call(_));
        if assert_non_null {
            // A pointer that aliases a reference cell holds the cell, not
            // the instance; hop through it first.
            if let Expr::Ident(ident) = e.x.unparen() {
                if let Some(obj) = self.obj_of(ident) {
                    if self.analysis.is_var_ref_alias(obj)
                        && self.pointee_is_struct(&e.x)
                    {
                        self.w.write_literally("!.value");
                    }
                }
            }
            self.w.write_literally("!.");
        } else {
            self.w.write_literally(".");
        }
        Ok(())
    }

    /// True when the selector resolves to a method whose emission is
    /// async, either directly or through an interface slot.
    pub(crate) fn selector_is_async(&self, e: &ast::SelectorExpr) -> bool {
        if let Some(obj) = self.pkg.info.uses.get(&e.sel.id).copied() {
            if self.async_info.is_async_func(self.program, obj) {
                return true;
            }
            // Calls into overlay packages resolve through the seeded
            // method table.
            if let Some(object) = self.program.obj(obj) {
                if let Some(pkg) = object.pkg.as_deref() {
                    if self.program.package(pkg).is_none() {
                        let recv = match &object.kind {
                            crate::types::ObjectKind::Func { recv: Some(r) } => {
                                crate::analysis::async_prop::receiver_type_name(self.program, *r)
                            }
                            _ => String::new(),
                        };
                        return self.async_info.is_method_async(pkg, &recv, &object.name);
                    }
                }
            }
        }
        false
    }

}
