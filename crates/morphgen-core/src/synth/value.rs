//! Statement emission for a single value conversion.
//!
//! [`Emitter::convert_value`] turns one [`MatchDescription`] into the
//! statements moving a source expression into a destination expression,
//! recursing through sequence and map element descriptions.

use crate::conversion::{Conversion, RoutineRef};
use crate::description::MatchDescription;
use crate::enums::EnumDescription;
use crate::error::GenerateError;
use crate::types::{ConstValue, TypeId, TypeKind};

use super::Emitter;

/// An addressable expression and its type.
#[derive(Debug, Clone)]
pub(crate) struct Slot {
    pub expr: String,
    pub ty: TypeId,
}

impl Slot {
    pub fn new(expr: impl Into<String>, ty: TypeId) -> Self {
        Self {
            expr: expr.into(),
            ty,
        }
    }
}

/// What is being converted, for error messages and error tags.
#[derive(Debug, Clone)]
pub(crate) struct Context {
    pub what: String,
    pub tag: String,
    /// Container element being converted: its part name and the loop
    /// variable locating it.
    pub element: Option<(String, String)>,
}

impl Context {
    fn element(&self, part: &str, locator: &str) -> Context {
        Context {
            what: format!("{part} of {}", self.what),
            tag: self.tag.clone(),
            element: Some((format!("{part} %v of {}", self.what), locator.to_string())),
        }
    }
}

impl Emitter<'_> {
    /// Emit statements converting `src` into `dst` according to `descr`.
    ///
    /// With `guard`, nilable sources are only read inside an `!= nil` check.
    pub(crate) fn convert_value(
        &mut self,
        dst: &Slot,
        src: &Slot,
        descr: &MatchDescription,
        ctx: &Context,
        guard: bool,
    ) -> Result<(), GenerateError> {
        let guarded = guard && self.needs_guard(src.ty);
        if guarded {
            self.out.open(format!("if {} != nil {{", src.expr));
        }

        match descr {
            MatchDescription::NoMatch => {
                return Err(GenerateError::synthesis(format!(
                    "no conversion strategy for {}",
                    ctx.what
                )));
            }
            MatchDescription::Direct => self.assign(dst, src),
            MatchDescription::Conversion { forward, .. } => {
                self.convert_with_routine(dst, src, forward, ctx)
            }
            MatchDescription::Castable => {
                let target = self.universe.strip_pointer(dst.ty);
                let expr = format!("{}({})", self.type_expr(target), self.deref(src));
                let elide = !self.universe.is_pointer(src.ty);
                self.assign_value(dst, &Slot::new(expr, target), elide);
            }
            MatchDescription::Enum { primary, secondary } => {
                self.convert_enum(dst, src, primary, secondary, ctx)?
            }
            MatchDescription::Sequence { elem } => self.convert_sequence(dst, src, elem, ctx)?,
            MatchDescription::Map { key, elem } => self.convert_map(dst, src, key, elem, ctx)?,
        }

        if guarded {
            self.out.close();
        }
        Ok(())
    }

    fn needs_guard(&self, ty: TypeId) -> bool {
        let u = self.universe;
        matches!(
            u.kind(u.underlying(ty)),
            TypeKind::Pointer(_) | TypeKind::Sequence(_) | TypeKind::Map { .. }
        )
    }

    fn deref(&self, src: &Slot) -> String {
        if self.universe.is_pointer(src.ty) {
            format!("*{}", src.expr)
        } else {
            src.expr.clone()
        }
    }

    fn zero_literal(&self, ty: TypeId) -> Option<&'static str> {
        self.universe.basic_kind(ty).and_then(|k| k.zero_literal())
    }

    // -- assignment ---------------------------------------------------------

    /// Assign an addressable source whose (pointer-stripped) type is
    /// assignable to the destination's.
    fn assign(&mut self, dst: &Slot, src: &Slot) {
        let u = self.universe;
        match (u.pointer_elem(src.ty), u.pointer_elem(dst.ty)) {
            (Some(_), None) => self.out.line(format!("{} = *{}", dst.expr, src.expr)),
            (None, Some(target)) if src.ty == target => match self.zero_literal(src.ty) {
                Some(zero) => {
                    self.out.open(format!("if {} != {zero} {{", src.expr));
                    self.out.line(format!("{} = &{}", dst.expr, src.expr));
                    self.out.close();
                }
                None => self.out.line(format!("{} = &{}", dst.expr, src.expr)),
            },
            (None, Some(target)) => {
                let expr = format!("{}({})", self.type_expr(target), src.expr);
                self.assign_value(dst, &Slot::new(expr, target), true);
            }
            (Some(_), Some(to)) if !u.assignable(src.ty, dst.ty) => {
                let tmp = self.temp("tmp");
                let expr = format!("{}(*{})", self.type_expr(to), src.expr);
                self.out.line(format!("{tmp} := {expr}"));
                self.out.line(format!("{} = &{tmp}", dst.expr));
            }
            _ => self.out.line(format!("{} = {}", dst.expr, src.expr)),
        }
    }

    /// Assign a non-addressable value. A pointer destination goes through a
    /// temporary; with `elide`, zero values leave the destination unset.
    fn assign_value(&mut self, dst: &Slot, value: &Slot, elide: bool) {
        let u = self.universe;
        match (u.is_pointer(value.ty), u.is_pointer(dst.ty)) {
            (false, true) => {
                let tmp = self.temp("tmp");
                match self.zero_literal(value.ty).filter(|_| elide) {
                    Some(zero) => {
                        self.out
                            .open(format!("if {tmp} := {}; {tmp} != {zero} {{", value.expr));
                        self.out.line(format!("{} = &{tmp}", dst.expr));
                        self.out.close();
                    }
                    None => {
                        self.out.line(format!("{tmp} := {}", value.expr));
                        self.out.line(format!("{} = &{tmp}", dst.expr));
                    }
                }
            }
            (true, false) => self.out.line(format!("{} = *{}", dst.expr, value.expr)),
            _ => self.out.line(format!("{} = {}", dst.expr, value.expr)),
        }
    }

    // -- conversion routines ------------------------------------------------

    fn convert_with_routine(
        &mut self,
        dst: &Slot,
        src: &Slot,
        conversion: &Conversion,
        ctx: &Context,
    ) {
        let call = match &conversion.routine {
            RoutineRef::Method { name } => format!("{}.{name}()", src.expr),
            RoutineRef::Function { namespace, name } => {
                let function = self.qualified(*namespace, name);
                format!("{function}({})", self.argument(src, conversion.param))
            }
        };

        let result = self.temp("convres");
        if conversion.fallible {
            self.out.line(format!("{result}, err := {call}"));
            self.out.open("if err != nil {");
            let err = match &ctx.element {
                Some((what, locator)) => self.errors.wrapf(
                    &mut self.imports,
                    "err",
                    &format!("convert {what}"),
                    &[locator.as_str()],
                ),
                None => self
                    .errors
                    .wrap(&mut self.imports, "err", &format!("convert {}", ctx.what)),
            };
            let err = self.errors.tagged(err, &ctx.tag, &src.expr);
            self.out.line(format!("return nil, {err}"));
            self.out.close();
        } else {
            self.out.line(format!("{result} := {call}"));
        }

        let produced = Slot::new(result, conversion.result);
        if self.universe.is_pointer(produced.ty) && !self.universe.is_pointer(dst.ty) {
            self.out.open(format!("if {} != nil {{", produced.expr));
            self.assign(dst, &produced);
            self.out.close();
        } else {
            self.assign(dst, &produced);
        }
    }

    /// Pass `src` the way the routine's parameter expects it.
    fn argument(&self, src: &Slot, param: Option<TypeId>) -> String {
        let u = self.universe;
        let wants_pointer = param.is_some_and(|p| u.is_pointer(p));
        match (u.is_pointer(src.ty), wants_pointer) {
            (true, false) => format!("*{}", src.expr),
            (false, true) => format!("&{}", src.expr),
            _ => src.expr.clone(),
        }
    }

    // -- enumerations -------------------------------------------------------

    fn convert_enum(
        &mut self,
        dst: &Slot,
        src: &Slot,
        from: &EnumDescription,
        to: &EnumDescription,
        ctx: &Context,
    ) -> Result<(), GenerateError> {
        let value = self.deref(src);
        let elide = !self.universe.is_pointer(src.ty);

        if let Some(key) = to.lookup_key.filter(|_| to.index_style) {
            let table = self.qualified(to.namespace, &crate::naming::enum_name_table(&to.name));
            let key = self.type_expr(key);
            self.out
                .open(format!("if _, ok := {table}[{key}({value})]; ok {{"));
            let cast = format!("{}({value})", self.type_expr(to.ty));
            self.assign_value(dst, &Slot::new(cast, to.ty), elide);
            self.out.reopen("} else {");
            self.unknown_value(&value, ctx);
            self.out.close();
            return Ok(());
        }

        self.out.open(format!("switch {value} {{"));
        for literal in from.values() {
            let (Some(source), Some(target)) = (from.constant_for(literal), to.constant_for(literal))
            else {
                return Err(GenerateError::synthesis(format!(
                    "enumeration value {literal} of {} has no counterpart",
                    ctx.what
                )));
            };
            let label = self.qualified(from.namespace, &source.name);
            self.out.case(format!("case {label}:"));
            let constant = self.qualified(to.namespace, &target.name);
            if self.universe.is_pointer(dst.ty) && is_zero(literal) {
                self.out.line(format!("// {constant} is the zero value, {} stays nil", dst.expr));
            } else {
                self.assign_value(dst, &Slot::new(constant, to.ty), false);
            }
        }
        self.out.case("default:");
        self.unknown_value(&value, ctx);
        self.out.close();
        Ok(())
    }

    fn unknown_value(&mut self, value: &str, ctx: &Context) {
        let err = self.errors.formatted(
            &mut self.imports,
            &format!("unknown value %v of {}", ctx.what),
            &[value],
        );
        let err = self.errors.tagged(err, &ctx.tag, value);
        self.out.line(format!("return nil, {err}"));
    }

    // -- containers ---------------------------------------------------------

    /// Destination the container is built in: `dst` itself, or a fresh
    /// variable when `dst` is a pointer.
    fn container_target(&mut self, dst: &Slot, prefix: &str) -> (String, TypeId) {
        let target = self.universe.strip_pointer(dst.ty);
        if self.universe.is_pointer(dst.ty) {
            let tmp = self.temp(prefix);
            let ty = self.type_expr(target);
            self.out.line(format!("var {tmp} {ty}"));
            (tmp, target)
        } else {
            (dst.expr.clone(), target)
        }
    }

    /// Shadow the loop value with a per-iteration copy when the element
    /// destination stores its address. Before Go 1.22 every iteration shares
    /// one range variable.
    fn rebind_loop_value(&mut self, item: &str, src_elem: TypeId, dst_elem: TypeId) {
        let u = self.universe;
        if u.is_pointer(dst_elem) && !u.is_pointer(src_elem) {
            self.out.line(format!("{item} := {item}"));
        }
    }

    fn convert_sequence(
        &mut self,
        dst: &Slot,
        src: &Slot,
        elem: &MatchDescription,
        ctx: &Context,
    ) -> Result<(), GenerateError> {
        let u = self.universe;
        let source = u.strip_pointer(src.ty);
        let (TypeKind::Sequence(src_elem), TypeKind::Sequence(_)) = (
            u.kind(u.underlying(source)),
            u.kind(u.underlying(u.strip_pointer(dst.ty))),
        ) else {
            return Err(GenerateError::synthesis(format!(
                "slice match of {} between non-slice types",
                ctx.what
            )));
        };
        let src_elem = *src_elem;

        let (into, target) = self.container_target(dst, "tmpslice");
        let TypeKind::Sequence(dst_elem) = u.kind(u.underlying(target)) else {
            return Ok(());
        };
        let dst_elem = *dst_elem;
        let source_expr = self.deref(src);
        let ty = self.type_expr(target);
        self.out
            .line(format!("{into} = make({ty}, len({source_expr}))"));

        let n = self.next_id();
        let (index, item) = (format!("i{n}"), format!("elem{n}"));
        self.out
            .open(format!("for {index}, {item} := range {source_expr} {{"));
        self.rebind_loop_value(&item, src_elem, dst_elem);
        self.convert_value(
            &Slot::new(format!("{into}[{index}]"), dst_elem),
            &Slot::new(item, src_elem),
            elem,
            &ctx.element("slice element", &index),
            true,
        )?;
        self.out.close();

        if u.is_pointer(dst.ty) {
            self.out.line(format!("{} = &{into}", dst.expr));
        }
        Ok(())
    }

    fn convert_map(
        &mut self,
        dst: &Slot,
        src: &Slot,
        key: &MatchDescription,
        elem: &MatchDescription,
        ctx: &Context,
    ) -> Result<(), GenerateError> {
        let u = self.universe;
        let source = u.strip_pointer(src.ty);
        let (
            TypeKind::Map {
                key: src_key,
                elem: src_elem,
            },
            TypeKind::Map { .. },
        ) = (
            u.kind(u.underlying(source)),
            u.kind(u.underlying(u.strip_pointer(dst.ty))),
        )
        else {
            return Err(GenerateError::synthesis(format!(
                "map match of {} between non-map types",
                ctx.what
            )));
        };
        let (src_key, src_elem) = (*src_key, *src_elem);

        let (into, target) = self.container_target(dst, "tmpmap");
        let TypeKind::Map {
            key: dst_key,
            elem: dst_elem,
        } = u.kind(u.underlying(target))
        else {
            return Ok(());
        };
        let (dst_key, dst_elem) = (*dst_key, *dst_elem);
        let source_expr = self.deref(src);
        let ty = self.type_expr(target);
        self.out
            .line(format!("{into} = make({ty}, len({source_expr}))"));

        let n = self.next_id();
        let (k, item) = (format!("key{n}"), format!("elem{n}"));
        self.out
            .open(format!("for {k}, {item} := range {source_expr} {{"));
        self.rebind_loop_value(&item, src_elem, dst_elem);

        let plain_key =
            matches!(key, MatchDescription::Direct) && u.is_pointer(src_key) == u.is_pointer(dst_key);
        let key_expr = if plain_key {
            k.clone()
        } else {
            let converted = format!("mkey{n}");
            let key_ty = self.type_expr(dst_key);
            self.out.line(format!("var {converted} {key_ty}"));
            self.convert_value(
                &Slot::new(converted.clone(), dst_key),
                &Slot::new(k.clone(), src_key),
                key,
                &ctx.element("map key", &k),
                true,
            )?;
            converted
        };

        self.convert_value(
            &Slot::new(format!("{into}[{key_expr}]"), dst_elem),
            &Slot::new(item, src_elem),
            elem,
            &ctx.element("map value", &k),
            true,
        )?;
        self.out.close();

        if u.is_pointer(dst.ty) {
            self.out.line(format!("{} = &{into}", dst.expr));
        }
        Ok(())
    }
}

fn is_zero(value: &ConstValue) -> bool {
    match value {
        ConstValue::Int(v) => *v == 0,
        ConstValue::Str(s) => s.is_empty(),
    }
}

/// Field-level context.
pub(crate) fn field_context(what: String, target_field: &str) -> Context {
    Context {
        what,
        tag: crate::naming::error_tag(target_field),
        element: None,
    }
}
