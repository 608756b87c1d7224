//! Conversion-code synthesizer.
//!
//! Turns a [`Correspondence`] into two procedures, primary to secondary and
//! back, as a flat list of indented [`Line`]s plus the imports they need.
//! Rendering the lines into a source file is left to the caller.

pub mod errors;
pub mod value;
pub mod writer;

use std::collections::BTreeSet;

use serde::Serialize;

use crate::config::GenerateRequest;
use crate::error::GenerateError;
use crate::matching::{Correspondence, UnionCorrespondence};
use crate::naming::qualifier;
use crate::types::{NamespaceId, TypeId, TypeKind, Universe};

pub use errors::ErrorStyle;
pub use writer::{Import, Line};

use value::{field_context, Context, Slot};
use writer::{Imports, Writer};

/// Identifiers the generated procedures declare themselves.
const RESERVED: &[&str] = &["x", "res", "err", "v", "ok"];

/// A synthesized conversion file, ready to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Synthesis {
    /// Package the file belongs to (the primary namespace's name).
    pub package: String,
    /// Source file declaring the primary record.
    pub source_file: String,
    pub imports: Vec<Import>,
    pub lines: Vec<Line>,
}

impl Synthesis {
    /// Procedure bodies as tab-indented text.
    pub fn body_text(&self) -> String {
        let mut text = String::new();
        for line in &self.lines {
            if !line.text.is_empty() {
                for _ in 0..line.indent {
                    text.push('\t');
                }
                text.push_str(&line.text);
            }
            text.push('\n');
        }
        text
    }
}

/// Synthesize both conversion procedures for `correspondence`.
pub fn synthesize(
    universe: &Universe,
    correspondence: &Correspondence,
    request: &GenerateRequest,
) -> Result<Synthesis, GenerateError> {
    let errors = match &request.structured_errors {
        Some(path) => structured_style(universe, path),
        None => ErrorStyle::Standard,
    };
    let mut emitter = Emitter {
        universe,
        home: correspondence.primary.namespace,
        out: Writer::new(),
        imports: Imports::new(RESERVED),
        errors,
        counter: 0,
    };

    emitter.forward(correspondence, request.method.as_deref())?;
    emitter.out.blank();
    emitter.backward(correspondence)?;

    let home = universe.namespace(correspondence.primary.namespace);
    tracing::debug!(
        primary = %correspondence.primary.name,
        temporaries = emitter.counter,
        "conversions synthesized"
    );
    Ok(Synthesis {
        package: home.name.clone(),
        source_file: correspondence.primary.position.file.clone(),
        imports: emitter.imports.into_list(),
        lines: emitter.out.into_lines(),
    })
}

/// Use the package name from the snapshot when the error package is part of
/// it.
fn structured_style(universe: &Universe, path: &str) -> ErrorStyle {
    match universe.namespace_by_path(path) {
        Some(ns) => ErrorStyle::Structured {
            path: path.to_string(),
            name: universe.namespace(ns).name.clone(),
        },
        None => ErrorStyle::structured(path),
    }
}

pub(crate) struct Emitter<'u> {
    universe: &'u Universe,
    /// Namespace the generated file lives in; its types stay unqualified.
    home: NamespaceId,
    out: Writer,
    imports: Imports,
    errors: ErrorStyle,
    counter: usize,
}

impl Emitter<'_> {
    fn next_id(&mut self) -> usize {
        self.counter += 1;
        self.counter
    }

    fn temp(&mut self, prefix: &str) -> String {
        let n = self.next_id();
        format!("{prefix}{n}")
    }

    /// Reference to `name` declared in `namespace`, importing it if needed.
    fn qualified(&mut self, namespace: NamespaceId, name: &str) -> String {
        if namespace == self.home || namespace == NamespaceId::BUILTIN {
            return name.to_string();
        }
        let ns = self.universe.namespace(namespace);
        let alias = self.imports.add(&ns.path, &ns.name);
        format!("{alias}.{name}")
    }

    /// Source spelling of a type.
    fn type_expr(&mut self, ty: TypeId) -> String {
        let u = self.universe;
        match u.kind(ty) {
            TypeKind::Basic(kind) => kind.name().to_string(),
            TypeKind::Named { namespace, name } => self.qualified(*namespace, name),
            TypeKind::Pointer(elem) => format!("*{}", self.type_expr(*elem)),
            TypeKind::Sequence(elem) => format!("[]{}", self.type_expr(*elem)),
            TypeKind::Map { key, elem } => {
                format!("map[{}]{}", self.type_expr(*key), self.type_expr(*elem))
            }
            TypeKind::Record(fields) => {
                let members: Vec<String> = fields
                    .iter()
                    .map(|f| format!("{} {}", f.name, self.type_expr(f.ty)))
                    .collect();
                format!("struct{{ {} }}", members.join("; "))
            }
            TypeKind::Interface(methods) if methods.is_empty() => "any".to_string(),
            TypeKind::Interface(_) | TypeKind::Unsupported(_) => u.display(ty).to_string(),
        }
    }

    /// Condition that holds when `expr` of type `ty` carries a value. Union
    /// binding only admits comparable types, so comparing against a
    /// composite literal is always valid.
    fn populated(&mut self, expr: &str, ty: TypeId) -> String {
        let u = self.universe;
        if u.is_nilable(ty) {
            return format!("{expr} != nil");
        }
        match u.basic_kind(ty).and_then(|k| k.zero_literal()) {
            Some(zero) => format!("{expr} != {zero}"),
            None => format!("{expr} != ({}{{}})", self.type_expr(ty)),
        }
    }

    fn fail(&mut self, err: String) {
        self.out.line(format!("return nil, {err}"));
    }

    // -- procedures ---------------------------------------------------------

    fn forward(&mut self, c: &Correspondence, method: Option<&str>) -> Result<(), GenerateError> {
        let primary = c.primary.name.clone();
        let secondary = self.type_expr(c.secondary.ty);
        let suffix = qualifier(&secondary);

        match method {
            Some(method) => {
                self.out
                    .line(format!("// {method} converts {primary} into {secondary}."));
                self.out.open(format!(
                    "func (x *{primary}) {method}() (*{secondary}, error) {{"
                ));
            }
            None => {
                let name = format!("{primary}To{suffix}");
                self.out
                    .line(format!("// {name} converts {primary} into {secondary}."));
                self.out.open(format!(
                    "func {name}(x *{primary}) (*{secondary}, error) {{"
                ));
            }
        }
        self.prologue(&secondary);

        let mut done = BTreeSet::new();
        for field in c.primary.exported_fields() {
            if let Some(union) = c.union_for_primary(&field.name) {
                if done.insert(union.secondary.name.clone()) {
                    self.union_forward(union)?;
                }
                continue;
            }
            let Some(m) = c.match_for_primary(&field.name) else {
                continue;
            };
            let Some(target) = m.secondary.as_ref().filter(|_| m.is_resolved()) else {
                continue;
            };
            self.out.blank();
            self.convert_value(
                &Slot::new(format!("res.{}", target.name), target.ty),
                &Slot::new(format!("x.{}", field.name), field.ty),
                &m.description,
                &field_context(format!("field {}", field.name), &target.name),
                true,
            )?;
        }

        if c.primary_mismatch() {
            self.manual_hook(&format!("manual{primary}To{suffix}"));
        }
        self.epilogue();
        Ok(())
    }

    fn backward(&mut self, c: &Correspondence) -> Result<(), GenerateError> {
        let primary = c.primary.name.clone();
        let secondary = self.type_expr(c.secondary.ty);
        let name = format!("{}To{primary}", qualifier(&secondary));

        self.out
            .line(format!("// {name} converts {secondary} into {primary}."));
        self.out.open(format!(
            "func {name}(x *{secondary}) (*{primary}, error) {{"
        ));
        self.prologue(&primary);

        for field in c.secondary.fields.iter() {
            if let Some(union) = c.union_for_secondary(&field.name) {
                self.union_backward(union)?;
                continue;
            }
            let Some(m) = c.match_for_secondary(&field.name) else {
                continue;
            };
            self.out.blank();
            self.convert_value(
                &Slot::new(format!("res.{}", m.primary.name), m.primary.ty),
                &Slot::new(format!("x.{}", field.name), field.ty),
                &m.description.reversed(),
                &field_context(format!("field {}", field.name), &m.primary.name),
                true,
            )?;
        }

        if c.secondary_mismatch() {
            self.manual_hook(&format!("manual{}To{primary}", qualifier(&secondary)));
        }
        self.epilogue();
        Ok(())
    }

    fn prologue(&mut self, result_type: &str) {
        self.out.open("if x == nil {");
        self.out.line("return nil, nil");
        self.out.close();
        self.out.blank();
        self.out.line(format!("var res {result_type}"));
    }

    fn epilogue(&mut self) {
        self.out.blank();
        self.out.line("return &res, nil");
        self.out.close();
    }

    fn manual_hook(&mut self, hook: &str) {
        self.out.blank();
        self.out
            .line("// Some fields are not converted automatically, finish them by hand.");
        self.out
            .open(format!("if err := {hook}(x, &res); err != nil {{"));
        let err = self
            .errors
            .wrap(&mut self.imports, "err", "run user defined conversion");
        self.fail(err);
        self.out.close();
    }

    // -- unions -------------------------------------------------------------

    /// Populated primary selectors pick the union branch; at most one may be
    /// populated.
    fn union_forward(&mut self, union: &UnionCorrespondence) -> Result<(), GenerateError> {
        let field = &union.secondary.name;
        let selectors: Vec<_> = union
            .branches
            .iter()
            .map(|b| (format!("x.{}", b.primary.name), b.primary.ty))
            .collect();

        self.out.blank();
        if selectors.len() > 1 {
            self.out.open("switch {");
            for (i, (left, left_ty)) in selectors.iter().enumerate() {
                for (right, right_ty) in &selectors[i + 1..] {
                    let condition = format!(
                        "{} && {}",
                        self.populated(left, *left_ty),
                        self.populated(right, *right_ty)
                    );
                    self.out.case(format!("case {condition}:"));
                    let message = format!(
                        "fields {} and {} refer to respective branches of union {field} and must not coexist",
                        trim_receiver(left),
                        trim_receiver(right)
                    );
                    let err = self.errors.plain(&mut self.imports, &message);
                    self.fail(err);
                }
            }
            self.out.close();
            self.out.blank();
        }

        self.out.open("switch {");
        for (branch, (selector, ty)) in union.branches.iter().zip(&selectors) {
            let condition = self.populated(selector, *ty);
            self.out.case(format!("case {condition}:"));
            let variable = self.temp("branch");
            let branch_type = self.type_expr(branch.ty);
            self.out.line(format!("var {variable} {branch_type}"));
            self.convert_value(
                &Slot::new(format!("{variable}.{}", branch.payload.name), branch.payload.ty),
                &Slot::new(selector.clone(), *ty),
                &branch.description,
                &field_context(
                    format!("field {} into union {field}", branch.primary.name),
                    &branch.payload.name,
                ),
                false,
            )?;
            self.out.line(format!("res.{field} = &{variable}"));
        }
        self.out.close();
        Ok(())
    }

    /// The populated branch of the union selects the primary field.
    fn union_backward(&mut self, union: &UnionCorrespondence) -> Result<(), GenerateError> {
        let field = &union.secondary.name;
        self.out.blank();
        self.out
            .open(format!("switch v := x.{field}.(type) {{"));
        for branch in &union.branches {
            let branch_type = self.type_expr(branch.ty);
            self.out.case(format!("case *{branch_type}:"));
            self.convert_value(
                &Slot::new(format!("res.{}", branch.primary.name), branch.primary.ty),
                &Slot::new(format!("v.{}", branch.payload.name), branch.payload.ty),
                &branch.description.reversed(),
                &field_context(
                    format!("branch {} of union {field}", branch.type_name),
                    &branch.primary.name,
                ),
                true,
            )?;
        }
        self.out.close();
        Ok(())
    }
}

fn trim_receiver(selector: &str) -> &str {
    selector.strip_prefix("x.").unwrap_or(selector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::matching::match_records;
    use crate::resolver::Resolver;
    use crate::schema::SchemaRef;
    use serde_json::{json, Value};

    fn synthesize_for(snapshot: Value, request: &GenerateRequest) -> Synthesis {
        let u = Universe::from_value(snapshot).unwrap();
        let primary = u.record(&request.primary).unwrap();
        let secondary = u.record(&request.secondary).unwrap();
        let mut resolver = Resolver::new(&u);
        let mut diagnostics = Diagnostics::new();
        let c = match_records(&mut resolver, &primary, &secondary, request, &mut diagnostics)
            .unwrap();
        synthesize(&u, &c, request).unwrap()
    }

    fn request() -> GenerateRequest {
        GenerateRequest::new(
            SchemaRef::new("example.com/app", "User"),
            SchemaRef::new("example.com/app/pb", "User"),
        )
    }

    fn users(primary: Value, secondary: Value) -> Value {
        json!({
            "namespaces": [
                {"path": "example.com/app", "types": [
                    {"name": "User", "file": "app/user.go", "line": 3, "fields": primary}
                ]},
                {"path": "example.com/app/pb", "types": [
                    {"name": "User", "fields": secondary}
                ]}
            ]
        })
    }

    #[test]
    fn test_identical_records() {
        let s = synthesize_for(
            users(
                json!([{"name": "ID", "type": "int64"}, {"name": "Tags", "type": "[]string"}]),
                json!([{"name": "Id", "type": "int64"}, {"name": "Tags", "type": "[]string"}]),
            ),
            &request(),
        );
        let body = s.body_text();

        assert_eq!(s.package, "app");
        assert_eq!(s.source_file, "app/user.go");
        assert_eq!(s.imports.len(), 1);
        assert_eq!(s.imports[0].path, "example.com/app/pb");
        assert!(body.contains("func UserToPbUser(x *User) (*pb.User, error) {"));
        assert!(body.contains("func PbUserToUser(x *pb.User) (*User, error) {"));
        assert!(body.contains("\tres.Id = x.ID\n"));
        assert!(body.contains("\tif x.Tags != nil {\n\t\tres.Tags = x.Tags\n\t}\n"));
        assert!(!body.contains("manual"));
    }

    #[test]
    fn test_method_name_and_zero_elision() {
        let mut request = request();
        request.method = Some("Proto".into());
        let s = synthesize_for(
            users(
                json!([{"name": "Age", "type": "int32"}, {"name": "Name", "type": "string"}]),
                json!([{"name": "Age", "type": "*int32"}, {"name": "Name", "type": "*string"}]),
            ),
            &request,
        );
        let body = s.body_text();

        assert!(body.contains("func (x *User) Proto() (*pb.User, error) {"));
        assert!(body.contains("\tif x.Age != 0 {\n\t\tres.Age = &x.Age\n\t}\n"));
        assert!(body.contains("\tif x.Name != \"\" {\n\t\tres.Name = &x.Name\n\t}\n"));
        assert!(body.contains("\tif x.Age != nil {\n\t\tres.Age = *x.Age\n\t}\n"));
    }

    #[test]
    fn test_unmatched_fields_call_manual_hooks() {
        let s = synthesize_for(
            users(
                json!([{"name": "Name", "type": "string"}, {"name": "Nick", "type": "string"}]),
                json!([{"name": "Name", "type": "string"}]),
            ),
            &request(),
        );
        let body = s.body_text();

        assert!(body.contains("if err := manualUserToPbUser(x, &res); err != nil {"));
        assert!(body.contains(r#"return nil, fmt.Errorf("run user defined conversion: %w", err)"#));
        assert!(!body.contains("manualPbUserToUser"), "every secondary field is covered");
        assert!(s.imports.iter().any(|i| i.path == "fmt"));
    }

    #[test]
    fn test_nested_containers_use_distinct_temporaries() {
        let s = synthesize_for(
            users(
                json!([{"name": "Scores", "type": "map[string][]int32"}]),
                json!([{"name": "Scores", "type": "map[string][]int64"}]),
            ),
            &request(),
        );
        let body = s.body_text();

        assert!(body.contains("res.Scores = make(map[string][]int64, len(x.Scores))"));
        assert!(body.contains("for key1, elem1 := range x.Scores {"));
        assert!(body.contains("res.Scores[key1] = make([]int64, len(elem1))"));
        assert!(body.contains("for i2, elem2 := range elem1 {"));
        assert!(body.contains("res.Scores[key1][i2] = int64(elem2)"));
    }

    #[test]
    fn test_structured_errors_are_tagged() {
        let mut request = request();
        request.structured_errors = Some("example.com/lib/errs".into());
        let s = synthesize_for(
            json!({
                "namespaces": [
                    {"path": "example.com/app", "types": [
                        {"name": "Kind", "underlying": "int"},
                        {"name": "User", "file": "app/user.go", "fields": [{"name": "Kind", "type": "Kind"}]}
                    ], "constants": [
                        {"name": "KindUnknown", "type": "Kind", "value": 0},
                        {"name": "KindAdmin", "type": "Kind", "value": 1}
                    ]},
                    {"path": "example.com/app/pb", "types": [
                        {"name": "Role", "underlying": "int32"},
                        {"name": "User", "fields": [{"name": "Kind", "type": "Role"}]}
                    ], "constants": [
                        {"name": "Role_UNKNOWN", "type": "Role", "value": 0},
                        {"name": "Role_ADMIN", "type": "Role", "value": 1}
                    ]}
                ]
            }),
            &request,
        );
        let body = s.body_text();

        assert!(body.contains("\tswitch x.Kind {\n\tcase KindUnknown:\n\t\tres.Kind = pb.Role_UNKNOWN\n"));
        assert!(body.contains(
            r#"return nil, errs.Newf("unknown value %v of field Kind", x.Kind).Any("invalid-kind", x.Kind)"#
        ));
        let paths: Vec<_> = s.imports.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["example.com/app/pb", "example.com/lib/errs"]);
    }
}
