//! Canonical signature strings for declarations
//!
//! Scheme: `<Kind>:<Type path>.<Member><parameter types>`, with kinds
//! `T` (type), `M` (method, constructor, operator), `P` (property, indexer),
//! `E` (event) and `F` (field, enum member). Namespaces are not part of the
//! path; nested types are joined with `.` and carry their type parameters
//! as `<T1, T2>`. Parameter lists contain only modifiers and types.

use super::syntax::{Declaration, Parameter, TypeDeclaration};

/// Render signatures for `declarations` and everything nested in them
///
/// Output is in declaration order and may contain duplicates.
pub fn signatures(declarations: &[Declaration]) -> Vec<String> {
    let mut writer = SignatureWriter::default();
    for declaration in declarations {
        writer.visit(declaration);
    }
    writer.signatures
}

#[derive(Default)]
struct SignatureWriter {
    type_stack: Vec<String>,
    signatures: Vec<String>,
}

impl SignatureWriter {
    fn visit(&mut self, declaration: &Declaration) {
        match declaration {
            Declaration::Type(t) => self.visit_type(t),
            Declaration::Method {
                name,
                type_parameters,
                parameters,
            } => {
                let generics = render_type_parameters(type_parameters);
                let parameters = render_parameters(parameters);
                self.emit_member("M", &format!("{}{}({})", name, generics, parameters));
            }
            Declaration::Constructor { name, parameters } => {
                self.emit_member("M", &format!("{}({})", name, render_parameters(parameters)));
            }
            Declaration::Destructor { name } => self.emit_member("M", &format!("~{}()", name)),
            Declaration::Operator { token, parameters } => {
                self.emit_member("M", &format!("{}({})", token, render_parameters(parameters)));
            }
            Declaration::Conversion {
                keyword,
                parameters,
            } => {
                self.emit_member(
                    "M",
                    &format!("{}({})", keyword, render_parameters(parameters)),
                );
            }
            Declaration::Property { name } => self.emit_member("P", name),
            Declaration::Indexer { parameters } => {
                let signature = format!("P:{}[{}]", self.path(), render_parameters(parameters));
                self.signatures.push(signature);
            }
            Declaration::Event { name } => self.emit_member("E", name),
            Declaration::Field { name } | Declaration::EnumMember { name } => {
                self.emit_member("F", name)
            }
        }
    }

    fn visit_type(&mut self, declaration: &TypeDeclaration) {
        self.type_stack.push(format!(
            "{}{}",
            declaration.name,
            render_type_parameters(&declaration.type_parameters)
        ));

        let mut signature = format!("T:{}", self.path());
        if let Some(parameters) = &declaration.parameters {
            signature.push('(');
            signature.push_str(&render_parameters(parameters));
            signature.push(')');
        }
        self.signatures.push(signature);

        for member in &declaration.members {
            self.visit(member);
        }

        self.type_stack.pop();
    }

    fn path(&self) -> String {
        self.type_stack.join(".")
    }

    fn emit_member(&mut self, kind: &str, member: &str) {
        let signature = if self.type_stack.is_empty() {
            format!("{}:{}", kind, member)
        } else {
            format!("{}:{}.{}", kind, self.path(), member)
        };
        self.signatures.push(signature);
    }
}

fn render_type_parameters(names: &[String]) -> String {
    if names.is_empty() {
        String::new()
    } else {
        format!("<{}>", names.join(", "))
    }
}

fn render_parameters(parameters: &[Parameter]) -> String {
    parameters
        .iter()
        .map(render_parameter)
        .collect::<Vec<_>>()
        .join(",")
}

fn render_parameter(parameter: &Parameter) -> String {
    let ty = parameter.ty.as_deref().unwrap_or("?");
    if parameter.modifiers.is_empty() {
        ty.to_string()
    } else {
        format!("{} {}", parameter.modifiers.join(" "), ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::syntax::{CSharpParser, DeclarationParser};

    fn sigs(source: &str) -> Vec<String> {
        signatures(&CSharpParser.parse(source))
    }

    #[test]
    fn test_method_in_class() {
        assert_eq!(
            sigs("class C { public int Foo(string a) { } }"),
            vec!["T:C", "M:C.Foo(string)"]
        );
    }

    #[test]
    fn test_nested_generic_path() {
        assert_eq!(
            sigs("public class Outer<TKey, TValue> { public class Inner<T> { public T Value; public void Set<U>(ref T value, params U[] rest); } }"),
            vec![
                "T:Outer<TKey, TValue>",
                "T:Outer<TKey, TValue>.Inner<T>",
                "F:Outer<TKey, TValue>.Inner<T>.Value",
                "M:Outer<TKey, TValue>.Inner<T>.Set<U>(ref T,params U[])",
            ]
        );
    }

    #[test]
    fn test_member_kinds() {
        let signatures = sigs(
            "public struct S {\n\
               public S(int x) { }\n\
               ~S() { }\n\
               public static S operator -(S a) => a;\n\
               public static explicit operator long(S s) => 0;\n\
               public int Length { get; }\n\
               public int this[int i, Range r] => 0;\n\
               public event Action Changed;\n\
             }\n\
             public enum E { A, B }\n\
             public delegate void D(int x, out string y);",
        );
        assert_eq!(
            signatures,
            vec![
                "T:S",
                "M:S.S(int)",
                "M:S.~S()",
                "M:S.-(S)",
                "M:S.explicit(S)",
                "P:S.Length",
                "P:S[int,Range]",
                "E:S.Changed",
                "T:E",
                "F:E.A",
                "F:E.B",
                "T:D(int,out string)",
            ]
        );
    }

    #[test]
    fn test_untyped_parameter_renders_placeholder() {
        assert_eq!(
            sigs("class C { public void Log(string format, __arglist); }"),
            vec!["T:C", "M:C.Log(string,?)"]
        );
    }

    #[test]
    fn test_top_level_member() {
        assert_eq!(sigs("public static void Run(this Span<byte> s);"), vec!["M:Run(this Span<byte>)"]);
    }

    #[test]
    fn test_parameter_names_do_not_matter() {
        assert_eq!(
            sigs("class C { void M(int first, string second); }"),
            sigs("class C { void M(int a, string b); }")
        );
    }
}
