//! Declaration-level parser for C# code blocks
//!
//! Review notes contain API sketches, not compilable programs: members are
//! written without bodies, code is elided with `...`, and usage samples are
//! mixed in with declarations. The parser therefore only understands the
//! declaration skeleton (namespaces, types, members, parameter lists) and
//! skips everything else. Any construct it can't make sense of is dropped up
//! to the next `;`, balanced `{ }` block or access modifier, and parsing
//! resumes from there.

use super::lexer::{tokenize, Token};

/// Kind of a type declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Struct,
    Interface,
    Enum,
    Record,
    Delegate,
}

/// Parameter of a method, constructor, indexer or delegate
///
/// Parameter names are not kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// `ref`, `out`, `in`, `params`, `this`, ...
    pub modifiers: Vec<String>,
    /// Parameter type; `None` when the parameter has no parsable type
    pub ty: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDeclaration {
    pub kind: TypeKind,
    pub name: String,
    pub type_parameters: Vec<String>,
    /// Delegate parameter list
    pub parameters: Option<Vec<Parameter>>,
    pub members: Vec<Declaration>,
}

/// A declaration found in a code block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Declaration {
    Type(TypeDeclaration),
    Method {
        name: String,
        type_parameters: Vec<String>,
        parameters: Vec<Parameter>,
    },
    Constructor {
        name: String,
        parameters: Vec<Parameter>,
    },
    Destructor {
        name: String,
    },
    Operator {
        token: String,
        parameters: Vec<Parameter>,
    },
    Conversion {
        keyword: String,
        parameters: Vec<Parameter>,
    },
    Property {
        name: String,
    },
    Indexer {
        parameters: Vec<Parameter>,
    },
    Event {
        name: String,
    },
    Field {
        name: String,
    },
    EnumMember {
        name: String,
    },
}

/// Parses a source fragment into declarations
///
/// Implementations must not fail: malformed input yields whatever
/// declarations could be recognized.
pub trait DeclarationParser: Send + Sync {
    fn parse(&self, source: &str) -> Vec<Declaration>;
}

/// Parser for C# declaration skeletons
#[derive(Debug, Clone, Copy, Default)]
pub struct CSharpParser;

impl DeclarationParser for CSharpParser {
    fn parse(&self, source: &str) -> Vec<Declaration> {
        Parser::new(tokenize(source)).parse_compilation_unit()
    }
}

const MODIFIERS: &[&str] = &[
    "public",
    "protected",
    "internal",
    "private",
    "static",
    "abstract",
    "virtual",
    "override",
    "sealed",
    "readonly",
    "const",
    "new",
    "extern",
    "unsafe",
    "volatile",
    "async",
    "partial",
    "required",
    "file",
    "ref",
    "fixed",
];

const ACCESS_MODIFIERS: &[&str] = &["public", "protected", "internal", "private"];

/// Modifiers that can also start a statement (`new Foo();`, `const int x = 1;`)
const STATEMENT_MODIFIERS: &[&str] = &["new", "ref", "const", "async", "unsafe", "fixed"];

const PARAMETER_MODIFIERS: &[&str] = &["ref", "out", "in", "params", "this", "scoped", "readonly"];

/// Words that can never start or name a type
const RESERVED: &[&str] = &[
    "class",
    "struct",
    "interface",
    "enum",
    "record",
    "delegate",
    "event",
    "namespace",
    "using",
    "operator",
    "implicit",
    "explicit",
    "this",
    "return",
    "new",
    "where",
];

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn at_punct(&self, c: char) -> bool {
        self.peek(0).is_some_and(|t| t.is_punct(c))
    }

    fn at_word(&self, word: &str) -> bool {
        self.peek(0).is_some_and(|t| t.is_word(word))
    }

    /// `=>` written without a space between the characters
    fn at_arrow(&self) -> bool {
        self.at_punct('=') && self.peek(1).is_some_and(|t| t.is_punct('>') && !t.spaced)
    }

    fn at_access_modifier(&self) -> bool {
        self.peek(0)
            .and_then(Token::word)
            .is_some_and(|w| ACCESS_MODIFIERS.contains(&w))
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if self.at_punct(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume an identifier that isn't a structural keyword
    fn identifier(&mut self) -> Option<String> {
        let word = self.peek(0)?.word()?;
        if RESERVED.contains(&word) {
            return None;
        }
        let word = word.to_string();
        self.pos += 1;
        Some(word)
    }

    fn parse_compilation_unit(mut self) -> Vec<Declaration> {
        let mut declarations = Vec::new();
        while !self.at_end() {
            if self.eat_punct('}') {
                continue;
            }
            self.parse_member_into(false, &mut declarations);
        }
        declarations
    }

    /// Parse members up to and including the closing `}` of a block
    fn parse_block_members(&mut self, in_type: bool) -> Vec<Declaration> {
        let mut declarations = Vec::new();
        while !self.at_end() {
            if self.eat_punct('}') {
                break;
            }
            self.parse_member_into(in_type, &mut declarations);
        }
        declarations
    }

    fn parse_member_into(&mut self, in_type: bool, out: &mut Vec<Declaration>) {
        if self.eat_punct(';') {
            return;
        }

        let start = self.pos;
        match self.parse_member(in_type) {
            Some(declarations) => out.extend(declarations),
            None => {
                self.pos = start;
                self.recover();
            }
        }

        if self.pos == start {
            self.pos += 1;
        }
    }

    /// Skip a construct that isn't a recognizable declaration
    fn recover(&mut self) {
        let start = self.pos;
        while let Some(token) = self.peek(0) {
            if token.is_punct(';') {
                self.pos += 1;
                return;
            }
            if token.is_punct('}') {
                return;
            }
            if token.is_punct('{') {
                self.skip_balanced('{', '}');
                return;
            }
            if self.pos > start && self.at_access_modifier() {
                return;
            }
            if token.is_punct('(') {
                self.skip_balanced('(', ')');
            } else if token.is_punct('[') {
                self.skip_balanced('[', ']');
            } else {
                self.pos += 1;
            }
        }
    }

    /// Skip from an opening delimiter to its matching close, inclusive
    fn skip_balanced(&mut self, open: char, close: char) {
        let mut depth = 0usize;
        while let Some(token) = self.peek(0) {
            if token.is_punct(open) {
                depth += 1;
            } else if token.is_punct(close) {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    self.pos += 1;
                    return;
                }
            }
            self.pos += 1;
        }
    }

    /// Advance to the first of `stops` outside nested brackets, without
    /// consuming it
    fn skip_until(&mut self, stops: &[char]) {
        let mut depth = 0usize;
        while let Some(token) = self.peek(0) {
            if depth == 0 && stops.iter().any(|&c| token.is_punct(c)) {
                return;
            }
            if token.is_punct('(') || token.is_punct('[') || token.is_punct('{') {
                depth += 1;
            } else if token.is_punct(')') || token.is_punct(']') || token.is_punct('}') {
                if depth == 0 {
                    return;
                }
                depth -= 1;
            }
            self.pos += 1;
        }
    }

    /// Skip a member body: constraints, initializers, `{ ... }`, `=> ...;` or `;`
    fn skip_body(&mut self) {
        while let Some(token) = self.peek(0) {
            if token.is_punct(';') {
                self.pos += 1;
                return;
            }
            if token.is_punct('}') || self.at_access_modifier() {
                return;
            }
            if token.is_punct('{') {
                self.skip_balanced('{', '}');
                return;
            }
            if self.at_arrow() {
                self.skip_until(&[';']);
                self.eat_punct(';');
                return;
            }
            if token.is_punct('(') {
                self.skip_balanced('(', ')');
            } else {
                self.pos += 1;
            }
        }
    }

    fn skip_attributes(&mut self) {
        while self.at_punct('[') {
            self.skip_balanced('[', ']');
        }
    }

    fn parse_member(&mut self, in_type: bool) -> Option<Vec<Declaration>> {
        self.skip_attributes();

        let mut modifiers = 0;
        while let Some(word) = self.peek(0).and_then(Token::word) {
            if word == "extern" && self.peek(1).is_some_and(|t| t.is_word("alias")) {
                self.skip_until(&[';']);
                return Some(Vec::new());
            }
            if !MODIFIERS.contains(&word) {
                break;
            }
            if !STATEMENT_MODIFIERS.contains(&word) {
                modifiers += 1;
            }
            self.pos += 1;
        }

        match self.peek(0)?.word() {
            Some("namespace") => return self.parse_namespace(),
            Some("using") => {
                self.skip_until(&[';']);
                return Some(Vec::new());
            }
            Some("class" | "struct" | "interface" | "enum" | "record") => {
                return self.parse_type_declaration().map(|t| vec![t]);
            }
            Some("delegate") => return self.parse_delegate().map(|t| vec![t]),
            Some("event") => return self.parse_event(),
            _ => {}
        }

        // Outside of types, a member needs a modifier that no statement can start with
        if !in_type && modifiers == 0 {
            return None;
        }

        if self.eat_punct('~') {
            let name = self.identifier()?;
            self.parse_parameters('(', ')')?;
            self.skip_body();
            return Some(vec![Declaration::Destructor { name }]);
        }

        if let Some(keyword @ ("implicit" | "explicit")) = self.peek(0).and_then(Token::word) {
            let keyword = keyword.to_string();
            if !self.peek(1).is_some_and(|t| t.is_word("operator")) {
                return None;
            }
            self.pos += 2;
            self.parse_type()?;
            let parameters = self.parse_parameters('(', ')')?;
            self.skip_body();
            return Some(vec![Declaration::Conversion {
                keyword,
                parameters,
            }]);
        }

        let ty = self.parse_type()?;

        if self.at_punct('(') {
            if !is_simple_name(&ty) {
                return None;
            }
            let parameters = self.parse_parameters('(', ')')?;
            self.skip_body();
            return Some(vec![Declaration::Constructor {
                name: ty,
                parameters,
            }]);
        }

        if self.at_word("operator") {
            self.pos += 1;
            let token = self.parse_operator_token()?;
            let parameters = self.parse_parameters('(', ')')?;
            self.skip_body();
            return Some(vec![Declaration::Operator { token, parameters }]);
        }

        if self.at_word("this") && self.peek(1).is_some_and(|t| t.is_punct('[')) {
            self.pos += 1;
            return self.parse_indexer();
        }

        let (name, generic_arguments) = self.parse_member_name()?;

        if name == "this" && self.at_punct('[') {
            return self.parse_indexer();
        }

        if self.at_punct('(') {
            let parameters = self.parse_parameters('(', ')')?;
            self.skip_body();
            return Some(vec![Declaration::Method {
                name,
                type_parameters: generic_arguments,
                parameters,
            }]);
        }

        if self.at_punct('{') {
            self.skip_balanced('{', '}');
            if self.eat_punct('=') {
                self.skip_until(&[';']);
                self.eat_punct(';');
            }
            return Some(vec![Declaration::Property { name }]);
        }

        if self.at_arrow() {
            self.skip_until(&[';']);
            self.eat_punct(';');
            return Some(vec![Declaration::Property { name }]);
        }

        let names = self.parse_declarators(name)?;
        Some(
            names
                .into_iter()
                .map(|name| Declaration::Field { name })
                .collect(),
        )
    }

    fn parse_namespace(&mut self) -> Option<Vec<Declaration>> {
        self.pos += 1;
        while self
            .peek(0)
            .is_some_and(|t| t.word().is_some() || t.is_punct('.'))
        {
            self.pos += 1;
        }

        if self.eat_punct('{') {
            return Some(self.parse_block_members(false));
        }
        if self.eat_punct(';') {
            return Some(Vec::new());
        }
        None
    }

    fn parse_type_declaration(&mut self) -> Option<Declaration> {
        let keyword = self.peek(0)?.word()?.to_string();
        self.pos += 1;

        let kind = match keyword.as_str() {
            "class" => TypeKind::Class,
            "struct" => TypeKind::Struct,
            "interface" => TypeKind::Interface,
            "enum" => TypeKind::Enum,
            _ => {
                if self.at_word("class") || self.at_word("struct") {
                    self.pos += 1;
                }
                TypeKind::Record
            }
        };

        let name = self.identifier()?;
        let type_parameters = if self.at_punct('<') {
            self.parse_type_parameters()?
        } else {
            Vec::new()
        };

        let primary_constructor = if self.at_punct('(') {
            Some(self.parse_parameters('(', ')')?)
        } else {
            None
        };

        // Base list and constraints
        self.skip_until(&['{', ';']);

        let mut members = Vec::new();
        if let Some(parameters) = primary_constructor {
            members.push(Declaration::Constructor {
                name: name.clone(),
                parameters,
            });
        }

        if self.eat_punct('{') {
            if kind == TypeKind::Enum {
                members.extend(self.parse_enum_members());
            } else {
                members.extend(self.parse_block_members(true));
            }
        }
        self.eat_punct(';');

        Some(Declaration::Type(TypeDeclaration {
            kind,
            name,
            type_parameters,
            parameters: None,
            members,
        }))
    }

    fn parse_enum_members(&mut self) -> Vec<Declaration> {
        let mut members = Vec::new();
        while !self.at_end() {
            if self.eat_punct('}') {
                break;
            }
            self.skip_attributes();
            match self.identifier() {
                Some(name) => {
                    members.push(Declaration::EnumMember { name });
                    if self.eat_punct('=') {
                        self.skip_until(&[',', '}']);
                    }
                }
                None => {
                    if !self.at_punct('}') {
                        self.pos += 1;
                    }
                }
            }
            self.eat_punct(',');
        }
        members
    }

    fn parse_delegate(&mut self) -> Option<Declaration> {
        self.pos += 1;
        self.parse_type()?;
        let name = self.identifier()?;
        let type_parameters = if self.at_punct('<') {
            self.parse_type_parameters()?
        } else {
            Vec::new()
        };
        let parameters = self.parse_parameters('(', ')')?;
        self.skip_body();

        Some(Declaration::Type(TypeDeclaration {
            kind: TypeKind::Delegate,
            name,
            type_parameters,
            parameters: Some(parameters),
            members: Vec::new(),
        }))
    }

    fn parse_event(&mut self) -> Option<Vec<Declaration>> {
        self.pos += 1;
        self.parse_type()?;
        let (name, _) = self.parse_member_name()?;

        if self.at_punct('{') {
            self.skip_balanced('{', '}');
            return Some(vec![Declaration::Event { name }]);
        }

        let names = self.parse_declarators(name)?;
        Some(
            names
                .into_iter()
                .map(|name| Declaration::Event { name })
                .collect(),
        )
    }

    fn parse_indexer(&mut self) -> Option<Vec<Declaration>> {
        let parameters = self.parse_parameters('[', ']')?;
        if self.at_punct('{') {
            self.skip_balanced('{', '}');
        } else {
            self.skip_body();
        }
        Some(vec![Declaration::Indexer { parameters }])
    }

    /// Parse `first [= init] {, name [= init]} ;`
    fn parse_declarators(&mut self, first: String) -> Option<Vec<String>> {
        let mut names = vec![first];
        loop {
            if self.eat_punct('=') {
                self.skip_until(&[',', ';']);
            }
            if self.eat_punct(',') {
                names.push(self.identifier()?);
                continue;
            }
            if self.eat_punct(';') || self.at_end() || self.at_punct('}') {
                return Some(names);
            }
            return None;
        }
    }

    /// Member name, possibly qualified by an explicit interface
    ///
    /// Returns the final name segment and the generic arguments written on it.
    fn parse_member_name(&mut self) -> Option<(String, Vec<String>)> {
        let mut name = self.member_name_segment()?;
        let mut arguments = Vec::new();

        loop {
            if self.at_punct('<') {
                arguments = self.parse_generic_arguments()?;
            }
            if self.at_punct('.') && self.peek(1).is_some_and(|t| t.word().is_some()) {
                self.pos += 1;
                name = self.member_name_segment()?;
                arguments.clear();
                continue;
            }
            break;
        }

        Some((name, arguments))
    }

    fn member_name_segment(&mut self) -> Option<String> {
        if self.at_word("this") {
            self.pos += 1;
            return Some("this".to_string());
        }
        self.identifier()
    }

    fn parse_operator_token(&mut self) -> Option<String> {
        if self.at_word("checked") {
            self.pos += 1;
        }

        let mut token = String::new();
        while let Some(t) = self.peek(0) {
            if t.is_punct('(') {
                break;
            }
            let is_word = t.word().is_some();
            if !token.is_empty() && (t.spaced || is_word) {
                break;
            }
            token.push_str(&t.text());
            self.pos += 1;
            if is_word {
                break;
            }
        }

        (!token.is_empty()).then_some(token)
    }

    /// Parse `<T1, in T2, ...>` on a type or delegate declaration
    fn parse_type_parameters(&mut self) -> Option<Vec<String>> {
        if !self.eat_punct('<') {
            return None;
        }
        let mut names = Vec::new();
        loop {
            self.skip_attributes();
            if self.at_word("in") || self.at_word("out") {
                self.pos += 1;
            }
            names.push(self.identifier()?);
            if self.eat_punct(',') {
                continue;
            }
            if self.eat_punct('>') {
                return Some(names);
            }
            return None;
        }
    }

    /// Parse a delimited parameter list, keeping modifiers and types
    fn parse_parameters(&mut self, open: char, close: char) -> Option<Vec<Parameter>> {
        if !self.eat_punct(open) {
            return None;
        }

        let mut parameters = Vec::new();
        if self.eat_punct(close) {
            return Some(parameters);
        }

        loop {
            self.skip_attributes();

            let mut modifiers = Vec::new();
            while let Some(word) = self.peek(0).and_then(Token::word) {
                if !PARAMETER_MODIFIERS.contains(&word) {
                    break;
                }
                modifiers.push(word.to_string());
                self.pos += 1;
            }

            let ty = if self.at_word("__arglist") {
                None
            } else {
                self.parse_type()
            };

            // Name and default value
            self.skip_until(&[',', close]);
            parameters.push(Parameter { modifiers, ty });

            if self.eat_punct(',') {
                continue;
            }
            if self.eat_punct(close) {
                return Some(parameters);
            }
            return None;
        }
    }

    /// Parse a type reference and render it in canonical spacing
    ///
    /// Restores the position and returns `None` if no type starts here.
    fn parse_type(&mut self) -> Option<String> {
        let start = self.pos;
        let ty = self.parse_type_inner();
        if ty.is_none() {
            self.pos = start;
        }
        ty
    }

    fn parse_type_inner(&mut self) -> Option<String> {
        let mut ty = if self.at_punct('(') {
            self.parse_tuple_type()?
        } else {
            self.parse_named_type()?
        };

        loop {
            if self.at_punct('?') || self.at_punct('*') {
                ty.push_str(&self.tokens[self.pos].text());
                self.pos += 1;
            } else if self.at_punct('[') && self.is_rank_specifier() {
                ty.push('[');
                self.pos += 1;
                while self.eat_punct(',') {
                    ty.push(',');
                }
                self.eat_punct(']');
                ty.push(']');
            } else {
                break;
            }
        }

        Some(ty)
    }

    fn is_rank_specifier(&self) -> bool {
        let mut offset = 1;
        while self.peek(offset).is_some_and(|t| t.is_punct(',')) {
            offset += 1;
        }
        self.peek(offset).is_some_and(|t| t.is_punct(']'))
    }

    fn parse_named_type(&mut self) -> Option<String> {
        let mut ty = self.identifier()?;

        if self.at_punct(':') && self.peek(1).is_some_and(|t| t.is_punct(':') && !t.spaced) {
            self.pos += 2;
            ty.push_str("::");
            ty.push_str(&self.identifier()?);
        }

        loop {
            if self.at_punct('<') {
                let arguments = self.parse_generic_arguments()?;
                ty.push('<');
                ty.push_str(&arguments.join(", "));
                ty.push('>');
            }
            // Stop before the member name of an explicitly implemented member
            if self.at_punct('.')
                && self.peek(1).and_then(Token::word).is_some_and(|w| !RESERVED.contains(&w))
                && !self.is_member_name_after_dot()
            {
                self.pos += 1;
                ty.push('.');
                ty.push_str(&self.identifier()?);
                continue;
            }
            break;
        }

        Some(ty)
    }

    /// Whether the word after a `.` is followed by something that only a
    /// member name can be followed by
    ///
    /// Distinguishes `IFoo.Bar(` (explicit implementation) from
    /// `System.String x` (qualified type).
    fn is_member_name_after_dot(&self) -> bool {
        let Some(next) = self.peek(2) else {
            return false;
        };
        next.is_punct('(') || next.is_punct('{') || next.is_punct(';') || next.is_punct('=')
    }

    fn parse_generic_arguments(&mut self) -> Option<Vec<String>> {
        if !self.eat_punct('<') {
            return None;
        }
        let mut arguments = Vec::new();
        loop {
            self.skip_attributes();
            let argument = if self.at_punct(',') || self.at_punct('>') {
                String::new()
            } else {
                self.parse_type()?
            };
            arguments.push(argument);
            if self.eat_punct(',') {
                continue;
            }
            if self.eat_punct('>') {
                return Some(arguments);
            }
            return None;
        }
    }

    fn parse_tuple_type(&mut self) -> Option<String> {
        if !self.eat_punct('(') {
            return None;
        }
        let mut elements = Vec::new();
        loop {
            let mut element = self.parse_type()?;
            if let Some(name) = self.peek(0).and_then(Token::word) {
                element.push(' ');
                element.push_str(name);
                self.pos += 1;
            }
            elements.push(element);
            if self.eat_punct(',') {
                continue;
            }
            if self.eat_punct(')') {
                break;
            }
            return None;
        }
        if elements.len() < 2 {
            return None;
        }
        Some(format!("({})", elements.join(", ")))
    }
}

fn is_simple_name(ty: &str) -> bool {
    ty.chars().all(|c| c == '_' || c.is_alphanumeric())
}
