//! API surface extraction from review notes
//!
//! Fenced code blocks tagged as C# are parsed into declarations and
//! rendered as canonical signatures (see [`signature`]). Blocks in any other
//! language are only recorded by name.

mod lexer;
mod signature;
mod syntax;

use std::collections::BTreeSet;

pub use signature::signatures;
pub use syntax::{CSharpParser, Declaration, DeclarationParser, Parameter, TypeDeclaration, TypeKind};

/// Language tags accepted as C#
const CSHARP_TAGS: &[&str] = &["cs", "c#", "csharp"];

/// Whether a code block language tag denotes C#
pub fn is_csharp(language: &str) -> bool {
    CSHARP_TAGS
        .iter()
        .any(|tag| language.eq_ignore_ascii_case(tag))
}

/// Fenced code block found in Markdown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// First word of the info string; empty if there is none
    pub language: String,
    pub code: String,
}

/// Collect fenced code blocks (backtick or tilde fences) from Markdown
///
/// Fences are accepted at any indentation so that blocks nested in list
/// items are found; content lines lose up to as much leading whitespace as
/// the opening fence had. An unclosed fence runs to the end of the document.
pub fn fenced_code_blocks(markdown: &str) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();
    let mut lines = markdown.lines();

    while let Some(line) = lines.next() {
        let Some(fence) = Fence::open(line) else {
            continue;
        };

        let mut code_lines = Vec::new();
        for line in lines.by_ref() {
            if fence.closes(line) {
                break;
            }
            code_lines.push(strip_indent(line, fence.indent));
        }

        blocks.push(CodeBlock {
            language: fence.language,
            code: code_lines.join("\n"),
        });
    }

    blocks
}

struct Fence {
    marker: char,
    length: usize,
    indent: usize,
    language: String,
}

impl Fence {
    fn open(line: &str) -> Option<Self> {
        let trimmed = line.trim_start();
        let indent = line.chars().take_while(|c| c.is_whitespace()).count();
        let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
        let length = trimmed.chars().take_while(|c| *c == marker).count();
        if length < 3 {
            return None;
        }

        let info = trimmed[length..].trim();
        if marker == '`' && info.contains('`') {
            return None;
        }

        Some(Self {
            marker,
            length,
            indent,
            language: info.split_whitespace().next().unwrap_or_default().to_string(),
        })
    }

    fn closes(&self, line: &str) -> bool {
        let trimmed = line.trim();
        let run = trimmed.chars().take_while(|c| *c == self.marker).count();
        run >= self.length && run == trimmed.chars().count()
    }
}

/// Drop up to `indent` leading whitespace chars
fn strip_indent(line: &str, indent: usize) -> &str {
    let start = line
        .char_indices()
        .take_while(|(_, c)| c.is_whitespace())
        .take(indent)
        .last()
        .map_or(0, |(i, c)| i + c.len_utf8());
    &line[start..]
}

/// Result of scanning one item's description
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiScan {
    /// Unique signatures in lexicographic order
    pub apis: Vec<String>,
    /// Languages of code blocks that were not parsed
    pub other_languages: BTreeSet<String>,
}

/// Extracts API signatures from Markdown using a declaration parser
#[derive(Debug, Clone, Default)]
pub struct ApiExtractor<P = CSharpParser> {
    parser: P,
}

impl<P: DeclarationParser> ApiExtractor<P> {
    pub fn new(parser: P) -> Self {
        Self { parser }
    }

    pub fn scan(&self, markdown: &str) -> ApiScan {
        let mut apis = BTreeSet::new();
        let mut other_languages = BTreeSet::new();

        // TODO: index `diff` blocks by parsing their added lines
        for block in fenced_code_blocks(markdown) {
            if block.language.is_empty() {
                continue;
            }
            if !is_csharp(&block.language) {
                other_languages.insert(block.language.to_ascii_lowercase());
                continue;
            }

            let declarations = self.parser.parse(&block.code);
            apis.extend(signatures(&declarations));
        }

        ApiScan {
            apis: apis.into_iter().collect(),
            other_languages,
        }
    }
}

/// Scan Markdown with the C# parser
pub fn scan_markdown(markdown: &str) -> ApiScan {
    ApiExtractor::<CSharpParser>::default().scan(markdown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_aliases() {
        assert!(is_csharp("cs"));
        assert!(is_csharp("C#"));
        assert!(is_csharp("CSharp"));
        assert!(!is_csharp("fsharp"));
    }

    #[test]
    fn test_fenced_blocks() {
        let markdown = "text\n\n```C# title\nclass A { }\n```\n\n~~~~json\n{ }\n~~~~\n";
        let blocks = fenced_code_blocks(markdown);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].language, "C#");
        assert_eq!(blocks[0].code, "class A { }");
        assert_eq!(blocks[1].language, "json");
    }

    #[test]
    fn test_nested_fence_in_list_item() {
        let markdown = "* Item\n    ```cs\n    class A { }\n      int x;\n    ```\n";
        let blocks = fenced_code_blocks(markdown);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].code, "class A { }\n  int x;");
    }

    #[test]
    fn test_unclosed_fence() {
        let blocks = fenced_code_blocks("```cs\nclass A { }");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].code, "class A { }");
    }

    #[test]
    fn test_multibyte_indent_is_stripped_by_char() {
        let markdown = " ```cs\n\u{00A0}class A { }\n\u{3000}\u{3000}class B { }\n ```\n";
        let blocks = fenced_code_blocks(markdown);
        assert_eq!(blocks[0].code, "class A { }\n\u{3000}class B { }");
        assert_eq!(scan_markdown(markdown).apis, vec!["T:A", "T:B"]);
    }

    #[test]
    fn test_shorter_fence_does_not_close() {
        let blocks = fenced_code_blocks("````cs\n```\nclass A { }\n````");
        assert_eq!(blocks[0].code, "```\nclass A { }");
    }

    #[test]
    fn test_scan_dedupes_and_sorts() {
        let markdown = "```cs\nclass B { void Z(); }\n```\n\n```csharp\nclass A { }\nclass B { void Z(); }\n```\n";
        let scan = scan_markdown(markdown);
        assert_eq!(scan.apis, vec!["M:B.Z()", "T:A", "T:B"]);
    }

    #[test]
    fn test_scan_is_order_independent() {
        let first = scan_markdown("```cs\nclass C { int A; void B(int x); }\n```");
        let second = scan_markdown("```cs\nclass C { void B(int y); int A; }\n```");
        assert_eq!(first, second);
    }

    #[test]
    fn test_other_languages_are_recorded_not_parsed() {
        let scan = scan_markdown("```F#\ntype C() = class end\n```\n\n```\nplain\n```");
        assert!(scan.apis.is_empty());
        assert_eq!(scan.other_languages.into_iter().collect::<Vec<_>>(), vec!["f#"]);
    }

    struct FixedParser;

    impl DeclarationParser for FixedParser {
        fn parse(&self, _source: &str) -> Vec<Declaration> {
            vec![Declaration::Field {
                name: "Stub".to_string(),
            }]
        }
    }

    #[test]
    fn test_custom_parser() {
        let scan = ApiExtractor::new(FixedParser).scan("```cs\nanything\n```");
        assert_eq!(scan.apis, vec!["F:Stub"]);
    }
}
