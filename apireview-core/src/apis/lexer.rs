//! Tokenizer for C# source fragments
//!
//! Only the distinctions the declaration parser needs are kept: words
//! (identifiers and keywords), single punctuation characters and opaque
//! literals. Comments, preprocessor lines and whitespace are dropped, but
//! each token records whether whitespace preceded it so multi-character
//! operators (`==`, `>>`, `=>`) can be reassembled.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or keyword; a verbatim `@` prefix is removed
    Word(String),
    /// Single punctuation character
    Punct(char),
    /// String, character or numeric literal, kept verbatim
    Literal(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Whitespace or a comment separates this token from the previous one
    pub spaced: bool,
}

impl Token {
    pub fn word(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Word(w) => Some(w),
            _ => None,
        }
    }

    pub fn is_word(&self, word: &str) -> bool {
        self.word() == Some(word)
    }

    pub fn is_punct(&self, c: char) -> bool {
        self.kind == TokenKind::Punct(c)
    }

    /// Source text of the token
    pub fn text(&self) -> String {
        match &self.kind {
            TokenKind::Word(w) => w.clone(),
            TokenKind::Punct(c) => c.to_string(),
            TokenKind::Literal(l) => l.clone(),
        }
    }
}

/// Split C# source into tokens
///
/// Never fails: unterminated comments and literals run to the end of the
/// input, and characters that don't start any token become punctuation.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    tokens: Vec<Token>,
    spaced: bool,
    at_line_start: bool,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            tokens: Vec::new(),
            spaced: false,
            at_line_start: true,
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn push(&mut self, kind: TokenKind) {
        self.tokens.push(Token {
            kind,
            spaced: self.spaced,
        });
        self.spaced = false;
        self.at_line_start = false;
    }

    fn run(mut self) -> Vec<Token> {
        while let Some(c) = self.peek(0) {
            if c == '\n' {
                self.pos += 1;
                self.spaced = true;
                self.at_line_start = true;
            } else if c.is_whitespace() {
                self.pos += 1;
                self.spaced = true;
            } else if c == '#' && self.at_line_start {
                self.skip_line();
            } else if c == '/' && self.peek(1) == Some('/') {
                self.skip_line();
            } else if c == '/' && self.peek(1) == Some('*') {
                self.skip_block_comment();
            } else if c == '"' {
                self.lex_string(0);
            } else if (c == '@' || c == '$') && self.starts_string_at(1) {
                self.lex_string(1);
            } else if (c == '@' || c == '$')
                && matches!(self.peek(1), Some('@' | '$'))
                && self.starts_string_at(2)
            {
                self.lex_string(2);
            } else if c == '\'' {
                self.lex_char();
            } else if c.is_ascii_digit() {
                self.lex_number();
            } else if c == '@' && self.peek(1).is_some_and(is_ident_start) {
                self.pos += 1;
                self.lex_word();
            } else if is_ident_start(c) {
                self.lex_word();
            } else {
                self.pos += 1;
                self.push(TokenKind::Punct(c));
            }
        }

        self.tokens
    }

    fn starts_string_at(&self, offset: usize) -> bool {
        self.peek(offset) == Some('"')
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.peek(0) {
            if c == '\n' {
                break;
            }
            self.pos += 1;
        }
        self.spaced = true;
    }

    fn skip_block_comment(&mut self) {
        self.pos += 2;
        while let Some(c) = self.peek(0) {
            if c == '*' && self.peek(1) == Some('/') {
                self.pos += 2;
                break;
            }
            self.pos += 1;
        }
        self.spaced = true;
    }

    /// Lex a string literal whose opening quote is `prefix_len` chars ahead
    fn lex_string(&mut self, prefix_len: usize) {
        let start = self.pos;
        let verbatim = self.chars[start..start + prefix_len].contains(&'@');
        self.pos += prefix_len;

        let quotes = self.count_run('"', self.pos);
        if quotes >= 3 {
            // Raw string literal: closed by the same number of quotes
            self.pos += quotes;
            while self.pos < self.chars.len() {
                if self.count_run('"', self.pos) >= quotes {
                    self.pos += quotes;
                    break;
                }
                self.pos += 1;
            }
        } else {
            self.pos += 1;
            while let Some(c) = self.peek(0) {
                self.pos += 1;
                match c {
                    '\\' if !verbatim => self.pos += 1,
                    '"' if verbatim && self.peek(0) == Some('"') => self.pos += 1,
                    '"' => break,
                    '\n' if !verbatim => break,
                    _ => {}
                }
            }
        }

        let end = self.pos.min(self.chars.len());
        let text: String = self.chars[start..end].iter().collect();
        self.push(TokenKind::Literal(text));
    }

    fn lex_char(&mut self) {
        let start = self.pos;
        self.pos += 1;
        while let Some(c) = self.peek(0) {
            self.pos += 1;
            match c {
                '\\' => self.pos += 1,
                '\'' | '\n' => break,
                _ => {}
            }
        }
        let end = self.pos.min(self.chars.len());
        let text: String = self.chars[start..end].iter().collect();
        self.push(TokenKind::Literal(text));
    }

    fn lex_number(&mut self) {
        let start = self.pos;
        while let Some(c) = self.peek(0) {
            let exponent_sign = (c == '+' || c == '-')
                && matches!(self.chars.get(self.pos.wrapping_sub(1)), Some('e' | 'E'))
                && !self.chars[start..self.pos].iter().any(|c| matches!(c, 'x' | 'X'));
            if c.is_ascii_alphanumeric() || c == '_' || exponent_sign {
                self.pos += 1;
            } else if c == '.' && self.peek(1).is_some_and(|n| n.is_ascii_digit()) {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        self.push(TokenKind::Literal(text));
    }

    fn lex_word(&mut self) {
        let start = self.pos;
        while self.peek(0).is_some_and(is_ident_part) {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        self.push(TokenKind::Word(text));
    }

    fn count_run(&self, c: char, from: usize) -> usize {
        self.chars[from.min(self.chars.len())..]
            .iter()
            .take_while(|&&x| x == c)
            .count()
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_ident_part(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(source: &str) -> Vec<String> {
        tokenize(source).iter().map(Token::text).collect()
    }

    #[test]
    fn test_words_and_punctuation() {
        assert_eq!(
            texts("public int Foo(string a);"),
            vec!["public", "int", "Foo", "(", "string", "a", ")", ";"]
        );
    }

    #[test]
    fn test_comments_are_dropped() {
        assert_eq!(
            texts("// leading\nint /* inline */ x; /// doc\n"),
            vec!["int", "x", ";"]
        );
    }

    #[test]
    fn test_preprocessor_lines_are_dropped() {
        assert_eq!(texts("#if DEBUG\nint x;\n#endif"), vec!["int", "x", ";"]);
    }

    #[test]
    fn test_string_literals_are_opaque() {
        assert_eq!(
            texts(r#"s = "a { b \" c"; t = @"x ""y"" z";"#),
            vec!["s", "=", r#""a { b \" c""#, ";", "t", "=", r#"@"x ""y"" z""#, ";"]
        );
    }

    #[test]
    fn test_raw_string_literal() {
        let tokens = texts("x = \"\"\"\n{ \"a\" }\n\"\"\";");
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[3], ";");
    }

    #[test]
    fn test_verbatim_identifier() {
        assert_eq!(texts("@class x"), vec!["class", "x"]);
    }

    #[test]
    fn test_spacing_is_recorded() {
        let tokens = tokenize("a == b");
        assert!(tokens[1].spaced);
        assert!(!tokens[2].spaced);
        assert!(tokens[3].spaced);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(texts("1.5e-3f 0xFF 10UL"), vec!["1.5e-3f", "0xFF", "10UL"]);
    }

    #[test]
    fn test_unterminated_comment_runs_to_end() {
        assert_eq!(texts("int x; /* oops"), vec!["int", "x", ";"]);
    }
}
