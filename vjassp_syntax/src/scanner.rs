use crate::errors::{
    inconsistent_dedent, missing_closing_quote, unexpected_char, unterminated_doc_string,
};
use crate::token::{File, Pos, Token, TokenKind};
use crate::ErrorReporter;
use lazy_static::lazy_static;

/// Scans one unit into a token stream. Block structure is surfaced as
/// synthetic `Indent`/`Dedent`/`Newline` tokens derived from the leading
/// whitespace of each logical line, so the parser stays an ordinary
/// recursive descent. Blank lines, `#` comments and `"""` doc strings
/// produce `Comment` tokens (or nothing) and never affect the indent stack.
pub fn scan(errors: &impl ErrorReporter, file: &File) -> Vec<Token> {
    let source_code: Vec<CharPos> = file
        .text
        .chars()
        .enumerate()
        .map(|(offset, ch)| CharPos {
            ch,
            pos: file.offset.with_offset(offset),
        })
        .collect();
    let eof_pos = file.offset.with_offset(file.text.chars().count());

    let scanner = Scanner {
        errors,
        source_code,
        cursor: 0,
        eof_pos,
        indent_stack: vec![0],
        tokens: Vec::default(),
    };
    scanner.scan_unit()
}

#[derive(Debug, Clone, Copy)]
struct CharPos {
    ch: char,
    pos: Pos,
}

lazy_static! {
    static ref SYMBOLS: Vec<(&'static str, TokenKind)> = vec![
        ("<=", TokenKind::LEq),
        (">=", TokenKind::GEq),
        ("==", TokenKind::Eq),
        ("!=", TokenKind::NEq),
        ("++", TokenKind::Inc),
        ("--", TokenKind::Dec),
        ("+=", TokenKind::AddAssign),
        ("-=", TokenKind::SubAssign),
        ("*=", TokenKind::MulAssign),
        ("/=", TokenKind::DivAssign),
        ("->", TokenKind::Arrow),
        ("=>", TokenKind::FatArrow),
        ("(", TokenKind::OpenBrac),
        (")", TokenKind::CloseBrac),
        ("[", TokenKind::OpenSquare),
        ("]", TokenKind::CloseSquare),
        ("{", TokenKind::OpenCurly),
        ("}", TokenKind::CloseCurly),
        (",", TokenKind::Comma),
        (".", TokenKind::Dot),
        (":", TokenKind::Colon),
        (";", TokenKind::SemiColon),
        ("=", TokenKind::Equal),
        ("~", TokenKind::Tilde),
        ("+", TokenKind::Add),
        ("-", TokenKind::Sub),
        ("*", TokenKind::Mul),
        ("/", TokenKind::Div),
        ("%", TokenKind::Mod),
        ("!", TokenKind::Bang),
        ("<", TokenKind::Lt),
        (">", TokenKind::Gt),
    ];
}

struct Scanner<'a, E> {
    errors: &'a E,
    source_code: Vec<CharPos>,
    cursor: usize,
    eof_pos: Pos,
    indent_stack: Vec<usize>,
    tokens: Vec<Token>,
}

impl<'a, E: ErrorReporter> Scanner<'a, E> {
    fn scan_unit(mut self) -> Vec<Token> {
        while self.scan_line_start() {
            self.scan_line_body();
        }

        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            self.emit(TokenKind::Dedent, String::new(), self.eof_pos);
        }
        self.emit(TokenKind::Eof, String::new(), self.eof_pos);
        self.tokens
    }

    /// Skips blank and comment-only lines, then settles the indent stack
    /// against the first code line found. Returns false at end of file.
    fn scan_line_start(&mut self) -> bool {
        loop {
            let mut width = 0;
            while self.next_if(|c| c == ' ').is_some() {
                width += 1;
            }

            let Some(head) = self.peek() else {
                return false;
            };

            match head.ch {
                '\n' => {
                    self.advance();
                }
                '#' => {
                    self.scan_comment();
                    self.next_if(|c| c == '\n');
                }
                '"' if self.peek_str(3) == "\"\"\"" => {
                    self.scan_doc_string();
                }
                _ => {
                    self.apply_indentation(width, head.pos);
                    return true;
                }
            }
        }
    }

    fn apply_indentation(&mut self, width: usize, pos: Pos) {
        let top = *self.indent_stack.last().unwrap();
        if width > top {
            self.indent_stack.push(width);
            self.emit(TokenKind::Indent, String::new(), pos);
        } else if width < top {
            while *self.indent_stack.last().unwrap() > width {
                self.indent_stack.pop();
                self.emit(TokenKind::Dedent, String::new(), pos);
            }
            if *self.indent_stack.last().unwrap() != width {
                inconsistent_dedent(self.errors, pos, width);
            }
        }
    }

    fn scan_line_body(&mut self) {
        loop {
            let Some(head) = self.peek() else {
                self.emit(TokenKind::Newline, String::new(), self.eof_pos);
                return;
            };

            match head.ch {
                '\n' => {
                    self.advance();
                    self.emit(TokenKind::Newline, String::new(), head.pos);
                    return;
                }
                ' ' => {
                    self.advance();
                }
                '#' => {
                    self.scan_comment();
                }
                '"' => self.scan_string_lit(),
                '\'' => self.scan_rawcode_lit(),
                c if c.is_ascii_digit() => self.scan_number_lit(),
                c if c.is_alphabetic() || c == '_' => self.scan_word(),
                _ => self.scan_symbol(),
            }
        }
    }

    fn scan_word(&mut self) {
        let head = self.advance().unwrap();
        let mut value = String::from(head.ch);
        while let Some(c) = self.next_if(|c| c.is_alphanumeric() || c == '_') {
            value.push(c.ch);
        }

        if value == "f" && self.peek().map(|c| c.ch) == Some('"') {
            self.scan_fstring_lit(head.pos);
            return;
        }

        let kind = match value.as_str() {
            "library" => TokenKind::Library,
            "scope" => TokenKind::Scope,
            "content" => TokenKind::Content,
            "system" => TokenKind::System,
            "global" => TokenKind::Global,
            "api" => TokenKind::Api,
            "init" => TokenKind::Init,
            "import" => TokenKind::Import,
            "when" => TokenKind::When,
            "uses" => TokenKind::Uses,
            "optional" => TokenKind::Optional,
            "if" => TokenKind::If,
            "elseif" => TokenKind::Elseif,
            "else" => TokenKind::Else,
            "until" => TokenKind::Until,
            "while" => TokenKind::While,
            "loop" => TokenKind::Loop,
            "break" => TokenKind::Break,
            "return" => TokenKind::Return,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            "function" => TokenKind::Function,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "extends" => TokenKind::Extends,
            "alias" => TokenKind::Alias,
            "type" => TokenKind::Type,
            "native" => TokenKind::Native,
            _ => TokenKind::Ident,
        };
        self.emit(kind, value, head.pos);
    }

    /// String literals are passed through to the output verbatim, escape
    /// sequences included, so the token value keeps the surrounding quotes
    /// and the raw backslash pairs.
    fn scan_string_lit(&mut self) {
        let opening = self.advance().unwrap();
        let mut value = String::from(opening.ch);
        let mut closed = false;

        while let Some(c) = self.peek() {
            if c.ch == '\n' {
                break;
            }
            self.advance();
            value.push(c.ch);
            if c.ch == '\\' {
                if let Some(escaped) = self.next_if(|c| c != '\n') {
                    value.push(escaped.ch);
                }
            } else if c.ch == '"' {
                closed = true;
                break;
            }
        }

        if !closed {
            missing_closing_quote(self.errors, opening.pos);
            self.emit(TokenKind::Invalid, value, opening.pos);
        } else {
            self.emit(TokenKind::StringLit, value, opening.pos);
        }
    }

    /// `f"..."` literal. The token value is the raw body without the `f`
    /// prefix and the quotes; brace splitting happens later.
    fn scan_fstring_lit(&mut self, start: Pos) {
        let opening = self.advance().unwrap();
        let mut value = String::new();
        let mut closed = false;

        while let Some(c) = self.peek() {
            if c.ch == '\n' {
                break;
            }
            self.advance();
            if c.ch == '\\' {
                value.push(c.ch);
                if let Some(escaped) = self.next_if(|c| c != '\n') {
                    value.push(escaped.ch);
                }
            } else if c.ch == '"' {
                closed = true;
                break;
            } else {
                value.push(c.ch);
            }
        }

        if !closed {
            missing_closing_quote(self.errors, opening.pos);
            self.emit(TokenKind::Invalid, value, start);
        } else {
            self.emit(TokenKind::FStringLit, value, start);
        }
    }

    /// Four-character object codes like `'hfoo'` are integer literals in
    /// the target dialect and pass through untouched.
    fn scan_rawcode_lit(&mut self) {
        let opening = self.advance().unwrap();
        let mut value = String::from(opening.ch);
        let mut closed = false;

        while let Some(c) = self.next_if(|c| c != '\n') {
            value.push(c.ch);
            if c.ch == '\'' {
                closed = true;
                break;
            }
        }

        if !closed {
            missing_closing_quote(self.errors, opening.pos);
            self.emit(TokenKind::Invalid, value, opening.pos);
        } else {
            self.emit(TokenKind::IntegerLit, value, opening.pos);
        }
    }

    fn scan_number_lit(&mut self) {
        let head = self.advance().unwrap();
        let mut value = String::from(head.ch);

        if head.ch == '0' && self.peek().map(|c| c.ch) == Some('x') {
            value.push(self.advance().unwrap().ch);
            while let Some(c) = self.next_if(|c| c.is_ascii_hexdigit()) {
                value.push(c.ch);
            }
            self.emit(TokenKind::IntegerLit, value, head.pos);
            return;
        }

        while let Some(c) = self.next_if(|c| c.is_ascii_digit()) {
            value.push(c.ch);
        }

        if let Some(dot) = self.next_if(|c| c == '.') {
            value.push(dot.ch);
            while let Some(c) = self.next_if(|c| c.is_ascii_digit()) {
                value.push(c.ch);
            }
            self.emit(TokenKind::RealLit, value, head.pos);
        } else {
            self.emit(TokenKind::IntegerLit, value, head.pos);
        }
    }

    fn scan_symbol(&mut self) {
        let head = self.peek().unwrap();

        let pair = self.peek_str(2);
        if let Some((sym, kind)) = SYMBOLS.iter().find(|(sym, _)| sym.len() == 2 && **sym == pair) {
            self.advance();
            self.advance();
            self.emit(*kind, sym.to_string(), head.pos);
            return;
        }

        let single = self.peek_str(1);
        if let Some((sym, kind)) = SYMBOLS.iter().find(|(sym, _)| sym.len() == 1 && **sym == single) {
            self.advance();
            self.emit(*kind, sym.to_string(), head.pos);
            return;
        }

        self.advance();
        unexpected_char(self.errors, head.pos, head.ch);
        self.emit(TokenKind::Invalid, String::from(head.ch), head.pos);
    }

    fn scan_comment(&mut self) {
        let head = self.advance().unwrap();
        let mut value = String::from(head.ch);
        while let Some(c) = self.next_if(|c| c != '\n') {
            value.push(c.ch);
        }
        self.emit(TokenKind::Comment, value, head.pos);
    }

    /// A `"""` opener at statement position swallows everything up to the
    /// closing `"""`, newlines included. The content is documentation and
    /// surfaces only as a comment token.
    fn scan_doc_string(&mut self) {
        let head = self.advance().unwrap();
        self.advance();
        self.advance();

        let mut value = String::new();
        let mut closed = false;
        while self.peek().is_some() {
            if self.peek_str(3) == "\"\"\"" {
                self.advance();
                self.advance();
                self.advance();
                closed = true;
                break;
            }
            value.push(self.advance().unwrap().ch);
        }

        if !closed {
            unterminated_doc_string(self.errors, head.pos);
        }

        // discard the remainder of the closing line
        while self.next_if(|c| c != '\n').is_some() {}
        self.next_if(|c| c == '\n');

        self.emit(TokenKind::Comment, value, head.pos);
    }

    fn emit(&mut self, kind: TokenKind, value: String, pos: Pos) {
        self.tokens.push(Token { kind, value, pos });
    }

    fn peek(&self) -> Option<CharPos> {
        self.source_code.get(self.cursor).copied()
    }

    fn peek_str(&self, len: usize) -> String {
        self.source_code[self.cursor..]
            .iter()
            .take(len)
            .map(|c| c.ch)
            .collect()
    }

    fn advance(&mut self) -> Option<CharPos> {
        let c = self.source_code.get(self.cursor).copied();
        if c.is_some() {
            self.cursor += 1;
        }
        c
    }

    fn next_if(&mut self, pred: impl FnOnce(char) -> bool) -> Option<CharPos> {
        let c = self.peek()?;
        if pred(c.ch) {
            self.advance()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorManager;
    use crate::token::FileManager;

    fn scan_kinds(source: &str) -> (Vec<TokenKind>, ErrorManager) {
        let errors = ErrorManager::default();
        let mut files = FileManager::default();
        let file = files.add_file("test.jp".into(), source.into());
        let tokens = scan(&errors, &file);
        (tokens.into_iter().map(|t| t.kind).collect(), errors)
    }

    #[test]
    fn balanced_indents() {
        let (kinds, errors) = scan_kinds("library A:\n    init:\n        foo()\nlibrary B:\n    x()\n");
        assert!(!errors.has_errors());
        let indents = kinds.iter().filter(|k| **k == TokenKind::Indent).count();
        let dedents = kinds.iter().filter(|k| **k == TokenKind::Dedent).count();
        assert_eq!(indents, dedents);
        assert_eq!(kinds.last(), Some(&TokenKind::Eof));
    }

    #[test]
    fn dedents_flushed_at_eof() {
        let (kinds, errors) = scan_kinds("scope S:\n    init:\n        foo()");
        assert!(!errors.has_errors());
        let indents = kinds.iter().filter(|k| **k == TokenKind::Indent).count();
        let dedents = kinds.iter().filter(|k| **k == TokenKind::Dedent).count();
        assert_eq!(indents, 2);
        assert_eq!(dedents, 2);
    }

    #[test]
    fn inconsistent_dedent_is_an_error() {
        let (_, errors) = scan_kinds("library A:\n        x()\n    y()\n");
        assert!(errors.has_errors());
    }

    #[test]
    fn blank_and_comment_lines_do_not_affect_indentation() {
        let (kinds, errors) = scan_kinds("library A:\n\n    # comment\n    init:\n        x()\n");
        assert!(!errors.has_errors());
        let indents = kinds.iter().filter(|k| **k == TokenKind::Indent).count();
        assert_eq!(indents, 2);
    }

    #[test]
    fn doc_strings_are_comments() {
        let (kinds, errors) = scan_kinds("\"\"\"\nsome docs\nover lines\n\"\"\"\nlibrary A:\n    x()\n");
        assert!(!errors.has_errors());
        assert_eq!(kinds[0], TokenKind::Comment);
        assert_eq!(kinds[1], TokenKind::Library);
    }

    #[test]
    fn keywords_and_symbols() {
        let (kinds, _) = scan_kinds("until i >= 10:\n    i++\n");
        assert_eq!(kinds[0], TokenKind::Until);
        assert!(kinds.contains(&TokenKind::GEq));
        assert!(kinds.contains(&TokenKind::Inc));
    }

    #[test]
    fn hex_and_rawcode_literals() {
        let errors = ErrorManager::default();
        let mut files = FileManager::default();
        let file = files.add_file("test.jp".into(), "x = 0xFF + 'hfoo'\n".into());
        let tokens = scan(&errors, &file);
        assert!(!errors.has_errors());
        let values: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::IntegerLit)
            .map(|t| t.value.as_str())
            .collect();
        assert_eq!(values, vec!["0xFF", "'hfoo'"]);
    }

    #[test]
    fn fstring_token_keeps_raw_body() {
        let errors = ErrorManager::default();
        let mut files = FileManager::default();
        let file = files.add_file("test.jp".into(), "s = f\"a{x}b\"\n".into());
        let tokens = scan(&errors, &file);
        let tok = tokens.iter().find(|t| t.kind == TokenKind::FStringLit).unwrap();
        assert_eq!(tok.value, "a{x}b");
    }

    #[test]
    fn unterminated_string_reports() {
        let (_, errors) = scan_kinds("x = \"oops\n");
        assert!(errors.has_errors());
    }

    #[test]
    fn inline_comment_ends_before_newline() {
        let (kinds, errors) = scan_kinds("x = 1 # trailing\n");
        assert!(!errors.has_errors());
        let idx_comment = kinds.iter().position(|k| *k == TokenKind::Comment).unwrap();
        assert_eq!(kinds[idx_comment + 1], TokenKind::Newline);
    }
}
