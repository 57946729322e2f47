use crate::token::{Pos, Token};
use crate::ErrorReporter;
use std::fmt::Display;

pub(crate) fn unexpected_char(errors: &impl ErrorReporter, pos: Pos, ch: char) {
    errors.report(pos, format!("Unexpected character '{ch}'"));
}

pub(crate) fn missing_closing_quote(errors: &impl ErrorReporter, pos: Pos) {
    errors.report(pos, String::from("Missing closing quote in string literal"));
}

pub(crate) fn unterminated_doc_string(errors: &impl ErrorReporter, pos: Pos) {
    errors.report(pos, String::from("Doc string is never closed"));
}

pub(crate) fn inconsistent_dedent(errors: &impl ErrorReporter, pos: Pos, width: usize) {
    errors.report(
        pos,
        format!("Inconsistent dedent, column {width} matches no enclosing block"),
    );
}

pub(crate) fn unexpected_parsing(
    errors: &impl ErrorReporter,
    pos: Pos,
    expected: impl Display,
    found: impl Display,
) {
    errors.report(pos, format!("Expected {expected}, but found {found}"));
}

pub(crate) fn unexpected_token(errors: &impl ErrorReporter, token: &Token) {
    errors.report(token.pos, format!("Unexpected token {}", token.kind));
}

pub(crate) fn not_a_statement(errors: &impl ErrorReporter, pos: Pos) {
    errors.report(
        pos,
        String::from("Expression cannot be used as a statement, only calls can"),
    );
}

pub(crate) fn array_with_initializer(errors: &impl ErrorReporter, pos: Pos) {
    errors.report(
        pos,
        String::from("Array variables cannot take an initializer expression"),
    );
}
