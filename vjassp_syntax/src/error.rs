use crate::token::{FileManager, Pos};
use indexmap::IndexSet;
use std::cell::RefCell;
use std::fmt::Display;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
    Bug,
}

impl Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Bug => write!(f, "internal error"),
        }
    }
}

#[derive(PartialEq, Eq, Hash)]
pub struct Error {
    pub pos: Pos,
    pub message: String,
    pub severity: Severity,
}

impl Error {
    pub fn new(pos: Pos, message: String) -> Self {
        Self {
            pos,
            message,
            severity: Severity::Error,
        }
    }

    pub fn display(&self, file_manager: &FileManager) -> impl Display {
        let loc = file_manager.location(self.pos);
        format!("{loc}: {}: {}", self.severity, self.message)
    }
}

pub trait ErrorReporter {
    fn diag(&self, severity: Severity, pos: Pos, message: String);

    fn has_errors(&self) -> bool;

    fn report(&self, pos: Pos, message: String) {
        self.diag(Severity::Error, pos, message);
    }

    fn warn(&self, pos: Pos, message: String) {
        self.diag(Severity::Warning, pos, message);
    }

    fn bug(&self, pos: Pos, message: String) {
        self.diag(Severity::Bug, pos, message);
    }
}

#[derive(Default)]
pub struct ErrorManager {
    panic_on_error: bool,
    errors: RefCell<IndexSet<Error>>,
}

impl ErrorReporter for ErrorManager {
    fn diag(&self, severity: Severity, pos: Pos, message: String) {
        let err = Error {
            pos,
            message,
            severity,
        };
        if self.panic_on_error && severity > Severity::Warning {
            panic!("pos={:?} severity={} message={}", err.pos, err.severity, err.message);
        }
        self.errors.borrow_mut().insert(err);
    }

    fn has_errors(&self) -> bool {
        self.errors
            .borrow()
            .iter()
            .any(|err| err.severity > Severity::Warning)
    }
}

impl ErrorManager {
    pub fn new_for_debug() -> Self {
        Self {
            panic_on_error: true,
            errors: RefCell::default(),
        }
    }

    pub fn has_bugs(&self) -> bool {
        self.errors
            .borrow()
            .iter()
            .any(|err| err.severity == Severity::Bug)
    }

    pub fn take(&mut self) -> Vec<Error> {
        let mut errs = self.errors.borrow_mut();
        let mut errors: Vec<Error> = errs.drain(..).collect();
        errors.sort_by(|a, b| a.pos.cmp(&b.pos));
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.errors.borrow().is_empty()
    }
}
