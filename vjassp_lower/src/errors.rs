use vjassp_syntax::{ErrorReporter, Pos};

pub(crate) trait LowerError: ErrorReporter {
    fn redeclared_symbol(&self, pos: Pos, name: &str) {
        self.report(pos, format!("{name} is declared twice in the same scope"));
    }

    fn redeclared_local(&self, pos: Pos, name: &str) {
        self.report(
            pos,
            format!("Local variable {name} is declared twice in the same function"),
        );
    }

    fn alias_cycle(&self, pos: Pos, name: &str) {
        self.report(pos, format!("Type alias {name} cannot be resolved, the alias chain loops"));
    }

    fn uses_outside_library(&self, pos: Pos) {
        self.report(
            pos,
            String::from("'uses' requirements are only allowed inside a library or system block"),
        );
    }
}

impl<T: ErrorReporter> LowerError for T {}
