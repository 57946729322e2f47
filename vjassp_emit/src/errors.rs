use vjassp_syntax::{ErrorReporter, Pos};

// Rendering is total on a well-formed lowered tree; anything tripping
// these is a compiler defect, not a user mistake.
pub(crate) trait EmitError: ErrorReporter {
    fn malformed_array_global(&self, pos: Pos, name: &str) {
        self.bug(
            pos,
            format!("Array global {name} reached the emitter with an initializer expression"),
        );
    }

    fn malformed_scope_requirements(&self, pos: Pos, name: &str) {
        self.bug(
            pos,
            format!("Scope {name} reached the emitter with a requirements list"),
        );
    }
}

impl<T: ErrorReporter> EmitError for T {}
