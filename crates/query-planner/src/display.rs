//! Human-readable rendering of plans, used in logs and test snapshots.

use std::fmt;
use std::fmt::Write as _;

use itertools::Itertools;

use crate::model::OperationKind;
use crate::model::PathStep;
use crate::model::Plan;
use crate::selection::Selection;
use crate::selection::SelectionSet;

/// Writes nested blocks, two spaces per open block.
struct Indented<'a, 'b> {
    out: &'a mut fmt::Formatter<'b>,
    depth: usize,
}

impl<'a, 'b> Indented<'a, 'b> {
    fn new(out: &'a mut fmt::Formatter<'b>) -> Self {
        Self { out, depth: 0 }
    }

    fn line(&mut self) -> fmt::Result {
        self.out.write_char('\n')?;
        for _ in 0..self.depth {
            self.out.write_str("  ")?;
        }
        Ok(())
    }

    /// Writes `head` and nests what follows one level deeper.
    fn open(&mut self, head: &str) -> fmt::Result {
        self.depth += 1;
        self.out.write_str(head)
    }

    /// Ends the innermost block on its own line with `tail`.
    fn close(&mut self, tail: &str) -> fmt::Result {
        self.depth = self.depth.saturating_sub(1);
        self.line()?;
        self.out.write_str(tail)
    }
}

/// Renders a path the way executors log it: fields joined with `.`, type conditions as `|[T]`.
pub(crate) struct DisplayPath<'a>(pub(crate) &'a [PathStep]);

impl fmt::Display for DisplayPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.0.iter().enumerate() {
            match step {
                PathStep::Field(name) if i == 0 => write!(f, "{name}")?,
                PathStep::Field(name) => write!(f, ".{name}")?,
                PathStep::TypeCondition(name) => write!(f, "|[{name}]")?,
            }
        }
        Ok(())
    }
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&DisplayPath(std::slice::from_ref(self)), f)
    }
}

impl Plan {
    fn write_indented(&self, w: &mut Indented<'_, '_>) -> fmt::Result {
        write!(w.out, "Plan(service: \"{}\", type: \"{}\"", self.service, self.type_name)?;
        if self.kind == OperationKind::Mutation {
            w.out.write_str(", kind: mutation")?;
        }
        if !self.path.is_empty() {
            write!(w.out, ", path: \"{}\"", DisplayPath(&self.path))?;
        }
        w.open(") {")?;
        w.line()?;
        self.selection_set.write_indented(w)?;

        if !self.after.is_empty() {
            w.line()?;
            w.open("After {")?;
            for dependent in &self.after {
                w.line()?;
                dependent.write_indented(w)?;
                w.out.write_char(',')?;
            }
            w.close("},")?;
        }
        w.close("}")
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(&mut Indented::new(f))
    }
}

impl SelectionSet {
    fn write_indented(&self, w: &mut Indented<'_, '_>) -> fmt::Result {
        if self.is_empty() {
            return w.out.write_str("{}");
        }
        w.open("{")?;
        for selection in &self.selections {
            w.line()?;
            selection.write_indented(w)?;
        }
        for fragment in &self.fragments {
            w.line()?;
            write!(w.out, "... on {} ", fragment.on)?;
            fragment.selection_set.write_indented(w)?;
        }
        w.close("}")
    }
}

impl fmt::Display for SelectionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(&mut Indented::new(f))
    }
}

impl Selection {
    fn write_indented(&self, w: &mut Indented<'_, '_>) -> fmt::Result {
        if let Some(alias) = self.alias.as_deref().filter(|alias| *alias != self.name) {
            write!(w.out, "{alias}: ")?;
        }
        w.out.write_str(&self.name)?;
        if !self.arguments.is_empty() {
            write!(
                w.out,
                "({})",
                self.arguments
                    .iter()
                    .format_with(", ", |(name, value), f| f(&format_args!("{name}: {value}")))
            )?;
        }
        if let Some(selection_set) = &self.selection_set {
            w.out.write_char(' ')?;
            selection_set.write_indented(w)?;
        }
        Ok(())
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(&mut Indented::new(f))
    }
}
