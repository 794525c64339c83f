//! Selection of the schema line that applies to a physical line.

use crate::schema::{Dispatch, Occurs, Schema, SchemaLine};
use std::collections::HashMap;

/// Chooses schema lines for consecutive physical lines.
///
/// Under [`Dispatch::Occurs`] the schema lines apply in declared order, each
/// to as many lines as its [`Occurs`] says. Under
/// [`Dispatch::ControlCell`] the control value read from the line picks
/// the schema line. [`peek`](Self::peek) never changes state; a line only
/// counts once [`commit`](Self::commit) is called, so a header or a
/// skipped empty line does not use up an occurrence.
///
/// ```rust
/// use flatcell::{LineSelector, Occurs, Schema, SchemaLine};
///
/// let schema = Schema::delimited(";")
///     .line(SchemaLine::new("Head").occurs(Occurs::Exactly(1)))
///     .line(SchemaLine::new("Row"))
///     .build()
///     .unwrap();
/// let mut selector = LineSelector::new(&schema);
/// assert_eq!(selector.peek(None).map(|l| l.line_type()), Some("Head"));
/// selector.commit();
/// assert_eq!(selector.peek(None).map(|l| l.line_type()), Some("Row"));
/// ```
#[derive(Debug)]
pub struct LineSelector<'s> {
    state: State<'s>,
}

#[derive(Debug)]
enum State<'s> {
    Occurs {
        lines: Vec<&'s SchemaLine>,
        index: usize,
        count: usize,
    },
    Control {
        by_value: HashMap<&'s str, &'s SchemaLine>,
    },
}

impl<'s> LineSelector<'s> {
    pub fn new(schema: &'s Schema) -> Self {
        let state = match schema.dispatch() {
            Dispatch::Occurs => State::Occurs {
                lines: schema.lines().collect(),
                index: 0,
                count: 0,
            },
            Dispatch::ControlCell { .. } => State::Control {
                by_value: schema
                    .lines()
                    .filter_map(|line| line.control().map(|value| (value, line)))
                    .collect(),
            },
        };
        LineSelector { state }
    }

    /// `true` when lines are selected by a control cell.
    #[must_use]
    pub fn uses_control_cell(&self) -> bool {
        matches!(self.state, State::Control { .. })
    }

    /// The schema line for the next physical line.
    ///
    /// `control` is the control value read from the line and is ignored
    /// under occurs dispatch. A control value that only matches after
    /// trailing spaces are trimmed still matches, which covers control
    /// values narrower than a fixed-width control cell.
    #[must_use]
    pub fn peek(&self, control: Option<&str>) -> Option<&'s SchemaLine> {
        match &self.state {
            State::Occurs {
                lines,
                index,
                count,
            } => {
                let mut i = *index;
                let mut used = *count;
                while let Some(line) = lines.get(i) {
                    match line.get_occurs() {
                        Occurs::Unbounded => return Some(line),
                        Occurs::Exactly(n) if used < n => return Some(line),
                        Occurs::Exactly(_) => {
                            i += 1;
                            used = 0;
                        }
                    }
                }
                None
            }
            State::Control { by_value } => {
                let control = control?;
                by_value
                    .get(control)
                    .or_else(|| by_value.get(control.trim_end_matches(' ')))
                    .copied()
            }
        }
    }

    /// Counts one physical line against the line last returned by [`peek`](Self::peek).
    pub fn commit(&mut self) {
        if let State::Occurs {
            lines,
            index,
            count,
        } = &mut self.state
        {
            while let Some(line) = lines.get(*index) {
                match line.get_occurs() {
                    Occurs::Unbounded => return,
                    Occurs::Exactly(n) if *count < n => {
                        *count += 1;
                        return;
                    }
                    Occurs::Exactly(_) => {
                        *index += 1;
                        *count = 0;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaCell;

    fn types(selector: &mut LineSelector<'_>, n: usize) -> Vec<Option<String>> {
        (0..n)
            .map(|_| {
                let t = selector.peek(None).map(|l| l.line_type().to_string());
                selector.commit();
                t
            })
            .collect()
    }

    #[test]
    fn test_occurs_in_declared_order() {
        let schema = Schema::delimited(";")
            .line(SchemaLine::new("Head").occurs(Occurs::Exactly(2)))
            .line(SchemaLine::new("Body"))
            .build()
            .unwrap();
        let mut selector = LineSelector::new(&schema);
        let seen = types(&mut selector, 4);
        assert_eq!(
            seen,
            vec![
                Some("Head".to_string()),
                Some("Head".to_string()),
                Some("Body".to_string()),
                Some("Body".to_string())
            ]
        );
    }

    #[test]
    fn test_exhausted_occurs() {
        let schema = Schema::delimited(";")
            .line(SchemaLine::new("Only").occurs(Occurs::Exactly(1)))
            .build()
            .unwrap();
        let mut selector = LineSelector::new(&schema);
        assert_eq!(types(&mut selector, 2), vec![Some("Only".to_string()), None]);
    }

    #[test]
    fn test_zero_occurs_is_skipped() {
        let schema = Schema::delimited(";")
            .line(SchemaLine::new("Never").occurs(Occurs::Exactly(0)))
            .line(SchemaLine::new("Rest"))
            .build()
            .unwrap();
        let selector = LineSelector::new(&schema);
        assert_eq!(selector.peek(None).map(|l| l.line_type()), Some("Rest"));
    }

    #[test]
    fn test_peek_does_not_consume() {
        let schema = Schema::delimited(";")
            .line(SchemaLine::new("One").occurs(Occurs::Exactly(1)))
            .line(SchemaLine::new("Two"))
            .build()
            .unwrap();
        let selector = LineSelector::new(&schema);
        assert_eq!(selector.peek(None).map(|l| l.line_type()), Some("One"));
        assert_eq!(selector.peek(None).map(|l| l.line_type()), Some("One"));
    }

    #[test]
    fn test_control_value_lookup() {
        let schema = Schema::fixed()
            .control_cell(2)
            .line(SchemaLine::new("Name").control_value("N").cell(SchemaCell::new("a").width(1)))
            .line(SchemaLine::new("Addr").control_value("AD").cell(SchemaCell::new("a").width(1)))
            .build()
            .unwrap();
        let selector = LineSelector::new(&schema);
        assert!(selector.uses_control_cell());
        assert_eq!(selector.peek(Some("N ")).map(|l| l.line_type()), Some("Name"));
        assert_eq!(selector.peek(Some("AD")).map(|l| l.line_type()), Some("Addr"));
        assert!(selector.peek(Some("X ")).is_none());
        assert!(selector.peek(None).is_none());
    }
}
