/// Builds a [`Line`](crate::Line) from a literal.
///
/// Named cells go in braces, unnamed cells in brackets. Values are anything
/// that converts into a [`CellValue`](crate::CellValue).
///
/// ```rust
/// use flatcell::{record, CellValue};
///
/// let person = record!("Person", { "First name" => "Jonas", "Age" => 42 });
/// assert_eq!(person.value("Age"), Some(&CellValue::Integer(42)));
///
/// let row = record!("Row", ["a", "b"]);
/// assert_eq!(row.len(), 2);
///
/// let empty = record!("Separator");
/// assert!(empty.is_empty());
/// ```
#[macro_export]
macro_rules! record {
    // Named cells
    ($line_type:expr, { $($name:expr => $value:expr),* $(,)? }) => {{
        #[allow(unused_mut)]
        let mut line = $crate::Line::new($line_type);
        $(
            line.add_cell($crate::Cell::new($name, $value));
        )*
        line
    }};

    // Unnamed cells, in order
    ($line_type:expr, [ $($value:expr),* $(,)? ]) => {{
        #[allow(unused_mut)]
        let mut line = $crate::Line::new($line_type);
        $(
            line.add_cell($crate::Cell::unnamed($value));
        )*
        line
    }};

    // No cells
    ($line_type:expr) => {
        $crate::Line::new($line_type)
    };
}
