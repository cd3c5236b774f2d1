//! SET-clause construction for partial updates
//!
//! Converts a sequence of (column, patch) pairs into `column = $n` fragments
//! plus the parallel ordered value list. Column names come from the static
//! allowlists owned by each entity repository; caller-supplied data only ever
//! appears as a bound value, never in the SQL text.

use crate::patch::Patch;
use crate::value::SqlValue;

/// Builder for the SET clause of a partial UPDATE
#[derive(Debug)]
pub struct MutationBuilder {
    next_index: usize,
    assignments: Vec<String>,
    values: Vec<SqlValue>,
}

impl MutationBuilder {
    /// Start numbering placeholders at `$first_placeholder`
    ///
    /// Repositories reserve `$1` for the row id, so updates start at 2.
    pub fn starting_at(first_placeholder: usize) -> Self {
        debug_assert!(first_placeholder >= 1);
        Self {
            next_index: first_placeholder,
            assignments: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Append one field of the partial update
    ///
    /// `Missing` appends nothing, `Null` appends a real NULL write, `Value`
    /// appends the bound value. Fragment order is insertion order.
    pub fn push(&mut self, column: &'static str, patch: Patch<SqlValue>) {
        debug_assert!(is_identifier(column), "invalid column name: {}", column);

        let value = match patch {
            Patch::Missing => return,
            Patch::Null => SqlValue::Null,
            Patch::Value(v) => v,
        };

        self.assignments.push(format!("{} = ${}", column, self.next_index));
        self.values.push(value);
        self.next_index += 1;
    }

    /// True when no field was supplied; the update is then a no-op
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Number of supplied fields
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// The `a = $2, b = $3` fragment list
    pub fn set_clause(&self) -> String {
        self.assignments.join(", ")
    }

    /// The bound values, in fragment order
    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }
}

fn is_identifier(column: &str) -> bool {
    !column.is_empty()
        && column
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragments_follow_insertion_order() {
        let mut builder = MutationBuilder::starting_at(2);
        builder.push("title", Patch::Value("Terms".into()));
        builder.push("published", Patch::Value(true.into()));
        builder.push("content", Patch::Value("<p>Hi</p>".into()));

        assert_eq!(
            builder.set_clause(),
            "title = $2, published = $3, content = $4"
        );
        assert_eq!(
            builder.into_values(),
            vec![
                SqlValue::Text("Terms".to_string()),
                SqlValue::Bool(true),
                SqlValue::Text("<p>Hi</p>".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_fields_are_skipped() {
        let mut builder = MutationBuilder::starting_at(2);
        builder.push("title", Patch::Missing);
        builder.push("published", Patch::Value(false.into()));
        builder.push("content", Patch::Missing);

        assert_eq!(builder.len(), 1);
        assert_eq!(builder.set_clause(), "published = $2");
    }

    #[test]
    fn test_null_is_a_real_write() {
        let mut builder = MutationBuilder::starting_at(2);
        builder.push("logo_url", Patch::Null);

        assert_eq!(builder.set_clause(), "logo_url = $2");
        assert_eq!(builder.into_values(), vec![SqlValue::Null]);
    }

    #[test]
    fn test_empty_builder_is_a_noop_signal() {
        let mut builder = MutationBuilder::starting_at(2);
        builder.push("title", Patch::Missing);

        assert!(builder.is_empty());
        assert_eq!(builder.set_clause(), "");
        assert!(builder.into_values().is_empty());
    }

    #[test]
    fn test_placeholder_numbering_respects_offset() {
        let mut builder = MutationBuilder::starting_at(5);
        builder.push("name", Patch::Value("News 24".into()));
        assert_eq!(builder.set_clause(), "name = $5");
    }
}
