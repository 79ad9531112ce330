use std::{collections::HashMap, sync::Arc};

use crate::sql::types::ValueType;

pub type SchemaRef = Arc<Schema>;

#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    value_type: ValueType,
}

impl Column {
    pub fn new(name: &str, value_type: ValueType) -> Self {
        Self {
            name: name.to_string(),
            value_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }
}

/// Ordered, typed column list with name lookup.
#[derive(Debug, Clone)]
pub struct Schema {
    columns: Vec<Column>,
    index: HashMap<String, usize>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        let index = columns
            .iter()
            .enumerate()
            .map(|(i, col)| (col.name.clone(), i))
            .collect();

        Self { columns, index }
    }

    pub fn shared(columns: Vec<Column>) -> SchemaRef {
        Arc::new(Self::new(columns))
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, index: usize) -> &Column {
        &self.columns[index]
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }

    /// Projection onto the given column positions, used to derive index key
    /// schemas.
    pub fn project(&self, attrs: &[usize]) -> Schema {
        Schema::new(attrs.iter().map(|&i| self.columns[i].clone()).collect())
    }

    /// Concatenation of two schemas, the shape of a join output row.
    pub fn join(left: &Schema, right: &Schema) -> Schema {
        let mut columns = left.columns.clone();
        columns.extend(right.columns.iter().cloned());
        Schema::new(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_and_project() {
        let schema = Schema::new(vec![
            Column::new("id", ValueType::Int),
            Column::new("name", ValueType::Text),
            Column::new("active", ValueType::Bool),
        ]);

        assert_eq!(schema.column_count(), 3);
        assert_eq!(schema.index_of("name"), Some(1));
        assert_eq!(schema.index_of("missing"), None);

        let key = schema.project(&[2, 0]);
        assert_eq!(key.column(0).name(), "active");
        assert_eq!(key.column(1).name(), "id");
    }

    #[test]
    fn test_join_schema() {
        let left = Schema::new(vec![Column::new("a", ValueType::Int)]);
        let right = Schema::new(vec![Column::new("b", ValueType::Text)]);

        let joined = Schema::join(&left, &right);
        assert_eq!(joined.column_count(), 2);
        assert_eq!(joined.column(1).name(), "b");
    }
}
