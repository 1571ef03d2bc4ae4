use std::collections::BTreeMap;

use crate::datatype::DataType;

/// A named field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub datatype: DataType,
    pub nullable: bool,
    /// Custom key/value metadata.
    pub metadata: BTreeMap<String, String>,
}

impl Field {
    pub fn new(name: impl Into<String>, datatype: DataType, nullable: bool) -> Self {
        Field {
            name: name.into(),
            datatype,
            nullable,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Represents the full schema of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    pub fields: Vec<Field>,
    pub metadata: BTreeMap<String, String>,
}

impl Schema {
    pub fn new(fields: impl IntoIterator<Item = Field>) -> Self {
        Schema {
            fields: fields.into_iter().collect(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn field(&self, idx: usize) -> Option<&Field> {
        self.fields.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }
}

/// Builds a schema in field insertion order.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<Field>,
    metadata: BTreeMap<String, String>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_field(mut self, name: impl Into<String>, datatype: DataType, nullable: bool) -> Self {
        self.fields.push(Field::new(name, datatype, nullable));
        self
    }

    /// Add an already constructed field, keeping its metadata.
    pub fn push_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn add_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn finish(self) -> Schema {
        Schema {
            fields: self.fields,
            metadata: self.metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_insertion_order() {
        let schema = SchemaBuilder::new()
            .add_field("b", DataType::Utf8, true)
            .add_field("a", DataType::Int32, false)
            .add_metadata("k", "v")
            .finish();

        let names: Vec<_> = schema.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(vec!["b", "a"], names);
        assert!(!schema.field(1).unwrap().nullable);
        assert_eq!(Some("v"), schema.metadata.get("k").map(|s| s.as_str()));
    }
}
