use std::sync::Arc;

use tessera_error::{ErrorKind, Result, TesseraError};

use crate::array::{Array, ArrayData};
use crate::datatype::DataType;
use crate::field::{Field, Schema};

/// Check that a non-nullable field holds no nulls.
///
/// Struct children are checked too. Child slots under a null struct value
/// are not counted.
pub(crate) fn check_field_nulls(field: &Field, col: &Array) -> Result<()> {
    check_nulls_under(field, col, &vec![true; col.len()])
}

fn check_nulls_under(field: &Field, col: &Array, visible: &[bool]) -> Result<()> {
    let is_struct = matches!(field.datatype, DataType::Struct(_));
    if !is_struct && (field.nullable || col.null_count() == 0) {
        return Ok(());
    }

    let mut valid = Vec::with_capacity(visible.len());
    let mut nulls = 0;
    for (idx, &vis) in visible.iter().enumerate() {
        let is_valid = col.is_valid(idx).unwrap_or(false);
        if vis && !is_valid {
            nulls += 1;
        }
        valid.push(vis && is_valid);
    }

    if !field.nullable && nulls > 0 {
        return Err(TesseraError::of_kind(
            ErrorKind::SchemaViolation,
            format!("Non-nullable field '{}' contains {nulls} nulls", field.name),
        ));
    }

    if let (DataType::Struct(meta), ArrayData::Struct(storage)) = (&field.datatype, col.array_data())
    {
        for (child_field, child) in meta.fields.iter().zip(storage.children()) {
            check_nulls_under(child_field, child, &valid)?;
        }
    }

    Ok(())
}

/// A batch of same-length arrays conforming to a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    schema: Arc<Schema>,

    /// Columns that make up this batch.
    cols: Vec<Array>,

    /// Number of rows in this batch. Needed to allow for a batch that has no
    /// columns but a non-zero number of rows.
    num_rows: usize,
}

impl Batch {
    /// Create a new batch from a schema and its columns.
    ///
    /// The number of rows is taken from the first column.
    pub fn try_new(schema: impl Into<Arc<Schema>>, cols: Vec<Array>) -> Result<Self> {
        let num_rows = cols.first().map(|c| c.len()).unwrap_or(0);
        Self::try_new_with_num_rows(schema, cols, num_rows)
    }

    /// Create a new batch with an explicit number of rows.
    ///
    /// Columns must conform to the schema: one column per field, each of
    /// `num_rows` length with a type assignable to the field's type, and no
    /// nulls in non-nullable fields.
    pub fn try_new_with_num_rows(
        schema: impl Into<Arc<Schema>>,
        cols: Vec<Array>,
        num_rows: usize,
    ) -> Result<Self> {
        let schema = schema.into();

        if schema.num_fields() != cols.len() {
            return Err(TesseraError::of_kind(
                ErrorKind::SchemaViolation,
                format!(
                    "Schema has {} fields, batch has {} columns",
                    schema.num_fields(),
                    cols.len()
                ),
            ));
        }

        for (idx, col) in cols.iter().enumerate() {
            if col.len() != num_rows {
                return Err(TesseraError::of_kind(
                    ErrorKind::LengthMismatch,
                    format!(
                        "Expected column length to be {num_rows}, got {}. Column idx: {idx}",
                        col.len()
                    ),
                ));
            }
        }

        for (field, col) in schema.iter().zip(&cols) {
            if !col.datatype().is_assignable_to(&field.datatype) {
                return Err(TesseraError::of_kind(
                    ErrorKind::TypeMismatch,
                    format!(
                        "Column of type {} not assignable to field '{}' of type {}",
                        col.datatype(),
                        field.name,
                        field.datatype
                    ),
                ));
            }
            check_field_nulls(field, col)?;
        }

        Ok(Batch {
            schema,
            cols,
            num_rows,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn schema_ref(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn column(&self, idx: usize) -> Option<&Array> {
        self.cols.get(idx)
    }

    pub fn columns(&self) -> &[Array] {
        &self.cols
    }

    pub fn num_columns(&self) -> usize {
        self.cols.len()
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn into_arrays(self) -> Vec<Array> {
        self.cols
    }
}

/// Assembles a batch from named columns.
#[derive(Debug, Default)]
pub struct BatchBuilder {
    columns: Vec<(String, Array)>,
    schema: Option<Arc<Schema>>,
}

impl BatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_column(mut self, name: impl Into<String>, array: Array) -> Self {
        self.columns.push((name.into(), array));
        self
    }

    /// Validate columns against an explicit schema instead of inferring one.
    pub fn with_schema(mut self, schema: impl Into<Arc<Schema>>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn finish(self) -> Result<Batch> {
        let num_rows = self.columns.first().map(|(_, c)| c.len()).unwrap_or(0);
        for (name, col) in &self.columns {
            if col.len() != num_rows {
                return Err(TesseraError::of_kind(
                    ErrorKind::LengthMismatch,
                    format!(
                        "Column '{name}' has length {}, expected {num_rows}",
                        col.len()
                    ),
                ));
            }
        }

        let schema = match self.schema {
            Some(schema) => schema,
            None => Arc::new(Schema::new(self.columns.iter().map(|(name, col)| {
                Field::new(name.clone(), col.datatype().clone(), col.null_count() > 0)
            }))),
        };

        let cols = self.columns.into_iter().map(|(_, col)| col).collect();
        Batch::try_new_with_num_rows(schema, cols, num_rows)
    }
}
