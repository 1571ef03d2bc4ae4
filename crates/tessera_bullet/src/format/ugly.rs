use std::fmt::Write as _;

use tessera_error::Result;

use crate::batch::Batch;
use crate::field::Schema;
use crate::format::{FormatOptions, Formatter};

/// Render a schema and batches as tab separated text, one line per row with
/// a header line of field names.
pub fn ugly_print<'a, I>(schema: &Schema, batches: I) -> Result<String>
where
    I: IntoIterator<Item = &'a Batch>,
{
    const OPTS: FormatOptions = FormatOptions::new();
    let formatter = Formatter::new(OPTS);

    let mut buf = schema
        .iter()
        .map(|f| f.name.clone())
        .collect::<Vec<_>>()
        .join("\t");
    writeln!(buf)?;

    for batch in batches {
        for idx in 0..batch.num_rows() {
            let row = batch
                .columns()
                .iter()
                .map(|col| formatter.format_array_value(col, idx))
                .collect::<Result<Vec<_>>>()?;
            writeln!(buf, "{}", row.join("\t"))?;
        }
    }

    Ok(buf)
}
