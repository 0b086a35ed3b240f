use std::io::{BufWriter, Write};

use anyhow::{Context, Result};
use serde::Serialize;

pub(crate) fn write_pretty<T: Serialize + ?Sized>(value: &T, file: std::fs::File) -> Result<()> {
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).context("failed to serialize JSON")?;
    writer.flush()?;
    Ok(())
}
