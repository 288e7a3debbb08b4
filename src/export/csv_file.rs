//! CSV生成
//!
//! 1レコード分の部品を1行ずつ出力する。ヘッダー行は常に出力。

use crate::error::Result;
use crate::store::StoredRecord;
use beauty_recycle_common::ClassificationComponent;
use serde::Serialize;
use std::io::Write;
use tracing::warn;

pub const CSV_COLUMNS: [&str; 5] = [
    "product_name",
    "component_name",
    "material",
    "disposal_category",
    "classification_explanation",
];

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    product_name: &'a str,
    component_name: &'a str,
    material: &'a str,
    disposal_category: &'a str,
    classification_explanation: &'a str,
}

impl<'a> CsvRow<'a> {
    fn new(product_name: &'a str, component: &'a ClassificationComponent) -> Self {
        Self {
            product_name,
            component_name: &component.component_name,
            material: &component.material,
            disposal_category: component.disposal_category.as_str(),
            classification_explanation: &component.classification_explanation,
        }
    }
}

/// レコードをCSVとして書き出し、データ行数を返す
///
/// レコードなし、または部品リストが復元できない場合はヘッダーのみ。
pub fn write_csv<W: Write>(writer: W, record: Option<&StoredRecord>) -> Result<usize> {
    let mut csv_writer = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    csv_writer.write_record(CSV_COLUMNS)?;

    let components = match record.map(StoredRecord::components) {
        Some(Ok(components)) => components,
        Some(Err(e)) => {
            warn!(error = %e, "stored classification result is unreadable, exporting header only");
            Vec::new()
        }
        None => Vec::new(),
    };

    let product_name = record.map(|r| r.product_description.as_str()).unwrap_or_default();
    for component in &components {
        csv_writer.serialize(CsvRow::new(product_name, component))?;
    }

    csv_writer.flush()?;
    Ok(components.len())
}
