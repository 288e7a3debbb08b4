pub mod csv_file;

pub use csv_file::{write_csv, CSV_COLUMNS};

use crate::error::Result;
use crate::store::ResultStore;
use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

/// HTTPダウンロード時のファイル名
pub const DOWNLOAD_FILE_NAME: &str = "recycling_results.csv";

/// 生成時刻入りの出力ファイル名（recycling_results_YYYYmmdd_HHMMSS_mmm.csv）
fn output_file_name() -> String {
    format!("recycling_results_{}.csv", Local::now().format("%Y%m%d_%H%M%S_%3f"))
}

/// 出力ファイルを新規作成（同名があれば連番を付けて再試行）
///
/// 同時に呼ばれても同じパスを返さない。
fn create_output_file(dir: &Path) -> Result<(PathBuf, File)> {
    let name = output_file_name();
    let stem = name.trim_end_matches(".csv").to_string();

    let mut path = dir.join(&name);
    let mut seq = 1;
    loop {
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                path = dir.join(format!("{}_{}.csv", stem, seq));
                seq += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// 最新の分類結果をCSVに出力
#[derive(Clone)]
pub struct Exporter {
    store: ResultStore,
    output_dir: PathBuf,
}

impl Exporter {
    pub fn new(store: ResultStore, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// CSVを生成してパスを返す
    ///
    /// 保存結果がない場合もヘッダーのみのCSVを生成する（エラーにしない）。
    /// エラーになるのはローカルのファイル書き込み失敗のみ。
    pub async fn generate(&self) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;

        let record = self.store.get_latest().await;
        if record.is_none() {
            info!("no stored classification result, exporting header only");
        }

        let (path, file) = create_output_file(&self.output_dir)?;
        let rows = write_csv(file, record.as_ref())?;
        info!(path = %path.display(), rows, "exported CSV");

        Ok(path)
    }
}
