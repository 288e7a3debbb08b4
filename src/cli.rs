use beauty_recycle_common::CategoryPolicy;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "beauty-recycle")]
#[command(about = "化粧品パッケージのリサイクル区分AI分類・CSV出力ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 未知の廃棄区分の扱い (strict/passthrough)
    #[arg(long, global = true)]
    pub category_policy: Option<CategoryPolicy>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// HTTPサーバを起動（/api/classify, /api/export-csv）
    Serve {
        /// 待ち受けポート（省略時は設定値）
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// 製品説明を分類してJSONを出力
    Classify {
        /// 製品説明
        #[arg(required = true)]
        description: String,

        /// 製品写真
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// 検索インデックスに保存しない
        #[arg(long)]
        no_save: bool,
    },

    /// 最新の分類結果をCSVに出力
    Export {
        /// 出力ディレクトリ（省略時は設定値）
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// 検索インデックスを作成（既存ならそのまま）
    InitIndex,

    /// 設定を表示/編集
    Config {
        /// APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}
