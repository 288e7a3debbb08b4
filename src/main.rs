use anyhow::{Context, Result};
use beauty_recycle::classifier::{image, Classifier};
use beauty_recycle::cli::{Cli, Commands};
use beauty_recycle::config::Config;
use beauty_recycle::export::Exporter;
use beauty_recycle::server;
use beauty_recycle::store::{ResultStore, INDEX_NAME};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// APIキー表示用（先頭4文字以外を伏せる）
fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    format!("{}****", visible)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 標準出力は結果用、ログは標準エラーへ
    let default_filter = if cli.verbose { "debug" } else { "info,tower_http=warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = Config::load()
        .context("Failed to load configuration")?
        .with_category_policy(cli.category_policy);

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            server::serve(&config).await?;
        }

        Commands::Classify { description, image: image_path, no_save } => {
            let image_bytes = match image_path {
                Some(path) => Some(
                    image::load_image(&path)
                        .with_context(|| format!("Failed to load image {}", path.display()))?,
                ),
                None => None,
            };

            let classifier = Classifier::from_config(&config)?;
            let result = classifier
                .classify(&description, image_bytes.as_deref())
                .await
                .context("Classification failed")?;

            if !no_save && !result.is_empty() {
                let store = ResultStore::connect(&config).await;
                match store.save(&description, &result).await {
                    Some(id) => eprintln!("✔ 保存しました: {}", id),
                    None => eprintln!("⚠ 保存できませんでした（ログを確認してください）"),
                }
            }

            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Export { output_dir } => {
            let dir = output_dir.unwrap_or_else(|| config.export_dir.clone());
            let store = ResultStore::connect(&config).await;
            let path = Exporter::new(store, dir)
                .generate()
                .await
                .context("Failed to export CSV")?;
            println!("{}", path.display());
        }

        Commands::InitIndex => {
            let store = ResultStore::connect(&config).await;
            if !store.is_available() {
                anyhow::bail!("Search index is not available. Check ELASTICSEARCH_URL and ELASTICSEARCH_API_KEY");
            }
            store
                .ensure_index()
                .await
                .with_context(|| format!("Failed to initialize index {}", INDEX_NAME))?;
            println!("✔ インデックス準備完了: {}", INDEX_NAME);
        }

        Commands::Config { set_api_key, show } => {
            if let Some(key) = set_api_key {
                Config::set_api_key(key)?;
                // 環境変数が優先されるため実効値は読み直す
                config = Config::load()?.with_category_policy(cli.category_policy);
                println!("✔ APIキーを保存しました: {}", Config::config_path()?.display());
            }

            if show {
                println!("設定ファイル: {}", Config::config_path()?.display());
                println!("OpenAI APIキー: {}", config.api_key.as_deref().map(mask_secret).unwrap_or_else(|| "(未設定)".into()));
                println!("OpenAI URL: {}", config.openai_base_url);
                println!("モデル: {}", config.model);
                println!("最大トークン: {}", config.max_tokens);
                println!("タイムアウト: {}秒", config.timeout_seconds);
                println!("Elasticsearch URL: {}", config.elasticsearch_url.as_deref().unwrap_or("(未設定)"));
                println!(
                    "Elasticsearch APIキー: {}",
                    config.elasticsearch_api_key.as_deref().map(mask_secret).unwrap_or_else(|| "(未設定)".into())
                );
                println!("区分ポリシー: {}", config.category_policy);
                println!("出力先: {}", config.export_dir.display());
                println!("ポート: {}", config.port);
            }
        }
    }

    Ok(())
}
