//! アップロード画像の読み込みとdata URL化

use crate::error::{RecycleError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::Path;

const FALLBACK_MIME_TYPE: &str = "image/jpeg";

/// 画像バイト列からMIMEタイプを判定（不明ならJPEG扱い）
pub fn detect_mime_type(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or(FALLBACK_MIME_TYPE)
}

/// "data:image/png;base64,..." 形式のdata URLを生成
pub fn to_data_url(bytes: &[u8]) -> String {
    format!("data:{};base64,{}", detect_mime_type(bytes), STANDARD.encode(bytes))
}

/// 画像ファイルを読み込み
pub fn load_image(path: &Path) -> Result<Vec<u8>> {
    if !path.is_file() {
        return Err(RecycleError::FileNotFound(path.display().to_string()));
    }

    let bytes = std::fs::read(path)
        .map_err(|e| RecycleError::ImageLoad(format!("{}: {}", path.display(), e)))?;

    if bytes.is_empty() {
        return Err(RecycleError::ImageLoad(format!("{}: empty file", path.display())));
    }

    Ok(bytes)
}
