use crate::ai_provider::AiProvider;
use crate::error::{FillerError, Result};
use crate::matcher::HttpMatcherSettings;
use crate::pipeline::FillOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use template_filler_common::{RuleSet, SourceSchema};

/// プレースホルダの既定マーカー
pub const DEFAULT_MARKER: char = '◦';

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    /// 省略時はプロバイダの既定モデル
    pub model: Option<String>,
    /// 省略時はプロバイダの既定エンドポイント
    pub endpoint: Option<String>,
    pub marker: char,
    pub similarity_threshold: f64,
    /// 値を書き込む列（プレースホルダ列からのオフセット）
    pub value_column_offset: u16,
    /// 書き込む値の小数桁数
    pub decimals: u32,
    pub temperature: f32,
    /// 429（レート制限）時の再試行回数
    pub max_retries: u32,
    pub backoff_seconds: u64,
    pub timeout_seconds: u64,
    pub source_schemas: Vec<SourceSchema>,
    pub plausibility_rules: RuleSet,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    /// 設定を読み込む（`path` 省略時は既定パス、ファイルがなければ既定値）
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else if path.is_some() {
            Err(FillerError::Config(format!(
                "設定ファイルが見つかりません: {}",
                config_path.display()
            )))
        } else {
            Ok(Self::default_config())
        }
    }

    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| FillerError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("template-filler").join("config.json"))
    }

    fn default_config() -> Self {
        Self {
            api_key: None,
            model: None,
            endpoint: None,
            marker: DEFAULT_MARKER,
            similarity_threshold: 0.4,
            value_column_offset: 1,
            decimals: 2,
            temperature: 0.2,
            max_retries: 3,
            backoff_seconds: 1,
            timeout_seconds: 60,
            source_schemas: SourceSchema::defaults(),
            plausibility_rules: RuleSet::defaults(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(FillerError::Config(format!(
                "similarity_threshold は 0.0〜1.0 で指定してください: {}",
                self.similarity_threshold
            )));
        }
        if self.marker.is_whitespace() {
            return Err(FillerError::Config("marker に空白文字は使えません".into()));
        }
        if self.value_column_offset == 0 {
            return Err(FillerError::Config(
                "value_column_offset が0だとプレースホルダ自身を上書きします".into(),
            ));
        }
        Ok(())
    }

    /// APIキーを取得（環境変数を優先）
    pub fn get_api_key(&self, provider: AiProvider) -> Result<String> {
        let from_env = std::env::var(provider.api_key_env()).ok();
        self.resolve_api_key(provider, from_env)
    }

    fn resolve_api_key(&self, provider: AiProvider, from_env: Option<String>) -> Result<String> {
        from_env
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|k| !k.trim().is_empty()))
            .ok_or(FillerError::MissingApiKey(provider.api_key_env()))
    }

    pub fn set_api_key(&mut self, key: String, path: Option<&Path>) -> Result<()> {
        self.api_key = Some(key);
        self.save(path)
    }

    /// パイプラインに渡す設定
    pub fn fill_options(&self) -> FillOptions {
        FillOptions {
            marker: self.marker,
            similarity_threshold: self.similarity_threshold,
            value_column_offset: self.value_column_offset,
            decimals: self.decimals,
            rules: self.plausibility_rules.clone(),
            source_schemas: self.source_schemas.clone(),
        }
    }

    /// 照合APIアダプタの設定（APIキー必須）
    pub fn matcher_settings(&self, provider: AiProvider) -> Result<HttpMatcherSettings> {
        let api_key = self.get_api_key(provider)?;
        Ok(HttpMatcherSettings {
            endpoint: self
                .endpoint
                .clone()
                .unwrap_or_else(|| provider.endpoint().to_string()),
            model: self
                .model
                .clone()
                .unwrap_or_else(|| provider.default_model().to_string()),
            api_key,
            temperature: self.temperature,
            max_retries: self.max_retries,
            backoff: Duration::from_secs(self.backoff_seconds),
            timeout: Duration::from_secs(self.timeout_seconds),
        })
    }
}
