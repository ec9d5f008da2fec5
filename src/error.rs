use thiserror::Error;

#[derive(Error, Debug)]
pub enum FillerError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("APIキーが設定されていません。環境変数 {0} を設定するか `template-filler config --set-api-key YOUR_KEY` で設定してください")]
    MissingApiKey(&'static str),

    #[error("データソースを読み込めません: {path}: {reason}")]
    SourceLoad { path: String, reason: String },

    #[error("テンプレートを読み込めません: {path}: {reason}")]
    TemplateLoad { path: String, reason: String },

    #[error("テンプレートにプレースホルダ（'{marker}'で始まるセル）がありません: {path}")]
    NoPlaceholders { path: String, marker: char },

    #[error("照合APIを利用できません: {0}")]
    MatcherUnavailable(String),

    #[error("照合APIレスポンスのパースに失敗: {0}")]
    ApiParse(String),

    #[error("妥当な照合先が見つかりません: {0}")]
    NoAcceptableMatch(String),

    #[error("出力ファイルを保存できません: {path}: {reason}")]
    Write { path: String, reason: String },

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] template_filler_common::Error),
}

impl FillerError {
    /// 実行全体を中断するファイル単位のエラーか
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            FillerError::MatcherUnavailable(_)
                | FillerError::ApiParse(_)
                | FillerError::NoAcceptableMatch(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FillerError>;
