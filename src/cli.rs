use clap::{Parser, Subcommand};
use crate::ai_provider::AiProvider;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "template-filler")]
#[command(about = "集計データでExcelテンプレートのプレースホルダを埋めるツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// AIプロバイダ (groq/openai)
    #[arg(long, default_value = "groq", global = true)]
    pub ai_provider: AiProvider,

    /// 設定ファイル（省略時: ~/.config/template-filler/config.json）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// テンプレートのプレースホルダを集計値で埋めて保存
    Fill {
        /// テンプレートExcelファイル
        #[arg(required = true)]
        template: PathBuf,

        /// データソースCSV（複数指定可）
        #[arg(short, long, required = true, num_args = 1..)]
        sources: Vec<PathBuf>,

        /// 出力ファイル（デフォルト: テンプレート名_filled.xlsx）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// プレースホルダのマーカー文字
        #[arg(long)]
        marker: Option<char>,

        /// フォールバック照合の類似度閾値（0.0-1.0）
        #[arg(long)]
        threshold: Option<f64>,

        /// 実行結果をJSONで保存
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// プレースホルダを一覧表示（照合はしない）
    Scan {
        /// テンプレートExcelファイル
        #[arg(required = true)]
        template: PathBuf,

        /// プレースホルダのマーカー文字
        #[arg(long)]
        marker: Option<char>,
    },

    /// データソースの集計結果を表示
    Fields {
        /// データソースCSV
        #[arg(required = true)]
        sources: Vec<PathBuf>,
    },

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

/// 出力ファイルの既定パス（テンプレートと同じフォルダの `<名前>_filled.xlsx`）
pub fn default_output_path(template: &Path) -> PathBuf {
    let stem = template
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("template");
    let parent = template.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!("{}_filled.xlsx", stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("Template File/template.xlsx")),
            PathBuf::from("Template File/template_filled.xlsx")
        );
        assert_eq!(
            default_output_path(Path::new("report.xlsm")),
            PathBuf::from("report_filled.xlsx")
        );
    }

    #[test]
    fn test_parse_fill_command() {
        let cli = Cli::try_parse_from([
            "template-filler",
            "fill",
            "template.xlsx",
            "-s",
            "a.csv",
            "b.csv",
            "--marker",
            "#",
            "--ai-provider",
            "openai",
        ])
        .unwrap();

        assert_eq!(cli.ai_provider, AiProvider::OpenAi);
        match cli.command {
            Commands::Fill { template, sources, marker, output, .. } => {
                assert_eq!(template, PathBuf::from("template.xlsx"));
                assert_eq!(sources.len(), 2);
                assert_eq!(marker, Some('#'));
                assert!(output.is_none());
            }
            _ => panic!("fill以外のコマンド"),
        }
    }
}
