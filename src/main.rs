use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use template_filler::{cli, config, error, matcher, pipeline, sources, template};
use cli::{Cli, Commands};
use config::Config;
use error::Result;
use pipeline::{FillRequest, Progress, RunReport};
use template_filler_common::MatchSource;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Fill { template, sources, output, marker, threshold, report: report_path } => {
            println!("📊 template-filler - テンプレート入力\n");

            if let Some(marker) = marker {
                config.marker = marker;
            }
            if let Some(threshold) = threshold {
                config.similarity_threshold = threshold;
            }
            config.validate()?;

            // APIキーがなければ何もせず終了
            let settings = config.matcher_settings(cli.ai_provider)?;
            if cli.verbose {
                println!("  プロバイダ: {} / モデル: {}", cli.ai_provider, settings.model);
            }
            let matcher = matcher::HttpMatcher::new(settings)?;

            let request = FillRequest {
                output: output.unwrap_or_else(|| cli::default_output_path(&template)),
                template,
                sources,
            };
            let options = config.fill_options();
            let verbose = cli.verbose;

            println!("[1/4] データソースを集計中...");
            let mut bar: Option<ProgressBar> = None;
            let report = pipeline::run(&request, &matcher, &options, |progress| match progress {
                Progress::Aggregated(fields) => {
                    println!("✔ {}件のフィールドを集計\n", fields.len());
                    println!("[2/4] テンプレートを走査中...");
                }
                Progress::Scanned(placeholders) => {
                    println!("✔ {}件のプレースホルダを検出\n", placeholders.len());
                    println!("[3/4] AI照合中...");
                    bar = Some(progress_bar(placeholders.len() as u64, verbose));
                }
                Progress::Processed { index, total, outcome } => {
                    if verbose {
                        let target = match (&outcome.field, outcome.source) {
                            (Some(field), Some(source)) => format!("{} ({})", field, source),
                            _ => "未解決".to_string(),
                        };
                        println!("  [{}/{}] {} → {}", index + 1, total, outcome.placeholder.label, target);
                        if let Some(reason) = &outcome.reason {
                            println!("        {}", reason);
                        }
                    }
                    if let Some(bar) = &bar {
                        bar.inc(1);
                    }
                    if index + 1 == total {
                        if let Some(bar) = bar.take() {
                            bar.finish_and_clear();
                        }
                        println!("✔ 照合完了\n");
                        println!("[4/4] 結果を保存中...");
                    }
                }
                Progress::Saved(path) => println!("✔ 保存: {}", path.display()),
            })
            .await?;

            print_summary(&report);

            if let Some(path) = report_path {
                let json = serde_json::to_string_pretty(&report)?;
                std::fs::write(&path, json)?;
                println!("\n✔ レポートを保存: {}", path.display());
            }

            println!("\n✅ 完了");
        }

        Commands::Scan { template, marker } => {
            let marker = marker.unwrap_or(config.marker);
            let workbook = template::TemplateWorkbook::load(&template)?;
            let placeholders = template::scan_placeholders(&workbook, marker);

            println!("プレースホルダ ({}件):", placeholders.len());
            for p in &placeholders {
                println!("  {:<16} {}", p.cell.to_string(), p.label);
            }
        }

        Commands::Fields { sources } => {
            let fields = sources::aggregate_sources(&sources, &config.source_schemas)?;

            println!("フィールド ({}件):", fields.len());
            for field in fields.iter() {
                println!("  {}: {}", field.name, field.value);
            }
        }

        Commands::Config { set_api_key, show } => {
            if let Some(key) = set_api_key {
                config.set_api_key(key, cli.config.as_deref())?;
                println!("✔ APIキーを設定しました");
            }

            if show {
                let provider = cli.ai_provider;
                println!("設定:");
                println!("  プロバイダ: {}", provider);
                println!("  モデル: {}", config.model.as_deref().unwrap_or(provider.default_model()));
                println!("  エンドポイント: {}", config.endpoint.as_deref().unwrap_or(provider.endpoint()));
                println!("  マーカー: {}", config.marker);
                println!("  類似度閾値: {}", config.similarity_threshold);
                println!("  書き込み列オフセット: {}", config.value_column_offset);
                println!("  小数桁数: {}", config.decimals);
                println!("  再試行: {}回 (待機 {}秒単位)", config.max_retries, config.backoff_seconds);
                println!("  APIキー: {}", if config.get_api_key(provider).is_ok() { "設定済み" } else { "未設定" });
                println!("  妥当性ルール:");
                for rule in config.plausibility_rules.rules() {
                    println!("    - {}", rule);
                }
            }
        }
    }

    Ok(())
}

/// ログ出力（RUST_LOG があれば優先、なければ warn / --verbose で debug）
///
/// ライブラリ側の `log` マクロは tracing-log 経由でここに流れる。
fn init_logger(verbose: bool) {
    let default = if verbose {
        "warn,template_filler=debug,template_filler_common=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn progress_bar(len: u64, verbose: bool) -> ProgressBar {
    if verbose {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::with_template("  {bar:40} {pos}/{len} {msg}") {
        bar.set_style(style);
    }
    bar
}

fn print_summary(report: &RunReport) {
    println!("\n照合結果:");
    for (label, field) in report.mappings() {
        println!("  → {} → {}", label, field);
    }

    println!();
    println!("  書き込み: {}/{}件 (AI: {}, フォールバック: {})",
        report.filled_count(),
        report.total(),
        report.count_by_source(MatchSource::Ai),
        report.count_by_source(MatchSource::Fallback),
    );
    println!("  照合率: {:.2}%", report.match_rate());

    let unresolved = report.unresolved();
    if !unresolved.is_empty() {
        println!("\n⚠ 未解決のプレースホルダ（手入力が必要）:");
        for outcome in unresolved {
            println!("  - {} ({})", outcome.placeholder.label, outcome.placeholder.cell);
            if let Some(reason) = &outcome.reason {
                println!("      {}", reason);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logger_twice_is_harmless() {
        init_logger(true);
        init_logger(false);
        log::warn!("logger installed");
    }
}
