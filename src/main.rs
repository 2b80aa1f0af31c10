use anyhow::{bail, Context};
use chrono::{DateTime, Local};
use clap::Parser;
use dialoguer::Confirm;
use futures::StreamExt;
use indicatif::ProgressBar;
use pantry_scan::backend::GeminiBackend;
use pantry_scan::pipeline::{InventoryPipeline, PipelineOptions};
use pantry_scan::preprocess::{ImageSource, PreprocessOptions, Rotation};
use pantry_scan::store::{InventoryStore, JsonStore};
use pantry_scan::{cli, config, error, scanner};
use pantry_scan_common::{normalize_detections, parse_detection_response, CanonicalItem};
use cli::{Cli, Commands};
use config::Config;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "pantry_scan=debug,pantry_scan_common=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(config: &Config) -> anyhow::Result<JsonStore> {
    let path = config.resolved_store_path()?;
    JsonStore::open(&path).with_context(|| format!("在庫ファイルを開けません: {}", path.display()))
}

fn print_items(items: &[CanonicalItem]) {
    if items.is_empty() {
        println!("（アイテムなし）");
        return;
    }
    for item in items {
        let added = DateTime::from_timestamp_millis(item.added_at)
            .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!(
            "{}  {:<20} {:<11} x{:<3} {:.2}  {}",
            item.id, item.name, item.category, item.quantity, item.confidence, added
        );
    }
}

async fn current_items(store: &JsonStore) -> Vec<CanonicalItem> {
    store.get_all().next().await.unwrap_or_default()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = Config::load()?;

    match cli.command {
        Commands::Scan { paths, dry_run, threshold, rotate } => {
            println!("🧊 pantry-scan - 在庫スキャン\n");

            // 1. 画像読み込み
            println!("[1/3] 写真を読み込み中...");
            let files = scanner::collect_images(&paths)?;
            if files.is_empty() {
                return Err(error::PantryScanError::NoImagesFound(
                    paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "),
                )
                .into());
            }

            let mut sources = Vec::with_capacity(files.len());
            for path in &files {
                let mut source = ImageSource::from_file(path)
                    .with_context(|| format!("読み込み失敗: {}", path.display()))?;
                if let Some(degrees) = rotate {
                    source.rotation = Rotation::from_degrees(degrees);
                }
                sources.push(source);
            }
            println!("✔ {}枚の写真を検出\n", sources.len());

            // 2. 解析
            println!("[2/3] AI解析中...{}", if dry_run { " (ドライラン)" } else { "" });
            let backend = Arc::new(GeminiBackend::from_config(&config)?);
            let store = Arc::new(open_store(&config)?);
            let options = PipelineOptions {
                preprocess: PreprocessOptions {
                    max_dimension: config.max_image_dimension,
                    quality: config.jpeg_quality,
                },
                confidence_threshold: threshold.unwrap_or(config.confidence_threshold),
            };
            let pipeline = InventoryPipeline::new(backend, store, options);

            let spinner = ProgressBar::new_spinner();
            spinner.set_message("Vision API 応答待ち");
            spinner.enable_steady_tick(Duration::from_millis(100));
            let result = if dry_run {
                pipeline.analyze(sources).await
            } else {
                pipeline.scan(sources).await
            };
            spinner.finish_and_clear();
            let items = result?;
            println!("✔ {}件の食品を検出\n", items.len());

            // 3. 結果
            println!("[3/3] 結果");
            print_items(&items);

            if dry_run {
                println!("\n✅ 解析完了（在庫には登録していません）");
            } else {
                println!("\n✅ 在庫に登録しました");
            }
        }

        Commands::Parse { input, threshold } => {
            let content = std::fs::read_to_string(&input)
                .with_context(|| format!("読み込み失敗: {}", input.display()))?;
            let detections = parse_detection_response(Some(&content))?;
            let items = normalize_detections(
                &detections,
                threshold.unwrap_or(config.confidence_threshold),
            );
            println!("検出 {}件 → 在庫 {}件", detections.len(), items.len());
            print_items(&items);
        }

        Commands::List => {
            let store = open_store(&config)?;
            print_items(&current_items(&store).await);
        }

        Commands::Search { query } => {
            let store = open_store(&config)?;
            let items = store.search(&query).next().await.unwrap_or_default();
            print_items(&items);
        }

        Commands::Add { name, category, quantity } => {
            let store = open_store(&config)?;
            let item = CanonicalItem::manual(name.trim(), category, quantity);
            store.insert(item.clone()).await?;
            println!("✔ 追加しました: {} ({})", item.name, item.id);
        }

        Commands::Adjust { id, delta } => {
            let store = open_store(&config)?;
            let Some(item) = store.get_by_id(id).await? else {
                bail!("アイテムが見つかりません: {}", id);
            };
            let updated = item.with_quantity_delta(delta);
            store.update(updated.clone()).await?;
            println!("✔ {}: {} → {}", updated.name, item.quantity, updated.quantity);
        }

        Commands::Remove { id } => {
            let store = open_store(&config)?;
            let Some(item) = store.get_by_id(id).await? else {
                bail!("アイテムが見つかりません: {}", id);
            };
            store.delete(&item).await?;
            println!("✔ 削除しました: {}", item.name);
        }

        Commands::Clear { yes } => {
            let store = open_store(&config)?;
            let count = current_items(&store).await.len();
            if count == 0 {
                println!("在庫は空です");
                return Ok(());
            }

            let confirmed = yes
                || Confirm::new()
                    .with_prompt(format!("在庫{}件をすべて削除しますか？", count))
                    .default(false)
                    .interact()?;

            if confirmed {
                store.delete_all().await?;
                println!("✔ {}件を削除しました", count);
            } else {
                println!("キャンセルしました");
            }
        }

        Commands::Config { set_api_key, show } => {
            let mut config = config;

            if let Some(key) = set_api_key {
                config.set_api_key(key)?;
                println!("✔ APIキーを設定しました");
            }

            if show {
                println!("設定:");
                println!("  モデル: {}", config.model);
                println!("  最大画像サイズ: {}px", config.max_image_dimension);
                println!("  JPEG品質: {}", config.jpeg_quality);
                println!("  信頼度の閾値: {}", config.confidence_threshold);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  在庫ファイル: {}", config.resolved_store_path()?.display());
                println!("  APIキー: {}", config.masked_api_key());
            }
        }
    }

    Ok(())
}
