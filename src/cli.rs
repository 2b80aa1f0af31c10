use clap::{Parser, Subcommand};
use pantry_scan_common::CategoryTag;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "pantry-scan")]
#[command(about = "冷蔵庫・食品棚の写真から在庫リストを作るツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 写真を解析して在庫に登録
    Scan {
        /// 写真ファイルまたはフォルダ（複数可）
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// 解析結果を表示するだけで登録しない
        #[arg(long)]
        dry_run: bool,

        /// 信頼度の閾値（0.0-1.0、省略時は設定値）
        #[arg(long)]
        threshold: Option<f32>,

        /// 回転角を指定（EXIFより優先、0/90/180/270）
        #[arg(long, allow_negative_numbers = true)]
        rotate: Option<i32>,
    },

    /// 保存済みのVision APIレスポンスを正規化して表示
    Parse {
        /// レスポンステキストのファイル
        #[arg(required = true)]
        input: PathBuf,

        /// 信頼度の閾値（0.0-1.0、省略時は設定値）
        #[arg(long)]
        threshold: Option<f32>,
    },

    /// 在庫一覧
    List,

    /// 名前で検索
    Search {
        /// 検索文字列（部分一致）
        #[arg(required = true)]
        query: String,
    },

    /// 手動でアイテムを追加
    Add {
        /// 食品名
        #[arg(required = true)]
        name: String,

        /// カテゴリ (dairy/meat/vegetables/fruits/beverages/condiments/leftovers/snacks/frozen/other)
        #[arg(short, long, default_value = "other", value_parser = parse_category)]
        category: CategoryTag,

        /// 数量
        #[arg(short, long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
        quantity: u32,
    },

    /// 数量を増減（最小1）
    Adjust {
        /// アイテムID
        #[arg(required = true)]
        id: Uuid,

        /// 増減数（例: 2, -1）
        #[arg(required = true, allow_negative_numbers = true)]
        delta: i64,
    },

    /// アイテムを削除
    Remove {
        /// アイテムID
        #[arg(required = true)]
        id: Uuid,
    },

    /// 在庫をすべて削除
    Clear {
        /// 確認なしで削除
        #[arg(short, long)]
        yes: bool,
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

/// カテゴリ引数のパース（不明な値はエラー）
pub fn parse_category(value: &str) -> Result<CategoryTag, String> {
    CategoryTag::ALL
        .into_iter()
        .find(|tag| tag.name().eq_ignore_ascii_case(value))
        .ok_or_else(|| {
            format!(
                "Unknown category: {}. Use one of: {}",
                value,
                pantry_scan_common::prompts::category_list()
            )
        })
}
