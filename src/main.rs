// 声明项目中的模块
mod config; // 配置文件的加载与保存
mod model; // 数据模型定义
mod scanner; // CodeQL 扫描调用逻辑

use anyhow::Result;
use clap::{Parser, Subcommand};
use model::Language;
use std::path::PathBuf;
use tracing::info;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// 日志级别 (trace/debug/info/warn/error)
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 扫描指定的代码项目目录，并打印生成的报告
    Scan {
        /// 代码项目目录
        #[clap(short, long)]
        dir: PathBuf,
        /// 项目语言 (Java/Python/JavaScript/Go)
        #[clap(short = 'L', long)]
        language: Language,
    },
    /// 查看或修改配置
    Config {
        #[clap(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// 打印当前配置（temp_dir 已解析为绝对路径）
    Show,
    /// 修改单个配置项并保存
    /// 例如: config set codeql.path /usr/local/bin/codeql
    Set { key: String, value: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    // 启动时加载配置，文件缺失或格式错误直接中止
    let mut config = config::load()?;

    match cli.command {
        Commands::Scan { dir, language } => {
            info!("开始扫描: {} ({})", dir.display(), language);
            let report = scanner::scan(&config, &scanner::SystemRunner, &dir, language)?;
            print!("{}", report);
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
            ConfigCommands::Set { key, value } => {
                config::set_field(&mut config, &key, &value)?;
                config::save(&config)?;
                println!("配置已保存");
            }
        },
    }

    Ok(())
}

fn setup_logging(log_level: &Option<String>) {
    let log_level = match log_level
        .as_ref()
        .unwrap_or(&"info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level.to_string()))
        .without_time()
        .init();
}
