//! Secure Storage CLI
//!
//! 명령 계층(`commands::secure_store`)을 셸에서 호출하기 위한 얇은 진입점.
//! 결과는 stdout에 JSON으로, 오류는 stderr에 `CommandError` JSON으로 출력한다.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;

use secure_storage::commands::secure_store::{self, SecureSetArgs};
use secure_storage::config::{self, BackendKind, StorageConfig};
use secure_storage::error::{CommandError, CommandResult};
use secure_storage::models::KeychainAccess;

// =====================================
// CLI
// =====================================

#[derive(Parser, Debug)]
#[command(name = "secure-storage-cli")]
#[command(about = "Key-value storage over the OS credential store or a local database")]
#[command(version)]
struct Cli {
    /// 키 접두사 (기본값: 환경 변수 또는 "capacitor-storage_")
    #[arg(long, global = true)]
    prefix: Option<String>,

    /// 동기화 파티션 사용
    #[arg(long, global = true)]
    sync: bool,

    /// 저장소 백엔드 (memory | local | keychain)
    #[arg(long, global = true)]
    backend: Option<BackendKind>,

    /// 로컬 백엔드 DB 파일 경로
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// 로그 상세도 (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 값 읽기
    Get {
        key: String,
        /// 디코딩 없이 저장된 문자열 그대로 출력
        #[arg(long)]
        raw: bool,
        /// ISO 날짜 문자열을 날짜로 변환하지 않음
        #[arg(long)]
        no_convert_date: bool,
    },
    /// 값 저장 (JSON으로 해석되지 않으면 문자열로 저장)
    Set {
        key: String,
        value: String,
        /// 인코딩 없이 문자열 그대로 저장
        #[arg(long)]
        raw: bool,
        /// 키체인 접근 정책
        #[arg(long)]
        access: Option<KeychainAccess>,
    },
    /// 값 삭제
    Remove { key: String },
    /// 현재 접두사 아래의 키 목록
    Keys,
    /// 현재 접두사 아래의 항목 전체 삭제
    Clear,
    /// 현재 키 접두사 출력
    Prefix,
    /// 현재 설정 출력
    Info,
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn to_json<T: serde::Serialize>(value: T) -> CommandResult<Value> {
    serde_json::to_value(value).map_err(|e| CommandError {
        code: "SERIALIZE_ERROR".to_string(),
        message: format!("Failed to serialize output: {}", e),
        details: None,
    })
}

async fn run(cli: Cli) -> CommandResult<Option<Value>> {
    let mut config = StorageConfig::from_env()?;
    if let Some(prefix) = cli.prefix {
        config.key_prefix = prefix;
    }
    if cli.sync {
        config.synchronize = true;
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(path) = cli.db_path {
        config.local_db_path = path;
    }
    secure_store::init(&config)?;

    match cli.command {
        Command::Get {
            key,
            raw,
            no_convert_date,
        } => {
            if raw {
                let value = secure_store::storage_get_item(key).await?;
                return Ok(Some(to_json(value)?));
            }
            let value = secure_store::storage_get(key, Some(!no_convert_date), None).await?;
            Ok(Some(value.unwrap_or(Value::Null)))
        }
        Command::Set {
            key,
            value,
            raw,
            access,
        } => {
            if raw {
                secure_store::storage_set_item(key, value).await?;
                return Ok(None);
            }
            let value = serde_json::from_str::<Value>(&value).unwrap_or(Value::String(value));
            secure_store::storage_set(SecureSetArgs {
                key,
                value,
                convert_date: None,
                sync: None,
                access,
            })
            .await?;
            Ok(None)
        }
        Command::Remove { key } => {
            let removed = secure_store::storage_remove(key, None).await?;
            Ok(Some(Value::Bool(removed)))
        }
        Command::Keys => {
            let keys = secure_store::storage_keys(None).await?;
            Ok(Some(to_json(keys)?))
        }
        Command::Clear => {
            secure_store::storage_clear(None).await?;
            Ok(None)
        }
        Command::Prefix => {
            let prefix = secure_store::storage_get_prefix().await?;
            Ok(Some(Value::String(prefix)))
        }
        Command::Info => {
            let info = secure_store::storage_info().await?;
            Ok(Some(to_json(info)?))
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    config::load_env();

    match run(cli).await {
        Ok(Some(output)) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(err) => {
            let text = serde_json::to_string(&err).unwrap_or_else(|_| err.message.clone());
            eprintln!("{}", text);
            ExitCode::FAILURE
        }
    }
}
