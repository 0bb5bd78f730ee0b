//! tpack: 번역 팩 관리 CLI

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use tpack_lib::commands::build::{builds, export, ExportArgs};
use tpack_lib::commands::category::{rename_category, RenameCategoryArgs};
use tpack_lib::commands::matcher::{
    create_matcher, delete_matcher, get_matcher, list_categories, list_matchers,
    update_matcher, CreateMatcherArgs, DeleteMatcherArgs, ListMatchersArgs, UpdateMatcherArgs,
};
use tpack_lib::commands::stats::{recent_activity, user_activity};
use tpack_lib::commands::translation::{
    add_translation, delete_translation, import, list_sources, list_translations,
    translate_preview, AddTranslationArgs, DeleteTranslationArgs, ImportArgs,
    ListTranslationsArgs, TranslatePreviewArgs,
};
use tpack_lib::commands::AppState;
use tpack_lib::error::{CommandError, CommandResult};
use tpack_lib::models::{GroupEntry, MatcherDraft};
use tpack_lib::server::StaticServer;

#[derive(Parser)]
#[command(name = "tpack", version, about = "Translation matcher store and pack builder")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// DB 스키마 생성
    Init,
    /// 매처 관리
    Matcher {
        #[command(subcommand)]
        command: MatcherCommands,
    },
    /// 원문 관리
    Source {
        #[command(subcommand)]
        command: SourceCommands,
    },
    /// packs 디렉터리 일괄 임포트
    Import {
        /// 기본값: PACKS_DIR
        dir: Option<PathBuf>,
    },
    /// latest.json / 그래프 생성
    Export {
        /// 타임스탬프 사본도 남김
        #[arg(long)]
        snapshot: bool,
    },
    /// 빌드 파일 목록
    Builds,
    /// 카테고리 일괄 변경
    Rename {
        old: String,
        new: String,
        #[arg(long)]
        dry_run: bool,
        #[arg(long, default_value = "cli")]
        actor: String,
    },
    /// 사용자 활동 집계
    Stats {
        /// 최근 감사 로그 N건도 출력
        #[arg(long)]
        recent: Option<usize>,
    },
    /// 번역 미리보기
    Translate {
        #[arg(long)]
        lang: String,
        /// 원문 source (카테고리)
        #[arg(long)]
        source: String,
        /// 이 문자열만 번역
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// build 디렉터리 정적 서버
    Serve {
        /// 기본값: BIND_ADDR
        #[arg(long)]
        bind: Option<String>,
    },
}

#[derive(Subcommand)]
enum MatcherCommands {
    Add(MatcherInput),
    Update {
        id: i64,
        #[command(flatten)]
        input: MatcherInput,
    },
    Delete {
        id: i64,
        #[arg(long, default_value = "cli")]
        actor: String,
    },
    List {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        search: Option<String>,
    },
    Show {
        id: i64,
    },
    /// 카테고리 목록
    Categories,
}

#[derive(Args)]
struct MatcherInput {
    /// MatcherDraft JSON 파일. 다른 옵션이 값을 덮어씀
    #[arg(long)]
    from_json: Option<PathBuf>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long, conflicts_with = "regex")]
    raw: Option<String>,
    #[arg(long)]
    regex: Option<String>,
    #[arg(long, requires = "regex")]
    flags: Option<String>,
    /// lang=text (여러 번)
    #[arg(long = "value", value_name = "LANG=TEXT")]
    values: Vec<String>,
    /// groups JSON (ex: '[["monster"], "item"]')
    #[arg(long)]
    groups: Option<String>,
    #[arg(long)]
    priority: Option<i64>,
    #[arg(long)]
    ignore_part_translated: Option<bool>,
    #[arg(long)]
    memo: Option<String>,
    #[arg(long, default_value = "cli")]
    actor: String,
}

#[derive(Subcommand)]
enum SourceCommands {
    Add {
        source: String,
        content: String,
        #[arg(long, default_value = "cli")]
        actor: String,
    },
    Delete {
        id: i64,
        #[arg(long, default_value = "cli")]
        actor: String,
    },
    List {
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        page: Option<usize>,
        #[arg(long)]
        per_page: Option<usize>,
        /// COUNT(*) 생략
        #[arg(long)]
        fast: bool,
    },
    /// source 목록
    Names,
}

fn invalid(message: String) -> CommandError {
    CommandError {
        code: "INVALID_ARGUMENT".to_string(),
        message,
        details: None,
    }
}

impl MatcherInput {
    /// 기존 draft 위에 옵션 값을 덮어씀
    fn apply(self, mut draft: MatcherDraft) -> CommandResult<(MatcherDraft, String)> {
        if let Some(path) = &self.from_json {
            let text = std::fs::read_to_string(path)
                .map_err(|e| invalid(format!("{}: {}", path.display(), e)))?;
            draft = serde_json::from_str(&text)
                .map_err(|e| invalid(format!("{}: {}", path.display(), e)))?;
        }
        if let Some(category) = self.category {
            draft.category = category;
        }
        if let Some(raw) = self.raw {
            draft.raw = raw;
            draft.regexp_source.clear();
            draft.regexp_flag.clear();
        }
        if let Some(regex) = self.regex {
            draft.regexp_source = regex;
            draft.regexp_flag = self.flags.unwrap_or_default();
            draft.raw.clear();
        }
        for pair in self.values {
            let Some((lang, text)) = pair.split_once('=') else {
                return Err(invalid(format!("expected LANG=TEXT, got {}", pair)));
            };
            draft.replace_value.insert(lang.trim().to_string(), text.to_string());
        }
        if let Some(groups) = self.groups {
            draft.groups = serde_json::from_str::<Vec<GroupEntry>>(&groups)
                .map_err(|e| invalid(format!("groups: {}", e)))?;
        }
        if let Some(priority) = self.priority {
            draft.priority = priority;
        }
        if let Some(flag) = self.ignore_part_translated {
            draft.ignore_part_translated = flag;
        }
        if let Some(memo) = self.memo {
            draft.memo = memo;
        }
        Ok((draft, self.actor))
    }
}

fn print_json<T: Serialize>(value: &T) -> CommandResult<()> {
    let text = serde_json::to_string_pretty(value).map_err(|e| invalid(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

async fn run_matcher(command: MatcherCommands, state: &AppState) -> CommandResult<()> {
    match command {
        MatcherCommands::Add(input) => {
            let (draft, actor) = input.apply(MatcherDraft::default())?;
            print_json(&create_matcher(CreateMatcherArgs { draft, actor }, state).await?)
        }
        MatcherCommands::Update { id, input } => {
            let current = get_matcher(id, state)?;
            let (draft, actor) = input.apply(MatcherDraft::from(&current))?;
            print_json(&update_matcher(UpdateMatcherArgs { id, draft, actor }, state).await?)
        }
        MatcherCommands::Delete { id, actor } => {
            print_json(&delete_matcher(DeleteMatcherArgs { id, actor }, state).await?)
        }
        MatcherCommands::List { category, search } => {
            print_json(&list_matchers(ListMatchersArgs { category, search }, state)?)
        }
        MatcherCommands::Show { id } => print_json(&get_matcher(id, state)?),
        MatcherCommands::Categories => print_json(&list_categories(state)?),
    }
}

async fn run_source(command: SourceCommands, state: &AppState) -> CommandResult<()> {
    match command {
        SourceCommands::Add {
            source,
            content,
            actor,
        } => print_json(
            &add_translation(
                AddTranslationArgs {
                    source,
                    content,
                    actor,
                },
                state,
            )
            .await?,
        ),
        SourceCommands::Delete { id, actor } => {
            print_json(&delete_translation(DeleteTranslationArgs { id, actor }, state).await?)
        }
        SourceCommands::List {
            source,
            search,
            page,
            per_page,
            fast,
        } => print_json(&list_translations(
            ListTranslationsArgs {
                source,
                search,
                page,
                per_page,
                fast,
            },
            state,
        )?),
        SourceCommands::Names => print_json(&list_sources(state)?),
    }
}

async fn run(command: Commands, state: AppState) -> CommandResult<()> {
    match command {
        Commands::Init => {
            tracing::info!(db = %state.settings.database_path.display(), "database ready");
            Ok(())
        }
        Commands::Matcher { command } => run_matcher(command, &state).await,
        Commands::Source { command } => run_source(command, &state).await,
        Commands::Import { dir } => print_json(&import(
            ImportArgs {
                dir: dir.map(|d| d.to_string_lossy().to_string()),
            },
            &state,
        )?),
        Commands::Export { snapshot } => print_json(&export(ExportArgs { snapshot }, &state)?),
        Commands::Builds => print_json(&builds(&state)?),
        Commands::Rename {
            old,
            new,
            dry_run,
            actor,
        } => print_json(&rename_category(
            RenameCategoryArgs {
                old,
                new,
                actor,
                dry_run,
            },
            &state,
        )?),
        Commands::Stats { recent } => {
            print_json(&user_activity(&state)?)?;
            match recent {
                Some(n) => print_json(&recent_activity(n, &state)?),
                None => Ok(()),
            }
        }
        Commands::Translate {
            lang,
            source,
            text,
            limit,
        } => print_json(&translate_preview(
            TranslatePreviewArgs {
                lang,
                source,
                text,
                limit,
            },
            &state,
        )?),
        Commands::Serve { bind } => {
            let settings = &state.settings;
            let bind = bind.unwrap_or_else(|| settings.bind_addr.clone());
            let ext = settings.renderer().extension().to_string();
            let server = StaticServer::new(&settings.build_root, &settings.build_url, &ext);
            server.serve(&bind).await.map_err(CommandError::from)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tpack_lib::init_tracing();
    let cli = Cli::parse();

    let state = match tpack_lib::bootstrap() {
        Ok(state) => state,
        Err(e) => {
            eprintln!("{}", CommandError::from(e));
            return ExitCode::FAILURE;
        }
    };

    match run(cli.command, state).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
