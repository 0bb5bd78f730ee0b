//! Translation Data Commands
//!
//! 원문 추가/삭제/목록, 팩 임포트, 번역 미리보기

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::AppState;
use crate::display::{translation_row, TranslationRow};
use crate::error::{CommandError, CommandResult};
use crate::import::{import_packs, ImportReport};
use crate::models::{AuditAction, TranslationData};
use crate::paginate::{Page, PageRequest};
use crate::payload::build_payload;
use crate::translate::{TranslateResult, TranslateStatus, Translator};

/// 원문 목록 기본 페이지 크기
pub const DEFAULT_PER_PAGE: usize = 50;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTranslationArgs {
    pub source: String,
    pub content: String,
    pub actor: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteTranslationArgs {
    pub id: i64,
    pub actor: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTranslationsArgs {
    pub source: Option<String>,
    pub search: Option<String>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
    /// COUNT(*) 생략 (대용량 테이블)
    #[serde(default)]
    pub fast: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportArgs {
    /// 없으면 PACKS_DIR
    pub dir: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslatePreviewArgs {
    pub lang: String,
    /// 원문 source. 카테고리로도 쓰인다
    pub source: String,
    /// 주어지면 이 문자열만 번역
    pub text: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewSummary {
    pub results: Vec<TranslateResult>,
    pub translated: usize,
    pub part_translated: usize,
    pub untranslated: usize,
}

/// 원문 추가
pub async fn add_translation(
    args: AddTranslationArgs,
    state: &AppState,
) -> CommandResult<TranslationData> {
    let data = {
        let db = state.lock_db()?;
        db.insert_translation(&args.source, &args.content, &args.actor)?
    };

    state
        .notifier
        .notify_translation(&data, AuditAction::Addition, &args.actor)
        .await;
    Ok(data)
}

/// 원문 삭제
pub async fn delete_translation(
    args: DeleteTranslationArgs,
    state: &AppState,
) -> CommandResult<TranslationData> {
    let data = {
        let db = state.lock_db()?;
        db.delete_translation(args.id, &args.actor)?
    };

    state
        .notifier
        .notify_translation(&data, AuditAction::Deletion, &args.actor)
        .await;
    Ok(data)
}

/// 원문 목록 (페이지). 검색어가 있으면 검색 결과 한 페이지
pub fn list_translations(
    args: ListTranslationsArgs,
    state: &AppState,
) -> CommandResult<Page<TranslationRow>> {
    let db = state.lock_db()?;
    let request = PageRequest::new(
        args.page.unwrap_or(1),
        args.per_page.unwrap_or(DEFAULT_PER_PAGE),
        args.fast,
    );

    let page = match &args.search {
        Some(term) => {
            let hits = db.search_translations(term, request.per_page)?;
            let count = hits.len() as u64;
            Page::exact(hits, count, &PageRequest::new(1, request.per_page, false))
        }
        None => db.list_translations(args.source.as_deref(), &request)?,
    };

    Ok(page.map(|t| translation_row(&t)))
}

/// 원문 source 목록
pub fn list_sources(state: &AppState) -> CommandResult<Vec<String>> {
    let db = state.lock_db()?;
    db.list_sources().map_err(CommandError::from)
}

/// packs 디렉터리 일괄 임포트
pub fn import(args: ImportArgs, state: &AppState) -> CommandResult<ImportReport> {
    let dir = args
        .dir
        .map(PathBuf::from)
        .unwrap_or_else(|| state.settings.packs_dir.clone());
    let db = state.lock_db()?;
    import_packs(&db, &dir).map_err(CommandError::from)
}

/// 현재 매처로 원문을 번역해 본다
pub fn translate_preview(
    args: TranslatePreviewArgs,
    state: &AppState,
) -> CommandResult<PreviewSummary> {
    let db = state.lock_db()?;
    let payload = build_payload(&db)?;
    let translator = Translator::new(&payload.matchers);

    let targets: Vec<String> = match args.text {
        Some(text) => vec![text],
        None => {
            let request = PageRequest::new(1, args.limit.unwrap_or(DEFAULT_PER_PAGE), false);
            db.list_translations(Some(&args.source), &request)?
                .items
                .into_iter()
                .map(|t| t.content)
                .collect()
        }
    };

    let results: Vec<TranslateResult> = targets
        .iter()
        .map(|t| translator.translate(t, &args.lang, &args.source))
        .collect();

    let count = |s: TranslateStatus| results.iter().filter(|r| r.status == s).count();
    Ok(PreviewSummary {
        translated: count(TranslateStatus::Translated),
        part_translated: count(TranslateStatus::PartTranslated),
        untranslated: count(TranslateStatus::Untranslated),
        results,
    })
}
