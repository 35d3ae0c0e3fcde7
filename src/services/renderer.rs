// src/services/renderer.rs

//! Image card renderer.
//!
//! Builds one fixed HTML card per record and screenshots it with a headless
//! browser. The HTML is written next to the PNG and removed afterwards.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use sha2::{Digest, Sha256};
use tokio::process::Command;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{AnimalRecord, PostVariant, RendererConfig};
use crate::utils::escape_html;

const WEEKDAYS: [&str; 7] = [
    "월요일", "화요일", "수요일", "목요일", "금요일", "토요일", "일요일",
];

/// Turns a record into an image file.
#[async_trait]
pub trait ImageRenderer: Send + Sync {
    async fn render(&self, record: &AnimalRecord, target_date: NaiveDate) -> Result<PathBuf>;
}

/// Renders cards through an external headless browser.
#[derive(Debug, Clone)]
pub struct HeadlessRenderer {
    browser_bin: String,
    output_dir: PathBuf,
    width: u32,
    height: u32,
    timeout: Duration,
}

impl HeadlessRenderer {
    /// `output_dir` is resolved against `data_dir`.
    pub fn new(config: &RendererConfig, data_dir: &Path) -> Self {
        Self {
            browser_bin: config.browser_bin.clone(),
            output_dir: data_dir.join(&config.output_dir),
            width: config.width,
            height: config.height,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// `<output_dir>/<variant>_<YYYYMMDD>_<sha256(id)[..12]>.png`
    pub fn output_path(&self, record: &AnimalRecord, target_date: NaiveDate) -> PathBuf {
        let digest = hex::encode(Sha256::digest(record.id.as_bytes()));
        self.output_dir.join(format!(
            "{}_{}_{}.png",
            record.variant,
            target_date.format("%Y%m%d"),
            &digest[..12]
        ))
    }

    async fn screenshot(
        &self,
        html_path: &Path,
        png_path: &Path,
    ) -> std::result::Result<(), String> {
        let html_path = tokio::fs::canonicalize(html_path)
            .await
            .map_err(|e| format!("cannot resolve {}: {e}", html_path.display()))?;
        let page = Url::from_file_path(&html_path)
            .map_err(|_| format!("not a file path: {}", html_path.display()))?;

        let mut command = Command::new(&self.browser_bin);
        command
            .arg("--headless")
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--hide-scrollbars")
            .arg(format!("--window-size={},{}", self.width, self.height))
            .arg(format!("--screenshot={}", png_path.display()))
            .arg(page.as_str())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| format!("browser timed out after {}s", self.timeout.as_secs()))?
            .map_err(|e| format!("cannot run {}: {e}", self.browser_bin))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("browser exited with {}: {}", output.status, stderr.trim()));
        }
        if !tokio::fs::try_exists(png_path).await.unwrap_or(false) {
            return Err("browser produced no screenshot".to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl ImageRenderer for HeadlessRenderer {
    async fn render(&self, record: &AnimalRecord, target_date: NaiveDate) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let png_path = self.output_path(record, target_date);
        let html_path = png_path.with_extension("html");
        let html = card_html(record, target_date, self.width, self.height);
        tokio::fs::write(&html_path, html).await?;

        let result = self.screenshot(&html_path, &png_path).await;

        if let Err(e) = tokio::fs::remove_file(&html_path).await {
            log::warn!("Failed to remove {}: {}", html_path.display(), e);
        }

        result.map_err(|message| AppError::render(&record.id, message))?;
        Ok(png_path)
    }
}

/// Notes font size, stepped down as the text grows.
pub fn notes_font_size(notes: &str) -> u32 {
    match notes.chars().count() {
        0..30 => 48,
        30..50 => 42,
        50..70 => 36,
        _ => 32,
    }
}

/// `2026-01-13 화요일`
fn card_date(date: NaiveDate) -> String {
    let weekday = WEEKDAYS[date.weekday().num_days_from_monday() as usize];
    format!("{} {}", date.format("%Y-%m-%d"), weekday)
}

fn or_default<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() { fallback } else { value }
}

/// The fixed card layout for one record.
pub fn card_html(record: &AnimalRecord, target_date: NaiveDate, width: u32, height: u32) -> String {
    let notes = or_default(&record.notes, "정보 없음");
    let font_size = notes_font_size(notes);
    let line_height = font_size * 102 / 100;

    let (title, rows) = match record.variant {
        PostVariant::Abandoned => (
            format!("{} 보호동물 공고", card_date(target_date)),
            vec![
                ("공고번호", or_default(&record.notice_no, "N/A").to_string()),
                ("성별", record.sex.label().to_string()),
                ("보호센터", or_default(&record.care_name, "N/A").to_string()),
            ],
        ),
        PostVariant::Lost => {
            let place = or_default(&record.place, "N/A");
            let address = if record.org_name.is_empty() {
                place.to_string()
            } else {
                format!("{} {}", record.org_name, place)
            };
            (
                format!("{} 실종동물 공고", card_date(target_date)),
                vec![
                    ("성별", record.sex.label().to_string()),
                    ("실종지역", place.to_string()),
                    ("실종주소", address),
                ],
            )
        }
    };

    let rows_html: String = rows
        .iter()
        .enumerate()
        .map(|(i, (label, value))| {
            let top = 967 + 79 * i;
            format!(
                "    <div class=\"label\" style=\"left:105px;top:{top}px\">{}</div>\n    \
                 <div class=\"value\" style=\"left:304px;top:{top}px\">{}</div>\n",
                escape_html(label),
                escape_html(value)
            )
        })
        .collect();
    let notes_top = 967 + 79 * rows.len();

    format!(
        r#"<!DOCTYPE html>
<html lang="ko">
<head>
<meta charset="UTF-8">
<style>
  * {{ margin: 0; padding: 0; box-sizing: border-box; }}
  html, body {{ overflow: hidden; width: {width}px; height: {height}px; }}
  .card {{ position: relative; width: {width}px; height: {height}px;
          background: linear-gradient(180deg, #FFD195 0%, #FFEED9 100%);
          font-family: 'Jua', 'Noto Sans KR', sans-serif; color: #2C2B2B; }}
  .frame {{ position: absolute; width: 612px; height: 689px; left: 205px; top: 180px;
           transform: rotate(5deg); background: #F5F5F5;
           box-shadow: 10px 10px 4px rgba(0, 0, 0, 0.25); }}
  .photo {{ position: absolute; width: 532px; height: 528px; left: 40px; top: 34px; overflow: hidden; }}
  .photo img {{ width: 100%; height: 100%; object-fit: contain; }}
  .breed {{ position: absolute; left: 50%; bottom: 40px; transform: translateX(-50%);
           font-size: 42px; white-space: nowrap; }}
  .title {{ position: absolute; width: 100%; top: 63px; font-size: 56px; line-height: 70px;
           text-align: center; white-space: nowrap; }}
  .label, .value {{ position: absolute; font-size: 48px; line-height: 49px; white-space: nowrap; }}
  .value {{ width: 657px; overflow: hidden; }}
  .notes {{ position: absolute; width: 657px; max-height: 196px; left: 304px; overflow: hidden;
           white-space: pre-line; word-break: break-all; }}
</style>
</head>
<body>
<div class="card">
  <div class="frame">
    <div class="photo"><img src="{image}" alt="{breed}" onerror="this.style.display='none'"></div>
    <div class="breed">{breed}</div>
  </div>
  <div class="title">{title}</div>
{rows_html}    <div class="label" style="left:105px;top:{notes_top}px">특징</div>
    <div class="notes" style="top:{notes_top}px;font-size:{font_size}px;line-height:{line_height}px">{notes}</div>
</div>
</body>
</html>
"#,
        image = escape_html(&record.image_url),
        breed = escape_html(or_default(&record.breed, "믹스견")),
        title = escape_html(&title),
        notes = escape_html(notes),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawAnimal;
    use tempfile::TempDir;

    fn record(variant: PostVariant) -> AnimalRecord {
        AnimalRecord::from_raw(
            RawAnimal {
                desertion_no: "448567202600123".into(),
                kind_nm: "말티즈".into(),
                sex_cd: "M".into(),
                care_nm: "<보은> 보호소".into(),
                org_nm: "충청북도 보은군".into(),
                happen_place: "보은읍".into(),
                notice_no: "충북-보은-2026-00012".into(),
                special_mark: "목줄 착용".into(),
                popfile1: "http://openapi.animal.go.kr/files/shelter/2026/01/a.jpg".into(),
                ..RawAnimal::default()
            },
            variant,
        )
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 13).unwrap()
    }

    #[test]
    fn font_size_steps() {
        assert_eq!(notes_font_size("짧음"), 48);
        assert_eq!(notes_font_size(&"가".repeat(30)), 42);
        assert_eq!(notes_font_size(&"가".repeat(50)), 36);
        assert_eq!(notes_font_size(&"가".repeat(70)), 32);
    }

    #[test]
    fn abandoned_card_content() {
        let html = card_html(&record(PostVariant::Abandoned), date(), 1080, 1500);
        assert!(html.contains("2026-01-13 화요일 보호동물 공고"));
        assert!(html.contains("수컷"));
        assert!(html.contains("&lt;보은&gt; 보호소"));
        assert!(html.contains("충북-보은-2026-00012"));
        assert!(html.contains("font-size:48px"));
    }

    #[test]
    fn lost_card_shows_place_and_address() {
        let html = card_html(&record(PostVariant::Lost), date(), 1080, 1500);
        assert!(html.contains("실종동물 공고"));
        assert!(html.contains("충청북도 보은군 보은읍"));
        assert!(!html.contains("보호센터"));
    }

    #[test]
    fn output_path_is_deterministic() {
        let tmp = TempDir::new().unwrap();
        let renderer = HeadlessRenderer::new(&RendererConfig::default(), tmp.path());
        let rec = record(PostVariant::Abandoned);

        let first = renderer.output_path(&rec, date());
        assert_eq!(first, renderer.output_path(&rec, date()));
        let name = first.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("abandoned_20260113_"));
        assert_eq!(name.len(), "abandoned_20260113_".len() + 12 + ".png".len());
    }

    #[tokio::test]
    async fn missing_browser_is_render_error_and_html_is_removed() {
        let tmp = TempDir::new().unwrap();
        let config = RendererConfig {
            browser_bin: "/nonexistent/findyou-browser".into(),
            ..RendererConfig::default()
        };
        let renderer = HeadlessRenderer::new(&config, tmp.path());
        let rec = record(PostVariant::Lost);

        let err = renderer.render(&rec, date()).await.unwrap_err();
        assert!(matches!(err, AppError::Render { .. }));
        let html = renderer.output_path(&rec, date()).with_extension("html");
        assert!(!html.exists());
    }
}
