//! Animal record data structures.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::PostVariant;

/// Path fragment preceding the stable part of registry image URLs.
const FILES_SEGMENT: &str = "/files/";

/// One item exactly as the registry returns it.
///
/// Both feeds share field names; each only fills its own subset.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAnimal {
    #[serde(default, deserialize_with = "lenient_string")]
    pub desertion_no: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub happen_dt: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub happen_place: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub happen_addr: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub kind_cd: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub kind_nm: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub up_kind_nm: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub color_cd: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub age: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub weight: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub notice_no: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub popfile: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub popfile1: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub sex_cd: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub special_mark: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub care_nm: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub org_nm: String,
}

/// Accept strings, numbers and nulls for text fields.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// Sex code used by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
    Unknown,
}

impl Sex {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "M" => Sex::Male,
            "F" => Sex::Female,
            _ => Sex::Unknown,
        }
    }

    /// Korean label printed on the card.
    pub fn label(&self) -> &'static str {
        match self {
            Sex::Male => "수컷",
            Sex::Female => "암컷",
            Sex::Unknown => "미상",
        }
    }
}

/// A normalized animal record, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimalRecord {
    /// Feed this record came from
    pub variant: PostVariant,

    /// Stable identifier recorded in the ledger
    pub id: String,

    /// Registry-assigned number (`desertionNo`), empty for lost reports
    pub external_id: String,

    /// Species, e.g. "개" or "고양이"
    pub species: String,

    /// Breed with any `[species]` prefix removed
    pub breed: String,

    pub sex: Sex,
    pub color: String,
    pub age: String,
    pub weight: String,

    /// Discovery or loss date as `YYYYMMDD`
    pub event_date: String,

    /// Discovery or loss place
    pub place: String,

    /// Street address of the event (lost reports)
    pub address: String,

    /// Registering organization, e.g. "서울특별시 강남구"
    pub org_name: String,

    /// Shelter holding the animal (abandoned only)
    pub care_name: String,

    pub notice_no: String,
    pub image_url: String,

    /// Free-text remarks (`specialMark`)
    pub notes: String,
}

impl AnimalRecord {
    /// Normalize a raw registry item.
    pub fn from_raw(raw: RawAnimal, variant: PostVariant) -> Self {
        let image_url = if raw.popfile1.trim().is_empty() {
            raw.popfile.trim().to_string()
        } else {
            raw.popfile1.trim().to_string()
        };

        let (prefix_species, stripped_kind) = split_kind(&raw.kind_cd)
            .map(|(species, breed)| (Some(species), breed))
            .unwrap_or_else(|| (None, raw.kind_cd.trim().to_string()));

        let species = if raw.up_kind_nm.trim().is_empty() {
            prefix_species.unwrap_or_default()
        } else {
            raw.up_kind_nm.trim().to_string()
        };
        let breed = if raw.kind_nm.trim().is_empty() {
            stripped_kind
        } else {
            raw.kind_nm.trim().to_string()
        };

        let id = derive_id(&image_url, &raw.happen_dt, &raw.kind_cd, &raw.happen_addr);

        Self {
            variant,
            id,
            external_id: raw.desertion_no.trim().to_string(),
            species,
            breed,
            sex: Sex::from_code(&raw.sex_cd),
            color: raw.color_cd.trim().to_string(),
            age: raw.age.trim().to_string(),
            weight: raw.weight.trim().to_string(),
            event_date: compact_date(&raw.happen_dt),
            place: raw.happen_place.trim().to_string(),
            address: raw.happen_addr.trim().to_string(),
            org_name: raw.org_nm.trim().to_string(),
            care_name: raw.care_nm.trim().to_string(),
            notice_no: raw.notice_no.trim().to_string(),
            image_url,
            notes: raw.special_mark.trim().to_string(),
        }
    }

    /// Key used to drop duplicates within one fetched pool.
    pub fn dedup_key(&self) -> &str {
        if self.external_id.is_empty() {
            &self.id
        } else {
            &self.external_id
        }
    }

    /// Short label for progress logs.
    pub fn label(&self) -> String {
        let location = [&self.care_name, &self.place, &self.org_name]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(String::as_str)
            .unwrap_or("N/A");
        let breed = if self.breed.is_empty() { "N/A" } else { &self.breed };
        format!("{breed} - {location}")
    }
}

/// Stable id: the image file path when there is one, else date/kind/address.
pub fn derive_id(image_url: &str, happen_dt: &str, kind_cd: &str, happen_addr: &str) -> String {
    match image_url.split_once(FILES_SEGMENT) {
        Some((_, file)) if !file.is_empty() => file.to_string(),
        _ => format!(
            "{}_{}_{}",
            happen_dt.trim(),
            kind_cd.trim(),
            happen_addr.trim()
        ),
    }
}

/// `2026-01-13...` or `20260113` → `20260113`.
fn compact_date(raw: &str) -> String {
    raw.trim().chars().take(10).filter(|c| *c != '-').collect()
}

/// Split `"[개] 말티즈"` into `("개", "말티즈")`.
fn split_kind(kind_cd: &str) -> Option<(String, String)> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(r"^\s*\[([^\]]+)\]\s*(.*)$").ok())
        .as_ref()?;
    let caps = pattern.captures(kind_cd)?;
    Some((caps[1].trim().to_string(), caps[2].trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lost_raw() -> RawAnimal {
        RawAnimal {
            happen_dt: "2026-01-10".into(),
            happen_addr: "서울특별시 마포구".into(),
            happen_place: "망원한강공원".into(),
            kind_cd: "[개] 말티즈".into(),
            popfile: "http://www.animal.go.kr/files/lost/2026/01/abc123.jpg".into(),
            sex_cd: "F".into(),
            ..RawAnimal::default()
        }
    }

    #[test]
    fn lost_record_derives_id_from_file_path() {
        let record = AnimalRecord::from_raw(lost_raw(), PostVariant::Lost);
        assert_eq!(record.id, "lost/2026/01/abc123.jpg");
        assert_eq!(record.dedup_key(), "lost/2026/01/abc123.jpg");
    }

    #[test]
    fn lost_record_normalizes_kind_and_date() {
        let record = AnimalRecord::from_raw(lost_raw(), PostVariant::Lost);
        assert_eq!(record.species, "개");
        assert_eq!(record.breed, "말티즈");
        assert_eq!(record.event_date, "20260110");
        assert_eq!(record.sex.label(), "암컷");
    }

    #[test]
    fn record_without_image_uses_composite_id() {
        let raw = RawAnimal {
            popfile: String::new(),
            ..lost_raw()
        };
        let record = AnimalRecord::from_raw(raw, PostVariant::Lost);
        assert_eq!(record.id, "2026-01-10_[개] 말티즈_서울특별시 마포구");
    }

    #[test]
    fn abandoned_record_prefers_desertion_number_for_dedup() {
        let raw = RawAnimal {
            desertion_no: "448567202600123".into(),
            up_kind_nm: "고양이".into(),
            kind_nm: "코리안 숏헤어".into(),
            popfile1: "http://openapi.animal.go.kr/openapi/service/rest/fileDownloadSrvc/files/shelter/2026/01/x.jpg".into(),
            ..RawAnimal::default()
        };
        let record = AnimalRecord::from_raw(raw, PostVariant::Abandoned);
        assert_eq!(record.dedup_key(), "448567202600123");
        assert_eq!(record.id, "shelter/2026/01/x.jpg");
        assert_eq!(record.species, "고양이");
        assert_eq!(record.breed, "코리안 숏헤어");
    }

    #[test]
    fn numeric_fields_are_read_as_text() {
        let raw: RawAnimal = serde_json::from_value(serde_json::json!({
            "desertionNo": 448567202600123u64,
            "age": null,
            "kindNm": "믹스견"
        }))
        .unwrap();
        assert_eq!(raw.desertion_no, "448567202600123");
        assert_eq!(raw.age, "");
    }
}
