// src/services/caption.rs

//! Caption and hashtag generation.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};
use unicode_segmentation::UnicodeSegmentation;

use crate::models::{AnimalRecord, PostVariant};

/// Region tag and the `orgNm` fragments that trigger it.
const REGIONS: &[(&str, &[&str])] = &[
    ("충북", &["충북", "충청북"]),
    ("충남", &["충남", "충청남"]),
    ("전북", &["전북", "전라북"]),
    ("전남", &["전남", "전라남"]),
    ("경북", &["경북", "경상북"]),
    ("경남", &["경남", "경상남"]),
    ("서울", &["서울"]),
    ("경기", &["경기"]),
    ("인천", &["인천"]),
    ("부산", &["부산"]),
    ("대구", &["대구"]),
    ("광주", &["광주"]),
    ("대전", &["대전"]),
    ("울산", &["울산"]),
    ("세종", &["세종"]),
    ("강원", &["강원"]),
    ("제주", &["제주"]),
    ("보은", &["보은"]),
    ("전주", &["전주"]),
    ("남구", &["남구"]),
];

const COLORS: &[&str] = &[
    "흰색", "검정", "갈색", "황색", "회색", "황갈색", "크림", "흑색", "백색",
];

const ABANDONED_TAGS: &[&str] = &["찾아유", "유기동물", "입양", "사지말고입양하세요"];
const LOST_TAGS: &[&str] = &[
    "찾아유",
    "실종동물",
    "잃어버린강아지",
    "잃어버린고양이",
    "찾아주세요",
];

/// Breed values that carry no information.
const GENERIC_BREEDS: &[&str] = &["기타", "other"];

/// Sorted, deduplicated, space-joined hashtags for a batch.
pub fn generate_hashtags(records: &[AnimalRecord], variant: PostVariant) -> String {
    let mut tags = BTreeSet::new();

    for record in records {
        for (tag, needles) in REGIONS {
            if needles.iter().any(|n| record.org_name.contains(n)) {
                tags.insert((*tag).to_string());
            }
        }

        match (record.species.as_str(), variant) {
            ("개", PostVariant::Abandoned) => tags.extend(["강아지".into(), "유기견".into()]),
            ("개", PostVariant::Lost) => tags.extend(["강아지".into(), "실종견".into()]),
            ("고양이", PostVariant::Abandoned) => tags.extend(["고양이".into(), "유기묘".into()]),
            ("고양이", PostVariant::Lost) => tags.extend(["고양이".into(), "실종묘".into()]),
            _ => {}
        }

        if let Some(breed) = compact_tag(&record.breed) {
            if !GENERIC_BREEDS.iter().any(|g| breed.eq_ignore_ascii_case(g)) {
                tags.insert(breed);
            }
        }

        for color in COLORS {
            if record.color.contains(color) {
                tags.insert((*color).to_string());
            }
        }

        if variant == PostVariant::Abandoned {
            if let Some(center) = compact_tag(&record.care_name) {
                tags.insert(center);
            }
        }
    }

    let fixed = match variant {
        PostVariant::Abandoned => ABANDONED_TAGS,
        PostVariant::Lost => LOST_TAGS,
    };
    tags.extend(fixed.iter().map(|t| (*t).to_string()));

    tags.iter()
        .map(|t| format!("#{t}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Spaces removed; `None` when shorter than two characters.
fn compact_tag(text: &str) -> Option<String> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    (compact.graphemes(true).count() >= 2).then_some(compact)
}

/// Full post caption.
pub fn generate_caption(
    records: &[AnimalRecord],
    variant: PostVariant,
    target_date: NaiveDate,
    listing_url: &str,
) -> String {
    let hashtags = generate_hashtags(records, variant);
    let swipe = if records.len() > 1 {
        "👉 스와이프해서 모두 확인해주세요!\n"
    } else {
        ""
    };

    match variant {
        PostVariant::Abandoned => format!(
            "🐾 {} 보호동물 공고\n\n\
             새로운 가족을 기다리는 아이들이에요 💕\n\
             {swipe}\n\
             📋 더 많은 보호동물 보기\n\
             👉 {listing_url}\n\n\
             {hashtags}",
            target_date.format("%Y년 %m월 %d일"),
        ),
        PostVariant::Lost => {
            let start = target_date - Duration::days(6);
            format!(
                "🚨 실종동물 찾습니다 ({}~{})\n\n\
                 가족을 찾고 있는 아이들입니다 😢\n\
                 {swipe}\
                 ❤️ 발견하시면 꼭 제보 부탁드려요\n\n\
                 📋 더 많은 실종동물 보기\n\
                 👉 {listing_url}\n\n\
                 {hashtags}",
                start.format("%m/%d"),
                target_date.format("%m/%d"),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawAnimal;
    use pretty_assertions::assert_eq;

    fn record(variant: PostVariant, raw: RawAnimal) -> AnimalRecord {
        AnimalRecord::from_raw(raw, variant)
    }

    fn dog() -> AnimalRecord {
        record(
            PostVariant::Abandoned,
            RawAnimal {
                up_kind_nm: "개".into(),
                kind_nm: "진도 믹스".into(),
                color_cd: "흰색&갈색".into(),
                org_nm: "경기도 수원시".into(),
                care_nm: "수원 동물보호센터".into(),
                ..RawAnimal::default()
            },
        )
    }

    fn cat() -> AnimalRecord {
        record(
            PostVariant::Abandoned,
            RawAnimal {
                up_kind_nm: "고양이".into(),
                kind_nm: "기타".into(),
                color_cd: "치즈".into(),
                org_nm: "충청북도 보은군".into(),
                care_nm: "보".into(),
                ..RawAnimal::default()
            },
        )
    }

    #[test]
    fn abandoned_hashtags() {
        assert_eq!(
            generate_hashtags(&[dog(), cat()], PostVariant::Abandoned),
            "#갈색 #강아지 #경기 #고양이 #보은 #사지말고입양하세요 #수원동물보호센터 \
             #유기견 #유기동물 #유기묘 #입양 #진도믹스 #찾아유 #충북 #흰색"
        );
    }

    #[test]
    fn hashtags_ignore_record_order() {
        assert_eq!(
            generate_hashtags(&[dog(), cat()], PostVariant::Abandoned),
            generate_hashtags(&[cat(), dog()], PostVariant::Abandoned),
        );
    }

    #[test]
    fn lost_hashtags_skip_care_center() {
        let lost = record(
            PostVariant::Lost,
            RawAnimal {
                kind_cd: "[개] 말티즈".into(),
                org_nm: "서울특별시 마포구".into(),
                care_nm: "어딘가 보호소".into(),
                ..RawAnimal::default()
            },
        );
        assert_eq!(
            generate_hashtags(&[lost], PostVariant::Lost),
            "#강아지 #말티즈 #서울 #실종견 #실종동물 #잃어버린강아지 #잃어버린고양이 #찾아유 #찾아주세요"
        );
    }

    #[test]
    fn single_image_caption_has_no_swipe_hint() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 13).unwrap();
        let caption = generate_caption(&[dog()], PostVariant::Abandoned, date, "https://x.kr/list");
        assert!(caption.starts_with("🐾 2026년 01월 13일 보호동물 공고\n"));
        assert!(!caption.contains("스와이프"));
        assert!(caption.contains("👉 https://x.kr/list\n\n#"));
    }

    #[test]
    fn lost_caption_shows_week_range() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 13).unwrap();
        let caption =
            generate_caption(&[dog(), cat()], PostVariant::Lost, date, "https://x.kr/loss");
        assert!(caption.starts_with("🚨 실종동물 찾습니다 (01/07~01/13)\n\n"));
        assert!(caption.contains("😢\n👉 스와이프해서 모두 확인해주세요!\n❤️"));
    }
}
