//! Hong Kong regions, districts and areas.
//!
//! District and area names are what patients pick from and what doctors'
//! addresses usually contain, in English or Chinese. Matching is plain
//! case-insensitive containment, so English names that are too generic on
//! their own ("North", "Islands") carry their "District" suffix.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct Area {
    pub name_en: &'static str,
    pub name_zh: &'static str,
}

#[derive(Debug, Serialize)]
pub struct District {
    pub key: &'static str,
    pub name_en: &'static str,
    pub name_zh: &'static str,
    pub areas: &'static [Area],
}

#[derive(Debug, Serialize)]
pub struct Region {
    pub key: &'static str,
    pub name_en: &'static str,
    pub name_zh: &'static str,
    pub districts: &'static [District],
}

macro_rules! areas {
    ($(($en:expr, $zh:expr)),* $(,)?) => {
        &[$(Area { name_en: $en, name_zh: $zh }),*]
    };
}

pub static REGIONS: &[Region] = &[
    Region {
        key: "hong_kong_island",
        name_en: "Hong Kong Island",
        name_zh: "香港島",
        districts: &[
            District {
                key: "central_western",
                name_en: "Central and Western",
                name_zh: "中西區",
                areas: areas![
                    ("Central", "中環"),
                    ("Sheung Wan", "上環"),
                    ("Sai Ying Pun", "西營盤"),
                    ("Kennedy Town", "堅尼地城"),
                    ("Mid-Levels", "半山"),
                    ("Admiralty", "金鐘"),
                ],
            },
            District {
                key: "wan_chai",
                name_en: "Wan Chai",
                name_zh: "灣仔",
                areas: areas![
                    ("Causeway Bay", "銅鑼灣"),
                    ("Happy Valley", "跑馬地"),
                    ("Tin Hau", "天后"),
                ],
            },
            District {
                key: "eastern",
                name_en: "Eastern District",
                name_zh: "東區",
                areas: areas![
                    ("North Point", "北角"),
                    ("Quarry Bay", "鰂魚涌"),
                    ("Tai Koo", "太古"),
                    ("Shau Kei Wan", "筲箕灣"),
                    ("Chai Wan", "柴灣"),
                    ("Fortress Hill", "炮台山"),
                ],
            },
            District {
                key: "southern",
                name_en: "Southern District",
                name_zh: "南區",
                areas: areas![
                    ("Aberdeen", "香港仔"),
                    ("Ap Lei Chau", "鴨脷洲"),
                    ("Stanley", "赤柱"),
                    ("Pok Fu Lam", "薄扶林"),
                    ("Wong Chuk Hang", "黃竹坑"),
                ],
            },
        ],
    },
    Region {
        key: "kowloon",
        name_en: "Kowloon",
        name_zh: "九龍",
        districts: &[
            District {
                key: "yau_tsim_mong",
                name_en: "Yau Tsim Mong",
                name_zh: "油尖旺",
                areas: areas![
                    ("Tsim Sha Tsui", "尖沙咀"),
                    ("Jordan", "佐敦"),
                    ("Yau Ma Tei", "油麻地"),
                    ("Mong Kok", "旺角"),
                    ("Tai Kok Tsui", "大角咀"),
                ],
            },
            District {
                key: "sham_shui_po",
                name_en: "Sham Shui Po",
                name_zh: "深水埗",
                areas: areas![
                    ("Cheung Sha Wan", "長沙灣"),
                    ("Lai Chi Kok", "荔枝角"),
                    ("Shek Kip Mei", "石硤尾"),
                    ("Mei Foo", "美孚"),
                ],
            },
            District {
                key: "kowloon_city",
                name_en: "Kowloon City",
                name_zh: "九龍城",
                areas: areas![
                    ("To Kwa Wan", "土瓜灣"),
                    ("Hung Hom", "紅磡"),
                    ("Kowloon Tong", "九龍塘"),
                    ("Ho Man Tin", "何文田"),
                ],
            },
            District {
                key: "wong_tai_sin",
                name_en: "Wong Tai Sin",
                name_zh: "黃大仙",
                areas: areas![
                    ("Diamond Hill", "鑽石山"),
                    ("San Po Kong", "新蒲崗"),
                    ("Tsz Wan Shan", "慈雲山"),
                    ("Lok Fu", "樂富"),
                ],
            },
            District {
                key: "kwun_tong",
                name_en: "Kwun Tong",
                name_zh: "觀塘",
                areas: areas![
                    ("Ngau Tau Kok", "牛頭角"),
                    ("Kowloon Bay", "九龍灣"),
                    ("Lam Tin", "藍田"),
                    ("Yau Tong", "油塘"),
                ],
            },
        ],
    },
    Region {
        key: "new_territories",
        name_en: "New Territories",
        name_zh: "新界",
        districts: &[
            District {
                key: "tsuen_wan",
                name_en: "Tsuen Wan",
                name_zh: "荃灣",
                areas: areas![("Sham Tseng", "深井"), ("Ma Wan", "馬灣")],
            },
            District {
                key: "tuen_mun",
                name_en: "Tuen Mun",
                name_zh: "屯門",
                areas: areas![("Siu Hong", "兆康"), ("Butterfly Beach", "蝴蝶灣")],
            },
            District {
                key: "yuen_long",
                name_en: "Yuen Long",
                name_zh: "元朗",
                areas: areas![("Tin Shui Wai", "天水圍"), ("Kam Tin", "錦田"), ("Hung Shui Kiu", "洪水橋")],
            },
            District {
                key: "north",
                name_en: "North District",
                name_zh: "北區",
                areas: areas![("Sheung Shui", "上水"), ("Fanling", "粉嶺"), ("Sha Tau Kok", "沙頭角")],
            },
            District {
                key: "tai_po",
                name_en: "Tai Po",
                name_zh: "大埔",
                areas: areas![("Tai Wo", "太和"), ("Tai Po Market", "大埔墟")],
            },
            District {
                key: "sha_tin",
                name_en: "Sha Tin",
                name_zh: "沙田",
                areas: areas![
                    ("Ma On Shan", "馬鞍山"),
                    ("Tai Wai", "大圍"),
                    ("Fo Tan", "火炭"),
                    ("Siu Lek Yuen", "小瀝源"),
                ],
            },
            District {
                key: "sai_kung",
                name_en: "Sai Kung",
                name_zh: "西貢",
                areas: areas![("Tseung Kwan O", "將軍澳"), ("Hang Hau", "坑口"), ("Po Lam", "寶琳")],
            },
            District {
                key: "kwai_tsing",
                name_en: "Kwai Tsing",
                name_zh: "葵青",
                areas: areas![("Kwai Chung", "葵涌"), ("Tsing Yi", "青衣"), ("Kwai Fong", "葵芳")],
            },
            District {
                key: "islands",
                name_en: "Islands District",
                name_zh: "離島",
                areas: areas![
                    ("Tung Chung", "東涌"),
                    ("Cheung Chau", "長洲"),
                    ("Lantau", "大嶼山"),
                    ("Discovery Bay", "愉景灣"),
                ],
            },
        ],
    },
];

/// What the patient picked. Any level may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationSelection {
    pub region: Option<String>,
    pub district: Option<String>,
    pub area: Option<String>,
}

impl LocationSelection {
    pub fn is_empty(&self) -> bool {
        [&self.region, &self.district, &self.area]
            .iter()
            .all(|v| v.as_deref().map(str::trim).unwrap_or("").is_empty())
    }
}

fn same_name(candidate: &str, en: &str, zh: &str) -> bool {
    let candidate = candidate.trim();
    candidate.eq_ignore_ascii_case(en) || candidate == zh
}

pub fn regions() -> &'static [Region] {
    REGIONS
}

pub fn find_region(name: &str) -> Option<&'static Region> {
    REGIONS
        .iter()
        .find(|r| same_name(name, r.name_en, r.name_zh) || name.trim().eq_ignore_ascii_case(r.key))
}

/// Districts also answer to their English name without the "District" suffix.
pub fn find_district(name: &str) -> Option<(&'static Region, &'static District)> {
    let trimmed = name.trim();
    REGIONS.iter().find_map(|region| {
        region
            .districts
            .iter()
            .find(|d| {
                same_name(trimmed, d.name_en, d.name_zh)
                    || trimmed.eq_ignore_ascii_case(d.key)
                    || d.name_en
                        .strip_suffix(" District")
                        .is_some_and(|short| trimmed.eq_ignore_ascii_case(short))
            })
            .map(|d| (region, d))
    })
}

pub fn find_area(name: &str) -> Option<(&'static Region, &'static District, &'static Area)> {
    REGIONS.iter().find_map(|region| {
        region.districts.iter().find_map(|district| {
            district
                .areas
                .iter()
                .find(|a| same_name(name, a.name_en, a.name_zh))
                .map(|a| (region, district, a))
        })
    })
}

/// Fill in the levels a known area or district implies, using canonical
/// English names. Unknown names are passed through trimmed.
pub fn normalize(selection: &LocationSelection) -> LocationSelection {
    let given = |v: &Option<String>| v.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string);
    let mut normalized = LocationSelection {
        region: given(&selection.region),
        district: given(&selection.district),
        area: given(&selection.area),
    };

    if let Some((region, district, area)) = normalized.area.as_deref().and_then(find_area) {
        normalized.area = Some(area.name_en.to_string());
        normalized.district = Some(district.name_en.to_string());
        normalized.region = Some(region.name_en.to_string());
    } else if let Some((region, district)) = normalized.district.as_deref().and_then(find_district) {
        normalized.district = Some(district.name_en.to_string());
        normalized.region = Some(region.name_en.to_string());
    } else if let Some(region) = normalized.region.as_deref().and_then(find_region) {
        normalized.region = Some(region.name_en.to_string());
    }

    normalized
}

fn district_terms(district: &District) -> Vec<String> {
    let mut terms = vec![district.name_en.to_lowercase(), district.name_zh.to_string()];
    for area in district.areas {
        terms.push(area.name_en.to_lowercase());
        terms.push(area.name_zh.to_string());
    }
    terms
}

fn region_terms(region: &Region) -> Vec<String> {
    let mut terms = vec![region.name_en.to_lowercase(), region.name_zh.to_string()];
    for district in region.districts {
        terms.extend(district_terms(district));
    }
    terms
}

fn free_text(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase)
}

/// Search terms per tier for one patient selection.
///
/// A known area implies its district and region, a known district implies
/// its region. Unknown names stay at the tier they were given and match
/// literally.
#[derive(Debug, Clone, Default)]
pub struct LocationMatcher {
    area_terms: Vec<String>,
    district_terms: Vec<String>,
    region_terms: Vec<String>,
}

impl LocationMatcher {
    pub fn new(selection: &LocationSelection) -> Self {
        let mut matcher = Self::default();

        let mut region: Option<&'static Region> = None;
        let mut district: Option<&'static District> = None;

        if let Some(area_name) = free_text(&selection.area) {
            match find_area(&area_name) {
                Some((r, d, a)) => {
                    matcher.area_terms = vec![a.name_en.to_lowercase(), a.name_zh.to_string()];
                    region = Some(r);
                    district = Some(d);
                }
                None => matcher.area_terms = vec![area_name],
            }
        }

        if district.is_none() {
            if let Some(district_name) = free_text(&selection.district) {
                match find_district(&district_name) {
                    Some((r, d)) => {
                        region = Some(r);
                        district = Some(d);
                    }
                    None => matcher.district_terms = vec![district_name],
                }
            }
        }

        if region.is_none() {
            if let Some(region_name) = free_text(&selection.region) {
                match find_region(&region_name) {
                    Some(r) => region = Some(r),
                    None => matcher.region_terms = vec![region_name],
                }
            }
        }

        if let Some(d) = district {
            matcher.district_terms = district_terms(d);
        }
        if let Some(r) = region {
            matcher.region_terms = region_terms(r);
        }

        matcher
    }

    pub fn has_location(&self) -> bool {
        !(self.area_terms.is_empty() && self.district_terms.is_empty() && self.region_terms.is_empty())
    }

    /// Highest tier whose terms appear in `text`.
    pub fn tier(&self, text: &str) -> crate::models::LocationTier {
        use crate::models::LocationTier;

        let haystack = text.to_lowercase();
        let hit = |terms: &[String]| terms.iter().any(|t| !t.is_empty() && haystack.contains(t.as_str()));

        if hit(&self.area_terms) {
            LocationTier::Area
        } else if hit(&self.district_terms) {
            LocationTier::District
        } else if hit(&self.region_terms) {
            LocationTier::Region
        } else {
            LocationTier::Unmatched
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LocationTier;

    #[test]
    fn gazetteer_has_eighteen_districts() {
        let count: usize = REGIONS.iter().map(|r| r.districts.len()).sum();
        assert_eq!(REGIONS.len(), 3);
        assert_eq!(count, 18);
    }

    #[test]
    fn finds_names_in_either_language() {
        assert_eq!(find_region("kowloon").unwrap().key, "kowloon");
        assert_eq!(find_region("新界").unwrap().key, "new_territories");
        assert_eq!(find_district("North").unwrap().1.key, "north");
        assert_eq!(find_district("沙田").unwrap().0.key, "new_territories");
        let (region, district, area) = find_area("Mong Kok").unwrap();
        assert_eq!((region.key, district.key, area.name_zh), ("kowloon", "yau_tsim_mong", "旺角"));
    }

    #[test]
    fn normalize_fills_implied_levels() {
        let normalized = normalize(&LocationSelection {
            area: Some("旺角".to_string()),
            ..Default::default()
        });
        assert_eq!(normalized.area.as_deref(), Some("Mong Kok"));
        assert_eq!(normalized.district.as_deref(), Some("Yau Tsim Mong"));
        assert_eq!(normalized.region.as_deref(), Some("Kowloon"));

        let unknown = normalize(&LocationSelection {
            district: Some("  Atlantis ".to_string()),
            ..Default::default()
        });
        assert_eq!(unknown.district.as_deref(), Some("Atlantis"));
        assert_eq!(unknown.region, None);
    }

    #[test]
    fn area_selection_implies_district_and_region() {
        let matcher = LocationMatcher::new(&LocationSelection {
            area: Some("Mong Kok".to_string()),
            ..Default::default()
        });

        assert_eq!(matcher.tier("Shop 3, 123 Nathan Road, Mong Kok"), LocationTier::Area);
        assert_eq!(matcher.tier("九龍佐敦彌敦道"), LocationTier::District);
        assert_eq!(matcher.tier("Kwun Tong Road, Kwun Tong"), LocationTier::Region);
        assert_eq!(matcher.tier("Causeway Bay, Hong Kong"), LocationTier::Unmatched);
    }

    #[test]
    fn district_selection_matches_its_areas_at_district_tier() {
        let matcher = LocationMatcher::new(&LocationSelection {
            district: Some("Wan Chai".to_string()),
            ..Default::default()
        });

        assert_eq!(matcher.tier("銅鑼灣軒尼詩道"), LocationTier::District);
        assert_eq!(matcher.tier("Central, Hong Kong Island"), LocationTier::Region);
    }

    #[test]
    fn unknown_names_match_literally() {
        let matcher = LocationMatcher::new(&LocationSelection {
            area: Some("Cyberport".to_string()),
            region: Some("Hong Kong Island".to_string()),
            ..Default::default()
        });

        assert_eq!(matcher.tier("100 Cyberport Road"), LocationTier::Area);
        assert_eq!(matcher.tier("Aberdeen"), LocationTier::Region);
    }

    #[test]
    fn empty_selection_has_no_location() {
        let matcher = LocationMatcher::new(&LocationSelection::default());
        assert!(!matcher.has_location());
        assert_eq!(matcher.tier("Mong Kok"), LocationTier::Unmatched);
    }
}
