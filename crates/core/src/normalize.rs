//! Field mapping from each source's native record shape to [`CanonicalPaper`].

use crate::error::IngestError;
use crate::models::{Authors, CanonicalPaper, RawRecord, SourceTag};
use serde_json::Value;

type FieldMapping = fn(&RawRecord) -> CanonicalPaper;

const GOOGLE_SCHOLAR_MISSING_AUTHORS: &str = "No Authors";
const EATRIGHT_DEFAULT_YEAR: u32 = 2023;
const DIETARY_GUIDELINES_DEFAULT_YEAR: u32 = 2025;

impl SourceTag {
    fn field_mapping(self) -> FieldMapping {
        match self {
            SourceTag::PubMed => pubmed,
            SourceTag::EuropePmc => europe_pmc,
            SourceTag::SemanticScholar => semantic_scholar,
            SourceTag::GoogleScholar => google_scholar,
            SourceTag::EatRight => eatright,
            SourceTag::DietaryGuidelines => dietary_guidelines,
        }
    }
}

pub fn normalize(raw: &RawRecord, source: SourceTag) -> CanonicalPaper {
    (source.field_mapping())(raw)
}

/// Parses `source` before normalizing; unknown tags fail and nothing should be written.
pub fn normalize_tagged(raw: &RawRecord, source: &str) -> Result<CanonicalPaper, IngestError> {
    let tag = source.parse::<SourceTag>()?;
    Ok(normalize(raw, tag))
}

fn pubmed(raw: &RawRecord) -> CanonicalPaper {
    CanonicalPaper {
        title: text_field(raw, "title"),
        authors: authors_field(raw.get("authors"), Authors::List(Vec::new())),
        year: coerce_year(raw.get("year"), 0),
        source: SourceTag::PubMed,
        abstract_text: text_field(raw, "abstract"),
        keywords: string_list(raw.get("keywords")),
        doi: text_field(raw, "doi"),
        journal: text_field(raw, "journal"),
        last_updated: text_field(raw, "last_updated"),
        link: String::new(),
    }
}

fn europe_pmc(raw: &RawRecord) -> CanonicalPaper {
    let authors = raw
        .get("authorList")
        .and_then(|list| list.get("author"))
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|author| {
                    let first = author.get("firstName").map(scalar_text).unwrap_or_default();
                    let last = author.get("lastName").map(scalar_text).unwrap_or_default();
                    let name = format!("{first} {last}").trim().to_string();
                    (!name.is_empty()).then_some(name)
                })
                .collect()
        })
        .unwrap_or_default();

    CanonicalPaper {
        title: text_field(raw, "title"),
        authors: Authors::List(authors),
        year: coerce_year(raw.get("pubYear"), 0),
        source: SourceTag::EuropePmc,
        abstract_text: text_field(raw, "abstractText"),
        keywords: string_list(raw.get("keywordList").and_then(|list| list.get("keyword"))),
        doi: text_field(raw, "doi"),
        journal: String::new(),
        last_updated: text_field(raw, "firstPublicationDate"),
        link: String::new(),
    }
}

fn semantic_scholar(raw: &RawRecord) -> CanonicalPaper {
    let authors = raw
        .get("authors")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .map(|author| author.get("name").map(scalar_text).unwrap_or_default())
                .collect()
        })
        .unwrap_or_default();

    CanonicalPaper {
        title: text_field(raw, "title"),
        authors: Authors::List(authors),
        year: coerce_year(raw.get("year"), 0),
        source: SourceTag::SemanticScholar,
        abstract_text: text_field(raw, "abstract"),
        keywords: Vec::new(),
        doi: raw
            .get("externalIds")
            .and_then(|ids| ids.get("DOI"))
            .map(scalar_text)
            .unwrap_or_default(),
        journal: raw
            .get("journal")
            .and_then(|journal| journal.get("name"))
            .map(scalar_text)
            .unwrap_or_default(),
        last_updated: String::new(),
        link: String::new(),
    }
}

fn google_scholar(raw: &RawRecord) -> CanonicalPaper {
    let authors = match authors_field(
        raw.get("authors"),
        Authors::Joined(GOOGLE_SCHOLAR_MISSING_AUTHORS.to_string()),
    ) {
        Authors::List(names) => Authors::Joined(names.join(", ")),
        joined => joined,
    };

    CanonicalPaper {
        title: text_field(raw, "title"),
        authors,
        year: coerce_year(raw.get("year"), 0),
        source: SourceTag::GoogleScholar,
        abstract_text: text_field(raw, "abstract"),
        keywords: string_list(raw.get("keywords")),
        doi: text_field(raw, "doi"),
        journal: text_field(raw, "journal"),
        last_updated: String::new(),
        link: String::new(),
    }
}

fn eatright(raw: &RawRecord) -> CanonicalPaper {
    CanonicalPaper {
        title: text_field(raw, "title"),
        authors: authors_field(raw.get("authors"), Authors::Joined(String::new())),
        year: coerce_year(raw.get("year"), EATRIGHT_DEFAULT_YEAR),
        source: SourceTag::EatRight,
        abstract_text: text_field(raw, "abstract"),
        keywords: string_list(raw.get("keywords")),
        doi: String::new(),
        journal: String::new(),
        last_updated: text_field(raw, "last_updated"),
        link: text_field(raw, "url"),
    }
}

fn dietary_guidelines(raw: &RawRecord) -> CanonicalPaper {
    CanonicalPaper {
        title: text_field(raw, "title"),
        authors: authors_field(raw.get("authors"), Authors::Joined(String::new())),
        year: coerce_year(raw.get("year"), DIETARY_GUIDELINES_DEFAULT_YEAR),
        source: SourceTag::DietaryGuidelines,
        abstract_text: text_field(raw, "abstract"),
        keywords: string_list(raw.get("keywords")),
        doi: text_field(raw, "doi"),
        journal: text_field(raw, "journal"),
        last_updated: text_field(raw, "last_updated"),
        link: text_field(raw, "url"),
    }
}

/// Coerces a year value to a non-negative integer.
///
/// Missing and null values take `default`. Integers, integral floats and
/// numeric strings are accepted; everything else, including sentinels such
/// as "No Year Available", becomes 0.
pub fn coerce_year(value: Option<&Value>, default: u32) -> u32 {
    match value {
        None | Some(Value::Null) => default,
        Some(Value::Number(number)) => {
            if let Some(year) = number.as_u64() {
                u32::try_from(year).unwrap_or(0)
            } else if let Some(year) = number.as_f64() {
                if year.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&year) {
                    year as u32
                } else {
                    0
                }
            } else {
                0
            }
        }
        Some(Value::String(text)) => text.trim().parse::<u32>().unwrap_or(0),
        Some(_) => 0,
    }
}

fn text_field(raw: &RawRecord, key: &str) -> String {
    raw.get(key).map(scalar_text).unwrap_or_default()
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(_) | Value::Object(_) => String::new(),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter(|item| !item.is_null())
            .map(scalar_text)
            .collect(),
        Some(Value::String(single)) if !single.is_empty() => vec![single.clone()],
        _ => Vec::new(),
    }
}

fn authors_field(value: Option<&Value>, default: Authors) -> Authors {
    match value {
        None | Some(Value::Null) => default,
        Some(Value::String(joined)) => Authors::Joined(joined.clone()),
        Some(Value::Array(_)) => Authors::List(string_list(value)),
        Some(other) => Authors::Joined(scalar_text(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => map,
            other => panic!("test record must be an object, got {other}"),
        }
    }

    #[test]
    fn pubmed_sentinel_year_becomes_zero() {
        let raw = record(json!({
            "title": "X",
            "year": "No Year Available",
            "abstract": ""
        }));

        let paper = normalize(&raw, SourceTag::PubMed);
        assert_eq!(paper.title, "X");
        assert_eq!(paper.year, 0);
        assert_eq!(paper.abstract_text, "");
        assert_eq!(paper.authors, Authors::List(Vec::new()));
        assert_eq!(paper.source, SourceTag::PubMed);
    }

    #[test]
    fn pubmed_keeps_numeric_string_year_and_fields() {
        let raw = record(json!({
            "title": "Sodium intake",
            "authors": ["Ana Lima", "Rui Costa"],
            "year": " 2022 ",
            "keywords": ["salt", "hypertension"],
            "doi": "10.1000/abc",
            "journal": "Nutrients",
            "last_updated": "2023-01-02"
        }));

        let paper = normalize(&raw, SourceTag::PubMed);
        assert_eq!(paper.year, 2022);
        assert_eq!(
            paper.authors,
            Authors::List(vec!["Ana Lima".to_string(), "Rui Costa".to_string()])
        );
        assert_eq!(paper.keywords, vec!["salt", "hypertension"]);
        assert_eq!(paper.journal, "Nutrients");
        assert_eq!(paper.last_updated, "2023-01-02");
    }

    #[test]
    fn europe_pmc_maps_nested_fields() {
        let raw = record(json!({
            "title": "Breakfast skipping",
            "authorList": {"author": [
                {"firstName": "Maria", "lastName": "Silva"},
                {"lastName": "Consortium"},
                {}
            ]},
            "pubYear": "2019",
            "abstractText": "We studied breakfast.",
            "keywordList": {"keyword": ["breakfast", "obesity"]},
            "doi": "10.2/eu",
            "firstPublicationDate": "2019-05-01"
        }));

        let paper = normalize(&raw, SourceTag::EuropePmc);
        assert_eq!(
            paper.authors,
            Authors::List(vec!["Maria Silva".to_string(), "Consortium".to_string()])
        );
        assert_eq!(paper.year, 2019);
        assert_eq!(paper.abstract_text, "We studied breakfast.");
        assert_eq!(paper.keywords, vec!["breakfast", "obesity"]);
        assert_eq!(paper.journal, "");
        assert_eq!(paper.last_updated, "2019-05-01");
        assert_eq!(paper.source.label(), "Europe PMC");
    }

    #[test]
    fn europe_pmc_empty_year_string_is_zero() {
        let raw = record(json!({"pubYear": ""}));
        assert_eq!(normalize(&raw, SourceTag::EuropePmc).year, 0);
    }

    #[test]
    fn semantic_scholar_reads_external_ids_and_journal_name() {
        let raw = record(json!({
            "title": "Ultra-processed foods",
            "authors": [{"name": "J. Doe"}, {"authorId": "1"}],
            "year": 2024,
            "abstract": null,
            "externalIds": {"DOI": "10.3/ss"},
            "journal": {"name": "BMJ"}
        }));

        let paper = normalize(&raw, SourceTag::SemanticScholar);
        assert_eq!(
            paper.authors,
            Authors::List(vec!["J. Doe".to_string(), String::new()])
        );
        assert_eq!(paper.year, 2024);
        assert_eq!(paper.abstract_text, "");
        assert_eq!(paper.doi, "10.3/ss");
        assert_eq!(paper.journal, "BMJ");
        assert!(paper.keywords.is_empty());
    }

    #[test]
    fn semantic_scholar_null_journal_is_empty() {
        let raw = record(json!({"journal": null}));
        assert_eq!(normalize(&raw, SourceTag::SemanticScholar).journal, "");
    }

    #[test]
    fn google_scholar_joins_author_lists() {
        let listed = record(json!({"authors": ["A", "B"], "year": 2021.0}));
        let paper = normalize(&listed, SourceTag::GoogleScholar);
        assert_eq!(paper.authors, Authors::Joined("A, B".to_string()));
        assert_eq!(paper.year, 2021);

        let missing = record(json!({"title": "T"}));
        assert_eq!(
            normalize(&missing, SourceTag::GoogleScholar).authors,
            Authors::Joined("No Authors".to_string())
        );
    }

    #[test]
    fn curated_sources_use_their_default_years() {
        let raw = record(json!({"title": "Tip sheet"}));
        let eatright_paper = normalize(&raw, SourceTag::EatRight);
        assert_eq!(eatright_paper.year, 2023);
        assert_eq!(eatright_paper.authors, Authors::Joined(String::new()));
        assert_eq!(eatright_paper.doi, "");

        let guidelines = normalize(&raw, SourceTag::DietaryGuidelines);
        assert_eq!(guidelines.year, 2025);
        assert_eq!(guidelines.source.label(), "Dietary Guidelines");
    }

    #[test]
    fn eatright_ignores_doi_and_journal() {
        let raw = record(json!({"doi": "10.4/x", "journal": "J", "year": "2020"}));
        let paper = normalize(&raw, SourceTag::EatRight);
        assert_eq!(paper.doi, "");
        assert_eq!(paper.journal, "");
        assert_eq!(paper.year, 2020);
    }

    #[test]
    fn years_are_never_negative() {
        let values = [
            json!(-4),
            json!(2020.5),
            json!("MMXX"),
            json!(true),
            json!([2020]),
            json!(u64::MAX),
        ];
        for tag in SourceTag::ALL {
            for value in &values {
                let raw = record(json!({"year": value, "pubYear": value}));
                assert_eq!(normalize(&raw, tag).year, 0, "{tag} with {value}");
            }
        }
    }

    #[test]
    fn every_source_normalizes_an_empty_record() {
        let raw = RawRecord::new();
        for tag in SourceTag::ALL {
            let paper = normalize(&raw, tag);
            assert_eq!(paper.source, tag);
            assert_eq!(paper.abstract_text, "");
        }
    }

    #[test]
    fn unsupported_tag_fails() {
        let raw = record(json!({"title": "Apple"}));
        let result = normalize_tagged(&raw, "Wikipedia");
        assert!(matches!(result, Err(IngestError::UnsupportedSource(_))));

        let parsed = normalize_tagged(&raw, "Semantic Scholar").expect("known tag");
        assert_eq!(parsed.source, SourceTag::SemanticScholar);
    }

    #[test]
    fn coerce_year_uses_default_for_missing_values() {
        assert_eq!(coerce_year(None, 2023), 2023);
        assert_eq!(coerce_year(Some(&Value::Null), 7), 7);
        assert_eq!(coerce_year(Some(&json!("1999")), 7), 1999);
    }
}
