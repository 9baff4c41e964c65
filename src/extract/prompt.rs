// src/extract/prompt.rs
//! Prompt construction and tolerant parsing of the extractor's JSON reply.
//!
//! Reply rules:
//! - optional ```json fences and surrounding chatter are ignored; the outermost `{..}` is parsed
//! - `project` and `amount_raised` must be non-empty strings (they form the identity key)
//! - `funding_stage`, `use_of_funds` must be present (may be empty)
//! - `lead_investors`, `other_backers` must be present; a bare string is taken as one entry
//! - `twitter_handle` may be absent or null

use serde_json::{Map, Value};

use crate::error::ExtractError;
use crate::extract::types::ExtractedFields;
use crate::ingest::types::Article;

pub const EXTRACTION_INSTRUCTION: &str = r#"Extract the following information from the funding announcement:
- Project name
- Amount raised
- Lead investors
- Other backers
- Funding stage (pre-seed, seed, series A, etc.)
- Use of funds
- Company's Twitter account

Return the information as a single JSON object with exactly these keys:
"project" (string), "amount_raised" (string, as written in the article),
"lead_investors" (array of strings), "other_backers" (array of strings),
"funding_stage" (string), "use_of_funds" (string), "twitter_handle" (string or null).
Output only the JSON object."#;

pub fn build_prompt(article: &Article) -> String {
    format!(
        "{EXTRACTION_INSTRUCTION}\n\nArticle: {} {}",
        article.title, article.description
    )
}

pub fn parse_reply(reply: &str) -> Result<ExtractedFields, ExtractError> {
    let body = json_object_slice(reply)?;
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ExtractError::Malformed(format!("invalid json: {e}")))?;
    let Value::Object(obj) = value else {
        return Err(ExtractError::Malformed("reply is not a json object".into()));
    };

    Ok(ExtractedFields {
        project: required_non_empty(&obj, "project")?,
        amount_raised: required_non_empty(&obj, "amount_raised")?,
        lead_investors: required_list(&obj, "lead_investors")?,
        other_backers: required_list(&obj, "other_backers")?,
        funding_stage: required_string(&obj, "funding_stage")?,
        use_of_funds: required_string(&obj, "use_of_funds")?,
        twitter_handle: optional_string(&obj, "twitter_handle"),
    })
}

fn json_object_slice(reply: &str) -> Result<&str, ExtractError> {
    let trimmed = reply.trim();
    if trimmed.is_empty() {
        return Err(ExtractError::Refused);
    }
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&trimmed[start..=end]),
        _ => Err(ExtractError::Malformed("no json object in reply".into())),
    }
}

fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn required_string(obj: &Map<String, Value>, key: &'static str) -> Result<String, ExtractError> {
    match obj.get(key) {
        None | Some(Value::Null) => Err(ExtractError::MissingField(key)),
        Some(v) => scalar_to_string(v)
            .ok_or_else(|| ExtractError::Malformed(format!("`{key}` is not a string"))),
    }
}

fn required_non_empty(obj: &Map<String, Value>, key: &'static str) -> Result<String, ExtractError> {
    let s = required_string(obj, key)?;
    if s.is_empty() {
        return Err(ExtractError::MissingField(key));
    }
    Ok(s)
}

fn required_list(obj: &Map<String, Value>, key: &'static str) -> Result<Vec<String>, ExtractError> {
    match obj.get(key) {
        None | Some(Value::Null) => Err(ExtractError::MissingField(key)),
        Some(Value::Array(items)) => Ok(items
            .iter()
            .filter_map(scalar_to_string)
            .filter(|s| !s.is_empty())
            .collect()),
        Some(v) => {
            let s = scalar_to_string(v)
                .ok_or_else(|| ExtractError::Malformed(format!("`{key}` is not a list")))?;
            Ok(if s.is_empty() { Vec::new() } else { vec![s] })
        }
    }
}

fn optional_string(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(scalar_to_string)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{
        "project": "Acme",
        "amount_raised": "$5M",
        "lead_investors": ["Sequoia"],
        "other_backers": ["Y Combinator", "SV Angel"],
        "funding_stage": "Seed",
        "use_of_funds": "hire engineers",
        "twitter_handle": "@acme"
    }"#;

    #[test]
    fn prompt_embeds_title_description_and_instruction() {
        let a = Article {
            title: "Acme raises $5M".into(),
            link: "https://x.test/acme".into(),
            published: "Mon, 06 May 2024 14:03:00 GMT".into(),
            source: None,
            description: "Seed round led by Sequoia".into(),
        };
        let p = build_prompt(&a);
        assert!(p.starts_with(EXTRACTION_INSTRUCTION));
        assert!(p.ends_with("Article: Acme raises $5M Seed round led by Sequoia"));
        for key in [
            "\"project\"",
            "\"amount_raised\"",
            "\"lead_investors\"",
            "\"other_backers\"",
            "\"funding_stage\"",
            "\"use_of_funds\"",
            "\"twitter_handle\"",
        ] {
            assert!(p.contains(key), "prompt should name {key}");
        }
    }

    #[test]
    fn parses_full_object() {
        let f = parse_reply(FULL).unwrap();
        assert_eq!(f.project, "Acme");
        assert_eq!(f.amount_raised, "$5M");
        assert_eq!(f.other_backers, vec!["Y Combinator", "SV Angel"]);
        assert_eq!(f.twitter_handle.as_deref(), Some("@acme"));
    }

    #[test]
    fn strips_code_fences_and_chatter() {
        let reply = format!("Sure! Here it is:\n```json\n{FULL}\n```");
        assert_eq!(parse_reply(&reply).unwrap().project, "Acme");
    }

    #[test]
    fn lenient_shapes_are_accepted() {
        let reply = r#"{"project":"Beta","amount_raised":12000000,"lead_investors":"a16z",
            "other_backers":[],"funding_stage":"","use_of_funds":"","twitter_handle":null}"#;
        let f = parse_reply(reply).unwrap();
        assert_eq!(f.amount_raised, "12000000");
        assert_eq!(f.lead_investors, vec!["a16z"]);
        assert!(f.other_backers.is_empty());
        assert_eq!(f.twitter_handle, None);
    }

    #[test]
    fn missing_or_null_fields_are_reported() {
        let no_amount = r#"{"project":"Acme","lead_investors":[],"other_backers":[],
            "funding_stage":"Seed","use_of_funds":"x"}"#;
        assert_eq!(
            parse_reply(no_amount),
            Err(ExtractError::MissingField("amount_raised"))
        );

        let null_stage = r#"{"project":"Acme","amount_raised":"$1M","lead_investors":[],
            "other_backers":[],"funding_stage":null,"use_of_funds":"x"}"#;
        assert_eq!(
            parse_reply(null_stage),
            Err(ExtractError::MissingField("funding_stage"))
        );

        let empty_project = r#"{"project":" ","amount_raised":"$1M","lead_investors":[],
            "other_backers":[],"funding_stage":"","use_of_funds":""}"#;
        assert_eq!(
            parse_reply(empty_project),
            Err(ExtractError::MissingField("project"))
        );
    }

    #[test]
    fn garbage_is_malformed_and_empty_is_refused() {
        assert!(matches!(
            parse_reply("I cannot help with that."),
            Err(ExtractError::Malformed(_))
        ));
        assert!(matches!(
            parse_reply("{ not json }"),
            Err(ExtractError::Malformed(_))
        ));
        assert!(matches!(
            parse_reply(r#"{"project": {"name": "Acme"}, "amount_raised": "1"}"#),
            Err(ExtractError::Malformed(_))
        ));
        assert_eq!(parse_reply("   "), Err(ExtractError::Refused));
    }
}
