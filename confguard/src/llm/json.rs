//! Extracting a JSON object from noisy generative output. Extraction never
//! errors; the orchestrator treats `None` as "no parseable findings", which
//! keeps its control flow branch-based rather than exception-based.

use std::future::Future;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use super::GenError;

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)```json|```").unwrap())
}

/// Extracts and parses a JSON value from raw model output: strips code
/// fences, tries a direct parse, then the first-`{`-to-last-`}` substring.
/// Returns `None` on anything unparseable.
#[must_use]
pub fn extract_and_parse_json(raw: &str) -> Option<Value> {
    let s = fence_re().replace_all(raw, "");
    let s = s.trim();

    if let Ok(value) = serde_json::from_str::<Value>(s) {
        if !value.is_null() {
            return Some(value);
        }
    }

    let first = s.find('{')?;
    let last = s.rfind('}')?;
    if last > first {
        return serde_json::from_str(&s[first..=last]).ok();
    }
    None
}

/// Tries direct extraction; on failure, invokes `repair` exactly once with
/// the original raw text and retries extraction on its output.
///
/// A second extraction failure is terminal for this call and yields
/// `Ok(None)`; only transport failures from the repair call itself
/// propagate as errors.
pub async fn parse_with_repair<F, Fut>(raw: &str, repair: F) -> Result<Option<Value>, GenError>
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<String, GenError>>,
{
    if let Some(value) = extract_and_parse_json(raw) {
        return Ok(Some(value));
    }
    let repaired = repair(raw.to_owned()).await?;
    Ok(extract_and_parse_json(&repaired))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_json_extracts_directly() {
        let raw = "Here is the result:\n```json\n{\"fileType\":\"env\",\"summary\":\"ok\",\"findings\":[]}\n```";
        let value = extract_and_parse_json(raw).unwrap();
        assert_eq!(value["fileType"], "env");
        assert_eq!(value["summary"], "ok");
        assert!(value["findings"].as_array().unwrap().is_empty());
    }

    #[test]
    fn prose_around_braces_is_tolerated() {
        let raw = "Sure! {\"summary\": \"fine\"} Hope that helps.";
        let value = extract_and_parse_json(raw).unwrap();
        assert_eq!(value["summary"], "fine");
    }

    #[test]
    fn garbage_returns_none() {
        assert!(extract_and_parse_json("not json at all").is_none());
        assert!(extract_and_parse_json("").is_none());
        assert!(extract_and_parse_json("{ broken").is_none());
    }

    #[tokio::test]
    async fn repair_is_not_called_when_direct_parse_succeeds() {
        let out = parse_with_repair("{\"a\":1}", |_| async {
            panic!("repair must not run");
            #[allow(unreachable_code)]
            Ok(String::new())
        })
        .await
        .unwrap();
        assert_eq!(out.unwrap()["a"], 1);
    }

    #[tokio::test]
    async fn repair_round_trip_recovers_json() {
        let out = parse_with_repair("totally broken", |bad| async move {
            assert_eq!(bad, "totally broken");
            Ok("{\"fixed\":true}".to_owned())
        })
        .await
        .unwrap();
        assert_eq!(out.unwrap()["fixed"], true);
    }

    #[tokio::test]
    async fn double_failure_is_none_not_error() {
        let out = parse_with_repair("not json at all", |_| async {
            Ok("still not json".to_owned())
        })
        .await
        .unwrap();
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn repair_transport_error_propagates() {
        let out = parse_with_repair("not json", |_| async {
            Err(GenError::Timeout)
        })
        .await;
        assert_eq!(out, Err(GenError::Timeout));
    }
}
