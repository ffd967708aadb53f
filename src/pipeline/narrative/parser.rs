use super::prompt::{
    LIFESTYLE_ADVICE_HEADER, METRICS_BLOCK_END, METRICS_BLOCK_START, RISK_FACTORS_HEADER,
};
use super::types::NarrativeAnalysis;
use crate::pipeline::metrics::StructuredRecord;

pub const DEFAULT_RISK_FACTOR: &str = "Your blood report looks good! Keep up the healthy habits.";

pub const DEFAULT_LIFESTYLE_ADVICE: [&str; 3] =
    ["Eat healthy foods", "Exercise regularly", "Get enough sleep"];

/// Parse the provider's free-form reply.
///
/// Never fails: missing sections fall back to the defaults and a malformed
/// metrics block is treated as absent.
pub fn parse_narrative(response: &str) -> NarrativeAnalysis {
    let (prose, records) = split_metrics_block(response);

    let (risk_section, advice_section) = match prose.split_once(LIFESTYLE_ADVICE_HEADER) {
        Some((risk, advice)) => (risk, advice),
        None => (prose.as_str(), ""),
    };

    let mut risk_factors = bullet_items(&risk_section.replace(RISK_FACTORS_HEADER, ""));
    if risk_factors.is_empty() {
        risk_factors = vec![DEFAULT_RISK_FACTOR.to_string()];
    }

    let mut lifestyle_advice = bullet_items(advice_section);
    if lifestyle_advice.is_empty() {
        lifestyle_advice = DEFAULT_LIFESTYLE_ADVICE.iter().map(|s| s.to_string()).collect();
    }

    NarrativeAnalysis {
        risk_factors,
        lifestyle_advice,
        records,
    }
}

/// Lines starting with `-` or `•`, marker and leading spaces removed.
fn bullet_items(section: &str) -> Vec<String> {
    section
        .lines()
        .map(str::trim)
        .filter_map(|line| {
            line.strip_prefix('-')
                .or_else(|| line.strip_prefix('•'))
                .map(str::trim_start)
        })
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Cut the metrics block out of the prose and parse it.
///
/// A start marker without an end marker drops everything after the start.
fn split_metrics_block(response: &str) -> (String, Option<Vec<StructuredRecord>>) {
    let Some(start) = response.find(METRICS_BLOCK_START) else {
        return (response.to_string(), None);
    };

    let body_start = start + METRICS_BLOCK_START.len();
    let Some(body_len) = response[body_start..].find(METRICS_BLOCK_END) else {
        tracing::warn!("Metrics block has no end marker, ignoring it");
        return (response[..start].to_string(), None);
    };

    let body = &response[body_start..body_start + body_len];
    let rest = &response[body_start + body_len + METRICS_BLOCK_END.len()..];
    let prose = format!("{}{}", &response[..start], rest);

    (prose, parse_records(body))
}

fn parse_records(body: &str) -> Option<Vec<StructuredRecord>> {
    let json = strip_code_fence(body.trim());

    let value: serde_json::Value = match serde_json::from_str(json) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "Metrics block is not valid JSON, ignoring it");
            return None;
        }
    };

    let serde_json::Value::Array(items) = value else {
        tracing::warn!("Metrics block is not a JSON array, ignoring it");
        return None;
    };

    Some(parse_array_lenient(&items))
}

/// Skips items that do not deserialize (non-objects, wrong field types).
fn parse_array_lenient(items: &[serde_json::Value]) -> Vec<StructuredRecord> {
    items
        .iter()
        .filter_map(|v| serde_json::from_value(v.clone()).ok())
        .collect()
}

fn strip_code_fence(text: &str) -> &str {
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_response() -> &'static str {
        "RISK FACTORS:\n\
         - Your sugar level is a little high\n\
         • Your iron is low\n\
         \n\
         LIFESTYLE ADVICE:\n\
         - Drink more water\n\
         -   Play outside every day\n\
         Some closing remark without a bullet.\n"
    }

    #[test]
    fn parses_both_sections() {
        let parsed = parse_narrative(sample_response());
        assert_eq!(
            parsed.risk_factors,
            vec!["Your sugar level is a little high", "Your iron is low"]
        );
        assert_eq!(
            parsed.lifestyle_advice,
            vec!["Drink more water", "Play outside every day"]
        );
        assert!(parsed.records.is_none());
    }

    #[test]
    fn empty_response_uses_defaults() {
        let parsed = parse_narrative("");
        assert_eq!(parsed.risk_factors, vec![DEFAULT_RISK_FACTOR]);
        assert_eq!(parsed.lifestyle_advice, DEFAULT_LIFESTYLE_ADVICE.to_vec());
    }

    #[test]
    fn missing_advice_header_treats_all_bullets_as_risks() {
        let parsed = parse_narrative("RISK FACTORS:\n- High cholesterol\n- Low vitamin D");
        assert_eq!(parsed.risk_factors, vec!["High cholesterol", "Low vitamin D"]);
        assert_eq!(parsed.lifestyle_advice, DEFAULT_LIFESTYLE_ADVICE.to_vec());
    }

    #[test]
    fn empty_bullets_are_dropped() {
        let parsed = parse_narrative("RISK FACTORS:\n-\n- \nLIFESTYLE ADVICE:\n- Sleep well");
        assert_eq!(parsed.risk_factors, vec![DEFAULT_RISK_FACTOR]);
        assert_eq!(parsed.lifestyle_advice, vec!["Sleep well"]);
    }

    #[test]
    fn metrics_block_is_parsed_and_removed_from_prose() {
        let response = "RISK FACTORS:\n- Sugar is high\n\
                        METRICS_JSON_START\n\
                        [{\"test\": \"Glucose\", \"value\": 130, \"unit\": \"mg/dL\"}, \
                         {\"test\": \"HDL\", \"value\": \"45\"}]\n\
                        METRICS_JSON_END\n\
                        LIFESTYLE ADVICE:\n- Eat fewer sweets";
        let parsed = parse_narrative(response);

        let records = parsed.records.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].test.as_deref(), Some("Glucose"));
        assert_eq!(records[0].value.as_deref(), Some("130"));
        assert_eq!(records[1].unit, None);

        assert_eq!(parsed.risk_factors, vec!["Sugar is high"]);
        assert_eq!(parsed.lifestyle_advice, vec!["Eat fewer sweets"]);
    }

    #[test]
    fn fenced_metrics_block_is_accepted() {
        let response = "METRICS_JSON_START\n```json\n[{\"test\": \"TSH\", \"value\": 2.1}]\n```\nMETRICS_JSON_END";
        let records = parse_narrative(response).records.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].value.as_deref(), Some("2.1"));
    }

    #[test]
    fn empty_metrics_array_is_present_but_empty() {
        let parsed = parse_narrative("METRICS_JSON_START\n[]\nMETRICS_JSON_END");
        assert_eq!(parsed.records, Some(vec![]));
    }

    #[test]
    fn invalid_metrics_json_is_absent() {
        let parsed = parse_narrative("METRICS_JSON_START\n[{not json\nMETRICS_JSON_END");
        assert!(parsed.records.is_none());
    }

    #[test]
    fn non_array_metrics_json_is_absent() {
        let parsed = parse_narrative("METRICS_JSON_START\n{\"test\": \"Glucose\"}\nMETRICS_JSON_END");
        assert!(parsed.records.is_none());
    }

    #[test]
    fn non_object_items_are_skipped() {
        let parsed = parse_narrative(
            "METRICS_JSON_START\n[42, \"Glucose\", {\"test\": \"ALT\", \"value\": 30}]\nMETRICS_JSON_END",
        );
        let records = parsed.records.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].test.as_deref(), Some("ALT"));
    }

    #[test]
    fn unterminated_block_is_dropped_with_its_tail() {
        let response = "RISK FACTORS:\n- Iron is low\nMETRICS_JSON_START\n[{\"test\": \"ALT\"}]\n- not a risk";
        let parsed = parse_narrative(response);
        assert!(parsed.records.is_none());
        assert_eq!(parsed.risk_factors, vec!["Iron is low"]);
    }
}
