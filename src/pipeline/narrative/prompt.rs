pub const METRICS_BLOCK_START: &str = "METRICS_JSON_START";
pub const METRICS_BLOCK_END: &str = "METRICS_JSON_END";

pub const RISK_FACTORS_HEADER: &str = "RISK FACTORS:";
pub const LIFESTYLE_ADVICE_HEADER: &str = "LIFESTYLE ADVICE:";

/// Build the analysis prompt for one report.
pub fn build_analysis_prompt(report_text: &str) -> String {
    format!(
        r#"You are a friendly health educator who explains medical information in plain, simple language.

Analyze this blood report and provide:

1. RISK FACTORS (3-5 items): Identify any concerning values or potential health risks.
   Format each as a simple, clear statement.

2. LIFESTYLE ADVICE (5-7 items): Give actionable advice to improve health.
   Use simple language and positive encouragement.

Blood Report Content:
<report>
{report_text}
</report>

IMPORTANT: Format your response EXACTLY like this:

{RISK_FACTORS_HEADER}
- [risk factor 1]
- [risk factor 2]
- [risk factor 3]

{LIFESTYLE_ADVICE_HEADER}
- [advice 1]
- [advice 2]
- [advice 3]
- [advice 4]
- [advice 5]

Then, if the report contains lab measurements, list every one you can read
between these two marker lines as a JSON array. Copy values and units exactly
as written. Omit the block entirely if there are no measurements.

{METRICS_BLOCK_START}
[{{"test": "Glucose", "value": "95", "unit": "mg/dL"}}]
{METRICS_BLOCK_END}

Use simple words anyone would understand. Be encouraging and positive!"#
    )
}
