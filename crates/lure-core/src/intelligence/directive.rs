//! The extraction directive sent as the system turn of every extraction.
//!
//! The JSON skeleton and per-category guidance follow the configured
//! [`CategorySet`], so the model is always asked for exactly the categories
//! the parser will keep.

use std::fmt::Write;

use lure_types::intelligence::CategorySet;

const PREAMBLE: &str = "You are an intelligence extraction system. Analyze the conversation and extract ONLY explicitly mentioned data.

CRITICAL RULES:
- ONLY extract data that is EXPLICITLY written in the conversation
- NEVER guess, predict, or fabricate any values
- If no data is found for a field, return an empty array []
- Be conservative - when in doubt, don't include it
- Lines tagged \"scammer\" come from the other party; lines tagged \"user\" are the honeypot persona. Only extract data the scammer provided.";

const CLOSING: &str = "If the conversation is casual/normal with no scam indicators, set isScam to false, threatLevel to \"low\", and leave every list empty.";

fn category_hint(key: &str) -> Option<&'static str> {
    let hint = match key {
        CategorySet::BANK_ACCOUNTS => "actual account numbers written out (format as XXXX-XXXX-XXXX)",
        CategorySet::UPI_IDS => "format name@provider (e.g., john@upi)",
        CategorySet::PHISHING_LINKS => "actual links/domains/URLs sent to lure the victim",
        CategorySet::PHONE_NUMBERS => "actual digits provided (format as +91XXXXXXXXXX)",
        CategorySet::SUSPICIOUS_KEYWORDS => {
            "words like \"urgent\", \"verify now\", \"account blocked\", \"prize\", \"lottery\", \"OTP\""
        }
        CategorySet::EMAILS => "email addresses exactly as written",
        CategorySet::URLS => "any link, domain, or URL exactly as written",
        CategorySet::CRYPTO_WALLETS => "cryptocurrency wallet addresses exactly as written",
        CategorySet::NAMES => "names the other party gave for themselves or others",
        CategorySet::ORGANIZATIONS => "banks, companies, or agencies the other party claims to represent",
        _ => return None,
    };
    Some(hint)
}

/// Build the directive for a category set.
pub fn extraction_directive(categories: &CategorySet) -> String {
    let mut out = String::with_capacity(2048);
    out.push_str(PREAMBLE);
    out.push_str("\n\nReturn a JSON object:\n{\n");
    out.push_str("  \"isScam\": boolean,\n");
    out.push_str("  \"scamType\": string or null,\n");
    out.push_str("  \"threatLevel\": \"low\" | \"medium\" | \"high\" | \"critical\",\n");
    out.push_str("  \"confidence\": number (0-100),\n");
    out.push_str("  \"extractedData\": {\n");
    let keys: Vec<&str> = categories.iter().collect();
    for (i, key) in keys.iter().enumerate() {
        let comma = if i + 1 < keys.len() { "," } else { "" };
        let _ = writeln!(out, "    \"{key}\": []{comma}");
    }
    out.push_str("  },\n");
    out.push_str("  \"indicators\": [],\n");
    out.push_str("  \"summary\": string,\n");
    out.push_str("  \"agentNotes\": string (brief notes about scammer tactics observed)\n}\n\n");

    out.push_str("EXTRACTION PATTERNS (only if explicitly present):\n");
    for key in &keys {
        match category_hint(key) {
            Some(hint) => {
                let _ = writeln!(out, "- {key}: {hint}");
            }
            None => {
                let _ = writeln!(out, "- {key}: values of this kind exactly as written");
            }
        }
    }

    out.push('\n');
    out.push_str(CLOSING);
    out
}
