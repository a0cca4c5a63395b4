//! Reverse inference: tool name → natural-language request.

use once_cell::sync::Lazy;
use regex::Regex;

/// Naming conventions, most specific first.  `{}` receives the
/// de-hyphenated remainder of the name.
static NAMING_RULES: &[(&str, &str)] = &[
    (r"^get-aws-(.+)$", "show me AWS {}"),
    (r"^get-azure-(.+)$", "show me Azure {}"),
    (r"^get-gcp-(.+)$", "show me GCP {}"),
    (r"^list-(.+)$", "list all {}"),
    (r"^find-(.+)$", "find {}"),
    (r"^check-(.+)$", "check {}"),
    (r"^get-(.+)$", "show me {}"),
];

static COMPILED_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    NAMING_RULES
        .iter()
        .map(|(re, template)| (Regex::new(re).expect("valid naming rule"), *template))
        .collect()
});

fn normalize(name: &str) -> String {
    name.trim().to_lowercase().replace('_', "-")
}

/// Request implied by a conventional tool name, if it follows one.
pub fn infer_phrase(name: &str) -> Option<String> {
    let name = normalize(name);
    COMPILED_RULES.iter().find_map(|(re, template)| {
        let caps = re.captures(&name)?;
        let rest = caps[1].replace('-', " ");
        Some(template.replace("{}", rest.trim()))
    })
}

/// Name with separators turned into spaces.
pub fn readable(name: &str) -> String {
    normalize(name)
        .split('-')
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
