//! Reporting helpers: p-value text handling and effect-size labels.

use once_cell::sync::Lazy;
use regex::Regex;

static P_LESS_THAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<\s*([0-9]*\.?[0-9]+)").expect("Invalid regex: p less-than"));
static PLAIN_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?[0-9]*\.?[0-9]+([eE][+-]?[0-9]+)?$").expect("Invalid regex: number")
});
static EMBEDDED_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]*\.?[0-9]+").expect("Invalid regex: embedded number"));

const EMPTY_MARKERS: [&str; 7] = ["", "na", "nan", "none", "null", "--", "n/a"];

fn plausible(p: f64) -> Option<f64> {
    (0.0..=1.5).contains(&p).then_some(p)
}

/// Parse a p-value written as text ("0.05", "<0.001", "p=0.034", "NA").
///
/// A bound such as `<0.05` maps to half the bound, floored at 1e-6.
/// Placeholders and out-of-range numbers yield `None`.
pub fn clean_p_value(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if EMPTY_MARKERS.contains(&trimmed.to_ascii_lowercase().as_str()) {
        return None;
    }

    let compact: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    if let Some(caps) = P_LESS_THAN.captures(&compact) {
        let bound: f64 = caps.get(1)?.as_str().parse().ok()?;
        return Some((bound / 2.0).max(1e-6));
    }
    if PLAIN_NUMBER.is_match(trimmed) {
        return plausible(trimmed.parse().ok()?);
    }
    EMBEDDED_NUMBER
        .find(trimmed)
        .and_then(|m| m.as_str().parse().ok())
        .and_then(plausible)
}

/// "<0.001" below one in a thousand, three decimals otherwise.
pub fn format_p_value(p: f64) -> String {
    if p.is_nan() {
        String::new()
    } else if p < 0.001 {
        "<0.001".to_string()
    } else {
        format!("{:.3}", p)
    }
}

/// `**` for p < 0.01, `*` for p < 0.05.
pub fn significance_marker(p: f64) -> &'static str {
    if p.is_nan() {
        ""
    } else if p < 0.01 {
        "**"
    } else if p < 0.05 {
        "*"
    } else {
        ""
    }
}

pub fn cohens_d_label(d: f64) -> &'static str {
    match d.abs() {
        x if x < 0.2 => "negligible",
        x if x < 0.5 => "small",
        x if x < 0.8 => "medium",
        _ => "large",
    }
}

pub fn cramers_v_label(v: f64) -> &'static str {
    match v.abs() {
        x if x < 0.1 => "negligible",
        x if x < 0.3 => "weak",
        x if x < 0.5 => "moderate",
        _ => "strong",
    }
}

/// Strength of a correlation coefficient.
pub fn correlation_label(r: f64) -> &'static str {
    match r.abs() {
        x if x < 0.1 => "negligible",
        x if x < 0.3 => "weak",
        x if x < 0.7 => "moderate",
        _ => "strong",
    }
}

pub fn eta_squared_label(eta: f64) -> &'static str {
    match eta {
        x if x < 0.01 => "negligible",
        x if x < 0.06 => "small",
        x if x < 0.14 => "medium",
        _ => "large",
    }
}

/// Conventional reading of Cronbach's alpha.
pub fn alpha_label(alpha: f64) -> &'static str {
    match alpha {
        x if x >= 0.9 => "excellent",
        x if x >= 0.8 => "good",
        x if x >= 0.7 => "acceptable",
        x if x >= 0.6 => "questionable",
        _ => "poor",
    }
}

pub fn kmo_label(kmo: f64) -> &'static str {
    match kmo {
        x if x >= 0.8 => "meritorious",
        x if x >= 0.7 => "middling",
        x if x >= 0.6 => "mediocre",
        _ => "unacceptable",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_p_value() {
        assert_eq!(clean_p_value("0.05"), Some(0.05));
        assert_eq!(clean_p_value(" 0.05 "), Some(0.05));
        assert_eq!(clean_p_value("<0.001"), Some(0.0005));
        assert_eq!(clean_p_value("< .05"), Some(0.025));
        assert_eq!(clean_p_value("1e-5"), Some(1e-5));
        assert_eq!(clean_p_value("p=0.034"), Some(0.034));
        assert_eq!(clean_p_value("NA"), None);
        assert_eq!(clean_p_value("7"), None);
        assert_eq!(clean_p_value("n/a"), None);
    }

    #[test]
    fn test_format_p_value() {
        assert_eq!(format_p_value(0.0004), "<0.001");
        assert_eq!(format_p_value(0.04567), "0.046");
        assert_eq!(format_p_value(f64::NAN), "");
    }

    #[test]
    fn test_significance_marker() {
        assert_eq!(significance_marker(0.001), "**");
        assert_eq!(significance_marker(0.03), "*");
        assert_eq!(significance_marker(0.2), "");
    }

    #[test]
    fn test_labels() {
        assert_eq!(cohens_d_label(-0.6), "medium");
        assert_eq!(cramers_v_label(0.35), "moderate");
        assert_eq!(correlation_label(0.75), "strong");
        assert_eq!(eta_squared_label(0.07), "medium");
        assert_eq!(alpha_label(0.82), "good");
        assert_eq!(alpha_label(0.4), "poor");
        assert_eq!(kmo_label(0.65), "mediocre");
    }
}
