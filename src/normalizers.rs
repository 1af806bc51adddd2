//! Pure value normalizers shared by every stage of the pipeline.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

const UNKNOWN_BRANCH: &str = "DESCONOCIDA";

static SPANISH_LONG_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2})\s+de\s+([a-z]+)\s+de\s+(\d{4})").expect("valid long date pattern")
});

static CLOCK_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2}):(\d{2})(?::\d{2})?").expect("valid time pattern"));

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

static SHORT_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,4})([-/.])(\d{1,2})([-/.])(\d{1,4})$").expect("valid short date pattern")
});

/// Replaces accented vowels with their plain form, keeping every other character.
pub fn fold_accents(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'Á' | 'À' | 'Ä' => 'A',
            'É' | 'È' | 'Ë' => 'E',
            'Í' | 'Ì' | 'Ï' => 'I',
            'Ó' | 'Ò' | 'Ö' => 'O',
            'Ú' | 'Ù' | 'Ü' => 'U',
            'á' | 'à' | 'ä' => 'a',
            'é' | 'è' | 'ë' => 'e',
            'í' | 'ì' | 'ï' => 'i',
            'ó' | 'ò' | 'ö' => 'o',
            'ú' | 'ù' | 'ü' => 'u',
            other => other,
        })
        .collect()
}

/// Upper-cased, accent-folded, trimmed form used for every keyword comparison.
pub fn normalize_text(text: &str) -> String {
    fold_accents(text.trim()).to_uppercase()
}

/// Parses a currency or quantity cell. Anything unparseable is 0.0.
pub fn parse_amount(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if matches!(trimmed, "" | "-" | "$-" | ".") {
        return 0.0;
    }

    let cleaned: String = trimmed
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' ' | '\u{a0}'))
        .collect();

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

fn spanish_month(name: &str) -> Option<u32> {
    let month = match name {
        "enero" => 1,
        "febrero" => 2,
        "marzo" => 3,
        "abril" => 4,
        "mayo" => 5,
        "junio" => 6,
        "julio" => 7,
        "agosto" => 8,
        "septiembre" | "setiembre" => 9,
        "octubre" => 10,
        "noviembre" => 11,
        "diciembre" => 12,
        _ => return None,
    };
    Some(month)
}

/// Canonicalizes a date cell. Day-first short formats are assumed for slashed dates.
pub fn canonical_date(raw: &str) -> Option<NaiveDate> {
    let lowered = fold_accents(raw.trim()).to_lowercase();
    if lowered.is_empty() {
        return None;
    }

    if let Some(caps) = SPANISH_LONG_DATE.captures(&lowered) {
        let day: u32 = caps[1].parse().ok()?;
        let month = spanish_month(&caps[2])?;
        let year: i32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    let date_part = lowered
        .split(|c: char| c.is_whitespace() || c == 't')
        .next()
        .unwrap_or("");

    short_date(date_part)
}

/// `YYYY-MM-DD` when the first field has four digits, otherwise day-first with a
/// four or two digit year. Two digit years follow chrono's `%y` pivot (00-68 is 20xx).
fn short_date(text: &str) -> Option<NaiveDate> {
    let caps = SHORT_DATE.captures(text)?;
    if caps[2] != caps[4] {
        return None;
    }

    let (first, middle, last) = (&caps[1], &caps[3], &caps[5]);
    let month: u32 = middle.parse().ok()?;

    if first.len() == 4 {
        if last.len() > 2 {
            return None;
        }
        return NaiveDate::from_ymd_opt(first.parse().ok()?, month, last.parse().ok()?);
    }
    if first.len() > 2 {
        return None;
    }

    let day: u32 = first.parse().ok()?;
    let year: i32 = match last.len() {
        4 => last.parse().ok()?,
        2 => {
            let short: i32 = last.parse().ok()?;
            if short < 69 {
                2000 + short
            } else {
                1900 + short
            }
        }
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// The raw time text that identifies a sale: the last whitespace-separated token.
pub fn raw_time_token(raw: &str) -> String {
    raw.split_whitespace().last().unwrap_or("").to_string()
}

/// Renders a time cell as zero-padded `HH:MM`, or `00:00` when no clock time is present.
pub fn canonical_time(raw: &str) -> String {
    let token = raw_time_token(raw);
    let captures = CLOCK_TIME
        .captures(&token)
        .or_else(|| CLOCK_TIME.captures_iter(raw).last());

    match captures {
        Some(caps) => {
            let hour: u32 = caps[1].parse().unwrap_or(0);
            let minute: u32 = caps[2].parse().unwrap_or(0);
            if hour > 23 || minute > 59 {
                return "00:00".to_string();
            }
            format!("{:02}:{:02}", hour, minute)
        }
        None => "00:00".to_string(),
    }
}

/// Canonical branch identifier: upper-cased, cut at the first dash, whitespace collapsed.
pub fn canonical_branch(raw: &str) -> String {
    let upper = raw.trim().to_uppercase();
    let head = upper.split('-').next().unwrap_or("");
    let collapsed = WHITESPACE_RUN.replace_all(head, " ");
    let branch = collapsed.trim();

    if branch.is_empty() {
        UNKNOWN_BRANCH.to_string()
    } else {
        branch.to_string()
    }
}
