use crate::core::markup::{
    child_elements, first_row, non_empty, parse_row_fragment, spaced_text, stripped_text,
};
use crate::domain::model::{ApplicantRecord, RowGroup};
use regex::Regex;
use scraper::{ElementRef, Selector};
use std::sync::LazyLock;

/// 站內相對連結的補全前綴
pub const RESULT_ORIGIN: &str = "https://www.thegradcafe.com";

static UNIVERSITY: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.tw-font-medium.tw-text-gray-900.tw-text-sm").unwrap()
});
static DIV: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div").unwrap());
static SPAN: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span").unwrap());
static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static BADGE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.tw-inline-flex").unwrap());
static PARAGRAPH: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p").unwrap());

static TERM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(Fall|Spring|Summer)\s*\d{4}").unwrap());
static GRE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^GRE (\d+)").unwrap());
static GRE_V_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^GRE V (\d+)").unwrap());
static GRE_AW_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^GRE AW ([\d.]+)").unwrap());
static GPA_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^GPA ([\d.]+)").unwrap());

/// 狀態關鍵字，依優先順序排列；先命中者勝出
static STATUS_RULES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    ["Accepted", "Rejected", "Wait listed", "Interview"]
        .into_iter()
        .map(|keyword| {
            let pattern = format!(r"{} on ([\w\s\d]+)", regex::escape(keyword));
            (keyword, Regex::new(&pattern).unwrap())
        })
        .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BadgeField {
    Term,
    Nationality,
    Gre,
    GreV,
    GreAw,
    Gpa,
}

impl BadgeField {
    fn slot(self, record: &mut ApplicantRecord) -> &mut Option<String> {
        match self {
            BadgeField::Term => &mut record.term,
            BadgeField::Nationality => &mut record.nationality,
            BadgeField::Gre => &mut record.gre,
            BadgeField::GreV => &mut record.gre_v,
            BadgeField::GreAw => &mut record.gre_aw,
            BadgeField::Gpa => &mut record.gpa,
        }
    }
}

struct BadgeRule {
    field: BadgeField,
    matches: fn(&str) -> bool,
    value: fn(&str) -> Option<String>,
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// 徽章規則表，由上而下比對，第一個命中的規則處理該徽章。
/// GRE 總分規則必須排除含 "V" 或 "AW" 的文字，否則會吃掉語文與寫作分數。
static BADGE_RULES: [BadgeRule; 6] = [
    BadgeRule {
        field: BadgeField::Term,
        matches: |text| TERM_RE.is_match(text),
        value: |text| Some(text.to_string()),
    },
    BadgeRule {
        field: BadgeField::Nationality,
        matches: |text| text == "American" || text == "International",
        value: |text| Some(text.to_string()),
    },
    BadgeRule {
        field: BadgeField::Gre,
        matches: |text| text.starts_with("GRE ") && !text.contains('V') && !text.contains("AW"),
        value: |text| first_capture(&GRE_RE, text),
    },
    BadgeRule {
        field: BadgeField::GreV,
        matches: |text| text.starts_with("GRE V"),
        value: |text| first_capture(&GRE_V_RE, text),
    },
    BadgeRule {
        field: BadgeField::GreAw,
        matches: |text| text.starts_with("GRE AW"),
        value: |text| first_capture(&GRE_AW_RE, text),
    },
    BadgeRule {
        field: BadgeField::Gpa,
        matches: |text| text.starts_with("GPA"),
        value: |text| first_capture(&GPA_RE, text),
    },
];

/// 把一組 1~3 列的 HTML 轉成申請者紀錄；任何缺漏都只會留下 `None`
pub fn extract_applicant(group: &RowGroup) -> ApplicantRecord {
    let mut record = ApplicantRecord::default();

    extract_summary_row(group.summary_row(), &mut record);

    if let Some(badges) = group.badge_row() {
        extract_badges(badges, &mut record);
    }

    if let Some(comment) = group.comment_row() {
        record.comments = extract_comment(comment);
    }

    record
}

fn extract_summary_row(fragment: &str, record: &mut ApplicantRecord) {
    let document = parse_row_fragment(fragment);
    let Some(row) = first_row(&document) else {
        tracing::debug!("Summary fragment has no table row");
        return;
    };
    let cells: Vec<ElementRef<'_>> = child_elements(row, "td").collect();

    if let Some(cell) = cells.first() {
        record.university = cell.select(&UNIVERSITY).next().map(stripped_text);
    }

    if let Some(program_div) = cells.get(1).and_then(|cell| cell.select(&DIV).next()) {
        let mut spans = program_div.select(&SPAN).map(stripped_text);
        record.program = spans.next();
        record.degree = spans.next();
    }

    if let Some(cell) = cells.get(2) {
        record.date_added = non_empty(stripped_text(*cell));
    }

    if let Some(status_div) = cells.get(3).and_then(|cell| cell.select(&DIV).next()) {
        let (status, decided_on) = parse_status(&stripped_text(status_div));
        record.status = Some(status);
        record.date_decision = decided_on;
    }

    if let Some(cell) = cells.get(4) {
        record.url = cell
            .select(&LINK)
            .filter_map(|link| link.value().attr("href"))
            .find(|href| href.contains("/result/"))
            .map(resolve_result_url);
    }

    if cells.len() < 5 {
        tracing::debug!("Summary row has only {} cells", cells.len());
    }
}

/// 回傳 (狀態, 決定日期)；沒有已知關鍵字時保留原文
pub fn parse_status(text: &str) -> (String, Option<String>) {
    for (keyword, decision_re) in STATUS_RULES.iter() {
        if text.contains(keyword) {
            return (keyword.to_string(), first_capture(decision_re, text));
        }
    }
    (text.trim().to_string(), None)
}

pub fn resolve_result_url(href: &str) -> String {
    if href.starts_with('/') {
        format!("{}{}", RESULT_ORIGIN, href)
    } else {
        href.to_string()
    }
}

/// 單一徽章文字套用規則表
pub fn classify_badge(text: &str, record: &mut ApplicantRecord) {
    if let Some(rule) = BADGE_RULES.iter().find(|rule| (rule.matches)(text)) {
        if let Some(value) = (rule.value)(text) {
            *rule.field.slot(record) = Some(value);
        }
    }
}

fn extract_badges(fragment: &str, record: &mut ApplicantRecord) {
    let document = parse_row_fragment(fragment);
    for badge in document.select(&BADGE) {
        classify_badge(&spaced_text(badge), record);
    }
}

fn extract_comment(fragment: &str) -> Option<String> {
    let document = parse_row_fragment(fragment);
    document.select(&PARAGRAPH).next().map(stripped_text)
}
