use serde::{Deserialize, Serialize};

/// 單一申請者的原始列片段 (1~3 個 `<tr>` HTML 字串)
///
/// 第一列固定存在，第二列 (徽章) 與第三列 (留言) 可選，順序不可顛倒。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct RowGroup {
    rows: Vec<String>,
}

impl RowGroup {
    /// 以申請者的第一列開啟新群組
    pub fn new(first_row: String) -> Self {
        Self {
            rows: vec![first_row],
        }
    }

    /// 從既有列重建群組，空序列視為無效
    pub fn from_rows(rows: Vec<String>) -> Option<Self> {
        if rows.is_empty() {
            None
        } else {
            Some(Self { rows })
        }
    }

    pub fn push(&mut self, row: String) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn summary_row(&self) -> &str {
        &self.rows[0]
    }

    pub fn badge_row(&self) -> Option<&str> {
        self.rows.get(1).map(String::as_str)
    }

    pub fn comment_row(&self) -> Option<&str> {
        self.rows.get(2).map(String::as_str)
    }
}

impl TryFrom<Vec<String>> for RowGroup {
    type Error = &'static str;

    fn try_from(rows: Vec<String>) -> Result<Self, Self::Error> {
        Self::from_rows(rows).ok_or("row group must contain at least one row")
    }
}

impl From<RowGroup> for Vec<String> {
    fn from(group: RowGroup) -> Self {
        group.rows
    }
}

/// 清洗後的申請者紀錄
///
/// 十四個欄位全部是 `Option<String>`；缺值序列化成 `null`，不省略鍵名。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantRecord {
    pub program: Option<String>,
    pub university: Option<String>,
    pub comments: Option<String>,
    pub date_added: Option<String>,
    pub url: Option<String>,
    pub status: Option<String>,
    pub date_decision: Option<String>,
    pub term: Option<String>,
    pub nationality: Option<String>,
    pub gre: Option<String>,
    pub gre_v: Option<String>,
    pub gre_aw: Option<String>,
    pub gpa: Option<String>,
    pub degree: Option<String>,
}

impl ApplicantRecord {
    pub const FIELD_NAMES: [&'static str; 14] = [
        "program",
        "university",
        "comments",
        "date_added",
        "url",
        "status",
        "date_decision",
        "term",
        "nationality",
        "gre",
        "gre_v",
        "gre_aw",
        "gpa",
        "degree",
    ];

    /// 已填入的欄位數
    pub fn populated_fields(&self) -> usize {
        [
            &self.program,
            &self.university,
            &self.comments,
            &self.date_added,
            &self.url,
            &self.status,
            &self.date_decision,
            &self.term,
            &self.nationality,
            &self.gre,
            &self.gre_v,
            &self.gre_aw,
            &self.gpa,
            &self.degree,
        ]
        .iter()
        .filter(|field| field.is_some())
        .count()
    }
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub records: Vec<ApplicantRecord>,
    pub csv_output: Option<String>,
}

/// Scrape 階段統計
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeSummary {
    pub pages_requested: u32,
    pub pages_fetched: u32,
    pub pages_resumed: u32,
    pub failed_pages: Vec<u32>,
    pub groups: usize,
    pub ads_dropped: usize,
    pub placeholders_dropped: usize,
    pub orphans_dropped: usize,
}
