use crate::core::markup::child_elements;
use crate::domain::model::RowGroup;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static TABLE_BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tbody").unwrap());
static AD_PLACEMENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[id^="results-ad-placement"]"#).unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Advertisement,
    Placeholder,
    /// 沒有 class 的列：新申請者的第一列
    Applicant,
    /// 帶 class 的列：接在目前申請者之後
    Continuation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedRow {
    pub kind: RowKind,
    pub markup: String,
}

impl ClassifiedRow {
    pub fn new(kind: RowKind, markup: impl Into<String>) -> Self {
        Self {
            kind,
            markup: markup.into(),
        }
    }
}

/// 依序套用廣告、佔位列過濾，最後才看 class 標記
pub fn classify_row(row: ElementRef<'_>) -> RowKind {
    if row.select(&AD_PLACEMENT).next().is_some() {
        return RowKind::Advertisement;
    }

    let mut cells = child_elements(row, "td");
    if let (Some(only), None) = (cells.next(), cells.next()) {
        if only.text().all(|piece| piece.trim().is_empty()) {
            return RowKind::Placeholder;
        }
    }

    if row.value().classes().next().is_none() {
        RowKind::Applicant
    } else {
        RowKind::Continuation
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupingStats {
    pub ads_dropped: usize,
    pub placeholders_dropped: usize,
    pub orphans_dropped: usize,
}

#[derive(Debug)]
enum GroupState {
    AwaitingApplicant,
    InGroup(RowGroup),
}

/// 兩狀態自動機：把已分類的列切成申請者群組
///
/// 群組只在下一位申請者出現或輸入結束時才送出。
#[derive(Debug)]
pub struct GroupRows<I> {
    rows: I,
    state: GroupState,
    stats: GroupingStats,
}

impl<I> GroupRows<I>
where
    I: Iterator<Item = ClassifiedRow>,
{
    pub fn new(rows: I) -> Self {
        Self {
            rows,
            state: GroupState::AwaitingApplicant,
            stats: GroupingStats::default(),
        }
    }

    pub fn stats(&self) -> GroupingStats {
        self.stats
    }
}

impl<I> Iterator for GroupRows<I>
where
    I: Iterator<Item = ClassifiedRow>,
{
    type Item = RowGroup;

    fn next(&mut self) -> Option<RowGroup> {
        for row in self.rows.by_ref() {
            match row.kind {
                RowKind::Advertisement => self.stats.ads_dropped += 1,
                RowKind::Placeholder => self.stats.placeholders_dropped += 1,
                RowKind::Applicant => {
                    let opened = GroupState::InGroup(RowGroup::new(row.markup));
                    if let GroupState::InGroup(closed) = std::mem::replace(&mut self.state, opened) {
                        return Some(closed);
                    }
                }
                RowKind::Continuation => match &mut self.state {
                    GroupState::InGroup(group) => group.push(row.markup),
                    GroupState::AwaitingApplicant => {
                        tracing::debug!("Dropping continuation row with no open applicant");
                        self.stats.orphans_dropped += 1;
                    }
                },
            }
        }

        match std::mem::replace(&mut self.state, GroupState::AwaitingApplicant) {
            GroupState::InGroup(group) => Some(group),
            GroupState::AwaitingApplicant => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageGrouping {
    pub groups: Vec<RowGroup>,
    pub stats: GroupingStats,
    pub table_found: bool,
}

/// 解析一頁 HTML，取出 `tbody` 的直接子列並分組
pub fn group_page(html: &str) -> PageGrouping {
    let document = Html::parse_document(html);

    let Some(body) = document.select(&TABLE_BODY).next() else {
        return PageGrouping::default();
    };

    let rows = child_elements(body, "tr").map(|row| ClassifiedRow {
        kind: classify_row(row),
        markup: row.html(),
    });

    let mut grouper = GroupRows::new(rows);
    let groups: Vec<RowGroup> = grouper.by_ref().collect();

    PageGrouping {
        groups,
        stats: grouper.stats(),
        table_found: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUMMARY_A: &str = r#"<tr><td><div class="tw-font-medium tw-text-gray-900 tw-text-sm">MIT</div></td><td>CS</td><td>Jan 1</td><td>Accepted</td><td></td></tr>"#;
    const SUMMARY_B: &str = r#"<tr><td><div class="tw-font-medium tw-text-gray-900 tw-text-sm">CMU</div></td><td>ML</td><td>Jan 2</td><td>Rejected</td><td></td></tr>"#;
    const BADGES: &str = r#"<tr class="tw-border-none"><td colspan="3"><div class="tw-inline-flex">Fall 2025</div></td></tr>"#;
    const COMMENT: &str = r#"<tr class="tw-border-none"><td colspan="3"><p>hello</p></td></tr>"#;
    const AD: &str = r#"<tr class="tw-border-none"><td colspan="5"><div id="results-ad-placement-2">Advertisement</div></td></tr>"#;
    const PLACEHOLDER: &str = r#"<tr><td colspan="5">   </td></tr>"#;

    fn page(rows: &[&str]) -> String {
        format!(
            "<html><body><table><thead><tr><th>School</th></tr></thead><tbody>{}</tbody></table></body></html>",
            rows.concat()
        )
    }

    fn row(kind: RowKind, markup: &str) -> ClassifiedRow {
        ClassifiedRow::new(kind, markup)
    }

    #[test]
    fn test_state_machine_boundaries() {
        let rows = vec![
            row(RowKind::Applicant, "a1"),
            row(RowKind::Continuation, "a2"),
            row(RowKind::Continuation, "a3"),
            row(RowKind::Applicant, "b1"),
            row(RowKind::Applicant, "c1"),
            row(RowKind::Continuation, "c2"),
        ];

        let groups: Vec<RowGroup> = GroupRows::new(rows.into_iter()).collect();

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].rows(), ["a1", "a2", "a3"]);
        assert_eq!(groups[1].rows(), ["b1"]);
        assert_eq!(groups[2].rows(), ["c1", "c2"]);
    }

    #[test]
    fn test_filtered_rows_do_not_close_group() {
        let rows = vec![
            row(RowKind::Applicant, "a1"),
            row(RowKind::Advertisement, "ad"),
            row(RowKind::Placeholder, ""),
            row(RowKind::Continuation, "a2"),
        ];

        let mut grouper = GroupRows::new(rows.into_iter());
        let groups: Vec<RowGroup> = grouper.by_ref().collect();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].rows(), ["a1", "a2"]);
        assert_eq!(grouper.stats().ads_dropped, 1);
        assert_eq!(grouper.stats().placeholders_dropped, 1);
    }

    #[test]
    fn test_leading_continuation_is_dropped() {
        let rows = vec![
            row(RowKind::Continuation, "stray"),
            row(RowKind::Applicant, "a1"),
            row(RowKind::Continuation, "a2"),
            row(RowKind::Continuation, "a3"),
        ];

        let mut grouper = GroupRows::new(rows.into_iter());
        let groups: Vec<RowGroup> = grouper.by_ref().collect();

        // 孤兒列不產生群組
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].rows(), ["a1", "a2", "a3"]);
        assert_eq!(grouper.stats().orphans_dropped, 1);
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        let mut grouper = GroupRows::new(std::iter::empty());
        assert!(grouper.next().is_none());
        assert!(grouper.next().is_none());
    }

    #[test]
    fn test_classify_rows_from_markup() {
        let html = page(&[SUMMARY_A, BADGES, AD, PLACEHOLDER]);
        let document = Html::parse_document(&html);
        let body = document.select(&TABLE_BODY).next().unwrap();
        let kinds: Vec<RowKind> = child_elements(body, "tr").map(classify_row).collect();

        assert_eq!(
            kinds,
            vec![
                RowKind::Applicant,
                RowKind::Continuation,
                RowKind::Advertisement,
                RowKind::Placeholder,
            ]
        );
    }

    #[test]
    fn test_group_page_with_ads_and_placeholders() {
        let html = page(&[SUMMARY_A, BADGES, AD, COMMENT, PLACEHOLDER, SUMMARY_B]);
        let grouping = group_page(&html);

        assert!(grouping.table_found);
        assert_eq!(grouping.groups.len(), 2);
        assert_eq!(grouping.groups[0].len(), 3);
        assert_eq!(grouping.groups[1].len(), 1);
        assert!(grouping.groups[0].comment_row().unwrap().contains("<p>hello</p>"));
        assert_eq!(grouping.stats.ads_dropped, 1);
        assert_eq!(grouping.stats.placeholders_dropped, 1);
    }

    #[test]
    fn test_ad_row_removal_is_invisible() {
        let with_ad = group_page(&page(&[SUMMARY_A, AD, BADGES, COMMENT, SUMMARY_B, AD]));
        let without_ad = group_page(&page(&[SUMMARY_A, BADGES, COMMENT, SUMMARY_B]));

        assert_eq!(with_ad.groups, without_ad.groups);
    }

    #[test]
    fn test_nested_rows_are_not_table_rows() {
        let nested = r#"<tr><td><table><tbody><tr><td>inner</td></tr></tbody></table></td><td>x</td></tr>"#;
        let grouping = group_page(&page(&[nested, BADGES]));

        assert_eq!(grouping.groups.len(), 1);
        assert_eq!(grouping.groups[0].len(), 2);
    }

    #[test]
    fn test_page_without_table() {
        let grouping = group_page("<html><body><p>maintenance</p></body></html>");
        assert!(!grouping.table_found);
        assert!(grouping.groups.is_empty());
    }
}
