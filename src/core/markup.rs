use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());

/// 直接子元素 (不含更深層的後代)
pub fn child_elements<'a>(
    parent: ElementRef<'a>,
    tag: &'static str,
) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    parent
        .children()
        .filter_map(ElementRef::wrap)
        .filter(move |child| child.value().name() == tag)
}

/// 各文字節點去頭尾空白後直接串接
pub fn stripped_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect()
}

/// 以單一空白連接所有文字，連續空白壓成一個
pub fn spaced_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// 單獨的 `<tr>` 片段必須放回表格內才能被正確解析
pub fn parse_row_fragment(fragment: &str) -> Html {
    Html::parse_fragment(&format!("<table><tbody>{}</tbody></table>", fragment))
}

pub fn first_row(document: &Html) -> Option<ElementRef<'_>> {
    document.select(&ROW).next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_fragment_keeps_cells() {
        let document = parse_row_fragment("<tr class=\"x\"><td> a </td><td><b>b</b> c</td></tr>");
        let row = first_row(&document).unwrap();

        assert!(row.value().classes().any(|c| c == "x"));
        let cells: Vec<_> = child_elements(row, "td").collect();
        assert_eq!(cells.len(), 2);
        assert_eq!(stripped_text(cells[0]), "a");
        assert_eq!(stripped_text(cells[1]), "bc");
        assert_eq!(spaced_text(cells[1]), "b c");
    }

    #[test]
    fn test_child_elements_skips_nested() {
        let document =
            parse_row_fragment("<tr><td><table><tr><td>inner</td></tr></table></td></tr>");
        let row = first_row(&document).unwrap();

        assert_eq!(child_elements(row, "td").count(), 1);
    }
}
