//! 题目排版规则
//!
//! - 选择题：按 `A.` ~ `D.` 拆出题干和选项，按最长选项的字数选择每行几个
//! - 解答题：`(1)` / `（1）` 小问标记另起一行

use std::sync::LazyLock;

use regex::Regex;

static OPTION_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([A-D])[.．]").unwrap());

static SUB_PART_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[(（]\s*\d{1,2}\s*[)）]").unwrap());

/// 选项排列方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionLayout {
    /// 一行四个
    FourPerRow,
    /// 一行两个
    TwoPerRow,
    /// 每个选项独占一行
    Stacked,
}

impl OptionLayout {
    /// 每行选项数
    pub fn columns(self) -> usize {
        match self {
            OptionLayout::FourPerRow => 4,
            OptionLayout::TwoPerRow => 2,
            OptionLayout::Stacked => 1,
        }
    }
}

/// 选项排列阈值（按字符数，严格小于）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutThresholds {
    pub four_per_row_below: usize,
    pub two_per_row_below: usize,
}

/// 打印 / PDF 使用的阈值
pub const PRINT_THRESHOLDS: LayoutThresholds = LayoutThresholds {
    four_per_row_below: 12,
    two_per_row_below: 35,
};

/// Word 页面较窄，阈值更小
pub const WORD_THRESHOLDS: LayoutThresholds = LayoutThresholds {
    four_per_row_below: 10,
    two_per_row_below: 30,
};

/// 一个选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOption {
    pub label: char,
    pub text: String,
}

/// 拆分后的题目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitContent {
    pub stem: String,
    /// 没有选项时为空
    pub options: Vec<ChoiceOption>,
}

impl SplitContent {
    pub fn is_choice(&self) -> bool {
        !self.options.is_empty()
    }
}

/// 按选项标记拆分题干和选项
pub fn split_options(content: &str) -> SplitContent {
    let markers: Vec<(usize, usize, char)> = OPTION_MARKER
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let label = caps.get(1)?.as_str().chars().next()?;
            Some((whole.start(), whole.end(), label))
        })
        .collect();

    if markers.is_empty() {
        return SplitContent {
            stem: content.trim().to_string(),
            options: Vec::new(),
        };
    }

    let stem = content[..markers[0].0].trim().to_string();
    let options = markers
        .iter()
        .enumerate()
        .map(|(i, &(_, end, label))| {
            let next = markers.get(i + 1).map_or(content.len(), |m| m.0);
            ChoiceOption {
                label,
                text: content[end..next].trim().to_string(),
            }
        })
        .collect();

    SplitContent { stem, options }
}

/// 按最长选项的字符数选择排列方式
pub fn choose_layout(options: &[ChoiceOption], thresholds: LayoutThresholds) -> OptionLayout {
    let longest = options
        .iter()
        .map(|o| o.text.chars().count())
        .max()
        .unwrap_or(0);
    if longest < thresholds.four_per_row_below {
        OptionLayout::FourPerRow
    } else if longest < thresholds.two_per_row_below {
        OptionLayout::TwoPerRow
    } else {
        OptionLayout::Stacked
    }
}

/// 小问标记另起一行
///
/// 已经在行首的标记和公式内的括号保持不变
pub fn reflow_sub_parts(content: &str) -> String {
    let mut out = String::with_capacity(content.len() + 8);
    let mut last = 0;

    for m in SUB_PART_MARKER.find_iter(content) {
        let before = &content[..m.start()];
        let at_line_start = before.trim_end_matches([' ', '\t', '\u{3000}']).ends_with('\n')
            || before.trim().is_empty();
        if at_line_start || inside_math(before) {
            continue;
        }
        out.push_str(content[last..m.start()].trim_end_matches([' ', '\t', '\u{3000}']));
        out.push('\n');
        last = m.start();
    }
    out.push_str(&content[last..]);
    out
}

/// 前缀中未转义的 `$` 为奇数个时，当前位置在公式内
fn inside_math(prefix: &str) -> bool {
    let bytes = prefix.as_bytes();
    let mut count = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'$' => {
                count += 1;
                i += 1;
            }
            _ => i += 1,
        }
    }
    count % 2 == 1
}

/// HTML 转义
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// 转义后把换行转为 `<br/>`
pub fn to_html_lines(text: &str) -> String {
    escape_html(text).replace('\n', "<br/>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_choice_question_uses_four_per_row() {
        let split = split_options("求解. A.1 B.2 C.3 D.4");
        assert_eq!(split.stem, "求解.");
        assert_eq!(split.options.len(), 4);
        assert_eq!(split.options[0], ChoiceOption { label: 'A', text: "1".to_string() });
        assert_eq!(split.options[3].label, 'D');
        assert_eq!(choose_layout(&split.options, PRINT_THRESHOLDS), OptionLayout::FourPerRow);
    }

    #[test]
    fn test_layout_thresholds_differ_by_target() {
        let split = split_options("选出正确的一项 A.abcdefghij B.x C.y D.z");
        // 最长选项 10 个字符
        assert_eq!(choose_layout(&split.options, PRINT_THRESHOLDS), OptionLayout::FourPerRow);
        assert_eq!(choose_layout(&split.options, WORD_THRESHOLDS), OptionLayout::TwoPerRow);

        let long = "很".repeat(35);
        let split = split_options(&format!("题干 A.{} B.短", long));
        assert_eq!(choose_layout(&split.options, PRINT_THRESHOLDS), OptionLayout::Stacked);
    }

    #[test]
    fn test_full_width_period_and_no_options() {
        let split = split_options("下列说法正确的是 A．甲 B．乙");
        assert_eq!(split.options.len(), 2);
        assert_eq!(split.options[1].text, "乙");

        let split = split_options("计算 $1+1$ 的值");
        assert!(!split.is_choice());
        assert_eq!(split.stem, "计算 $1+1$ 的值");
    }

    #[test]
    fn test_reflow_sub_parts() {
        assert_eq!(
            reflow_sub_parts("已知函数 $f(x)$。(1)求定义域；（2）求值域"),
            "已知函数 $f(x)$。\n(1)求定义域；\n（2）求值域"
        );
        // 已在行首
        assert_eq!(reflow_sub_parts("(1)求定义域\n(2)求值域"), "(1)求定义域\n(2)求值域");
        // 公式内
        assert_eq!(reflow_sub_parts("求 $f(1)$ 的值"), "求 $f(1)$ 的值");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
        assert_eq!(to_html_lines("x\ny"), "x<br/>y");
    }
}
