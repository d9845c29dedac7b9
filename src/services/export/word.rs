//! Word 导出
//!
//! 生成带 Office 命名空间和页面视图元数据的 HTML，以 `application/msword`
//! 保存为 `.doc`，Word 打开时按 HTML 文档处理。公式保留 `$...$` 原文。

use chrono::Local;

use super::layout::{
    choose_layout, escape_html, reflow_sub_parts, split_options, to_html_lines, OptionLayout,
    WORD_THRESHOLDS,
};
use super::{file_stem, ExportPayload};
use crate::error::ExportError;
use crate::models::Question;

pub const WORD_MIME: &str = "application/msword";

/// 导出为 Word 文档
pub fn export_word(
    questions: &[Question],
    title: &str,
    author: Option<&str>,
) -> Result<ExportPayload, ExportError> {
    if questions.is_empty() {
        return Err(ExportError::NoQuestionsSelected);
    }
    let html = render_word_document(questions, title, author);
    Ok(ExportPayload {
        file_name: format!("{}.doc", file_stem(title)),
        mime_type: WORD_MIME.to_string(),
        // 带 BOM，Word 才能正确识别 UTF-8
        bytes: [&b"\xEF\xBB\xBF"[..], html.as_bytes()].concat(),
    })
}

/// 生成 Word 兼容的 HTML
pub fn render_word_document(questions: &[Question], title: &str, author: Option<&str>) -> String {
    let title = escape_html(title.trim());
    let mut body = String::new();
    for (i, q) in questions.iter().enumerate() {
        body.push_str(&render_question(i + 1, q));
    }

    let author_line = author
        .map(|a| format!("<p class=\"meta\">命题人：{}</p>", escape_html(a)))
        .unwrap_or_default();

    format!(
        r#"<html xmlns:o="urn:schemas-microsoft-com:office:office" xmlns:w="urn:schemas-microsoft-com:office:word" xmlns="http://www.w3.org/TR/REC-html40">
<head>
<meta charset="utf-8">
<title>{title}</title>
<!--[if gte mso 9]><xml><w:WordDocument><w:View>Print</w:View><w:Zoom>100</w:Zoom><w:DoNotOptimizeForBrowser/></w:WordDocument></xml><![endif]-->
<style>
@page WordSection1 {{ size: 21cm 29.7cm; margin: 2.54cm 3.18cm 2.54cm 3.18cm; }}
div.WordSection1 {{ page: WordSection1; }}
body {{ font-family: "宋体", SimSun, serif; font-size: 12pt; line-height: 1.6; }}
h1 {{ text-align: center; font-size: 18pt; }}
p.meta {{ text-align: center; color: #555555; }}
table.options {{ width: 100%; border-collapse: collapse; }}
table.options td {{ padding: 2pt 4pt; vertical-align: top; }}
</style>
</head>
<body>
<div class="WordSection1">
<h1>{title}</h1>
{author_line}
<p class="meta">导出日期：{date}</p>
{body}
</div>
</body>
</html>"#,
        title = title,
        author_line = author_line,
        date = Local::now().format("%Y-%m-%d"),
        body = body,
    )
}

fn render_question(number: usize, question: &Question) -> String {
    let split = split_options(&question.content);
    if !split.is_choice() {
        return format!(
            "<p><b>{}.</b> {}</p>\n",
            number,
            to_html_lines(&reflow_sub_parts(&split.stem))
        );
    }

    let layout = choose_layout(&split.options, WORD_THRESHOLDS);
    let columns = layout.columns();
    let width = 100 / columns;

    let mut html = format!("<p><b>{}.</b> {}</p>\n<table class=\"options\">\n", number, to_html_lines(&split.stem));
    for row in split.options.chunks(columns) {
        html.push_str("<tr>");
        for option in row {
            html.push_str(&format!(
                "<td width=\"{}%\">{}. {}</td>",
                width,
                option.label,
                escape_html(&option.text)
            ));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>\n");
    if layout == OptionLayout::Stacked {
        html.push_str("<p></p>\n");
    }
    html
}
