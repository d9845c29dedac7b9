//! PDF 导出
//!
//! 生成加载 MathJax 和 Tailwind 的打印页面，在浏览器页面中等待公式排版完成后打印为 PDF。
//! 同一份 HTML 也可以直接在浏览器中打开，此时排版完成后自动弹出打印对话框。

use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use super::layout::{
    choose_layout, escape_html, reflow_sub_parts, split_options, to_html_lines, OptionLayout,
    PRINT_THRESHOLDS,
};
use super::{file_stem, ExportPayload};
use crate::browser::open_print_page;
use crate::config::Config;
use crate::error::ExportError;
use crate::infrastructure::JsExecutor;
use crate::models::Question;

pub const PDF_MIME: &str = "application/pdf";

/// 排版完成标记
const TYPESET_DONE_FLAG: &str = "window.__typesetDone === true";

/// 生成打印页面
///
/// `auto_print` 为真时排版完成后调用 `window.print()`
pub fn render_print_html(
    questions: &[Question],
    title: &str,
    author: Option<&str>,
    config: &Config,
    auto_print: bool,
) -> String {
    let title = escape_html(title.trim());
    let body: String = questions
        .iter()
        .enumerate()
        .map(|(i, q)| render_question(i + 1, q))
        .collect();
    let author_line = author
        .map(|a| format!(r#"<p class="text-center text-gray-600 mb-6">命题人：{}</p>"#, escape_html(a)))
        .unwrap_or_default();
    let after_typeset = if auto_print { "window.print();" } else { "" };

    format!(
        r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="{tailwind}"></script>
<script>
window.__typesetDone = false;
window.MathJax = {{
  tex: {{ inlineMath: [['$', '$'], ['\\(', '\\)']], displayMath: [['$$', '$$'], ['\\[', '\\]']] }},
  startup: {{
    pageReady: function () {{
      return MathJax.startup.defaultPageReady().then(function () {{
        window.__typesetDone = true;
        {after_typeset}
      }});
    }}
  }}
}};
</script>
<script id="MathJax-script" async src="{mathjax}"></script>
<style>
@page {{ size: A4; margin: 18mm 16mm; }}
.question {{ break-inside: avoid; }}
</style>
</head>
<body class="p-8 text-base leading-relaxed">
<h1 class="text-2xl font-bold text-center mb-2">{title}</h1>
{author_line}
{body}
</body>
</html>"#,
        title = title,
        tailwind = config.tailwind_url,
        mathjax = config.mathjax_url,
        after_typeset = after_typeset,
        author_line = author_line,
        body = body,
    )
}

fn render_question(number: usize, question: &Question) -> String {
    let split = split_options(&question.content);
    if !split.is_choice() {
        return format!(
            "<div class=\"question mb-6\"><p><span class=\"font-bold\">{}.</span> {}</p></div>\n",
            number,
            to_html_lines(&reflow_sub_parts(&split.stem))
        );
    }

    let grid = match choose_layout(&split.options, PRINT_THRESHOLDS) {
        OptionLayout::FourPerRow => "grid-cols-4",
        OptionLayout::TwoPerRow => "grid-cols-2",
        OptionLayout::Stacked => "grid-cols-1",
    };
    let options: String = split
        .options
        .iter()
        .map(|o| format!("<div>{}. {}</div>", o.label, escape_html(&o.text)))
        .collect();

    format!(
        "<div class=\"question mb-6\"><p><span class=\"font-bold\">{}.</span> {}</p><div class=\"grid {} gap-2 mt-2 pl-6\">{}</div></div>\n",
        number,
        to_html_lines(&split.stem),
        grid,
        options
    )
}

/// PDF 导出器
///
/// 职责：
/// - 打开打印页面
/// - 等待排版完成
/// - 打印为 PDF 字节
pub struct PdfExporter {
    config: Config,
}

impl PdfExporter {
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// 导出为 PDF
    pub async fn export(
        &self,
        questions: &[Question],
        title: &str,
        author: Option<&str>,
    ) -> Result<ExportPayload, ExportError> {
        if questions.is_empty() {
            return Err(ExportError::NoQuestionsSelected);
        }

        let html = render_print_html(questions, title, author, &self.config, false);
        debug!("打印页面 {} 字节", html.len());

        let (mut browser, page) = open_print_page(&self.config)
            .await
            .map_err(|e| ExportError::PopupBlocked {
                reason: e.to_string(),
            })?;

        let result = self.print(JsExecutor::new(page.clone()), &html).await;

        // 连接的是用户自己的浏览器时只关闭打印页面
        if self.config.browser_debug_port.is_some() {
            if let Err(e) = page.close().await {
                warn!("⚠️ 关闭打印页面失败: {}", e);
            }
        } else if let Err(e) = browser.close().await {
            warn!("⚠️ 关闭浏览器失败: {}", e);
        }

        let bytes = result?;
        info!("✓ PDF 已生成 ({} 字节)", bytes.len());

        Ok(ExportPayload {
            file_name: format!("{}.pdf", file_stem(title)),
            mime_type: PDF_MIME.to_string(),
            bytes,
        })
    }

    async fn print(&self, executor: JsExecutor, html: &str) -> Result<Vec<u8>, ExportError> {
        executor
            .page()
            .set_content(html)
            .await
            .map_err(|e| ExportError::PrintFailed(format!("写入打印页面失败: {}", e)))?;

        let interval = Duration::from_millis(self.config.typeset_poll_interval_ms);
        let typeset = executor
            .poll_until(TYPESET_DONE_FLAG, interval, self.config.typeset_max_polls)
            .await
            .map_err(|e| ExportError::PrintFailed(e.to_string()))?;
        if !typeset {
            warn!(
                "⚠️ 等待公式排版超时（{} 次轮询），直接打印",
                self.config.typeset_max_polls
            );
        }

        sleep(Duration::from_millis(self.config.print_settle_delay_ms)).await;

        let params = PrintToPdfParams {
            print_background: Some(true),
            ..Default::default()
        };
        executor
            .page()
            .pdf(params)
            .await
            .map_err(|e| ExportError::PrintFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(content: &str) -> Question {
        Question::new(uuid::Uuid::new_v4().to_string(), content)
    }

    #[test]
    fn test_print_html_loads_typesetting() {
        let config = Config::default();
        let html = render_print_html(&[question("求解. A.1 B.2 C.3 D.4")], "单元测试", None, &config, true);

        assert!(html.contains(&config.mathjax_url));
        assert!(html.contains(&config.tailwind_url));
        assert!(html.contains("window.__typesetDone = true;"));
        assert!(html.contains("window.print();"));
        assert!(html.contains("grid grid-cols-4"));
        assert!(html.contains("<div>A. 1</div>"));
    }

    #[test]
    fn test_headless_html_does_not_auto_print() {
        let config = Config::default();
        let html = render_print_html(&[question("(1)求证")], "卷", Some("李老师"), &config, false);
        assert!(!html.contains("window.print();"));
        assert!(html.contains("命题人：李老师"));
    }

    #[tokio::test]
    async fn test_empty_selection_never_opens_browser() {
        let exporter = PdfExporter::new(&Config::default());
        let err = exporter.export(&[], "卷", None).await.unwrap_err();
        assert!(matches!(err, ExportError::NoQuestionsSelected));
    }

    /// 需要本机安装 Chrome / Chromium
    #[tokio::test]
    #[ignore]
    async fn test_export_pdf_with_headless_browser() {
        let _ = tracing_subscriber::fmt::try_init();

        let exporter = PdfExporter::new(&Config::default());
        let payload = exporter
            .export(&[question("已知 $x^2=4$，求 $x$。")], "测试卷", None)
            .await
            .unwrap();
        assert!(payload.bytes.starts_with(b"%PDF"));
    }
}
