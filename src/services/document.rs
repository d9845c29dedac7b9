//! 上传文件预处理 - 业务能力层
//!
//! 把上传的文件转换为识别请求：
//! - 图片 / PDF：base64 内联，附带媒体类型
//! - Word（.docx）：本地提取文本，只发送文本

use base64::Engine as _;
use phf::phf_map;
use tracing::debug;

use crate::error::IntakeError;
use crate::models::{OcrRequest, UploadedFile};

pub const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const PDF_MIME: &str = "application/pdf";

/// 扩展名到媒体类型
static MIME_BY_EXTENSION: phf::Map<&'static str, &'static str> = phf_map! {
    "png" => "image/png",
    "jpg" => "image/jpeg",
    "jpeg" => "image/jpeg",
    "webp" => "image/webp",
    "gif" => "image/gif",
    "bmp" => "image/bmp",
    "heic" => "image/heic",
    "pdf" => "application/pdf",
    "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
};

/// 文件类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Image,
    Pdf,
    WordDocument,
}

/// 确定文件的媒体类型：优先使用声明值，否则按扩展名推断
pub fn resolve_mime(file: &UploadedFile) -> Option<String> {
    if let Some(mime) = file.mime_type.as_deref().filter(|m| !m.trim().is_empty()) {
        return Some(mime.trim().to_ascii_lowercase());
    }
    let ext = file.name.rsplit_once('.')?.1.to_ascii_lowercase();
    MIME_BY_EXTENSION.get(ext.as_str()).map(|m| m.to_string())
}

pub fn classify(mime: &str) -> Option<FileKind> {
    if mime.starts_with("image/") {
        Some(FileKind::Image)
    } else if mime == PDF_MIME {
        Some(FileKind::Pdf)
    } else if mime == DOCX_MIME {
        Some(FileKind::WordDocument)
    } else {
        None
    }
}

/// 把上传文件转换为识别请求
pub fn prepare_request(file: &UploadedFile) -> Result<OcrRequest, IntakeError> {
    let mime = resolve_mime(file)
        .ok_or_else(|| IntakeError::file_parse(&file.name, "无法识别文件类型"))?;
    let kind = classify(&mime)
        .ok_or_else(|| IntakeError::file_parse(&file.name, format!("不支持的文件类型 {}", mime)))?;

    if file.bytes.is_empty() {
        return Err(IntakeError::file_parse(&file.name, "文件为空"));
    }

    match kind {
        FileKind::Image | FileKind::Pdf => {
            let encoded = base64::engine::general_purpose::STANDARD.encode(&file.bytes);
            debug!("{} 以 base64 内联发送 ({}，{} 字节)", file.name, mime, file.bytes.len());
            Ok(OcrRequest::inline(encoded, mime))
        }
        FileKind::WordDocument => {
            let text = extract_docx_text(&file.bytes).map_err(|e| IntakeError::file_parse(&file.name, e))?;
            if text.trim().is_empty() {
                return Err(IntakeError::file_parse(&file.name, "文档中没有文字内容"));
            }
            debug!("{} 提取文本 {} 字符", file.name, text.chars().count());
            Ok(OcrRequest::text(text))
        }
    }
}

/// 提取 .docx 的正文（段落与表格），每段一行
pub fn extract_docx_text(bytes: &[u8]) -> Result<String, String> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| format!("Word 文档解析失败: {}", e))?;

    let mut text = String::new();
    for child in &docx.document.children {
        match child {
            docx_rs::DocumentChild::Paragraph(para) => {
                let line = paragraph_text(para);
                if !line.trim().is_empty() {
                    text.push_str(&line);
                    text.push('\n');
                }
            }
            docx_rs::DocumentChild::Table(table) => {
                for tc in &table.rows {
                    if let docx_rs::TableChild::TableRow(row) = tc {
                        let mut cells: Vec<String> = Vec::new();
                        for rc in &row.cells {
                            if let docx_rs::TableRowChild::TableCell(cell) = rc {
                                let cell_text: Vec<String> = cell
                                    .children
                                    .iter()
                                    .filter_map(|cc| match cc {
                                        docx_rs::TableCellContent::Paragraph(p) => Some(paragraph_text(p)),
                                        _ => None,
                                    })
                                    .collect();
                                cells.push(cell_text.join(" "));
                            }
                        }
                        text.push_str(&cells.join("\t"));
                        text.push('\n');
                    }
                }
            }
            _ => {}
        }
    }
    Ok(text)
}

fn paragraph_text(para: &docx_rs::Paragraph) -> String {
    let mut line = String::new();
    for child in &para.children {
        match child {
            docx_rs::ParagraphChild::Run(run) => run_text(run, &mut line),
            docx_rs::ParagraphChild::Hyperlink(hyperlink) => {
                for run in &hyperlink.children {
                    if let docx_rs::ParagraphChild::Run(r) = run {
                        run_text(r, &mut line);
                    }
                }
            }
            docx_rs::ParagraphChild::Insert(ins) => {
                for ic in &ins.children {
                    if let docx_rs::InsertChild::Run(r) = ic {
                        run_text(r, &mut line);
                    }
                }
            }
            _ => {}
        }
    }
    line
}

fn run_text(run: &docx_rs::Run, out: &mut String) {
    for rc in &run.children {
        match rc {
            docx_rs::RunChild::Text(t) => out.push_str(&t.text),
            docx_rs::RunChild::Tab(_) => out.push('\t'),
            docx_rs::RunChild::Break(_) => out.push('\n'),
            _ => {}
        }
    }
}
