//! LaTeX 校验
//!
//! 用确定性的规则判断识别结果能否被正常排版，代替"渲染失败"回调：
//! - `$` / `$$` 成对出现
//! - `\(` `\)`、`\[` `\]` 成对出现
//! - 公式内花括号配对
//! - `\begin{..}` / `\end{..}` 名称一致
//! - `\left` / `\right` 数量一致

use std::fmt;

/// 校验失败的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LatexIssue {
    /// `$` 分隔符未闭合
    UnclosedDollar,
    /// `\(` 或 `\[` 未闭合，或出现多余的闭合符
    UnbalancedDelimiter(&'static str),
    /// 花括号不配对
    UnbalancedBraces,
    /// 环境名称不一致
    MismatchedEnvironment { expected: String, found: String },
    /// 环境未闭合
    UnclosedEnvironment(String),
    /// `\left` 与 `\right` 数量不一致
    UnbalancedLeftRight,
}

impl fmt::Display for LatexIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LatexIssue::UnclosedDollar => write!(f, "$ 分隔符未成对出现"),
            LatexIssue::UnbalancedDelimiter(d) => write!(f, "分隔符 {} 不配对", d),
            LatexIssue::UnbalancedBraces => write!(f, "花括号不配对"),
            LatexIssue::MismatchedEnvironment { expected, found } => {
                write!(f, "环境 {} 以 {} 结束", expected, found)
            }
            LatexIssue::UnclosedEnvironment(env) => write!(f, "环境 {} 未闭合", env),
            LatexIssue::UnbalancedLeftRight => write!(f, "\\left 与 \\right 数量不一致"),
        }
    }
}

/// 校验带分隔符的题干全文
pub fn validate_text(text: &str) -> Result<(), LatexIssue> {
    for segment in math_segments(text)? {
        validate_formula(segment)?;
    }
    Ok(())
}

/// 校验不带分隔符的公式
pub fn validate_formula(formula: &str) -> Result<(), LatexIssue> {
    let formula = strip_outer_dollars(formula.trim());
    check_braces(formula)?;
    check_environments(formula)?;
    check_left_right(formula)?;
    Ok(())
}

/// 同时校验题干和核心公式
pub fn validate_draft(text: &str, formula: &str) -> Result<(), LatexIssue> {
    validate_text(text)?;
    validate_formula(formula)
}

/// 提取所有公式片段（不含分隔符）
fn math_segments(text: &str) -> Result<Vec<&str>, LatexIssue> {
    let bytes = text.as_bytes();
    let mut segments = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' if i + 1 < bytes.len() => {
                let closing = match bytes[i + 1] {
                    b'(' => Some("\\)"),
                    b'[' => Some("\\]"),
                    b')' => return Err(LatexIssue::UnbalancedDelimiter("\\)")),
                    b']' => return Err(LatexIssue::UnbalancedDelimiter("\\]")),
                    _ => None,
                };
                match closing {
                    Some(close) => {
                        let start = i + 2;
                        let end = text[start..]
                            .find(close)
                            .map(|p| start + p)
                            .ok_or(LatexIssue::UnbalancedDelimiter(if close == "\\)" {
                                "\\("
                            } else {
                                "\\["
                            }))?;
                        segments.push(&text[start..end]);
                        i = end + 2;
                    }
                    // 转义字符（含 \$）整体跳过
                    None => i += 2,
                }
            }
            b'$' => {
                let display = bytes.get(i + 1) == Some(&b'$');
                let open_len = if display { 2 } else { 1 };
                let start = i + open_len;
                let end = find_closing_dollar(text, start, display).ok_or(LatexIssue::UnclosedDollar)?;
                segments.push(&text[start..end]);
                i = end + open_len;
            }
            _ => i += 1,
        }
    }

    Ok(segments)
}

fn find_closing_dollar(text: &str, from: usize, display: bool) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'$' if display => {
                if bytes.get(i + 1) == Some(&b'$') {
                    return Some(i);
                }
                return None;
            }
            b'$' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

fn strip_outer_dollars(formula: &str) -> &str {
    let trimmed = formula
        .strip_prefix("$$")
        .and_then(|f| f.strip_suffix("$$"))
        .or_else(|| formula.strip_prefix('$').and_then(|f| f.strip_suffix('$')));
    trimmed.unwrap_or(formula)
}

fn check_braces(formula: &str) -> Result<(), LatexIssue> {
    let bytes = formula.as_bytes();
    let mut depth: i32 = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth < 0 {
                    return Err(LatexIssue::UnbalancedBraces);
                }
            }
            _ => {}
        }
        i += 1;
    }
    if depth == 0 {
        Ok(())
    } else {
        Err(LatexIssue::UnbalancedBraces)
    }
}

fn check_environments(formula: &str) -> Result<(), LatexIssue> {
    let mut stack: Vec<&str> = Vec::new();
    let mut rest = formula;

    while let Some(pos) = rest.find('\\') {
        rest = &rest[pos + 1..];
        let (is_begin, tail) = if let Some(tail) = rest.strip_prefix("begin{") {
            (true, tail)
        } else if let Some(tail) = rest.strip_prefix("end{") {
            (false, tail)
        } else {
            continue;
        };
        let Some(close) = tail.find('}') else {
            return Err(LatexIssue::UnbalancedBraces);
        };
        let name = &tail[..close];
        if is_begin {
            stack.push(name);
        } else {
            match stack.pop() {
                Some(open) if open == name => {}
                Some(open) => {
                    return Err(LatexIssue::MismatchedEnvironment {
                        expected: open.to_string(),
                        found: name.to_string(),
                    })
                }
                None => {
                    return Err(LatexIssue::MismatchedEnvironment {
                        expected: String::new(),
                        found: name.to_string(),
                    })
                }
            }
        }
        rest = &tail[close + 1..];
    }

    match stack.pop() {
        Some(open) => Err(LatexIssue::UnclosedEnvironment(open.to_string())),
        None => Ok(()),
    }
}

fn check_left_right(formula: &str) -> Result<(), LatexIssue> {
    let count = |needle: &str| {
        formula
            .match_indices(needle)
            .filter(|(i, _)| {
                // 排除 \leftarrow / \rightarrow 等命令
                !formula[i + needle.len()..]
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_alphabetic())
            })
            .count()
    };
    if count("\\left") == count("\\right") {
        Ok(())
    } else {
        Err(LatexIssue::UnbalancedLeftRight)
    }
}
