//! 命令行参数解析
//!
//! ```bash
//! exam_bank login alice pw
//! exam_bank import scan.png paper.docx
//! exam_bank export-pdf 期中测试 q1 q2
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// 数学题库命令行
#[derive(Parser, Debug)]
#[command(name = "exam_bank")]
#[command(version, about = "数学题库：OCR 录入、知识点管理与试卷导出")]
pub struct Cli {
    /// 要执行的命令
    #[command(subcommand)]
    pub command: Command,
}

/// 命令
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// 注册并登录
    Register { username: String, secret: String },

    /// 登录
    Login { username: String, secret: String },

    /// 退出登录
    Logout,

    /// 查看当前用户
    #[command(name = "whoami")]
    WhoAmI,

    /// 查看全部用户（管理员）
    Users,

    /// 删除用户（管理员）
    UserRemove { user_id: String },

    /// 查看题目，可按关键字筛选
    List { keywords: Vec<String> },

    /// 删除题目
    Remove { id: String },

    /// 查看知识点
    Topics,

    /// 新增一级知识点
    TopicAdd { name: String },

    /// 新增子知识点
    #[command(name = "subpoint-add")]
    SubPointAdd { topic_id: String, name: String },

    /// 重命名子知识点
    #[command(name = "subpoint-rename")]
    SubPointRename { topic_id: String, sub_id: String, name: String },

    /// 删除子知识点
    #[command(name = "subpoint-remove")]
    SubPointRemove { topic_id: String, sub_id: String },

    /// 识别图片 / PDF / Word 并保存进题库
    Import {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// 导出 Word，不指定题目时导出全部
    ExportWord { title: String, ids: Vec<String> },

    /// 导出 PDF，不指定题目时导出全部
    ExportPdf { title: String, ids: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Result<Command, clap::Error> {
        Cli::try_parse_from(std::iter::once("exam_bank").chain(args.iter().copied())).map(|cli| cli.command)
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_account_commands() {
        assert_eq!(
            parse(&["login", "alice", "pw"]).unwrap(),
            Command::Login {
                username: "alice".to_string(),
                secret: "pw".to_string()
            }
        );
        assert_eq!(parse(&["whoami"]).unwrap(), Command::WhoAmI);
        assert_eq!(
            parse(&["user-remove", "u1"]).unwrap(),
            Command::UserRemove {
                user_id: "u1".to_string()
            }
        );
        assert!(parse(&["login", "alice"]).is_err());
        assert!(parse(&[]).is_err());
    }

    #[test]
    fn test_parse_list_keywords() {
        assert_eq!(parse(&["list"]).unwrap(), Command::List { keywords: Vec::new() });
        assert_eq!(
            parse(&["list", "等差", "数列"]).unwrap(),
            Command::List {
                keywords: vec!["等差".to_string(), "数列".to_string()]
            }
        );
    }

    #[test]
    fn test_parse_knowledge_commands() {
        assert_eq!(
            parse(&["subpoint-rename", "t1", "s1", "数列求和"]).unwrap(),
            Command::SubPointRename {
                topic_id: "t1".to_string(),
                sub_id: "s1".to_string(),
                name: "数列求和".to_string()
            }
        );
        assert_eq!(
            parse(&["subpoint-remove", "t1", "s1"]).unwrap(),
            Command::SubPointRemove {
                topic_id: "t1".to_string(),
                sub_id: "s1".to_string()
            }
        );
    }

    #[test]
    fn test_parse_import_and_export() {
        assert_eq!(
            parse(&["import", "a.png", "b.docx"]).unwrap(),
            Command::Import {
                files: vec![PathBuf::from("a.png"), PathBuf::from("b.docx")]
            }
        );
        assert!(parse(&["import"]).is_err());

        assert_eq!(
            parse(&["export-word", "期中"]).unwrap(),
            Command::ExportWord {
                title: "期中".to_string(),
                ids: Vec::new()
            }
        );
        assert_eq!(
            parse(&["export-pdf", "期中", "q1", "q2"]).unwrap(),
            Command::ExportPdf {
                title: "期中".to_string(),
                ids: vec!["q1".to_string(), "q2".to_string()]
            }
        );
        assert!(parse(&["export-pdf"]).is_err());
    }

    #[test]
    fn test_unknown_command() {
        let err = parse(&["frobnicate"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidSubcommand);
    }
}
