use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::models::question::Question;
use crate::models::schema::deserialize_timestamp;

/// 用户角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

/// 注册用户
///
/// 密码以明文保存，只用于本地功能开关，不是安全机制
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(alias = "password")]
    pub secret: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default = "Utc::now", deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub avatar: String,
}

impl User {
    pub fn new(id: impl Into<String>, username: impl Into<String>, secret: impl Into<String>, role: Role) -> Self {
        let username = username.into();
        Self {
            id: id.into(),
            avatar: avatar_url(&username),
            username,
            secret: secret.into(),
            role,
            created_at: Utc::now(),
        }
    }
}

/// 头像种子中保留原样的字符
const SEED_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// 根据用户名生成固定的头像地址
pub fn avatar_url(username: &str) -> String {
    let seed = utf8_percent_encode(username, SEED_ENCODE_SET);
    format!("https://api.dicebear.com/7.x/avataaars/svg?seed={}", seed)
}

/// 当前操作者
///
/// 显式传给需要身份的操作，不存在全局会话
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub username: String,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// 是否可以删除 / 修改该题目
    ///
    /// 管理员可以操作全部题目；没有归属的旧数据只有管理员可以操作
    pub fn can_manage(&self, question: &Question) -> bool {
        if self.is_admin() {
            return true;
        }
        match &question.user_id {
            Some(owner) => owner == &self.user_id,
            None => false,
        }
    }
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            username: user.username.clone(),
            role: user.role,
        }
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let role = match self.role {
            Role::Admin => "管理员",
            Role::User => "普通用户",
        };
        write!(f, "{} ({})", self.username, role)
    }
}
