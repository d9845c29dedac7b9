//! 身份服务 - 业务能力层
//!
//! 用户列表和当前会话各占一块存储。密码明文比较，没有哈希、限流或过期，
//! 只用于区分"能否录题"和"能否进入管理后台"。

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{AppResult, IdentityError, StorageError};
use crate::infrastructure::BlobStore;
use crate::models::schema::{self, Decoded};
use crate::models::{Identity, Role, User};

pub const USERS_KEY: &str = "exam_bank.users";
pub const SESSION_KEY: &str = "exam_bank.session";

/// 内置超级管理员的用户名和密码
pub const SUPERUSER_LITERAL: &str = "admin";
/// 内置超级管理员的固定标识
pub const SUPERUSER_ID: &str = "superuser";

fn is_superuser(username: &str, secret: &str) -> bool {
    username == SUPERUSER_LITERAL && secret == SUPERUSER_LITERAL
}

/// 内置超级管理员，不写入用户列表
pub fn superuser() -> User {
    User::new(SUPERUSER_ID, SUPERUSER_LITERAL, SUPERUSER_LITERAL, Role::Admin)
}

/// 身份服务
pub struct IdentityService {
    store: Arc<dyn BlobStore>,
}

impl IdentityService {
    /// 打开身份服务，旧版用户 / 会话数据在此时迁移
    pub fn open(store: Arc<dyn BlobStore>) -> Result<Self, StorageError> {
        let this = Self { store };
        if let Some(raw) = this.store.get(USERS_KEY)? {
            let decoded: Decoded<Vec<User>> = schema::decode(USERS_KEY, &raw)?;
            if decoded.needs_write_back() {
                info!("🔄 迁移旧版用户数据");
                this.write_users(&decoded.into_inner())?;
            }
        }
        if let Some(raw) = this.store.get(SESSION_KEY)? {
            match schema::decode::<User>(SESSION_KEY, &raw) {
                Ok(decoded) if decoded.needs_write_back() => {
                    this.set_session(Some(&decoded.into_inner()))?;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("⚠️ 会话数据无法解析，已清除: {}", e);
                    this.set_session(None)?;
                }
            }
        }
        Ok(this)
    }

    /// 注册新用户
    ///
    /// 用户名和密码都等于内置超级管理员字面量时角色为管理员，否则为普通用户
    pub fn register(&self, username: &str, secret: &str) -> AppResult<User> {
        let username = username.trim();
        if username.is_empty() || secret.is_empty() {
            return Err(IdentityError::MissingCredentials.into());
        }

        let mut users = self.users()?;
        if users.iter().any(|u| u.username == username) {
            return Err(IdentityError::DuplicateUsername(username.to_string()).into());
        }

        let role = if is_superuser(username, secret) {
            Role::Admin
        } else {
            Role::User
        };
        let user = User::new(uuid::Uuid::new_v4().to_string(), username, secret, role);
        users.push(user.clone());
        self.write_users(&users)?;

        info!("✓ 注册用户 {} ({:?})", user.username, user.role);
        Ok(user)
    }

    /// 登录
    ///
    /// 内置超级管理员不读取用户列表
    pub fn login(&self, username: &str, secret: &str) -> AppResult<User> {
        let username = username.trim();
        if is_superuser(username, secret) {
            return Ok(superuser());
        }

        self.users()?
            .into_iter()
            .find(|u| u.username == username && u.secret == secret)
            .ok_or_else(|| IdentityError::InvalidCredentials.into())
    }

    /// 保存或清除当前会话
    pub fn set_session(&self, user: Option<&User>) -> Result<(), StorageError> {
        match user {
            Some(user) => {
                let raw = schema::encode(SESSION_KEY, user)?;
                self.store.set(SESSION_KEY, &raw)
            }
            None => self.store.remove(SESSION_KEY),
        }
    }

    /// 当前会话中的用户
    pub fn current_user(&self) -> Option<User> {
        let raw = match self.store.get(SESSION_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("⚠️ 读取会话失败: {}", e);
                return None;
            }
        };
        match schema::decode::<User>(SESSION_KEY, &raw) {
            Ok(decoded) => Some(decoded.into_inner()),
            Err(e) => {
                warn!("⚠️ 会话数据无法解析: {}", e);
                None
            }
        }
    }

    /// 当前会话对应的操作者
    pub fn current_session(&self) -> Option<Identity> {
        self.current_user().as_ref().map(Identity::from)
    }

    /// 全部注册用户（管理后台）
    pub fn list_users(&self, identity: &Identity) -> AppResult<Vec<User>> {
        require_admin(identity, "查看用户列表")?;
        Ok(self.users()?)
    }

    /// 删除注册用户（管理后台）
    ///
    /// # 返回
    /// 用户存在并被删除时返回 `true`
    pub fn delete_user(&self, identity: &Identity, user_id: &str) -> AppResult<bool> {
        require_admin(identity, "删除用户")?;
        let mut users = self.users()?;
        let before = users.len();
        users.retain(|u| u.id != user_id);
        if users.len() == before {
            return Ok(false);
        }
        self.write_users(&users)?;
        info!("🗑️ 已删除用户 {}", user_id);
        Ok(true)
    }

    fn users(&self) -> Result<Vec<User>, StorageError> {
        match self.store.get(USERS_KEY)? {
            Some(raw) => Ok(schema::decode(USERS_KEY, &raw)?.into_inner()),
            None => Ok(Vec::new()),
        }
    }

    fn write_users(&self, users: &[User]) -> Result<(), StorageError> {
        let raw = schema::encode(USERS_KEY, &users)?;
        self.store.set(USERS_KEY, &raw)
    }
}

fn require_admin(identity: &Identity, action: &str) -> Result<(), IdentityError> {
    if identity.is_admin() {
        Ok(())
    } else {
        Err(IdentityError::PermissionDenied(action.to_string()))
    }
}
