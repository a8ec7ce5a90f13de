//! 用户密码哈希
//!
//! 数据库只保存 Argon2id PHC 字符串；配置文件中的默认密码可以是明文或已哈希。

use std::sync::OnceLock;

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

#[derive(Debug)]
pub enum PasswordError {
    /// 生成哈希失败
    Hash(String),
    /// 存储的哈希无法解析
    MalformedHash(String),
}

impl std::fmt::Display for PasswordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hash(msg) => write!(f, "Password hashing failed: {}", msg),
            Self::MalformedHash(msg) => write!(f, "Stored password hash is malformed: {}", msg),
        }
    }
}

impl std::error::Error for PasswordError {}

fn hasher() -> Argon2<'static> {
    Argon2::new(Algorithm::Argon2id, Version::V0x13, Params::default())
}

pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    hasher()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::MalformedHash(e.to_string()))?;
    Ok(hasher()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub fn is_argon2_hash(s: &str) -> bool {
    s.starts_with("$argon2")
}

/// `auth.default_password`：已是 Argon2 哈希则原样保留，否则哈希
///
/// API 输入始终走 [`hash_password`]。
pub fn hash_config_password(password: &str) -> Result<String, PasswordError> {
    if is_argon2_hash(password) {
        Ok(password.to_string())
    } else {
        hash_password(password)
    }
}

/// 登录校验
///
/// 用户不存在时仍对一个固定哈希做一次验证，使两种失败耗时相近。
pub fn check_login(password: &str, stored_hash: Option<&str>) -> Result<bool, PasswordError> {
    static DECOY: OnceLock<Option<String>> = OnceLock::new();

    match stored_hash {
        Some(hash) => verify_password(password, hash),
        None => {
            if let Some(decoy) = DECOY.get_or_init(|| hash_password("gnode-decoy").ok()) {
                let _ = verify_password(password, decoy);
            }
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_argon2id() {
        let hash = hash_password("gateway-admin").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("gateway-admin", &hash).unwrap());
        assert!(!verify_password("gateway-Admin", &hash).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        assert!(matches!(
            verify_password("x", "plaintext"),
            Err(PasswordError::MalformedHash(_))
        ));
    }

    #[test]
    fn test_config_password_keeps_existing_hash() {
        let hash = hash_password("secret").unwrap();
        assert_eq!(hash_config_password(&hash).unwrap(), hash);

        let fresh = hash_config_password("secret").unwrap();
        assert_ne!(fresh, "secret");
        assert!(verify_password("secret", &fresh).unwrap());
    }

    #[test]
    fn test_check_login_unknown_user() {
        assert!(!check_login("admin", None).unwrap());

        let hash = hash_password("admin").unwrap();
        assert!(check_login("admin", Some(&hash)).unwrap());
    }
}
