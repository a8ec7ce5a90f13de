use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AuthConfig;
use crate::errors::{GnodeError, Result};

/// Web UI 登录令牌的 audience
pub const TOKEN_AUDIENCE: &str = "ui";

/// Access Token Claims
#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// JWT Service for generating and validating tokens
pub struct JwtService {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_minutes: u64,
}

impl JwtService {
    /// HS256 with a shared secret
    pub fn with_secret(secret: &str, access_token_minutes: u64) -> Self {
        Self {
            algorithm: Algorithm::HS256,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_minutes,
        }
    }

    /// ES256 with a PEM encoded P-256 key pair
    pub fn with_ec_pem(
        private_pem: &[u8],
        public_pem: &[u8],
        access_token_minutes: u64,
    ) -> std::result::Result<Self, Error> {
        Ok(Self {
            algorithm: Algorithm::ES256,
            encoding_key: EncodingKey::from_ec_pem(private_pem)?,
            decoding_key: DecodingKey::from_ec_pem(public_pem)?,
            access_token_minutes,
        })
    }

    /// Create JwtService from config
    ///
    /// 同时配置了私钥和公钥路径时使用 ES256，否则使用 HS256。
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        if let (Some(private_path), Some(public_path)) =
            (&config.private_key_path, &config.public_key_path)
        {
            let private_pem = std::fs::read(private_path).map_err(|e| {
                GnodeError::file_operation(format!("{}: {}", private_path, e))
            })?;
            let public_pem = std::fs::read(public_path)
                .map_err(|e| GnodeError::file_operation(format!("{}: {}", public_path, e)))?;

            let service =
                Self::with_ec_pem(&private_pem, &public_pem, config.access_token_minutes)
                    .map_err(|e| {
                        GnodeError::validation(format!("Invalid PEM file or key format: {}", e))
                    })?;
            info!("JWT signing with ES256 key pair from {}", private_path);
            return Ok(service);
        }

        // 获取 JWT secret，如果为空则生成一个安全的随机值
        let secret = if config.jwt_secret.is_empty() {
            warn!("JWT secret not configured or empty, generating secure random token");
            crate::utils::generate_random_token(32)
        } else {
            config.jwt_secret.clone()
        };

        Ok(Self::with_secret(&secret, config.access_token_minutes))
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn access_token_minutes(&self) -> u64 {
        self.access_token_minutes
    }

    /// Generate Access Token for the web UI
    pub fn generate_access_token(&self, username: &str) -> std::result::Result<String, Error> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: username.to_string(),
            aud: TOKEN_AUDIENCE.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(self.access_token_minutes as i64)).timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
    }

    /// Validate Access Token (signature, expiry and audience)
    pub fn validate_access_token(&self, token: &str) -> std::result::Result<AccessClaims, Error> {
        let mut validation = Validation::new(self.algorithm);
        validation.set_audience(&[TOKEN_AUDIENCE]);

        let token_data = decode::<AccessClaims>(token, &self.decoding_key, &validation)?;
        Ok(token_data.claims)
    }
}
