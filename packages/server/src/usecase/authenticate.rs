//! UseCase: 認証処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - AuthenticateUseCase::verify() / refresh() メソッド
//!
//! ### なぜこのテストが必要か
//! - 接続時の認証と、接続中のトークン更新は同じ検証器を通る必要がある
//! - 接続中に別ユーザーへ成り代わることを防ぐ
//!
//! ### どのような状況を想定しているか
//! - 正常系：トークン検証、同一ユーザーのトークン更新
//! - 異常系：無効なトークン、別ユーザーのトークンでの更新

use std::sync::Arc;

use crate::domain::{ConnectionId, ConnectionRepository, TokenVerifier, UserIdentity};

use super::error::AuthenticateError;

/// 認証のユースケース
pub struct AuthenticateUseCase {
    verifier: Arc<dyn TokenVerifier>,
    connections: Arc<dyn ConnectionRepository>,
}

impl AuthenticateUseCase {
    pub fn new(
        verifier: Arc<dyn TokenVerifier>,
        connections: Arc<dyn ConnectionRepository>,
    ) -> Self {
        Self {
            verifier,
            connections,
        }
    }

    /// 生のトークンを検証して ID を取り出す
    pub fn verify(&self, token: &str) -> Result<UserIdentity, AuthenticateError> {
        Ok(self.verifier.verify(token)?)
    }

    /// 接続中のトークン更新
    ///
    /// 同じユーザーのトークンに限り、接続の ID（有効期限を含む）を置き換えます。
    pub async fn refresh(
        &self,
        connection_id: &ConnectionId,
        current: &UserIdentity,
        token: &str,
    ) -> Result<UserIdentity, AuthenticateError> {
        let identity = self.verify(token)?;
        if identity.user_id != current.user_id {
            return Err(AuthenticateError::IdentityMismatch);
        }
        self.connections
            .update_identity(connection_id, identity.clone())
            .await?;
        Ok(identity)
    }
}
