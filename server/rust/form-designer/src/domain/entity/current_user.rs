use serde::{Deserialize, Serialize};

/// JWT のクレーム。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub name: Option<String>,
    pub exp: usize,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub aud: Option<String>,
}

/// CurrentUser は認証済みの呼び出し元。監査列と SQL ログの記録者になる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: String,
    pub user_name: String,
}

impl CurrentUser {
    /// 認証無効時の呼び出し元。
    pub fn system() -> Self {
        Self {
            user_id: "system".to_string(),
            user_name: "system".to_string(),
        }
    }

    pub fn actor(&self) -> &str {
        &self.user_id
    }
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_name: claims.name.unwrap_or_else(|| claims.sub.clone()),
            user_id: claims.sub,
        }
    }
}
