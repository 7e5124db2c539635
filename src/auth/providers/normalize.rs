use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Subset of the Yandex ID user-info document the service reads.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct YandexUserInfo {
    pub id: String,
    pub login: Option<String>,
    pub default_email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub real_name: Option<String>,
    pub client_id: Option<String>,
    pub psuid: Option<String>,
}

/// OpenID Connect userinfo claims as returned by Google.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct GoogleUserInfo {
    pub sub: String,
    pub email: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderPayload {
    Yandex(YandexUserInfo),
    Google(GoogleUserInfo),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalIdentity {
    pub login: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

pub fn normalize(payload: ProviderPayload) -> Result<CanonicalIdentity, AppError> {
    let (login, first_name, last_name) = match payload {
        ProviderPayload::Yandex(info) => {
            let login = present(info.login)
                .or_else(|| present(info.default_email))
                .or_else(|| present(Some(info.id)).map(|id| format!("yandex:{id}")));
            (login, present(info.first_name), present(info.last_name))
        }
        ProviderPayload::Google(info) => {
            let login = present(info.email)
                .or_else(|| present(Some(info.sub)).map(|sub| format!("google:{sub}")));
            (login, present(info.given_name), present(info.family_name))
        }
    };

    let login =
        login.ok_or_else(|| AppError::validation("Identity provider returned no usable login"))?;
    Ok(CanonicalIdentity {
        login,
        first_name,
        last_name,
    })
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
