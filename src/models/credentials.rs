//! Credentials read from the process environment.

use crate::error::{AppError, Result};

pub const ANIMAL_API_KEY_ENV: &str = "ANIMAL_API_KEY";
pub const CDN_TOKEN_ENV: &str = "FINDYOU_CDN_TOKEN";
pub const INSTAGRAM_TOKEN_ENV: &str = "INSTAGRAM_ACCESS_TOKEN";
pub const INSTAGRAM_ACCOUNT_ENV: &str = "INSTAGRAM_ACCOUNT_ID";

/// Secrets needed by one pipeline run.
#[derive(Clone)]
pub struct Credentials {
    /// Registry service key
    pub registry_api_key: String,

    /// Bearer token for the CDN
    pub cdn_token: String,

    /// Graph API credentials; absent on dry runs
    pub social: Option<SocialCredentials>,
}

/// Instagram Graph API credentials.
#[derive(Clone)]
pub struct SocialCredentials {
    pub access_token: String,
    pub account_id: String,
}

impl Credentials {
    /// Read credentials from the environment.
    pub fn from_env(require_social: bool) -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), require_social)
    }

    /// Read credentials through an arbitrary lookup.
    ///
    /// Every missing variable is reported at once.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        require_social: bool,
    ) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut missing = Vec::new();

        let registry_api_key = get(ANIMAL_API_KEY_ENV);
        let cdn_token = get(CDN_TOKEN_ENV);
        if registry_api_key.is_none() {
            missing.push(ANIMAL_API_KEY_ENV);
        }
        if cdn_token.is_none() {
            missing.push(CDN_TOKEN_ENV);
        }

        let social = match SocialCredentials::from_lookup(&get) {
            Ok(social) => Some(social),
            Err(absent) if require_social => {
                missing.extend(absent);
                None
            }
            Err(_) => None,
        };

        match (registry_api_key, cdn_token) {
            (Some(registry_api_key), Some(cdn_token)) if missing.is_empty() => Ok(Self {
                registry_api_key,
                cdn_token,
                social,
            }),
            _ => Err(missing_error(&missing)),
        }
    }
}

impl SocialCredentials {
    /// Read only the Graph API credentials from the environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty()))
            .map_err(|missing| missing_error(&missing))
    }

    fn from_lookup(
        get: &dyn Fn(&str) -> Option<String>,
    ) -> std::result::Result<Self, Vec<&'static str>> {
        match (get(INSTAGRAM_TOKEN_ENV), get(INSTAGRAM_ACCOUNT_ENV)) {
            (Some(access_token), Some(account_id)) => Ok(Self {
                access_token,
                account_id,
            }),
            (token, account) => {
                let mut missing = Vec::new();
                if token.is_none() {
                    missing.push(INSTAGRAM_TOKEN_ENV);
                }
                if account.is_none() {
                    missing.push(INSTAGRAM_ACCOUNT_ENV);
                }
                Err(missing)
            }
        }
    }
}

fn missing_error(missing: &[&str]) -> AppError {
    AppError::config(format!(
        "missing environment variables: {}",
        missing.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn loads_all_credentials() {
        let vars = env(&[
            (ANIMAL_API_KEY_ENV, "key"),
            (CDN_TOKEN_ENV, "cdn"),
            (INSTAGRAM_TOKEN_ENV, "token"),
            (INSTAGRAM_ACCOUNT_ENV, "1784"),
        ]);
        let creds = Credentials::from_lookup(|k| vars.get(k).cloned(), true).unwrap();
        assert_eq!(creds.registry_api_key, "key");
        assert_eq!(creds.social.unwrap().account_id, "1784");
    }

    #[test]
    fn dry_run_does_not_need_social_credentials() {
        let vars = env(&[(ANIMAL_API_KEY_ENV, "key"), (CDN_TOKEN_ENV, "cdn")]);
        let creds = Credentials::from_lookup(|k| vars.get(k).cloned(), false).unwrap();
        assert!(creds.social.is_none());
    }

    #[test]
    fn reports_every_missing_variable() {
        let vars = env(&[(CDN_TOKEN_ENV, "  ")]);
        let err = Credentials::from_lookup(|k| vars.get(k).cloned(), true)
            .err()
            .unwrap()
            .to_string();
        assert!(err.contains(ANIMAL_API_KEY_ENV));
        assert!(err.contains(CDN_TOKEN_ENV));
        assert!(err.contains(INSTAGRAM_TOKEN_ENV));
        assert!(err.contains(INSTAGRAM_ACCOUNT_ENV));
    }
}
