// ABOUTME: WeChat OAuth adapter: appid parameters, GET token exchange, errcode-on-200 errors
// ABOUTME: Appends the literal #wechat_redirect fragment and passes openid to the userinfo call
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Sparkpad

use serde::Deserialize;
use tracing::warn;
use url::Url;

use super::{OAuthProvider, ProviderProfile, ProviderToken, WechatProfile};
use crate::config::oauth::OAuthProviderConfig;
use crate::constants::endpoints::{
    WECHAT_AUTHORIZE_URL, WECHAT_TOKEN_URL, WECHAT_USERINFO_URL,
};
use crate::errors::{AuthError, AuthResult};
use crate::models::Provider;
use crate::utils::http_client::oauth_client;

/// WeChat token endpoint response
///
/// WeChat signals errors via `errcode`/`errmsg` fields on an HTTP 200
/// body, so every success field is optional here.
#[derive(Debug, Deserialize)]
struct WechatTokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    openid: Option<String>,
    scope: Option<String>,
    errcode: Option<i64>,
    errmsg: Option<String>,
}

/// WeChat userinfo endpoint response, same error encoding
#[derive(Debug, Deserialize)]
struct WechatUserInfoResponse {
    openid: Option<String>,
    unionid: Option<String>,
    nickname: Option<String>,
    headimgurl: Option<String>,
    errcode: Option<i64>,
    errmsg: Option<String>,
}

/// WeChat OAuth adapter
pub struct WechatOAuthProvider {
    config: OAuthProviderConfig,
    client: reqwest::Client,
}

impl WechatOAuthProvider {
    #[must_use]
    pub fn new(config: OAuthProviderConfig) -> Self {
        Self {
            config,
            client: oauth_client(),
        }
    }

    fn credentials(&self) -> AuthResult<(&str, &str)> {
        let app_id = self
            .config
            .client_id
            .as_deref()
            .ok_or_else(|| AuthError::Config("WECHAT_APP_ID is not configured".to_owned()))?;
        let secret = self
            .config
            .client_secret
            .as_deref()
            .ok_or_else(|| AuthError::Config("WECHAT_APP_SECRET is not configured".to_owned()))?;
        Ok((app_id, secret))
    }

    /// Parse a token response body, treating `errcode` as failure
    fn parse_token_response(body: &str) -> AuthResult<ProviderToken> {
        let response: WechatTokenResponse = serde_json::from_str(body).map_err(|e| {
            AuthError::AuthorizationFailed(format!("unparseable WeChat token response: {e}"))
        })?;

        if let Some(errcode) = response.errcode {
            // errcode 0 is "ok"; WeChat sometimes includes it on success
            if errcode != 0 {
                warn!(
                    errcode,
                    errmsg = response.errmsg.as_deref().unwrap_or(""),
                    "WeChat token exchange rejected"
                );
                return Err(AuthError::AuthorizationFailed(format!(
                    "WeChat errcode {errcode}"
                )));
            }
        }

        let access_token = response.access_token.ok_or_else(|| {
            AuthError::AuthorizationFailed("WeChat response missing access_token".to_owned())
        })?;
        let openid = response.openid.ok_or_else(|| {
            AuthError::AuthorizationFailed("WeChat response missing openid".to_owned())
        })?;

        Ok(ProviderToken {
            access_token,
            refresh_token: response.refresh_token,
            openid: Some(openid),
            scope: response.scope,
        })
    }

    /// Parse a userinfo response body, treating `errcode` as failure
    fn parse_userinfo_response(body: &str) -> AuthResult<WechatProfile> {
        let response: WechatUserInfoResponse = serde_json::from_str(body).map_err(|e| {
            AuthError::ProfileFetchFailed(format!("unparseable WeChat userinfo response: {e}"))
        })?;

        if let Some(errcode) = response.errcode {
            if errcode != 0 {
                warn!(
                    errcode,
                    errmsg = response.errmsg.as_deref().unwrap_or(""),
                    "WeChat userinfo rejected"
                );
                return Err(AuthError::ProfileFetchFailed(format!(
                    "WeChat errcode {errcode}"
                )));
            }
        }

        let openid = response.openid.ok_or_else(|| {
            AuthError::ProfileFetchFailed("WeChat userinfo missing openid".to_owned())
        })?;

        Ok(WechatProfile {
            openid,
            unionid: response.unionid,
            nickname: response.nickname,
            avatar: response.headimgurl,
        })
    }
}

#[async_trait::async_trait]
impl OAuthProvider for WechatOAuthProvider {
    fn provider(&self) -> Provider {
        Provider::Wechat
    }

    fn authorization_url(&self, state: &str) -> AuthResult<String> {
        let (app_id, _) = self.credentials()?;
        let redirect_uri = self
            .config
            .redirect_uri
            .as_deref()
            .ok_or_else(|| AuthError::Config("WeChat redirect URI is not configured".to_owned()))?;

        let mut url = Url::parse(WECHAT_AUTHORIZE_URL)
            .map_err(|e| AuthError::Internal(format!("invalid WeChat authorize URL: {e}")))?;

        url.query_pairs_mut()
            .append_pair("appid", app_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.config.scopes.join(","))
            .append_pair("state", state);

        // WeChat requires this literal fragment on the authorize URL
        url.set_fragment(Some("wechat_redirect"));

        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str) -> AuthResult<ProviderToken> {
        let (app_id, secret) = self.credentials()?;

        // WeChat's token endpoint is a GET with query parameters, not a
        // POST form
        let body = self
            .client
            .get(WECHAT_TOKEN_URL)
            .query(&[
                ("appid", app_id),
                ("secret", secret),
                ("code", code),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AuthError::AuthorizationFailed(format!("WeChat token request: {e}")))?
            .text()
            .await
            .map_err(|e| AuthError::AuthorizationFailed(format!("WeChat token body: {e}")))?;

        Self::parse_token_response(&body)
    }

    async fn fetch_profile(&self, token: &ProviderToken) -> AuthResult<ProviderProfile> {
        let openid = token.openid.as_deref().ok_or_else(|| {
            AuthError::ProfileFetchFailed("WeChat userinfo requires an openid".to_owned())
        })?;

        let body = self
            .client
            .get(WECHAT_USERINFO_URL)
            .query(&[
                ("access_token", token.access_token.as_str()),
                ("openid", openid),
                ("lang", "zh_CN"),
            ])
            .send()
            .await
            .map_err(|e| AuthError::ProfileFetchFailed(format!("WeChat userinfo request: {e}")))?
            .text()
            .await
            .map_err(|e| AuthError::ProfileFetchFailed(format!("WeChat userinfo body: {e}")))?;

        Ok(ProviderProfile::Wechat(Self::parse_userinfo_response(
            &body,
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_provider() -> WechatOAuthProvider {
        WechatOAuthProvider::new(OAuthProviderConfig {
            client_id: Some("wx1234567890".to_owned()),
            client_secret: Some("app-secret".to_owned()),
            redirect_uri: Some("https://app.example.com/api/auth/wechat/callback".to_owned()),
            scopes: vec!["snsapi_login".to_owned()],
            enabled: true,
        })
    }

    #[test]
    fn test_authorization_url_shape() {
        let url = test_provider().authorization_url("state123").unwrap();
        assert!(url.starts_with("https://open.weixin.qq.com/connect/oauth2/authorize?"));
        assert!(url.contains("appid=wx1234567890"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=snsapi_login"));
        assert!(url.contains("state=state123"));
        assert!(url.ends_with("#wechat_redirect"));
        // WeChat uses appid, never client_id
        assert!(!url.contains("client_id="));
    }

    #[test]
    fn test_errcode_on_200_is_failure() {
        let body = r#"{"errcode":40029,"errmsg":"invalid code"}"#;
        let err = WechatOAuthProvider::parse_token_response(body).unwrap_err();
        assert!(matches!(err, AuthError::AuthorizationFailed(_)));
    }

    #[test]
    fn test_token_response_success() {
        let body = r#"{"access_token":"at","expires_in":7200,"refresh_token":"rt","openid":"oid","scope":"snsapi_login","unionid":"uid"}"#;
        let token = WechatOAuthProvider::parse_token_response(body).unwrap();
        assert_eq!(token.access_token, "at");
        assert_eq!(token.openid.as_deref(), Some("oid"));
        assert_eq!(token.refresh_token.as_deref(), Some("rt"));
    }

    #[test]
    fn test_userinfo_unionid_preferred_over_openid() {
        let body = r#"{"openid":"oid","nickname":"nick","headimgurl":"https://img","unionid":"uid"}"#;
        let profile = WechatOAuthProvider::parse_userinfo_response(body).unwrap();
        let tagged = ProviderProfile::Wechat(profile);
        assert_eq!(tagged.provider_user_id(), "uid");
        assert_eq!(tagged.avatar_url(), Some("https://img"));
    }

    #[test]
    fn test_userinfo_falls_back_to_openid() {
        let body = r#"{"openid":"oid","nickname":"nick"}"#;
        let profile = WechatOAuthProvider::parse_userinfo_response(body).unwrap();
        let tagged = ProviderProfile::Wechat(profile);
        assert_eq!(tagged.provider_user_id(), "oid");
    }

    #[test]
    fn test_nickname_fallback_default() {
        let body = r#"{"openid":"oid"}"#;
        let profile = WechatOAuthProvider::parse_userinfo_response(body).unwrap();
        let tagged = ProviderProfile::Wechat(profile);
        assert_eq!(tagged.display_name(), "WeChat User");
    }
}
