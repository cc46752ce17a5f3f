use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Method, Response, Url};
use serde::Deserialize;
use tracing::debug;

use crate::config::Config;
use crate::error::CatalogError;
use crate::models::{
    CategoryRaw, Language, Template, TemplateDraft, TemplateId, TemplateRecord, USER_CATEGORY_ID,
};

/// Remote source of categories and templates.
///
/// No retries happen at this layer; a failed call is reported once and the
/// caller decides whether to try again.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn list_categories(&self, lang: Language) -> Result<Vec<CategoryRaw>, CatalogError>;

    async fn list_templates(
        &self,
        category_id: &str,
        lang: Language,
    ) -> Result<Vec<Template>, CatalogError>;

    async fn list_user_templates(&self) -> Result<Vec<Template>, CatalogError>;

    async fn create_user_template(&self, draft: &TemplateDraft) -> Result<Template, CatalogError>;

    async fn update_user_template(
        &self,
        id: &TemplateId,
        draft: &TemplateDraft,
    ) -> Result<Template, CatalogError>;

    async fn delete_user_template(&self, id: &TemplateId) -> Result<(), CatalogError>;
}

/// Only the `error` field of an error body is trusted.
#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Mutations answer either with the template or with `{success, template}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum MutationBody {
    Envelope { template: TemplateRecord },
    Bare(TemplateRecord),
}

impl MutationBody {
    fn into_record(self) -> TemplateRecord {
        match self {
            MutationBody::Envelope { template } => template,
            MutationBody::Bare(record) => record,
        }
    }
}

/// Builds the message for a non-success response from its raw body.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| status.to_string())
        })
}

/// HTTP client for the catalog endpoints.
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self, CatalogError> {
        let mut headers = HeaderMap::new();
        let agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| CatalogError::Transport(format!("invalid user agent: {e}")))?;
        headers.insert(USER_AGENT, agent);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| CatalogError::Transport(format!("invalid base url: {e}")))?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, CatalogError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| CatalogError::Transport("base url cannot carry a path".into()))?;
            path.pop_if_empty().push("catalog").extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&TemplateDraft>,
    ) -> Result<Response, CatalogError> {
        let path = url.path().to_string();
        let mut request = self.client.request(method.clone(), url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;

        let status = response.status();
        debug!(%method, %path, status = status.as_u16(), "catalog request");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Remote {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }
        Ok(response)
    }

    async fn mutate(
        &self,
        method: Method,
        url: Url,
        draft: &TemplateDraft,
    ) -> Result<Template, CatalogError> {
        let body: MutationBody = self.send(method, url, Some(draft)).await?.json().await?;
        Ok(body.into_record().into_template(None, USER_CATEGORY_ID))
    }
}

#[async_trait]
impl CatalogSource for ApiClient {
    async fn list_categories(&self, lang: Language) -> Result<Vec<CategoryRaw>, CatalogError> {
        let url = self.endpoint(&["categories"], &[("lang", lang.as_str())])?;
        Ok(self.send(Method::GET, url, None).await?.json().await?)
    }

    async fn list_templates(
        &self,
        category_id: &str,
        lang: Language,
    ) -> Result<Vec<Template>, CatalogError> {
        let url = self.endpoint(
            &["templates"],
            &[("category", category_id), ("lang", lang.as_str())],
        )?;
        let records: Vec<TemplateRecord> = self.send(Method::GET, url, None).await?.json().await?;
        Ok(records
            .into_iter()
            .map(|r| r.into_template(Some(lang), category_id))
            .collect())
    }

    async fn list_user_templates(&self) -> Result<Vec<Template>, CatalogError> {
        let url = self.endpoint(&["user-templates"], &[])?;
        let records: Vec<TemplateRecord> = self.send(Method::GET, url, None).await?.json().await?;
        Ok(records
            .into_iter()
            .map(|r| r.into_template(None, USER_CATEGORY_ID))
            .collect())
    }

    async fn create_user_template(&self, draft: &TemplateDraft) -> Result<Template, CatalogError> {
        let url = self.endpoint(&["user-templates"], &[])?;
        self.mutate(Method::POST, url, draft).await
    }

    async fn update_user_template(
        &self,
        id: &TemplateId,
        draft: &TemplateDraft,
    ) -> Result<Template, CatalogError> {
        let url = self.endpoint(&["user-templates", id.as_str()], &[])?;
        self.mutate(Method::PUT, url, draft).await
    }

    async fn delete_user_template(&self, id: &TemplateId) -> Result<(), CatalogError> {
        let url = self.endpoint(&["user-templates", id.as_str()], &[])?;
        self.send(Method::DELETE, url, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn client(base: &str) -> ApiClient {
        let config = Config {
            base_url: base.to_string(),
            ..Config::default()
        };
        ApiClient::new(&config).expect("client builds")
    }

    #[test]
    fn endpoints_encode_category_and_language() {
        let api = client("http://127.0.0.1:8188/");
        let url = api
            .endpoint(&["templates"], &[("category", "3d art"), ("lang", "en")])
            .expect("url");
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8188/catalog/templates?category=3d+art&lang=en"
        );
    }

    #[test]
    fn endpoints_keep_a_base_path_prefix() {
        let api = client("http://host/api");
        let url = api
            .endpoint(&["user-templates", "user_20251123_005604_0"], &[])
            .expect("url");
        assert_eq!(
            url.as_str(),
            "http://host/api/catalog/user-templates/user_20251123_005604_0"
        );
    }

    #[test]
    fn unusable_user_agent_is_rejected() {
        let config = Config {
            user_agent: "prompt\ncatalog".to_string(),
            ..Config::default()
        };
        let err = ApiClient::new(&config).err().expect("rejected");
        assert!(matches!(err, CatalogError::Transport(msg) if msg.starts_with("invalid user agent")));
    }

    #[test]
    fn error_field_is_surfaced_verbatim() {
        let msg = error_message(StatusCode::BAD_REQUEST, r#"{"error": "Category ID is required"}"#);
        assert_eq!(msg, "Category ID is required");
    }

    #[test]
    fn unknown_error_bodies_fall_back_to_the_reason_phrase() {
        assert_eq!(
            error_message(StatusCode::NOT_FOUND, "<html>nope</html>"),
            "Not Found"
        );
        assert_eq!(
            error_message(StatusCode::INTERNAL_SERVER_ERROR, r#"{"detail": "x"}"#),
            "Internal Server Error"
        );
    }

    #[test]
    fn mutation_bodies_decode_with_or_without_envelope() {
        let wrapped: MutationBody = serde_json::from_str(
            r#"{"success": true, "template": {"id": "user_1", "title": "Mine",
                "prompt": {"zh": "猫", "en": "cat"}}}"#,
        )
        .expect("envelope");
        let bare: MutationBody =
            serde_json::from_str(r#"{"id": "user_2", "title": "Other"}"#).expect("bare");

        let wrapped = wrapped.into_record().into_template(None, USER_CATEGORY_ID);
        assert_eq!(wrapped.id, TemplateId::from("user_1"));
        assert_eq!(wrapped.prompt.get(Language::En), Some("cat"));
        assert_eq!(wrapped.category, USER_CATEGORY_ID);

        let bare = bare.into_record().into_template(None, USER_CATEGORY_ID);
        assert_eq!(bare.title, "Other");
    }
}
