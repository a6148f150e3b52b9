use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::config::ResolvedConfig;
use crate::domain::{Barcode, SampleMetadata, SurveyTemplate, TemplateIds};
use crate::error::KiraError;

pub trait MetadataClient: Send + Sync {
    fn fetch_sample_surveys(&self, barcode: &Barcode) -> Result<SampleMetadata, KiraError>;
    fn fetch_survey_template(&self, ids: &TemplateIds) -> Result<SurveyTemplate, KiraError>;
}

impl<T: MetadataClient + ?Sized> MetadataClient for &T {
    fn fetch_sample_surveys(&self, barcode: &Barcode) -> Result<SampleMetadata, KiraError> {
        (**self).fetch_sample_surveys(barcode)
    }

    fn fetch_survey_template(&self, ids: &TemplateIds) -> Result<SurveyTemplate, KiraError> {
        (**self).fetch_survey_template(ids)
    }
}

#[derive(Clone)]
pub struct MetadataHttpClient {
    client: Client,
    base_url: Url,
    language_tag: String,
}

impl MetadataHttpClient {
    pub fn new(config: &ResolvedConfig) -> Result<Self, KiraError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("kira-sm/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| KiraError::ApiHttp(err.to_string()))?,
        );
        if let Some(token) = config.api_token.as_deref() {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|err| KiraError::ApiHttp(err.to_string()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| KiraError::ApiHttp(err.to_string()))?;

        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .map_err(|err| KiraError::ConfigParse(format!("invalid base_url: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(KiraError::ConfigParse(format!(
                "base_url cannot carry a path: {base_url}"
            )));
        }

        Ok(Self {
            client,
            base_url,
            language_tag: config.language_tag.clone(),
        })
    }

    pub fn sample_url(&self, barcode: &Barcode) -> Result<Url, KiraError> {
        self.endpoint(&[
            "api",
            "admin",
            "metadata",
            "samples",
            barcode.as_str(),
            "surveys",
            "",
        ])
    }

    pub fn template_url(&self, ids: &TemplateIds) -> Result<Url, KiraError> {
        let template_id = ids.template_id.to_string();
        self.endpoint(&[
            "api",
            "accounts",
            &ids.account_id,
            "sources",
            &ids.source_id,
            "survey_templates",
            &template_id,
        ])
    }

    // Each segment is percent-encoded, so ids never alter the route.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, KiraError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                KiraError::ConfigParse(format!("base_url cannot carry a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<T, KiraError> {
        let response = request.send().map_err(map_transport_error)?;
        let response = Self::handle_status(response)?;
        response
            .json()
            .map_err(|err| KiraError::ApiPayload(err.to_string()))
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, KiraError> {
        if accepts(response.status()) {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "metadata API request failed".to_string());
        Err(KiraError::ApiStatus { status, message })
    }
}

impl MetadataClient for MetadataHttpClient {
    fn fetch_sample_surveys(&self, barcode: &Barcode) -> Result<SampleMetadata, KiraError> {
        let url = self.sample_url(barcode)?;
        self.get_json(self.client.get(url))
    }

    fn fetch_survey_template(&self, ids: &TemplateIds) -> Result<SurveyTemplate, KiraError> {
        let url = self.template_url(ids)?;
        self.get_json(
            self.client
                .get(url)
                .query(&[("language_tag", self.language_tag.as_str())]),
        )
    }
}

// Anything but 200 is a failed fetch, including other 2xx codes without a body.
fn accepts(status: StatusCode) -> bool {
    status == StatusCode::OK
}

fn map_transport_error(err: reqwest::Error) -> KiraError {
    if err.is_timeout() {
        KiraError::ApiTimeout(err.to_string())
    } else {
        KiraError::ApiHttp(err.to_string())
    }
}
