use super::client::GeminiHttpClient;
use super::extract::extract_candidate_texts;
use super::translate::translate;
use super::types::{Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig};
use crate::config::{Config, ModelCost};
use crate::llm::{ChatCompletion, ChatMessage, ChatService, CompletionOptions, Messages};
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, error};

/// Fallback sampling parameters applied when a call leaves them unset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationDefaults {
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
}

/// Chat completions against one Gemini model.
pub struct GeminiService {
    http: GeminiHttpClient,
    model_name: String,
    api_type: String,
    defaults: GenerationDefaults,
    max_retry: u32,
    cost_tracking: bool,
    model_costs: HashMap<String, ModelCost>,
}

impl GeminiService {
    /// Build the service for the agent section `agent_type` of `config`.
    pub fn new(config: &Config, agent_type: &str) -> Result<Self> {
        Self::new_with_client(config, agent_type, reqwest::Client::new())
    }

    pub fn new_with_client(
        config: &Config,
        agent_type: &str,
        client: reqwest::Client,
    ) -> Result<Self> {
        let agent = config.agent(agent_type)?;
        let http = GeminiHttpClient::new_with_client(agent.api_key, agent.api_model.clone(), client);

        let service = Self::from_http(
            http,
            agent.api_model,
            GenerationDefaults {
                max_tokens: config.max_tokens,
                temperature: config.temperature,
                top_p: config.top_p,
            },
        )
        .with_api_type(agent.api_type)
        .with_max_retry(config.max_retry)
        .with_cost_tracking(config.enable_cost_tracking, config.model_costs.clone());

        debug!(
            "Gemini service ready for {} (model: {}, api type: {})",
            agent_type, service.model_name, service.api_type
        );
        Ok(service)
    }

    /// Build the service around an existing HTTP handle.
    ///
    /// `model_name` is the name pricing is keyed by, as configured.
    pub fn from_http(
        http: GeminiHttpClient,
        model_name: String,
        defaults: GenerationDefaults,
    ) -> Self {
        Self {
            http,
            model_name,
            api_type: "gemini".to_string(),
            defaults,
            max_retry: 0,
            cost_tracking: false,
            model_costs: HashMap::new(),
        }
    }

    pub fn with_api_type(mut self, api_type: String) -> Self {
        self.api_type = api_type.to_lowercase();
        self
    }

    pub fn with_max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = max_retry;
        self
    }

    pub fn with_cost_tracking(
        mut self,
        enabled: bool,
        model_costs: HashMap<String, ModelCost>,
    ) -> Self {
        self.cost_tracking = enabled;
        self.model_costs = model_costs;
        self
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }

    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.http = self.http.with_timeout(timeout);
        self
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn api_type(&self) -> &str {
        &self.api_type
    }

    /// Retry budget from the configuration.
    ///
    /// Not applied by [`ChatService::chat_completion`] itself; hand it to
    /// [`crate::llm::Retrying`] to retry transient failures.
    pub fn max_retry(&self) -> u32 {
        self.max_retry
    }

    fn generation_config(&self, options: &CompletionOptions) -> GenerationConfig {
        GenerationConfig {
            max_output_tokens: options.max_tokens.unwrap_or(self.defaults.max_tokens),
            temperature: options.temperature.unwrap_or(self.defaults.temperature),
            top_p: options.top_p.unwrap_or(self.defaults.top_p),
        }
    }

    /// Word-count cost estimate; zero unless tracking is enabled.
    fn estimate_cost(&self, messages: &[ChatMessage], candidates: &[Option<String>]) -> f64 {
        if !self.cost_tracking {
            return 0.0;
        }

        let price = self
            .model_costs
            .get(&self.model_name)
            .copied()
            .unwrap_or_default();

        let input_tokens: usize = messages.iter().map(ChatMessage::word_count).sum();
        let output_tokens = candidates
            .first()
            .and_then(Option::as_deref)
            .map_or(0, |text| text.split_whitespace().count());

        input_tokens as f64 * price.input_cost + output_tokens as f64 * price.output_cost
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<ChatCompletion> {
        if options.n > 1 {
            debug!(
                "Requested n={} completions; Gemini returns its default candidate count",
                options.n
            );
        }

        let parts = translate(messages)?;
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: parts.into_iter().map(Into::into).collect(),
            }],
            generation_config: self.generation_config(options),
        };

        let response: GenerateContentResponse = self.http.generate_content(&request).await?;

        if let Some(usage) = &response.usage_metadata {
            debug!(
                "Gemini usage: prompt={:?} candidates={:?} total={:?}",
                usage.prompt_token_count, usage.candidates_token_count, usage.total_token_count
            );
        }

        let candidates = extract_candidate_texts(Some(&response));
        let cost = self.estimate_cost(messages, &candidates);

        Ok(ChatCompletion { candidates, cost })
    }
}

#[async_trait]
impl ChatService for GeminiService {
    async fn chat_completion(
        &self,
        messages: Messages,
        options: &CompletionOptions,
    ) -> Result<ChatCompletion> {
        self.complete(messages.as_slice(), options)
            .await
            .map_err(|e| {
                error!("Error in Gemini chat completion: {}", e);
                e
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::gemini::test_support;
    use crate::llm::ContentPart;
    use crate::Error;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::body_partial_json;
    use wiremock::{MockServer, ResponseTemplate};

    const DEFAULT_MODEL: &str = "gemini-2.0-flash";

    const DEFAULTS: GenerationDefaults = GenerationDefaults {
        max_tokens: 2000,
        temperature: 0.0,
        top_p: 0.0,
    };

    fn make_service(server: &MockServer) -> GeminiService {
        GeminiService::from_http(
            GeminiHttpClient::new("test-key".to_string(), DEFAULT_MODEL.to_string()),
            DEFAULT_MODEL.to_string(),
            DEFAULTS,
        )
        .with_base_url(server.uri())
    }

    fn priced(service: GeminiService, input_cost: f64, output_cost: f64) -> GeminiService {
        let mut costs = HashMap::new();
        costs.insert(
            DEFAULT_MODEL.to_string(),
            ModelCost {
                input_cost,
                output_cost,
            },
        );
        service.with_cost_tracking(true, costs)
    }

    fn text_response(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
        }))
    }

    fn ten_word_conversation() -> Vec<ChatMessage> {
        vec![
            ChatMessage::system("You operate a desktop"),
            ChatMessage::user(vec![
                ContentPart::text("open the settings window"),
                ContentPart::image_url("data:image/png;base64,iVBORw=="),
                ContentPart::text("please now"),
            ]),
        ]
    }

    #[test]
    fn test_generation_config_uses_defaults() {
        let service = GeminiService::from_http(
            GeminiHttpClient::new("k".to_string(), DEFAULT_MODEL.to_string()),
            DEFAULT_MODEL.to_string(),
            DEFAULTS,
        );

        assert_eq!(
            service.generation_config(&CompletionOptions::default()),
            GenerationConfig {
                max_output_tokens: 2000,
                temperature: 0.0,
                top_p: 0.0,
            }
        );
    }

    #[test]
    fn test_generation_config_prefers_overrides() {
        let service = GeminiService::from_http(
            GeminiHttpClient::new("k".to_string(), DEFAULT_MODEL.to_string()),
            DEFAULT_MODEL.to_string(),
            DEFAULTS,
        );
        let options = CompletionOptions {
            temperature: Some(0.7),
            max_tokens: Some(64),
            ..Default::default()
        };

        assert_eq!(
            service.generation_config(&options),
            GenerationConfig {
                max_output_tokens: 64,
                temperature: 0.7,
                top_p: 0.0,
            }
        );
    }

    #[tokio::test]
    async fn test_chat_completion_returns_candidate_texts() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [
                    { "content": { "parts": [{ "text": "Click " }, { "text": "OK" }] } },
                    { "content": { "parts": [{ "text": "thinking", "thought": true }] } }
                ]
            })))
            .mount(&server)
            .await;

        let completion = make_service(&server)
            .chat_completion(
                ChatMessage::user(vec![ContentPart::text("what next?")]).into(),
                &CompletionOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(
            completion.candidates,
            vec![Some("Click OK".to_string()), None]
        );
        assert_eq!(completion.cost, 0.0);
    }

    #[tokio::test]
    async fn test_request_carries_translated_parts_and_config() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .and(body_partial_json(serde_json::json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "text": "Your general instruction: You operate a desktop" },
                        { "text": "open the settings window" },
                        { "inlineData": { "mimeType": "image/png", "data": "iVBORw==" } },
                        { "text": "please now" }
                    ]
                }],
                "generationConfig": {
                    "maxOutputTokens": 128,
                    "temperature": 0.0,
                    "topP": 0.9
                }
            })))
            .respond_with(text_response("done"))
            .expect(1)
            .mount(&server)
            .await;

        let options = CompletionOptions {
            max_tokens: Some(128),
            top_p: Some(0.9),
            ..Default::default()
        };

        make_service(&server)
            .chat_completion(ten_word_conversation().into(), &options)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cost_is_zero_when_tracking_disabled() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(text_response("one two three four five"))
            .mount(&server)
            .await;

        let service =
            priced(make_service(&server), 0.01, 0.02).with_cost_tracking(false, HashMap::new());
        let completion = service
            .chat_completion(ten_word_conversation().into(), &CompletionOptions::default())
            .await
            .unwrap();

        assert_eq!(completion.cost, 0.0);
    }

    #[tokio::test]
    async fn test_cost_uses_word_counts() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(text_response("one two three four five"))
            .mount(&server)
            .await;

        let service = priced(make_service(&server), 0.01, 0.02);
        let completion = service
            .chat_completion(ten_word_conversation().into(), &CompletionOptions::default())
            .await
            .unwrap();

        assert!((completion.cost - 0.20).abs() < 1e-9, "cost was {}", completion.cost);
    }

    #[tokio::test]
    async fn test_cost_is_zero_for_unpriced_model() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(text_response("five words of output here"))
            .mount(&server)
            .await;

        let service = make_service(&server).with_cost_tracking(true, HashMap::new());
        let completion = service
            .chat_completion(ten_word_conversation().into(), &CompletionOptions::default())
            .await
            .unwrap();

        assert_eq!(completion.cost, 0.0);
    }

    #[tokio::test]
    async fn test_cost_without_candidates_counts_input_only() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let service = priced(make_service(&server), 0.01, 0.02);
        let completion = service
            .chat_completion(ten_word_conversation().into(), &CompletionOptions::default())
            .await
            .unwrap();

        assert!(completion.candidates.is_empty());
        assert!((completion.cost - 0.10).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_invalid_image_fails_before_request() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(text_response("unreachable"))
            .expect(0)
            .mount(&server)
            .await;

        let err = make_service(&server)
            .chat_completion(
                ChatMessage::user(vec![ContentPart::image_url("data:image/png;nope")]).into(),
                &CompletionOptions::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[tokio::test]
    async fn test_api_error_propagates() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
            .expect(1)
            .mount(&server)
            .await;

        let err = make_service(&server)
            .chat_completion(
                ChatMessage::system("hi").into(),
                &CompletionOptions::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Api { status: 500, .. }));
    }

    #[test]
    fn test_new_reads_agent_section() {
        let config = Config::from_json_str(
            r#"{
                "APP_AGENT": { "API_KEY": "k", "API_MODEL": "models/gemini-1.5-pro", "API_TYPE": "Gemini" },
                "MAX_TOKENS": 500, "TEMPERATURE": 0.2, "TOP_P": 0.8, "MAX_RETRY": 4
            }"#,
        )
        .unwrap();

        let service = GeminiService::new(&config, "APP_AGENT").unwrap();

        assert_eq!(service.model_name(), "models/gemini-1.5-pro");
        assert_eq!(service.api_type(), "gemini");
        assert_eq!(service.max_retry(), 4);
        assert_eq!(
            service.defaults,
            GenerationDefaults {
                max_tokens: 500,
                temperature: 0.2,
                top_p: 0.8,
            }
        );
    }

    #[tokio::test]
    async fn test_configured_model_costs_price_the_call() {
        let server = MockServer::start().await;

        test_support::post_path_regex(test_support::GENERATE_CONTENT_PATH_REGEX)
            .respond_with(text_response("one two three four five"))
            .mount(&server)
            .await;

        let config = Config::from_json_str(
            r#"{
                "APP_AGENT": { "API_KEY": "k", "API_MODEL": "models/gemini-1.5-pro", "API_TYPE": "Gemini" },
                "MAX_TOKENS": 500, "TEMPERATURE": 0.2, "TOP_P": 0.8, "MAX_RETRY": 0,
                "ENABLE_COST_TRACKING": true,
                "MODEL_COSTS": { "models/gemini-1.5-pro": { "input_cost": 0.01, "output_cost": 0.02 } }
            }"#,
        )
        .unwrap();

        let service = GeminiService::new(&config, "APP_AGENT")
            .unwrap()
            .with_base_url(server.uri());
        let completion = service
            .chat_completion(ten_word_conversation().into(), &CompletionOptions::default())
            .await
            .unwrap();

        assert!((completion.cost - 0.20).abs() < 1e-9, "cost was {}", completion.cost);
    }
}
