//! Immutable rating requests and their wire encoding.

use serde::Serialize;

use crate::config::Config;

/// User message content: the assembled text plus optional image references.
#[derive(Debug, Clone, PartialEq)]
pub struct UserContent {
    pub text: String,
    pub image_urls: Vec<String>,
}

/// Everything needed to ask the completions endpoint for one rating.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingRequest {
    pub model_id: String,
    pub system_prompt: String,
    pub user_content: UserContent,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    pub provider_sort: String,
    pub streaming: bool,
}

impl RatingRequest {
    /// Builds a request for `source` from configured model and sampling settings.
    ///
    /// `image_urls` should already be filtered for model support; they are sent
    /// verbatim as `image_url` parts after the text part.
    pub fn build(config: &Config, source: &str, image_urls: Vec<String>) -> Self {
        Self {
            model_id: config.model_id.clone(),
            system_prompt: config.system_prompt.clone(),
            user_content: UserContent {
                text: source.to_string(),
                image_urls,
            },
            temperature: config.temperature,
            top_p: config.top_p,
            max_tokens: config.max_tokens,
            provider_sort: config.provider_sort.clone(),
            streaming: config.streaming,
        }
    }

    /// The exact text being rated.
    pub fn source_text(&self) -> &str {
        &self.user_content.text
    }

    /// Borrowing view serialised as the JSON request body.
    pub fn to_body(&self) -> CompletionBody<'_> {
        let mut user_parts = Vec::with_capacity(1 + self.user_content.image_urls.len());
        user_parts.push(ContentPart::Text {
            text: &self.user_content.text,
        });
        user_parts.extend(
            self.user_content
                .image_urls
                .iter()
                .map(|url| ContentPart::ImageUrl {
                    image_url: ImageRef { url },
                }),
        );

        CompletionBody {
            model: &self.model_id,
            messages: vec![
                Message {
                    role: "system",
                    content: vec![ContentPart::Text {
                        text: &self.system_prompt,
                    }],
                },
                Message {
                    role: "user",
                    content: user_parts,
                },
            ],
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
            provider: ProviderPreferences {
                sort: &self.provider_sort,
                allow_fallbacks: true,
            },
            stream: self.streaming,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CompletionBody<'a> {
    pub model: &'a str,
    pub messages: Vec<Message<'a>>,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    pub provider: ProviderPreferences<'a>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

#[derive(Debug, Serialize)]
pub struct Message<'a> {
    pub role: &'static str,
    pub content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageRef<'a> },
}

#[derive(Debug, Serialize)]
pub struct ImageRef<'a> {
    pub url: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ProviderPreferences<'a> {
    pub sort: &'a str,
    pub allow_fallbacks: bool,
}
