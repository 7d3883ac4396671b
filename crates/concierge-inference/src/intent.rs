//! Intent classification for shopping queries.
//!
//! One structured-JSON chat call classifies the price-stripped message
//! into one of three intents and extracts a cleaned product
//! description. Model output is advisory: a deterministic post-stage
//! is always applied last and is authoritative: an attached image
//! forces `image_rec` no matter what the model said. Classifier
//! failures degrade to a deterministic fallback and never surface to
//! the caller.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use concierge_core::{
    defaults, extract_price_filter, strip_price_language, Error, GenerationBackend,
    GenerationOptions, Intent, IntentResult, PriceFilter, Result,
};

/// System prompt for the structured classification call.
const CLASSIFY_SYSTEM_PROMPT: &str = r#"You are a shopping assistant intent classifier. Analyze the user's message and determine:

1. Intent classification:
   - "general_talk": greetings, "what's your name", "what can you do", general questions not about products, or vague/ambiguous questions
   - "text_rec": requests to recommend, compare, or find products using text descriptions
   - "image_rec": user provided an image OR text explicitly mentions "like this photo", "find similar" with image context

2. Extract ONLY the product-relevant description (remove fluff, greetings, unnecessary words)

3. Extract image URL if mentioned in text (look for URLs ending in .jpg, .png, .jpeg, or image hosting sites)

Respond in JSON format:
{
  "intent": "general_talk" | "text_rec" | "image_rec",
  "cleanedQuery": "cleaned product description",
  "imageUrl": "url if found in text, otherwise null"
}"#;

/// Fixed persona for conversational replies.
const PERSONA_SYSTEM_PROMPT: &str = r#"You are "Commerce Concierge", a friendly shopping assistant. Follow these rules:

- Be conversational and friendly
- Keep responses SHORT (2-3 sentences max)
- If asked what you can do, say: "I help you find great products from our catalog. You can even upload a photo, and I'll find similar items."
- If asked your name, say: "I'm Commerce Concierge"
- If asked who you represent, say: "I'm your personal shopping helper"
- NEVER make up products that don't exist
- After answering, ask ONE quick follow-up to guide the search
- Offer 2-3 simple choices (e.g., "Shoes, bags, or jackets?" or "For men, women, or kids?")

Examples:
User: "Hi"
You: "Hey there! I'm Commerce Concierge, your personal shopping helper. What are you looking for today - clothing, accessories, or electronics?"

User: "What can you do?"
You: "I help you find great products from our catalog. You can even upload a photo, and I'll find similar items. Are you shopping for something specific today?""#;

/// Canned greeting used when the conversation call itself fails.
const FALLBACK_GREETING: &str =
    "Hi! I'm Commerce Concierge, your shopping helper. What can I help you find today?";

/// Raw structured output of the classification call. Model output is
/// untrusted: every field defaults, unknown intent strings are coerced
/// downstream.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawClassification {
    intent: String,
    #[serde(rename = "cleanedQuery")]
    cleaned_query: String,
    #[serde(rename = "imageUrl")]
    image_url: Option<String>,
}

/// Classifies a shopping query into a handling intent.
pub struct IntentClassifier {
    backend: Arc<dyn GenerationBackend>,
}

impl IntentClassifier {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    /// Classify a message. Never fails: classifier unavailability
    /// degrades to a deterministic best-effort result.
    pub async fn classify(&self, message: &str, has_image: bool) -> IntentResult {
        let price_filter = extract_price_filter(message);
        let stripped = strip_price_language(message);

        // Fast path: image with no usable text needs no model call.
        if stripped.is_empty() && has_image {
            debug!(
                subsystem = "inference",
                component = "intent",
                intent = %Intent::ImageRec,
                "Image-only request, skipping classification call"
            );
            return IntentResult {
                intent: Intent::ImageRec,
                cleaned_query: defaults::IMAGE_ONLY_QUERY.to_string(),
                conversation_response: None,
                image_url: None,
                price_filter,
            };
        }

        let mut result = match self.classify_with_model(&stripped, has_image).await {
            Ok(raw) => self.apply_rules(raw, &stripped, has_image, price_filter),
            Err(e) => {
                warn!(
                    subsystem = "inference",
                    component = "intent",
                    error = %e,
                    "Classification call failed, using deterministic fallback"
                );
                IntentResult {
                    intent: if has_image {
                        Intent::ImageRec
                    } else {
                        Intent::TextRec
                    },
                    cleaned_query: stripped.clone(),
                    conversation_response: None,
                    image_url: None,
                    price_filter,
                }
            }
        };

        if result.intent == Intent::GeneralTalk {
            result.conversation_response = Some(self.converse(message).await);
        }

        debug!(
            subsystem = "inference",
            component = "intent",
            intent = %result.intent,
            query = %result.cleaned_query,
            "Intent classified"
        );

        result
    }

    /// One structured-JSON chat call. Errors here are recovered by the
    /// caller's fallback.
    async fn classify_with_model(
        &self,
        stripped: &str,
        has_image: bool,
    ) -> Result<RawClassification> {
        let prompt = format!(
            "User message: \"{}\"\nHas attached image: {}",
            stripped,
            if has_image { "Yes" } else { "No" }
        );

        let options = GenerationOptions {
            temperature: Some(defaults::CLASSIFY_TEMPERATURE),
            max_tokens: None,
            json_mode: true,
        };

        let response = self
            .backend
            .generate_with_system(CLASSIFY_SYSTEM_PROMPT, &prompt, &options)
            .await?;

        serde_json::from_str(response.trim())
            .map_err(|e| Error::Inference(format!("Malformed classification output: {}", e)))
    }

    /// Deterministic post-stage. Applied last, authoritative:
    /// attachment presence is ground truth, model output is advisory.
    fn apply_rules(
        &self,
        raw: RawClassification,
        stripped: &str,
        has_image: bool,
        price_filter: PriceFilter,
    ) -> IntentResult {
        let model_intent = raw.intent.parse::<Intent>().unwrap_or(Intent::TextRec);

        // An attached image binary always means image search.
        let intent = if has_image {
            Intent::ImageRec
        } else {
            model_intent
        };

        // A text-extracted URL only matters when the model judged
        // image_rec without an attachment; the pipeline fetches it.
        let image_url = if intent == Intent::ImageRec && !has_image {
            raw.image_url.filter(|url| !url.is_empty())
        } else {
            None
        };

        let cleaned_query = if raw.cleaned_query.trim().is_empty() {
            stripped.to_string()
        } else {
            raw.cleaned_query
        };

        IntentResult {
            intent,
            cleaned_query,
            conversation_response: None,
            image_url,
            price_filter,
        }
    }

    /// Second, separately-prompted call with the fixed persona. Its
    /// failure is absorbed with a canned greeting.
    async fn converse(&self, message: &str) -> String {
        let options = GenerationOptions {
            temperature: Some(defaults::CONVERSATION_TEMPERATURE),
            max_tokens: Some(defaults::CONVERSATION_MAX_TOKENS),
            json_mode: false,
        };

        match self
            .backend
            .generate_with_system(PERSONA_SYSTEM_PROMPT, message, &options)
            .await
        {
            Ok(reply) if !reply.trim().is_empty() => reply,
            Ok(_) => FALLBACK_GREETING.to_string(),
            Err(e) => {
                warn!(
                    subsystem = "inference",
                    component = "intent",
                    error = %e,
                    "Conversation call failed, using canned greeting"
                );
                FALLBACK_GREETING.to_string()
            }
        }
    }
}
