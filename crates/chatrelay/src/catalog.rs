//! Static catalog of provider display metadata and model identifiers.
//!
//! Consumed by clients to populate model pickers. The dispatcher does not
//! read it; its provider order comes from configuration.

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ProviderInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub requires_api_key: bool,
    pub website: &'static str,
    pub models: &'static [ModelInfo],
}

#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub context_window: u32,
    pub description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pricing: Option<Pricing>,
}

/// USD per million tokens.
#[derive(Debug, Serialize)]
pub struct Pricing {
    pub input: f64,
    pub output: f64,
}

const fn model(
    id: &'static str,
    name: &'static str,
    context_window: u32,
    description: &'static str,
    pricing: Option<(f64, f64)>,
) -> ModelInfo {
    let pricing = match pricing {
        Some((input, output)) => Some(Pricing { input, output }),
        None => None,
    };
    ModelInfo {
        id,
        name,
        context_window,
        description,
        pricing,
    }
}

pub static PROVIDERS: &[ProviderInfo] = &[
    ProviderInfo {
        id: "openai",
        name: "OpenAI",
        description: "Industry-leading models from OpenAI",
        requires_api_key: true,
        website: "https://platform.openai.com",
        models: &[
            model(
                "gpt-4-turbo-preview",
                "GPT-4 Turbo",
                128_000,
                "Most capable model, best for complex tasks",
                Some((10.0, 30.0)),
            ),
            model(
                "gpt-4",
                "GPT-4",
                8_192,
                "Previous generation flagship model",
                Some((30.0, 60.0)),
            ),
            model(
                "gpt-3.5-turbo",
                "GPT-3.5 Turbo",
                16_385,
                "Fast and efficient for most tasks",
                Some((0.5, 1.5)),
            ),
        ],
    },
    ProviderInfo {
        id: "anthropic",
        name: "Anthropic",
        description: "Claude models focused on safety and helpfulness",
        requires_api_key: true,
        website: "https://console.anthropic.com",
        models: &[
            model(
                "claude-3-opus-20240229",
                "Claude 3 Opus",
                200_000,
                "Most intelligent model, best performance",
                Some((15.0, 75.0)),
            ),
            model(
                "claude-3-sonnet-20240229",
                "Claude 3 Sonnet",
                200_000,
                "Balanced performance and speed",
                Some((3.0, 15.0)),
            ),
            model(
                "claude-3-haiku-20240307",
                "Claude 3 Haiku",
                200_000,
                "Fastest model, near-instant responses",
                Some((0.25, 1.25)),
            ),
        ],
    },
    ProviderInfo {
        id: "google",
        name: "Google AI",
        description: "Gemini models with long context windows",
        requires_api_key: true,
        website: "https://ai.google.dev",
        models: &[
            model(
                "gemini-1.5-pro",
                "Gemini 1.5 Pro",
                1_000_000,
                "Long context window, multimodal",
                Some((3.5, 10.5)),
            ),
            model(
                "gemini-pro",
                "Gemini Pro",
                32_000,
                "Efficient general-purpose model",
                Some((0.5, 1.5)),
            ),
        ],
    },
    ProviderInfo {
        id: "cohere",
        name: "Cohere",
        description: "Enterprise-focused language models",
        requires_api_key: true,
        website: "https://cohere.ai",
        models: &[
            model(
                "command-r-plus",
                "Command R+",
                128_000,
                "Advanced RAG capabilities",
                Some((3.0, 15.0)),
            ),
            model("command-r", "Command R", 128_000, "Balanced performance", Some((0.5, 1.5))),
        ],
    },
    ProviderInfo {
        id: "mistral",
        name: "Mistral AI",
        description: "Efficient European AI models",
        requires_api_key: true,
        website: "https://mistral.ai",
        models: &[
            model(
                "mistral-large-latest",
                "Mistral Large",
                32_000,
                "Flagship model with top performance",
                Some((4.0, 12.0)),
            ),
            model(
                "mistral-medium-latest",
                "Mistral Medium",
                32_000,
                "Balanced cost and performance",
                Some((2.7, 8.1)),
            ),
        ],
    },
    ProviderInfo {
        id: "ollama",
        name: "Ollama",
        description: "Run models locally on your machine",
        requires_api_key: false,
        website: "https://ollama.ai",
        models: &[
            model("llama2", "Llama 2", 4_096, "Open source, runs locally", None),
            model("mistral", "Mistral", 8_192, "Open source, efficient", None),
            model("codellama", "Code Llama", 4_096, "Specialized for code generation", None),
        ],
    },
    ProviderInfo {
        id: "huggingface",
        name: "Hugging Face",
        description: "Open source model inference",
        requires_api_key: true,
        website: "https://huggingface.co",
        models: &[model(
            "meta-llama/Llama-2-70b-chat-hf",
            "Llama 2 70B",
            4_096,
            "Open source large language model",
            None,
        )],
    },
];

/// Look up a provider by id.
pub fn provider(id: &str) -> Option<&'static ProviderInfo> {
    PROVIDERS.iter().find(|p| p.id == id)
}
