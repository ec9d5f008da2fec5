use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// OpenAI互換のチャット補完APIを提供するプロバイダ
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    #[default]
    Groq,
    #[value(name = "openai")]
    OpenAi,
}

impl AiProvider {
    pub fn endpoint(&self) -> &'static str {
        match self {
            AiProvider::Groq => "https://api.groq.com/openai/v1/chat/completions",
            AiProvider::OpenAi => "https://api.openai.com/v1/chat/completions",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            AiProvider::Groq => "llama3-8b-8192",
            AiProvider::OpenAi => "gpt-4o-mini",
        }
    }

    pub fn api_key_env(&self) -> &'static str {
        match self {
            AiProvider::Groq => "GROQ_API_KEY",
            AiProvider::OpenAi => "OPENAI_API_KEY",
        }
    }
}

impl std::fmt::Display for AiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AiProvider::Groq => write!(f, "groq"),
            AiProvider::OpenAi => write!(f, "openai"),
        }
    }
}
