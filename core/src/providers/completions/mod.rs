pub(crate) mod openai;

pub use openai::OpenAICompletionModel as OpenAI;
