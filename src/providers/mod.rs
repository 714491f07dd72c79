pub mod gemini;
pub mod openai_compat;
pub mod siliconflow;
pub mod zhipu;
