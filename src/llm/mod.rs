pub mod im_channel;
pub mod narrator;
pub mod ollama;
