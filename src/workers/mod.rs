pub mod encode_queue;
pub mod hls_encoder;
