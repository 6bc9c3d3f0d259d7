pub mod mock_backend;
pub mod mock_tts;
