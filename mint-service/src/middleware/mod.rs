pub mod accept;
pub mod quiz_body;

pub use accept::ResponseFormat;
pub use quiz_body::QuizForm;
