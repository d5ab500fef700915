pub mod parser;
pub mod prompt;
pub mod reconcile;

pub use parser::{coerce_to_list, parse_generation_response, ParsedGenerationResult};
pub use prompt::build_prompt;
pub use reconcile::select_questions;
