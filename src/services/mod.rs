pub mod ai_service;
pub mod event_service;
pub mod extract_service;
pub mod file_service;
pub mod generation_service;
pub mod material_service;
pub mod test_service;
