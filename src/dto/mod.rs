pub mod file_dto;
pub mod material_dto;
pub mod test_dto;
