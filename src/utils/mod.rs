pub mod text;
pub mod tokens;
