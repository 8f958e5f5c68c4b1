pub mod file_io;
pub mod types_and_const;
