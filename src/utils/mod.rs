//! Utility functions and types

pub mod data_loader;

pub use data_loader::{
    column_as_f64, column_as_str, column_names, copy_file, ensure_parent_dir, is_numeric_dtype,
    load_object, read_csv, read_yaml_file, save_object, write_csv, write_yaml_file,
};
