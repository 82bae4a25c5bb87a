// Utility Module
// Stream helpers used by the command line front end

pub mod file_ops;

pub use file_ops::{create_private_key_file, open_input, open_output, FileConfig};
