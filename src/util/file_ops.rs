// File Operations for RSA Encryption/Decryption
// Opens the streams handed to the core and configures chunked processing

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Configuration for file encryption/decryption
#[derive(Clone, Debug)]
pub struct FileConfig {
    /// blocks transformed per parallel batch
    pub batch_blocks: usize,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self { batch_blocks: 64 }
    }
}

impl FileConfig {
    pub fn with_batch_blocks(mut self, blocks: usize) -> Self {
        self.batch_blocks = blocks.max(1);
        self
    }
}

/// Buffered reader over `path`, or stdin when no path is given
pub fn open_input(path: Option<&Path>) -> io::Result<BufReader<Box<dyn Read>>> {
    let inner: Box<dyn Read> = match path {
        Some(p) => Box::new(File::open(p)?),
        None => Box::new(io::stdin()),
    };
    Ok(BufReader::new(inner))
}

/// Buffered writer truncating `path`, or stdout when no path is given
pub fn open_output(path: Option<&Path>) -> io::Result<BufWriter<Box<dyn Write>>> {
    let inner: Box<dyn Write> = match path {
        Some(p) => Box::new(File::create(p)?),
        None => Box::new(io::stdout()),
    };
    Ok(BufWriter::new(inner))
}

/// Create (or truncate) a private key file readable by its owner only
pub fn create_private_key_file(path: &Path) -> io::Result<BufWriter<File>> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let file = options.open(path)?;

    // mode() only applies on creation
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(BufWriter::new(file))
}
