//! Post-build signing of firmware images.
//!
//! The signature is produced by an external `openssl` and appended to the
//! image, followed by its length as a little-endian `u32`, which is the layout
//! the OTA updater reads back from the end of the upload.

use std::{
    fs::File,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

/// Errors that may occur while signing a firmware image.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A file could not be read or written.
    #[error("{1}: I/O error: {0}")]
    Io(std::io::Error, PathBuf),

    /// A required key file does not exist.
    #[error("{0}: {1} not found")]
    MissingKey(PathBuf, &'static str),

    /// The signing tool could not be started.
    #[error("could not run {1}: {0}")]
    Spawn(std::io::Error, String),

    /// The signing tool failed.
    #[error("{program} exited with {status}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
    },

    /// The signing tool produced no output.
    #[error("{0} produced an empty signature")]
    EmptySignature(String),

    /// The signature is too long to record its length.
    #[error("signature of {0} bytes is too long")]
    SignatureTooLong(usize),
}

/// Signing configuration.
#[derive(Debug)]
pub struct Signer {
    /// The `openssl` executable.
    pub openssl: String,
    /// The private key used to sign.
    pub private_key: PathBuf,
    /// The public key the firmware verifies with. Must exist in the data
    /// directory; its contents are not read.
    pub public_key: PathBuf,
}

impl Signer {
    /// Signs `image` and writes the signed image to `out`. Returns the length
    /// of the signature.
    pub fn sign_file(&self, image: &Path, out: &Path) -> Result<usize, Error> {
        if !self.public_key.is_file() {
            return Err(Error::MissingKey(self.public_key.clone(), "public key"));
        }
        if !self.private_key.is_file() {
            return Err(Error::MissingKey(self.private_key.clone(), "private key"));
        }

        let input = File::open(image).map_err(|err| Error::Io(err, image.to_path_buf()))?;
        log::debug!(
            "Running {} dgst -sha256 -sign {}",
            self.openssl,
            self.private_key.display()
        );
        let output = Command::new(&self.openssl)
            .args(["dgst", "-sha256", "-sign"])
            .arg(&self.private_key)
            .stdin(input)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .map_err(|err| Error::Spawn(err, self.openssl.clone()))?;

        if !output.status.success() {
            return Err(Error::Failed {
                program: self.openssl.clone(),
                status: output.status,
            });
        }
        if output.stdout.is_empty() {
            return Err(Error::EmptySignature(self.openssl.clone()));
        }

        let data = std::fs::read(image).map_err(|err| Error::Io(err, image.to_path_buf()))?;
        let signed = append_signature(data, &output.stdout)?;
        std::fs::write(out, signed).map_err(|err| Error::Io(err, out.to_path_buf()))?;
        Ok(output.stdout.len())
    }
}

/// Appends a signature and its little-endian `u32` length to an image.
pub fn append_signature(mut image: Vec<u8>, signature: &[u8]) -> Result<Vec<u8>, Error> {
    let len = u32::try_from(signature.len())
        .map_err(|_| Error::SignatureTooLong(signature.len()))?;
    image.reserve(signature.len() + size_of::<u32>());
    image.extend_from_slice(signature);
    image.extend_from_slice(&len.to_le_bytes());
    Ok(image)
}

/// The default output path for a signed image: `firmware.bin` becomes
/// `firmware.signed.bin`.
pub fn signed_path(image: &Path) -> PathBuf {
    let stem = image.file_stem().unwrap_or(image.as_os_str());
    let mut name = stem.to_os_string();
    name.push(".signed.bin");
    image.with_file_name(name)
}
