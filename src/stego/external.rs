//! @ai:module:intent Adapter running an external embed/extract command line as an algorithm
//! @ai:module:layer infrastructure
//! @ai:module:public_api ExternalAlgorithm
//! @ai:module:stateless false

use crate::dataset::raster::normalize;
use crate::stego::{StegoAlgorithm, StegoError};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Mutex;
use tempfile::TempDir;
use tracing::debug;

/// @ai:intent Wraps a command-line tool that works on image files
///
/// Arguments may contain `{cover}`, `{payload}`, `{stego}` and `{key}`
/// placeholders. The scratch directory lives as long as the adapter so side
/// files written during embed (keys, configs) are visible to extract. Those
/// files are shared by every call, so the adapter is not reentrant.
pub struct ExternalAlgorithm {
    name: String,
    program: String,
    embed_args: Vec<String>,
    extract_args: Vec<String>,
    scratch: TempDir,
    lock: Mutex<()>,
}

impl ExternalAlgorithm {
    /// @ai:intent Create the adapter and its scratch directory
    /// @ai:effects fs:write
    pub fn new(
        name: &str,
        program: &str,
        embed_args: Vec<String>,
        extract_args: Vec<String>,
    ) -> Result<Self, StegoError> {
        let scratch = tempfile::Builder::new().prefix("stegoeval_cli_").tempdir()?;
        Ok(Self {
            name: name.to_string(),
            program: program.to_string(),
            embed_args,
            extract_args,
            scratch,
            lock: Mutex::new(()),
        })
    }

    fn path(&self, file: &str) -> PathBuf {
        self.scratch.path().join(file)
    }

    fn substitute(&self, args: &[String], image: &Path, payload: &str) -> Vec<String> {
        let stego = self.path("stego.png");
        let key = self.path("key.bin");
        args.iter()
            .map(|arg| {
                arg.replace("{cover}", &image.to_string_lossy())
                    .replace("{stego}", &stego.to_string_lossy())
                    .replace("{key}", &key.to_string_lossy())
                    .replace("{payload}", payload)
            })
            .collect()
    }

    fn run(&self, args: &[String]) -> Result<Output, StegoError> {
        debug!("Running {} {:?}", self.program, args);
        Ok(Command::new(&self.program).args(args).output()?)
    }
}

impl StegoAlgorithm for ExternalAlgorithm {
    fn name(&self) -> &str {
        &self.name
    }

    /// @ai:intent Write the cover to disk, run the embed command, read back `{stego}`
    /// @ai:effects fs:write, fs:read, process
    fn embed(&self, cover: &DynamicImage, payload: &str) -> Result<DynamicImage, StegoError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());

        let cover_path = self.path("cover.png");
        let stego_path = self.path("stego.png");
        if stego_path.exists() {
            std::fs::remove_file(&stego_path)?;
        }
        cover.save(&cover_path)?;

        let output = self.run(&self.substitute(&self.embed_args, &cover_path, payload))?;
        if !output.status.success() {
            return Err(StegoError::Command {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if !stego_path.exists() {
            return Err(StegoError::MissingOutput(stego_path));
        }
        Ok(normalize(image::open(&stego_path)?))
    }

    /// @ai:intent Write the (possibly attacked) image and parse the payload from stdout
    /// @ai:post a failing extract command yields an empty payload
    /// @ai:effects fs:write, process
    fn extract(&self, stego: &DynamicImage) -> Result<String, StegoError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());

        let attacked_path = self.path("attacked.png");
        stego.save(&attacked_path)?;

        let output = self.run(&self.substitute(&self.extract_args, &attacked_path, ""))?;
        if !output.status.success() {
            debug!(
                "{} extract exited with {}: {}",
                self.name,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Ok(String::new());
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn reentrant(&self) -> bool {
        false
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn cover() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([90])))
    }

    #[test]
    fn test_copy_tool_roundtrip_with_key_file() {
        // embed: copy cover to stego and stash the payload as a key file
        let algo = ExternalAlgorithm::new(
            "shell",
            "sh",
            args(&["-c", "cp \"$0\" \"$1\" && printf '%s' \"$2\" > \"$3\"", "{cover}", "{stego}", "{payload}", "{key}"]),
            args(&["-c", "cat \"$0\"", "{key}"]),
        )
        .unwrap();

        let stego = algo.embed(&cover(), "secret text").unwrap();
        assert_eq!(stego, cover());
        assert_eq!(algo.extract(&stego).unwrap(), "secret text");
    }

    #[test]
    fn test_failing_embed_is_an_error() {
        let algo = ExternalAlgorithm::new("bad", "sh", args(&["-c", "echo boom >&2; exit 3"]), vec![]).unwrap();
        let err = algo.embed(&cover(), "x").unwrap_err();
        assert!(matches!(&err, StegoError::Command { stderr, .. } if stderr == "boom"));
    }

    #[test]
    fn test_missing_output_is_an_error() {
        let algo = ExternalAlgorithm::new("lazy", "true", vec![], vec![]).unwrap();
        assert!(matches!(
            algo.embed(&cover(), "x"),
            Err(StegoError::MissingOutput(_))
        ));
    }

    #[test]
    fn test_failing_extract_yields_empty_payload() {
        let algo = ExternalAlgorithm::new("bad", "false", vec![], vec![]).unwrap();
        assert_eq!(algo.extract(&cover()).unwrap(), "");
    }

    #[test]
    fn test_key_file_is_shared_across_calls() {
        let algo = ExternalAlgorithm::new(
            "shell",
            "sh",
            args(&["-c", "cp \"$0\" \"$1\" && printf '%s' \"$2\" > \"$3\"", "{cover}", "{stego}", "{payload}", "{key}"]),
            args(&["-c", "cat \"$0\"", "{key}"]),
        )
        .unwrap();

        let first = algo.embed(&cover(), "first").unwrap();
        algo.embed(&cover(), "second").unwrap();
        assert_eq!(algo.extract(&first).unwrap(), "second");
        assert!(!algo.reentrant());
    }
}
