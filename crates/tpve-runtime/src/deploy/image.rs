use std::fs;
use std::path::Path;

use tpve_core::config::{METAL_IMAGE_ASSET, QCOW2_OPTIONS, TALOS_RELEASE_BASE};
use tpve_core::env::EnvOverlay;
use tpve_core::error::StageError;
use tracing::{debug, info, instrument, warn};

use super::{Deployer, path_arg};
use crate::shell::Invocation;

impl Deployer<'_> {
    /// Download URL of the metal image, honoring the proxy mirror.
    pub fn image_url(&self) -> String {
        let version = &self.desc.talos_version;
        match self.desc.proxy.active_mirror() {
            Some(mirror) => format!("{mirror}/{version}/{METAL_IMAGE_ASSET}"),
            None => format!("{TALOS_RELEASE_BASE}/{version}/{METAL_IMAGE_ASSET}"),
        }
    }

    /// Make sure the converted qcow2 image exists locally.
    ///
    /// An existing image short-circuits the stage; an existing compressed
    /// archive skips the download.
    #[instrument(skip_all, fields(talos_version = %self.desc.talos_version))]
    pub fn prepare_image(&self) -> Result<(), StageError> {
        let image = self.paths.image();
        if image.exists() {
            info!(path = %image.display(), "image already prepared");
            return Ok(());
        }

        let compressed = self.paths.compressed_image();
        if compressed.exists() {
            info!(path = %compressed.display(), "reusing downloaded archive");
        } else {
            let url = self.image_url();
            info!(%url, "downloading Talos image");
            let download = Invocation::new("wget")
                .args(["-q", "--show-progress"])
                .arg(url)
                .arg("-O")
                .arg(path_arg(&compressed))
                .env(EnvOverlay::proxy(&self.desc.proxy));
            if let Err(e) = self.runner.run_checked(&download) {
                // a truncated archive must not be picked up by the next run
                remove_quietly(&compressed);
                return Err(StageError::Download(e));
            }
        }

        let raw = self.paths.raw_image();
        info!("decompressing image");
        self.runner
            .run_checked(
                &Invocation::new("xz")
                    .args(["-d", "-k", "-f"])
                    .arg(path_arg(&compressed)),
            )
            .map_err(StageError::Decompress)?;

        info!(path = %image.display(), "converting to qcow2");
        self.runner
            .run_checked(
                &Invocation::new("qemu-img")
                    .args(["convert", "-f", "raw", "-O", "qcow2", "-c", "-o", QCOW2_OPTIONS])
                    .arg(path_arg(&raw))
                    .arg(path_arg(&image)),
            )
            .map_err(StageError::Convert)?;

        remove_quietly(&raw);
        remove_quietly(&compressed);
        Ok(())
    }
}

fn remove_quietly(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove intermediate file"),
    }
}
