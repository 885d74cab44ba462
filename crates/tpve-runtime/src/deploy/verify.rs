use tpve_core::env::EnvOverlay;
use tpve_core::error::StageError;
use tracing::{info, instrument};

use super::{Deployer, KUBECONFIG, path_arg};
use crate::shell::Invocation;

impl Deployer<'_> {
    fn kubectl<'s>(&self, args: impl IntoIterator<Item = &'s str>) -> Invocation {
        Invocation::new("kubectl")
            .args(args)
            .env(EnvOverlay::new().with(KUBECONFIG, path_arg(&self.paths.kubeconfig())))
    }

    /// Print node and pod status using the retrieved kubeconfig.
    #[instrument(skip_all, fields(cluster = %self.desc.cluster_name))]
    pub fn verify(&self) -> Result<(), StageError> {
        info!("checking node status");
        self.runner
            .run_checked(&self.kubectl(["get", "nodes", "-o", "wide"]))
            .map_err(StageError::step("kubectl get nodes"))?;

        info!("checking pod status");
        self.runner
            .run_checked(&self.kubectl(["get", "pods", "-A", "-o", "wide"]))
            .map_err(StageError::step("kubectl get pods"))?;
        Ok(())
    }
}
