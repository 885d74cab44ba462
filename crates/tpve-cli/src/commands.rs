use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, CommandFactory, Parser, Subcommand};

use crate::display::{self, ClusterSummary};
use crate::logging::{self, LogFormat};
use crate::output::{self, OutputFormat};
use crate::ui::{self, SpinnerReadiness};
use crate::wizard;

use tpve_core::config::{self, DEFAULT_DESCRIPTOR_FILE};
use tpve_core::descriptor::ClusterDescriptor;
use tpve_core::loader;
use tpve_core::stage::{Stage, StageSelection};
use tpve_runtime::deploy::{Deployer, LifecycleReport, Pipeline, StageEvent};
use tpve_runtime::preflight;
use tpve_runtime::shell::HostRunner;

#[derive(Parser)]
#[command(
    name = "talos-pve",
    version,
    about = "Deploy and manage Talos Linux Kubernetes clusters on Proxmox VE"
)]
struct Cli {
    /// Cluster descriptor (YAML, TOML or JSON)
    #[arg(long, short = 'c', global = true, default_value = DEFAULT_DESCRIPTOR_FILE)]
    config: PathBuf,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Human)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a cluster descriptor interactively
    Init {
        /// Where to write the descriptor (defaults to --config)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Write the default descriptor without prompting
        #[arg(long)]
        defaults: bool,
        /// Overwrite an existing file
        #[arg(long, short = 'f')]
        force: bool,
    },
    /// Provision the cluster: image, template, nodes, config, bootstrap
    Deploy(DeployArgs),
    /// Destroy all nodes, the template VM and local artifacts
    Destroy {
        /// Skip the confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
    },
    /// Start, stop or restart cluster nodes
    Manage {
        #[command(subcommand)]
        action: ManageCmd,
    },
    /// Show node and pod status with the cluster kubeconfig
    Verify,
    /// Validate the descriptor and list its nodes
    Validate {
        /// Output format: table, json, yaml
        #[arg(long, short = 'o', default_value = "table")]
        output: String,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Args, Debug, Default)]
struct DeployArgs {
    /// Skip downloading and converting the Talos image
    #[arg(long, short = 's')]
    skip_prepare: bool,
    /// Skip creating the template VM
    #[arg(long, short = 't')]
    skip_template: bool,
    /// Skip cloning and starting nodes
    #[arg(long)]
    skip_nodes: bool,
    /// Skip generating machine configuration
    #[arg(long)]
    skip_config: bool,
    /// Skip applying machine configuration
    #[arg(long)]
    skip_apply: bool,
    /// Skip bootstrapping the cluster
    #[arg(long)]
    skip_bootstrap: bool,
}

impl DeployArgs {
    fn selection(&self) -> StageSelection {
        StageSelection::all()
            .skip_if(self.skip_prepare, Stage::PrepareImage)
            .skip_if(self.skip_template, Stage::CreateTemplate)
            .skip_if(self.skip_nodes, Stage::CreateNodes)
            .skip_if(self.skip_config, Stage::GenerateConfig)
            .skip_if(self.skip_apply, Stage::ApplyConfig)
            .skip_if(self.skip_bootstrap, Stage::Bootstrap)
    }
}

#[derive(Subcommand)]
enum ManageCmd {
    /// Start every node
    Start,
    /// Stop every node
    Stop,
    /// Stop, then start every node
    Restart,
}

// ============================================================================
// Entry point
// ============================================================================

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_format);

    match cli.command {
        Commands::Init {
            output,
            defaults,
            force,
        } => cmd_init(output.as_deref().unwrap_or(&cli.config), defaults, force),
        Commands::Deploy(args) => cmd_deploy(&cli.config, &args),
        Commands::Destroy { force } => cmd_destroy(&cli.config, force),
        Commands::Manage { action } => cmd_manage(&cli.config, action),
        Commands::Verify => cmd_verify(&cli.config),
        Commands::Validate { output } => {
            cmd_validate(&cli.config, OutputFormat::from_str_arg(&output))
        }
        Commands::Completions { shell } => cmd_completions(shell),
    }
}

fn load_descriptor(path: &Path) -> Result<ClusterDescriptor> {
    loader::load_and_validate(path)
        .with_context(|| format!("cluster descriptor {} is not usable", path.display()))
}

fn report_failures(report: &LifecycleReport) {
    for failure in &report.failures {
        ui::warn(&format!(
            "  {} (VM {}): {}",
            failure.node, failure.vm_id, failure.error
        ));
    }
}

// ============================================================================
// Command handlers
// ============================================================================

fn cmd_init(path: &Path, defaults: bool, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite",
            path.display()
        );
    }

    let desc = if defaults {
        wizard::default_descriptor(3, 2)
    } else {
        ui::banner(&["Talos on Proxmox cluster setup"]);
        wizard::prompt_descriptor()?
    };

    let yaml = serde_yaml::to_string(&desc).context("failed to serialize descriptor")?;
    std::fs::write(path, yaml).with_context(|| format!("failed to write {}", path.display()))?;

    ui::success(&format!("Wrote {}", path.display()));
    ui::info(&format!(
        "Review it, then run: talos-pve deploy -c {}",
        path.display()
    ));
    Ok(())
}

fn cmd_deploy(config_path: &Path, args: &DeployArgs) -> Result<()> {
    let desc = load_descriptor(config_path)?;
    let selection = args.selection();

    ui::banner(&[
        &format!("Deploying cluster {}", desc.cluster_name),
        &format!(
            "Talos {}  |  {} control plane(s), {} worker(s)",
            desc.talos_version,
            desc.nodes.control_planes.len(),
            desc.nodes.workers.len()
        ),
        &format!("Proxmox {}  |  storage {}", desc.proxmox.host, desc.proxmox.storage_pool),
    ]);

    let missing = preflight::missing_tools(&preflight::required_tools(&selection));
    if !missing.is_empty() {
        bail!("required tools not found on PATH: {}", missing.join(", "));
    }

    let runner = HostRunner;
    let readiness = SpinnerReadiness::default();
    let pipeline = Pipeline::new(Deployer::new(&desc, &runner, &readiness, config::work_dir()));

    let report = pipeline
        .deploy(&selection, &mut |event| match *event {
            StageEvent::Started {
                stage,
                index,
                total,
            } => ui::step(index, total, stage.describe()),
            StageEvent::Skipped { stage } => ui::skipped(stage.describe()),
            StageEvent::Finished { stage } => ui::success(&format!("{} done", stage.describe())),
        })
        .context("deployment failed")?;

    if report.completed.is_empty() {
        ui::info("All stages skipped; nothing to do.");
        return Ok(());
    }

    let kubeconfig = pipeline.deployer().paths().kubeconfig();
    ui::banner(&["Cluster deployed"]);
    ui::info("Next steps:");
    println!("  export KUBECONFIG={}", kubeconfig.display());
    println!("  kubectl get nodes");
    println!("  talos-pve verify -c {}", config_path.display());
    Ok(())
}

fn cmd_destroy(config_path: &Path, force: bool) -> Result<()> {
    let desc = load_descriptor(config_path)?;

    if !force {
        let prompt = format!(
            "This will destroy {} node(s) of cluster '{}', template VM {} and local artifacts. Continue?",
            desc.all_nodes().count(),
            desc.cluster_name,
            desc.proxmox.template_vm_id
        );
        if !ui::confirm(&prompt) {
            ui::info("Cancelled.");
            return Ok(());
        }
    }

    let runner = HostRunner;
    let readiness = SpinnerReadiness::default();
    let pipeline = Pipeline::new(Deployer::new(&desc, &runner, &readiness, config::work_dir()));

    ui::info(&format!("Destroying cluster {}...", desc.cluster_name));
    let report = pipeline.destroy().context("destroy failed")?;
    if report.is_clean() {
        ui::success("Cluster destroyed.");
    } else {
        ui::warn(&format!(
            "Destroyed {} of {} node(s); failures:",
            report.succeeded(),
            report.attempted
        ));
        report_failures(&report);
    }
    Ok(())
}

fn cmd_manage(config_path: &Path, action: ManageCmd) -> Result<()> {
    let desc = load_descriptor(config_path)?;
    let runner = HostRunner;
    let readiness = SpinnerReadiness::default();
    let pipeline = Pipeline::new(Deployer::new(&desc, &runner, &readiness, config::work_dir()));

    let (verb, report) = match action {
        ManageCmd::Start => ("started", pipeline.start()),
        ManageCmd::Stop => ("stopped", pipeline.stop()),
        ManageCmd::Restart => ("restarted", pipeline.restart()),
    };
    let report = report.context("node operation failed")?;

    if report.is_clean() {
        ui::success(&format!("All nodes {verb}."));
    } else {
        ui::warn(&format!(
            "{} of {} node operation(s) failed:",
            report.failures.len(),
            report.attempted
        ));
        report_failures(&report);
    }
    Ok(())
}

fn cmd_verify(config_path: &Path) -> Result<()> {
    let desc = load_descriptor(config_path)?;
    let runner = HostRunner;
    let readiness = SpinnerReadiness::default();
    let pipeline = Pipeline::new(Deployer::new(&desc, &runner, &readiness, config::work_dir()));

    if !preflight::missing_tools(&["kubectl"]).is_empty() {
        bail!("'kubectl' not found on PATH");
    }
    pipeline.verify().context("cluster verification failed")?;
    ui::success("Cluster verified.");
    Ok(())
}

fn cmd_validate(config_path: &Path, format: OutputFormat) -> Result<()> {
    let desc = load_descriptor(config_path)?;
    let rows = display::node_rows(&desc);
    let summary = ClusterSummary::new(&desc);

    if format == OutputFormat::Table {
        ui::status_line("Cluster", &desc.cluster_name);
        ui::status_line("Talos", &desc.talos_version);
        ui::status_line("Kubernetes", &desc.kubernetes_version);
        ui::status_line("Proxmox host", &desc.proxmox.host);
        ui::status_line("Template VM", &desc.proxmox.template_vm_id.to_string());
        ui::status_line("Mirrors", &summary.registry_mirrors.join(", "));
    }
    println!("{}", output::render(&rows, &summary, format)?);
    Ok(())
}

fn cmd_completions(shell: clap_complete::Shell) -> Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "talos-pve", &mut std::io::stdout());
    Ok(())
}
