use std::process::ExitCode;

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> ExitCode {
    match tpve_cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tpve_cli::ui::error(&format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}
